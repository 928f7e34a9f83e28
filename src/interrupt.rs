//! Interrupt top half and bottom half
//!
//! The top half runs in interrupt context and only records when the edge
//! happened: [`IrqLine::on_edge`] stores the timestamp in an `embassy-sync`
//! [`Signal`] and returns. The motion task later picks the event up and runs
//! the bottom half, [`service`], which lets every channel drain its FIFO
//! under the chip lock and tags the samples with the recorded timestamp.
//!
//! The line is signalled from interrupt context, so it takes a
//! `CriticalSectionRawMutex`. The chip it feeds stays on a task-level mutex;
//! the bottom half holds that lock for whole FIFO reads.
//!
//! # Example
//!
//! ```ignore
//! static IRQ: IrqLine<CriticalSectionRawMutex> = IrqLine::new();
//! let chip: Chip<ThreadModeRawMutex, _, _> = Chip::new(interface, config, clock);
//!
//! // GPIO interrupt handler
//! IRQ.on_edge(timer.now_us());
//!
//! // Motion task
//! let timestamp = IRQ.wait().await;
//! interrupt::run_handlers(timestamp, &mut [&mut accel, &mut gyro], &mut queue)?;
//! ```

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::signal::Signal;

use crate::Error;
use crate::driver::AccelGyro;
use crate::fifo::SampleSink;

/// One sensor interrupt line
///
/// Edges arriving before the bottom half ran are coalesced; the latest
/// timestamp wins.
pub struct IrqLine<M: RawMutex> {
    signal: Signal<M, u32>,
}

impl<M: RawMutex> IrqLine<M> {
    /// Line with no pending edge
    pub const fn new() -> Self {
        Self {
            signal: Signal::new(),
        }
    }

    /// Top half: record an edge seen at `timestamp`
    pub fn on_edge(&self, timestamp: u32) {
        self.signal.signal(timestamp);
    }

    /// Whether an edge is waiting for the bottom half
    pub fn is_pending(&self) -> bool {
        self.signal.signaled()
    }

    /// Take the pending edge, if any
    pub fn take(&self) -> Option<u32> {
        self.signal.try_take()
    }

    /// Wait for the next edge
    pub async fn wait(&self) -> u32 {
        self.signal.wait().await
    }
}

impl<M: RawMutex> Default for IrqLine<M> {
    fn default() -> Self {
        Self::new()
    }
}

/// Run the bottom half of every channel with the top-half `timestamp`
///
/// Channels that do not own the interrupt answer [`Error::NotHandled`] and
/// are skipped. Every channel gets its turn even after a failure.
///
/// # Errors
///
/// Returns the first error reported by a channel.
pub fn run_handlers<E>(
    timestamp: u32,
    sensors: &mut [&mut dyn AccelGyro<BusError = E>],
    sink: &mut dyn SampleSink,
) -> Result<(), Error<E>> {
    let mut first_error = None;
    for sensor in sensors.iter_mut() {
        match sensor.irq_handler(timestamp, sink) {
            Ok(()) | Err(Error::NotHandled) => {}
            Err(e) => {
                #[cfg(feature = "defmt")]
                defmt::warn!("irq: sensor {} handler failed", sensor.config().sensor_id);
                first_error.get_or_insert(e);
            }
        }
    }
    first_error.map_or(Ok(()), Err)
}

/// Bottom half: service a pending edge on `line`
///
/// Returns `Ok(false)` when no edge was pending.
///
/// # Errors
///
/// See [`run_handlers`].
pub fn service<M, E>(
    line: &IrqLine<M>,
    sensors: &mut [&mut dyn AccelGyro<BusError = E>],
    sink: &mut dyn SampleSink,
) -> Result<bool, Error<E>>
where
    M: RawMutex,
{
    let Some(timestamp) = line.take() else {
        return Ok(false);
    };
    run_handlers(timestamp, sensors, sink)?;
    Ok(true)
}
