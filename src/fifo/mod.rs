//! Sample delivery from the drivers to the motion-sensing service
//!
//! Bottom halves decode the hardware FIFO and [`SampleSink::stage`] every
//! sample. Once a pass finished cleanly they [`SampleSink::commit`], which
//! makes the staged batch visible to consumers in one step and in hardware
//! order. [`SampleQueue`] is the fixed-capacity sink the service drains.
//!
//! # Example
//!
//! ```ignore
//! # use accelgyro::{AccelGyro, SampleQueue};
//! let mut queue: SampleQueue<64> = SampleQueue::new();
//! accel.irq_handler(timestamp, &mut queue)?;
//! while let Some(sample) = queue.pop() {
//!     // sample.sensor_id, sample.xyz, sample.timestamp
//! }
//! ```

pub mod packet;

use heapless::{Deque, Vec};

/// Sample flag: the channel had a calibration offset programmed
pub const FLAG_CALIBRATED: u8 = 1 << 0;

/// Most samples a single bottom-half pass can stage
pub const STAGE_CAPACITY: usize = 32;

/// One normalized sample
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Sample {
    /// Channel the sample belongs to
    pub sensor_id: u8,
    /// Rotated and scaled axes
    pub xyz: [i16; 3],
    /// Top-half interrupt time, in microseconds
    pub timestamp: u32,
    /// `FLAG_*` bits
    pub flags: u8,
}

impl Sample {
    /// Build a sample, saturating each axis into `i16`
    pub fn new(sensor_id: u8, xyz: [i32; 3], timestamp: u32) -> Self {
        let sat = |v: i32| v.clamp(i32::from(i16::MIN), i32::from(i16::MAX)) as i16;
        Self {
            sensor_id,
            xyz: [sat(xyz[0]), sat(xyz[1]), sat(xyz[2])],
            timestamp,
            flags: 0,
        }
    }

    /// Same sample with `flags` set
    #[must_use]
    pub const fn with_flags(mut self, flags: u8) -> Self {
        self.flags |= flags;
        self
    }
}

/// Outcome of a [`SampleSink::commit`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CommitStatus {
    /// Samples made visible
    pub committed: usize,
    /// Samples lost to make room or because staging was full
    pub dropped: usize,
}

impl CommitStatus {
    /// Whether any sample was lost
    pub const fn is_overflow(&self) -> bool {
        self.dropped > 0
    }
}

/// Destination of decoded samples
pub trait SampleSink {
    /// Queue `sample` for the next commit
    fn stage(&mut self, sample: Sample);

    /// Publish everything staged since the last commit
    fn commit(&mut self) -> CommitStatus;

    /// Drop everything staged since the last commit
    fn discard(&mut self);
}

/// Per-sensor loss accounting slots
const LOST_SLOTS: usize = 8;

/// Bounded two-phase sample queue
///
/// Appending never blocks: when the queue is full the oldest sample is
/// dropped and counted.
pub struct SampleQueue<const N: usize> {
    queue: Deque<Sample, N>,
    staged: Vec<Sample, STAGE_CAPACITY>,
    staged_lost: usize,
    lost: u32,
    lost_per_sensor: [u32; LOST_SLOTS],
}

impl<const N: usize> SampleQueue<N> {
    /// Empty queue
    ///
    /// A zero-capacity queue is rejected at compile time.
    pub const fn new() -> Self {
        const { assert!(N > 0, "SampleQueue needs room for one sample") };
        Self {
            queue: Deque::new(),
            staged: Vec::new(),
            staged_lost: 0,
            lost: 0,
            lost_per_sensor: [0; LOST_SLOTS],
        }
    }

    /// Oldest committed sample
    pub fn pop(&mut self) -> Option<Sample> {
        self.queue.pop_front()
    }

    /// Number of committed samples waiting
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Whether no committed sample is waiting
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Number of samples staged but not committed
    pub fn staged_len(&self) -> usize {
        self.staged.len()
    }

    /// Total samples lost since the last [`Self::take_lost`]
    pub const fn lost(&self) -> u32 {
        self.lost
    }

    /// Samples lost for `sensor_id` since the last [`Self::take_lost`]
    pub fn lost_for(&self, sensor_id: u8) -> u32 {
        self.lost_per_sensor
            .get(usize::from(sensor_id))
            .copied()
            .unwrap_or(0)
    }

    /// Read and reset the loss counters
    pub fn take_lost(&mut self) -> u32 {
        self.lost_per_sensor = [0; LOST_SLOTS];
        core::mem::take(&mut self.lost)
    }

    fn count_lost(&mut self, sensor_id: u8) {
        self.lost = self.lost.saturating_add(1);
        if let Some(slot) = self.lost_per_sensor.get_mut(usize::from(sensor_id)) {
            *slot = slot.saturating_add(1);
        }
    }
}

impl<const N: usize> Default for SampleQueue<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> SampleSink for SampleQueue<N> {
    fn stage(&mut self, sample: Sample) {
        if self.staged.push(sample).is_err() {
            self.staged_lost += 1;
            self.count_lost(sample.sensor_id);
        }
    }

    fn commit(&mut self) -> CommitStatus {
        let mut status = CommitStatus {
            committed: 0,
            dropped: core::mem::take(&mut self.staged_lost),
        };

        let staged = core::mem::take(&mut self.staged);
        for sample in staged {
            if self.queue.is_full() {
                if let Some(oldest) = self.queue.pop_front() {
                    self.count_lost(oldest.sensor_id);
                    status.dropped += 1;
                }
            }
            if self.queue.push_back(sample).is_ok() {
                status.committed += 1;
            } else {
                self.count_lost(sample.sensor_id);
                status.dropped += 1;
            }
        }

        #[cfg(feature = "defmt")]
        if status.is_overflow() {
            defmt::warn!("sample queue overflow, {} dropped", status.dropped);
        }

        status
    }

    fn discard(&mut self) {
        let staged = core::mem::take(&mut self.staged);
        for sample in &staged {
            self.count_lost(sample.sensor_id);
        }
        self.staged_lost = 0;
    }
}
