//! State shared by all sensor channels of one physical chip
//!
//! Accelerometer and gyroscope of a combo chip sit behind the same bus, the
//! same bank select register and the same FIFO. A [`Chip`] owns all of it
//! behind a single `embassy-sync` blocking mutex; the channel drivers borrow
//! the chip and take the lock for each multi-step register sequence.
//!
//! The lock is never held across a delay, but it is held for whole bus
//! transfers. Pick a task-level raw mutex such as `ThreadModeRawMutex`, or
//! `NoopRawMutex` when one task owns every channel. A
//! `CriticalSectionRawMutex` would mask interrupts for the length of a FIFO
//! read.

use core::cell::RefCell;

use device_driver::RegisterInterface;
use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::RawMutex;

use crate::bank::BankedBus;
use crate::fifo::FLAG_CALIBRATED;
use crate::math::{self, Mat33, Vec3};
use crate::sensor::SensorType;
use crate::{DEFAULT_SCALE, Error};

/// Size of the FIFO scratch buffer, in bytes
pub const FIFO_BUFFER: usize = 84;

/// Free-running microsecond time source
///
/// The counter is expected to wrap; deadlines are compared with wrapping
/// arithmetic.
pub trait Clock {
    /// Current time in microseconds
    fn now_us(&self) -> u32;
}

/// Serial bus the chip is wired to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BusKind {
    /// I2C (or I3C in I2C mode)
    #[default]
    I2c,
    /// 4-wire SPI
    Spi,
}

/// Bus layout of a chip family
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ChipConfig {
    /// Physical address of the bank select register, `None` for a flat map
    pub bank_select: Option<u8>,
    /// Serial bus in use; the unused interface gets disabled at init
    pub bus: BusKind,
}

impl ChipConfig {
    /// ICM-426xx: banks selected through `REG_BANK_SEL` (0x76)
    pub const fn icm426xx(bus: BusKind) -> Self {
        Self {
            bank_select: Some(crate::icm426xx::registers::BANK_SEL),
            bus,
        }
    }

    /// BMI160: single flat register map
    pub const fn bmi160(bus: BusKind) -> Self {
        Self {
            bank_select: None,
            bus,
        }
    }
}

/// Per-channel data the bottom half needs for every channel on the chip
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Channel {
    /// Index of the channel in the sample stream
    pub sensor_id: u8,
    /// Mounting rotation, `None` for identity
    pub rotation: Option<Mat33>,
    /// Per-axis Q1.15 scale
    pub scale: [u16; 3],
    /// Last normalized sample
    pub last: Vec3,
    /// An offset was programmed by [`crate::AccelGyro::set_offset`] or the
    /// chip's own calibration
    pub calibrated: bool,
}

impl Channel {
    /// Channel with unity scale and no sample yet
    pub const fn new(sensor_id: u8, rotation: Option<Mat33>) -> Self {
        Self {
            sensor_id,
            rotation,
            scale: [DEFAULT_SCALE; 3],
            last: [0; 3],
            calibrated: false,
        }
    }

    /// `FLAG_*` bits for samples of this channel
    pub const fn sample_flags(&self) -> u8 {
        if self.calibrated { FLAG_CALIBRATED } else { 0 }
    }

    /// Rotate into the device frame, then scale
    #[must_use]
    pub fn normalize(&self, raw: Vec3) -> Vec3 {
        let v = math::rotate(raw, self.rotation.as_ref());
        [
            math::apply_scale(v[0], self.scale[0]),
            math::apply_scale(v[1], self.scale[1]),
            math::apply_scale(v[2], self.scale[2]),
        ]
    }
}

/// Everything guarded by the chip mutex
pub struct ChipState<T> {
    /// Register bus with bank cache
    pub bus: BankedBus<T>,
    /// Scratch buffer for batched FIFO reads
    pub fifo_buffer: [u8; FIFO_BUFFER],
    /// Bit `n` set when sensor type `n` delivers through the FIFO
    pub fifo_en: u8,
    /// Serial bus in use
    pub bus_kind: BusKind,
    /// Deadline of the pending start-up or shut-down window per channel
    stabilize: [Option<u32>; 2],
    channels: [Option<Channel>; 2],
}

impl<T> ChipState<T>
where
    T: RegisterInterface<AddressType = u8>,
{
    fn new(bus: BankedBus<T>, bus_kind: BusKind) -> Self {
        Self {
            bus,
            fifo_buffer: [0; FIFO_BUFFER],
            fifo_en: 0,
            bus_kind,
            stabilize: [None; 2],
            channels: [None; 2],
        }
    }

    /// Start a stabilization window of `window_us` for `sensor_type`
    ///
    /// A zero window clears any pending one.
    pub fn set_stabilize(&mut self, sensor_type: SensorType, now: u32, window_us: u32) {
        let Some(idx) = sensor_type.inertial_index() else {
            return;
        };
        self.stabilize[idx] = (window_us != 0).then(|| now.wrapping_add(window_us));
    }

    /// Microseconds left in the pending window, 0 when there is none
    ///
    /// Negative once the deadline has passed.
    pub fn stabilize_remaining(&self, sensor_type: SensorType, now: u32) -> i32 {
        sensor_type
            .inertial_index()
            .and_then(|idx| self.stabilize[idx])
            .map_or(0, |deadline| deadline.wrapping_sub(now) as i32)
    }

    /// Whether `sensor_type` output can be trusted at `now`
    ///
    /// The window is cleared once `now` is past its deadline. A `now` taken
    /// before the window opened leaves it pending.
    pub fn check_stabilized(&mut self, sensor_type: SensorType, now: u32) -> bool {
        if self.is_stabilizing(sensor_type, now) {
            return false;
        }
        if let Some(idx) = sensor_type.inertial_index() {
            self.stabilize[idx] = None;
        }
        true
    }

    /// Whether `sensor_type` is still inside its window at `now`
    ///
    /// The deadline is compared as a signed distance, so the free-running
    /// counter may wrap in between.
    pub fn is_stabilizing(&self, sensor_type: SensorType, now: u32) -> bool {
        self.stabilize_remaining(sensor_type, now) > 0
    }

    /// Register the channel of `sensor_type` for the bottom half
    pub fn set_channel(&mut self, sensor_type: SensorType, channel: Channel) {
        if let Some(idx) = sensor_type.inertial_index() {
            self.channels[idx] = Some(channel);
        }
    }

    /// Registered channel of `sensor_type`
    pub fn channel(&self, sensor_type: SensorType) -> Option<&Channel> {
        sensor_type
            .inertial_index()
            .and_then(|idx| self.channels[idx].as_ref())
    }

    /// Mutable access to the registered channel of `sensor_type`
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidParam`] if the channel was never initialized.
    pub fn channel_mut(
        &mut self,
        sensor_type: SensorType,
    ) -> Result<&mut Channel, Error<T::Error>> {
        sensor_type
            .inertial_index()
            .and_then(|idx| self.channels[idx].as_mut())
            .ok_or(Error::InvalidParam)
    }
}

/// One physical chip shared by its sensor channels
///
/// `M` should be a task-level raw mutex. The chip is only driven from task
/// context; the interrupt top half goes through [`crate::interrupt::IrqLine`].
pub struct Chip<M: RawMutex, T, C> {
    state: Mutex<M, RefCell<ChipState<T>>>,
    clock: C,
}

impl<M, T, C> Chip<M, T, C>
where
    M: RawMutex,
    T: RegisterInterface<AddressType = u8>,
    C: Clock,
{
    /// Wrap the transport of one chip
    pub fn new(transport: T, config: ChipConfig, clock: C) -> Self {
        let bus = match config.bank_select {
            Some(select) => BankedBus::banked(transport, select),
            None => BankedBus::flat(transport),
        };
        Self {
            state: Mutex::new(RefCell::new(ChipState::new(bus, config.bus))),
            clock,
        }
    }

    /// Current time from the chip clock
    pub fn now_us(&self) -> u32 {
        self.clock.now_us()
    }

    /// Run `f` with exclusive access to the chip state
    ///
    /// Must not be re-entered from inside `f`, and `f` must not sleep.
    pub fn lock<R>(&self, f: impl FnOnce(&mut ChipState<T>) -> R) -> R {
        self.state.lock(|cell| f(&mut cell.borrow_mut()))
    }
}
