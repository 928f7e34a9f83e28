#![no_std]
#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

pub mod bank;
pub mod bmi160;
pub mod calibration;
pub mod chip;
pub mod driver;
pub mod fifo;
pub mod icm426xx;
pub mod interface;
pub mod interrupt;
pub mod math;
pub mod motion_sense;
pub mod sensor;

// Re-export main types
pub use bank::BankedBus;
pub use bmi160::Bmi160;
pub use chip::{BusKind, Chip, ChipConfig, ChipState, Clock};
pub use driver::AccelGyro;
pub use fifo::{CommitStatus, Sample, SampleQueue, SampleSink};
pub use icm426xx::Icm426xx;
pub use interface::{I2cInterface, SpiInterface};
pub use interrupt::IrqLine;
pub use math::{Fp, Mat33, Vec3};
pub use motion_sense::PowerState;
pub use sensor::{Location, OdrConfig, SensorConfig, SensorState, SensorType};

/// Unity scale factor applied to normalized samples (1.0 in Q1.15)
pub const DEFAULT_SCALE: u16 = 1 << 15;

/// Calibration temperature reported when the chip does not record one
pub const INVALID_CALIB_TEMP: i16 = i16::MIN;

/// Resolution, in bits, of the samples produced by every supported chip
pub const RESOLUTION_BITS: u8 = 16;

/// Convert a temperature in degrees Celsius to Kelvin
#[must_use]
pub const fn celsius_to_kelvin(celsius: i32) -> i32 {
    celsius + 273
}

/// Driver errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error<E> {
    /// Communication error with the device
    Bus(E),
    /// Identity register did not match the expected chip (contains the value read)
    InvalidDevice(u8),
    /// Parameter outside what the sensor supports
    InvalidParam,
    /// Sensor reported its "no valid reading" sentinel on every axis
    InvalidData,
    /// Sensor is still inside its start-up window, retry later
    Busy,
    /// Hardware FIFO outgrew the decode buffer and was flushed
    Overflow,
    /// Calibration did not complete in time
    Timeout,
    /// FIFO packet header is malformed
    Decode,
    /// Interrupt event is not owned by this sensor
    NotHandled,
    /// Temperature sensor is powered down
    NotPowered,
    /// Gyroscope initialized before its accelerometer sibling
    InitOrder,
    /// Operation not provided by this chip family
    Unsupported,
}

impl<E> From<E> for Error<E> {
    fn from(error: E) -> Self {
        Self::Bus(error)
    }
}
