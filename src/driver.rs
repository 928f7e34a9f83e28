//! Chip-independent sensor contract
//!
//! The motion-sensing service only talks to sensors through [`AccelGyro`].
//! Chip families implement it side by side; nothing is shared by inheritance.
//!
//! Units:
//! - range: g for accelerometers, dps for gyroscopes
//! - rate: mHz, 0 turns the sensor off
//! - offset: 1/1024 g or 1/1024 dps, device frame
//! - scale: Q1.15, [`crate::DEFAULT_SCALE`] is unity
//! - temperature: Kelvin

use crate::Error;
use crate::fifo::SampleSink;
use crate::math::Vec3;
use crate::sensor::{SensorConfig, SensorState};

/// Operations every sensor channel provides
///
/// The trait is object safe: `&mut dyn AccelGyro<BusError = E>` lets the
/// service hold channels from different chip families in one table.
pub trait AccelGyro {
    /// Transport error of the underlying bus
    type BusError;

    /// Static description of this channel
    fn config(&self) -> &SensorConfig;

    /// Lifecycle state at this instant
    fn sensor_state(&self) -> SensorState;

    /// Bring the channel up: identity check, chip reset (first channel only),
    /// default range and scale
    ///
    /// # Errors
    ///
    /// [`Error::InvalidDevice`] when the chip identity does not match,
    /// [`Error::InitOrder`] when a sibling channel must be initialized first,
    /// or any bus error.
    fn init(&mut self) -> Result<(), Error<Self::BusError>>;

    /// Check the chip identity without touching its configuration
    ///
    /// # Errors
    ///
    /// [`Error::InvalidDevice`] on mismatch, or a bus error.
    fn probe(&mut self) -> Result<(), Error<Self::BusError>>;

    /// Latest normalized sample
    ///
    /// # Errors
    ///
    /// [`Error::Busy`] while the sensor is stabilizing, or a bus error.
    fn read(&mut self) -> Result<Vec3, Error<Self::BusError>>;

    /// Die temperature in Kelvin
    ///
    /// # Errors
    ///
    /// [`Error::NotPowered`] when the temperature sensor is off, or a bus error.
    fn read_temp(&mut self) -> Result<i32, Error<Self::BusError>>;

    /// Select the range closest to `range`
    ///
    /// Rounds down unless `round_up` is set.
    ///
    /// # Errors
    ///
    /// Returns a bus error; the current range is unchanged on failure.
    fn set_range(&mut self, range: u32, round_up: bool) -> Result<(), Error<Self::BusError>>;

    /// Range currently applied
    fn get_range(&self) -> u32;

    /// Sample resolution in bits
    fn get_resolution(&self) -> u8 {
        crate::RESOLUTION_BITS
    }

    /// Set the output data rate, 0 to turn the sensor off
    ///
    /// # Errors
    ///
    /// [`Error::InvalidParam`] if the rounded rate falls outside what the chip
    /// and the board allow, or a bus error.
    fn set_data_rate(&mut self, rate_mhz: u32, round_up: bool) -> Result<(), Error<Self::BusError>>;

    /// Rate currently applied, in mHz
    fn get_data_rate(&self) -> u32;

    /// Program the offset, given in the device frame
    ///
    /// # Errors
    ///
    /// Returns a bus error.
    fn set_offset(&mut self, offset: [i16; 3], temp: i16) -> Result<(), Error<Self::BusError>>;

    /// Programmed offset in the device frame, with the calibration temperature
    ///
    /// # Errors
    ///
    /// Returns a bus error.
    fn get_offset(&mut self) -> Result<([i16; 3], i16), Error<Self::BusError>>;

    /// Set the per-axis scale
    ///
    /// # Errors
    ///
    /// [`Error::InvalidParam`] if the channel is not initialized.
    fn set_scale(&mut self, scale: [u16; 3], temp: i16) -> Result<(), Error<Self::BusError>>;

    /// Per-axis scale with the calibration temperature
    ///
    /// # Errors
    ///
    /// [`Error::InvalidParam`] if the channel is not initialized.
    fn get_scale(&mut self) -> Result<([u16; 3], i16), Error<Self::BusError>>;

    /// Run the chip's own offset calibration
    ///
    /// # Errors
    ///
    /// [`Error::Unsupported`] unless the chip calibrates itself,
    /// [`Error::Timeout`] if it did not finish in time.
    fn perform_calib(&mut self, enable: bool) -> Result<(), Error<Self::BusError>> {
        if enable {
            Err(Error::Unsupported)
        } else {
            Ok(())
        }
    }

    /// Interrupt bottom half: drain the FIFO into `sink`
    ///
    /// `timestamp` is the time recorded by the top half.
    ///
    /// # Errors
    ///
    /// [`Error::NotHandled`] when the interrupt is not owned by this channel,
    /// [`Error::Overflow`] when the FIFO had to be flushed,
    /// [`Error::Decode`] on a malformed packet, or a bus error.
    fn irq_handler(
        &mut self,
        _timestamp: u32,
        _sink: &mut dyn SampleSink,
    ) -> Result<(), Error<Self::BusError>> {
        Err(Error::NotHandled)
    }
}
