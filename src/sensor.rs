//! Sensor channel description and per-channel saved state

use crate::math::Mat33;

/// Kind of measurement a sensor channel produces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SensorType {
    /// Accelerometer, range in g, offsets in 1/1024 g
    Accel = 0,
    /// Gyroscope, range in dps, offsets in 1/1024 dps
    Gyro = 1,
    /// Magnetometer behind a combo chip
    Mag = 2,
    /// Ambient light
    Light = 3,
    /// Sync event input
    Sync = 4,
}

impl SensorType {
    /// Index of the inertial channels in per-chip tables
    pub(crate) const fn inertial_index(self) -> Option<usize> {
        match self {
            Self::Accel => Some(0),
            Self::Gyro => Some(1),
            _ => None,
        }
    }
}

/// Where the sensor is mounted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Location {
    /// Base of a clamshell
    #[default]
    Base,
    /// Lid of a clamshell
    Lid,
    /// Camera module
    Camera,
}

/// Desired output rate for one power state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct OdrConfig {
    /// Output data rate in mHz, 0 when off
    pub odr_mhz: u32,
    /// Prefer the next faster rate when no exact match exists
    pub round_up: bool,
    /// Interval at which the EC collects samples, in microseconds
    pub ec_rate_us: u32,
}

impl OdrConfig {
    /// Sensor off in this power state
    pub const OFF: Self = Self {
        odr_mhz: 0,
        round_up: false,
        ec_rate_us: 0,
    };

    /// Rate in mHz with the given rounding
    pub const fn new(odr_mhz: u32, round_up: bool) -> Self {
        Self {
            odr_mhz,
            round_up,
            ec_rate_us: 0,
        }
    }

    /// Same rate, collected by the controller every `ec_rate_us`
    #[must_use]
    pub const fn with_ec_rate(mut self, ec_rate_us: u32) -> Self {
        self.ec_rate_us = ec_rate_us;
        self
    }
}

/// Slots of [`SensorConfig::odr`]
pub mod config_slot {
    /// Requested by the application processor
    pub const AP: usize = 0;
    /// EC needs while the AP is on
    pub const EC_S0: usize = 1;
    /// EC needs while the AP is suspended
    pub const EC_S3: usize = 2;
    /// EC needs while the AP is off
    pub const EC_S5: usize = 3;
}

/// Static board description of one sensor channel
///
/// Everything here is fixed at construction except the range, which the
/// driver updates when `set_range` succeeds.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SensorConfig {
    /// Index of the channel in the sample stream
    pub sensor_id: u8,
    /// Kind of channel
    pub sensor_type: SensorType,
    /// Mounting location
    pub location: Location,
    /// Mounting rotation into the device frame, `None` for identity
    pub rotation: Option<Mat33>,
    /// Range applied at init (g or dps)
    pub default_range: u32,
    /// Slowest rate the board allows, in mHz
    pub min_frequency: u32,
    /// Fastest rate the board allows, in mHz
    pub max_frequency: u32,
    /// Rate per power state, indexed by [`config_slot`]
    pub odr: [OdrConfig; 4],
}

impl SensorConfig {
    /// Channel with identity rotation and no board frequency limits
    pub const fn new(sensor_id: u8, sensor_type: SensorType, default_range: u32) -> Self {
        Self {
            sensor_id,
            sensor_type,
            location: Location::Base,
            rotation: None,
            default_range,
            min_frequency: 0,
            max_frequency: u32::MAX,
            odr: [OdrConfig::OFF; 4],
        }
    }

    /// Set the mounting rotation
    #[must_use]
    pub const fn with_rotation(mut self, rotation: Mat33) -> Self {
        self.rotation = Some(rotation);
        self
    }

    /// Set the mounting location
    #[must_use]
    pub const fn with_location(mut self, location: Location) -> Self {
        self.location = location;
        self
    }

    /// Restrict the allowed rates to `min..=max` mHz
    #[must_use]
    pub const fn with_frequency_limits(mut self, min: u32, max: u32) -> Self {
        self.min_frequency = min;
        self.max_frequency = max;
        self
    }

    /// Set the rate wanted in the given [`config_slot`]
    #[must_use]
    pub const fn with_odr(mut self, slot: usize, odr: OdrConfig) -> Self {
        self.odr[slot] = odr;
        self
    }
}

/// Mutable state owned by one driver instance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SavedData {
    /// Current output rate in mHz, 0 when off
    pub odr: u32,
    /// Current range in g or dps
    pub range: u32,
}

impl SavedData {
    /// Sensor off, range not yet applied
    pub const fn new() -> Self {
        Self { odr: 0, range: 0 }
    }
}

impl Default for SavedData {
    fn default() -> Self {
        Self::new()
    }
}

/// Power-up lifecycle of a sensor channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SensorState {
    /// Output rate is zero
    Off,
    /// Enabled, output not trustworthy yet
    Stabilizing,
    /// Enabled and settled
    Active,
}
