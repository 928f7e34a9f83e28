//! Power-state driven rate selection
//!
//! Each sensor carries one rate request from the host (AP slot) and one per
//! system power state from the embedded controller. The effective rate is
//! the faster of the two, except in S5 where the host is gone and only the
//! controller's request counts.

use crate::Error;
use crate::driver::AccelGyro;
use crate::sensor::{OdrConfig, SensorConfig, config_slot};

/// System power state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PowerState {
    /// Running
    S0,
    /// Suspended to RAM
    S3,
    /// Off
    #[default]
    S5,
}

impl PowerState {
    /// Controller config slot used in this state
    #[must_use]
    pub const fn ec_slot(self) -> usize {
        match self {
            Self::S0 => config_slot::EC_S0,
            Self::S3 => config_slot::EC_S3,
            Self::S5 => config_slot::EC_S5,
        }
    }
}

/// Outcome of [`select_data_rate`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AppliedRate {
    /// Config slot the rate came from
    pub slot: usize,
    /// Rate the driver settled on, in mHz
    pub odr_mhz: u32,
    /// Samples per host sample, 0 when the host wants none
    pub oversampling_ratio: u32,
    /// Time between two samples at the applied rate, 0 when off
    pub collection_period_us: u32,
    /// Controller collection interval of the chosen slot, 0 when the
    /// controller does not poll
    pub ec_rate_us: u32,
}

/// Slot and rate wanted for `config` in `state`
///
/// The host slot wins ties.
#[must_use]
pub fn requested_rate(config: &SensorConfig, state: PowerState) -> (usize, OdrConfig) {
    let ap = if state == PowerState::S5 {
        0
    } else {
        config.odr[config_slot::AP].odr_mhz
    };
    let slot = state.ec_slot();
    if config.odr[slot].odr_mhz > ap {
        (slot, config.odr[slot])
    } else {
        (
            config_slot::AP,
            OdrConfig {
                odr_mhz: ap,
                ..config.odr[config_slot::AP]
            },
        )
    }
}

/// Apply the rate `sensor` should run at in `state`
///
/// # Errors
///
/// Returns whatever the driver's `set_data_rate` returns.
pub fn select_data_rate<S>(sensor: &mut S, state: PowerState) -> Result<AppliedRate, Error<S::BusError>>
where
    S: AccelGyro + ?Sized,
{
    let (slot, request) = requested_rate(sensor.config(), state);
    sensor.set_data_rate(request.odr_mhz, request.round_up)?;

    let odr_mhz = sensor.get_data_rate();
    let ap = if state == PowerState::S5 {
        0
    } else {
        sensor.config().odr[config_slot::AP].odr_mhz
    };

    #[cfg(feature = "defmt")]
    defmt::debug!(
        "sensor {}: odr {} mHz from slot {} (requested {})",
        sensor.config().sensor_id,
        odr_mhz,
        slot,
        request.odr_mhz
    );

    Ok(AppliedRate {
        slot,
        odr_mhz,
        // A host asking faster than the chip can go still gets every sample
        oversampling_ratio: if ap == 0 { 0 } else { (odr_mhz / ap).max(1) },
        collection_period_us: if odr_mhz == 0 {
            0
        } else {
            (1_000_000_000u64 / u64::from(odr_mhz)) as u32
        },
        ec_rate_us: request.ec_rate_us,
    })
}
