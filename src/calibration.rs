//! Offset unit conversion shared by the chip drivers
//!
//! Offsets travel through the contract in service units (1/1024 g or
//! 1/1024 dps) in the device frame. Chips store them in their own LSB, in the
//! sensor frame, in a signed field of limited width. [`OffsetFormat`]
//! describes one such field; [`to_chip`] and [`from_chip`] convert both ways,
//! rotating at the boundary so nothing is ever stored pre-rotated.

use crate::math::{self, Mat33, Vec3};

/// Signed offset field of a chip
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OffsetFormat {
    /// Service units per `lsb_div` chip LSB
    pub lsb_mul: i64,
    /// See `lsb_mul`
    pub lsb_div: i64,
    /// Width of the register field, sign included
    pub bits: u32,
}

impl OffsetFormat {
    /// Field where one LSB equals `lsb_mul / lsb_div` service units
    pub const fn new(lsb_mul: i64, lsb_div: i64, bits: u32) -> Self {
        Self {
            lsb_mul,
            lsb_div,
            bits,
        }
    }

    /// Service units to a clamped chip LSB count
    #[must_use]
    pub fn encode(&self, value: i32) -> i32 {
        let lsb = math::round_divide(i64::from(value) * self.lsb_div, self.lsb_mul);
        math::clamp_signed(lsb, self.bits)
    }

    /// Chip LSB count to service units
    #[must_use]
    pub fn decode(&self, lsb: i32) -> i32 {
        math::round_divide(i64::from(lsb) * self.lsb_mul, self.lsb_div) as i32
    }

    /// Largest service value the field can hold
    #[must_use]
    pub fn max_value(&self) -> i32 {
        self.decode((1 << (self.bits - 1)) - 1)
    }
}

/// Device-frame offset to clamped chip LSBs in the sensor frame
#[must_use]
pub fn to_chip(offset: [i16; 3], rotation: Option<&Mat33>, format: &OffsetFormat) -> Vec3 {
    let v = math::rotate_inv(offset.map(i32::from), rotation);
    v.map(|axis| format.encode(axis))
}

/// Chip LSBs in the sensor frame to a device-frame offset
#[must_use]
pub fn from_chip(raw: Vec3, rotation: Option<&Mat33>, format: &OffsetFormat) -> [i16; 3] {
    let v = math::rotate(raw.map(|lsb| format.decode(lsb)), rotation);
    v.map(|axis| axis.clamp(i32::from(i16::MIN), i32::from(i16::MAX)) as i16)
}
