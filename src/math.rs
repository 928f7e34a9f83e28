//! Fixed-point rotation and scaling
//!
//! Rotation matrices are Q16.16 signed integers. Vectors are plain `i32`
//! triples in sensor LSBs or service units. Products are computed in `i64`
//! and saturated back into `i32`, so no input can wrap.

/// Q16.16 fixed-point value
pub type Fp = i32;

/// Three-axis integer vector
pub type Vec3 = [i32; 3];

/// 3x3 Q16.16 matrix, row-major
pub type Mat33 = [[Fp; 3]; 3];

/// Number of fractional bits in [`Fp`]
pub const FP_BITS: u32 = 16;

/// Convert an integer to [`Fp`]
#[must_use]
pub const fn int_to_fp(value: i32) -> Fp {
    value << FP_BITS
}

/// Convert [`Fp`] to an integer, rounding toward negative infinity
#[must_use]
pub const fn fp_to_int(value: Fp) -> i32 {
    value >> FP_BITS
}

/// Identity rotation
pub const IDENTITY: Mat33 = [
    [int_to_fp(1), 0, 0],
    [0, int_to_fp(1), 0],
    [0, 0, int_to_fp(1)],
];

fn saturate(value: i64) -> i32 {
    value.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}

/// Rotate `v` into the device frame: `res[i] = sum_j v[j] * R[j][i]`
///
/// `None` stands for the identity matrix.
#[must_use]
pub fn rotate(v: Vec3, r: Option<&Mat33>) -> Vec3 {
    let Some(r) = r else {
        return v;
    };

    let mut res = [0; 3];
    for (i, out) in res.iter_mut().enumerate() {
        let acc: i64 = (0..3).map(|j| i64::from(v[j]) * i64::from(r[j][i])).sum();
        *out = saturate(acc >> FP_BITS);
    }
    res
}

/// Rotate `v` back into the sensor frame using the transpose of `r`
///
/// Rotation matrices are orthonormal, so the transpose is the inverse.
#[must_use]
pub fn rotate_inv(v: Vec3, r: Option<&Mat33>) -> Vec3 {
    let Some(r) = r else {
        return v;
    };

    let mut res = [0; 3];
    for (i, out) in res.iter_mut().enumerate() {
        let acc: i64 = (0..3).map(|j| i64::from(v[j]) * i64::from(r[i][j])).sum();
        *out = saturate(acc >> FP_BITS);
    }
    res
}

/// Apply a Q1.15 scale factor (`crate::DEFAULT_SCALE` is unity)
#[must_use]
pub fn apply_scale(value: i32, scale: u16) -> i32 {
    saturate(i64::from(value) * i64::from(scale) / i64::from(crate::DEFAULT_SCALE))
}

/// Divide rounding half away from zero
///
/// `divisor` must not be zero.
#[must_use]
pub fn round_divide(dividend: i64, divisor: i64) -> i64 {
    if (dividend > 0) ^ (divisor > 0) {
        (dividend - divisor / 2) / divisor
    } else {
        (dividend + divisor / 2) / divisor
    }
}

/// Sign-extend a two's complement value whose sign bit is `sign_bit`
#[must_use]
pub const fn sign_extend(value: u32, sign_bit: u32) -> i32 {
    let shift = 31 - sign_bit;
    ((value << shift) as i32) >> shift
}

/// Clamp into the signed range representable with `bits` bits
#[must_use]
pub fn clamp_signed(value: i64, bits: u32) -> i32 {
    let max = (1i64 << (bits - 1)) - 1;
    let min = -(1i64 << (bits - 1));
    value.clamp(min, max) as i32
}
