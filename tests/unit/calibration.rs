//! Offsets, scale and on-chip calibration

use accelgyro::math::{Mat33, int_to_fp};
use accelgyro::{AccelGyro, Bmi160, DEFAULT_SCALE, Error, INVALID_CALIB_TEMP, Icm426xx};

use crate::common::{Rig, accel_config};

// ICM-426xx user offset registers (bank 4)
const ICM_OFFSET_USER4: u8 = 0x7B;
const ICM_OFFSET_USER5: u8 = 0x7C;

// BMI160 registers
const BMI_ACC_CONF: u8 = 0x40;
const BMI_ACC_RANGE: u8 = 0x41;
const BMI_FOC_CONF: u8 = 0x69;
const BMI_OFFSET_EN: u8 = 0x77;

/// Sensor X along device Y, sensor Y along device -X
const ROT_90_Z: Mat33 = [
    [0, int_to_fp(-1), 0],
    [int_to_fp(1), 0, 0],
    [0, 0, int_to_fp(1)],
];

/// Mounted upside down
const UPSIDE_DOWN: Mat33 = [
    [int_to_fp(1), 0, 0],
    [0, int_to_fp(-1), 0],
    [0, 0, int_to_fp(-1)],
];

#[test]
fn test_icm_offset_round_trip() {
    let rig = Rig::icm();
    let (mut accel, mut gyro) = rig.icm_pair();

    accel.set_offset([100, -200, 300], 0).unwrap();
    assert_eq!(accel.get_offset().unwrap(), ([100, -200, 300], INVALID_CALIB_TEMP));

    // 1/32 dps per LSB: multiples of 32 survive exactly
    gyro.set_offset([64, -320, 1024], 0).unwrap();
    assert_eq!(gyro.get_offset().unwrap().0, [64, -320, 1024]);
}

#[test]
fn test_icm_shared_offset_byte() {
    let rig = Rig::icm();
    let (mut accel, mut gyro) = rig.icm_pair();

    accel.set_offset([1000, 0, 0], 0).unwrap();
    gyro.set_offset([0, 0, -9600], 0).unwrap();

    // Accel X[11:8] in the high nibble, gyro Z[11:8] in the low nibble
    assert_eq!(rig.mock.get_register(4, ICM_OFFSET_USER4), 0x7E);
    assert_eq!(accel.get_offset().unwrap().0, [1000, 0, 0]);
    assert_eq!(gyro.get_offset().unwrap().0, [0, 0, -9600]);

    // Rewriting the accel offset leaves the gyro nibble alone
    accel.set_offset([-1000, 0, 0], 0).unwrap();
    assert_eq!(gyro.get_offset().unwrap().0, [0, 0, -9600]);
}

#[test]
fn test_icm_offset_clamped_to_field() {
    let rig = Rig::icm();
    let (mut accel, _gyro) = rig.icm_pair();

    accel.set_offset([5000, -5000, 0], 0).unwrap();
    assert_eq!(accel.get_offset().unwrap().0, [1024, -1024, 0]);
}

#[test]
fn test_offset_stored_in_sensor_frame() {
    let rig = Rig::icm();
    let mut accel = Icm426xx::new(&rig.chip, accel_config().with_rotation(ROT_90_Z), rig.delay());
    accel.init().unwrap();

    accel.set_offset([10, 20, 30], 0).unwrap();
    // Sensor X is device -Y: -20 in 1/1024 g is -40 chip LSB
    assert_eq!(rig.mock.get_register(4, ICM_OFFSET_USER5), (-40i8) as u8);
    assert_eq!(accel.get_offset().unwrap().0, [10, 20, 30]);
}

#[test]
fn test_bmi_offset_round_trip() {
    let rig = Rig::bmi();
    let (mut accel, mut gyro) = rig.bmi_pair();

    // 3.9 mg per LSB
    accel.set_offset([40, -40, 0], 0).unwrap();
    assert_eq!(accel.get_offset().unwrap(), ([40, -40, 0], INVALID_CALIB_TEMP));

    // 0.061 dps per LSB, 10-bit: high bits live in OFFSET_6
    gyro.set_offset([6246, -18739, 0], 0).unwrap();
    assert_eq!(gyro.get_offset().unwrap().0, [6246, -18739, 0]);

    assert_eq!(rig.mock.get_register(0, BMI_OFFSET_EN), 0x80 | 0x40 | 0x08);
}

#[test]
fn test_scale_applied_to_samples() {
    let rig = Rig::icm();
    let (mut accel, _gyro) = rig.icm_pair();
    assert_eq!(accel.get_scale().unwrap(), ([DEFAULT_SCALE; 3], INVALID_CALIB_TEMP));

    let scale = [DEFAULT_SCALE / 2, DEFAULT_SCALE, DEFAULT_SCALE];
    accel.set_scale(scale, 0).unwrap();
    assert_eq!(accel.get_scale().unwrap().0, scale);

    rig.mock.set_xyz(0x1F, [100, 100, -100]);
    assert_eq!(accel.read().unwrap(), [50, 100, -100]);
}

#[test]
fn test_scale_requires_init() {
    let rig = Rig::icm();
    let mut accel = Icm426xx::new(&rig.chip, accel_config(), rig.delay());
    assert_eq!(accel.set_scale([DEFAULT_SCALE; 3], 0), Err(Error::InvalidParam));
    assert_eq!(accel.get_scale(), Err(Error::InvalidParam));
}

#[test]
fn test_icm_has_no_self_calibration() {
    let rig = Rig::icm();
    let (mut accel, _gyro) = rig.icm_pair();
    assert_eq!(accel.perform_calib(true), Err(Error::Unsupported));
    assert_eq!(accel.perform_calib(false), Ok(()));
}

#[test]
fn test_bmi_accel_foc() {
    let rig = Rig::bmi();
    let (mut accel, _gyro) = rig.bmi_pair();
    accel.set_data_rate(50_000, false).unwrap();
    rig.mock.set_foc_completes(true);

    accel.perform_calib(true).unwrap();

    // X and Y at 0 g, Z at +1 g
    assert_eq!(rig.mock.writes_to(0, BMI_FOC_CONF), vec![0x3D]);
    // Calibrated at the narrowest range
    assert!(rig.mock.writes_to(0, BMI_ACC_RANGE).contains(&0x03));
    assert_ne!(rig.mock.get_register(0, BMI_OFFSET_EN) & 0x40, 0);

    // Range and rate are back where they were
    assert_eq!(accel.get_range(), 4);
    assert_eq!(accel.get_data_rate(), 50_000);
    assert_eq!(rig.mock.get_register(0, BMI_ACC_RANGE), 0x05);
    assert_eq!(rig.mock.get_register(0, BMI_ACC_CONF) & 0x0F, 7);
}

#[test]
fn test_bmi_foc_target_follows_mounting() {
    let rig = Rig::bmi();
    let mut accel = Bmi160::new(&rig.chip, accel_config().with_rotation(UPSIDE_DOWN), rig.delay());
    accel.init().unwrap();
    rig.mock.set_foc_completes(true);

    accel.perform_calib(true).unwrap();
    // Z at -1 g
    assert_eq!(rig.mock.writes_to(0, BMI_FOC_CONF), vec![0x3E]);
}

#[test]
fn test_bmi_gyro_foc() {
    let rig = Rig::bmi();
    let (_accel, mut gyro) = rig.bmi_pair();
    rig.mock.set_foc_completes(true);

    gyro.perform_calib(true).unwrap();

    assert_eq!(rig.mock.writes_to(0, BMI_FOC_CONF), vec![0x40]);
    assert_ne!(rig.mock.get_register(0, BMI_OFFSET_EN) & 0x80, 0);
    assert_eq!(gyro.get_range(), 1000);
    assert_eq!(gyro.get_data_rate(), 0);
}

#[test]
fn test_bmi_foc_timeout_restores_config() {
    let rig = Rig::bmi();
    let (mut accel, _gyro) = rig.bmi_pair();
    accel.set_data_rate(50_000, false).unwrap();
    let start = rig.time.now();

    assert_eq!(accel.perform_calib(true), Err(Error::Timeout));

    assert!(rig.time.now().wrapping_sub(start) >= 400_000);
    assert_eq!(rig.mock.get_register(0, BMI_OFFSET_EN) & 0x40, 0);
    assert_eq!(accel.get_range(), 4);
    assert_eq!(accel.get_data_rate(), 50_000);
    assert_eq!(rig.mock.get_register(0, BMI_ACC_RANGE), 0x05);
    assert_eq!(rig.mock.get_register(0, BMI_ACC_CONF) & 0x0F, 7);
}

#[test]
fn test_bmi_calibration_disabled_is_noop() {
    let rig = Rig::bmi();
    let (mut accel, _gyro) = rig.bmi_pair();
    rig.mock.clear_operations();

    accel.perform_calib(false).unwrap();
    assert!(rig.mock.operations().is_empty());
}
