//! Start-up windows and polled reads

use accelgyro::{AccelGyro, Error, SampleQueue, SensorState};

use crate::common::Rig;

const ICM_ACCEL_DATA: u8 = 0x1F;
const ICM_INT_STATUS: u8 = 0x2D;
// Reset done | FIFO threshold
const ICM_FIFO_THS: u8 = 0x14;
const BMI_STATUS: u8 = 0x1B;
const BMI_ACC_DATA: u8 = 0x12;

#[test]
fn test_read_busy_until_accel_settles() {
    let rig = Rig::icm();
    let (mut accel, _gyro) = rig.icm_pair();
    rig.mock.set_xyz(ICM_ACCEL_DATA, [1, 2, 3]);

    accel.set_data_rate(100_000, false).unwrap();
    assert_eq!(accel.read(), Err(Error::Busy));
    assert_eq!(accel.sensor_state(), SensorState::Stabilizing);

    rig.time.advance(20_000);
    assert_eq!(accel.read(), Ok([1, 2, 3]));
    assert_eq!(accel.sensor_state(), SensorState::Active);
}

#[test]
fn test_gyro_window_is_longer() {
    let rig = Rig::icm();
    let (_accel, mut gyro) = rig.icm_pair();

    gyro.set_data_rate(100_000, false).unwrap();
    rig.time.advance(30_000);
    assert_eq!(gyro.read(), Err(Error::Busy));

    rig.time.advance(30_000);
    assert!(gyro.read().is_ok());
}

#[test]
fn test_window_across_clock_rollover() {
    let rig = Rig::icm();
    let (mut accel, _gyro) = rig.icm_pair();
    rig.time.set(u32::MAX - 5_000);

    accel.set_data_rate(100_000, false).unwrap();
    assert_eq!(accel.read(), Err(Error::Busy));

    rig.time.advance(20_000);
    assert!(rig.time.now() < 20_000);
    assert!(accel.read().is_ok());
}

#[test]
fn test_stale_timestamp_keeps_window_open() {
    let rig = Rig::icm();
    let (mut accel, _gyro) = rig.icm_pair();
    rig.time.set(1_000_000);
    let enabled_at = rig.time.now();
    accel.set_data_rate(100_000, false).unwrap();

    // Edge recorded just before the sensor was switched on
    rig.mock.set_register(0, ICM_INT_STATUS, ICM_FIFO_THS);
    rig.mock.push_fifo(&[0x40, 1, 0, 2, 0, 3, 0, 0x19]);
    let mut queue = SampleQueue::<8>::new();
    accel.irq_handler(enabled_at.wrapping_sub(100), &mut queue).unwrap();
    assert!(queue.is_empty());

    rig.mock.set_xyz(ICM_ACCEL_DATA, [1, 2, 3]);
    assert_eq!(accel.read(), Err(Error::Busy));
    assert_eq!(accel.sensor_state(), SensorState::Stabilizing);

    rig.time.advance(20_000);
    assert_eq!(accel.read(), Ok([1, 2, 3]));
}

#[test]
fn test_gyro_minimum_off_time() {
    let rig = Rig::icm();
    let (_accel, mut gyro) = rig.icm_pair();
    gyro.set_data_rate(100_000, false).unwrap();
    rig.time.advance(100_000);

    gyro.set_data_rate(0, false).unwrap();
    let off_at = rig.time.now();
    gyro.set_data_rate(100_000, false).unwrap();

    // Power-up waited out the 150 ms the gyro must stay off
    assert!(rig.time.now().wrapping_sub(off_at) >= 150_000);
}

#[test]
fn test_accel_restarts_without_waiting() {
    let rig = Rig::icm();
    let (mut accel, _gyro) = rig.icm_pair();
    accel.set_data_rate(100_000, false).unwrap();
    rig.time.advance(30_000);

    accel.set_data_rate(0, false).unwrap();
    let off_at = rig.time.now();
    accel.set_data_rate(100_000, false).unwrap();

    assert!(rig.time.now().wrapping_sub(off_at) < 1_000);
}

#[test]
fn test_invalid_sample_keeps_last_value() {
    let rig = Rig::icm();
    let (mut accel, _gyro) = rig.icm_pair();

    rig.mock.set_xyz(ICM_ACCEL_DATA, [10, -20, 30]);
    assert_eq!(accel.read(), Ok([10, -20, 30]));

    rig.mock.set_xyz(ICM_ACCEL_DATA, [i16::MIN; 3]);
    assert_eq!(accel.read(), Ok([10, -20, 30]));
}

#[test]
fn test_bmi_read_waits_for_data_ready() {
    let rig = Rig::bmi();
    let (mut accel, _gyro) = rig.bmi_pair();
    accel.set_data_rate(100_000, false).unwrap();
    // Wake-up is waited out inside set_data_rate
    assert_eq!(accel.sensor_state(), SensorState::Active);

    rig.mock.set_xyz(BMI_ACC_DATA, [7, 8, 9]);
    assert_eq!(accel.read(), Ok([0, 0, 0]));

    rig.mock.set_register(0, BMI_STATUS, 0x80);
    assert_eq!(accel.read(), Ok([7, 8, 9]));

    rig.mock.set_register(0, BMI_STATUS, 0x00);
    rig.mock.set_xyz(BMI_ACC_DATA, [1, 1, 1]);
    assert_eq!(accel.read(), Ok([7, 8, 9]));
}
