//! FIFO draining through the interrupt bottom half

use accelgyro::fifo::FLAG_CALIBRATED;
use accelgyro::{AccelGyro, Error, Icm426xx, Sample, SampleQueue, SampleSink};

use crate::common::{Rig, accel_config};

// ICM-426xx INT_STATUS: reset done | FIFO threshold
const ICM_INT_STATUS: u8 = 0x2D;
const ICM_FIFO_THS: u8 = 0x10 | 0x04;

// BMI160 INT_STATUS_1 (second byte of the 16-bit status read)
const BMI_INT_STATUS_1: u8 = 0x1D;
const BMI_FWM: u8 = 0x40;

fn le(xyz: [i16; 3]) -> Vec<u8> {
    xyz.iter().flat_map(|v| v.to_le_bytes()).collect()
}

fn icm_accel_packet(accel: [i16; 3]) -> Vec<u8> {
    let mut p = vec![0x40];
    p.extend(le(accel));
    p.push(0x19); // temperature
    p
}

fn icm_both_packet(accel: [i16; 3], gyro: [i16; 3]) -> Vec<u8> {
    let mut p = vec![0x60];
    p.extend(le(accel));
    p.extend(le(gyro));
    p.push(0x19);
    p.extend([0x34, 0x12]); // timestamp
    p
}

fn bmi_frame(gyro: Option<[i16; 3]>, accel: Option<[i16; 3]>) -> Vec<u8> {
    let mut header = 0x80;
    let mut p = Vec::new();
    if let Some(g) = gyro {
        header |= 0x08;
        p.extend(le(g));
    }
    if let Some(a) = accel {
        header |= 0x04;
        p.extend(le(a));
    }
    p.insert(0, header);
    p
}

fn drain(queue: &mut SampleQueue<32>) -> Vec<Sample> {
    std::iter::from_fn(|| queue.pop()).collect()
}

/// ICM rig with the accelerometer streaming and settled
fn icm_streaming(rig: &Rig) -> (crate::common::test_utils::TestIcm<'_>, u32) {
    let (mut accel, _gyro) = rig.icm_pair();
    accel.set_data_rate(100_000, false).unwrap();
    rig.time.advance(25_000);
    rig.mock.set_register(0, ICM_INT_STATUS, ICM_FIFO_THS);
    (accel, rig.time.now())
}

#[test]
fn test_icm_packets_in_hardware_order() {
    let rig = Rig::icm();
    let (mut accel, ts) = icm_streaming(&rig);

    rig.mock.push_fifo(&icm_accel_packet([1, 2, 3]));
    rig.mock.push_fifo(&icm_both_packet([4, 5, 6], [7, 8, 9]));
    rig.mock.push_fifo(&icm_accel_packet([10, 11, 12]));

    let mut queue = SampleQueue::<32>::new();
    accel.irq_handler(ts, &mut queue).unwrap();

    assert_eq!(
        drain(&mut queue),
        vec![
            Sample::new(0, [1, 2, 3], ts),
            Sample::new(0, [4, 5, 6], ts),
            Sample::new(1, [7, 8, 9], ts),
            Sample::new(0, [10, 11, 12], ts),
        ]
    );
    assert_eq!(rig.mock.fifo_len(), 0);
}

#[test]
fn test_icm_stops_at_empty_sentinel() {
    let rig = Rig::icm();
    let mut accel = Icm426xx::new(&rig.chip, accel_config(), rig.delay());
    accel.init().unwrap();
    accel.set_data_rate(100_000, false).unwrap();
    rig.time.advance(25_000);
    rig.mock.set_register(0, ICM_INT_STATUS, ICM_FIFO_THS);

    // No gyro channel registered: its half of the combined packet is dropped
    rig.mock.push_fifo(&icm_accel_packet([1, 0, 0]));
    rig.mock.push_fifo(&icm_both_packet([2, 0, 0], [9, 9, 9]));
    rig.mock.push_fifo(&[0x80; 8]);
    rig.mock.push_fifo(&icm_accel_packet([3, 0, 0]));

    let mut queue = SampleQueue::<32>::new();
    accel.irq_handler(rig.time.now(), &mut queue).unwrap();

    let xs: Vec<_> = drain(&mut queue).iter().map(|s| (s.sensor_id, s.xyz[0])).collect();
    assert_eq!(xs, vec![(0, 1), (0, 2)]);
}

#[test]
fn test_icm_samples_are_rotated() {
    let rig = Rig::icm();
    let rotation = [
        [0, accelgyro::math::int_to_fp(-1), 0],
        [accelgyro::math::int_to_fp(1), 0, 0],
        [0, 0, accelgyro::math::int_to_fp(1)],
    ];
    let mut accel = Icm426xx::new(&rig.chip, accel_config().with_rotation(rotation), rig.delay());
    accel.init().unwrap();
    accel.set_data_rate(100_000, false).unwrap();
    rig.time.advance(25_000);
    rig.mock.set_register(0, ICM_INT_STATUS, ICM_FIFO_THS);
    rig.mock.push_fifo(&icm_accel_packet([100, 200, 300]));

    let mut queue = SampleQueue::<32>::new();
    accel.irq_handler(rig.time.now(), &mut queue).unwrap();
    // Device X = sensor Y, device Y = -sensor X
    assert_eq!(queue.pop().map(|s| s.xyz), Some([200, -100, 300]));
}

#[test]
fn test_icm_offset_marks_samples_calibrated() {
    let rig = Rig::icm();
    let (mut accel, ts) = icm_streaming(&rig);
    accel.set_offset([10, 0, 0], 0).unwrap();

    rig.mock.push_fifo(&icm_both_packet([1, 2, 3], [4, 5, 6]));

    let mut queue = SampleQueue::<32>::new();
    accel.irq_handler(ts, &mut queue).unwrap();
    let flags: Vec<_> = drain(&mut queue).iter().map(|s| (s.sensor_id, s.flags)).collect();
    assert_eq!(flags, vec![(0, FLAG_CALIBRATED), (1, 0)]);
}

#[test]
fn test_icm_invalid_samples_skipped() {
    let rig = Rig::icm();
    let (mut accel, ts) = icm_streaming(&rig);

    rig.mock.push_fifo(&icm_accel_packet([i16::MIN; 3]));
    rig.mock.push_fifo(&icm_accel_packet([i16::MIN, 0, 0]));

    let mut queue = SampleQueue::<32>::new();
    accel.irq_handler(ts, &mut queue).unwrap();
    assert_eq!(drain(&mut queue), vec![Sample::new(0, [-32768, 0, 0], ts)]);
}

#[test]
fn test_icm_samples_dropped_while_stabilizing() {
    let rig = Rig::icm();
    let (mut accel, _gyro) = rig.icm_pair();
    accel.set_data_rate(100_000, false).unwrap();
    rig.mock.set_register(0, ICM_INT_STATUS, ICM_FIFO_THS);
    rig.mock.push_fifo(&icm_accel_packet([1, 2, 3]));

    let mut queue = SampleQueue::<32>::new();
    accel.irq_handler(rig.time.now(), &mut queue).unwrap();
    assert!(queue.is_empty());
    assert_eq!(queue.lost(), 0);
}

#[test]
fn test_icm_overflow_flushes() {
    let rig = Rig::icm();
    let (mut accel, ts) = icm_streaming(&rig);
    let flushes = rig.mock.flush_count();

    for _ in 0..13 {
        rig.mock.push_fifo(&icm_accel_packet([1, 1, 1]));
    }

    let mut queue = SampleQueue::<32>::new();
    assert_eq!(accel.irq_handler(ts, &mut queue), Err(Error::Overflow));
    assert_eq!(rig.mock.flush_count(), flushes + 1);
    assert_eq!(rig.mock.fifo_len(), 0);
    assert!(queue.is_empty());
}

#[test]
fn test_icm_malformed_header_aborts_pass() {
    let rig = Rig::icm();
    let (mut accel, ts) = icm_streaming(&rig);

    rig.mock.push_fifo(&icm_accel_packet([1, 1, 1]));
    rig.mock.push_fifo(&[0x00; 8]);
    rig.mock.push_fifo(&icm_accel_packet([2, 2, 2]));

    let mut queue = SampleQueue::<32>::new();
    assert_eq!(accel.irq_handler(ts, &mut queue), Err(Error::Decode));
    // Nothing from the failed pass is published
    assert_eq!(queue.commit().committed, 0);
    assert!(queue.is_empty());
}

#[test]
fn test_icm_high_resolution_packet_is_malformed() {
    let rig = Rig::icm();
    let (mut accel, ts) = icm_streaming(&rig);
    let mut packet = icm_accel_packet([1, 1, 1]);
    packet[0] |= 0x10;
    rig.mock.push_fifo(&packet);

    let mut queue = SampleQueue::<32>::new();
    assert_eq!(accel.irq_handler(ts, &mut queue), Err(Error::Decode));
}

#[test]
fn test_icm_empty_fifo_reported() {
    let rig = Rig::icm();
    let (mut accel, ts) = icm_streaming(&rig);

    let mut queue = SampleQueue::<32>::new();
    assert_eq!(accel.irq_handler(ts, &mut queue), Err(Error::InvalidData));
}

#[test]
fn test_icm_no_threshold_no_read() {
    let rig = Rig::icm();
    let (mut accel, ts) = icm_streaming(&rig);
    rig.mock.set_register(0, ICM_INT_STATUS, 0x10);
    rig.mock.push_fifo(&icm_accel_packet([1, 1, 1]));

    let mut queue = SampleQueue::<32>::new();
    accel.irq_handler(ts, &mut queue).unwrap();
    assert!(queue.is_empty());
    assert_eq!(rig.mock.fifo_len(), 8);
}

#[test]
fn test_gyro_channels_do_not_own_interrupt() {
    let mut queue: SampleQueue<32> = SampleQueue::new();

    let rig = Rig::icm();
    let (_accel, mut gyro) = rig.icm_pair();
    assert_eq!(gyro.irq_handler(0, &mut queue), Err(Error::NotHandled));

    let rig = Rig::bmi();
    let (_accel, mut gyro) = rig.bmi_pair();
    assert_eq!(gyro.irq_handler(0, &mut queue), Err(Error::NotHandled));
}

#[test]
fn test_icm_fifo_config_follows_users() {
    let rig = Rig::icm();
    let (mut accel, mut gyro) = rig.icm_pair();
    let fifo_config1 = || rig.mock.get_register(0, 0x5F) & 0x07;
    let fifo_mode = || rig.mock.get_register(0, 0x16) >> 6;

    accel.set_data_rate(100_000, false).unwrap();
    assert_eq!(fifo_config1(), 0b101);
    assert_eq!(fifo_mode(), 1);

    gyro.set_data_rate(100_000, false).unwrap();
    assert_eq!(fifo_config1(), 0b111);

    accel.set_data_rate(0, false).unwrap();
    // Temperature stays while the gyro still streams
    assert_eq!(fifo_config1(), 0b110);
    assert_eq!(fifo_mode(), 1);

    gyro.set_data_rate(0, false).unwrap();
    assert_eq!(fifo_config1(), 0);
    assert_eq!(fifo_mode(), 0);
}

/// BMI rig with the accelerometer streaming and one FIFO interrupt pending
fn bmi_streaming(rig: &Rig) -> (crate::common::test_utils::TestBmi<'_>, crate::common::test_utils::TestBmi<'_>) {
    let (mut accel, gyro) = rig.bmi_pair();
    accel.set_data_rate(100_000, false).unwrap();
    rig.mock.queue_reads(0, BMI_INT_STATUS_1, &[BMI_FWM]);
    (accel, gyro)
}

#[test]
fn test_bmi_frames_in_order() {
    let rig = Rig::bmi();
    let (mut accel, _gyro) = bmi_streaming(&rig);

    rig.mock.push_fifo(&bmi_frame(None, Some([1, 2, 3])));
    rig.mock.push_fifo(&bmi_frame(Some([7, 8, 9]), Some([4, 5, 6])));

    let mut queue = SampleQueue::<32>::new();
    accel.irq_handler(500, &mut queue).unwrap();

    // Gyro payload precedes accel inside a frame
    assert_eq!(
        drain(&mut queue),
        vec![
            Sample::new(0, [1, 2, 3], 500),
            Sample::new(1, [7, 8, 9], 500),
            Sample::new(0, [4, 5, 6], 500),
        ]
    );
}

#[test]
fn test_bmi_control_frames_skipped() {
    let rig = Rig::bmi();
    let (mut accel, _gyro) = bmi_streaming(&rig);

    rig.mock.push_fifo(&[0x44, 0x01, 0x02, 0x03]); // sensor time
    rig.mock.push_fifo(&[0x40, 0x02]); // skipped frames
    rig.mock.push_fifo(&[0x48, 0x01]); // config change
    rig.mock.push_fifo(&bmi_frame(None, Some([5, 5, 5])));

    let mut queue = SampleQueue::<32>::new();
    accel.irq_handler(1, &mut queue).unwrap();
    assert_eq!(drain(&mut queue), vec![Sample::new(0, [5, 5, 5], 1)]);
}

#[test]
fn test_bmi_unknown_header_flushes_but_keeps_decoded() {
    let rig = Rig::bmi();
    let (mut accel, _gyro) = bmi_streaming(&rig);
    let flushes = rig.mock.flush_count();

    rig.mock.push_fifo(&bmi_frame(None, Some([1, 1, 1])));
    rig.mock.push_fifo(&[0x0C, 0xAA, 0xBB]);

    let mut queue = SampleQueue::<32>::new();
    accel.irq_handler(2, &mut queue).unwrap();
    assert_eq!(drain(&mut queue), vec![Sample::new(0, [1, 1, 1], 2)]);
    assert_eq!(rig.mock.flush_count(), flushes + 1);
}

#[test]
fn test_bmi_truncated_frame_left_for_next_pass() {
    let rig = Rig::bmi();
    let (mut accel, _gyro) = bmi_streaming(&rig);
    rig.mock.push_fifo(&[0x84, 0x01, 0x00, 0x02]);

    let mut queue = SampleQueue::<32>::new();
    accel.irq_handler(3, &mut queue).unwrap();
    assert!(queue.is_empty());
}

#[test]
fn test_bmi_suspended_pattern_ignored() {
    let rig = Rig::bmi();
    let (mut accel, _gyro) = bmi_streaming(&rig);
    rig.mock.push_fifo(&[0x84; 8]);

    let mut queue = SampleQueue::<32>::new();
    accel.irq_handler(4, &mut queue).unwrap();
    assert!(queue.is_empty());
}

#[test]
fn test_bmi_fifo_flushed_when_no_sensor_enabled() {
    let rig = Rig::bmi();
    let (mut accel, _gyro) = rig.bmi_pair();
    let flushes = rig.mock.flush_count();
    rig.mock.queue_reads(0, BMI_INT_STATUS_1, &[BMI_FWM]);
    rig.mock.push_fifo(&bmi_frame(None, Some([1, 1, 1])));

    let mut queue = SampleQueue::<32>::new();
    accel.irq_handler(5, &mut queue).unwrap();
    assert!(queue.is_empty());
    assert_eq!(rig.mock.flush_count(), flushes + 1);
}

#[test]
fn test_bmi_stuck_interrupt_flushes() {
    let rig = Rig::bmi();
    let (mut accel, _gyro) = rig.bmi_pair();
    let flushes = rig.mock.flush_count();
    // A status bit the driver does not service never clears
    rig.mock.set_register(0, 0x1C, 0x01);

    let mut queue = SampleQueue::<32>::new();
    accel.irq_handler(6, &mut queue).unwrap();
    assert_eq!(rig.mock.flush_count(), flushes + 1);
}

#[test]
fn test_bmi_foc_marks_samples_calibrated() {
    let rig = Rig::bmi();
    let (mut accel, mut gyro) = bmi_streaming(&rig);
    rig.mock.set_foc_completes(true);
    gyro.perform_calib(true).unwrap();

    rig.mock.push_fifo(&bmi_frame(Some([7, 8, 9]), Some([4, 5, 6])));

    let mut queue = SampleQueue::<32>::new();
    accel.irq_handler(4, &mut queue).unwrap();
    let flags: Vec<_> = drain(&mut queue).iter().map(|s| (s.sensor_id, s.flags)).collect();
    assert_eq!(flags, vec![(1, FLAG_CALIBRATED), (0, 0)]);
}

#[test]
fn test_bmi_failed_foc_leaves_samples_unflagged() {
    let rig = Rig::bmi();
    let (mut accel, mut gyro) = bmi_streaming(&rig);
    assert_eq!(gyro.perform_calib(true), Err(Error::Timeout));

    rig.mock.push_fifo(&bmi_frame(Some([7, 8, 9]), None));

    let mut queue = SampleQueue::<32>::new();
    accel.irq_handler(5, &mut queue).unwrap();
    assert_eq!(drain(&mut queue), vec![Sample::new(1, [7, 8, 9], 5)]);
}
