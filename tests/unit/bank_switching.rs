//! Unit tests for bank switching functionality

use accelgyro::bank::{BankedBus, vreg};
use accelgyro::{AccelGyro, Error};

use crate::common::mock_interface::{MockInterface, Model};
use crate::common::{MockError, Operation, Rig};

#[test]
fn test_bank_switch_only_on_transition() {
    let mock = MockInterface::new(Model::Icm426xx);
    let mut bus = BankedBus::banked(mock.clone(), 0x76);

    bus.read8(vreg(1, 0x7A)).unwrap();
    bus.read8(vreg(1, 0x7C)).unwrap();
    bus.write8(vreg(1, 0x7C), 0x10).unwrap();
    bus.read8(vreg(0, 0x75)).unwrap();

    let switches: Vec<_> = mock
        .operations()
        .into_iter()
        .filter(|op| matches!(op, Operation::BankSwitch { .. }))
        .collect();
    assert_eq!(
        switches,
        vec![
            Operation::BankSwitch { from: 0, to: 1 },
            Operation::BankSwitch { from: 1, to: 0 },
        ]
    );
    assert_eq!(mock.get_register(1, 0x7C), 0x10);
}

#[test]
fn test_first_access_selects_bank() {
    let mock = MockInterface::new(Model::Icm426xx);
    let mut bus = BankedBus::banked(mock.clone(), 0x76);
    assert_eq!(bus.cached_bank(), None);

    // Cache unknown: bank 0 is selected even though the chip sits there
    bus.read8(vreg(0, 0x75)).unwrap();
    assert_eq!(mock.bank_switch_count(), 1);
    assert_eq!(bus.cached_bank(), Some(0));
}

#[test]
fn test_read32_is_little_endian_in_one_bank() {
    let mock = MockInterface::new(Model::Icm426xx);
    let mut bus = BankedBus::banked(mock.clone(), 0x76);
    for (i, byte) in [0x78, 0x56, 0x34, 0x12].into_iter().enumerate() {
        mock.set_register(4, 0x77 + i as u8, byte);
    }

    assert_eq!(bus.read32(vreg(4, 0x77)), Ok(0x1234_5678));
    assert_eq!(bus.cached_bank(), Some(4));
    assert_eq!(mock.bank_switch_count(), 1);
}

#[test]
fn test_reads_in_cached_bank_do_not_switch() {
    let rig = Rig::icm();
    let (mut accel, mut gyro) = rig.icm_pair();
    rig.mock.clear_operations();

    accel.read().unwrap();
    gyro.read().unwrap();
    accel.read().unwrap();

    assert_eq!(rig.mock.bank_switch_count(), 0);
}

#[test]
fn test_offset_access_round_trips_through_bank_4() {
    let rig = Rig::icm();
    let (mut accel, _gyro) = rig.icm_pair();
    rig.mock.clear_operations();

    accel.set_offset([10, 20, 30], 0).unwrap();
    accel.read().unwrap();

    let switches: Vec<_> = rig
        .mock
        .operations()
        .into_iter()
        .filter(|op| matches!(op, Operation::BankSwitch { .. }))
        .collect();
    assert_eq!(
        switches,
        vec![
            Operation::BankSwitch { from: 0, to: 4 },
            Operation::BankSwitch { from: 4, to: 0 },
        ]
    );
}

#[test]
fn test_failed_bank_switch_is_retried() {
    let rig = Rig::icm();
    let (mut accel, _gyro) = rig.icm_pair();

    rig.mock.fail_bank_switch(true);
    assert_eq!(
        accel.get_offset(),
        Err(Error::Bus(MockError::BankSwitch))
    );
    assert_eq!(rig.mock.current_bank(), 0);

    rig.mock.fail_bank_switch(false);
    rig.mock.clear_operations();
    accel.get_offset().unwrap();
    assert_eq!(rig.mock.bank_switch_count(), 1);
    assert_eq!(rig.mock.current_bank(), 4);
}

#[test]
fn test_init_reselects_bank_after_reset() {
    let rig = Rig::icm();
    let (mut accel, _gyro) = rig.icm_pair();
    accel.set_offset([0, 0, 0], 0).unwrap();
    assert_eq!(rig.mock.current_bank(), 4);
    rig.mock.clear_operations();

    accel.init().unwrap();

    let ops = rig.mock.operations();
    assert_eq!(ops[0], Operation::BankSwitch { from: 4, to: 0 });
    // WHO_AM_I is read in bank 0
    assert!(matches!(
        ops[1],
        Operation::ReadRegister {
            bank: 0,
            address: 0x75,
            ..
        }
    ));
}

#[test]
fn test_flat_map_never_switches() {
    let rig = Rig::bmi();
    let (mut accel, mut gyro) = rig.bmi_pair();

    accel.set_offset([40, 0, -40], 0).unwrap();
    gyro.get_offset().unwrap();
    accel.set_data_rate(100_000, false).unwrap();

    assert_eq!(rig.mock.bank_switch_count(), 0);
}
