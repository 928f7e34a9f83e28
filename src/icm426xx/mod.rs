//! ICM-426xx accelerometer / gyroscope driver
//!
//! Supports the ICM-42605 and the ICM-40608. Both channels share one
//! [`Chip`]: the accelerometer channel owns chip reset, interface setup and
//! the FIFO interrupt, so it has to be initialized first.
//!
//! Offsets are applied in software by the chip through its 12-bit user offset
//! registers in bank 4, which pack the two sensors' axes in nibbles.

pub mod registers;

use device_driver::RegisterInterface;
use embassy_sync::blocking_mutex::raw::RawMutex;
use embedded_hal::delay::DelayNs;

use crate::calibration::{self, OffsetFormat};
use crate::chip::{BusKind, Channel, Chip, ChipState, Clock, FIFO_BUFFER};
use crate::driver::AccelGyro;
use crate::fifo::packet::{self, Packet, PacketError};
use crate::fifo::{Sample, SampleSink};
use crate::math::{self, Vec3};
use crate::sensor::{SavedData, SensorConfig, SensorState, SensorType};
use crate::{Error, INVALID_CALIB_TEMP, celsius_to_kelvin};

use self::registers::{Icm426xxRegs, fifo_mode, mode, sifs, slew};

/// Accelerometer start-up time after enabling, in microseconds
pub const ACCEL_START_TIME_US: u32 = 20_000;
/// Accelerometer shut-down time, in microseconds
pub const ACCEL_STOP_TIME_US: u32 = 0;
/// Gyroscope start-up time after enabling, in microseconds
pub const GYRO_START_TIME_US: u32 = 60_000;
/// Minimum time the gyroscope must stay off before being re-enabled
pub const GYRO_STOP_TIME_US: u32 = 150_000;

/// Accelerometer rate limits in mHz
pub const ACCEL_FREQ_MHZ: (u32, u32) = (3_125, 500_000);
/// Gyroscope rate limits in mHz
pub const GYRO_FREQ_MHZ: (u32, u32) = (12_500, 4_000_000);

/// FIFO watermark programmed at init, in bytes
pub const FIFO_WATERMARK_BYTES: u16 = 8;

/// Accelerometer offset LSB: 1/2048 g, 12-bit field
pub const ACCEL_OFFSET: OffsetFormat = OffsetFormat::new(1, 2, 12);
/// Gyroscope offset LSB: 1/32 dps, 12-bit field
pub const GYRO_OFFSET: OffsetFormat = OffsetFormat::new(32, 1, 12);

// Settling time after a power mode change
const MODE_CHANGE_DELAY_US: u32 = 200;

/// Sensor channel of an ICM-426xx
pub struct Icm426xx<'a, M: RawMutex, T, C, D> {
    chip: &'a Chip<M, T, C>,
    config: SensorConfig,
    data: SavedData,
    delay: D,
}

fn regs<T>(st: &mut ChipState<T>) -> Icm426xxRegs<crate::bank::Regs<'_, T>>
where
    T: RegisterInterface<AddressType = u8>,
{
    Icm426xxRegs::new(st.bus.regs())
}

const fn floor_log2(x: u32) -> u32 {
    31 - x.leading_zeros()
}

/// Accelerometer full scale in g to its `ACCEL_FS_SEL` code, rounding down
#[must_use]
pub const fn accel_fs_to_reg(g: u32) -> u8 {
    if g < 2 {
        3
    } else if g > 16 {
        0
    } else {
        (3 - floor_log2(g / 2)) as u8
    }
}

/// `ACCEL_FS_SEL` code to full scale in g
#[must_use]
pub const fn accel_reg_to_fs(reg: u8) -> u32 {
    16 >> reg
}

/// Gyroscope full scale in dps to its `GYRO_FS_SEL` code, rounding down
#[must_use]
pub const fn gyro_fs_to_reg(dps: u32) -> u8 {
    if dps < 16 {
        7
    } else if dps > 2000 {
        0
    } else {
        (7 - floor_log2(dps / 15)) as u8
    }
}

/// `GYRO_FS_SEL` code to full scale in dps
#[must_use]
pub const fn gyro_reg_to_fs(reg: u8) -> u32 {
    2000 >> reg
}

/// ODR code to rate in mHz
///
/// Codes 3 (8 kHz) to 6 (1 kHz) double per step, 7 (200 Hz) to 14
/// (1.5625 Hz) halve per step, and 15 sits out of order at 500 Hz.
#[must_use]
pub const fn odr_reg_to_mhz(reg: u8) -> u32 {
    match reg {
        15 => 500_000,
        7..=14 => 200_000 >> (reg - 7),
        3..=6 => 1_000_000 << (6 - reg),
        _ => 8_000_000,
    }
}

// Codes from the fastest rate to the slowest
const ODR_CODES: [u8; 13] = [3, 4, 5, 6, 15, 7, 8, 9, 10, 11, 12, 13, 14];

/// Rate in mHz to the ODR code of the fastest rate not above it
///
/// Anything below 1.5625 Hz maps to the slowest code.
#[must_use]
pub fn odr_mhz_to_reg(rate: u32) -> u8 {
    ODR_CODES
        .iter()
        .copied()
        .find(|&code| odr_reg_to_mhz(code) <= rate)
        .unwrap_or(14)
}

/// Next faster ODR code, saturating at 8 kHz
#[must_use]
pub const fn odr_reg_up(reg: u8) -> u8 {
    match reg {
        15 => 6,
        7 => 15,
        0..=3 => 3,
        _ => reg - 1,
    }
}

/// Split 12-bit accelerometer offsets into `OFFSET_USER4..=8`
///
/// Byte 0 only carries the high nibble; its low nibble belongs to the gyro.
#[must_use]
pub fn pack_accel_offset(raw: Vec3) -> [u8; 5] {
    let [x, y, z] = raw;
    [
        ((x >> 4) & 0xF0) as u8,
        (x & 0xFF) as u8,
        (y & 0xFF) as u8,
        (((z >> 4) & 0xF0) | ((y >> 8) & 0x0F)) as u8,
        (z & 0xFF) as u8,
    ]
}

/// Inverse of [`pack_accel_offset`], sign extended
#[must_use]
pub fn unpack_accel_offset(r: [u8; 5]) -> Vec3 {
    let [r0, r1, r2, r3, r4] = r.map(u32::from);
    [
        ((r0 & 0xF0) << 4) | r1,
        ((r3 & 0x0F) << 8) | r2,
        ((r3 & 0xF0) << 4) | r4,
    ]
    .map(|v| math::sign_extend(v, 11))
}

/// Split 12-bit gyroscope offsets into `OFFSET_USER0..=4`
///
/// Byte 4 only carries the low nibble; its high nibble belongs to the accel.
#[must_use]
pub fn pack_gyro_offset(raw: Vec3) -> [u8; 5] {
    let [x, y, z] = raw;
    [
        (x & 0xFF) as u8,
        (((y >> 4) & 0xF0) | ((x >> 8) & 0x0F)) as u8,
        (y & 0xFF) as u8,
        (z & 0xFF) as u8,
        ((z >> 8) & 0x0F) as u8,
    ]
}

/// Inverse of [`pack_gyro_offset`], sign extended
#[must_use]
pub fn unpack_gyro_offset(r: [u8; 5]) -> Vec3 {
    let [r0, r1, r2, r3, r4] = r.map(u32::from);
    [
        ((r1 & 0x0F) << 8) | r0,
        ((r1 & 0xF0) << 4) | r2,
        ((r4 & 0x0F) << 8) | r3,
    ]
    .map(|v| math::sign_extend(v, 11))
}

fn check_identity<E>(who_am_i: u8) -> Result<(), Error<E>> {
    match who_am_i {
        registers::WHO_AM_I_ICM42605 | registers::WHO_AM_I_ICM40608 => Ok(()),
        other => {
            #[cfg(feature = "defmt")]
            defmt::warn!("icm426xx: unexpected WHO_AM_I {:#x}", other);
            Err(Error::InvalidDevice(other))
        }
    }
}

/// Serial interface setup after reset
fn init_config<T>(st: &mut ChipState<T>) -> Result<(), Error<T::Error>>
where
    T: RegisterInterface<AddressType = u8>,
{
    let spi = st.bus_kind == BusKind::Spi;

    // Not checked: the write can disturb the bus while I3C switches on
    let _ = regs(st).intf_config_6().modify(|w| {
        w.set_i_3_c_en(true);
        w.set_i_3_c_sdr_en(spi);
        w.set_i_3_c_ddr_en(spi);
        w.set_reserved_3_2(0);
    });

    regs(st).intf_config_4().modify(|w| w.set_i_3_c_bus_mode(spi))?;

    regs(st).drive_config().modify(|w| {
        if spi {
            w.set_i_2_c_slew_rate(slew::NS_20_60);
            w.set_spi_slew_rate(slew::INF_2);
        } else {
            w.set_i_2_c_slew_rate(slew::NS_12_36);
            w.set_spi_slew_rate(slew::NS_12_36);
        }
    })?;

    // Little endian data, unused serial interface disabled
    regs(st).intf_config_0().modify(|w| {
        w.set_data_conf(0);
        w.set_ui_sifs_cfg(if spi { sifs::I2C_DIS } else { sifs::SPI_DIS });
    })?;

    regs(st)
        .intf_config_1()
        .modify(|w| w.set_accel_lp_clk_sel(true))?;

    Ok(())
}

/// INT1 and FIFO setup, all sensors out of the FIFO
fn config_interrupt<T>(st: &mut ChipState<T>) -> Result<(), Error<T::Error>>
where
    T: RegisterInterface<AddressType = u8>,
{
    regs(st)
        .int_config()
        .write(|w| w.set_int_one_drive_circuit(true))?;
    regs(st)
        .int_config_1()
        .modify(|w| w.set_int_async_reset(false))?;

    regs(st).fifo_config_1().modify(|w| {
        w.set_fifo_accel_en(false);
        w.set_fifo_gyro_en(false);
        w.set_fifo_temp_en(false);
        w.set_fifo_tmst_fsync_en(false);
        w.set_fifo_hires_en(false);
        w.set_fifo_wm_gt_th(true);
        w.set_fifo_resume_partial_rd(true);
    })?;
    st.fifo_en = 0;

    st.bus
        .write16(registers::FIFO_WATERMARK, FIFO_WATERMARK_BYTES)
}

fn flush_fifo<T>(st: &mut ChipState<T>) -> Result<(), Error<T::Error>>
where
    T: RegisterInterface<AddressType = u8>,
{
    regs(st)
        .signal_path_reset()
        .write(|w| w.set_fifo_flush(true))
}

fn enable_fifo<T>(st: &mut ChipState<T>, enable: bool) -> Result<(), Error<T::Error>>
where
    T: RegisterInterface<AddressType = u8>,
{
    if enable {
        regs(st)
            .int_source_0()
            .modify(|w| w.set_fifo_ths_int_one_en(true))?;
        flush_fifo(st)?;
        regs(st)
            .fifo_config()
            .write(|w| w.set_fifo_mode(fifo_mode::STREAM))?;
        // Dummy read latches the count, required before the first FIFO read
        st.bus.read16(registers::FIFO_COUNT)?;
    } else {
        regs(st)
            .fifo_config()
            .write(|w| w.set_fifo_mode(fifo_mode::BYPASS))?;
        flush_fifo(st)?;
        regs(st)
            .int_source_0()
            .modify(|w| w.set_fifo_ths_int_one_en(false))?;
    }
    Ok(())
}

/// Normalize one FIFO triple and stage it, unless the sensor is settling
fn push_sample<T>(
    st: &mut ChipState<T>,
    sensor_type: SensorType,
    data: &[u8; 6],
    timestamp: u32,
    sink: &mut dyn SampleSink,
) where
    T: RegisterInterface<AddressType = u8>,
{
    if !st.check_stabilized(sensor_type, timestamp) {
        return;
    }
    let Ok(channel) = st.channel_mut(sensor_type) else {
        return;
    };

    let raw = packet::raw_xyz(data);
    if raw.iter().all(|&v| v == i32::from(registers::INVALID_DATA)) {
        return;
    }
    let v = channel.normalize(raw);
    channel.last = v;
    sink.stage(Sample::new(channel.sensor_id, v, timestamp).with_flags(channel.sample_flags()));
}

/// Drain the FIFO into `sink`
fn load_fifo<T>(
    st: &mut ChipState<T>,
    timestamp: u32,
    sink: &mut dyn SampleSink,
) -> Result<(), Error<T::Error>>
where
    T: RegisterInterface<AddressType = u8>,
{
    let count = usize::from(st.bus.read16(registers::FIFO_COUNT)?);
    if count == 0 {
        return Err(Error::InvalidData);
    }
    if count > FIFO_BUFFER {
        #[cfg(feature = "defmt")]
        defmt::warn!("icm426xx: FIFO overflow, {} bytes pending", count);
        flush_fifo(st)?;
        return Err(Error::Overflow);
    }

    st.bus
        .read_n(registers::FIFO_DATA, &mut st.fifo_buffer[..count])?;

    let mut at = 0;
    while at < count {
        let (size, accel, gyro) = match packet::decode(&st.fifo_buffer[at..count]) {
            Ok(Packet::Empty) | Err(PacketError::Truncated) => break,
            Ok(Packet::Data { size, accel, gyro }) => (size, accel.copied(), gyro.copied()),
            #[cfg_attr(not(feature = "defmt"), allow(unused_variables))]
            Err(PacketError::Malformed(header)) => {
                #[cfg(feature = "defmt")]
                defmt::warn!("icm426xx: bad FIFO header {:#x}", header);
                return Err(Error::Decode);
            }
        };

        if let Some(data) = accel {
            push_sample(st, SensorType::Accel, &data, timestamp, sink);
        }
        if let Some(data) = gyro {
            push_sample(st, SensorType::Gyro, &data, timestamp, sink);
        }
        at += size;
    }
    Ok(())
}

impl<'a, M, T, C, D> Icm426xx<'a, M, T, C, D>
where
    M: RawMutex,
    T: RegisterInterface<AddressType = u8>,
    C: Clock,
    D: DelayNs,
{
    /// Create a channel on `chip`
    ///
    /// Nothing is sent to the chip until [`AccelGyro::init`].
    pub fn new(chip: &'a Chip<M, T, C>, config: SensorConfig, delay: D) -> Self {
        Self {
            chip,
            config,
            data: SavedData::new(),
            delay,
        }
    }

    /// Release the delay provider
    pub fn release(self) -> D {
        self.delay
    }

    fn sensor_type(&self) -> Result<SensorType, Error<T::Error>> {
        match self.config.sensor_type {
            ty @ (SensorType::Accel | SensorType::Gyro) => Ok(ty),
            _ => Err(Error::InvalidParam),
        }
    }

    fn freq_limits(&self) -> (u32, u32) {
        let (min, max) = match self.config.sensor_type {
            SensorType::Accel => ACCEL_FREQ_MHZ,
            _ => GYRO_FREQ_MHZ,
        };
        (
            min.max(self.config.min_frequency),
            max.min(self.config.max_frequency),
        )
    }

    /// Switch the power mode and open the matching stabilization window
    fn enable_sensor(&mut self, enable: bool) -> Result<(), Error<T::Error>> {
        let ty = self.sensor_type()?;
        let (on_mode, start_us, stop_us) = match ty {
            SensorType::Accel => (mode::LOW_POWER, ACCEL_START_TIME_US, ACCEL_STOP_TIME_US),
            _ => (mode::LOW_NOISE, GYRO_START_TIME_US, GYRO_STOP_TIME_US),
        };
        let chip = self.chip;

        // Honor the minimum off time before powering back on
        if enable {
            let rem = chip.lock(|st| st.stabilize_remaining(ty, chip.now_us()));
            if rem > 0 && rem.unsigned_abs() <= stop_us {
                self.delay.delay_us(rem.unsigned_abs());
            }
        }

        let value = if enable { on_mode } else { mode::OFF };
        chip.lock(|st| {
            regs(st).pwr_mgmt_0().modify(|w| match ty {
                SensorType::Accel => w.set_accel_mode(value),
                _ => w.set_gyro_mode(value),
            })?;
            st.set_stabilize(ty, chip.now_us(), if enable { start_us } else { stop_us });
            Ok::<_, Error<T::Error>>(())
        })?;
        // No register write while the chip switches modes
        if enable {
            self.delay.delay_us(MODE_CHANGE_DELAY_US);
        }
        Ok(())
    }

    /// Add or remove this sensor from the FIFO, starting or stopping the FIFO
    /// with the first or last user
    fn config_fifo(&mut self, enable: bool) -> Result<(), Error<T::Error>> {
        let ty = self.sensor_type()?;
        let bit = 1u8 << ty as u8;

        self.chip.lock(|st| {
            let old = st.fifo_en;
            let new = if enable { old | bit } else { old & !bit };

            regs(st).fifo_config_1().modify(|w| {
                match ty {
                    SensorType::Accel => w.set_fifo_accel_en(enable),
                    _ => w.set_fifo_gyro_en(enable),
                }
                w.set_fifo_temp_en(new != 0);
            })?;
            st.fifo_en = new;

            if old == 0 && new != 0 {
                enable_fifo(st, true)?;
            } else if old != 0 && new == 0 {
                enable_fifo(st, false)?;
            }
            Ok(())
        })
    }
}

impl<'a, M, T, C, D> AccelGyro for Icm426xx<'a, M, T, C, D>
where
    M: RawMutex,
    T: RegisterInterface<AddressType = u8>,
    C: Clock,
    D: DelayNs,
{
    type BusError = T::Error;

    fn config(&self) -> &SensorConfig {
        &self.config
    }

    fn sensor_state(&self) -> SensorState {
        if self.data.odr == 0 {
            return SensorState::Off;
        }
        let chip = self.chip;
        let ty = self.config.sensor_type;
        if chip.lock(|st| st.is_stabilizing(ty, chip.now_us())) {
            SensorState::Stabilizing
        } else {
            SensorState::Active
        }
    }

    fn init(&mut self) -> Result<(), Error<T::Error>> {
        let ty = self.sensor_type()?;
        let chip = self.chip;

        chip.lock(|st| {
            st.bus.force_bank(0)?;
            check_identity(regs(st).who_am_i().read()?.who_am_i())?;

            match ty {
                SensorType::Accel => regs(st)
                    .device_config()
                    .write(|w| w.set_soft_reset(true)),
                _ if st.channel(SensorType::Accel).is_none() => Err(Error::InitOrder),
                _ => Ok(()),
            }
        })?;

        if ty == SensorType::Accel {
            self.delay.delay_ms(1);
            chip.lock(|st| {
                // Reset brings the chip back to bank 0
                st.bus.force_bank(0)?;
                if !regs(st).int_status().read()?.reset_done() {
                    #[cfg(feature = "defmt")]
                    defmt::warn!("icm426xx: reset not completed");
                    return Err(Error::Timeout);
                }
                init_config(st)?;
                config_interrupt(st)
            })?;
        }

        let channel = Channel::new(self.config.sensor_id, self.config.rotation);
        chip.lock(|st| {
            st.set_channel(ty, channel);
            st.set_stabilize(ty, 0, 0);
            regs(st).gyro_accel_config_0().modify(|w| match ty {
                SensorType::Accel => w.set_accel_ui_filt_bw(registers::FILTER_BW_AVG_16X),
                _ => w.set_gyro_ui_filt_bw(registers::FILTER_BW_ODR_DIV_2),
            })
        })?;

        self.data = SavedData::new();
        self.set_range(self.config.default_range, false)
    }

    fn probe(&mut self) -> Result<(), Error<T::Error>> {
        self.chip
            .lock(|st| check_identity(regs(st).who_am_i().read()?.who_am_i()))
    }

    fn read(&mut self) -> Result<Vec3, Error<T::Error>> {
        let ty = self.sensor_type()?;
        let reg = match ty {
            SensorType::Accel => registers::ACCEL_DATA,
            _ => registers::GYRO_DATA,
        };
        let chip = self.chip;

        chip.lock(|st| {
            if !st.check_stabilized(ty, chip.now_us()) {
                return Err(Error::Busy);
            }

            let mut buf = [0u8; 6];
            st.bus.read_n(reg, &mut buf)?;
            let raw = packet::raw_xyz(&buf);

            let channel = st.channel_mut(ty)?;
            // All axes invalid: sensor just switched on, keep the last sample
            if raw.iter().all(|&v| v == i32::from(registers::INVALID_DATA)) {
                return Ok(channel.last);
            }
            let v = channel.normalize(raw);
            channel.last = v;
            Ok(v)
        })
    }

    fn read_temp(&mut self) -> Result<i32, Error<T::Error>> {
        let raw = self
            .chip
            .lock(|st| st.bus.read16(registers::TEMP_DATA))? as i16;
        if raw == registers::INVALID_DATA {
            return Err(Error::NotPowered);
        }
        // 132.48 LSB/C, 25 C at zero
        Ok(celsius_to_kelvin(i32::from(raw) * 100 / 13248 + 25))
    }

    fn set_range(&mut self, range: u32, round_up: bool) -> Result<(), Error<T::Error>> {
        let ty = self.sensor_type()?;
        let (mut reg, to_fs): (u8, fn(u8) -> u32) = match ty {
            SensorType::Accel => (accel_fs_to_reg(range), accel_reg_to_fs),
            _ => (gyro_fs_to_reg(range), gyro_reg_to_fs),
        };
        if round_up && to_fs(reg) < range && reg > 0 {
            reg -= 1;
        }

        self.chip.lock(|st| match ty {
            SensorType::Accel => regs(st)
                .accel_config_0()
                .modify(|w| w.set_accel_fs_sel(reg)),
            _ => regs(st)
                .gyro_config_0()
                .modify(|w| w.set_gyro_fs_sel(reg)),
        })?;

        self.data.range = to_fs(reg);
        Ok(())
    }

    fn get_range(&self) -> u32 {
        self.data.range
    }

    fn set_data_rate(&mut self, rate_mhz: u32, round_up: bool) -> Result<(), Error<T::Error>> {
        let ty = self.sensor_type()?;

        if rate_mhz == 0 {
            let fifo = self.config_fifo(false);
            let power = self.enable_sensor(false);
            self.data.odr = 0;
            return fifo.and(power);
        }

        let mut reg = odr_mhz_to_reg(rate_mhz);
        if round_up && odr_reg_to_mhz(reg) < rate_mhz {
            reg = odr_reg_up(reg);
        }
        let normalized = odr_reg_to_mhz(reg);
        let (min, max) = self.freq_limits();
        if normalized < min || normalized > max {
            return Err(Error::InvalidParam);
        }

        self.chip.lock(|st| match ty {
            SensorType::Accel => regs(st)
                .accel_config_0()
                .modify(|w| w.set_accel_odr(reg)),
            _ => regs(st).gyro_config_0().modify(|w| w.set_gyro_odr(reg)),
        })?;

        if self.data.odr == 0 {
            self.enable_sensor(true)?;
            self.config_fifo(true)?;
        }
        self.data.odr = normalized;
        Ok(())
    }

    fn get_data_rate(&self) -> u32 {
        self.data.odr
    }

    fn set_offset(&mut self, offset: [i16; 3], _temp: i16) -> Result<(), Error<T::Error>> {
        let ty = self.sensor_type()?;
        let rotation = self.config.rotation;

        self.chip.lock(|st| -> Result<(), Error<T::Error>> {
            match ty {
                SensorType::Accel => {
                    let raw = calibration::to_chip(offset, rotation.as_ref(), &ACCEL_OFFSET);
                    let bytes = pack_accel_offset(raw);
                    st.bus.field_update8(registers::OFFSET_USER4, 0xF0, bytes[0])?;
                    st.bus.write_n(registers::OFFSET_USER4 + 1, &bytes[1..])?;
                }
                _ => {
                    let raw = calibration::to_chip(offset, rotation.as_ref(), &GYRO_OFFSET);
                    let bytes = pack_gyro_offset(raw);
                    st.bus.write_n(registers::OFFSET_USER0, &bytes[..4])?;
                    st.bus.field_update8(registers::OFFSET_USER4, 0x0F, bytes[4])?;
                }
            }
            st.channel_mut(ty)?.calibrated = true;
            Ok(())
        })
    }

    fn get_offset(&mut self) -> Result<([i16; 3], i16), Error<T::Error>> {
        let ty = self.sensor_type()?;
        let rotation = self.config.rotation;
        let mut bytes = [0u8; 5];

        let offset = match ty {
            SensorType::Accel => {
                self.chip
                    .lock(|st| st.bus.read_n(registers::OFFSET_USER4, &mut bytes))?;
                calibration::from_chip(unpack_accel_offset(bytes), rotation.as_ref(), &ACCEL_OFFSET)
            }
            _ => {
                self.chip
                    .lock(|st| st.bus.read_n(registers::OFFSET_USER0, &mut bytes))?;
                calibration::from_chip(unpack_gyro_offset(bytes), rotation.as_ref(), &GYRO_OFFSET)
            }
        };
        Ok((offset, INVALID_CALIB_TEMP))
    }

    fn set_scale(&mut self, scale: [u16; 3], _temp: i16) -> Result<(), Error<T::Error>> {
        let ty = self.sensor_type()?;
        self.chip.lock(|st| {
            st.channel_mut(ty)?.scale = scale;
            Ok(())
        })
    }

    fn get_scale(&mut self) -> Result<([u16; 3], i16), Error<T::Error>> {
        let ty = self.sensor_type()?;
        let scale = self.chip.lock(|st| st.channel_mut(ty).map(|ch| ch.scale))?;
        Ok((scale, INVALID_CALIB_TEMP))
    }

    fn irq_handler(
        &mut self,
        timestamp: u32,
        sink: &mut dyn SampleSink,
    ) -> Result<(), Error<T::Error>> {
        // The FIFO interrupt is routed through the accelerometer channel
        if self.config.sensor_type != SensorType::Accel {
            return Err(Error::NotHandled);
        }

        self.chip.lock(|st| {
            if regs(st).int_status().read()?.fifo_ths() {
                // Only a clean pass is published
                if let Err(e) = load_fifo(st, timestamp, sink) {
                    sink.discard();
                    return Err(e);
                }
                let status = sink.commit();
                if status.is_overflow() {
                    #[cfg(feature = "defmt")]
                    defmt::warn!("icm426xx: {} samples dropped", status.dropped);
                }
            }
            Ok(())
        })
    }
}
