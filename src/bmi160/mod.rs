//! BMI160 accelerometer / gyroscope driver
//!
//! Flat register map, hardware offset registers and on-chip fast offset
//! compensation (FOC). As with the ICM-426xx, the accelerometer channel owns
//! reset and the FIFO interrupt and must be initialized first.
//!
//! Every write is followed by a 1 ms pause: writes issued while a sensor is
//! in suspend mode are otherwise silently dropped by the chip. The chip lock
//! is taken for each register access and released for the pause.

pub mod fifo;
pub mod registers;

use device_driver::RegisterInterface;
use embassy_sync::blocking_mutex::raw::RawMutex;
use embedded_hal::delay::DelayNs;

use crate::calibration::{self, OffsetFormat};
use crate::chip::{Channel, Chip, ChipState, Clock};
use crate::driver::AccelGyro;
use crate::fifo::packet::raw_xyz;
use crate::fifo::{Sample, SampleSink};
use crate::math::{self, Vec3};
use crate::sensor::{SavedData, SensorConfig, SensorState, SensorType};
use crate::{Error, INVALID_CALIB_TEMP, celsius_to_kelvin};

use self::fifo::{Frame, FrameError};

/// Pause after each register write, in milliseconds
pub const WRITE_DELAY_MS: u32 = 1;
/// Settling time after a suspend command, in milliseconds
pub const SUSPEND_DELAY_MS: u32 = 3;
/// Accelerometer wake-up time from suspend, in milliseconds
pub const ACCEL_WAKEUP_MS: u32 = 4;
/// Gyroscope wake-up time from suspend, in milliseconds
pub const GYRO_WAKEUP_MS: u32 = 80;

/// Accelerometer rate limits in mHz
pub const ACCEL_FREQ_MHZ: (u32, u32) = (12_500, 1_600_000);
/// Gyroscope rate limits in mHz
pub const GYRO_FREQ_MHZ: (u32, u32) = (25_000, 3_200_000);

/// Accelerometer offset LSB: 3.9 mg, 8-bit field
pub const ACCEL_OFFSET: OffsetFormat = OffsetFormat::new(3900 * 1024, 1_000_000, 8);
/// Gyroscope offset LSB: 0.061 dps, 10-bit field
pub const GYRO_OFFSET: OffsetFormat = OffsetFormat::new(61 * 1024, 1000, 10);

/// Accelerometer ranges in g with their `ACC_RANGE` codes
pub const ACCEL_RANGES: [(u32, u8); 4] = [(2, 0x03), (4, 0x05), (8, 0x08), (16, 0x0C)];
/// Gyroscope ranges in dps with their `GYR_RANGE` codes
pub const GYRO_RANGES: [(u32, u8); 5] =
    [(125, 0x04), (250, 0x03), (500, 0x02), (1000, 0x01), (2000, 0x00)];

/// Bytes read from the FIFO per pass
pub const FIFO_READ_MAX: usize = 64;

/// Interrupt status polls before the FIFO is declared stuck
pub const IRQ_MAX_LOOPS: usize = 200;

/// Rate used while the chip calibrates itself, in mHz
pub const CALIB_RATE_MHZ: u32 = 100_000;
/// Accelerometer FOC timeout, in milliseconds
pub const ACCEL_CALIB_TIMEOUT_MS: u32 = 400;
/// Gyroscope FOC timeout, in milliseconds
pub const GYRO_CALIB_TIMEOUT_MS: u32 = 800;
/// Poll interval while waiting for FOC, in milliseconds
pub const CALIB_POLL_MS: u32 = 50;

/// Sensor channel of a BMI160
pub struct Bmi160<'a, M: RawMutex, T, C, D> {
    chip: &'a Chip<M, T, C>,
    config: SensorConfig,
    data: SavedData,
    delay: D,
}

/// Code of the range closest to `range`
///
/// Requests between two entries round down, or up when `round_up` is set;
/// requests outside the table clamp to its ends.
#[must_use]
pub fn range_to_reg(range: u32, round_up: bool, table: &[(u32, u8)]) -> (u32, u8) {
    let mut i = 0;
    while i + 1 < table.len() {
        if range <= table[i].0 {
            break;
        }
        if range < table[i + 1].0 {
            if round_up {
                i += 1;
            }
            break;
        }
        i += 1;
    }
    table[i]
}

/// ODR code to rate in mHz (100 Hz at code 8, doubling per step)
#[must_use]
pub const fn odr_reg_to_mhz(reg: u8) -> u32 {
    if reg < 8 {
        100_000 >> (8 - reg)
    } else {
        100_000 << (reg - 8)
    }
}

/// Rate in mHz to the code of the fastest rate not above it
#[must_use]
pub const fn odr_mhz_to_reg(rate: u32) -> u8 {
    let reg = if rate < 100_000 {
        (100_000 / (rate + 1)).leading_zeros() as i32 - 24
    } else {
        39 - (rate / 100_000).leading_zeros() as i32
    };
    if reg < 1 {
        1
    } else if reg > 15 {
        15
    } else {
        reg as u8
    }
}

/// `FIFO_CONFIG_1` enable bit of a sensor type
const fn fifo_enable_bit(sensor_type: SensorType) -> u8 {
    match sensor_type {
        SensorType::Accel => registers::FIFO_ACC_EN,
        _ => registers::FIFO_GYR_EN,
    }
}

fn push_sample<T>(
    st: &mut ChipState<T>,
    sensor_type: SensorType,
    data: &[u8; 6],
    timestamp: u32,
    sink: &mut dyn SampleSink,
) where
    T: RegisterInterface<AddressType = u8>,
{
    let Ok(channel) = st.channel_mut(sensor_type) else {
        return;
    };
    let v = channel.normalize(raw_xyz(data));
    channel.last = v;
    sink.stage(Sample::new(channel.sensor_id, v, timestamp).with_flags(channel.sample_flags()));
}

/// Decode the frames in the scratch buffer, staging their samples
///
/// Returns `false` when an unknown header cut the pass short.
fn decode_frames<T>(
    st: &mut ChipState<T>,
    length: usize,
    timestamp: u32,
    sink: &mut dyn SampleSink,
) -> bool
where
    T: RegisterInterface<AddressType = u8>,
{
    let mut at = 0;
    while at < length {
        let (size, gyro, accel) = match fifo::decode(&st.fifo_buffer[at..length]) {
            Ok(Frame::Empty) | Err(FrameError::Truncated) => break,
            Ok(Frame::Data {
                size, gyro, accel, ..
            }) => (size, gyro.copied(), accel.copied()),
            Ok(other) => (other.size(), None, None),
            #[cfg_attr(not(feature = "defmt"), allow(unused_variables))]
            Err(FrameError::Unknown(header)) => {
                #[cfg(feature = "defmt")]
                defmt::warn!("bmi160: unknown FIFO header {:#x} at {}", header, at);
                return false;
            }
        };

        if let Some(data) = gyro {
            push_sample(st, SensorType::Gyro, &data, timestamp, sink);
        }
        if let Some(data) = accel {
            push_sample(st, SensorType::Accel, &data, timestamp, sink);
        }
        at += size;
    }
    true
}

impl<'a, M, T, C, D> Bmi160<'a, M, T, C, D>
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

    fn range_table(&self) -> &'static [(u32, u8)] {
        match self.config.sensor_type {
            SensorType::Accel => &ACCEL_RANGES,
            _ => &GYRO_RANGES,
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

    /// Write one register, then give the chip time to take it
    fn write8(&mut self, reg: u16, value: u8) -> Result<(), Error<T::Error>> {
        let result = self.chip.lock(|st| st.bus.write8(reg, value));
        self.delay.delay_ms(WRITE_DELAY_MS);
        result
    }

    /// Read-modify-write of the bits in `mask`
    fn update8(&mut self, reg: u16, mask: u8, value: u8) -> Result<(), Error<T::Error>> {
        self.chip
            .lock(|st| st.bus.field_update8(reg, mask, value))?;
        self.delay.delay_ms(WRITE_DELAY_MS);
        Ok(())
    }

    fn check_identity(&mut self) -> Result<(), Error<T::Error>> {
        let id = self.chip.lock(|st| st.bus.read8(registers::CHIP_ID))?;
        if id == registers::CHIP_ID_BMI160 || id == registers::CHIP_ID_BMI168 {
            return Ok(());
        }

        #[cfg(feature = "defmt")]
        defmt::warn!("bmi160: unexpected CHIP_ID {:#x}, unlocking paging", id);

        // The chip may be stuck in paging mode; unlock it for the next attempt
        for cmd in registers::CMD_EXT_MODE_EN {
            self.write8(registers::CMD, cmd)?;
        }
        self.write8(registers::CMD_EXT_MODE_ADDR, registers::CMD_PAGING_EN)?;
        self.write8(registers::CMD_EXT_MODE_ADDR, 0)?;
        Err(Error::InvalidDevice(id))
    }

    /// Route FIFO interrupts to INT1 and switch the FIFO to header mode
    fn config_interrupt(&mut self) -> Result<(), Error<T::Error>> {
        self.write8(registers::CMD, registers::CMD_FIFO_FLUSH)?;
        self.write8(registers::CMD, registers::CMD_INT_RESET)?;

        self.write8(
            registers::INT_LATCH,
            registers::INT2_INPUT_EN | registers::LATCH_5MS,
        )?;
        self.write8(registers::INT_OUT_CTRL, registers::INT1_OUTPUT_EN)?;
        self.write8(registers::INT_MAP_0, 0)?;
        self.write8(
            registers::INT_FIFO_MAP,
            registers::INT1_MAP_FWM | registers::INT1_MAP_FFULL,
        )?;

        // Watermark at one unit: interrupt as soon as anything is queued
        self.write8(registers::FIFO_CONFIG_0, 1)?;
        self.write8(
            registers::FIFO_CONFIG_1,
            registers::FIFO_TAG_INT2_EN | registers::FIFO_HEADER_EN,
        )?;
        self.chip.lock(|st| st.fifo_en = 0);

        let bits = registers::INT_EN_FWM | registers::INT_EN_FFULL;
        self.update8(registers::INT_EN_1, bits, bits)
    }

    fn flush_fifo(&mut self) -> Result<(), Error<T::Error>> {
        self.write8(registers::CMD, registers::CMD_FIFO_FLUSH)
    }

    /// Drain the FIFO into `sink`
    ///
    /// # Errors
    ///
    /// [`Error::NotHandled`] after an unknown frame header (the FIFO is
    /// flushed), or a bus error.
    fn load_fifo(&mut self, timestamp: u32, sink: &mut dyn SampleSink) -> Result<(), Error<T::Error>> {
        // Everything was disabled while the interrupt was pending: drop leftovers
        if self.chip.lock(|st| st.fifo_en) == 0 {
            return self.flush_fifo();
        }

        let clean = self.chip.lock(|st| -> Result<bool, Error<T::Error>> {
            let length =
                usize::from(st.bus.read16(registers::FIFO_LENGTH)? & registers::FIFO_LENGTH_MASK);
            if length == 0 {
                return Ok(true);
            }
            // One extra byte to catch the empty frame
            let length = length + 1;
            if length > FIFO_READ_MAX {
                #[cfg(feature = "defmt")]
                defmt::debug!("bmi160: {} bytes queued, reading {}", length, FIFO_READ_MAX);
            }
            let length = length.min(FIFO_READ_MAX);

            st.bus
                .read_n(registers::FIFO_DATA, &mut st.fifo_buffer[..length])?;
            if fifo::is_suspended_pattern(&st.fifo_buffer[..length]) {
                #[cfg(feature = "defmt")]
                defmt::info!("bmi160: suspended FIFO pattern, skipping");
                return Ok(true);
            }
            Ok(decode_frames(st, length, timestamp, sink))
        })?;

        if !clean {
            self.flush_fifo()?;
            return Err(Error::NotHandled);
        }
        Ok(())
    }

    fn enable_fifo(&mut self, enable: bool) -> Result<(), Error<T::Error>> {
        let ty = self.sensor_type()?;
        let bit = fifo_enable_bit(ty);
        self.update8(registers::FIFO_CONFIG_1, bit, if enable { bit } else { 0 })?;

        let mask = 1u8 << ty as u8;
        self.chip.lock(|st| {
            if enable {
                st.fifo_en |= mask;
            } else {
                st.fifo_en &= !mask;
            }
        });
        Ok(())
    }

    /// Wait for fast offset compensation, polling `STATUS`
    fn wait_foc(&mut self, timeout_ms: u32) -> Result<(), Error<T::Error>> {
        let chip = self.chip;
        let deadline = chip.now_us().wrapping_add(timeout_ms * 1000);
        loop {
            if (deadline.wrapping_sub(chip.now_us()) as i32) <= 0 {
                #[cfg(feature = "defmt")]
                defmt::warn!("bmi160: FOC timed out");
                return Err(Error::Timeout);
            }
            self.delay.delay_ms(CALIB_POLL_MS);
            let status = chip.lock(|st| st.bus.read8(registers::STATUS))?;
            if status & registers::STATUS_FOC_RDY != 0 {
                return Ok(());
            }
        }
    }

    /// Tag later samples of this channel with [`crate::fifo::FLAG_CALIBRATED`]
    fn mark_calibrated(&mut self, ty: SensorType) -> Result<(), Error<T::Error>> {
        self.chip.lock(|st| {
            st.channel_mut(ty)?.calibrated = true;
            Ok(())
        })
    }

    /// Start FOC for this channel and wait for it; range must already be set
    fn run_foc(&mut self) -> Result<(), Error<T::Error>> {
        let ty = self.sensor_type()?;
        let (foc, enable_bit, timeout_ms) = match ty {
            SensorType::Accel => {
                // Device assumed flat; gravity on Z with the sign the mounting gives
                let z = match &self.config.rotation {
                    Some(r) if r[2][2] <= 0 => registers::FOC_ACC_MINUS_1G,
                    _ => registers::FOC_ACC_PLUS_1G,
                };
                (
                    (registers::FOC_ACC_0G << registers::FOC_ACC_X_SHIFT)
                        | (registers::FOC_ACC_0G << registers::FOC_ACC_Y_SHIFT)
                        | (z << registers::FOC_ACC_Z_SHIFT),
                    registers::OFFSET_ACC_EN,
                    ACCEL_CALIB_TIMEOUT_MS,
                )
            }
            _ => (
                registers::FOC_GYR_EN,
                registers::OFFSET_GYRO_EN,
                GYRO_CALIB_TIMEOUT_MS,
            ),
        };

        self.write8(registers::FOC_CONF, foc)?;
        self.write8(registers::CMD, registers::CMD_START_FOC)?;

        self.wait_foc(timeout_ms)?;

        self.update8(registers::OFFSET_EN_GYR98, enable_bit, enable_bit)
    }
}

impl<'a, M, T, C, D> AccelGyro for Bmi160<'a, M, T, C, D>
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
        // Wake-up is waited out synchronously in set_data_rate
        if self.data.odr == 0 {
            SensorState::Off
        } else {
            SensorState::Active
        }
    }

    fn init(&mut self) -> Result<(), Error<T::Error>> {
        let ty = self.sensor_type()?;
        self.check_identity()?;

        if ty == SensorType::Accel {
            self.write8(registers::CMD, registers::CMD_SOFT_RESET)?;
            self.delay.delay_ms(1);
            // Keep the gyro from waking on the PMU trigger
            self.write8(registers::PMU_TRIGGER, 0)?;
            self.config_interrupt()?;
        } else if self.chip.lock(|st| st.channel(SensorType::Accel).is_none()) {
            return Err(Error::InitOrder);
        }

        let channel = Channel::new(self.config.sensor_id, self.config.rotation);
        self.chip.lock(|st| st.set_channel(ty, channel));

        self.data = SavedData::new();
        self.set_range(self.config.default_range, false)
    }

    fn probe(&mut self) -> Result<(), Error<T::Error>> {
        let id = self.chip.lock(|st| st.bus.read8(registers::CHIP_ID))?;
        match id {
            registers::CHIP_ID_BMI160 | registers::CHIP_ID_BMI168 => Ok(()),
            other => Err(Error::InvalidDevice(other)),
        }
    }

    fn read(&mut self) -> Result<Vec3, Error<T::Error>> {
        let ty = self.sensor_type()?;
        let (drdy, reg) = match ty {
            SensorType::Accel => (registers::STATUS_DRDY_ACC, registers::ACC_DATA),
            _ => (registers::STATUS_DRDY_GYR, registers::GYR_DATA),
        };

        self.chip.lock(|st| {
            let status = st.bus.read8(registers::STATUS)?;
            // No new sample yet: hand back the previous one so the caller can
            // poll again right away
            if status & drdy == 0 {
                return Ok(st.channel_mut(ty)?.last);
            }

            let mut buf = [0u8; 6];
            st.bus.read_n(reg, &mut buf)?;
            let channel = st.channel_mut(ty)?;
            let v = channel.normalize(raw_xyz(&buf));
            channel.last = v;
            Ok(v)
        })
    }

    fn read_temp(&mut self) -> Result<i32, Error<T::Error>> {
        let raw = self
            .chip
            .lock(|st| st.bus.read16(registers::TEMPERATURE))? as i16;
        if raw == registers::INVALID_TEMP {
            return Err(Error::NotPowered);
        }
        // 1/512 K per LSB, 23 C at zero
        Ok(celsius_to_kelvin(23 + ((i32::from(raw) + 256) >> 9)))
    }

    fn set_range(&mut self, range: u32, round_up: bool) -> Result<(), Error<T::Error>> {
        let ty = self.sensor_type()?;
        let (value, reg) = range_to_reg(range, round_up, self.range_table());
        let ctrl = match ty {
            SensorType::Accel => registers::ACC_RANGE,
            _ => registers::GYR_RANGE,
        };

        self.write8(ctrl, reg)?;
        self.data.range = value;
        Ok(())
    }

    fn get_range(&self) -> u32 {
        self.data.range
    }

    fn set_data_rate(&mut self, rate_mhz: u32, round_up: bool) -> Result<(), Error<T::Error>> {
        let ty = self.sensor_type()?;
        let type_index = ty as u8;

        if rate_mhz == 0 {
            let fifo = self.enable_fifo(false);
            let suspend = self.write8(registers::CMD, registers::cmd_mode_suspend(type_index));
            self.delay.delay_ms(SUSPEND_DELAY_MS);
            self.data.odr = 0;
            return fifo.and(suspend);
        }

        if self.data.odr == 0 {
            self.write8(registers::CMD, registers::cmd_mode_normal(type_index))?;
            self.delay.delay_ms(match ty {
                SensorType::Accel => ACCEL_WAKEUP_MS,
                _ => GYRO_WAKEUP_MS,
            });
        }

        let mut reg = odr_mhz_to_reg(rate_mhz);
        if round_up && odr_reg_to_mhz(reg) < rate_mhz && reg < 15 {
            reg += 1;
        }
        let normalized = odr_reg_to_mhz(reg);
        let (min, max) = self.freq_limits();
        if normalized < min || normalized > max {
            return Err(Error::InvalidParam);
        }

        let conf = match ty {
            SensorType::Accel => registers::ACC_CONF,
            _ => registers::GYR_CONF,
        };
        self.update8(conf, registers::ODR_MASK, reg)?;
        self.data.odr = normalized;

        self.enable_fifo(true)
    }

    fn get_data_rate(&self) -> u32 {
        self.data.odr
    }

    fn set_offset(&mut self, offset: [i16; 3], _temp: i16) -> Result<(), Error<T::Error>> {
        let ty = self.sensor_type()?;
        let rotation = self.config.rotation;

        let (enable_mask, enable_bits) = match ty {
            SensorType::Accel => {
                let raw = calibration::to_chip(offset, rotation.as_ref(), &ACCEL_OFFSET);
                for (i, v) in raw.iter().enumerate() {
                    self.write8(registers::OFFSET_ACC + i as u16, *v as u8)?;
                }
                (registers::OFFSET_ACC_EN, registers::OFFSET_ACC_EN)
            }
            _ => {
                let raw = calibration::to_chip(offset, rotation.as_ref(), &GYRO_OFFSET);
                let mut high_bits = 0;
                for (i, v) in raw.iter().enumerate() {
                    self.write8(registers::OFFSET_GYR + i as u16, *v as u8)?;
                    high_bits |= (((*v >> 8) & 0x03) as u8) << (2 * i);
                }
                (
                    registers::OFFSET_GYR_HIGH_MASK | registers::OFFSET_GYRO_EN,
                    high_bits | registers::OFFSET_GYRO_EN,
                )
            }
        };
        // Shared with the other channel: only touch this channel's bits
        self.update8(registers::OFFSET_EN_GYR98, enable_mask, enable_bits)?;
        self.mark_calibrated(ty)
    }

    fn get_offset(&mut self) -> Result<([i16; 3], i16), Error<T::Error>> {
        let ty = self.sensor_type()?;
        let rotation = self.config.rotation;

        let offset = self.chip.lock(|st| -> Result<[i16; 3], Error<T::Error>> {
            match ty {
                SensorType::Accel => {
                    let mut buf = [0u8; 3];
                    st.bus.read_n(registers::OFFSET_ACC, &mut buf)?;
                    let raw = buf.map(|b| i32::from(b as i8));
                    Ok(calibration::from_chip(raw, rotation.as_ref(), &ACCEL_OFFSET))
                }
                _ => {
                    let en98 = u32::from(st.bus.read8(registers::OFFSET_EN_GYR98)?);
                    let mut buf = [0u8; 3];
                    st.bus.read_n(registers::OFFSET_GYR, &mut buf)?;
                    let mut raw = [0i32; 3];
                    for (i, b) in buf.iter().enumerate() {
                        let high = (en98 >> (2 * i)) & 0x03;
                        raw[i] = math::sign_extend((high << 8) | u32::from(*b), 9);
                    }
                    Ok(calibration::from_chip(raw, rotation.as_ref(), &GYRO_OFFSET))
                }
            }
        })?;
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

    fn perform_calib(&mut self, enable: bool) -> Result<(), Error<T::Error>> {
        if !enable {
            return Ok(());
        }
        let ty = self.sensor_type()?;
        let rate = self.data.odr;
        let range = self.data.range;

        // Fast rate so FOC has enough samples, minimum range for sensitivity
        let result = self
            .set_data_rate(CALIB_RATE_MHZ, false)
            .and_then(|()| {
                let calib_range = match ty {
                    SensorType::Accel => 2,
                    _ => 125,
                };
                self.set_range(calib_range, false)
            })
            .and_then(|()| self.run_foc())
            .and_then(|()| self.mark_calibrated(ty));

        let restore_range = self.set_range(range, false);
        let restore_rate = self.set_data_rate(rate, false);
        result.and(restore_range).and(restore_rate)
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
        let mut has_read_fifo = false;
        let mut loops = 0;

        // Edge interrupt: it only fires again once every source is clear
        while loops < IRQ_MAX_LOOPS {
            let status = match self.chip.lock(|st| st.bus.read16(registers::INT_STATUS_0)) {
                Ok(0) => break,
                Ok(status) => status,
                Err(e) if loops == 0 => return Err(e),
                Err(_) => break,
            };
            if status & (registers::INT_FWM | registers::INT_FFULL) != 0 {
                // A bad frame already flushed the FIFO; keep what was staged
                if self.load_fifo(timestamp, sink).is_err() {
                    #[cfg(feature = "defmt")]
                    defmt::warn!("bmi160: FIFO load failed");
                }
                has_read_fifo = true;
            }
            loops += 1;
        }

        if loops == IRQ_MAX_LOOPS {
            #[cfg(feature = "defmt")]
            defmt::warn!("bmi160: interrupt stuck after {} loops", loops);
            self.flush_fifo()?;
        }

        if has_read_fifo {
            let status = sink.commit();
            if status.is_overflow() {
                #[cfg(feature = "defmt")]
                defmt::warn!("bmi160: {} samples dropped", status.dropped);
            }
        }
        Ok(())
    }
}
