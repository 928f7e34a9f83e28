//! Register definitions for the ICM-426xx family
//!
//! Registers are addressed with 16-bit virtual ids: bank in the high byte,
//! physical offset in the low byte. Bank 0 holds configuration and data,
//! bank 1 the serial interface setup and bank 4 the user offsets.
//!
//! Multi-byte blocks (data, FIFO, offsets) are accessed raw through
//! [`crate::bank::BankedBus`] with the constants below; single configuration
//! bytes go through the generated [`Icm426xxRegs`] device.

use crate::bank::vreg;

/// Physical address of `REG_BANK_SEL`, valid in every bank
pub const BANK_SEL: u8 = 0x76;

/// `WHO_AM_I` of the ICM-42605
pub const WHO_AM_I_ICM42605: u8 = 0x42;
/// `WHO_AM_I` of the ICM-40608
pub const WHO_AM_I_ICM40608: u8 = 0x39;

/// Temperature, 16-bit little-endian
pub const TEMP_DATA: u16 = vreg(0, 0x1D);
/// Accelerometer X/Y/Z, 3 x 16-bit little-endian
pub const ACCEL_DATA: u16 = vreg(0, 0x1F);
/// Gyroscope X/Y/Z, 3 x 16-bit little-endian
pub const GYRO_DATA: u16 = vreg(0, 0x25);
/// Bytes in the FIFO, 16-bit little-endian
pub const FIFO_COUNT: u16 = vreg(0, 0x2E);
/// FIFO read port
pub const FIFO_DATA: u16 = vreg(0, 0x30);
/// FIFO watermark in bytes, 16-bit little-endian
pub const FIFO_WATERMARK: u16 = vreg(0, 0x60);

/// First user offset register (gyro X low byte)
pub const OFFSET_USER0: u16 = vreg(4, 0x77);
/// Shared byte: accel X\[11:8\] high nibble, gyro Z\[11:8\] low nibble
pub const OFFSET_USER4: u16 = vreg(4, 0x7B);

/// Sample value meaning "no valid data"
pub const INVALID_DATA: i16 = -32768;

/// Power mode of a sensor in `PWR_MGMT0`
pub mod mode {
    /// Sensor off
    pub const OFF: u8 = 0;
    /// Gyroscope standby
    pub const STANDBY: u8 = 1;
    /// Low power (accelerometer duty cycling)
    pub const LOW_POWER: u8 = 2;
    /// Low noise
    pub const LOW_NOISE: u8 = 3;
}

/// Output slew rate in `DRIVE_CONFIG`
pub mod slew {
    /// 20 ns to 60 ns
    pub const NS_20_60: u8 = 0;
    /// 12 ns to 36 ns
    pub const NS_12_36: u8 = 1;
    /// 6 ns to 18 ns
    pub const NS_6_18: u8 = 2;
    /// 4 ns to 12 ns
    pub const NS_4_12: u8 = 3;
    /// 2 ns to 6 ns
    pub const NS_2_6: u8 = 4;
    /// Below 2 ns
    pub const INF_2: u8 = 5;
}

/// Serial interface left enabled in `INTF_CONFIG0`
pub mod sifs {
    /// Disable SPI
    pub const SPI_DIS: u8 = 2;
    /// Disable I2C
    pub const I2C_DIS: u8 = 3;
}

/// `FIFO_CONFIG` modes
pub mod fifo_mode {
    /// FIFO bypassed
    pub const BYPASS: u8 = 0;
    /// FIFO streaming, oldest data overwritten
    pub const STREAM: u8 = 1;
}

/// UI filter bandwidth: accelerometer 16x averaging
pub const FILTER_BW_AVG_16X: u8 = 6;
/// UI filter bandwidth: ODR / 2
pub const FILTER_BW_ODR_DIV_2: u8 = 0;

device_driver::create_device!(
    device_name: Icm426xxRegs,
    dsl: {
        config {
            type RegisterAddressType = u16;
            type DefaultByteOrder = LE;
        }

        // ==================== BANK 0 ====================

        /// DEVICE_CONFIG (Bank 0, 0x11)
        register DeviceConfig {
            const ADDRESS = 0x0011;
            const SIZE_BITS = 8;

            /// Software reset, self clearing
            soft_reset: bool = 0,
            reserved_3_1: uint = 1..4,
            /// SPI mode 1/2 (true) or 0/3
            spi_mode: bool = 4,
            reserved_7_5: uint = 5..8,
        },

        /// DRIVE_CONFIG (Bank 0, 0x13)
        register DriveConfig {
            const ADDRESS = 0x0013;
            const SIZE_BITS = 8;

            /// SPI output slew rate
            spi_slew_rate: uint = 0..3,
            /// I2C output slew rate
            i_2_c_slew_rate: uint = 3..6,
            reserved_7_6: uint = 6..8,
        },

        /// INT_CONFIG (Bank 0, 0x14)
        register IntConfig {
            const ADDRESS = 0x0014;
            const SIZE_BITS = 8;

            /// INT1 active high
            int_one_polarity: bool = 0,
            /// INT1 push-pull (true) or open drain
            int_one_drive_circuit: bool = 1,
            /// INT1 latched
            int_one_mode: bool = 2,
            /// INT2 active high
            int_two_polarity: bool = 3,
            /// INT2 push-pull (true) or open drain
            int_two_drive_circuit: bool = 4,
            /// INT2 latched
            int_two_mode: bool = 5,
            reserved_7_6: uint = 6..8,
        },

        /// FIFO_CONFIG (Bank 0, 0x16)
        register FifoConfig {
            const ADDRESS = 0x0016;
            const SIZE_BITS = 8;

            reserved_5_0: uint = 0..6,
            /// See [`fifo_mode`]
            fifo_mode: uint = 6..8,
        },

        /// INT_STATUS (Bank 0, 0x2D), cleared on read
        register IntStatus {
            const ADDRESS = 0x002D;
            const SIZE_BITS = 8;

            /// Interrupt 2 asserted
            agc_rdy: bool = 0,
            /// FIFO full
            fifo_full: bool = 1,
            /// FIFO above watermark
            fifo_ths: bool = 2,
            /// Data ready
            data_rdy: bool = 3,
            /// Reset completed
            reset_done: bool = 4,
            /// PLL ready
            pll_rdy: bool = 5,
            /// UI FSYNC
            ui_fsync: bool = 6,
            reserved_7: bool = 7,
        },

        /// SIGNAL_PATH_RESET (Bank 0, 0x4B)
        register SignalPathReset {
            const ADDRESS = 0x004B;
            const SIZE_BITS = 8;

            reserved_0: bool = 0,
            /// Flush the FIFO, self clearing
            fifo_flush: bool = 1,
            /// Latch the timestamp
            tmst_strobe: bool = 2,
            /// Abort and reset
            abort_and_reset: bool = 3,
            reserved_7_4: uint = 4..8,
        },

        /// INTF_CONFIG0 (Bank 0, 0x4C)
        register IntfConfig0 {
            const ADDRESS = 0x004C;
            const SIZE_BITS = 8;

            /// See [`sifs`]
            ui_sifs_cfg: uint = 0..2,
            reserved_3_2: uint = 2..4,
            /// Data registers and FIFO setup: endianness, invalid-value marking
            data_conf: uint = 4..8,
        },

        /// INTF_CONFIG1 (Bank 0, 0x4D)
        register IntfConfig1 {
            const ADDRESS = 0x004D;
            const SIZE_BITS = 8;

            /// Clock source
            clksel: uint = 0..2,
            /// RTC mode
            rtc_mode: bool = 2,
            /// Accelerometer low power clock on RC oscillator
            accel_lp_clk_sel: bool = 3,
            reserved_7_4: uint = 4..8,
        },

        /// PWR_MGMT0 (Bank 0, 0x4E)
        register PwrMgmt0 {
            const ADDRESS = 0x004E;
            const SIZE_BITS = 8;

            /// See [`mode`]
            accel_mode: uint = 0..2,
            /// See [`mode`]
            gyro_mode: uint = 2..4,
            /// Keep RC oscillator on
            idle: bool = 4,
            /// Temperature sensor disabled
            temp_dis: bool = 5,
            reserved_7_6: uint = 6..8,
        },

        /// GYRO_CONFIG0 (Bank 0, 0x4F)
        register GyroConfig0 {
            const ADDRESS = 0x004F;
            const SIZE_BITS = 8;

            /// Output data rate code
            gyro_odr: uint = 0..4,
            reserved_4: bool = 4,
            /// Full scale code, 2000 dps >> code
            gyro_fs_sel: uint = 5..8,
        },

        /// ACCEL_CONFIG0 (Bank 0, 0x50)
        register AccelConfig0 {
            const ADDRESS = 0x0050;
            const SIZE_BITS = 8;

            /// Output data rate code
            accel_odr: uint = 0..4,
            reserved_4: bool = 4,
            /// Full scale code, 16 g >> code
            accel_fs_sel: uint = 5..8,
        },

        /// GYRO_ACCEL_CONFIG0 (Bank 0, 0x52)
        register GyroAccelConfig0 {
            const ADDRESS = 0x0052;
            const SIZE_BITS = 8;

            /// Gyroscope UI filter bandwidth
            gyro_ui_filt_bw: uint = 0..4,
            /// Accelerometer UI filter bandwidth
            accel_ui_filt_bw: uint = 4..8,
        },

        /// FIFO_CONFIG1 (Bank 0, 0x5F)
        register FifoConfig1 {
            const ADDRESS = 0x005F;
            const SIZE_BITS = 8;

            /// Accelerometer packets in FIFO
            fifo_accel_en: bool = 0,
            /// Gyroscope packets in FIFO
            fifo_gyro_en: bool = 1,
            /// Temperature in FIFO
            fifo_temp_en: bool = 2,
            /// Timestamp / FSYNC in FIFO
            fifo_tmst_fsync_en: bool = 3,
            /// 20-bit packets
            fifo_hires_en: bool = 4,
            /// Watermark interrupt fires while above threshold
            fifo_wm_gt_th: bool = 5,
            /// Allow partial packet reads
            fifo_resume_partial_rd: bool = 6,
            reserved_7: bool = 7,
        },

        /// INT_CONFIG1 (Bank 0, 0x64)
        register IntConfig1 {
            const ADDRESS = 0x0064;
            const SIZE_BITS = 8;

            reserved_3_0: uint = 0..4,
            /// Async reset, must be cleared for proper INT pin operation
            int_async_reset: bool = 4,
            /// Interrupt de-assertion duration disabled
            int_tdeassert_disable: bool = 5,
            /// Interrupt pulse duration 8 us
            int_tpulse_duration: bool = 6,
            reserved_7: bool = 7,
        },

        /// INT_SOURCE0 (Bank 0, 0x65)
        register IntSource0 {
            const ADDRESS = 0x0065;
            const SIZE_BITS = 8;

            /// UI AGC ready to INT1
            ui_agc_rdy_int_one_en: bool = 0,
            /// FIFO full to INT1
            fifo_full_int_one_en: bool = 1,
            /// FIFO watermark to INT1
            fifo_ths_int_one_en: bool = 2,
            /// Data ready to INT1
            ui_drdy_int_one_en: bool = 3,
            /// Reset done to INT1
            reset_done_int_one_en: bool = 4,
            /// PLL ready to INT1
            pll_rdy_int_one_en: bool = 5,
            /// FSYNC to INT1
            ui_fsync_int_one_en: bool = 6,
            reserved_7: bool = 7,
        },

        /// WHO_AM_I (Bank 0, 0x75)
        register WhoAmI {
            const ADDRESS = 0x0075;
            const SIZE_BITS = 8;

            /// Chip identity
            who_am_i: uint = 0..8,
        },

        // ==================== BANK 1 ====================

        /// INTF_CONFIG4 (Bank 1, 0x7A)
        register IntfConfig4 {
            const ADDRESS = 0x017A;
            const SIZE_BITS = 8;

            reserved_5_0: uint = 0..6,
            /// I3C bus mode
            i_3_c_bus_mode: bool = 6,
            reserved_7: bool = 7,
        },

        /// INTF_CONFIG6 (Bank 1, 0x7C)
        register IntfConfig6 {
            const ADDRESS = 0x017C;
            const SIZE_BITS = 8;

            /// I3C SDR mode
            i_3_c_sdr_en: bool = 0,
            /// I3C DDR mode
            i_3_c_ddr_en: bool = 1,
            reserved_3_2: uint = 2..4,
            /// I3C enabled
            i_3_c_en: bool = 4,
            reserved_7_5: uint = 5..8,
        }
    }
);
