//! Register map of the BMI160
//!
//! The BMI160 has a single flat map, so every address below is a plain
//! offset (bank 0 of the virtual register space). Each write has to be
//! followed by a short pause while the chip is in suspend mode, which is why
//! the driver funnels writes through one helper instead of typed accessors.

/// `CHIP_ID` (0x00)
pub const CHIP_ID: u16 = 0x00;
/// `CHIP_ID` value of the BMI160
pub const CHIP_ID_BMI160: u8 = 0xD1;
/// `CHIP_ID` value of the BMI168
pub const CHIP_ID_BMI168: u8 = 0xD2;

/// Gyroscope X/Y/Z, 3 x 16-bit little-endian
pub const GYR_DATA: u16 = 0x0C;
/// Accelerometer X/Y/Z, 3 x 16-bit little-endian
pub const ACC_DATA: u16 = 0x12;

/// `STATUS` (0x1B)
pub const STATUS: u16 = 0x1B;
/// `STATUS`: new accelerometer sample
pub const STATUS_DRDY_ACC: u8 = 1 << 7;
/// `STATUS`: new gyroscope sample
pub const STATUS_DRDY_GYR: u8 = 1 << 6;
/// `STATUS`: fast offset compensation done
pub const STATUS_FOC_RDY: u8 = 1 << 3;

/// `INT_STATUS_0`, read as 16 bits together with `INT_STATUS_1`
pub const INT_STATUS_0: u16 = 0x1C;
/// `INT_STATUS_1`: FIFO watermark reached
pub const INT_FWM: u16 = 1 << 14;
/// `INT_STATUS_1`: FIFO full
pub const INT_FFULL: u16 = 1 << 13;

/// Temperature, 16-bit little-endian
pub const TEMPERATURE: u16 = 0x20;
/// Temperature value meaning "sensor not powered"
pub const INVALID_TEMP: i16 = i16::MIN;

/// FIFO fill level, 16-bit little-endian
pub const FIFO_LENGTH: u16 = 0x22;
/// Valid bits of [`FIFO_LENGTH`]
pub const FIFO_LENGTH_MASK: u16 = 0x07FF;
/// FIFO read port
pub const FIFO_DATA: u16 = 0x24;

/// `ACC_CONF` (0x40), ODR in bits 3:0
pub const ACC_CONF: u16 = 0x40;
/// `ACC_RANGE` (0x41)
pub const ACC_RANGE: u16 = 0x41;
/// `GYR_CONF` (0x42), ODR in bits 3:0
pub const GYR_CONF: u16 = 0x42;
/// `GYR_RANGE` (0x43)
pub const GYR_RANGE: u16 = 0x43;
/// ODR field of `ACC_CONF` / `GYR_CONF`
pub const ODR_MASK: u8 = 0x0F;

/// `FIFO_CONFIG_0` (0x46): watermark in 4-byte units
pub const FIFO_CONFIG_0: u16 = 0x46;
/// `FIFO_CONFIG_1` (0x47)
pub const FIFO_CONFIG_1: u16 = 0x47;
/// `FIFO_CONFIG_1`: gyroscope frames
pub const FIFO_GYR_EN: u8 = 1 << 7;
/// `FIFO_CONFIG_1`: accelerometer frames
pub const FIFO_ACC_EN: u8 = 1 << 6;
/// `FIFO_CONFIG_1`: header mode
pub const FIFO_HEADER_EN: u8 = 1 << 4;
/// `FIFO_CONFIG_1`: tag frames with the INT2 input level
pub const FIFO_TAG_INT2_EN: u8 = 1 << 2;

/// `INT_EN_1` (0x51)
pub const INT_EN_1: u16 = 0x51;
/// `INT_EN_1`: FIFO watermark interrupt
pub const INT_EN_FWM: u8 = 1 << 6;
/// `INT_EN_1`: FIFO full interrupt
pub const INT_EN_FFULL: u8 = 1 << 5;

/// `INT_OUT_CTRL` (0x53)
pub const INT_OUT_CTRL: u16 = 0x53;
/// `INT_OUT_CTRL`: INT1 output enabled
pub const INT1_OUTPUT_EN: u8 = 1 << 3;

/// `INT_LATCH` (0x54)
pub const INT_LATCH: u16 = 0x54;
/// `INT_LATCH`: INT2 used as input
pub const INT2_INPUT_EN: u8 = 1 << 5;
/// `INT_LATCH`: 5 ms temporary latch
pub const LATCH_5MS: u8 = 0x05;

/// `INT_MAP_0` (0x55): motion interrupts to INT1
pub const INT_MAP_0: u16 = 0x55;
/// `INT_MAP_1` (0x56): data and FIFO interrupts
pub const INT_FIFO_MAP: u16 = 0x56;
/// `INT_MAP_1`: watermark to INT1
pub const INT1_MAP_FWM: u8 = 1 << 6;
/// `INT_MAP_1`: FIFO full to INT1
pub const INT1_MAP_FFULL: u8 = 1 << 5;

/// `FOC_CONF` (0x69)
pub const FOC_CONF: u16 = 0x69;
/// `FOC_CONF`: gyroscope compensation
pub const FOC_GYR_EN: u8 = 1 << 6;
/// `FOC_CONF` accelerometer X target shift
pub const FOC_ACC_X_SHIFT: u8 = 4;
/// `FOC_CONF` accelerometer Y target shift
pub const FOC_ACC_Y_SHIFT: u8 = 2;
/// `FOC_CONF` accelerometer Z target shift
pub const FOC_ACC_Z_SHIFT: u8 = 0;
/// FOC accelerometer target: +1 g
pub const FOC_ACC_PLUS_1G: u8 = 1;
/// FOC accelerometer target: -1 g
pub const FOC_ACC_MINUS_1G: u8 = 2;
/// FOC accelerometer target: 0 g
pub const FOC_ACC_0G: u8 = 3;

/// `PMU_TRIGGER` (0x6C)
pub const PMU_TRIGGER: u16 = 0x6C;

/// Accelerometer offsets X/Y/Z, 8-bit each
pub const OFFSET_ACC: u16 = 0x71;
/// Gyroscope offsets X/Y/Z, low 8 bits each
pub const OFFSET_GYR: u16 = 0x74;
/// `OFFSET_6` (0x77): enables and gyroscope offset bits 9:8
pub const OFFSET_EN_GYR98: u16 = 0x77;
/// `OFFSET_6`: gyroscope offset bits 9:8, two bits per axis from X
pub const OFFSET_GYR_HIGH_MASK: u8 = 0x3F;
/// `OFFSET_6`: gyroscope offset compensation
pub const OFFSET_GYRO_EN: u8 = 1 << 7;
/// `OFFSET_6`: accelerometer offset compensation
pub const OFFSET_ACC_EN: u8 = 1 << 6;

/// `CMD` (0x7E)
pub const CMD: u16 = 0x7E;
/// Start fast offset compensation
pub const CMD_START_FOC: u8 = 0x03;
/// Flush the FIFO
pub const CMD_FIFO_FLUSH: u8 = 0xB0;
/// Reset the interrupt engine
pub const CMD_INT_RESET: u8 = 0xB1;
/// Soft reset
pub const CMD_SOFT_RESET: u8 = 0xB6;
/// Extended mode unlock sequence
pub const CMD_EXT_MODE_EN: [u8; 3] = [0x37, 0x9A, 0xC0];

/// Extended mode page register
pub const CMD_EXT_MODE_ADDR: u16 = 0x7F;
/// Extended mode: paging enabled
pub const CMD_PAGING_EN: u8 = 0x80;

/// `CMD` value putting sensor `type_index` in suspend
#[must_use]
pub const fn cmd_mode_suspend(type_index: u8) -> u8 {
    0x10 | (type_index << 2)
}

/// `CMD` value putting sensor `type_index` in normal mode
#[must_use]
pub const fn cmd_mode_normal(type_index: u8) -> u8 {
    0x11 | (type_index << 2)
}
