//! BMI160 header-mode FIFO frames
//!
//! Every frame starts with a header byte. Data frames (`0b10_mga_xx`) carry
//! the magnetometer (8 bytes), gyroscope and accelerometer (6 bytes each)
//! payloads in that order, for each bit set. Control frames are identified by
//! `header & 0xDC`.

/// Data frame: mode bits
pub const HEADER_MODE_MASK: u8 = 0xC0;
/// Data frame: sensor bits
pub const HEADER_PARAM_MASK: u8 = 0x1C;
/// Data frame header mode
pub const HEADER_DATA: u8 = 0x80;
/// Data frame: magnetometer payload
pub const HEADER_MAG: u8 = 1 << 4;
/// Data frame: gyroscope payload
pub const HEADER_GYR: u8 = 1 << 3;
/// Data frame: accelerometer payload
pub const HEADER_ACC: u8 = 1 << 2;

/// Mask identifying control frames
pub const CONTROL_MASK: u8 = 0xDC;
/// No more data
pub const HEADER_EMPTY: u8 = 0x80;
/// Frames were dropped; one count byte follows
pub const HEADER_SKIP: u8 = 0x40;
/// Sensor time; three bytes follow
pub const HEADER_TIME: u8 = 0x44;
/// Configuration changed; one byte follows
pub const HEADER_CONFIG: u8 = 0x48;

/// One decoded frame, borrowing payloads from the read buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Frame<'a> {
    /// End of valid data
    Empty,
    /// Sensor data, `size` bytes including the header
    Data {
        /// Bytes consumed
        size: usize,
        /// Raw magnetometer block
        mag: Option<&'a [u8; 8]>,
        /// Raw gyroscope triple
        gyro: Option<&'a [u8; 6]>,
        /// Raw accelerometer triple
        accel: Option<&'a [u8; 6]>,
    },
    /// Frames skipped by the chip
    Skip(u8),
    /// 24-bit sensor time
    Time(u32),
    /// Configuration change marker
    Config(u8),
}

impl Frame<'_> {
    /// Bytes consumed by the frame, header included
    #[must_use]
    pub const fn size(&self) -> usize {
        match self {
            Self::Empty => 1,
            Self::Data { size, .. } => *size,
            Self::Skip(_) | Self::Config(_) => 2,
            Self::Time(_) => 4,
        }
    }
}

/// Why a frame could not be decoded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FrameError {
    /// Header matches no known frame
    Unknown(u8),
    /// Frame runs past the end of the read; the chip sends it again
    Truncated,
}

/// Whether a FIFO read returned the pattern seen when every sensor is
/// suspended instead of real frames
#[must_use]
pub fn is_suspended_pattern(buf: &[u8]) -> bool {
    let Some(head) = buf.get(..4) else {
        return false;
    };
    let word = u32::from_le_bytes([head[0], head[1], head[2], head[3]]);
    word == 0x8484_8484 || (word & 0xDCDC_DCDC) == 0x4040_4040
}

/// Decode the frame at the start of `buf`
///
/// # Errors
///
/// [`FrameError::Unknown`] for an unrecognized header,
/// [`FrameError::Truncated`] when the frame does not fit in `buf`.
pub fn decode(buf: &[u8]) -> Result<Frame<'_>, FrameError> {
    let Some(&header) = buf.first() else {
        return Err(FrameError::Truncated);
    };

    if header & HEADER_MODE_MASK == HEADER_DATA && header & HEADER_PARAM_MASK != 0 {
        return decode_data(header, buf);
    }

    let byte = |i: usize| buf.get(i).copied().ok_or(FrameError::Truncated);
    match header & CONTROL_MASK {
        HEADER_EMPTY => Ok(Frame::Empty),
        HEADER_SKIP => Ok(Frame::Skip(byte(1)?)),
        HEADER_CONFIG => Ok(Frame::Config(byte(1)?)),
        HEADER_TIME => {
            let t = [byte(1)?, byte(2)?, byte(3)?];
            Ok(Frame::Time(u32::from_le_bytes([t[0], t[1], t[2], 0])))
        }
        other => Err(FrameError::Unknown(other)),
    }
}

fn take<'a>(
    buf: &'a [u8],
    at: &mut usize,
    len: usize,
    present: bool,
) -> Result<Option<&'a [u8]>, FrameError> {
    if !present {
        return Ok(None);
    }
    let chunk = buf.get(*at..*at + len).ok_or(FrameError::Truncated)?;
    *at += len;
    Ok(Some(chunk))
}

fn decode_data(header: u8, buf: &[u8]) -> Result<Frame<'_>, FrameError> {
    let mut at = 1;
    let mag = take(buf, &mut at, 8, header & HEADER_MAG != 0)?;
    let gyro = take(buf, &mut at, 6, header & HEADER_GYR != 0)?;
    let accel = take(buf, &mut at, 6, header & HEADER_ACC != 0)?;

    Ok(Frame::Data {
        size: at,
        mag: mag.and_then(|s| s.try_into().ok()),
        gyro: gyro.and_then(|s| s.try_into().ok()),
        accel: accel.and_then(|s| s.try_into().ok()),
    })
}
