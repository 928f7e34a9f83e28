//! ICM-426xx FIFO packet decoding
//!
//! Each packet starts with a one-byte header:
//!
//! | Bit  | Meaning                              |
//! |------|--------------------------------------|
//! | 7    | Message / FIFO empty                 |
//! | 6    | Accelerometer data present           |
//! | 5    | Gyroscope data present               |
//! | 4    | 20-bit high resolution packet        |
//! | 3:2  | Timestamp / FSYNC                    |
//! | 1    | Accelerometer ODR changed            |
//! | 0    | Gyroscope ODR changed                |
//!
//! followed by little-endian axis triples, one temperature byte and, for
//! packets carrying both sensors, a 16-bit timestamp.

/// Header bit: FIFO empty sentinel
pub const HEADER_MSG: u8 = 1 << 7;
/// Header bit: accelerometer triple present
pub const HEADER_ACCEL: u8 = 1 << 6;
/// Header bit: gyroscope triple present
pub const HEADER_GYRO: u8 = 1 << 5;
/// Header bit: 20-bit extended packet
pub const HEADER_20: u8 = 1 << 4;
/// Header bits: timestamp / FSYNC
pub const HEADER_TMST_FSYNC: u8 = 0b11 << 2;
/// Header bit: accelerometer ODR changed
pub const HEADER_ODR_ACCEL: u8 = 1 << 1;
/// Header bit: gyroscope ODR changed
pub const HEADER_ODR_GYRO: u8 = 1 << 0;

/// Size of a packet carrying one sensor
pub const PACKET_SINGLE: usize = 8;
/// Size of a packet carrying both sensors
pub const PACKET_BOTH: usize = 16;

/// One decoded packet, borrowing axis data from the scratch buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Packet<'a> {
    /// End of valid data
    Empty,
    /// Data packet of `size` bytes
    Data {
        /// Bytes consumed
        size: usize,
        /// Raw accelerometer triple
        accel: Option<&'a [u8; 6]>,
        /// Raw gyroscope triple
        gyro: Option<&'a [u8; 6]>,
    },
}

/// Why a packet could not be decoded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PacketError {
    /// Header announces no known payload
    Malformed(u8),
    /// Packet runs past the end of the buffer
    Truncated,
}

fn triple(buf: &[u8], at: usize) -> Option<&[u8; 6]> {
    buf.get(at..at + 6).and_then(|s| s.try_into().ok())
}

/// Decode the packet at the start of `buf`
///
/// # Errors
///
/// [`PacketError::Malformed`] when the header carries neither sensor (and is
/// not the empty sentinel), [`PacketError::Truncated`] when the packet does
/// not fit in `buf`.
pub fn decode(buf: &[u8]) -> Result<Packet<'_>, PacketError> {
    let Some(&header) = buf.first() else {
        return Err(PacketError::Truncated);
    };

    if header & HEADER_MSG != 0 {
        return Ok(Packet::Empty);
    }
    if header & HEADER_20 != 0 {
        return Err(PacketError::Malformed(header));
    }

    let has_accel = header & HEADER_ACCEL != 0;
    let has_gyro = header & HEADER_GYRO != 0;
    let size = match (has_accel, has_gyro) {
        (true, true) => PACKET_BOTH,
        (true, false) | (false, true) => PACKET_SINGLE,
        (false, false) => return Err(PacketError::Malformed(header)),
    };
    if buf.len() < size {
        return Err(PacketError::Truncated);
    }

    let accel = if has_accel { triple(buf, 1) } else { None };
    let gyro = match (has_accel, has_gyro) {
        (true, true) => triple(buf, 7),
        (false, true) => triple(buf, 1),
        _ => None,
    };

    Ok(Packet::Data { size, accel, gyro })
}

/// Little-endian signed triple
#[must_use]
pub fn raw_xyz(data: &[u8; 6]) -> [i32; 3] {
    [
        i32::from(i16::from_le_bytes([data[0], data[1]])),
        i32::from(i16::from_le_bytes([data[2], data[3]])),
        i32::from(i16::from_le_bytes([data[4], data[5]])),
    ]
}
