//! Bus transports for the register layer
//!
//! Both transports implement [`device_driver::RegisterInterface`] with 8-bit
//! physical register addresses. Bank selection is layered on top by
//! [`crate::bank::BankedBus`], so these stay oblivious of virtual registers.
//!
//! Writes go out as one transaction holding the register address followed by
//! the payload, so bursts of any length reach consecutive registers.

use device_driver::RegisterInterface;
use embedded_hal::i2c::Operation as I2cOperation;
use embedded_hal::spi::Operation as SpiOperation;

/// Read flag in the SPI address byte
const SPI_READ: u8 = 0x80;

/// I2C transport addressing one chip
pub struct I2cInterface<I2C> {
    i2c: I2C,
    address: u8,
}

impl<I2C> I2cInterface<I2C> {
    /// Create a new I2C transport for the chip at the 7-bit `address`
    ///
    /// # Example
    /// ```ignore
    /// let interface = I2cInterface::new(i2c, 0x68);
    /// ```
    pub const fn new(i2c: I2C, address: u8) -> Self {
        Self { i2c, address }
    }

    /// Address this transport talks to
    pub const fn address(&self) -> u8 {
        self.address
    }

    /// Consume the interface and return the I2C peripheral
    pub fn release(self) -> I2C {
        self.i2c
    }
}

impl<I2C, E> RegisterInterface for I2cInterface<I2C>
where
    I2C: embedded_hal::i2c::I2c<Error = E>,
{
    type Error = E;
    type AddressType = u8;

    fn read_register(
        &mut self,
        address: Self::AddressType,
        _size_bits: u32,
        read_data: &mut [u8],
    ) -> Result<(), Self::Error> {
        self.i2c.write_read(self.address, &[address], read_data)
    }

    fn write_register(
        &mut self,
        address: Self::AddressType,
        _size_bits: u32,
        write_data: &[u8],
    ) -> Result<(), Self::Error> {
        // Adjacent writes are sent without a repeated start
        self.i2c.transaction(
            self.address,
            &mut [I2cOperation::Write(&[address]), I2cOperation::Write(write_data)],
        )
    }
}

/// SPI transport for one chip
///
/// Chip select is owned by the [`embedded_hal::spi::SpiDevice`] implementation.
/// Both supported families flag reads with the address MSB.
pub struct SpiInterface<SPI> {
    spi: SPI,
}

impl<SPI> SpiInterface<SPI> {
    /// Create a new SPI transport
    pub const fn new(spi: SPI) -> Self {
        Self { spi }
    }

    /// Consume the interface and return the SPI device
    pub fn release(self) -> SPI {
        self.spi
    }
}

impl<SPI, E> RegisterInterface for SpiInterface<SPI>
where
    SPI: embedded_hal::spi::SpiDevice<Error = E>,
{
    type Error = E;
    type AddressType = u8;

    fn read_register(
        &mut self,
        address: Self::AddressType,
        _size_bits: u32,
        read_data: &mut [u8],
    ) -> Result<(), Self::Error> {
        self.spi.transaction(&mut [
            SpiOperation::Write(&[address | SPI_READ]),
            SpiOperation::Read(read_data),
        ])
    }

    fn write_register(
        &mut self,
        address: Self::AddressType,
        _size_bits: u32,
        write_data: &[u8],
    ) -> Result<(), Self::Error> {
        self.spi.transaction(&mut [
            SpiOperation::Write(&[address & !SPI_READ]),
            SpiOperation::Write(write_data),
        ])
    }
}
