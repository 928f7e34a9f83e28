//! Bank-addressed register access
//!
//! Registers are named by a 16-bit virtual id: the high byte selects the bank
//! (page) and the low byte is the physical offset inside it. [`BankedBus`]
//! turns each access into the physical sequence on the wire, issuing a bank
//! select write only when the target bank differs from the one last selected.
//!
//! The cached bank is only updated after the select write succeeded, so a
//! failed switch leaves the cache unknown-or-correct and never claims a bank
//! the chip did not take. Callers hold the chip mutex across the whole
//! select-plus-access sequence (see [`crate::chip::Chip::lock`]).

use device_driver::RegisterInterface;

use crate::Error;

/// Build a virtual register id from a bank and an offset
#[must_use]
pub const fn vreg(bank: u8, offset: u8) -> u16 {
    ((bank as u16) << 8) | offset as u16
}

/// Split a virtual register id into `(bank, offset)`
#[must_use]
pub const fn split(reg: u16) -> (u8, u8) {
    ((reg >> 8) as u8, reg as u8)
}

/// Register bus with bank caching on top of a physical transport
pub struct BankedBus<T> {
    transport: T,
    bank_select: Option<u8>,
    bank: Option<u8>,
}

impl<T> BankedBus<T>
where
    T: RegisterInterface<AddressType = u8>,
{
    /// Bus for a chip with a bank select register at physical `bank_select`
    ///
    /// The current bank is unknown until the first select.
    pub const fn banked(transport: T, bank_select: u8) -> Self {
        Self {
            transport,
            bank_select: Some(bank_select),
            bank: None,
        }
    }

    /// Bus for a chip with a single flat register map
    pub const fn flat(transport: T) -> Self {
        Self {
            transport,
            bank_select: None,
            bank: Some(0),
        }
    }

    /// Bank the bus believes is selected, `None` when unknown
    pub const fn cached_bank(&self) -> Option<u8> {
        self.bank
    }

    /// Forget the cached bank (after a chip reset, for instance)
    pub fn invalidate_bank(&mut self) {
        if self.bank_select.is_some() {
            self.bank = None;
        }
    }

    /// Select `bank` unconditionally, refreshing the cache
    ///
    /// # Errors
    ///
    /// Returns an error if the select write fails.
    pub fn force_bank(&mut self, bank: u8) -> Result<(), Error<T::Error>> {
        self.invalidate_bank();
        self.select_bank(bank)
    }

    /// Select `bank` if it is not the cached one
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidParam`] for a non-zero bank on a flat bus, or
    /// the transport error if the select write fails.
    pub fn select_bank(&mut self, bank: u8) -> Result<(), Error<T::Error>> {
        let Some(select) = self.bank_select else {
            return if bank == 0 {
                Ok(())
            } else {
                Err(Error::InvalidParam)
            };
        };

        if self.bank != Some(bank) {
            self.transport.write_register(select, 8, &[bank])?;
            self.bank = Some(bank);
        }
        Ok(())
    }

    /// Read `buf.len()` consecutive bytes starting at `reg`
    ///
    /// # Errors
    ///
    /// Returns an error if bank selection or the transfer fails.
    pub fn read_n(&mut self, reg: u16, buf: &mut [u8]) -> Result<(), Error<T::Error>> {
        let (bank, offset) = split(reg);
        self.select_bank(bank)?;
        self.transport
            .read_register(offset, (buf.len() * 8) as u32, buf)?;
        Ok(())
    }

    /// Write `data` to consecutive registers starting at `reg`
    ///
    /// # Errors
    ///
    /// Returns an error if bank selection or the transfer fails.
    pub fn write_n(&mut self, reg: u16, data: &[u8]) -> Result<(), Error<T::Error>> {
        let (bank, offset) = split(reg);
        self.select_bank(bank)?;
        self.transport
            .write_register(offset, (data.len() * 8) as u32, data)?;
        Ok(())
    }

    /// Read an 8-bit register
    ///
    /// # Errors
    ///
    /// Returns an error if bank selection or the transfer fails.
    pub fn read8(&mut self, reg: u16) -> Result<u8, Error<T::Error>> {
        let mut buf = [0u8; 1];
        self.read_n(reg, &mut buf)?;
        Ok(buf[0])
    }

    /// Read a little-endian 16-bit register pair
    ///
    /// # Errors
    ///
    /// Returns an error if bank selection or the transfer fails.
    pub fn read16(&mut self, reg: u16) -> Result<u16, Error<T::Error>> {
        let mut buf = [0u8; 2];
        self.read_n(reg, &mut buf)?;
        Ok(u16::from_le_bytes(buf))
    }

    /// Read a little-endian 32-bit register block
    ///
    /// # Errors
    ///
    /// Returns an error if bank selection or the transfer fails.
    pub fn read32(&mut self, reg: u16) -> Result<u32, Error<T::Error>> {
        let mut buf = [0u8; 4];
        self.read_n(reg, &mut buf)?;
        Ok(u32::from_le_bytes(buf))
    }

    /// Write an 8-bit register
    ///
    /// # Errors
    ///
    /// Returns an error if bank selection or the transfer fails.
    pub fn write8(&mut self, reg: u16, value: u8) -> Result<(), Error<T::Error>> {
        self.write_n(reg, &[value])
    }

    /// Write a little-endian 16-bit register pair
    ///
    /// # Errors
    ///
    /// Returns an error if bank selection or the transfer fails.
    pub fn write16(&mut self, reg: u16, value: u16) -> Result<(), Error<T::Error>> {
        self.write_n(reg, &value.to_le_bytes())
    }

    /// Replace the bits of `mask` in an 8-bit register with those of `value`
    ///
    /// # Errors
    ///
    /// Returns an error if bank selection or either transfer fails. Nothing is
    /// written when the read fails.
    pub fn field_update8(&mut self, reg: u16, mask: u8, value: u8) -> Result<(), Error<T::Error>> {
        let old = self.read8(reg)?;
        self.write8(reg, (old & !mask) | (value & mask))
    }

    /// Typed register access for `device-driver` generated maps
    pub fn regs(&mut self) -> Regs<'_, T> {
        Regs(self)
    }

    /// Mutable access to the underlying transport
    pub fn transport(&mut self) -> &mut T {
        &mut self.transport
    }
}

/// Borrowed [`BankedBus`] speaking 16-bit virtual addresses
pub struct Regs<'a, T>(&'a mut BankedBus<T>);

impl<T> RegisterInterface for Regs<'_, T>
where
    T: RegisterInterface<AddressType = u8>,
{
    type Error = Error<T::Error>;
    type AddressType = u16;

    fn read_register(
        &mut self,
        address: Self::AddressType,
        _size_bits: u32,
        read_data: &mut [u8],
    ) -> Result<(), Self::Error> {
        self.0.read_n(address, read_data)
    }

    fn write_register(
        &mut self,
        address: Self::AddressType,
        _size_bits: u32,
        write_data: &[u8],
    ) -> Result<(), Self::Error> {
        self.0.write_n(address, write_data)
    }
}
