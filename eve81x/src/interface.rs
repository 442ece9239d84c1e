//! The addressed register transport: how the host reaches the EVE memory map.

use core::convert::TryFrom;

pub mod fake;

/// An `Interface` adapts the transport this library expects onto some
/// physical channel to the chip, usually a SPI bus.
///
/// The core library deliberately contains no implementations of this
/// trait, so that it stays portable across systems big and small; the
/// companion `eve81x-*` crates take on the extra dependencies needed to
/// bind it to particular hardware.
///
/// Each write or read is a bracketed transaction: `begin_write` (or
/// `begin_read`) asserts the chip select and transmits the address header,
/// any number of `continue_write`/`continue_read` calls move data, and
/// `end_write`/`end_read` releases the select line. No two brackets may
/// overlap; the bracket is the mutual-exclusion unit for the whole driver.
pub trait Interface {
    type Error;

    fn begin_write(&mut self, addr: Address) -> Result<(), Self::Error>;
    fn continue_write(&mut self, v: &[u8]) -> Result<(), Self::Error>;
    fn end_write(&mut self) -> Result<(), Self::Error>;

    fn begin_read(&mut self, addr: Address) -> Result<(), Self::Error>;
    fn continue_read(&mut self, into: &mut [u8]) -> Result<(), Self::Error>;
    fn end_read(&mut self) -> Result<(), Self::Error>;

    /// Sends a host command, which is a three-byte message distinct from
    /// any memory access. Host commands change power and clock modes.
    fn host_cmd(&mut self, cmd: u8, a0: u8, a1: u8) -> Result<(), Self::Error>;

    /// Pulses the hardware power-down line, if the platform has it wired.
    fn reset(&mut self) -> Result<(), Self::Error>;

    /// Stalls the host for at least the given number of milliseconds.
    fn delay_ms(&mut self, ms: u32) -> Result<(), Self::Error>;

    /// Performs one complete write bracket for the given data.
    fn write(&mut self, addr: Address, v: &[u8]) -> Result<(), Self::Error> {
        self.begin_write(addr)?;
        self.continue_write(v)?;
        self.end_write()
    }

    /// Performs one complete read bracket into the given buffer.
    fn read(&mut self, addr: Address, into: &mut [u8]) -> Result<(), Self::Error> {
        self.begin_read(addr)?;
        self.continue_read(into)?;
        self.end_read()
    }
}

/// Builds the three-byte message for a host command. This is a helper for
/// physical implementations of [`Interface::host_cmd`](Interface::host_cmd).
///
/// The second argument byte is always zero on all current EVE models; it is
/// exposed only for forward-compatibility.
pub fn build_host_cmd_message(cmd: u8, a0: u8, a1: u8, into: &mut [u8; 3]) {
    into[0] = cmd;
    into[1] = a0;
    into[2] = a1;
}

/// A memory address in the chip's memory map.
///
/// The chips have a 22-bit address space, and an `Address` value is
/// guaranteed to stay inside it: the high-order bits of the wrapped
/// value are always zero.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Debug, Hash)]
pub struct Address(u32);

impl Address {
    // Mask representing the bits of a u32 that contribute to an Address.
    pub const MASK: u32 = 0x003fffff;

    /// Check whether the given raw address is within the expected
    /// range for a memory address, returning `true` only if so.
    pub const fn is_valid(raw: u32) -> bool {
        // Only the lowest 22 bits may be nonzero.
        (raw >> 22) == 0
    }

    /// Forces the given raw value into a valid address by masking away
    /// the bits that must always be zero.
    ///
    /// This is intended for initializing constants for well-known
    /// addresses in the memory map. For dynamically-derived values,
    /// prefer the `TryFrom<u32>` implementation, which reports an
    /// out-of-range value instead of silently truncating it.
    pub const fn force_raw(raw: u32) -> Self {
        Self(raw & Self::MASK)
    }

    pub const fn to_raw(self) -> u32 {
        self.0
    }

    /// Writes the three-byte "write memory" header for this address
    /// into the given buffer, for physical implementations that need
    /// to transmit it ahead of the data. The top bit of the first byte
    /// is the write flag.
    pub fn build_write_header(self, into: &mut [u8; 3]) {
        into[0] = (((self.0 >> 16) & 0b00111111) | 0b10000000) as u8;
        into[1] = (self.0 >> 8) as u8;
        into[2] = (self.0 >> 0) as u8;
    }

    /// Writes the four-byte "read memory" header for this address into
    /// the given buffer: the address with no write flag, followed by
    /// the dummy byte that precedes the returned data.
    pub fn build_read_header(self, into: &mut [u8; 4]) {
        into[0] = ((self.0 >> 16) & 0b00111111) as u8;
        into[1] = (self.0 >> 8) as u8;
        into[2] = (self.0 >> 0) as u8;
        into[3] = 0; // "dummy byte", per the datasheet
    }
}

/// Converting from a `u32` succeeds as long as the value is within
/// the 22-bit address space.
impl TryFrom<u32> for Address {
    type Error = ();

    fn try_from(raw: u32) -> Result<Self, Self::Error> {
        if Self::is_valid(raw) {
            Ok(Self(raw))
        } else {
            Err(())
        }
    }
}

/// Address arithmetic is modular in the 22-bit space, so the result is
/// always itself a valid address.
impl core::ops::Add<u32> for Address {
    type Output = Self;

    fn add(self, offset: u32) -> Self {
        Self::force_raw(self.0.wrapping_add(offset))
    }
}

/// `Address` can convert to a u32 whose bits 22 through 31 will always
/// be zero.
impl From<Address> for u32 {
    fn from(addr: Address) -> u32 {
        addr.0
    }
}

/// A named window in the EVE memory map.
///
/// Addresses are always formed by offsetting from a region's base; no
/// address arithmetic in this crate crosses from one region into another.
/// The one place where offsets wrap is the command FIFO, and that wrapping
/// is handled explicitly by the
/// [`Coprocessor`](crate::commands::Coprocessor) engine rather than here.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct AddressRegion {
    pub base: Address,
    pub length: u32,
}

impl AddressRegion {
    /// General-purpose graphics RAM.
    pub const RAM_G: Self = Self::new(0x000000, 1024 << 10);
    /// Display list memory.
    pub const RAM_DL: Self = Self::new(0x300000, 8 << 10);
    /// The register bank. The documented block is 4KB, but the coprocessor
    /// and tracker registers sit at larger offsets from the same base.
    pub const RAM_REG: Self = Self::new(0x302000, 4 << 10);
    /// The circular command FIFO consumed by the coprocessor.
    pub const RAM_CMD: Self = Self::new(0x308000, 4 << 10);
    /// Null-terminated coprocessor fault diagnostic text.
    pub const RAM_ERR_REPORT: Self = Self::new(0x309800, 128);
    /// Window onto the external flash bridged by BT81x chips.
    pub const RAM_FLASH: Self = Self::new(0x800000, 0);

    const fn new(base: u32, length: u32) -> Self {
        Self {
            base: Address::force_raw(base),
            length: length,
        }
    }

    /// Returns the address at the given offset into this region.
    pub const fn offset(self, offset: u32) -> Address {
        Address::force_raw(self.base.to_raw() + offset)
    }
}

impl core::ops::Add<u32> for AddressRegion {
    type Output = Address;

    fn add(self, offset: u32) -> Address {
        self.offset(offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_header() {
        let addr = AddressRegion::RAM_REG.offset(0xfc);
        let mut header: [u8; 3] = [0; 3];
        addr.build_write_header(&mut header);
        assert_eq!(header, [0xb0, 0x20, 0xfc]);
    }

    #[test]
    fn test_read_header() {
        let addr = AddressRegion::RAM_REG.offset(0xf8);
        let mut header: [u8; 4] = [0; 4];
        addr.build_read_header(&mut header);
        assert_eq!(header, [0x30, 0x20, 0xf8, 0x00]);
    }

    #[test]
    fn test_region_offset() {
        assert_eq!(
            AddressRegion::RAM_CMD.offset(0x10),
            Address::force_raw(0x308010)
        );
        assert_eq!(AddressRegion::RAM_DL + 4, Address::force_raw(0x300004));
    }
}
