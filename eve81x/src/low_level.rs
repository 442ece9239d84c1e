//! Lowest-level access to the memory map of an EVE chip: single-value
//! register reads and writes, byte-string transfers, and host commands.

use crate::host_commands::HostCmd;
use crate::interface::{Address, Interface};
use crate::registers::Register;

/// `LowLevel` is a thin wrapper around an [`Interface`](crate::interface::Interface)
/// that knows the byte ordering and framing conventions of the chip, so
/// higher layers can work in terms of typed register values.
///
/// All multi-byte values travel little-endian on the wire, matching the
/// chip's own layout of its memory map.
pub struct LowLevel<I: Interface> {
    ei: I,
}

impl<I: Interface> LowLevel<I> {
    pub fn new(ei: I) -> Self {
        Self { ei: ei }
    }

    /// Consumes the `LowLevel` object and returns the interface it
    /// was originally created with.
    pub fn take_interface(self) -> I {
        self.ei
    }

    pub fn borrow_interface<'a>(&'a mut self) -> &'a mut I {
        &mut self.ei
    }

    /// Writes the given byte string starting at the given address, as a
    /// single write transaction.
    pub fn wr8s(&mut self, addr: Address, v: &[u8]) -> Result<(), I::Error> {
        self.ei.write(addr, v)
    }

    pub fn wr8(&mut self, addr: Address, v: u8) -> Result<(), I::Error> {
        let data: [u8; 1] = [v];
        self.ei.write(addr, &data)
    }

    pub fn wr16(&mut self, addr: Address, v: u16) -> Result<(), I::Error> {
        let data: [u8; 2] = [v as u8, (v >> 8) as u8];
        self.ei.write(addr, &data)
    }

    pub fn wr32(&mut self, addr: Address, v: u32) -> Result<(), I::Error> {
        let data: [u8; 4] = [v as u8, (v >> 8) as u8, (v >> 16) as u8, (v >> 24) as u8];
        self.ei.write(addr, &data)
    }

    /// Reads a byte string starting at the given address, as a single
    /// read transaction.
    pub fn rd8s(&mut self, addr: Address, into: &mut [u8]) -> Result<(), I::Error> {
        self.ei.read(addr, into)
    }

    pub fn rd8(&mut self, addr: Address) -> Result<u8, I::Error> {
        let mut data: [u8; 1] = [0];
        self.ei.read(addr, &mut data)?;
        Ok(data[0])
    }

    pub fn rd16(&mut self, addr: Address) -> Result<u16, I::Error> {
        let mut data: [u8; 2] = [0; 2];
        self.ei.read(addr, &mut data)?;
        Ok((data[0] as u16) | (data[1] as u16) << 8)
    }

    pub fn rd32(&mut self, addr: Address) -> Result<u32, I::Error> {
        let mut data: [u8; 4] = [0; 4];
        self.ei.read(addr, &mut data)?;
        Ok((data[0] as u32)
            | (data[1] as u32) << 8
            | (data[2] as u32) << 16
            | (data[3] as u32) << 24)
    }

    /// Writes an 8-bit value to the given register.
    pub fn wr8r(&mut self, reg: Register, v: u8) -> Result<(), I::Error> {
        self.wr8(reg.address(), v)
    }

    /// Writes a 16-bit value to the given register.
    pub fn wr16r(&mut self, reg: Register, v: u16) -> Result<(), I::Error> {
        self.wr16(reg.address(), v)
    }

    /// Writes a 32-bit value to the given register.
    pub fn wr32r(&mut self, reg: Register, v: u32) -> Result<(), I::Error> {
        self.wr32(reg.address(), v)
    }

    /// Reads an 8-bit value from the given register.
    pub fn rd8r(&mut self, reg: Register) -> Result<u8, I::Error> {
        self.rd8(reg.address())
    }

    /// Reads a 16-bit value from the given register.
    pub fn rd16r(&mut self, reg: Register) -> Result<u16, I::Error> {
        self.rd16(reg.address())
    }

    /// Reads a 32-bit value from the given register.
    pub fn rd32r(&mut self, reg: Register) -> Result<u32, I::Error> {
        self.rd32(reg.address())
    }

    /// Sends the given host command with its two argument bytes.
    pub fn host_command(&mut self, cmd: HostCmd, a0: u8, a1: u8) -> Result<(), I::Error> {
        self.ei.host_cmd(cmd.raw(), a0, a1)
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use crate::interface::fake::Fake;
    use crate::interface::AddressRegion;

    #[test]
    fn test_value_endianness() {
        let mut ll = LowLevel::new(Fake::new());
        ll.wr32(AddressRegion::RAM_REG.offset(0x150), 0x11223344)
            .unwrap();
        let fake = ll.borrow_interface();
        assert_eq!(fake.reg32(0x150), 0x11223344);

        fake.set_reg16(0xf8, 0xabcd);
        assert_eq!(ll.rd16(AddressRegion::RAM_REG.offset(0xf8)).unwrap(), 0xabcd);
    }

    #[test]
    fn test_register_access() {
        let mut ll = LowLevel::new(Fake::new());
        ll.wr16r(Register::CMD_WRITE, 0x0ffc).unwrap();
        assert_eq!(ll.rd16r(Register::CMD_WRITE).unwrap(), 0x0ffc);
    }
}
