//! A fake implementation of [`Interface`](crate::interface::Interface) for
//! use in unit tests.
//!
//! `Fake` models just enough of the chip to exercise this driver: the
//! register bank, the circular command FIFO, and the fault report memory.
//! By default the simulated coprocessor consumes everything as soon as it
//! is published; tests can arrange for it to fault instead, or script the
//! values returned by the touch register.

use super::{Address, Interface};

const DL_BASE: u32 = 0x300000;
const DL_LEN: usize = 8192;
const REG_BASE: u32 = 0x302000;
const REG_LEN: usize = 0x8000;
const CMD_BASE: u32 = 0x308000;
const CMD_LEN: usize = 4096;
const ERR_BASE: u32 = 0x309800;
const ERR_LEN: usize = 128;

const CMD_READ_OFFSET: usize = 0x0f8;
const CMD_WRITE_OFFSET: usize = 0x0fc;
const CPURESET_OFFSET: usize = 0x020;
const COPRO_PATCH_PTR_OFFSET: usize = 0x7162;
const TOUCH_DIRECT_XY_OFFSET: usize = 0x18c;

const FAULT_SENTINEL: u16 = 0xfff;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Error {
    /// A transaction method was called without the matching `begin`, or
    /// two transactions were open at once.
    IncorrectSequence,
    /// An access landed outside of all of the simulated memory regions.
    UnmappedAddress,
}

pub struct Fake {
    regs: [u8; REG_LEN],
    dl_ram: [u8; DL_LEN],
    cmd_ram: [u8; CMD_LEN],
    err_ram: [u8; ERR_LEN],

    write_addr: Option<u32>,
    read_addr: Option<u32>,
    cmd_write_touched: bool,
    cpureset_touched: bool,

    /// Whether the simulated coprocessor consumes the FIFO as soon as
    /// new commands are published. Disabled by a pending fault.
    auto_consume: bool,
    faulted: bool,
    fault_after: Option<u32>,
    fault_msg: [u8; ERR_LEN],

    publishes: u32,
    recoveries: u32,
    max_in_flight: u16,

    touch_script: [u32; 16],
    touch_script_len: usize,
    touch_script_pos: usize,

    host_cmds: [[u8; 3]; 8],
    host_cmd_count: usize,

    total_delay_ms: u32,
    resets: u32,
}

impl Fake {
    pub fn new() -> Self {
        let mut ret = Self {
            regs: [0; REG_LEN],
            dl_ram: [0; DL_LEN],
            cmd_ram: [0; CMD_LEN],
            err_ram: [0; ERR_LEN],
            write_addr: None,
            read_addr: None,
            cmd_write_touched: false,
            cpureset_touched: false,
            auto_consume: true,
            faulted: false,
            fault_after: None,
            fault_msg: [0; ERR_LEN],
            publishes: 0,
            recoveries: 0,
            max_in_flight: 0,
            touch_script: [0; 16],
            touch_script_len: 0,
            touch_script_pos: 0,
            host_cmds: [[0; 3]; 8],
            host_cmd_count: 0,
            total_delay_ms: 0,
            resets: 0,
        };
        // The chip is "already booted": identity readable, CPU running.
        ret.regs[0] = 0x7c;
        ret
    }

    /// Returns a fake whose simulated coprocessor never consumes anything,
    /// so the FIFO read offset stays wherever a test puts it.
    pub fn new_stalled() -> Self {
        let mut ret = Self::new();
        ret.auto_consume = false;
        ret
    }

    /// Arranges for the simulated coprocessor to fault after the given
    /// number of further publishes, leaving the given diagnostic text in
    /// the fault report memory.
    pub fn inject_fault(&mut self, msg: &str, after_publishes: u32) {
        self.fault_after = Some(self.publishes + after_publishes);
        self.fault_msg = [0; ERR_LEN];
        let msg = msg.as_bytes();
        let len = if msg.len() > ERR_LEN - 1 {
            ERR_LEN - 1
        } else {
            msg.len()
        };
        self.fault_msg[..len].copy_from_slice(&msg[..len]);
    }

    /// Scripts the sequence of values successive reads of the touch
    /// register will return. The final value repeats once the script is
    /// exhausted.
    pub fn script_touch(&mut self, values: &[u32]) {
        self.touch_script_len = values.len();
        self.touch_script_pos = 0;
        self.touch_script[..values.len()].copy_from_slice(values);
    }

    pub fn reg8(&self, offset: usize) -> u8 {
        self.regs[offset]
    }

    pub fn set_reg8(&mut self, offset: usize, v: u8) {
        self.regs[offset] = v;
    }

    pub fn reg16(&self, offset: usize) -> u16 {
        (self.regs[offset] as u16) | (self.regs[offset + 1] as u16) << 8
    }

    pub fn set_reg16(&mut self, offset: usize, v: u16) {
        self.regs[offset] = v as u8;
        self.regs[offset + 1] = (v >> 8) as u8;
    }

    pub fn reg32(&self, offset: usize) -> u32 {
        (self.regs[offset] as u32)
            | (self.regs[offset + 1] as u32) << 8
            | (self.regs[offset + 2] as u32) << 16
            | (self.regs[offset + 3] as u32) << 24
    }

    pub fn set_reg32(&mut self, offset: usize, v: u32) {
        self.regs[offset] = v as u8;
        self.regs[offset + 1] = (v >> 8) as u8;
        self.regs[offset + 2] = (v >> 16) as u8;
        self.regs[offset + 3] = (v >> 24) as u8;
    }

    /// Returns the 32-bit word at the given word index of the simulated
    /// display list memory.
    pub fn dl_word(&self, index: usize) -> u32 {
        let b = index * 4;
        (self.dl_ram[b] as u32)
            | (self.dl_ram[b + 1] as u32) << 8
            | (self.dl_ram[b + 2] as u32) << 16
            | (self.dl_ram[b + 3] as u32) << 24
    }

    /// Returns the 32-bit command word at the given word index of the
    /// simulated FIFO memory.
    pub fn cmd_word(&self, index: usize) -> u32 {
        let b = index * 4;
        (self.cmd_ram[b] as u32)
            | (self.cmd_ram[b + 1] as u32) << 8
            | (self.cmd_ram[b + 2] as u32) << 16
            | (self.cmd_ram[b + 3] as u32) << 24
    }

    /// The largest number of unconsumed FIFO bytes observed at any
    /// publish, which tests use to check flow control.
    pub fn max_in_flight(&self) -> u16 {
        self.max_in_flight
    }

    pub fn publish_count(&self) -> u32 {
        self.publishes
    }

    /// How many times the coprocessor has been reset via CPURESET.
    pub fn recovery_count(&self) -> u32 {
        self.recoveries
    }

    pub fn host_cmd_log(&self) -> &[[u8; 3]] {
        &self.host_cmds[..self.host_cmd_count]
    }

    pub fn total_delay_ms(&self) -> u32 {
        self.total_delay_ms
    }

    /// How many times the hardware reset line has been pulsed.
    pub fn reset_count(&self) -> u32 {
        self.resets
    }

    fn write_byte(&mut self, addr: u32, v: u8) -> Result<(), Error> {
        if addr >= DL_BASE && addr < DL_BASE + DL_LEN as u32 {
            self.dl_ram[(addr - DL_BASE) as usize] = v;
            return Ok(());
        }
        if addr >= CMD_BASE && addr < CMD_BASE + CMD_LEN as u32 {
            self.cmd_ram[(addr - CMD_BASE) as usize] = v;
            return Ok(());
        }
        if addr >= ERR_BASE && addr < ERR_BASE + ERR_LEN as u32 {
            self.err_ram[(addr - ERR_BASE) as usize] = v;
            return Ok(());
        }
        if addr >= REG_BASE && addr < REG_BASE + REG_LEN as u32 {
            let offset = (addr - REG_BASE) as usize;
            self.regs[offset] = v;
            if offset == CMD_WRITE_OFFSET || offset == CMD_WRITE_OFFSET + 1 {
                self.cmd_write_touched = true;
            }
            if offset == CPURESET_OFFSET {
                self.cpureset_touched = true;
            }
            return Ok(());
        }
        Err(Error::UnmappedAddress)
    }

    fn read_byte(&self, addr: u32) -> Result<u8, Error> {
        if addr >= DL_BASE && addr < DL_BASE + DL_LEN as u32 {
            return Ok(self.dl_ram[(addr - DL_BASE) as usize]);
        }
        if addr >= CMD_BASE && addr < CMD_BASE + CMD_LEN as u32 {
            return Ok(self.cmd_ram[(addr - CMD_BASE) as usize]);
        }
        if addr >= ERR_BASE && addr < ERR_BASE + ERR_LEN as u32 {
            return Ok(self.err_ram[(addr - ERR_BASE) as usize]);
        }
        if addr >= REG_BASE && addr < REG_BASE + REG_LEN as u32 {
            return Ok(self.regs[(addr - REG_BASE) as usize]);
        }
        Err(Error::UnmappedAddress)
    }

    fn handle_cpureset(&mut self) {
        if self.regs[CPURESET_OFFSET] & 1 != 0 {
            // Holding the coprocessor in reset loses its patched state.
            self.recoveries += 1;
            self.set_reg16(COPRO_PATCH_PTR_OFFSET, 0);
        } else {
            self.faulted = false;
        }
    }

    fn handle_publish(&mut self) {
        self.publishes += 1;
        if self.faulted {
            return;
        }
        let wr = self.reg16(CMD_WRITE_OFFSET);
        let rd = self.reg16(CMD_READ_OFFSET);
        let in_flight = wr.wrapping_sub(rd) & (CMD_LEN as u16 - 1);
        if in_flight > self.max_in_flight {
            self.max_in_flight = in_flight;
        }
        if let Some(after) = self.fault_after {
            if self.publishes >= after {
                self.faulted = true;
                self.set_reg16(CMD_READ_OFFSET, FAULT_SENTINEL);
                self.err_ram = self.fault_msg;
                return;
            }
        }
        if self.auto_consume {
            self.set_reg16(CMD_READ_OFFSET, wr);
        }
    }
}

impl Interface for Fake {
    type Error = Error;

    fn begin_write(&mut self, addr: Address) -> Result<(), Error> {
        if self.write_addr.is_some() || self.read_addr.is_some() {
            return Err(Error::IncorrectSequence);
        }
        self.write_addr = Some(addr.to_raw());
        Ok(())
    }

    fn continue_write(&mut self, v: &[u8]) -> Result<(), Error> {
        let mut addr = match self.write_addr {
            Some(addr) => addr,
            None => return Err(Error::IncorrectSequence),
        };
        for b in v {
            self.write_byte(addr, *b)?;
            addr += 1;
        }
        self.write_addr = Some(addr);
        Ok(())
    }

    fn end_write(&mut self) -> Result<(), Error> {
        if self.write_addr.take().is_none() {
            return Err(Error::IncorrectSequence);
        }
        if self.cpureset_touched {
            self.cpureset_touched = false;
            self.handle_cpureset();
        }
        if self.cmd_write_touched {
            self.cmd_write_touched = false;
            self.handle_publish();
        }
        Ok(())
    }

    fn begin_read(&mut self, addr: Address) -> Result<(), Error> {
        if self.write_addr.is_some() || self.read_addr.is_some() {
            return Err(Error::IncorrectSequence);
        }
        let raw = addr.to_raw();
        if raw == REG_BASE + TOUCH_DIRECT_XY_OFFSET as u32 && self.touch_script_len > 0 {
            let v = self.touch_script[self.touch_script_pos];
            if self.touch_script_pos + 1 < self.touch_script_len {
                self.touch_script_pos += 1;
            }
            self.set_reg32(TOUCH_DIRECT_XY_OFFSET, v);
        }
        self.read_addr = Some(raw);
        Ok(())
    }

    fn continue_read(&mut self, into: &mut [u8]) -> Result<(), Error> {
        let mut addr = match self.read_addr {
            Some(addr) => addr,
            None => return Err(Error::IncorrectSequence),
        };
        for b in into.iter_mut() {
            *b = self.read_byte(addr)?;
            addr += 1;
        }
        self.read_addr = Some(addr);
        Ok(())
    }

    fn end_read(&mut self) -> Result<(), Error> {
        if self.read_addr.take().is_none() {
            return Err(Error::IncorrectSequence);
        }
        Ok(())
    }

    fn host_cmd(&mut self, cmd: u8, a0: u8, a1: u8) -> Result<(), Error> {
        if self.host_cmd_count < self.host_cmds.len() {
            self.host_cmds[self.host_cmd_count] = [cmd, a0, a1];
            self.host_cmd_count += 1;
        }
        Ok(())
    }

    fn reset(&mut self) -> Result<(), Error> {
        self.resets += 1;
        Ok(())
    }

    fn delay_ms(&mut self, ms: u32) -> Result<(), Error> {
        self.total_delay_ms += ms;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use crate::interface::AddressRegion;

    #[test]
    fn test_bracket_discipline() {
        let mut fake = Fake::new();
        assert_eq!(
            fake.continue_write(&[0]),
            Err(Error::IncorrectSequence)
        );
        fake.begin_write(AddressRegion::RAM_G.offset(0)).unwrap();
        assert_eq!(
            fake.begin_read(AddressRegion::RAM_G.offset(0)),
            Err(Error::IncorrectSequence)
        );
        fake.end_write().unwrap();
        assert_eq!(fake.end_write(), Err(Error::IncorrectSequence));
    }

    #[test]
    fn test_fault_injection() {
        let mut fake = Fake::new();
        fake.inject_fault("boom", 1);
        fake.begin_write(AddressRegion::RAM_REG.offset(0xfc))
            .unwrap();
        fake.continue_write(&[0x04, 0x00]).unwrap();
        fake.end_write().unwrap();
        assert_eq!(fake.reg16(0xf8), 0xfff);
        assert_eq!(&fake.err_ram[..5], b"boom\0");
    }
}
