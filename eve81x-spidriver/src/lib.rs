//! Binds the `eve81x` driver to an EVE chip connected via a SPIDriver
//! USB-to-SPI adapter, which is a convenient way to experiment with an
//! EVE board from a desktop system.

use std::thread;
use std::time::Duration;

use embedded_hal::serial::{Read, Write};
use eve81x::interface::{Address, Interface};
use spidriver::SPIDriver;

/// An implementation of `eve81x::interface::Interface` backed by a
/// SPIDriver adapter.
pub struct SPIDriverInterface<TX, RX>
where
    TX: Write<u8>,
    RX: Read<u8>,
{
    sd: SPIDriver<TX, RX>,
}

impl<TX, RX> SPIDriverInterface<TX, RX>
where
    TX: Write<u8>,
    RX: Read<u8>,
{
    pub fn new(sd: SPIDriver<TX, RX>) -> Self {
        Self { sd: sd }
    }

    /// Consumes the interface and returns the underlying SPIDriver
    /// handle.
    pub fn release(self) -> SPIDriver<TX, RX> {
        self.sd
    }
}

impl<TX, RX> Interface for SPIDriverInterface<TX, RX>
where
    TX: Write<u8>,
    RX: Read<u8>,
{
    type Error = spidriver::Error<TX::Error, RX::Error>;

    fn begin_write(&mut self, addr: Address) -> Result<(), Self::Error> {
        let mut header: [u8; 3] = [0; 3];
        addr.build_write_header(&mut header);
        self.sd.select()?;
        self.sd.write(&header)
    }

    fn continue_write(&mut self, v: &[u8]) -> Result<(), Self::Error> {
        self.sd.write(v)
    }

    fn end_write(&mut self) -> Result<(), Self::Error> {
        self.sd.unselect()
    }

    fn begin_read(&mut self, addr: Address) -> Result<(), Self::Error> {
        let mut header: [u8; 4] = [0; 4];
        addr.build_read_header(&mut header);
        self.sd.select()?;
        self.sd.write(&header)
    }

    fn continue_read(&mut self, into: &mut [u8]) -> Result<(), Self::Error> {
        self.sd.transfer(into)?;
        Ok(())
    }

    fn end_read(&mut self) -> Result<(), Self::Error> {
        self.sd.unselect()
    }

    fn host_cmd(&mut self, cmd: u8, a0: u8, a1: u8) -> Result<(), Self::Error> {
        let mut msg: [u8; 3] = [0; 3];
        eve81x::interface::build_host_cmd_message(cmd, a0, a1, &mut msg);
        self.sd.select()?;
        self.sd.write(&msg)?;
        self.sd.unselect()
    }

    /// The SPIDriver's auxiliary outputs are not necessarily wired to
    /// the EVE power-down line, so this performs no hardware reset and
    /// relies on the chip's power-on state.
    fn reset(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    fn delay_ms(&mut self, ms: u32) -> Result<(), Self::Error> {
        thread::sleep(Duration::from_millis(ms as u64));
        Ok(())
    }
}
