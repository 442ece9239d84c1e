//! Binds the `eve81x` driver to any SPI bus and GPIO pins offered via
//! the `embedded-hal` traits.

#![no_std]

use embedded_hal::blocking::delay::DelayMs;
use embedded_hal::blocking::spi;
use embedded_hal::digital::v2::OutputPin;
use eve81x::interface::{Address, Interface};

/// An implementation of `eve81x::interface::Interface` backed by an
/// `embedded-hal` SPI bus, a chip select pin, a power-down pin, and a
/// delay provider.
///
/// If the power-down line is not wired, pass a pin implementation that
/// silently discards the output.
pub struct HALSPIInterface<SPI, CS, PD, D> {
    spi: SPI,
    cs: CS,
    pd: PD,
    delay: D,
}

/// The errors from the underlying `embedded-hal` implementations,
/// labelled by which one failed.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum HALSPIError<SPIW, SPIT, CSE, PDE> {
    SPIWrite(SPIW),
    SPITransfer(SPIT),
    CS(CSE),
    PD(PDE),
}

impl<SPI, CS, PD, D> HALSPIInterface<SPI, CS, PD, D>
where
    SPI: spi::Write<u8> + spi::Transfer<u8>,
    CS: OutputPin,
    PD: OutputPin,
    D: DelayMs<u32>,
{
    /// Consumes the given SPI bus and pins and returns an interface.
    /// The chip select pin should already be de-asserted (high).
    pub fn new(spi: SPI, cs: CS, pd: PD, delay: D) -> Self {
        Self {
            spi: spi,
            cs: cs,
            pd: pd,
            delay: delay,
        }
    }

    /// Consumes the interface and returns its parts.
    pub fn release(self) -> (SPI, CS, PD, D) {
        (self.spi, self.cs, self.pd, self.delay)
    }
}

type ErrorFor<SPI, CS, PD> = HALSPIError<
    <SPI as spi::Write<u8>>::Error,
    <SPI as spi::Transfer<u8>>::Error,
    <CS as OutputPin>::Error,
    <PD as OutputPin>::Error,
>;

impl<SPI, CS, PD, D> Interface for HALSPIInterface<SPI, CS, PD, D>
where
    SPI: spi::Write<u8> + spi::Transfer<u8>,
    CS: OutputPin,
    PD: OutputPin,
    D: DelayMs<u32>,
{
    type Error = ErrorFor<SPI, CS, PD>;

    fn begin_write(&mut self, addr: Address) -> Result<(), Self::Error> {
        self.cs.set_low().map_err(HALSPIError::CS)?;
        let mut header: [u8; 3] = [0; 3];
        addr.build_write_header(&mut header);
        self.spi.write(&header).map_err(HALSPIError::SPIWrite)
    }

    fn continue_write(&mut self, v: &[u8]) -> Result<(), Self::Error> {
        self.spi.write(v).map_err(HALSPIError::SPIWrite)
    }

    fn end_write(&mut self) -> Result<(), Self::Error> {
        self.cs.set_high().map_err(HALSPIError::CS)
    }

    fn begin_read(&mut self, addr: Address) -> Result<(), Self::Error> {
        self.cs.set_low().map_err(HALSPIError::CS)?;
        let mut header: [u8; 4] = [0; 4];
        addr.build_read_header(&mut header);
        self.spi.write(&header).map_err(HALSPIError::SPIWrite)
    }

    fn continue_read(&mut self, into: &mut [u8]) -> Result<(), Self::Error> {
        self.spi
            .transfer(into)
            .map_err(HALSPIError::SPITransfer)?;
        Ok(())
    }

    fn end_read(&mut self) -> Result<(), Self::Error> {
        self.cs.set_high().map_err(HALSPIError::CS)
    }

    fn host_cmd(&mut self, cmd: u8, a0: u8, a1: u8) -> Result<(), Self::Error> {
        let mut msg: [u8; 3] = [0; 3];
        eve81x::interface::build_host_cmd_message(cmd, a0, a1, &mut msg);
        self.cs.set_low().map_err(HALSPIError::CS)?;
        self.spi.write(&msg).map_err(HALSPIError::SPIWrite)?;
        self.cs.set_high().map_err(HALSPIError::CS)
    }

    fn reset(&mut self) -> Result<(), Self::Error> {
        self.pd.set_low().map_err(HALSPIError::PD)?;
        self.delay.delay_ms(20);
        self.pd.set_high().map_err(HALSPIError::PD)?;
        self.delay.delay_ms(20);
        Ok(())
    }

    fn delay_ms(&mut self, ms: u32) -> Result<(), Self::Error> {
        self.delay.delay_ms(ms);
        Ok(())
    }
}
