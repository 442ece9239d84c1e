//! Host commands: out-of-band power and clock control messages.

/// Enumeration of the host commands the chip accepts while its memory
/// interface may not yet be running.
///
/// These are sent via [`Interface::host_cmd`](crate::interface::Interface::host_cmd)
/// rather than as memory writes, because several of them are meaningful
/// only before the chip's clock is configured.
#[derive(num_enum::IntoPrimitive, num_enum::TryFromPrimitive)]
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[allow(non_camel_case_types)]
#[repr(u8)]
pub enum HostCmd {
    /// Switch from Standby/Sleep to Active mode.
    ACTIVE = 0x00,
    /// Put the chip in Standby mode, keeping the PLL running.
    STANDBY = 0x41,
    /// Put the chip in Sleep mode.
    SLEEP = 0x42,
    /// Power down all circuits except the SPI interface.
    PWRDOWN = 0x50,
    /// Select the internal oscillator as the clock source.
    CLKINT = 0x48,
    /// Select an external crystal as the clock source.
    CLKEXT = 0x44,
    /// Trigger a system reset without touching the power state.
    RST_PULSE = 0x68,
}

impl HostCmd {
    /// Returns the raw command byte to transmit for this host command.
    pub fn raw(self) -> u8 {
        self.into()
    }
}
