//! The attached-flash lifecycle on BT81x chips.
//!
//! BT81x chips can bridge an external QSPI flash chip into their memory
//! map. The flash moves between states: detached, attached in "basic"
//! (slow) mode, and "full" (fast) mode, which requires a blob from the
//! flash itself and is the only state that supports rendering assets
//! directly from flash.

use core::convert::TryFrom;

use crate::commands::coprocessor::{Coprocessor, Error};
use crate::commands::waiter::Waiter;
use crate::interface::Interface;
use crate::registers::Register;

const CMD_FLASHERASE: u32 = 0xffffff44;
const CMD_FLASHDETACH: u32 = 0xffffff48;
const CMD_FLASHATTACH: u32 = 0xffffff49;
const CMD_FLASHFAST: u32 = 0xffffff4a;

/// The states the attached flash can be in, as reported by the flash
/// status register.
#[derive(num_enum::IntoPrimitive, num_enum::TryFromPrimitive)]
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[repr(u8)]
pub enum FlashStatus {
    /// The chip has not finished probing the flash yet.
    Init = 0,
    /// No flash is attached, or it has been detached.
    Detached = 1,
    /// Attached at a conservative clock rate.
    Basic = 2,
    /// Attached in fast mode.
    Full = 3,
}

impl<I: Interface, W: Waiter<I>> Coprocessor<I, W> {
    /// Reads the current flash state. Unknown register values read as
    /// [`FlashStatus::Init`](FlashStatus::Init).
    pub fn flash_status(&mut self) -> Result<FlashStatus, Error<I::Error>> {
        let raw = self
            .low_level()
            .rd8r(Register::FLASH_STATUS)
            .map_err(Error::Interface)?;
        Ok(FlashStatus::try_from(raw).unwrap_or(FlashStatus::Init))
    }

    /// Attaches the flash in basic mode, returning whether it is now
    /// attached.
    pub fn flash_attach(&mut self) -> Result<bool, Error<I::Error>> {
        self.submit_words(&[CMD_FLASHATTACH])?;
        if let Some(_) = self.drain()? {
            return Ok(false);
        }
        Ok(self.flash_status()? == FlashStatus::Basic)
    }

    /// Detaches the flash, returning whether it is now detached. The
    /// flash's QSPI lines float afterwards, so an external programmer
    /// can take over the chip.
    pub fn flash_detach(&mut self) -> Result<bool, Error<I::Error>> {
        self.submit_words(&[CMD_FLASHDETACH])?;
        if let Some(_) = self.drain()? {
            return Ok(false);
        }
        Ok(self.flash_status()? == FlashStatus::Detached)
    }

    /// Switches an attached flash into fast mode, returning whether it
    /// succeeded. The flash must already be attached and must carry a
    /// valid blob in its first sector.
    pub fn flash_fast(&mut self) -> Result<bool, Error<I::Error>> {
        // The command takes one argument word that the coprocessor
        // overwrites with a result code.
        self.submit_words(&[CMD_FLASHFAST, 0])?;
        if let Some(_) = self.drain()? {
            return Ok(false);
        }
        Ok(self.flash_status()? == FlashStatus::Full)
    }

    /// Erases the entire flash. This takes a long time on real
    /// hardware, so callers should use a patient waiter.
    pub fn flash_erase(&mut self) -> Result<(), Error<I::Error>> {
        self.submit_words(&[CMD_FLASHERASE])?;
        self.drain()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use crate::commands::PollingWaiter;
    use crate::interface::fake::Fake;

    const FLASH_STATUS_OFFSET: usize = 0x5f0;

    fn new_cp(fake: Fake) -> Coprocessor<Fake, PollingWaiter> {
        Coprocessor::new(fake, PollingWaiter::new(100)).unwrap()
    }

    #[test]
    fn test_flash_attach() {
        let mut fake = Fake::new();
        fake.set_reg8(FLASH_STATUS_OFFSET, FlashStatus::Basic as u8);
        let mut cp = new_cp(fake);
        assert!(cp.flash_attach().unwrap());
        let fake = cp.low_level().borrow_interface();
        assert_eq!(fake.cmd_word(0), CMD_FLASHATTACH);
    }

    #[test]
    fn test_flash_fast_sends_result_word() {
        let mut fake = Fake::new();
        fake.set_reg8(FLASH_STATUS_OFFSET, FlashStatus::Full as u8);
        let mut cp = new_cp(fake);
        assert!(cp.flash_fast().unwrap());
        let fake = cp.low_level().borrow_interface();
        assert_eq!(fake.cmd_word(0), 0xffffff4a);
        assert_eq!(fake.cmd_word(1), 0);
        assert_eq!(fake.reg16(0xfc), 8);
    }

    #[test]
    fn test_flash_detach_not_reached() {
        let mut fake = Fake::new();
        fake.set_reg8(FLASH_STATUS_OFFSET, FlashStatus::Basic as u8);
        let mut cp = new_cp(fake);
        // Status register still says basic, so detach reports failure.
        assert!(!cp.flash_detach().unwrap());
    }

    #[test]
    fn test_flash_happy_path() {
        let mut fake = Fake::new();
        fake.set_reg8(FLASH_STATUS_OFFSET, FlashStatus::Basic as u8);
        let mut cp = new_cp(fake);
        assert!(cp.flash_attach().unwrap());
        cp.low_level()
            .borrow_interface()
            .set_reg8(FLASH_STATUS_OFFSET, FlashStatus::Full as u8);
        assert!(cp.flash_fast().unwrap());
        cp.flash_erase().unwrap();
        let fake = cp.low_level().borrow_interface();
        assert_eq!(fake.cmd_word(0), CMD_FLASHATTACH);
        assert_eq!(fake.cmd_word(1), CMD_FLASHFAST);
        assert_eq!(fake.cmd_word(2), 0);
        assert_eq!(fake.cmd_word(3), CMD_FLASHERASE);
    }

    #[test]
    fn test_flash_status_unknown_value() {
        let mut fake = Fake::new();
        fake.set_reg8(FLASH_STATUS_OFFSET, 0x7f);
        let mut cp = new_cp(fake);
        assert_eq!(cp.flash_status().unwrap(), FlashStatus::Init);
    }
}
