//! Bringing the chip from power-on to live video output.

use crate::display_list::{DLCmd, DLSWAP_FRAME};
use crate::host_commands::HostCmd;
use crate::interface::{AddressRegion, Interface};
use crate::low_level::LowLevel;
use crate::registers::Register;
use crate::screen::Timings;

/// Which oscillator the chip should run from. Most boards wire up an
/// external crystal.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ClockSource {
    Internal,
    External,
}

/// Pulses the hardware reset line (if wired) and wakes the chip, then
/// gives it time to start its clock.
pub fn activate<I: Interface>(ll: &mut LowLevel<I>, clock: ClockSource) -> Result<(), I::Error> {
    ll.borrow_interface().reset()?;
    match clock {
        ClockSource::External => ll.host_command(HostCmd::CLKEXT, 0, 0)?,
        ClockSource::Internal => ll.host_command(HostCmd::CLKINT, 0, 0)?,
    }
    ll.host_command(HostCmd::ACTIVE, 0, 0)?;
    ll.borrow_interface().delay_ms(100)
}

/// Polls until the chip proves it has booted, returning `false` if it
/// never does within the poll budget.
///
/// Booting is confirmed in two phases: first the identity register must
/// produce its expected value, which shows the memory interface is up,
/// and then the reset status register must read zero, which shows all
/// of the internal engines have left reset.
pub fn poll_for_boot<I: Interface>(ll: &mut LowLevel<I>, poll_limit: u32) -> Result<bool, I::Error> {
    let mut id_seen = false;
    for _ in 0..poll_limit {
        if ll.rd8r(Register::ID)? == Register::EXPECTED_ID {
            id_seen = true;
            break;
        }
    }
    if !id_seen {
        return Ok(false);
    }
    for _ in 0..poll_limit {
        if ll.rd8r(Register::CPURESET)? == 0 {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Loads the panel's video timings into the timing registers.
///
/// This deliberately leaves the pixel clock stopped; video output does
/// not start until [`start_video`](start_video).
pub fn apply_timings<I: Interface>(ll: &mut LowLevel<I>, t: &Timings) -> Result<(), I::Error> {
    ll.wr16r(Register::HCYCLE, t.hcycle)?;
    ll.wr16r(Register::HOFFSET, t.hoffset)?;
    ll.wr16r(Register::HSYNC0, t.hsync0)?;
    ll.wr16r(Register::HSYNC1, t.hsync1)?;
    ll.wr16r(Register::VCYCLE, t.vcycle)?;
    ll.wr16r(Register::VOFFSET, t.voffset)?;
    ll.wr16r(Register::VSYNC0, t.vsync0)?;
    ll.wr16r(Register::VSYNC1, t.vsync1)?;
    ll.wr16r(Register::HSIZE, t.width)?;
    ll.wr16r(Register::VSIZE, t.height)?;
    ll.wr8r(Register::SWIZZLE, t.swizzle)?;
    ll.wr8r(Register::PCLK_POL, t.pclk_pol)?;
    ll.wr8r(Register::CSPREAD, t.cspread)?;
    ll.wr8r(Register::DITHER, t.dither)
}

/// Configures the resistive touch engine with conservative defaults.
pub fn configure_touch<I: Interface>(ll: &mut LowLevel<I>) -> Result<(), I::Error> {
    // Continuous sampling.
    ll.wr8r(Register::TOUCH_MODE, 0x02)?;
    // Single-ended ADC mode.
    ll.wr8r(Register::TOUCH_ADC_MODE, 0x01)?;
    ll.wr8r(Register::TOUCH_OVERSAMPLE, 15)?;
    // Pressure threshold; higher values register lighter touches.
    ll.wr16r(Register::TOUCH_RZTHRESH, 1200)
}

/// Shows a blank display list and starts video output and the
/// backlight. Call after [`apply_timings`](apply_timings).
pub fn start_video<I: Interface>(ll: &mut LowLevel<I>, t: &Timings) -> Result<(), I::Error> {
    // An all-black display list, so the panel shows something sane the
    // instant the pixel clock starts.
    ll.wr32(
        AddressRegion::RAM_DL + 0,
        DLCmd::clear_color_rgb(0, 0, 0).to_raw(),
    )?;
    ll.wr32(AddressRegion::RAM_DL + 4, DLCmd::clear_all().to_raw())?;
    ll.wr32(AddressRegion::RAM_DL + 8, DLCmd::display().to_raw())?;
    ll.wr8r(Register::DLSWAP, DLSWAP_FRAME)?;

    // Display-enable and backlight lines live on GPIOX on these chips.
    let dir = ll.rd16r(Register::GPIOX_DIR)?;
    ll.wr16r(Register::GPIOX_DIR, dir | 0x8000)?;
    let gpio = ll.rd16r(Register::GPIOX)?;
    ll.wr16r(Register::GPIOX, gpio | 0x8000)?;
    ll.wr16r(Register::PWM_HZ, 0x00fa)?;
    ll.wr8r(Register::PWM_DUTY, 128)?;

    // Starting the pixel clock is what actually turns the panel on.
    ll.wr8r(Register::PCLK, t.pclk_div)
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use crate::interface::fake::Fake;

    fn timings_480x272() -> Timings {
        Timings {
            hcycle: 548,
            hoffset: 43,
            hsync0: 0,
            hsync1: 41,
            vcycle: 292,
            voffset: 12,
            vsync0: 0,
            vsync1: 10,
            width: 480,
            height: 272,
            swizzle: 0,
            pclk_pol: 1,
            cspread: 1,
            dither: 1,
            pclk_div: 5,
        }
    }

    #[test]
    fn test_activate_sequence() {
        let mut ll = LowLevel::new(Fake::new());
        activate(&mut ll, ClockSource::External).unwrap();
        let fake = ll.borrow_interface();
        assert_eq!(fake.reset_count(), 1);
        assert_eq!(fake.host_cmd_log(), &[[0x44, 0, 0], [0x00, 0, 0]]);
        assert!(fake.total_delay_ms() >= 100);
    }

    #[test]
    fn test_poll_for_boot() {
        let mut ll = LowLevel::new(Fake::new());
        assert!(poll_for_boot(&mut ll, 10).unwrap());

        let mut fake = Fake::new();
        fake.set_reg8(0x00, 0);
        let mut ll = LowLevel::new(fake);
        assert!(!poll_for_boot(&mut ll, 10).unwrap());

        let mut fake = Fake::new();
        fake.set_reg8(0x20, 0x07);
        let mut ll = LowLevel::new(fake);
        assert!(!poll_for_boot(&mut ll, 10).unwrap());
    }

    #[test]
    fn test_apply_timings() {
        let mut ll = LowLevel::new(Fake::new());
        apply_timings(&mut ll, &timings_480x272()).unwrap();
        let fake = ll.borrow_interface();
        assert_eq!(fake.reg16(0x2c), 548);
        assert_eq!(fake.reg16(0x34), 480);
        assert_eq!(fake.reg16(0x48), 272);
        // The pixel clock must still be stopped.
        assert_eq!(fake.reg8(0x70), 0);
    }

    #[test]
    fn test_start_video() {
        let mut ll = LowLevel::new(Fake::new());
        start_video(&mut ll, &timings_480x272()).unwrap();
        let fake = ll.borrow_interface();
        assert_eq!(fake.dl_word(0), 0x02000000);
        assert_eq!(fake.dl_word(1), 0x26000007);
        assert_eq!(fake.dl_word(2), 0);
        assert_eq!(fake.reg8(0x54), DLSWAP_FRAME);
        assert_eq!(fake.reg16(0x9c) & 0x8000, 0x8000);
        assert_eq!(fake.reg8(0x70), 5);
    }
}
