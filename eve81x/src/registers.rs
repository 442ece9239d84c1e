//! The registers of the EVE chip, as offsets into the register bank.

use crate::interface::{Address, AddressRegion};

/// Enumeration of the register offsets this driver works with.
///
/// Each variant's value is the register's byte offset from the base of
/// the register bank, so `Register::ID as u32` is directly the offset
/// used in the datasheet's memory map tables.
#[derive(num_enum::IntoPrimitive, num_enum::TryFromPrimitive)]
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[allow(non_camel_case_types)]
#[repr(u32)]
pub enum Register {
    ID = 0x000,
    CPURESET = 0x020,
    HCYCLE = 0x02c,
    HOFFSET = 0x030,
    HSIZE = 0x034,
    HSYNC0 = 0x038,
    HSYNC1 = 0x03c,
    VCYCLE = 0x040,
    VOFFSET = 0x044,
    VSIZE = 0x048,
    VSYNC0 = 0x04c,
    VSYNC1 = 0x050,
    DLSWAP = 0x054,
    DITHER = 0x060,
    SWIZZLE = 0x064,
    CSPREAD = 0x068,
    PCLK_POL = 0x06c,
    PCLK = 0x070,
    GPIOX_DIR = 0x098,
    GPIOX = 0x09c,
    PWM_HZ = 0x0d0,
    PWM_DUTY = 0x0d4,
    CMD_READ = 0x0f8,
    CMD_WRITE = 0x0fc,
    CMD_DL = 0x100,
    TOUCH_MODE = 0x104,
    TOUCH_ADC_MODE = 0x108,
    TOUCH_OVERSAMPLE = 0x114,
    TOUCH_RZTHRESH = 0x118,
    TOUCH_TRANSFORM_A = 0x150,
    TOUCH_TRANSFORM_B = 0x154,
    TOUCH_TRANSFORM_C = 0x158,
    TOUCH_TRANSFORM_D = 0x15c,
    TOUCH_TRANSFORM_E = 0x160,
    TOUCH_TRANSFORM_F = 0x164,
    TOUCH_DIRECT_XY = 0x18c,
    FLASH_STATUS = 0x5f0,
    COPRO_PATCH_PTR = 0x7162,
}

impl Register {
    /// Returns the absolute address of the register in the memory map.
    pub fn address(self) -> Address {
        AddressRegion::RAM_REG.offset(self as u32)
    }

    /// The value the identity register reports on all chips this
    /// driver supports.
    pub const EXPECTED_ID: u8 = 0x7c;
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use crate::interface::Address;

    #[test]
    fn test_register_addresses() {
        assert_eq!(Register::ID.address(), Address::force_raw(0x302000));
        assert_eq!(Register::CMD_READ.address(), Address::force_raw(0x3020f8));
        assert_eq!(Register::CMD_WRITE.address(), Address::force_raw(0x3020fc));
        assert_eq!(
            Register::COPRO_PATCH_PTR.address(),
            Address::force_raw(0x309162)
        );
    }
}
