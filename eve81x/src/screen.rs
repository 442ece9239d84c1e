//! Descriptions of the attached display panel.

/// The video timing parameters for a panel, in pixel clocks and lines.
///
/// These come from the panel's datasheet. Values for some common
/// panels appear in the EVE programmers guide.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Timings {
    pub hcycle: u16,
    pub hoffset: u16,
    pub hsync0: u16,
    pub hsync1: u16,
    pub vcycle: u16,
    pub voffset: u16,
    pub vsync0: u16,
    pub vsync1: u16,
    pub width: u16,
    pub height: u16,
    pub swizzle: u8,
    pub pclk_pol: u8,
    pub cspread: u8,
    pub dither: u8,
    /// Divisor for the pixel clock. Writing this is what actually
    /// starts video output, so it is applied last during startup.
    pub pclk_div: u8,
}

/// The drawable area of the panel, for layout decisions such as where
/// calibration targets go.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct ScreenShape {
    pub width: u16,
    pub height: u16,
    /// Horizontal adjustment applied to everything drawn, for panels
    /// whose active area is offset from the scan origin.
    pub h_offset: i16,
    pub v_offset: i16,
}

impl ScreenShape {
    pub const fn new(width: u16, height: u16) -> Self {
        Self {
            width: width,
            height: height,
            h_offset: 0,
            v_offset: 0,
        }
    }
}

impl From<&Timings> for ScreenShape {
    fn from(t: &Timings) -> Self {
        Self::new(t.width, t.height)
    }
}
