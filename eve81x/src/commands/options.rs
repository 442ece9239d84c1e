//! Option flags accepted by coprocessor drawing commands.

/// Center the drawn text on the given coordinates, both horizontally
/// and vertically.
pub const OPT_CENTER: u16 = 1536;

/// Horizontally center only.
pub const OPT_CENTERX: u16 = 512;

/// Vertically center only.
pub const OPT_CENTERY: u16 = 1024;

/// Right-justify on the given x coordinate.
pub const OPT_RIGHTX: u16 = 2048;
