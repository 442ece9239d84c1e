//! Display list command words.
//!
//! Only the small set of drawing commands this driver itself emits is
//! represented here, since applications mostly build display lists via
//! the coprocessor rather than word-by-word.

/// A single 32-bit display list command word.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct DLCmd(u32);

/// The graphics primitives selectable with [`DLCmd::begin`](DLCmd::begin).
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[repr(u8)]
pub enum Primitive {
    Bitmaps = 1,
    Points = 2,
    Lines = 3,
    LineStrip = 4,
    Rects = 9,
}

impl DLCmd {
    pub const fn to_raw(self) -> u32 {
        self.0
    }

    /// Clears the color, stencil and/or tag buffers.
    pub const fn clear(color: bool, stencil: bool, tag: bool) -> Self {
        Self(
            (38 << 24)
                | (color as u32) << 2
                | (stencil as u32) << 1
                | (tag as u32),
        )
    }

    pub const fn clear_all() -> Self {
        Self::clear(true, true, true)
    }

    pub const fn clear_color_rgb(r: u8, g: u8, b: u8) -> Self {
        Self((2 << 24) | (r as u32) << 16 | (g as u32) << 8 | (b as u32))
    }

    pub const fn color_rgb(r: u8, g: u8, b: u8) -> Self {
        Self((4 << 24) | (r as u32) << 16 | (g as u32) << 8 | (b as u32))
    }

    /// Sets the point radius, in sixteenths of a pixel.
    pub const fn point_size(size: u32) -> Self {
        Self((13 << 24) | (size & 0x1fff))
    }

    pub const fn begin(prim: Primitive) -> Self {
        Self((31 << 24) | prim as u32)
    }

    pub const fn end() -> Self {
        Self(33 << 24)
    }

    /// Places a vertex at the given coordinates, in sixteenths of a pixel.
    pub const fn vertex2f(x: i32, y: i32) -> Self {
        Self((1 << 30) | ((x & 0x7fff) as u32) << 15 | (y & 0x7fff) as u32)
    }

    /// Terminates the display list.
    pub const fn display() -> Self {
        Self(0)
    }
}

/// Value for the DLSWAP register requesting a swap at the next frame
/// boundary.
pub const DLSWAP_FRAME: u8 = 0x02;

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;

    #[test]
    fn test_command_words() {
        assert_eq!(DLCmd::clear_all().to_raw(), 0x26000007);
        assert_eq!(DLCmd::clear_color_rgb(64, 64, 64).to_raw(), 0x02404040);
        assert_eq!(DLCmd::color_rgb(255, 0, 0).to_raw(), 0x04ff0000);
        assert_eq!(DLCmd::point_size(20 * 16).to_raw(), 0x0d000140);
        assert_eq!(DLCmd::begin(Primitive::Points).to_raw(), 0x1f000002);
        assert_eq!(DLCmd::end().to_raw(), 0x21000000);
        assert_eq!(DLCmd::display().to_raw(), 0);
    }

    #[test]
    fn test_vertex_packing() {
        assert_eq!(
            DLCmd::vertex2f(100 * 16, 50 * 16).to_raw(),
            (1 << 30) | (1600 << 15) | 800
        );
    }
}
