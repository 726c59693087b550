/// A colour in the host's ARGB encoding, used to tint vehicles by controller mode.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Color(u32);

impl Color {
    pub const BLACK: Color = Color::argb(255, 0, 0, 0);
    pub const WHITE: Color = Color::argb(255, 255, 255, 255);
    pub const RED: Color = Color::argb(255, 255, 0, 0);
    pub const GREEN: Color = Color::argb(255, 0, 255, 0);
    pub const BLUE: Color = Color::argb(255, 0, 0, 255);
    pub const YELLOW: Color = Color::argb(255, 255, 255, 0);
    pub const DARK_GREEN: Color = Color::argb(255, 0, 128, 0);
    pub const BLUE_GREEN: Color = Color::argb(255, 0, 128, 128);

    pub const fn argb(a: u8, r: u8, g: u8, b: u8) -> Self {
        Self((a as u32) << 24 | (r as u32) << 16 | (g as u32) << 8 | b as u32)
    }

    /// The colour as the integer the host expects.
    pub fn code(self) -> i64 {
        self.0 as i64
    }
}
