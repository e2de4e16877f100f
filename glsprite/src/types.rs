use bytemuck::{Pod, Zeroable};
pub use std::f32::consts::PI;
pub use ultraviolet::mat::Mat4;
pub use ultraviolet::vec::{Vec2, Vec3, Vec4};

/// An axis-aligned pixel rectangle, used for texture source regions,
/// destination regions, glyph bounds, and scissor areas.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

impl Rect {
    pub fn new(x: i32, y: i32, w: i32, h: i32) -> Self {
        Self { x, y, w, h }
    }
    pub fn right(&self) -> i32 {
        self.x + self.w
    }
    pub fn bottom(&self) -> i32 {
        self.y + self.h
    }
}

#[repr(C)]
#[derive(Clone, Copy, PartialEq, Eq, Debug, Zeroable, Pod)]
pub struct Color(pub u8, pub u8, pub u8, pub u8);

impl Color {
    pub const WHITE: Color = Color(255, 255, 255, 255);
    pub const BLACK: Color = Color(0, 0, 0, 255);
    pub const TRANSPARENT: Color = Color(0, 0, 0, 0);
}

/// Mirror selector applied to a sprite's texture coordinates when it is
/// submitted.  Flipping twice restores the original mapping.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum SpriteEffects {
    #[default]
    None,
    FlipHorizontally,
    FlipVertically,
}
