//! The packed vertex record uploaded for every sprite corner.

use crate::types::Color;
use bytemuck::{Pod, Zeroable};

/// One corner of a sprite quad: a screen-space position, a packed RGBA
/// tint, and a normalized texture coordinate.
///
/// The field order and 20-byte stride are frozen; both backend
/// generations bind attribute offsets against this exact layout, so any
/// change here invalidates their pointer arithmetic.
#[repr(C)]
#[derive(Clone, Copy, PartialEq, Debug, Zeroable, Pod)]
pub struct SpriteVertex {
    pub position: [f32; 2],
    pub color: Color,
    pub uv: [f32; 2],
}

impl SpriteVertex {
    /// Byte distance between consecutive vertices in the scratch array.
    pub const STRIDE: i32 = std::mem::size_of::<SpriteVertex>() as i32;
    pub const POSITION_OFFSET: i32 = 0;
    pub const COLOR_OFFSET: i32 = 8;
    pub const UV_OFFSET: i32 = 12;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_is_frozen() {
        assert_eq!(SpriteVertex::STRIDE, 20);
        assert_eq!(
            SpriteVertex::COLOR_OFFSET as usize,
            std::mem::offset_of!(SpriteVertex, color)
        );
        assert_eq!(
            SpriteVertex::UV_OFFSET as usize,
            std::mem::offset_of!(SpriteVertex, uv)
        );
    }
}
