//! Bitmap font data consumed by [`crate::SpriteBatch::draw_string`].
//!
//! A font is a glyph atlas texture plus per-character metrics.  Building
//! the map (from a content pipeline, a TTF rasterizer, whatever) is the
//! content layer's business; text layout only reads it.

use crate::texture::Texture;
use crate::types::{Rect, Vec2};
use std::collections::HashMap;

/// Metrics for one character.
#[derive(Clone, Copy, Debug)]
pub struct Glyph {
    /// Pixel region of the glyph image inside the atlas texture.
    pub bounds: Rect,
    /// Offset from the pen position to the glyph quad's top-left corner.
    pub cropping: Vec2,
    /// Kerning triple: left side bearing, glyph width, right side bearing.
    /// The pen advances by the left bearing before the glyph is placed and
    /// by width + right bearing afterwards.
    pub kerning: [f32; 3],
}

/// A glyph map over one atlas texture, with the font-wide line spacing
/// and the uniform extra spacing added after every glyph.
#[derive(Clone, Debug)]
pub struct SpriteFont {
    texture: Texture,
    glyphs: HashMap<char, Glyph>,
    line_spacing: f32,
    spacing: f32,
}

impl SpriteFont {
    pub fn new(
        texture: Texture,
        glyphs: HashMap<char, Glyph>,
        line_spacing: f32,
        spacing: f32,
    ) -> Self {
        Self {
            texture,
            glyphs,
            line_spacing,
            spacing,
        }
    }

    pub fn texture(&self) -> &Texture {
        &self.texture
    }

    /// Looks up the metrics for `c`.  `None` means the character is not
    /// covered by this font; layout skips such characters entirely.
    pub fn glyph(&self, c: char) -> Option<&Glyph> {
        self.glyphs.get(&c)
    }

    /// Vertical distance between the baselines of consecutive lines.
    pub fn line_spacing(&self) -> f32 {
        self.line_spacing
    }

    /// Uniform spacing added after every glyph's own advance.
    pub fn spacing(&self) -> f32 {
        self.spacing
    }

    /// Measures `text` with the same pen arithmetic layout uses: covered
    /// glyphs advance the pen, `\n` starts a new line, unknown characters
    /// contribute nothing.  Returns the pen-swept extent.
    pub fn measure(&self, text: &str) -> Vec2 {
        if text.is_empty() {
            return Vec2::zero();
        }
        let mut x = 0.0f32;
        let mut y = 0.0f32;
        let mut widest = 0.0f32;
        for c in text.chars() {
            if c == '\n' {
                y += self.line_spacing;
                x = 0.0;
                continue;
            }
            if let Some(g) = self.glyphs.get(&c) {
                x += g.kerning[0] + g.kerning[1] + g.kerning[2] + self.spacing;
                widest = widest.max(x);
            }
        }
        Vec2::new(widest, y + self.line_spacing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::texture::TextureId;

    fn fixed_width_font() -> SpriteFont {
        let tex = Texture::new(TextureId(1), 128, 128);
        let mut glyphs = HashMap::new();
        for (i, c) in ['a', 'b', 'c'].into_iter().enumerate() {
            glyphs.insert(
                c,
                Glyph {
                    bounds: Rect::new(i as i32 * 8, 0, 8, 10),
                    cropping: Vec2::zero(),
                    kerning: [0.0, 8.0, 0.0],
                },
            );
        }
        SpriteFont::new(tex, glyphs, 12.0, 1.0)
    }

    #[test]
    fn measure_sums_advances() {
        let font = fixed_width_font();
        assert_eq!(font.measure("abc"), Vec2::new(27.0, 12.0));
    }

    #[test]
    fn measure_breaks_lines_and_skips_unknown() {
        let font = fixed_width_font();
        let size = font.measure("ab\nc?");
        assert_eq!(size.x, 18.0);
        assert_eq!(size.y, 24.0);
        assert_eq!(font.measure(""), Vec2::zero());
    }

    #[test]
    fn glyph_lookup_misses_uncovered_characters() {
        let font = fixed_width_font();
        assert!(font.glyph('a').is_some());
        assert!(font.glyph('?').is_none());
    }
}
