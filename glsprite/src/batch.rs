//! Quad accumulation, ordering, and flushing.
//!
//! Every sprite or glyph submitted between `begin` and `end` becomes one
//! [`BatchItem`].  Items are pooled and reused across frames, so a steady
//! frame allocates nothing.  [`SpriteBatcher::draw_batch`] turns the
//! accumulated items into as few indexed draw calls as the requested
//! ordering allows, switching draw calls only when the bound texture
//! changes.

use std::collections::VecDeque;

use bytemuck::Zeroable;

use crate::backend::RenderBackend;
use crate::texture::TextureId;
use crate::types::{Color, Vec2};
use crate::vertex::SpriteVertex;

/// Quad capacity the scratch arrays start with.
const INITIAL_QUADS: usize = 256;
/// Quad capacity is always a multiple of this step.
const GROWTH_STEP: usize = 128;

/// How `draw_batch` orders items before flushing.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum SpriteSortMode {
    /// Submission order is preserved.
    #[default]
    Deferred,
    /// Submission order is preserved; kept distinct from [`Self::Deferred`]
    /// for API compatibility with callers that request it.
    Immediate,
    /// Ascending texture handle, which makes equal textures contiguous and
    /// the draw-call count minimal.
    Texture,
    /// Ascending depth.
    FrontToBack,
    /// Descending depth.
    BackToFront,
}

/// One quad's worth of geometry: the four corner vertices plus the keys
/// `draw_batch` sorts and groups by.
#[derive(Clone, Copy, Debug)]
pub struct BatchItem {
    pub top_left: SpriteVertex,
    pub top_right: SpriteVertex,
    pub bottom_left: SpriteVertex,
    pub bottom_right: SpriteVertex,
    /// Sort key only; vertices carry no depth.
    pub depth: f32,
    /// Sort key and flush boundary.
    pub texture: TextureId,
}

impl BatchItem {
    fn cleared() -> Self {
        Self {
            top_left: SpriteVertex::zeroed(),
            top_right: SpriteVertex::zeroed(),
            bottom_left: SpriteVertex::zeroed(),
            bottom_right: SpriteVertex::zeroed(),
            depth: 0.0,
            texture: TextureId::UNBOUND,
        }
    }

    /// Fills the corners from a rotated placement: `(x, y)` is the pivot,
    /// `(dx, dy)` the offset from the pivot to the quad's top-left (origin
    /// and scale already folded in), `(w, h)` the scaled size, and
    /// `sin`/`cos` the precomputed rotation terms.
    #[allow(clippy::too_many_arguments)]
    pub fn set(
        &mut self,
        x: f32,
        y: f32,
        dx: f32,
        dy: f32,
        w: f32,
        h: f32,
        sin: f32,
        cos: f32,
        color: Color,
        uv_tl: Vec2,
        uv_br: Vec2,
    ) {
        self.top_left = SpriteVertex {
            position: [x + dx * cos - dy * sin, y + dx * sin + dy * cos],
            color,
            uv: [uv_tl.x, uv_tl.y],
        };
        self.top_right = SpriteVertex {
            position: [
                x + (dx + w) * cos - dy * sin,
                y + (dx + w) * sin + dy * cos,
            ],
            color,
            uv: [uv_br.x, uv_tl.y],
        };
        self.bottom_left = SpriteVertex {
            position: [
                x + dx * cos - (dy + h) * sin,
                y + dx * sin + (dy + h) * cos,
            ],
            color,
            uv: [uv_tl.x, uv_br.y],
        };
        self.bottom_right = SpriteVertex {
            position: [
                x + (dx + w) * cos - (dy + h) * sin,
                y + (dx + w) * sin + (dy + h) * cos,
            ],
            color,
            uv: [uv_br.x, uv_br.y],
        };
    }

    /// Axis-aligned shortcut for the unrotated draw calls.
    pub fn set_rect(&mut self, x: f32, y: f32, w: f32, h: f32, color: Color, uv_tl: Vec2, uv_br: Vec2) {
        self.top_left = SpriteVertex {
            position: [x, y],
            color,
            uv: [uv_tl.x, uv_tl.y],
        };
        self.top_right = SpriteVertex {
            position: [x + w, y],
            color,
            uv: [uv_br.x, uv_tl.y],
        };
        self.bottom_left = SpriteVertex {
            position: [x, y + h],
            color,
            uv: [uv_tl.x, uv_br.y],
        };
        self.bottom_right = SpriteVertex {
            position: [x + w, y + h],
            color,
            uv: [uv_br.x, uv_br.y],
        };
    }
}

/// Owns the item pool and the vertex/index scratch arrays, and turns the
/// live items into draw calls.
///
/// Two states only: idle (no live items) and accumulating.  `draw_batch`
/// is the single transition back to idle.
pub struct SpriteBatcher {
    live: Vec<BatchItem>,
    free: VecDeque<BatchItem>,
    vertices: Vec<SpriteVertex>,
    indices: Vec<u16>,
}

/// The two-triangle winding for quad slot `i`, relative to its block of
/// four vertices.
fn index_pattern(quads: usize) -> Vec<u16> {
    let mut indices = vec![0u16; quads * 6];
    for i in 0..quads {
        indices[i * 6] = (i * 4) as u16;
        indices[i * 6 + 1] = (i * 4 + 1) as u16;
        indices[i * 6 + 2] = (i * 4 + 2) as u16;
        indices[i * 6 + 3] = (i * 4 + 1) as u16;
        indices[i * 6 + 4] = (i * 4 + 3) as u16;
        indices[i * 6 + 5] = (i * 4 + 2) as u16;
    }
    indices
}

impl Default for SpriteBatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl SpriteBatcher {
    pub fn new() -> Self {
        Self {
            live: Vec::with_capacity(INITIAL_QUADS),
            free: VecDeque::with_capacity(INITIAL_QUADS),
            vertices: vec![SpriteVertex::zeroed(); INITIAL_QUADS * 4],
            indices: index_pattern(INITIAL_QUADS),
        }
    }

    /// Takes an item from the free pool (or allocates a fresh one if the
    /// pool is dry) and marks it live.  Never fails; capacity follows the
    /// submission count.
    pub fn create_item(&mut self) -> &mut BatchItem {
        let item = self.free.pop_front().unwrap_or_else(BatchItem::cleared);
        self.live.push(item);
        self.live.last_mut().expect("just pushed")
    }

    /// Items accumulated since the last `draw_batch`.
    pub fn pending(&self) -> usize {
        self.live.len()
    }

    /// Items waiting in the free pool.
    pub fn pooled(&self) -> usize {
        self.free.len()
    }

    /// Current quad capacity of the scratch arrays.
    pub fn quad_capacity(&self) -> usize {
        self.vertices.len() / 4
    }

    /// Sorts, groups, and flushes the live items through `backend`, then
    /// returns every item to the free pool.
    ///
    /// With zero live items this is a no-op: no backend call is made and
    /// the pool is untouched.
    pub fn draw_batch(&mut self, sort: SpriteSortMode, backend: &mut impl RenderBackend) {
        if self.live.is_empty() {
            return;
        }

        // All sorts are stable: equal keys keep their submission order.
        match sort {
            SpriteSortMode::Texture => self.live.sort_by(|a, b| a.texture.cmp(&b.texture)),
            SpriteSortMode::FrontToBack => {
                self.live.sort_by(|a, b| a.depth.total_cmp(&b.depth))
            }
            SpriteSortMode::BackToFront => {
                self.live.sort_by(|a, b| b.depth.total_cmp(&a.depth))
            }
            SpriteSortMode::Deferred | SpriteSortMode::Immediate => {}
        }

        if self.live.len() * 4 > self.vertices.len() {
            self.grow(self.live.len());
            // Any GPU-side copy of the old arrays is stale now.
            backend.arrays_grown(&self.indices);
        }

        let mut start = 0usize;
        let mut cursor = 0usize;
        let mut bound: Option<TextureId> = None;
        for item in &self.live {
            if bound != Some(item.texture) {
                // Texture switch: draw what accumulated under the old
                // binding before moving on.
                if cursor > start {
                    backend.draw_quads(&self.vertices, &self.indices, start, cursor - start);
                }
                start = cursor;
                bound = Some(item.texture);
                backend.bind_texture(item.texture);
            }
            self.vertices[cursor] = item.top_left;
            self.vertices[cursor + 1] = item.top_right;
            self.vertices[cursor + 2] = item.bottom_left;
            self.vertices[cursor + 3] = item.bottom_right;
            cursor += 4;
        }
        if cursor > start {
            backend.draw_quads(&self.vertices, &self.indices, start, cursor - start);
        }

        self.free.extend(self.live.drain(..));
    }

    /// Steps the quad capacity up in multiples of [`GROWTH_STEP`] until it
    /// covers `required_quads`, regenerating the index pattern for the new
    /// capacity.
    fn grow(&mut self, required_quads: usize) {
        let mut quads = self.quad_capacity();
        while required_quads > quads {
            quads += GROWTH_STEP;
        }
        self.vertices = vec![SpriteVertex::zeroed(); quads * 4];
        self.indices = index_pattern(quads);
    }
}
