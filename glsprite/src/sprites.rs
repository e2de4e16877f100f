//! The submission facade: session scoping, draw-call conversion, and
//! text layout.
//!
//! A frame looks like `begin` (or `begin_with`), any number of `draw*`
//! calls, then `end`.  Draw calls only fill pooled batch items; all GPU
//! work happens in `end`, which hands the session state to the backend
//! once and then flushes the batcher.

use log::trace;

use crate::backend::{
    BlendState, DepthStencilState, Effect, PassState, RasterizerState, RenderBackend, SamplerState,
};
use crate::batch::{SpriteBatcher, SpriteSortMode};
use crate::font::SpriteFont;
use crate::texture::Texture;
use crate::types::{Color, Mat4, Rect, SpriteEffects, Vec2};

/// Per-session configuration.  Every field has a default and `begin`
/// resets all of them; nothing carries over from the previous session.
#[derive(Clone, Copy, Debug)]
pub struct BatchSettings {
    pub sort: SpriteSortMode,
    pub blend: BlendState,
    pub sampler: SamplerState,
    pub depth_stencil: DepthStencilState,
    pub rasterizer: RasterizerState,
    pub effect: Option<Effect>,
    pub transform: Mat4,
}

impl Default for BatchSettings {
    fn default() -> Self {
        Self {
            sort: SpriteSortMode::Deferred,
            blend: BlendState::AlphaBlend,
            sampler: SamplerState::LinearClamp,
            depth_stencil: DepthStencilState::None,
            rasterizer: RasterizerState::default(),
            effect: None,
            transform: Mat4::identity(),
        }
    }
}

/// Optional geometry parameters for a single draw call.  The plain
/// `draw`/`draw_rect`/`draw_string` calls are shorthand for passing the
/// defaults here.
#[derive(Clone, Copy, Debug)]
pub struct DrawOptions {
    /// Texture region to sample; the full texture when `None`.  Ignored
    /// by `draw_string_with`, where each glyph brings its own region.
    pub source: Option<Rect>,
    /// Rotation about the position, in radians.
    pub rotation: f32,
    /// Pivot inside the sprite, in source pixels.
    pub origin: Vec2,
    /// Scale folded into the corner offsets.  Ignored by
    /// `draw_rect_with`, where the destination rectangle already fixes
    /// the size.
    pub scale: Vec2,
    pub effects: SpriteEffects,
    /// Sort key for the depth sort modes.
    pub depth: f32,
}

impl Default for DrawOptions {
    fn default() -> Self {
        Self {
            source: None,
            rotation: 0.0,
            origin: Vec2::zero(),
            scale: Vec2::one(),
            effects: SpriteEffects::None,
            depth: 0.0,
        }
    }
}

/// Resolves the sampled region and its two defining texture
/// coordinates, with any flip already folded in.
fn source_uvs(
    texture: &Texture,
    source: Option<Rect>,
    effects: SpriteEffects,
) -> (Rect, Vec2, Vec2) {
    let rect = source.unwrap_or_else(|| texture.bounds());
    let mut tl = texture.texcoord(rect.x, rect.y);
    let mut br = texture.texcoord(rect.right(), rect.bottom());
    match effects {
        SpriteEffects::FlipVertically => std::mem::swap(&mut tl.y, &mut br.y),
        SpriteEffects::FlipHorizontally => std::mem::swap(&mut tl.x, &mut br.x),
        SpriteEffects::None => {}
    }
    (rect, tl, br)
}

/// Session-scoped sprite and text submission over an injected backend.
///
/// One instance per graphics context; the batcher's pool and scratch
/// arrays live as long as the facade and are not safe to share between
/// threads or interleaved sessions.
pub struct SpriteBatch<B: RenderBackend> {
    batcher: SpriteBatcher,
    backend: B,
    settings: BatchSettings,
    open: bool,
}

impl<B: RenderBackend> SpriteBatch<B> {
    pub fn new(backend: B) -> Self {
        Self {
            batcher: SpriteBatcher::new(),
            backend,
            settings: BatchSettings::default(),
            open: false,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn into_backend(self) -> B {
        self.backend
    }

    /// Items submitted in the current session.
    pub fn pending(&self) -> usize {
        self.batcher.pending()
    }

    /// Items resting in the reuse pool.
    pub fn pooled(&self) -> usize {
        self.batcher.pooled()
    }

    /// Opens a session with all-default settings.
    ///
    /// # Panics
    ///
    /// Panics if a session is already open.  Nested sessions are a
    /// caller bug, not a recoverable condition.
    pub fn begin(&mut self) {
        self.begin_with(BatchSettings::default());
    }

    /// Opens a session with the given settings.
    ///
    /// # Panics
    ///
    /// Panics if a session is already open.
    pub fn begin_with(&mut self, settings: BatchSettings) {
        assert!(
            !self.open,
            "begin called while a sprite batch session was already open"
        );
        self.settings = settings;
        self.open = true;
    }

    fn require_open(&self) {
        assert!(
            self.open,
            "sprite submission outside a begin/end session"
        );
    }

    fn require_texture(texture: &Texture) {
        assert!(
            texture.id().is_bound(),
            "draw called with an unbound texture handle"
        );
    }

    /// Draws the whole texture at `position` with no rotation, origin,
    /// or scale.
    ///
    /// # Panics
    ///
    /// Panics on an unbound texture or outside a session; no item is
    /// created in either case.
    pub fn draw(&mut self, texture: &Texture, position: Vec2, color: Color) {
        self.require_open();
        Self::require_texture(texture);
        let (rect, tl, br) = source_uvs(texture, None, SpriteEffects::None);
        let item = self.batcher.create_item();
        item.depth = 0.0;
        item.texture = texture.id();
        item.set_rect(
            position.x,
            position.y,
            rect.w as f32,
            rect.h as f32,
            color,
            tl,
            br,
        );
    }

    /// Draws a texture region at `position` with the full parameter
    /// set: source region, rotation around a scaled origin, per-axis
    /// scale, flip, and sort depth.
    ///
    /// # Panics
    ///
    /// Panics on an unbound texture or outside a session.
    pub fn draw_with(
        &mut self,
        texture: &Texture,
        position: Vec2,
        color: Color,
        options: DrawOptions,
    ) {
        self.require_open();
        Self::require_texture(texture);
        let (rect, tl, br) = source_uvs(texture, options.source, options.effects);
        let (sin, cos) = options.rotation.sin_cos();
        let item = self.batcher.create_item();
        item.depth = options.depth;
        item.texture = texture.id();
        item.set(
            position.x,
            position.y,
            -options.origin.x * options.scale.x,
            -options.origin.y * options.scale.y,
            rect.w as f32 * options.scale.x,
            rect.h as f32 * options.scale.y,
            sin,
            cos,
            color,
            tl,
            br,
        );
    }

    /// Stretches the whole texture over `destination`.
    ///
    /// # Panics
    ///
    /// Panics on an unbound texture or outside a session.
    pub fn draw_rect(&mut self, texture: &Texture, destination: Rect, color: Color) {
        self.require_open();
        Self::require_texture(texture);
        let (_, tl, br) = source_uvs(texture, None, SpriteEffects::None);
        let item = self.batcher.create_item();
        item.depth = 0.0;
        item.texture = texture.id();
        item.set_rect(
            destination.x as f32,
            destination.y as f32,
            destination.w as f32,
            destination.h as f32,
            color,
            tl,
            br,
        );
    }

    /// Stretches a texture region over `destination`, with rotation
    /// around an unscaled origin.  `options.scale` is ignored here; the
    /// destination rectangle already fixes the size.
    ///
    /// # Panics
    ///
    /// Panics on an unbound texture or outside a session.
    pub fn draw_rect_with(
        &mut self,
        texture: &Texture,
        destination: Rect,
        color: Color,
        options: DrawOptions,
    ) {
        self.require_open();
        Self::require_texture(texture);
        let (_, tl, br) = source_uvs(texture, options.source, options.effects);
        let (sin, cos) = options.rotation.sin_cos();
        let item = self.batcher.create_item();
        item.depth = options.depth;
        item.texture = texture.id();
        item.set(
            destination.x as f32,
            destination.y as f32,
            -options.origin.x,
            -options.origin.y,
            destination.w as f32,
            destination.h as f32,
            sin,
            cos,
            color,
            tl,
            br,
        );
    }

    /// Lays out `text` glyph by glyph from `position` and submits one
    /// item per covered character.
    ///
    /// The pen advances by each glyph's left bearing, the glyph quad is
    /// placed at the pen plus its cropping offset, then the pen advances
    /// by the glyph width, right bearing, and the font's spacing.  `\n`
    /// returns the pen to the line start and moves it down one line
    /// spacing without emitting anything.  Characters the font does not
    /// cover are skipped: no item, no advance.
    ///
    /// # Panics
    ///
    /// Panics if the font's atlas texture is unbound or outside a
    /// session.
    pub fn draw_string(&mut self, font: &SpriteFont, text: &str, position: Vec2, color: Color) {
        self.draw_string_with(font, text, position, color, DrawOptions::default());
    }

    /// [`Self::draw_string`] with rotation, origin, scale, flip, and
    /// depth.  `options.source` is ignored; each glyph brings its own
    /// atlas region.
    ///
    /// # Panics
    ///
    /// Panics if the font's atlas texture is unbound or outside a
    /// session.
    pub fn draw_string_with(
        &mut self,
        font: &SpriteFont,
        text: &str,
        position: Vec2,
        color: Color,
        options: DrawOptions,
    ) {
        self.require_open();
        Self::require_texture(font.texture());
        let texture = *font.texture();
        let (sin, cos) = options.rotation.sin_cos();
        let line_start = -options.origin.x;
        let mut pen = Vec2::new(line_start, -options.origin.y);
        for c in text.chars() {
            if c == '\n' {
                pen.y += font.line_spacing();
                pen.x = line_start;
                continue;
            }
            let Some(glyph) = font.glyph(c) else {
                continue;
            };
            pen.x += glyph.kerning[0];
            let (_, tl, br) = source_uvs(&texture, Some(glyph.bounds), options.effects);
            let item = self.batcher.create_item();
            item.depth = options.depth;
            item.texture = texture.id();
            item.set(
                position.x,
                position.y,
                (pen.x + glyph.cropping.x) * options.scale.x,
                (pen.y + glyph.cropping.y) * options.scale.y,
                glyph.bounds.w as f32 * options.scale.x,
                glyph.bounds.h as f32 * options.scale.y,
                sin,
                cos,
                color,
                tl,
                br,
            );
            pen.x += glyph.kerning[1] + glyph.kerning[2] + font.spacing();
        }
    }

    /// Closes the session: applies the session's render state to the
    /// backend once, then flushes the accumulated items.
    ///
    /// # Panics
    ///
    /// Panics if no session is open.
    pub fn end(&mut self) {
        assert!(self.open, "end called without an open sprite batch session");
        trace!("ending session with {} item(s)", self.batcher.pending());
        let pass = PassState {
            blend: self.settings.blend,
            sampler: self.settings.sampler,
            depth_stencil: self.settings.depth_stencil,
            rasterizer: self.settings.rasterizer,
            effect: self.settings.effect,
            transform: self.settings.transform,
        };
        self.backend.begin_pass(&pass);
        self.batcher.draw_batch(self.settings.sort, &mut self.backend);
        self.open = false;
    }
}
