//! A friendly sprite batcher for OpenGL ES.
//!
//! glsprite turns per-frame sprite and text submissions into a minimal
//! number of indexed GPU draw calls, and runs the same way on two
//! incompatible GL generations: the fixed function pipeline and the
//! programmable shader pipeline.
//!
//! glsprite can be used at three levels (not mutually exclusive):
//! 1. As a session-scoped submission API: [`SpriteBatch::begin`], any
//!    number of [`SpriteBatch::draw`]/[`SpriteBatch::draw_string`]
//!    calls, then [`SpriteBatch::end`].
//! 2. As a standalone batching core: [`SpriteBatcher`] sorts, groups,
//!    and flushes [`BatchItem`]s through any
//!    [`backend::RenderBackend`] you supply.
//! 3. As a pair of ready-made GL pipelines: the programmable generation
//!    over [`glow`] (the default `gles2` feature) and the fixed
//!    function generation over the [`backend::gles1::FixedFunctionGl`]
//!    call boundary, selected once at creation time with
//!    [`backend::create_backend`].
//!
//! The crate never owns a window, an event loop, or a GL context; the
//! platform layer creates those and feeds frame callbacks in.  All
//! calls are synchronous and single threaded, matching the thread that
//! owns the GL context.

pub mod backend;
pub use backend::{
    BlendState, CullMode, DepthStencilState, Display, DisplayOrientation, Effect, Error,
    Generation, PassState, RasterizerState, RenderBackend, RenderTarget, SamplerState, Viewport,
};

mod batch;
pub use batch::{BatchItem, SpriteBatcher, SpriteSortMode};

mod font;
pub use font::{Glyph, SpriteFont};

mod sprites;
pub use sprites::{BatchSettings, DrawOptions, SpriteBatch};

mod texture;
pub use texture::{Texture, TextureId};

pub mod types;
pub use types::{Color, Rect, SpriteEffects};

mod vertex;
pub use vertex::SpriteVertex;

pub use ultraviolet;

#[cfg(feature = "gles2")]
pub use glow;
