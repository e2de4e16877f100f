//! The device shim: everything the batcher and the submission facade
//! need from a GL generation, behind one capability interface.
//!
//! The two supported generations are mutually incompatible.  The fixed
//! function generation wants matrix-stack and client-array-pointer
//! calls; the programmable generation wants a compiled program, vertex
//! attributes, and an MVP uniform.  The sort/group/flush algorithm is
//! written once against [`RenderBackend`] and the generation is chosen
//! exactly once, at creation time, as an injected strategy value.  No
//! global version flag exists anywhere in this crate.

use crate::texture::TextureId;
use crate::types::{Mat4, Rect};
use crate::vertex::SpriteVertex;
use std::num::NonZeroU32;

pub mod gles1;
#[cfg(feature = "gles2")]
pub mod gles2;

/// Blend states the submission facade recognizes, with their classic
/// factor pairs.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum BlendState {
    /// Blending disabled.
    Opaque,
    /// `SRC_ALPHA, ONE_MINUS_SRC_ALPHA`.
    #[default]
    AlphaBlend,
    /// `ONE, ONE_MINUS_SRC_ALPHA`.
    NonPremultiplied,
    /// `SRC_ALPHA, ONE`.
    Additive,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum SamplerState {
    #[default]
    LinearClamp,
    LinearWrap,
    PointClamp,
    PointWrap,
}

impl SamplerState {
    pub fn linear(self) -> bool {
        matches!(self, SamplerState::LinearClamp | SamplerState::LinearWrap)
    }

    pub fn clamp(self) -> bool {
        matches!(self, SamplerState::LinearClamp | SamplerState::PointClamp)
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum DepthStencilState {
    /// Depth testing off.
    #[default]
    None,
    /// Depth testing on, depth writes on.
    DepthReadWrite,
    /// Depth testing on, depth writes off.
    DepthRead,
}

/// Which triangle winding gets culled.  Sprites are emitted clockwise,
/// so the default keeps them visible.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum CullMode {
    None,
    Clockwise,
    #[default]
    CounterClockwise,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct RasterizerState {
    pub cull: CullMode,
    /// Pixel region the pass is clipped to, if any.
    pub scissor: Option<Rect>,
}

/// An externally compiled program that replaces the built-in one on the
/// programmable path for the duration of a session.  The fixed function
/// generation has no programmable stage and ignores it.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Effect {
    program: NonZeroU32,
}

impl Effect {
    /// Wraps a raw GL program name.  `None` for the zero (unbound) name.
    pub fn from_raw(program: u32) -> Option<Self> {
        NonZeroU32::new(program).map(|program| Self { program })
    }

    pub fn program(&self) -> u32 {
        self.program.get()
    }

    #[cfg(feature = "gles2")]
    pub(crate) fn nonzero(&self) -> NonZeroU32 {
        self.program
    }
}

/// The session state a backend consumes exactly once per pass, before
/// the batcher's draw calls are flushed.
#[derive(Clone, Copy, Debug)]
pub struct PassState {
    pub blend: BlendState,
    pub sampler: SamplerState,
    pub depth_stencil: DepthStencilState,
    pub rasterizer: RasterizerState,
    pub effect: Option<Effect>,
    pub transform: Mat4,
}

impl Default for PassState {
    fn default() -> Self {
        Self {
            blend: BlendState::default(),
            sampler: SamplerState::default(),
            depth_stencil: DepthStencilState::default(),
            rasterizer: RasterizerState::default(),
            effect: None,
            transform: Mat4::identity(),
        }
    }
}

/// Physical orientation of the display.  Sprite coordinates stay in the
/// unrotated logical orientation; the backends pre-rotate geometry so
/// the image lands upright.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum DisplayOrientation {
    #[default]
    Portrait,
    LandscapeLeft,
    LandscapeRight,
    PortraitUpsideDown,
}

impl DisplayOrientation {
    /// Rotation applied ahead of the logical-space projection, in
    /// degrees about the z axis.
    pub fn angle_degrees(self) -> f32 {
        match self {
            DisplayOrientation::Portrait => 0.0,
            DisplayOrientation::LandscapeLeft => -90.0,
            DisplayOrientation::LandscapeRight => 90.0,
            DisplayOrientation::PortraitUpsideDown => 180.0,
        }
    }

    /// Whether the logical width/height swap relative to the physical
    /// viewport.
    pub fn swaps_extent(self) -> bool {
        matches!(
            self,
            DisplayOrientation::LandscapeLeft | DisplayOrientation::LandscapeRight
        )
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// The extent sprite coordinates are specified in: the physical
    /// viewport, swapped when the orientation is landscape.
    pub fn logical_extent(self, orientation: DisplayOrientation) -> (f32, f32) {
        if orientation.swaps_extent() {
            (self.height as f32, self.width as f32)
        } else {
            (self.width as f32, self.height as f32)
        }
    }
}

/// Where a pass renders to.  Offscreen targets are cleared at the start
/// of the pass and skip the orientation pre-rotation.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum RenderTarget {
    #[default]
    Screen,
    Offscreen,
}

/// Immutable display facts a pipeline is constructed with.  Orientation
/// changes and target switches go through the pipeline's setters; there
/// is no ambient global to consult.
#[derive(Clone, Copy, Debug)]
pub struct Display {
    pub viewport: Viewport,
    pub orientation: DisplayOrientation,
    pub target: RenderTarget,
}

impl Display {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            viewport: Viewport::new(width, height),
            orientation: DisplayOrientation::Portrait,
            target: RenderTarget::Screen,
        }
    }
}

/// The capability interface both generations implement.
///
/// `draw_quads` issues one indexed draw over `vertices[first..first +
/// count]`: `count / 4` quads, `count / 2 * 3` indices, starting at
/// index `first / 2 * 3` of the shared pattern.
pub trait RenderBackend {
    /// Global render state transition for the coming flushes: blending,
    /// culling, scissor, viewport, matrices or program.  Called exactly
    /// once per session, before any draw.
    fn begin_pass(&mut self, pass: &PassState);

    /// The scratch arrays grew; any GPU-side copy bound earlier is stale
    /// and must be re-bound.
    fn arrays_grown(&mut self, indices: &[u16]);

    /// Texture switch at a flush boundary.
    fn bind_texture(&mut self, texture: TextureId);

    /// One indexed draw covering a contiguous vertex range that shares
    /// the currently bound texture.
    fn draw_quads(&mut self, vertices: &[SpriteVertex], indices: &[u16], first: usize, count: usize);
}

impl<B: RenderBackend + ?Sized> RenderBackend for Box<B> {
    fn begin_pass(&mut self, pass: &PassState) {
        (**self).begin_pass(pass)
    }
    fn arrays_grown(&mut self, indices: &[u16]) {
        (**self).arrays_grown(indices)
    }
    fn bind_texture(&mut self, texture: TextureId) {
        (**self).bind_texture(texture)
    }
    fn draw_quads(&mut self, vertices: &[SpriteVertex], indices: &[u16], first: usize, count: usize) {
        (**self).draw_quads(vertices, indices, first, count)
    }
}

/// Backend generation of a GL context.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Generation {
    FixedFunction,
    Programmable,
}

#[derive(Debug)]
pub enum Error {
    /// A GL object could not be created.
    CreateResource(String),
    /// A shader stage failed to compile; the log comes from the driver.
    ShaderCompile { stage: &'static str, log: String },
    /// The program failed to link.
    ProgramLink(String),
    /// Neither generation could be brought up.
    NoBackend,
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::CreateResource(what) => write!(f, "could not create GL resource: {what}"),
            Error::ShaderCompile { stage, log } => {
                write!(f, "{stage} shader failed to compile: {log}")
            }
            Error::ProgramLink(log) => write!(f, "program failed to link: {log}"),
            Error::NoBackend => f.write_str("no usable backend generation"),
        }
    }
}

impl std::error::Error for Error {}

/// Creates a pipeline for `requested`, downgrading at most once to the
/// other generation if the requested one is unavailable, and failing if
/// neither can be brought up.
///
/// The platform layer passes whichever contexts it actually created;
/// `None` marks a generation as unavailable.
#[cfg(feature = "gles2")]
pub fn create_backend<C: gles1::FixedFunctionGl + 'static>(
    requested: Generation,
    gl: Option<std::sync::Arc<glow::Context>>,
    fixed: Option<C>,
    display: Display,
) -> Result<Box<dyn RenderBackend>, Error> {
    let order = match requested {
        Generation::Programmable => [Generation::Programmable, Generation::FixedFunction],
        Generation::FixedFunction => [Generation::FixedFunction, Generation::Programmable],
    };
    let mut fixed = fixed;
    let mut last_err = Error::NoBackend;
    for generation in order {
        match generation {
            Generation::Programmable => {
                if let Some(gl) = gl.clone() {
                    match gles2::Gles2Pipeline::new(gl, display) {
                        Ok(pipeline) => return Ok(Box::new(pipeline)),
                        Err(err) => {
                            log::warn!("programmable pipeline unavailable: {err}");
                            last_err = err;
                        }
                    }
                }
            }
            Generation::FixedFunction => {
                if let Some(ctx) = fixed.take() {
                    return Ok(Box::new(gles1::Gles1Pipeline::new(ctx, display)));
                }
            }
        }
    }
    Err(last_err)
}

/// [`create_backend`] without the programmable generation compiled in:
/// only the fixed function context can satisfy the request.
#[cfg(not(feature = "gles2"))]
pub fn create_backend<C: gles1::FixedFunctionGl + 'static>(
    _requested: Generation,
    fixed: Option<C>,
    display: Display,
) -> Result<Box<dyn RenderBackend>, Error> {
    match fixed {
        Some(ctx) => Ok(Box::new(gles1::Gles1Pipeline::new(ctx, display))),
        None => Err(Error::NoBackend),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn orientation_angles_and_extents() {
        let vp = Viewport::new(320, 480);
        assert_eq!(DisplayOrientation::Portrait.angle_degrees(), 0.0);
        assert_eq!(DisplayOrientation::LandscapeLeft.angle_degrees(), -90.0);
        assert_eq!(DisplayOrientation::LandscapeRight.angle_degrees(), 90.0);
        assert_eq!(DisplayOrientation::PortraitUpsideDown.angle_degrees(), 180.0);
        assert_eq!(vp.logical_extent(DisplayOrientation::Portrait), (320.0, 480.0));
        assert_eq!(
            vp.logical_extent(DisplayOrientation::LandscapeLeft),
            (480.0, 320.0)
        );
        assert_eq!(
            vp.logical_extent(DisplayOrientation::PortraitUpsideDown),
            (320.0, 480.0)
        );
    }

    #[test]
    fn effect_rejects_the_unbound_program() {
        assert!(Effect::from_raw(0).is_none());
        assert_eq!(Effect::from_raw(5).unwrap().program(), 5);
    }

    #[cfg(feature = "gles2")]
    #[test]
    fn downgrade_happens_once_and_bottoms_out() {
        use super::gles1::testing::RecordingGl;

        // Programmable requested but no GL context: one downgrade to the
        // fixed function generation.
        let display = Display::new(320, 480);
        let backend = create_backend(
            Generation::Programmable,
            None,
            Some(RecordingGl::default()),
            display,
        )
        .expect("fixed function context was available");

        // The boxed strategy drives a session like any other backend.
        let mut sb = crate::SpriteBatch::new(backend);
        sb.begin();
        sb.end();

        // Nothing available at all: the failure propagates.
        let backend = create_backend::<RecordingGl>(Generation::Programmable, None, None, display);
        assert!(matches!(backend, Err(Error::NoBackend)));
    }
}
