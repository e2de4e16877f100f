//! Fixed function pipeline (OpenGL ES 1.1 generation).
//!
//! No maintained Rust binding exposes the ES 1.1 entry points, so the
//! calls this generation emits are declared as the [`FixedFunctionGl`]
//! trait and the platform layer wires them to its own loader.  The
//! pipeline itself owns the call sequencing: which matrix gets loaded,
//! how the orientation pre-rotation is issued, where the client array
//! pointers land inside the packed vertex record.

use crate::backend::{
    BlendState, CullMode, DepthStencilState, Display, PassState, RenderBackend, RenderTarget,
    SamplerState,
};
use crate::texture::TextureId;
use crate::vertex::SpriteVertex;

/// Server-side capabilities toggled by [`FixedFunctionGl::enable`] and
/// [`FixedFunctionGl::disable`].
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Cap {
    Blend,
    Texture2d,
    CullFace,
    DepthTest,
    ScissorTest,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum MatrixMode {
    Projection,
    ModelView,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ClientArray {
    Vertex,
    Color,
    TexCoord,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum BlendFactor {
    One,
    SrcAlpha,
    OneMinusSrcAlpha,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Winding {
    Clockwise,
    CounterClockwise,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum CullFace {
    Front,
    Back,
}

/// The fixed function state-setting calls the pipeline emits; the
/// in-process boundary to the platform's ES 1.1 loader.
///
/// `client_arrays` hands over the interleaved vertex memory and the
/// index pattern for the subsequent pointer and draw calls, standing in
/// for the raw pinned addresses the C API would take.  Pointer offsets
/// are bytes into a [`SpriteVertex`], strides are bytes between
/// consecutive vertices, and `draw_elements` offsets are bytes into the
/// index array.
pub trait FixedFunctionGl {
    fn enable(&mut self, cap: Cap);
    fn disable(&mut self, cap: Cap);
    fn blend_func(&mut self, src: BlendFactor, dst: BlendFactor);
    fn matrix_mode(&mut self, mode: MatrixMode);
    fn load_identity(&mut self);
    /// `glRotatef(degrees, 0, 0, 1)`.
    fn rotate_z(&mut self, degrees: f32);
    fn ortho(&mut self, left: f32, right: f32, bottom: f32, top: f32, near: f32, far: f32);
    /// Loads a column-major matrix onto the current stack.
    fn load_matrix(&mut self, matrix: &[f32; 16]);
    fn viewport(&mut self, x: i32, y: i32, width: i32, height: i32);
    fn scissor(&mut self, x: i32, y: i32, width: i32, height: i32);
    fn depth_mask(&mut self, write: bool);
    /// `GL_TEXTURE_ENV` set to modulate texel by vertex color.
    fn modulate_tex_env(&mut self);
    fn front_face(&mut self, winding: Winding);
    fn cull_face(&mut self, face: CullFace);
    fn color(&mut self, r: f32, g: f32, b: f32, a: f32);
    fn clear(&mut self, r: f32, g: f32, b: f32, a: f32);
    fn enable_client_state(&mut self, array: ClientArray);
    fn client_arrays(&mut self, vertices: &[SpriteVertex], indices: &[u16]);
    fn vertex_pointer(&mut self, components: i32, stride: i32, offset: usize);
    fn color_pointer(&mut self, components: i32, stride: i32, offset: usize);
    fn tex_coord_pointer(&mut self, components: i32, stride: i32, offset: usize);
    fn bind_texture(&mut self, texture: TextureId);
    fn tex_parameters(&mut self, linear: bool, clamp: bool);
    fn draw_elements(&mut self, count: i32, byte_offset: usize);
}

/// [`RenderBackend`] over the fixed function generation.
pub struct Gles1Pipeline<C> {
    ctx: C,
    display: Display,
    sampler: SamplerState,
}

impl<C: FixedFunctionGl> Gles1Pipeline<C> {
    pub fn new(ctx: C, display: Display) -> Self {
        Self {
            ctx,
            display,
            sampler: SamplerState::default(),
        }
    }

    /// Viewport/orientation/target updates from the window layer.
    pub fn set_display(&mut self, display: Display) {
        self.display = display;
    }

    pub fn display(&self) -> Display {
        self.display
    }

    pub fn context_mut(&mut self) -> &mut C {
        &mut self.ctx
    }

    pub fn into_context(self) -> C {
        self.ctx
    }
}

impl<C: FixedFunctionGl> RenderBackend for Gles1Pipeline<C> {
    fn begin_pass(&mut self, pass: &PassState) {
        let gl = &mut self.ctx;
        let screen = self.display.target == RenderTarget::Screen;

        gl.disable(Cap::Blend);
        match pass.blend {
            BlendState::Opaque => {}
            BlendState::AlphaBlend => {
                gl.blend_func(BlendFactor::SrcAlpha, BlendFactor::OneMinusSrcAlpha);
                gl.enable(Cap::Blend);
            }
            BlendState::NonPremultiplied => {
                gl.blend_func(BlendFactor::One, BlendFactor::OneMinusSrcAlpha);
                gl.enable(Cap::Blend);
            }
            BlendState::Additive => {
                gl.blend_func(BlendFactor::SrcAlpha, BlendFactor::One);
                gl.enable(Cap::Blend);
            }
        }

        // Projection: sprite coordinates are logical, so the screen pass
        // pre-rotates for the display orientation before the ortho map.
        gl.matrix_mode(MatrixMode::Projection);
        gl.load_identity();
        if screen {
            let orientation = self.display.orientation;
            let angle = orientation.angle_degrees();
            if angle != 0.0 {
                gl.rotate_z(angle);
            }
            let (right, bottom) = self.display.viewport.logical_extent(orientation);
            gl.ortho(0.0, right, bottom, 0.0, -1.0, 1.0);
        } else {
            let vp = self.display.viewport;
            gl.ortho(0.0, vp.width as f32, 0.0, vp.height as f32, -1.0, 1.0);
        }

        match pass.rasterizer.scissor {
            Some(rect) => {
                gl.enable(Cap::ScissorTest);
                gl.scissor(rect.x, rect.y, rect.w, rect.h);
            }
            None => gl.disable(Cap::ScissorTest),
        }

        gl.matrix_mode(MatrixMode::ModelView);
        let vp = self.display.viewport;
        gl.viewport(0, 0, vp.width as i32, vp.height as i32);
        gl.load_matrix(pass.transform.as_array());

        match pass.depth_stencil {
            DepthStencilState::None => gl.disable(Cap::DepthTest),
            DepthStencilState::DepthReadWrite => {
                gl.enable(Cap::DepthTest);
                gl.depth_mask(true);
            }
            DepthStencilState::DepthRead => {
                gl.enable(Cap::DepthTest);
                gl.depth_mask(false);
            }
        }

        gl.modulate_tex_env();
        gl.enable(Cap::Texture2d);
        gl.enable_client_state(ClientArray::Vertex);
        gl.enable_client_state(ClientArray::Color);
        gl.enable_client_state(ClientArray::TexCoord);

        gl.front_face(Winding::Clockwise);
        match pass.rasterizer.cull {
            CullMode::None => gl.disable(Cap::CullFace),
            cull => {
                gl.enable(Cap::CullFace);
                let face = match cull {
                    CullMode::CounterClockwise => CullFace::Back,
                    _ => CullFace::Front,
                };
                // Rendering into a texture flips the winding.
                let face = if screen {
                    face
                } else {
                    match face {
                        CullFace::Back => CullFace::Front,
                        CullFace::Front => CullFace::Back,
                    }
                };
                gl.cull_face(face);
            }
        }

        gl.color(1.0, 1.0, 1.0, 1.0);
        if !screen {
            gl.clear(0.0, 0.0, 0.0, 0.0);
        }

        // No programmable stage here; a custom effect only applies to the
        // other generation.
        self.sampler = pass.sampler;
    }

    fn arrays_grown(&mut self, _indices: &[u16]) {
        // Client array pointers are re-issued on every draw, so nothing
        // GPU-side survives a growth.
    }

    fn bind_texture(&mut self, texture: TextureId) {
        self.ctx.bind_texture(texture);
        self.ctx
            .tex_parameters(self.sampler.linear(), self.sampler.clamp());
    }

    fn draw_quads(&mut self, vertices: &[SpriteVertex], indices: &[u16], first: usize, count: usize) {
        let gl = &mut self.ctx;
        gl.client_arrays(vertices, indices);
        gl.vertex_pointer(2, SpriteVertex::STRIDE, SpriteVertex::POSITION_OFFSET as usize);
        gl.color_pointer(4, SpriteVertex::STRIDE, SpriteVertex::COLOR_OFFSET as usize);
        gl.tex_coord_pointer(2, SpriteVertex::STRIDE, SpriteVertex::UV_OFFSET as usize);
        let index_count = count / 2 * 3;
        let first_index = first / 2 * 3;
        gl.draw_elements(index_count as i32, first_index * std::mem::size_of::<u16>());
    }
}

/// A call-recording [`FixedFunctionGl`] shared by this module's tests
/// and the backend selection tests.
#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    #[derive(Default)]
    pub struct RecordingGl {
        pub calls: Vec<String>,
    }

    impl RecordingGl {
        pub fn has(&self, call: &str) -> bool {
            self.calls.iter().any(|c| c == call)
        }
    }

    impl FixedFunctionGl for RecordingGl {
        fn enable(&mut self, cap: Cap) {
            self.calls.push(format!("enable {cap:?}"));
        }
        fn disable(&mut self, cap: Cap) {
            self.calls.push(format!("disable {cap:?}"));
        }
        fn blend_func(&mut self, src: BlendFactor, dst: BlendFactor) {
            self.calls.push(format!("blend_func {src:?} {dst:?}"));
        }
        fn matrix_mode(&mut self, mode: MatrixMode) {
            self.calls.push(format!("matrix_mode {mode:?}"));
        }
        fn load_identity(&mut self) {
            self.calls.push("load_identity".into());
        }
        fn rotate_z(&mut self, degrees: f32) {
            self.calls.push(format!("rotate_z {degrees}"));
        }
        fn ortho(&mut self, left: f32, right: f32, bottom: f32, top: f32, near: f32, far: f32) {
            self.calls
                .push(format!("ortho {left} {right} {bottom} {top} {near} {far}"));
        }
        fn load_matrix(&mut self, _matrix: &[f32; 16]) {
            self.calls.push("load_matrix".into());
        }
        fn viewport(&mut self, x: i32, y: i32, width: i32, height: i32) {
            self.calls.push(format!("viewport {x} {y} {width} {height}"));
        }
        fn scissor(&mut self, x: i32, y: i32, width: i32, height: i32) {
            self.calls.push(format!("scissor {x} {y} {width} {height}"));
        }
        fn depth_mask(&mut self, write: bool) {
            self.calls.push(format!("depth_mask {write}"));
        }
        fn modulate_tex_env(&mut self) {
            self.calls.push("modulate_tex_env".into());
        }
        fn front_face(&mut self, winding: Winding) {
            self.calls.push(format!("front_face {winding:?}"));
        }
        fn cull_face(&mut self, face: CullFace) {
            self.calls.push(format!("cull_face {face:?}"));
        }
        fn color(&mut self, r: f32, g: f32, b: f32, a: f32) {
            self.calls.push(format!("color {r} {g} {b} {a}"));
        }
        fn clear(&mut self, r: f32, g: f32, b: f32, a: f32) {
            self.calls.push(format!("clear {r} {g} {b} {a}"));
        }
        fn enable_client_state(&mut self, array: ClientArray) {
            self.calls.push(format!("enable_client_state {array:?}"));
        }
        fn client_arrays(&mut self, vertices: &[SpriteVertex], indices: &[u16]) {
            self.calls
                .push(format!("client_arrays {} {}", vertices.len(), indices.len()));
        }
        fn vertex_pointer(&mut self, components: i32, stride: i32, offset: usize) {
            self.calls
                .push(format!("vertex_pointer {components} {stride} {offset}"));
        }
        fn color_pointer(&mut self, components: i32, stride: i32, offset: usize) {
            self.calls
                .push(format!("color_pointer {components} {stride} {offset}"));
        }
        fn tex_coord_pointer(&mut self, components: i32, stride: i32, offset: usize) {
            self.calls
                .push(format!("tex_coord_pointer {components} {stride} {offset}"));
        }
        fn bind_texture(&mut self, texture: TextureId) {
            self.calls.push(format!("bind_texture {}", texture.0));
        }
        fn tex_parameters(&mut self, linear: bool, clamp: bool) {
            self.calls.push(format!("tex_parameters {linear} {clamp}"));
        }
        fn draw_elements(&mut self, count: i32, byte_offset: usize) {
            self.calls.push(format!("draw_elements {count} {byte_offset}"));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::RecordingGl;
    use super::*;
    use crate::backend::{DisplayOrientation, Effect, RasterizerState, Viewport};
    use crate::types::Rect;
    use bytemuck::Zeroable;

    fn display(orientation: DisplayOrientation, target: RenderTarget) -> Display {
        Display {
            viewport: Viewport::new(320, 480),
            orientation,
            target,
        }
    }

    fn begin(display: Display, pass: PassState) -> RecordingGl {
        let mut pipeline = Gles1Pipeline::new(RecordingGl::default(), display);
        pipeline.begin_pass(&pass);
        pipeline.into_context()
    }

    #[test]
    fn portrait_pass_maps_the_viewport_without_rotation() {
        let gl = begin(
            display(DisplayOrientation::Portrait, RenderTarget::Screen),
            PassState::default(),
        );
        assert!(gl.has("ortho 0 320 480 0 -1 1"));
        assert!(!gl.calls.iter().any(|c| c.starts_with("rotate_z")));
        assert!(gl.has("viewport 0 0 320 480"));
    }

    #[test]
    fn landscape_passes_rotate_and_swap_the_extent() {
        let gl = begin(
            display(DisplayOrientation::LandscapeLeft, RenderTarget::Screen),
            PassState::default(),
        );
        assert!(gl.has("rotate_z -90"));
        assert!(gl.has("ortho 0 480 320 0 -1 1"));

        let gl = begin(
            display(DisplayOrientation::LandscapeRight, RenderTarget::Screen),
            PassState::default(),
        );
        assert!(gl.has("rotate_z 90"));
        assert!(gl.has("ortho 0 480 320 0 -1 1"));

        let gl = begin(
            display(DisplayOrientation::PortraitUpsideDown, RenderTarget::Screen),
            PassState::default(),
        );
        assert!(gl.has("rotate_z 180"));
        assert!(gl.has("ortho 0 320 480 0 -1 1"));
    }

    #[test]
    fn blend_states_map_to_their_factor_pairs() {
        let screen = display(DisplayOrientation::Portrait, RenderTarget::Screen);
        let gl = begin(screen, PassState::default());
        assert!(gl.has("blend_func SrcAlpha OneMinusSrcAlpha"));
        assert!(gl.has("enable Blend"));

        let gl = begin(
            screen,
            PassState {
                blend: BlendState::Additive,
                ..PassState::default()
            },
        );
        assert!(gl.has("blend_func SrcAlpha One"));

        let gl = begin(
            screen,
            PassState {
                blend: BlendState::NonPremultiplied,
                ..PassState::default()
            },
        );
        assert!(gl.has("blend_func One OneMinusSrcAlpha"));

        let gl = begin(
            screen,
            PassState {
                blend: BlendState::Opaque,
                ..PassState::default()
            },
        );
        assert!(gl.has("disable Blend"));
        assert!(!gl.calls.iter().any(|c| c.starts_with("blend_func")));
    }

    #[test]
    fn scissor_rectangle_is_applied_when_requested() {
        let screen = display(DisplayOrientation::Portrait, RenderTarget::Screen);
        let gl = begin(
            screen,
            PassState {
                rasterizer: RasterizerState {
                    scissor: Some(Rect::new(8, 16, 32, 64)),
                    ..RasterizerState::default()
                },
                ..PassState::default()
            },
        );
        assert!(gl.has("enable ScissorTest"));
        assert!(gl.has("scissor 8 16 32 64"));

        let gl = begin(screen, PassState::default());
        assert!(gl.has("disable ScissorTest"));
    }

    #[test]
    fn offscreen_pass_clears_and_flips_culling() {
        let gl = begin(
            display(DisplayOrientation::Portrait, RenderTarget::Offscreen),
            PassState::default(),
        );
        assert!(gl.has("clear 0 0 0 0"));
        assert!(gl.has("cull_face Front"));

        let gl = begin(
            display(DisplayOrientation::Portrait, RenderTarget::Screen),
            PassState::default(),
        );
        assert!(gl.has("cull_face Back"));
        assert!(!gl.calls.iter().any(|c| c.starts_with("clear")));
    }

    #[test]
    fn effects_are_ignored_by_the_fixed_function_generation() {
        let gl = begin(
            display(DisplayOrientation::Portrait, RenderTarget::Screen),
            PassState {
                effect: Effect::from_raw(12),
                ..PassState::default()
            },
        );
        assert!(!gl.calls.iter().any(|c| c.contains("program")));
    }

    #[test]
    fn draw_points_into_the_packed_record_and_offsets_indices() {
        let screen = display(DisplayOrientation::Portrait, RenderTarget::Screen);
        let mut pipeline = Gles1Pipeline::new(RecordingGl::default(), screen);
        let vertices = vec![SpriteVertex::zeroed(); 64];
        let indices = vec![0u16; 96];
        pipeline.draw_quads(&vertices, &indices, 8, 12);
        let gl = pipeline.into_context();
        assert!(gl.has("vertex_pointer 2 20 0"));
        assert!(gl.has("color_pointer 4 20 8"));
        assert!(gl.has("tex_coord_pointer 2 20 12"));
        // Three quads starting at quad two: 18 indices, 12 indices in,
        // two bytes per index.
        assert!(gl.has("draw_elements 18 24"));
    }

    #[test]
    fn bind_applies_the_session_sampler() {
        let screen = display(DisplayOrientation::Portrait, RenderTarget::Screen);
        let mut pipeline = Gles1Pipeline::new(RecordingGl::default(), screen);
        pipeline.begin_pass(&PassState {
            sampler: SamplerState::PointWrap,
            ..PassState::default()
        });
        pipeline.bind_texture(TextureId(3));
        let gl = pipeline.into_context();
        assert!(gl.has("bind_texture 3"));
        assert!(gl.has("tex_parameters false false"));
    }
}
