//! Programmable pipeline (OpenGL ES 2.0 generation), driven through
//! [`glow`].
//!
//! The generation difference from the fixed function path is all state
//! plumbing: a compiled program instead of the matrix stack and texture
//! environment, vertex attributes instead of client array pointers, and
//! an MVP uniform instead of `glOrtho`/`glRotatef`.  The flush geometry
//! and ordering are identical; both come from the batcher.

use std::num::NonZeroU32;
use std::sync::Arc;

use glow::HasContext;
use log::debug;

use crate::backend::{
    BlendState, CullMode, DepthStencilState, Display, Error, PassState, RenderBackend,
    RenderTarget, SamplerState,
};
use crate::texture::TextureId;
use crate::types::{Mat4, Vec3, Vec4};
use crate::vertex::SpriteVertex;

const ATTRIB_POSITION: u32 = 0;
const ATTRIB_TEXCOORD: u32 = 1;
const ATTRIB_TINT: u32 = 2;

const VERTEX_SHADER: &str = r"uniform mat4 uMVPMatrix;
attribute vec4 aPosition;
attribute vec2 aTexCoord;
attribute vec4 aTint;
varying vec2 vTexCoord;
varying vec4 vTint;
void main()
{
    vTexCoord = aTexCoord;
    vTint = aTint;
    gl_Position = uMVPMatrix * aPosition;
}";

const FRAGMENT_SHADER: &str = r"precision mediump float;
varying vec2 vTexCoord;
varying vec4 vTint;
uniform sampler2D sTexture;
void main()
{
    vec4 baseColor = texture2D(sTexture, vTexCoord);
    gl_FragColor = baseColor * vTint;
}";

fn compile_shader(
    gl: &glow::Context,
    stage: u32,
    stage_name: &'static str,
    source: &str,
) -> Result<glow::Shader, Error> {
    unsafe {
        let shader = gl.create_shader(stage).map_err(Error::CreateResource)?;
        gl.shader_source(shader, source);
        gl.compile_shader(shader);
        if !gl.get_shader_compile_status(shader) {
            let log = gl.get_shader_info_log(shader);
            gl.delete_shader(shader);
            return Err(Error::ShaderCompile {
                stage: stage_name,
                log,
            });
        }
        Ok(shader)
    }
}

fn link_program(gl: &glow::Context, vertex: &str, fragment: &str) -> Result<glow::Program, Error> {
    let vs = compile_shader(gl, glow::VERTEX_SHADER, "vertex", vertex)?;
    let fs = compile_shader(gl, glow::FRAGMENT_SHADER, "fragment", fragment)?;
    unsafe {
        let program = gl.create_program().map_err(Error::CreateResource)?;
        gl.attach_shader(program, vs);
        gl.attach_shader(program, fs);
        // Attribute locations are fixed so the draw path never queries.
        gl.bind_attrib_location(program, ATTRIB_POSITION, "aPosition");
        gl.bind_attrib_location(program, ATTRIB_TEXCOORD, "aTexCoord");
        gl.bind_attrib_location(program, ATTRIB_TINT, "aTint");
        gl.link_program(program);
        if !gl.get_program_link_status(program) {
            let log = gl.get_program_info_log(program);
            gl.delete_program(program);
            return Err(Error::ProgramLink(log));
        }
        gl.detach_shader(program, vs);
        gl.detach_shader(program, fs);
        gl.delete_shader(vs);
        gl.delete_shader(fs);
        Ok(program)
    }
}

fn rotation_z(radians: f32) -> Mat4 {
    let (s, c) = radians.sin_cos();
    Mat4::new(
        Vec4::new(c, s, 0.0, 0.0),
        Vec4::new(-s, c, 0.0, 0.0),
        Vec4::new(0.0, 0.0, 1.0, 0.0),
        Vec4::new(0.0, 0.0, 0.0, 1.0),
    )
}

/// Combined MVP for one pass.  Logical sprite space has a top-left
/// origin with y down; the screen view flips it into the GL convention
/// and the orientation rotation is applied last, after the projection.
/// Offscreen targets render y up, unrotated.
fn pass_matrix(display: Display, world: Mat4) -> Mat4 {
    let vp = display.viewport;
    match display.target {
        RenderTarget::Screen => {
            let orientation = display.orientation;
            let (w, h) = vp.logical_extent(orientation);
            let view = Mat4::from_translation(Vec3::new(-0.5 * w, 0.5 * h, 1.0))
                * Mat4::from_nonuniform_scale(Vec3::new(1.0, -1.0, -1.0));
            let proj = ultraviolet::projection::rh_yup::orthographic_gl(
                -0.5 * w,
                0.5 * w,
                -0.5 * h,
                0.5 * h,
                -1.0,
                1.0,
            );
            rotation_z(orientation.angle_degrees().to_radians()) * proj * view * world
        }
        RenderTarget::Offscreen => {
            let (w, h) = (vp.width as f32, vp.height as f32);
            let view = Mat4::from_translation(Vec3::new(-0.5 * w, -0.5 * h, 1.0));
            let proj = ultraviolet::projection::rh_yup::orthographic_gl(
                -0.5 * w,
                0.5 * w,
                -0.5 * h,
                0.5 * h,
                -1.0,
                1.0,
            );
            proj * view * world
        }
    }
}

/// [`RenderBackend`] over the programmable generation.
///
/// Construction compiles and links the built-in program, which is the
/// step that fails on a context that only speaks the older generation;
/// [`crate::backend::create_backend`] downgrades on that failure.
pub struct Gles2Pipeline {
    gl: Arc<glow::Context>,
    program: glow::Program,
    uniform_mvp: Option<glow::UniformLocation>,
    uniform_texture: Option<glow::UniformLocation>,
    vao: glow::VertexArray,
    vbo: glow::Buffer,
    ebo: glow::Buffer,
    /// Quads the GPU-side buffers currently have room for.
    quad_capacity: usize,
    display: Display,
    sampler: SamplerState,
}

impl Gles2Pipeline {
    pub fn new(gl: Arc<glow::Context>, display: Display) -> Result<Self, Error> {
        let program = link_program(&gl, VERTEX_SHADER, FRAGMENT_SHADER)?;
        unsafe {
            let uniform_mvp = gl.get_uniform_location(program, "uMVPMatrix");
            let uniform_texture = gl.get_uniform_location(program, "sTexture");
            let vao = gl.create_vertex_array().map_err(Error::CreateResource)?;
            let vbo = gl.create_buffer().map_err(Error::CreateResource)?;
            let ebo = gl.create_buffer().map_err(Error::CreateResource)?;
            debug!("sprite program linked, attributes bound at fixed locations");
            Ok(Self {
                gl,
                program,
                uniform_mvp,
                uniform_texture,
                vao,
                vbo,
                ebo,
                quad_capacity: 0,
                display,
                sampler: SamplerState::default(),
            })
        }
    }

    /// Viewport/orientation/target updates from the window layer.
    pub fn set_display(&mut self, display: Display) {
        self.display = display;
    }

    pub fn display(&self) -> Display {
        self.display
    }

    /// Grows the GPU-side buffers to cover the index pattern's quad
    /// count.  A fresh `buffer_data` orphans whatever was bound before,
    /// which is exactly what a scratch-array growth requires.
    fn ensure_capacity(&mut self, indices: &[u16]) {
        let quads = indices.len() / 6;
        if quads <= self.quad_capacity {
            return;
        }
        let gl = &self.gl;
        unsafe {
            gl.bind_vertex_array(Some(self.vao));
            gl.bind_buffer(glow::ARRAY_BUFFER, Some(self.vbo));
            gl.buffer_data_size(
                glow::ARRAY_BUFFER,
                (quads * 4 * SpriteVertex::STRIDE as usize) as i32,
                glow::STREAM_DRAW,
            );
            gl.bind_buffer(glow::ELEMENT_ARRAY_BUFFER, Some(self.ebo));
            gl.buffer_data_u8_slice(
                glow::ELEMENT_ARRAY_BUFFER,
                bytemuck::cast_slice(indices),
                glow::STATIC_DRAW,
            );
        }
        self.quad_capacity = quads;
    }
}

impl RenderBackend for Gles2Pipeline {
    fn begin_pass(&mut self, pass: &PassState) {
        let screen = self.display.target == RenderTarget::Screen;
        let gl = &self.gl;
        unsafe {
            gl.disable(glow::BLEND);
            match pass.blend {
                BlendState::Opaque => {}
                BlendState::AlphaBlend => {
                    gl.blend_func(glow::SRC_ALPHA, glow::ONE_MINUS_SRC_ALPHA);
                    gl.enable(glow::BLEND);
                    gl.blend_equation(glow::FUNC_ADD);
                }
                BlendState::NonPremultiplied => {
                    gl.blend_func(glow::ONE, glow::ONE_MINUS_SRC_ALPHA);
                    gl.enable(glow::BLEND);
                    gl.blend_equation(glow::FUNC_ADD);
                }
                BlendState::Additive => {
                    gl.blend_func(glow::SRC_ALPHA, glow::ONE);
                    gl.enable(glow::BLEND);
                    gl.blend_equation(glow::FUNC_ADD);
                }
            }

            gl.front_face(glow::CW);
            match pass.rasterizer.cull {
                CullMode::None => gl.disable(glow::CULL_FACE),
                cull => {
                    gl.enable(glow::CULL_FACE);
                    let face = match cull {
                        CullMode::CounterClockwise => glow::BACK,
                        _ => glow::FRONT,
                    };
                    // Rendering into a texture flips the winding.
                    let face = if screen {
                        face
                    } else if face == glow::BACK {
                        glow::FRONT
                    } else {
                        glow::BACK
                    };
                    gl.cull_face(face);
                }
            }

            match pass.depth_stencil {
                DepthStencilState::None => gl.disable(glow::DEPTH_TEST),
                DepthStencilState::DepthReadWrite => {
                    gl.enable(glow::DEPTH_TEST);
                    gl.depth_mask(true);
                }
                DepthStencilState::DepthRead => {
                    gl.enable(glow::DEPTH_TEST);
                    gl.depth_mask(false);
                }
            }

            match pass.rasterizer.scissor {
                Some(rect) => {
                    gl.enable(glow::SCISSOR_TEST);
                    gl.scissor(rect.x, rect.y, rect.w, rect.h);
                }
                None => gl.disable(glow::SCISSOR_TEST),
            }

            let vp = self.display.viewport;
            gl.viewport(0, 0, vp.width as i32, vp.height as i32);

            let (program, mvp_loc, tex_loc) = match pass.effect {
                Some(effect) => {
                    let program = glow::NativeProgram(effect.nonzero());
                    let mvp = gl.get_uniform_location(program, "uMVPMatrix");
                    let tex = gl.get_uniform_location(program, "sTexture");
                    (program, mvp, tex)
                }
                None => (
                    self.program,
                    self.uniform_mvp.clone(),
                    self.uniform_texture.clone(),
                ),
            };
            gl.use_program(Some(program));

            let mvp = pass_matrix(self.display, pass.transform);
            gl.uniform_matrix_4_f32_slice(mvp_loc.as_ref(), false, mvp.as_array());
            gl.active_texture(glow::TEXTURE0);
            gl.uniform_1_i32(tex_loc.as_ref(), 0);

            if !screen {
                gl.clear_color(0.0, 0.0, 0.0, 0.0);
                gl.clear(glow::COLOR_BUFFER_BIT | glow::DEPTH_BUFFER_BIT);
            }
        }
        self.sampler = pass.sampler;
    }

    fn arrays_grown(&mut self, indices: &[u16]) {
        self.ensure_capacity(indices);
    }

    fn bind_texture(&mut self, texture: TextureId) {
        let gl = &self.gl;
        unsafe {
            let native = NonZeroU32::new(texture.0).map(glow::NativeTexture);
            gl.bind_texture(glow::TEXTURE_2D, native);
            if native.is_some() {
                let filter = if self.sampler.linear() {
                    glow::LINEAR
                } else {
                    glow::NEAREST
                } as i32;
                let wrap = if self.sampler.clamp() {
                    glow::CLAMP_TO_EDGE
                } else {
                    glow::REPEAT
                } as i32;
                gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_MIN_FILTER, filter);
                gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_MAG_FILTER, filter);
                gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_WRAP_S, wrap);
                gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_WRAP_T, wrap);
            }
        }
    }

    fn draw_quads(&mut self, vertices: &[SpriteVertex], indices: &[u16], first: usize, count: usize) {
        self.ensure_capacity(indices);
        let gl = &self.gl;
        unsafe {
            gl.bind_vertex_array(Some(self.vao));
            gl.bind_buffer(glow::ARRAY_BUFFER, Some(self.vbo));
            gl.bind_buffer(glow::ELEMENT_ARRAY_BUFFER, Some(self.ebo));

            let range: &[u8] = bytemuck::cast_slice(&vertices[first..first + count]);
            gl.buffer_sub_data_u8_slice(
                glow::ARRAY_BUFFER,
                first as i32 * SpriteVertex::STRIDE,
                range,
            );

            gl.enable_vertex_attrib_array(ATTRIB_POSITION);
            gl.vertex_attrib_pointer_f32(
                ATTRIB_POSITION,
                2,
                glow::FLOAT,
                false,
                SpriteVertex::STRIDE,
                SpriteVertex::POSITION_OFFSET,
            );
            gl.enable_vertex_attrib_array(ATTRIB_TINT);
            gl.vertex_attrib_pointer_f32(
                ATTRIB_TINT,
                4,
                glow::UNSIGNED_BYTE,
                true,
                SpriteVertex::STRIDE,
                SpriteVertex::COLOR_OFFSET,
            );
            gl.enable_vertex_attrib_array(ATTRIB_TEXCOORD);
            gl.vertex_attrib_pointer_f32(
                ATTRIB_TEXCOORD,
                2,
                glow::FLOAT,
                false,
                SpriteVertex::STRIDE,
                SpriteVertex::UV_OFFSET,
            );

            let index_count = (count / 2 * 3) as i32;
            let byte_offset = (first / 2 * 3 * std::mem::size_of::<u16>()) as i32;
            gl.draw_elements(glow::TRIANGLES, index_count, glow::UNSIGNED_SHORT, byte_offset);
        }
    }
}
