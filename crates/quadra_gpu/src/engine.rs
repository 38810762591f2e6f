//! Engine and draw pipeline
//!
//! The engine owns the GL programs, the shared unit-quad geometry, the
//! view transform, and the canvas stack. Every draw binds the quad,
//! selects the program for the draw kind, uploads transform/color/
//! texture uniforms, and issues one 4-vertex triangle fan.
//!
//! The model is single-threaded and synchronous: each call issues GL
//! commands on the current context and returns once they are queued.
//! One rendering thread, one context, no locking.

use std::num::NonZeroU32;
use std::path::Path;

use glow::HasContext;
use quadra_paint::{Color, Rectangle, Transform};

use crate::backend::Backend;
use crate::canvas::CanvasFrame;
use crate::error::EngineError;
use crate::image::Image;
use crate::shaders::{self, ProgramKind};

/// Corners of the unit square `[0,1]²` as a triangle fan; the only
/// geometry ever submitted. All shapes are transforms of it.
const UNIT_QUAD: [f32; 8] = [0.0, 0.0, 1.0, 0.0, 1.0, 1.0, 0.0, 1.0];

/// `a_position` is bound to this location in every program before link.
const POSITION_LOCATION: u32 = 0;

struct FillProgram {
    program: glow::Program,
    u_transform: glow::UniformLocation,
    u_color: glow::UniformLocation,
}

struct ImageProgram {
    program: glow::Program,
    u_transform: glow::UniformLocation,
    u_tex_transform: glow::UniformLocation,
    u_texture: glow::UniformLocation,
    u_alpha: glow::UniformLocation,
}

struct BlendProgram {
    program: glow::Program,
    u_transform: glow::UniformLocation,
    u_tex_transform: glow::UniformLocation,
    u_mask: glow::UniformLocation,
    u_color1: glow::UniformLocation,
    u_color2: glow::UniformLocation,
}

/// The rendering engine.
///
/// Constructed once over an already-current GL context via
/// [`Engine::new`]; torn down with [`Engine::close`]. All drawing goes
/// through the current render target, which is the window by default
/// and the innermost open [`Canvas`](crate::Canvas) otherwise.
pub struct Engine {
    pub(crate) gl: glow::Context,
    backend: Backend,
    fill: FillProgram,
    image: ImageProgram,
    blend: BlendProgram,
    quad_buffer: glow::Buffer,
    quad_array: Option<glow::VertexArray>,
    window_width: u32,
    window_height: u32,
    target_width: u32,
    target_height: u32,
    view: Transform,
    pub(crate) canvas_stack: Vec<CanvasFrame>,
    pub(crate) next_canvas_id: u64,
    max_texture_size: u32,
}

impl Engine {
    /// Construct the engine.
    ///
    /// The caller must have created a GL context matching `backend` and
    /// made it current; a mismatched context surfaces as shader compile
    /// or link failures here. Construction is atomic: on failure every
    /// GL object created so far is deleted before the error returns.
    ///
    /// `debug` routes driver debug messages to `tracing` and is only
    /// available on [`Backend::Gl43`].
    pub fn new(
        mut gl: glow::Context,
        backend: Backend,
        window_width: u32,
        window_height: u32,
        debug: bool,
    ) -> Result<Engine, EngineError> {
        if debug && !backend.supports_debug_output() {
            return Err(EngineError::DebugUnsupported(backend));
        }

        unsafe {
            if debug {
                gl.enable(glow::DEBUG_OUTPUT);
                gl.enable(glow::DEBUG_OUTPUT_SYNCHRONOUS);
                gl.debug_message_callback(|source, kind, id, severity, message| {
                    tracing::debug!(source, kind, id, severity, "GL: {message}");
                });
            }

            let fill = FillProgram::build(&gl, backend)?;
            let image = match ImageProgram::build(&gl, backend) {
                Ok(p) => p,
                Err(err) => {
                    gl.delete_program(fill.program);
                    return Err(err);
                }
            };
            let blend = match BlendProgram::build(&gl, backend) {
                Ok(p) => p,
                Err(err) => {
                    gl.delete_program(fill.program);
                    gl.delete_program(image.program);
                    return Err(err);
                }
            };

            let quad_buffer = match gl.create_buffer() {
                Ok(buffer) => buffer,
                Err(message) => {
                    gl.delete_program(fill.program);
                    gl.delete_program(image.program);
                    gl.delete_program(blend.program);
                    return Err(EngineError::CreateObject(message));
                }
            };
            gl.bind_buffer(glow::ARRAY_BUFFER, Some(quad_buffer));
            gl.buffer_data_u8_slice(
                glow::ARRAY_BUFFER,
                bytemuck::cast_slice(&UNIT_QUAD),
                glow::STATIC_DRAW,
            );

            let quad_array = if backend.supports_vertex_arrays() {
                match gl.create_vertex_array() {
                    Ok(array) => {
                        gl.bind_vertex_array(Some(array));
                        gl.enable_vertex_attrib_array(POSITION_LOCATION);
                        gl.vertex_attrib_pointer_f32(
                            POSITION_LOCATION,
                            2,
                            glow::FLOAT,
                            false,
                            0,
                            0,
                        );
                        gl.bind_vertex_array(None);
                        Some(array)
                    }
                    Err(message) => {
                        gl.delete_program(fill.program);
                        gl.delete_program(image.program);
                        gl.delete_program(blend.program);
                        gl.delete_buffer(quad_buffer);
                        return Err(EngineError::CreateObject(message));
                    }
                }
            } else {
                None
            };

            let max_texture_size = gl.get_parameter_i32(glow::MAX_TEXTURE_SIZE) as u32;
            gl.viewport(0, 0, window_width as i32, window_height as i32);

            tracing::info!(
                ?backend,
                window_width,
                window_height,
                max_texture_size,
                "engine initialized"
            );

            Ok(Engine {
                gl,
                backend,
                fill,
                image,
                blend,
                quad_buffer,
                quad_array,
                window_width,
                window_height,
                target_width: window_width,
                target_height: window_height,
                view: view_transform(window_width, window_height),
                canvas_stack: Vec::new(),
                next_canvas_id: 0,
                max_texture_size,
            })
        }
    }

    pub fn backend(&self) -> Backend {
        self.backend
    }

    pub fn window_size(&self) -> (u32, u32) {
        (self.window_width, self.window_height)
    }

    /// Dimensions of the current render target: the window, or the
    /// innermost open canvas.
    pub fn target_size(&self) -> (u32, u32) {
        (self.target_width, self.target_height)
    }

    /// Number of canvases currently open.
    pub fn canvas_depth(&self) -> usize {
        self.canvas_stack.len()
    }

    pub fn max_texture_size(&self) -> u32 {
        self.max_texture_size
    }

    /// Record a window resize. The pixel-to-device mapping and viewport
    /// follow immediately unless a canvas is open, in which case they
    /// stay with the canvas and pick up the new window size when the
    /// last canvas is terminated.
    pub fn set_window_size(&mut self, width: u32, height: u32) {
        self.window_width = width;
        self.window_height = height;
        if self.canvas_stack.is_empty() {
            self.retarget(width, height);
        }
    }

    /// Point the draw pipeline at a target of the given size: tracked
    /// dimensions, view transform, and GPU viewport together.
    pub(crate) fn retarget(&mut self, width: u32, height: u32) {
        self.target_width = width;
        self.target_height = height;
        self.view = view_transform(width, height);
        unsafe {
            self.gl.viewport(0, 0, width as i32, height as i32);
        }
    }

    /// Clear the current target to `color`.
    pub fn clear(&mut self, color: Color) {
        let [r, g, b, a] = color.to_f32();
        unsafe {
            self.gl.clear_color(r, g, b, a);
            self.gl.clear(glow::COLOR_BUFFER_BIT);
        }
    }

    /// Fill the unit square centered at the origin as mapped by
    /// `transform`, composed with the current view transform.
    ///
    /// With `copy_alpha` the color (including alpha) is written
    /// verbatim, which is what a fresh alpha-carrying canvas wants.
    /// Otherwise a non-opaque color is alpha-blended over the target.
    pub fn fill_unit(&mut self, transform: Transform, color: Color, copy_alpha: bool) {
        let device = Transform::compose(self.view, transform);
        let [r, g, b, a] = color.to_f32();
        unsafe {
            self.bind_quad();
            self.gl.use_program(Some(self.fill.program));
            self.gl.uniform_matrix_3_f32_slice(
                Some(&self.fill.u_transform),
                false,
                &device.to_mat3(),
            );
            self.gl.uniform_4_f32(Some(&self.fill.u_color), r, g, b, a);

            let blending = !copy_alpha && !color.is_opaque();
            if blending {
                self.enable_blend();
            }
            self.gl.draw_arrays(glow::TRIANGLE_FAN, 0, 4);
            if blending {
                self.gl.disable(glow::BLEND);
            }
        }
    }

    /// [`Engine::fill_unit`] applied to the rectangle's transformation.
    pub fn fill_rect(&mut self, rect: Rectangle, color: Color, copy_alpha: bool) {
        self.fill_unit(rect.transformation(), color, copy_alpha);
    }

    /// Draw `image` with `dst_transform` mapping the centered unit
    /// square to device pixels and `src_transform` selecting the
    /// sampled area in image pixel coordinates. `alpha` modulates the
    /// image's own alpha; blending engages when either is non-opaque.
    pub fn draw_image(
        &mut self,
        image: &Image,
        dst_transform: Transform,
        src_transform: Transform,
        alpha: u8,
    ) {
        let Some(texture) = image.texture() else {
            tracing::warn!("draw_image called with an empty image");
            return;
        };
        let device = Transform::compose(self.view, dst_transform);
        let tex = texture_transform(
            src_transform,
            image.width(),
            image.height(),
            image.is_flipped(),
        );
        unsafe {
            self.bind_quad();
            self.gl.use_program(Some(self.image.program));
            self.gl.uniform_matrix_3_f32_slice(
                Some(&self.image.u_transform),
                false,
                &device.to_mat3(),
            );
            self.gl.uniform_matrix_3_f32_slice(
                Some(&self.image.u_tex_transform),
                false,
                &tex.to_mat3(),
            );
            self.gl.active_texture(glow::TEXTURE0);
            self.gl.bind_texture(glow::TEXTURE_2D, Some(texture));
            self.gl.uniform_1_i32(Some(&self.image.u_texture), 0);
            self.gl
                .uniform_1_f32(Some(&self.image.u_alpha), alpha as f32 / 255.0);

            let blending = needs_blend(alpha, image.has_alpha());
            if blending {
                self.enable_blend();
            }
            self.gl.draw_arrays(glow::TRIANGLE_FAN, 0, 4);
            if blending {
                self.gl.disable(glow::BLEND);
            }
        }
    }

    /// Fill the transformed unit square with a per-pixel mix of
    /// `color1` and `color2`, keyed on the red channel of `mask`:
    /// output = `mask.r * color1 + (1 - mask.r) * color2`.
    ///
    /// The mask's texture coordinates come from `src_transform` exactly
    /// as for images, so a source area larger than the mask tiles it
    /// (textures use repeat wrapping). Both colors are written as
    /// given, alpha included; no blending with the target occurs.
    pub fn blend_unit(
        &mut self,
        mask: &Image,
        dst_transform: Transform,
        src_transform: Transform,
        color1: Color,
        color2: Color,
    ) {
        let Some(texture) = mask.texture() else {
            tracing::warn!("blend_unit called with an empty mask image");
            return;
        };
        let device = Transform::compose(self.view, dst_transform);
        let tex = texture_transform(src_transform, mask.width(), mask.height(), mask.is_flipped());
        let [r1, g1, b1, a1] = color1.to_f32();
        let [r2, g2, b2, a2] = color2.to_f32();
        unsafe {
            self.bind_quad();
            self.gl.use_program(Some(self.blend.program));
            self.gl.uniform_matrix_3_f32_slice(
                Some(&self.blend.u_transform),
                false,
                &device.to_mat3(),
            );
            self.gl.uniform_matrix_3_f32_slice(
                Some(&self.blend.u_tex_transform),
                false,
                &tex.to_mat3(),
            );
            self.gl.active_texture(glow::TEXTURE0);
            self.gl.bind_texture(glow::TEXTURE_2D, Some(texture));
            self.gl.uniform_1_i32(Some(&self.blend.u_mask), 0);
            self.gl.uniform_4_f32(Some(&self.blend.u_color1), r1, g1, b1, a1);
            self.gl.uniform_4_f32(Some(&self.blend.u_color2), r2, g2, b2, a2);
            self.gl.draw_arrays(glow::TRIANGLE_FAN, 0, 4);
        }
    }

    /// Decode an image file and upload it as a texture.
    ///
    /// The channel count picks the GPU format: 1 maps to the backend's
    /// single-channel format, 2-3 to RGB, 4 to RGBA. Decode failures
    /// are soft: they log a warning and return the empty sentinel, so
    /// callers check [`Image::is_empty`] before drawing.
    pub fn load_image<P: AsRef<Path>>(&mut self, path: P) -> Image {
        let path = path.as_ref();
        let decoded = match image::open(path) {
            Ok(decoded) => decoded,
            Err(err) => {
                tracing::warn!("failed to decode {}: {err}", path.display());
                return Image::empty();
            }
        };
        self.upload_image(decoded)
    }

    fn upload_image(&mut self, decoded: image::DynamicImage) -> Image {
        use image::DynamicImage;

        let (pixels, width, height, channels) = match decoded {
            DynamicImage::ImageLuma8(gray) => {
                let (width, height) = gray.dimensions();
                (gray.into_raw(), width, height, 1u8)
            }
            DynamicImage::ImageRgb8(rgb) => {
                let (width, height) = rgb.dimensions();
                (rgb.into_raw(), width, height, 3)
            }
            DynamicImage::ImageLumaA8(gray_alpha) => {
                let rgb = DynamicImage::ImageLumaA8(gray_alpha).into_rgb8();
                let (width, height) = rgb.dimensions();
                (rgb.into_raw(), width, height, 3)
            }
            other => {
                let rgba = other.into_rgba8();
                let (width, height) = rgba.dimensions();
                (rgba.into_raw(), width, height, 4)
            }
        };

        if width > self.max_texture_size || height > self.max_texture_size {
            tracing::warn!(
                width,
                height,
                max = self.max_texture_size,
                "image exceeds the GPU texture size limit"
            );
            return Image::empty();
        }

        let (internal, format) = match channels {
            1 => self.backend.single_channel_format(),
            3 => self.backend.rgb_format(),
            _ => self.backend.rgba_format(),
        };
        // Rows are tightly packed; 3-byte texels need alignment 1.
        let alignment = if channels == 3 { 1 } else { channels as i32 };

        let texture = unsafe {
            let texture = match self.gl.create_texture() {
                Ok(texture) => texture,
                Err(message) => {
                    tracing::warn!("failed to create texture: {message}");
                    return Image::empty();
                }
            };
            self.gl.bind_texture(glow::TEXTURE_2D, Some(texture));
            self.gl.pixel_store_i32(glow::UNPACK_ALIGNMENT, alignment);
            self.gl.tex_image_2d(
                glow::TEXTURE_2D,
                0,
                internal as i32,
                width as i32,
                height as i32,
                0,
                format,
                glow::UNSIGNED_BYTE,
                Some(pixels.as_slice()),
            );
            set_sampling(&self.gl);
            texture
        };
        drop(pixels);

        tracing::debug!(width, height, channels, "image uploaded");
        Image::from_texture(texture, width, height, true, channels == 4)
    }

    /// Tear the engine down: deletes the programs and the shared quad
    /// geometry. Consumes the engine, so it cannot be used or closed
    /// again afterwards.
    pub fn close(self) {
        if !self.canvas_stack.is_empty() {
            tracing::warn!(
                open = self.canvas_stack.len(),
                "engine closed with canvases still open"
            );
        }
        unsafe {
            for frame in &self.canvas_stack {
                self.gl.delete_framebuffer(frame.framebuffer);
                if let Some(texture) = frame.target.texture() {
                    self.gl.delete_texture(texture);
                }
            }
            self.gl.delete_program(self.fill.program);
            self.gl.delete_program(self.image.program);
            self.gl.delete_program(self.blend.program);
            self.gl.delete_buffer(self.quad_buffer);
            if let Some(array) = self.quad_array {
                self.gl.delete_vertex_array(array);
            }
        }
        tracing::debug!("engine closed");
    }

    unsafe fn bind_quad(&self) {
        if let Some(array) = self.quad_array {
            self.gl.bind_vertex_array(Some(array));
        } else {
            self.gl.bind_buffer(glow::ARRAY_BUFFER, Some(self.quad_buffer));
            self.gl.enable_vertex_attrib_array(POSITION_LOCATION);
            self.gl
                .vertex_attrib_pointer_f32(POSITION_LOCATION, 2, glow::FLOAT, false, 0, 0);
        }
    }

    unsafe fn enable_blend(&self) {
        self.gl.enable(glow::BLEND);
        self.gl.blend_func_separate(
            glow::SRC_ALPHA,
            glow::ONE_MINUS_SRC_ALPHA,
            glow::ONE_MINUS_DST_ALPHA,
            glow::ONE,
        );
    }
}

/// Query the currently bound draw framebuffer; `None` is the default
/// framebuffer.
pub(crate) unsafe fn current_framebuffer(gl: &glow::Context) -> Option<glow::Framebuffer> {
    let raw = gl.get_parameter_i32(glow::FRAMEBUFFER_BINDING);
    NonZeroU32::new(raw as u32).map(glow::NativeFramebuffer)
}

/// Linear filtering and repeat wrapping on both axes; applied to every
/// texture the engine creates.
pub(crate) unsafe fn set_sampling(gl: &glow::Context) {
    gl.tex_parameter_i32(
        glow::TEXTURE_2D,
        glow::TEXTURE_MIN_FILTER,
        glow::LINEAR as i32,
    );
    gl.tex_parameter_i32(
        glow::TEXTURE_2D,
        glow::TEXTURE_MAG_FILTER,
        glow::LINEAR as i32,
    );
    gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_WRAP_S, glow::REPEAT as i32);
    gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_WRAP_T, glow::REPEAT as i32);
}

/// Pixel space to normalized device coordinates for a target of the
/// given size: `p * 2/size - 1`.
fn view_transform(width: u32, height: u32) -> Transform {
    Transform::identity()
        .translate(-1.0, -1.0)
        .scale(2.0 / width as f32, 2.0 / height as f32)
}

/// Texture-coordinate transform for sampling: `src` scaled into the
/// image's texel space, flipped vertically when the rows are stored
/// top-down.
fn texture_transform(src: Transform, width: u32, height: u32, flipped: bool) -> Transform {
    let to_texel = if flipped {
        Transform::identity()
            .translate(0.0, 1.0)
            .scale(1.0 / width as f32, -1.0 / height as f32)
    } else {
        Transform::identity().scale(1.0 / width as f32, 1.0 / height as f32)
    };
    Transform::compose(to_texel, src)
}

/// An image draw needs blending whenever the modulation alpha or the
/// image's own alpha channel can produce partial coverage.
fn needs_blend(alpha: u8, has_alpha: bool) -> bool {
    alpha != u8::MAX || has_alpha
}

impl FillProgram {
    unsafe fn build(gl: &glow::Context, backend: Backend) -> Result<FillProgram, EngineError> {
        let kind = ProgramKind::Fill;
        let program = compile_program(gl, backend, kind)?;
        match Self::resolve(gl, program, kind) {
            Ok(resolved) => Ok(resolved),
            Err(err) => {
                gl.delete_program(program);
                Err(err)
            }
        }
    }

    unsafe fn resolve(
        gl: &glow::Context,
        program: glow::Program,
        kind: ProgramKind,
    ) -> Result<FillProgram, EngineError> {
        Ok(FillProgram {
            program,
            u_transform: uniform(gl, program, kind, "u_transform")?,
            u_color: uniform(gl, program, kind, "u_color")?,
        })
    }
}

impl ImageProgram {
    unsafe fn build(gl: &glow::Context, backend: Backend) -> Result<ImageProgram, EngineError> {
        let kind = ProgramKind::Image;
        let program = compile_program(gl, backend, kind)?;
        match Self::resolve(gl, program, kind) {
            Ok(resolved) => Ok(resolved),
            Err(err) => {
                gl.delete_program(program);
                Err(err)
            }
        }
    }

    unsafe fn resolve(
        gl: &glow::Context,
        program: glow::Program,
        kind: ProgramKind,
    ) -> Result<ImageProgram, EngineError> {
        Ok(ImageProgram {
            program,
            u_transform: uniform(gl, program, kind, "u_transform")?,
            u_tex_transform: uniform(gl, program, kind, "u_tex_transform")?,
            u_texture: uniform(gl, program, kind, "u_texture")?,
            u_alpha: uniform(gl, program, kind, "u_alpha")?,
        })
    }
}

impl BlendProgram {
    unsafe fn build(gl: &glow::Context, backend: Backend) -> Result<BlendProgram, EngineError> {
        let kind = ProgramKind::Blend;
        let program = compile_program(gl, backend, kind)?;
        match Self::resolve(gl, program, kind) {
            Ok(resolved) => Ok(resolved),
            Err(err) => {
                gl.delete_program(program);
                Err(err)
            }
        }
    }

    unsafe fn resolve(
        gl: &glow::Context,
        program: glow::Program,
        kind: ProgramKind,
    ) -> Result<BlendProgram, EngineError> {
        Ok(BlendProgram {
            program,
            u_transform: uniform(gl, program, kind, "u_transform")?,
            u_tex_transform: uniform(gl, program, kind, "u_tex_transform")?,
            u_mask: uniform(gl, program, kind, "u_mask")?,
            u_color1: uniform(gl, program, kind, "u_color1")?,
            u_color2: uniform(gl, program, kind, "u_color2")?,
        })
    }
}

/// Compile, bind the shared attribute, and link one program. Cleans up
/// its own shaders and the program object on failure.
unsafe fn compile_program(
    gl: &glow::Context,
    backend: Backend,
    kind: ProgramKind,
) -> Result<glow::Program, EngineError> {
    let source = shaders::generate(backend, kind);
    let program = gl
        .create_program()
        .map_err(EngineError::CreateObject)?;

    let stages = [
        (glow::VERTEX_SHADER, "vertex", source.vertex.as_str()),
        (glow::FRAGMENT_SHADER, "fragment", source.fragment.as_str()),
    ];
    let mut attached = Vec::with_capacity(stages.len());
    for (stage, stage_name, text) in stages {
        let shader = match gl.create_shader(stage) {
            Ok(shader) => shader,
            Err(message) => {
                release_stages(gl, program, &attached);
                gl.delete_program(program);
                return Err(EngineError::CreateObject(message));
            }
        };
        gl.shader_source(shader, text);
        gl.compile_shader(shader);
        if !gl.get_shader_compile_status(shader) {
            let log = gl.get_shader_info_log(shader);
            gl.delete_shader(shader);
            release_stages(gl, program, &attached);
            gl.delete_program(program);
            return Err(EngineError::ShaderCompile {
                kind,
                stage: stage_name,
                log,
            });
        }
        gl.attach_shader(program, shader);
        attached.push(shader);
    }

    gl.bind_attrib_location(program, POSITION_LOCATION, "a_position");
    gl.link_program(program);
    let linked = gl.get_program_link_status(program);
    let log = if linked {
        String::new()
    } else {
        gl.get_program_info_log(program)
    };
    release_stages(gl, program, &attached);
    if !linked {
        gl.delete_program(program);
        return Err(EngineError::ProgramLink { kind, log });
    }

    // The shared attribute must have survived linking.
    if gl.get_attrib_location(program, "a_position").is_none() {
        gl.delete_program(program);
        return Err(EngineError::MissingAttribute {
            kind,
            name: "a_position",
        });
    }

    Ok(program)
}

unsafe fn release_stages(gl: &glow::Context, program: glow::Program, shaders: &[glow::Shader]) {
    for &shader in shaders {
        gl.detach_shader(program, shader);
        gl.delete_shader(shader);
    }
}

/// Resolve one uniform location; absence is a fatal init error.
unsafe fn uniform(
    gl: &glow::Context,
    program: glow::Program,
    kind: ProgramKind,
    name: &'static str,
) -> Result<glow::UniformLocation, EngineError> {
    gl.get_uniform_location(program, name)
        .ok_or(EngineError::MissingUniform { kind, name })
}
