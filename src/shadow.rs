//! Offscreen depth rendering from the shadow-casting light's point of view.

use cgmath::{Matrix4, Point3, SquareMatrix, Vector3};
use glow::HasContext;

use crate::error::RenderError;
use crate::shaders;

pub const SHADOW_MAP_SIZE: i32 = 1024;

/// Fixed orthographic half-extent; not fitted to scene bounds, so geometry
/// past it falls out of the shadow frustum.
const ORTHO_EXTENT: f32 = 25.0;
const NEAR_PLANE: f32 = 1.0;
const FAR_PLANE: f32 = 100.0;

/// Framebuffer, depth-as-color texture and the light matrices for the depth
/// pass. Written once per frame before the lit pass samples it.
pub struct ShadowMap {
    pub framebuffer: glow::Framebuffer,
    pub depth_texture: glow::Texture,
    pub depth_program: glow::Program,
    pub u_model: Option<glow::UniformLocation>,
    pub u_light_space: Option<glow::UniformLocation>,
    pub width: i32,
    pub height: i32,
    light_view: Matrix4<f32>,
    light_projection: Matrix4<f32>,
}

impl ShadowMap {
    pub fn new(gl: &glow::Context, width: i32, height: i32) -> Result<Self, RenderError> {
        let depth_program = shaders::compile_program(
            gl,
            "shaders/shadow_depth.vert",
            "shaders/shadow_depth.frag",
        )?;

        unsafe {
            let framebuffer = gl.create_framebuffer().map_err(RenderError::Allocation)?;
            gl.bind_framebuffer(glow::FRAMEBUFFER, Some(framebuffer));

            // Depth lands in a color texture; a sampleable depth attachment
            // is not available on every target this runs on.
            let depth_texture = gl.create_texture().map_err(RenderError::Allocation)?;
            gl.bind_texture(glow::TEXTURE_2D, Some(depth_texture));
            gl.tex_image_2d(
                glow::TEXTURE_2D,
                0,
                glow::RGBA as i32,
                width,
                height,
                0,
                glow::RGBA,
                glow::UNSIGNED_BYTE,
                glow::PixelUnpackData::Slice(None),
            );
            gl.tex_parameter_i32(
                glow::TEXTURE_2D,
                glow::TEXTURE_MIN_FILTER,
                glow::NEAREST as i32,
            );
            gl.tex_parameter_i32(
                glow::TEXTURE_2D,
                glow::TEXTURE_MAG_FILTER,
                glow::NEAREST as i32,
            );
            gl.tex_parameter_i32(
                glow::TEXTURE_2D,
                glow::TEXTURE_WRAP_S,
                glow::CLAMP_TO_EDGE as i32,
            );
            gl.tex_parameter_i32(
                glow::TEXTURE_2D,
                glow::TEXTURE_WRAP_T,
                glow::CLAMP_TO_EDGE as i32,
            );

            let depth_renderbuffer = gl.create_renderbuffer().map_err(RenderError::Allocation)?;
            gl.bind_renderbuffer(glow::RENDERBUFFER, Some(depth_renderbuffer));
            gl.renderbuffer_storage(glow::RENDERBUFFER, glow::DEPTH_COMPONENT16, width, height);
            gl.framebuffer_renderbuffer(
                glow::FRAMEBUFFER,
                glow::DEPTH_ATTACHMENT,
                glow::RENDERBUFFER,
                Some(depth_renderbuffer),
            );

            gl.framebuffer_texture_2d(
                glow::FRAMEBUFFER,
                glow::COLOR_ATTACHMENT0,
                glow::TEXTURE_2D,
                Some(depth_texture),
                0,
            );

            let status = gl.check_framebuffer_status(glow::FRAMEBUFFER);
            if status != glow::FRAMEBUFFER_COMPLETE {
                gl.bind_framebuffer(glow::FRAMEBUFFER, None);
                return Err(RenderError::FramebufferIncomplete(status));
            }

            gl.bind_framebuffer(glow::FRAMEBUFFER, None);
            gl.bind_texture(glow::TEXTURE_2D, None);

            let u_model = gl.get_uniform_location(depth_program, "uModelMatrix");
            let u_light_space = gl.get_uniform_location(depth_program, "uLightSpaceMatrix");

            log::info!("shadow map initialized: {}x{}", width, height);

            Ok(Self {
                framebuffer,
                depth_texture,
                depth_program,
                u_model,
                u_light_space,
                width,
                height,
                light_view: Matrix4::identity(),
                light_projection: Matrix4::identity(),
            })
        }
    }

    /// Recomputed once per frame from the shadow-casting light, before the
    /// depth pass runs.
    pub fn update_light_matrices(&mut self, light_position: Vector3<f32>) {
        let (view, projection) = light_matrices(light_position);
        self.light_view = view;
        self.light_projection = projection;
    }

    pub fn light_space_matrix(&self) -> Matrix4<f32> {
        self.light_projection * self.light_view
    }

    pub fn bind(&self, gl: &glow::Context) {
        unsafe {
            gl.bind_framebuffer(glow::FRAMEBUFFER, Some(self.framebuffer));
            gl.viewport(0, 0, self.width, self.height);
            // Far depth everywhere the pass does not write
            gl.clear_color(1.0, 1.0, 1.0, 1.0);
            gl.clear(glow::COLOR_BUFFER_BIT | glow::DEPTH_BUFFER_BIT);
        }
    }

    pub fn unbind(&self, gl: &glow::Context, canvas_width: i32, canvas_height: i32) {
        unsafe {
            gl.bind_framebuffer(glow::FRAMEBUFFER, None);
            gl.viewport(0, 0, canvas_width, canvas_height);
            gl.clear_color(0.1, 0.1, 0.15, 1.0);
        }
    }

    pub fn bind_depth_texture(&self, gl: &glow::Context, unit: u32) {
        unsafe {
            gl.active_texture(glow::TEXTURE0 + unit);
            gl.bind_texture(glow::TEXTURE_2D, Some(self.depth_texture));
        }
    }
}

/// View and orthographic projection from the light, aimed at the world
/// origin.
pub fn light_matrices(light_position: Vector3<f32>) -> (Matrix4<f32>, Matrix4<f32>) {
    let view = Matrix4::look_at_rh(
        Point3::new(light_position.x, light_position.y, light_position.z),
        Point3::new(0.0, 0.0, 0.0),
        Vector3::unit_y(),
    );
    let projection = cgmath::ortho(
        -ORTHO_EXTENT,
        ORTHO_EXTENT,
        -ORTHO_EXTENT,
        ORTHO_EXTENT,
        NEAR_PLANE,
        FAR_PLANE,
    );
    (view, projection)
}
