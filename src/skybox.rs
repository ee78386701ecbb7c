//! Background cube drawn after the scene has filled the depth buffer.

use cgmath::Matrix4;
use glow::HasContext;

use crate::error::RenderError;
use crate::mesh::FlatMesh;
use crate::opengl::RenderData;
use crate::shaders;

const SKYBOX_SIZE: f32 = 50.0;

/// Per-face sky colors: front, back, top, bottom, right, left.
const FACE_COLORS: [[f32; 3]; 6] = [
    [0.5, 0.7, 1.0],
    [0.4, 0.6, 0.9],
    [0.6, 0.8, 1.0],
    [0.3, 0.5, 0.7],
    [0.4, 0.6, 0.8],
    [0.35, 0.55, 0.75],
];

/// Cube around the origin with inward-facing winding.
pub fn geometry() -> FlatMesh {
    let s = SKYBOX_SIZE;

    #[rustfmt::skip]
    let face_corners: [[[f32; 3]; 4]; 6] = [
        [[-s, -s,  s], [ s, -s,  s], [ s,  s,  s], [-s,  s,  s]],
        [[-s, -s, -s], [-s,  s, -s], [ s,  s, -s], [ s, -s, -s]],
        [[-s,  s, -s], [-s,  s,  s], [ s,  s,  s], [ s,  s, -s]],
        [[-s, -s, -s], [ s, -s, -s], [ s, -s,  s], [-s, -s,  s]],
        [[ s, -s, -s], [ s,  s, -s], [ s,  s,  s], [ s, -s,  s]],
        [[-s, -s, -s], [-s, -s,  s], [-s,  s,  s], [-s,  s, -s]],
    ];

    #[rustfmt::skip]
    let face_normals: [[f32; 3]; 6] = [
        [0.0, 0.0, -1.0],
        [0.0, 0.0,  1.0],
        [0.0, -1.0, 0.0],
        [0.0,  1.0, 0.0],
        [-1.0, 0.0, 0.0],
        [ 1.0, 0.0, 0.0],
    ];

    // Half the faces flip their diagonal so every triangle faces inward
    #[rustfmt::skip]
    let face_indices: [[u32; 6]; 6] = [
        [0, 2, 1, 0, 3, 2],
        [0, 1, 2, 0, 2, 3],
        [0, 1, 2, 0, 2, 3],
        [0, 2, 1, 0, 3, 2],
        [0, 1, 2, 0, 2, 3],
        [0, 2, 1, 0, 3, 2],
    ];

    let mut positions = Vec::new();
    let mut colors = Vec::new();
    let mut normals = Vec::new();
    let mut indices = Vec::new();

    for face in 0..6 {
        for corner in &face_corners[face] {
            positions.extend_from_slice(corner);
            colors.extend_from_slice(&FACE_COLORS[face]);
            normals.extend_from_slice(&face_normals[face]);
        }
        let base = face as u32 * 4;
        for index in &face_indices[face] {
            indices.push(base + index);
        }
    }

    FlatMesh {
        positions,
        normals,
        colors,
        texcoords: None,
        material_tags: None,
        object_tags: None,
        indices,
    }
}

pub struct Skybox {
    program: glow::Program,
    u_view: Option<glow::UniformLocation>,
    u_projection: Option<glow::UniformLocation>,
    render_data: RenderData,
}

impl Skybox {
    pub fn new(gl: &glow::Context) -> Result<Self, RenderError> {
        let program = shaders::compile_program(gl, "shaders/skybox.vert", "shaders/skybox.frag")?;
        let (u_view, u_projection) = unsafe {
            (
                gl.get_uniform_location(program, "uViewMatrix"),
                gl.get_uniform_location(program, "uProjectionMatrix"),
            )
        };
        let render_data = RenderData::new(gl, &geometry());
        Ok(Self {
            program,
            u_view,
            u_projection,
            render_data,
        })
    }

    /// Drawn last with a relaxed depth test so it only fills background
    /// pixels; culling is off because the camera sits inside the cube.
    pub fn render(&self, gl: &glow::Context, view: &Matrix4<f32>, projection: &Matrix4<f32>) {
        unsafe {
            gl.depth_func(glow::LEQUAL);
            gl.disable(glow::CULL_FACE);
            gl.use_program(Some(self.program));

            let view: &[f32; 16] = view.as_ref();
            let projection: &[f32; 16] = projection.as_ref();
            gl.uniform_matrix_4_f32_slice(self.u_view.as_ref(), false, view);
            gl.uniform_matrix_4_f32_slice(self.u_projection.as_ref(), false, projection);

            self.render_data.draw(gl);

            gl.depth_func(glow::LESS);
            gl.enable(glow::CULL_FACE);
        }
    }
}
