//! GPU buffer state for one draw call.

use glow::HasContext;

use crate::mesh::FlatMesh;

/// Attribute locations shared with every program in `shaders/`.
pub const ATTRIB_POSITION: u32 = 0;
pub const ATTRIB_COLOR: u32 = 1;
pub const ATTRIB_NORMAL: u32 = 2;
pub const ATTRIB_TEXCOORD: u32 = 3;

/// VAO plus one VBO per attribute, uploaded once at registration time.
#[derive(Debug, Clone)]
pub struct RenderData {
    pub vao: glow::VertexArray,
    pub position_vbo: glow::Buffer,
    pub color_vbo: glow::Buffer,
    pub normal_vbo: glow::Buffer,
    pub texcoord_vbo: Option<glow::Buffer>,
    pub ebo: glow::Buffer,
    pub index_count: i32,
}

impl RenderData {
    pub fn new(gl: &glow::Context, mesh: &FlatMesh) -> Self {
        unsafe {
            let vao = gl.create_vertex_array().expect("Failed to create VAO");
            gl.bind_vertex_array(Some(vao));

            let position_vbo = upload_attribute(gl, ATTRIB_POSITION, 3, &mesh.positions);
            let color_vbo = upload_attribute(gl, ATTRIB_COLOR, 3, &mesh.colors);
            let normal_vbo = upload_attribute(gl, ATTRIB_NORMAL, 3, &mesh.normals);
            let texcoord_vbo = mesh
                .texcoords
                .as_ref()
                .filter(|texcoords| !texcoords.is_empty())
                .map(|texcoords| upload_attribute(gl, ATTRIB_TEXCOORD, 2, texcoords));

            let ebo = gl.create_buffer().expect("Failed to create EBO");
            gl.bind_buffer(glow::ELEMENT_ARRAY_BUFFER, Some(ebo));
            gl.buffer_data_u8_slice(
                glow::ELEMENT_ARRAY_BUFFER,
                bytemuck::cast_slice(&mesh.indices),
                glow::STATIC_DRAW,
            );

            gl.bind_vertex_array(None);

            Self {
                vao,
                position_vbo,
                color_vbo,
                normal_vbo,
                texcoord_vbo,
                ebo,
                index_count: mesh.indices.len() as i32,
            }
        }
    }

    pub fn has_texcoords(&self) -> bool {
        self.texcoord_vbo.is_some()
    }

    pub fn draw(&self, gl: &glow::Context) {
        unsafe {
            gl.bind_vertex_array(Some(self.vao));
            gl.bind_buffer(glow::ELEMENT_ARRAY_BUFFER, Some(self.ebo));
            gl.draw_elements(glow::TRIANGLES, self.index_count, glow::UNSIGNED_INT, 0);
        }
    }
}

unsafe fn upload_attribute(gl: &glow::Context, index: u32, size: i32, data: &[f32]) -> glow::Buffer {
    let vbo = gl.create_buffer().expect("Failed to create VBO");
    gl.bind_buffer(glow::ARRAY_BUFFER, Some(vbo));
    gl.buffer_data_u8_slice(
        glow::ARRAY_BUFFER,
        bytemuck::cast_slice(data),
        glow::STATIC_DRAW,
    );
    gl.vertex_attrib_pointer_f32(index, size, glow::FLOAT, false, 0, 0);
    gl.enable_vertex_attrib_array(index);
    vbo
}
