//! GLSL program compilation.
//!
//! Shader sources live under `shaders/` and are read at startup. A compile or
//! link failure carries the GL info log and is fatal to the pass that needed
//! the program.

use std::fs;
use std::path::Path;

use glow::HasContext;

use crate::error::RenderError;

pub fn compile_program(
    gl: &glow::Context,
    vertex_path: impl AsRef<Path>,
    fragment_path: impl AsRef<Path>,
) -> Result<glow::Program, RenderError> {
    let vertex_source = fs::read_to_string(vertex_path)?;
    let fragment_source = fs::read_to_string(fragment_path)?;
    compile_from_source(gl, &vertex_source, &fragment_source)
}

pub fn compile_from_source(
    gl: &glow::Context,
    vertex_source: &str,
    fragment_source: &str,
) -> Result<glow::Program, RenderError> {
    unsafe {
        let vertex_shader = compile_stage(gl, glow::VERTEX_SHADER, "vertex", vertex_source)?;
        let fragment_shader =
            compile_stage(gl, glow::FRAGMENT_SHADER, "fragment", fragment_source)?;

        let program = gl.create_program().map_err(RenderError::Allocation)?;
        gl.attach_shader(program, vertex_shader);
        gl.attach_shader(program, fragment_shader);
        gl.link_program(program);

        gl.delete_shader(vertex_shader);
        gl.delete_shader(fragment_shader);

        if !gl.get_program_link_status(program) {
            let log = gl.get_program_info_log(program);
            gl.delete_program(program);
            return Err(RenderError::ShaderLink(log));
        }

        Ok(program)
    }
}

unsafe fn compile_stage(
    gl: &glow::Context,
    stage: u32,
    stage_name: &'static str,
    source: &str,
) -> Result<glow::Shader, RenderError> {
    let shader = gl.create_shader(stage).map_err(RenderError::Allocation)?;
    gl.shader_source(shader, source);
    gl.compile_shader(shader);

    if !gl.get_shader_compile_status(shader) {
        let log = gl.get_shader_info_log(shader);
        gl.delete_shader(shader);
        return Err(RenderError::ShaderCompile {
            stage: stage_name,
            log,
        });
    }

    Ok(shader)
}
