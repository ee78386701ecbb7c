use thiserror::Error;

/// Errors raised while loading or parsing assets from disk.
#[derive(Error, Debug)]
pub enum AssetError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("image decode error: {0}")]
    Image(#[from] image::ImageError),
    #[error("malformed geometry (line {line}): {message}")]
    MalformedGeometry { line: usize, message: String },
}

/// Errors raised while building GPU-side state.
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("failed to compile {stage} shader: {log}")]
    ShaderCompile { stage: &'static str, log: String },
    #[error("failed to link shader program: {0}")]
    ShaderLink(String),
    #[error("framebuffer incomplete: status 0x{0:x}")]
    FramebufferIncomplete(u32),
    #[error("failed to allocate GL object: {0}")]
    Allocation(String),
    #[error("io error reading shader source: {0}")]
    Io(#[from] std::io::Error),
}
