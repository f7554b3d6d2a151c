use super::device::ShaderStage;

/// Failures raised while building or driving the binding layer.
///
/// Compile and link failures are fatal to material construction; there is no
/// fallback program.
#[derive(Debug, thiserror::Error)]
pub enum GlError {
    #[error("{stage} shader failed to compile:\n{log}")]
    Compile { stage: ShaderStage, log: String },
    #[error("shader program failed to link:\n{log}")]
    Link { log: String },
    #[error("graphics context unavailable: {0}")]
    ContextUnavailable(String),
    #[error("uniform expects a {expected} value but was given {found}")]
    UniformShape {
        expected: &'static str,
        found: &'static str,
    },
}
