use thiserror::Error;

/// Errors surfaced by the lighting engine.
///
/// Everything except [`LightingError::LightIndexOutOfBounds`] is a
/// configuration error: it is returned while building or resizing the engine
/// and never from a per-frame call.
#[derive(Debug, Error)]
pub enum LightingError {
    #[error("light index {index} is out of bounds (light count is {count})")]
    LightIndexOutOfBounds { index: usize, count: usize },

    #[error("{shader} shader failed to parse:\n{message}")]
    ShaderParse { shader: &'static str, message: String },

    #[error("{shader} shader failed validation:\n{message}")]
    ShaderValidation { shader: &'static str, message: String },

    #[error("{shader} shader has no technique `{technique}`")]
    MissingTechnique { shader: &'static str, technique: &'static str },

    #[error("{shader} shader has no parameter `{parameter}`")]
    MissingParameter { shader: &'static str, parameter: String },

    #[error("{shader} shader declares `{parameter}` as {found}, expected {expected}")]
    ParameterLayout {
        shader: &'static str,
        parameter: String,
        expected: String,
        found: String,
    },

    #[error("{shader} shader declares technique `{technique}` as a {found:?} entry point, expected {expected:?}")]
    TechniqueStage {
        shader: &'static str,
        technique: &'static str,
        expected: naga::ShaderStage,
        found: naga::ShaderStage,
    },

    #[error("{shader} shader binds `{parameter}` at group {found_group} binding {found_binding}, expected group {group} binding {binding}")]
    ParameterBinding {
        shader: &'static str,
        parameter: &'static str,
        group: u32,
        binding: u32,
        found_group: u32,
        found_binding: u32,
    },

    #[error("render target size {width}x{height} is invalid")]
    InvalidTargetSize { width: u32, height: u32 },
}

pub type Result<T, E = LightingError> = std::result::Result<T, E>;
