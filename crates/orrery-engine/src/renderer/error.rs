use thiserror::Error;

use super::api::RendererApi;
use super::shader::StageKind;

/// Fatal renderer failures. No handle is produced when one of these is
/// returned.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("renderer api `{api}` cannot create {resource}")]
    UnsupportedApi { api: RendererApi, resource: &'static str },

    #[error("unknown renderer api `{0}`")]
    UnknownApi(String),

    #[error(transparent)]
    Shader(#[from] ShaderError),

    #[error("vertex buffer has no layout")]
    EmptyLayout,

    #[error("vertex array has no index buffer")]
    MissingIndexBuffer,

    #[error("invalid draw call: {0}")]
    InvalidDraw(String),

    #[error("shader `{0}` already exists")]
    ShaderExists(String),

    #[error("shader `{0}` not found")]
    ShaderNotFound(String),
}

/// Shader pipeline failures, from directive parsing through linking.
#[derive(Debug, Error)]
pub enum ShaderError {
    #[error("syntax error at byte {offset}: {reason}")]
    Syntax { offset: usize, reason: &'static str },

    #[error("invalid shader stage `{0}`")]
    UnknownStage(String),

    #[error("only two shader stages are supported, got {0}")]
    TooManyStages(usize),

    #[error("shader stage `{0}` declared more than once")]
    DuplicateStage(StageKind),

    #[error("{stage} shader compilation failed:\n{log}")]
    Compile { stage: StageKind, log: String },

    #[error("shader link failed:\n{log}")]
    Link { log: String },
}
