//! Shader pipeline: directive parsing, per-stage compilation, linking and
//! uniform upload.

pub(crate) mod compile;
mod library;
mod program;
mod source;
mod uniform;

pub use library::ShaderLibrary;
pub use program::Shader;
pub use source::{read_source, ShaderSources, StageKind};
pub use uniform::{UniformType, UniformValue};
