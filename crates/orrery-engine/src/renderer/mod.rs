//! Backend-agnostic rendering.
//!
//! Resource handles (`VertexBuffer`, `IndexBuffer`, `VertexArray`, `Shader`)
//! are created through a [`RenderContext`], which fixes the backend for
//! their whole lifetime. Each handle owns exactly one backend object and
//! releases it on drop.

mod api;
pub mod backend;
mod buffer;
mod camera;
mod command;
mod context;
mod error;
mod scene;
pub mod shader;
mod vertex_array;

pub use api::RendererApi;
pub use buffer::{BufferElement, BufferLayout, IndexBuffer, ShaderDataType, VertexBuffer};
pub use camera::OrthographicCamera;
pub use command::RenderCommand;
pub use context::RenderContext;
pub use error::{RenderError, ShaderError};
pub use scene::{Renderer, TRANSFORM_UNIFORM, VIEW_PROJECTION_UNIFORM};
pub use shader::{Shader, ShaderLibrary, ShaderSources, StageKind, UniformType, UniformValue};
pub use vertex_array::VertexArray;
