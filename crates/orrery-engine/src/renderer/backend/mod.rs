//! Backend abstraction.
//!
//! Resource handles talk to a [`Backend`] through a small GL-shaped command
//! surface: create/bind/delete for buffers, vertex arrays, shader stages and
//! programs, plus uniform upload, clears and indexed draws. Binding state is
//! global per backend, exactly like a GL context, and lives in
//! [`state::BindingState`] so every backend interprets it the same way.

use glam::Vec4;

use super::api::RendererApi;
use super::shader::{StageKind, UniformType, UniformValue};

pub mod gpu;
pub mod headless;
pub(crate) mod state;

pub use gpu::{GpuInit, WgpuBackend};
pub use headless::{DrawRecord, FrameLog, HeadlessBackend, ResourceStats};

macro_rules! resource_id {
    ($($(#[$meta:meta])* $name:ident),* $(,)?) => {
        $(
            $(#[$meta])*
            #[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
            pub struct $name(pub(crate) u32);

            impl $name {
                pub fn raw(self) -> u32 {
                    self.0
                }
            }
        )*
    };
}

resource_id!(
    /// Backend buffer object.
    BufferId,
    /// Backend vertex array object.
    VertexArrayId,
    /// Backend shader stage object.
    StageId,
    /// Backend linked program object.
    ProgramId,
);

/// Bind point for a buffer.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum BufferTarget {
    Vertex,
    Index,
}

/// Scalar type of a vertex attribute component.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum ScalarType {
    Float32,
    Int32,
}

/// Layout of one attribute slot inside the currently bound vertex buffer.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct VertexAttribute {
    pub slot: u32,
    pub scalar: ScalarType,
    pub components: u32,
    pub normalized: bool,
    pub stride: u32,
    pub offset: u32,
}

/// Result of a uniform lookup on a linked program.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct UniformLocation {
    pub program: ProgramId,
    pub index: u32,
    pub ty: UniformType,
}

/// GL-shaped command surface implemented by every graphics backend.
///
/// Calls take `&self`; implementations keep their state behind interior
/// mutability since handles share one backend through `Rc<dyn Backend>`.
pub trait Backend {
    fn api(&self) -> RendererApi;

    /// One-time pipeline state setup (blending, depth).
    fn init(&self);

    fn create_buffer(&self, target: BufferTarget, data: &[u8]) -> BufferId;
    /// Binds `buffer` to `target`, or clears the binding with `None`.
    fn bind_buffer(&self, target: BufferTarget, buffer: Option<BufferId>);
    fn delete_buffer(&self, buffer: BufferId);

    fn create_vertex_array(&self) -> VertexArrayId;
    fn bind_vertex_array(&self, array: Option<VertexArrayId>);
    fn enable_vertex_attribute(&self, slot: u32);
    /// Describes `attribute.slot` as reading from the bound vertex buffer.
    fn describe_vertex_attribute(&self, attribute: VertexAttribute);
    fn delete_vertex_array(&self, array: VertexArrayId);

    fn create_stage(&self, kind: StageKind) -> StageId;
    /// Compiles `source` into `stage`. The error carries the compiler log.
    fn compile_stage(&self, stage: StageId, source: &str) -> Result<(), String>;
    fn delete_stage(&self, stage: StageId);

    fn create_program(&self) -> ProgramId;
    fn attach_stage(&self, program: ProgramId, stage: StageId);
    fn detach_stage(&self, program: ProgramId, stage: StageId);
    /// Links the attached stages. The error carries the linker log.
    fn link_program(&self, program: ProgramId) -> Result<(), String>;
    fn use_program(&self, program: Option<ProgramId>);
    fn delete_program(&self, program: ProgramId);

    /// Looks up a uniform by name. Never cached by callers.
    fn uniform_location(&self, program: ProgramId, name: &str) -> Option<UniformLocation>;
    /// Writes a uniform of the currently bound program.
    fn upload_uniform(&self, location: UniformLocation, value: UniformValue);

    fn set_viewport(&self, x: u32, y: u32, width: u32, height: u32);
    fn set_clear_color(&self, color: Vec4);
    fn clear(&self);
    /// Draws `count` indices from the bound vertex array's index buffer.
    fn draw_indexed(&self, count: u32) -> Result<(), String>;
    fn present(&self);
}
