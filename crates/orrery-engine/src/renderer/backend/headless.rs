//! CPU-side backend.
//!
//! Runs the full binding state machine without a device and keeps a log of
//! what a GPU would have been asked to do, so renderer code can be tested
//! on machines with neither a GPU nor a display.

use std::cell::{Cell, RefCell};

use glam::Vec4;

use crate::renderer::api::RendererApi;
use crate::renderer::shader::{StageKind, UniformValue};

use super::state::BindingState;
use super::{
    Backend, BufferId, BufferTarget, ProgramId, StageId, UniformLocation, VertexArrayId,
    VertexAttribute,
};

/// One recorded indexed draw.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawRecord {
    /// Number of frames presented before this draw.
    pub frame: u64,
    pub program: ProgramId,
    pub vertex_array: VertexArrayId,
    pub index_count: u32,
    /// Uniform values of `program` at draw time, in binding order.
    pub uniforms: Vec<(String, Option<UniformValue>)>,
}

/// Everything the backend was asked to do besides state changes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameLog {
    pub initialized: bool,
    pub frames_presented: u64,
    pub clears: u64,
    pub clear_color: Vec4,
    pub viewport: (u32, u32, u32, u32),
    pub draws: Vec<DrawRecord>,
}

/// Live resource counts.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct ResourceStats {
    pub buffers: usize,
    pub vertex_arrays: usize,
    pub stages: usize,
    pub programs: usize,
}

#[derive(Debug, Default)]
pub struct HeadlessBackend {
    state: RefCell<BindingState>,
    log: RefCell<FrameLog>,
    failed_draws: Cell<u64>,
}

impl HeadlessBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stats(&self) -> ResourceStats {
        let state = self.state.borrow();
        ResourceStats {
            buffers: state.buffers.len(),
            vertex_arrays: state.vertex_arrays.len(),
            stages: state.stages.len(),
            programs: state.programs.len(),
        }
    }

    pub fn bound_buffer(&self, target: BufferTarget) -> Option<BufferId> {
        let state = self.state.borrow();
        match target {
            BufferTarget::Vertex => state.array_buffer,
            BufferTarget::Index => state.element_buffer(),
        }
    }

    pub fn bound_program(&self) -> Option<ProgramId> {
        self.state.borrow().bound_program
    }

    pub fn bound_vertex_array(&self) -> Option<VertexArrayId> {
        self.state.borrow().bound_vertex_array
    }

    pub fn buffer_size(&self, buffer: BufferId) -> Option<usize> {
        self.state.borrow().buffers.get(&buffer).map(|b| b.size)
    }

    /// Enabled, described attributes of `array`, in slot order.
    pub fn attributes(&self, array: VertexArrayId) -> Vec<VertexAttribute> {
        let state = self.state.borrow();
        state
            .vertex_arrays
            .get(&array)
            .map(|record| {
                record
                    .attributes
                    .values()
                    .filter(|a| a.enabled)
                    .filter_map(|a| a.layout.map(|(layout, _)| layout))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn index_buffer_of(&self, array: VertexArrayId) -> Option<BufferId> {
        self.state
            .borrow()
            .vertex_arrays
            .get(&array)
            .and_then(|r| r.element_buffer)
    }

    /// Last uploaded value of uniform `name` on `program`.
    pub fn uniform(&self, program: ProgramId, name: &str) -> Option<UniformValue> {
        self.state
            .borrow()
            .uniform_values(program)
            .into_iter()
            .find(|(n, _)| n == name)
            .and_then(|(_, v)| v)
    }

    pub fn draws(&self) -> Vec<DrawRecord> {
        self.log.borrow().draws.clone()
    }

    pub fn failed_draws(&self) -> u64 {
        self.failed_draws.get()
    }

    pub fn frame_log(&self) -> FrameLog {
        self.log.borrow().clone()
    }

    pub(crate) fn snapshot(&self) -> BindingState {
        self.state.borrow().clone()
    }
}

impl Backend for HeadlessBackend {
    fn api(&self) -> RendererApi {
        RendererApi::Headless
    }

    fn init(&self) {
        self.log.borrow_mut().initialized = true;
    }

    fn create_buffer(&self, target: BufferTarget, data: &[u8]) -> BufferId {
        self.state.borrow_mut().create_buffer(target, data.len())
    }

    fn bind_buffer(&self, target: BufferTarget, buffer: Option<BufferId>) {
        self.state.borrow_mut().bind_buffer(target, buffer);
    }

    fn delete_buffer(&self, buffer: BufferId) {
        self.state.borrow_mut().delete_buffer(buffer);
    }

    fn create_vertex_array(&self) -> VertexArrayId {
        self.state.borrow_mut().create_vertex_array()
    }

    fn bind_vertex_array(&self, array: Option<VertexArrayId>) {
        self.state.borrow_mut().bind_vertex_array(array);
    }

    fn enable_vertex_attribute(&self, slot: u32) {
        self.state.borrow_mut().enable_vertex_attribute(slot);
    }

    fn describe_vertex_attribute(&self, attribute: VertexAttribute) {
        self.state.borrow_mut().describe_vertex_attribute(attribute);
    }

    fn delete_vertex_array(&self, array: VertexArrayId) {
        self.state.borrow_mut().delete_vertex_array(array);
    }

    fn create_stage(&self, kind: StageKind) -> StageId {
        self.state.borrow_mut().create_stage(kind)
    }

    fn compile_stage(&self, stage: StageId, source: &str) -> Result<(), String> {
        self.state.borrow_mut().compile_stage(stage, source)
    }

    fn delete_stage(&self, stage: StageId) {
        self.state.borrow_mut().delete_stage(stage);
    }

    fn create_program(&self) -> ProgramId {
        self.state.borrow_mut().create_program()
    }

    fn attach_stage(&self, program: ProgramId, stage: StageId) {
        self.state.borrow_mut().attach_stage(program, stage);
    }

    fn detach_stage(&self, program: ProgramId, stage: StageId) {
        self.state.borrow_mut().detach_stage(program, stage);
    }

    fn link_program(&self, program: ProgramId) -> Result<(), String> {
        self.state.borrow_mut().link_program(program)
    }

    fn use_program(&self, program: Option<ProgramId>) {
        self.state.borrow_mut().use_program(program);
    }

    fn delete_program(&self, program: ProgramId) {
        self.state.borrow_mut().delete_program(program);
    }

    fn uniform_location(&self, program: ProgramId, name: &str) -> Option<UniformLocation> {
        self.state.borrow().uniform_location(program, name)
    }

    fn upload_uniform(&self, location: UniformLocation, value: UniformValue) {
        self.state.borrow_mut().upload_uniform(location, value);
    }

    fn set_viewport(&self, x: u32, y: u32, width: u32, height: u32) {
        self.state.borrow_mut().viewport = (x, y, width, height);
        self.log.borrow_mut().viewport = (x, y, width, height);
    }

    fn set_clear_color(&self, color: Vec4) {
        self.state.borrow_mut().clear_color = color;
        self.log.borrow_mut().clear_color = color;
    }

    fn clear(&self) {
        self.log.borrow_mut().clears += 1;
    }

    fn draw_indexed(&self, count: u32) -> Result<(), String> {
        let state = self.state.borrow();
        let call = state.draw_call(count).inspect_err(|_| {
            self.failed_draws.set(self.failed_draws.get() + 1);
        })?;

        let mut log = self.log.borrow_mut();
        let frame = log.frames_presented;
        log.draws.push(DrawRecord {
            frame,
            program: call.program,
            vertex_array: call.vertex_array,
            index_count: call.count,
            uniforms: state.uniform_values(call.program),
        });
        Ok(())
    }

    fn present(&self) {
        self.log.borrow_mut().frames_presented += 1;
    }
}
