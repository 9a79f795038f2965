//! GL-style binding state shared by every backend.
//!
//! Backends own one `BindingState` each and forward their command surface to
//! it; the state enforces binding rules and validates draws, leaving the
//! backend to do the actual GPU work.

use std::collections::BTreeMap;

use glam::Vec4;

use crate::renderer::shader::compile::{self, CompiledStage, LinkedProgram};
use crate::renderer::shader::{StageKind, UniformValue};

use super::{
    BufferId, BufferTarget, ProgramId, StageId, UniformLocation, VertexArrayId, VertexAttribute,
};

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct BufferRecord {
    pub target: BufferTarget,
    pub size: usize,
}

#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub(crate) struct AttributeRecord {
    pub enabled: bool,
    pub layout: Option<(VertexAttribute, BufferId)>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct VertexArrayRecord {
    pub attributes: BTreeMap<u32, AttributeRecord>,
    pub element_buffer: Option<BufferId>,
    /// Bumped on every change that affects pipeline layout.
    pub revision: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct StageRecord {
    pub kind: StageKind,
    pub compiled: Option<CompiledStage>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct ProgramRecord {
    pub attached: Vec<StageId>,
    pub linked: Option<LinkedProgram>,
    /// Last uploaded value per linked uniform, indexed like `linked.uniforms`.
    pub values: Vec<Option<UniformValue>>,
}

/// Buffers sharing one vertex buffer binding during a draw.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct VertexBinding {
    pub buffer: BufferId,
    pub stride: u32,
    pub attributes: Vec<VertexAttribute>,
}

/// A validated indexed draw.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub(crate) struct DrawCall {
    pub program: ProgramId,
    pub vertex_array: VertexArrayId,
    pub index_buffer: BufferId,
    pub count: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct BindingState {
    next_id: u32,
    pub buffers: BTreeMap<BufferId, BufferRecord>,
    pub array_buffer: Option<BufferId>,
    /// Element buffer binding while no vertex array is bound.
    pub loose_element_buffer: Option<BufferId>,
    pub vertex_arrays: BTreeMap<VertexArrayId, VertexArrayRecord>,
    pub bound_vertex_array: Option<VertexArrayId>,
    pub stages: BTreeMap<StageId, StageRecord>,
    pub programs: BTreeMap<ProgramId, ProgramRecord>,
    pub bound_program: Option<ProgramId>,
    pub viewport: (u32, u32, u32, u32),
    pub clear_color: Vec4,
}

impl Default for BindingState {
    fn default() -> Self {
        Self {
            next_id: 1,
            buffers: BTreeMap::new(),
            array_buffer: None,
            loose_element_buffer: None,
            vertex_arrays: BTreeMap::new(),
            bound_vertex_array: None,
            stages: BTreeMap::new(),
            programs: BTreeMap::new(),
            bound_program: None,
            viewport: (0, 0, 0, 0),
            clear_color: Vec4::new(0.0, 0.0, 0.0, 1.0),
        }
    }
}

impl BindingState {
    fn next_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    // ---- buffers ----

    /// Creates a buffer and leaves it bound to `target`.
    ///
    /// An index buffer never lands in the bound vertex array's record; it
    /// only becomes the loose element binding when no array is bound.
    /// Arrays pick up index buffers through an explicit bind.
    pub fn create_buffer(&mut self, target: BufferTarget, size: usize) -> BufferId {
        let id = BufferId(self.next_id());
        self.buffers.insert(id, BufferRecord { target, size });
        match target {
            BufferTarget::Vertex => self.array_buffer = Some(id),
            BufferTarget::Index => {
                if self.bound_vertex_array.is_none() {
                    self.loose_element_buffer = Some(id);
                }
            }
        }
        id
    }

    pub fn bind_buffer(&mut self, target: BufferTarget, buffer: Option<BufferId>) {
        if let Some(id) = buffer {
            if !self.buffers.contains_key(&id) {
                log::warn!("bind of unknown buffer {}", id.0);
                return;
            }
        }

        match target {
            BufferTarget::Vertex => self.array_buffer = buffer,
            BufferTarget::Index => match self.bound_vertex_array {
                Some(vao) => {
                    if let Some(record) = self.vertex_arrays.get_mut(&vao) {
                        if record.element_buffer != buffer {
                            record.element_buffer = buffer;
                            record.revision += 1;
                        }
                    }
                }
                None => self.loose_element_buffer = buffer,
            },
        }
    }

    /// The element buffer visible through the current bindings.
    pub fn element_buffer(&self) -> Option<BufferId> {
        match self.bound_vertex_array {
            Some(vao) => self.vertex_arrays.get(&vao).and_then(|r| r.element_buffer),
            None => self.loose_element_buffer,
        }
    }

    pub fn delete_buffer(&mut self, buffer: BufferId) {
        if self.buffers.remove(&buffer).is_none() {
            return;
        }
        if self.array_buffer == Some(buffer) {
            self.array_buffer = None;
        }
        if self.loose_element_buffer == Some(buffer) {
            self.loose_element_buffer = None;
        }
        for record in self.vertex_arrays.values_mut() {
            let mut changed = false;
            if record.element_buffer == Some(buffer) {
                record.element_buffer = None;
                changed = true;
            }
            for attr in record.attributes.values_mut() {
                if matches!(attr.layout, Some((_, b)) if b == buffer) {
                    attr.layout = None;
                    changed = true;
                }
            }
            if changed {
                record.revision += 1;
            }
        }
    }

    // ---- vertex arrays ----

    pub fn create_vertex_array(&mut self) -> VertexArrayId {
        let id = VertexArrayId(self.next_id());
        self.vertex_arrays.insert(id, VertexArrayRecord::default());
        id
    }

    pub fn bind_vertex_array(&mut self, array: Option<VertexArrayId>) {
        if let Some(id) = array {
            if !self.vertex_arrays.contains_key(&id) {
                log::warn!("bind of unknown vertex array {}", id.0);
                return;
            }
        }
        self.bound_vertex_array = array;
    }

    fn bound_vertex_array_mut(&mut self, op: &str) -> Option<&mut VertexArrayRecord> {
        let record = self
            .bound_vertex_array
            .and_then(|id| self.vertex_arrays.get_mut(&id));
        if record.is_none() {
            log::warn!("{op} without a bound vertex array");
        }
        record
    }

    pub fn enable_vertex_attribute(&mut self, slot: u32) {
        if let Some(record) = self.bound_vertex_array_mut("enable_vertex_attribute") {
            let attr = record.attributes.entry(slot).or_default();
            if !attr.enabled {
                attr.enabled = true;
                record.revision += 1;
            }
        }
    }

    pub fn describe_vertex_attribute(&mut self, attribute: VertexAttribute) {
        let Some(buffer) = self.array_buffer else {
            log::warn!("describe_vertex_attribute without a bound vertex buffer");
            return;
        };
        if let Some(record) = self.bound_vertex_array_mut("describe_vertex_attribute") {
            let attr = record.attributes.entry(attribute.slot).or_default();
            let layout = Some((attribute, buffer));
            if attr.layout != layout {
                attr.layout = layout;
                record.revision += 1;
            }
        }
    }

    pub fn delete_vertex_array(&mut self, array: VertexArrayId) {
        self.vertex_arrays.remove(&array);
        if self.bound_vertex_array == Some(array) {
            self.bound_vertex_array = None;
        }
    }

    /// Enabled attributes grouped by source buffer, in slot order.
    pub fn vertex_bindings(&self, array: VertexArrayId) -> Vec<VertexBinding> {
        let mut bindings: Vec<VertexBinding> = Vec::new();
        let Some(record) = self.vertex_arrays.get(&array) else {
            return bindings;
        };

        for attr in record.attributes.values().filter(|a| a.enabled) {
            let Some((layout, buffer)) = attr.layout else {
                continue;
            };
            match bindings
                .iter_mut()
                .find(|b| b.buffer == buffer && b.stride == layout.stride)
            {
                Some(binding) => binding.attributes.push(layout),
                None => bindings.push(VertexBinding {
                    buffer,
                    stride: layout.stride,
                    attributes: vec![layout],
                }),
            }
        }
        bindings
    }

    // ---- shader stages and programs ----

    pub fn create_stage(&mut self, kind: StageKind) -> StageId {
        let id = StageId(self.next_id());
        self.stages.insert(id, StageRecord { kind, compiled: None });
        id
    }

    pub fn compile_stage(&mut self, stage: StageId, source: &str) -> Result<(), String> {
        let record = self
            .stages
            .get_mut(&stage)
            .ok_or_else(|| format!("unknown shader stage {}", stage.0))?;
        record.compiled = None;
        record.compiled = Some(compile::compile_stage(record.kind, source)?);
        Ok(())
    }

    /// Deletes a stage and detaches it from every program.
    pub fn delete_stage(&mut self, stage: StageId) {
        self.stages.remove(&stage);
        for program in self.programs.values_mut() {
            program.attached.retain(|s| *s != stage);
        }
    }

    pub fn create_program(&mut self) -> ProgramId {
        let id = ProgramId(self.next_id());
        self.programs.insert(id, ProgramRecord::default());
        id
    }

    pub fn attach_stage(&mut self, program: ProgramId, stage: StageId) {
        if !self.stages.contains_key(&stage) {
            log::warn!("attach of unknown shader stage {}", stage.0);
            return;
        }
        if let Some(record) = self.programs.get_mut(&program) {
            if !record.attached.contains(&stage) {
                record.attached.push(stage);
            }
        }
    }

    pub fn detach_stage(&mut self, program: ProgramId, stage: StageId) {
        if let Some(record) = self.programs.get_mut(&program) {
            record.attached.retain(|s| *s != stage);
        }
    }

    pub fn link_program(&mut self, program: ProgramId) -> Result<(), String> {
        let record = self
            .programs
            .get(&program)
            .ok_or_else(|| format!("unknown program {}", program.0))?;

        let mut compiled: Vec<&CompiledStage> = Vec::with_capacity(record.attached.len());
        for id in &record.attached {
            match self.stages.get(id).and_then(|s| s.compiled.as_ref()) {
                Some(stage) => compiled.push(stage),
                None => return Err(format!("stage {} is not compiled", id.0)),
            }
        }

        let linked = compile::link_stages(&compiled)?;
        let values = vec![None; linked.uniforms.len()];

        if let Some(record) = self.programs.get_mut(&program) {
            record.linked = Some(linked);
            record.values = values;
        }
        Ok(())
    }

    pub fn use_program(&mut self, program: Option<ProgramId>) {
        if let Some(id) = program {
            if !self.programs.contains_key(&id) {
                log::warn!("use of unknown program {}", id.0);
                return;
            }
        }
        self.bound_program = program;
    }

    pub fn delete_program(&mut self, program: ProgramId) {
        self.programs.remove(&program);
        if self.bound_program == Some(program) {
            self.bound_program = None;
        }
    }

    pub fn linked(&self, program: ProgramId) -> Option<&LinkedProgram> {
        self.programs.get(&program)?.linked.as_ref()
    }

    // ---- uniforms ----

    pub fn uniform_location(&self, program: ProgramId, name: &str) -> Option<UniformLocation> {
        let linked = self.linked(program)?;
        let index = linked.uniform_index(name)?;
        Some(UniformLocation {
            program,
            index: index as u32,
            ty: linked.uniforms[index].ty,
        })
    }

    /// Stores `value` on the bound program. Returns whether it was written.
    pub fn upload_uniform(&mut self, location: UniformLocation, value: UniformValue) -> bool {
        if self.bound_program != Some(location.program) {
            log::warn!(
                "uniform upload for program {} while {:?} is bound",
                location.program.0,
                self.bound_program.map(|p| p.0)
            );
            return false;
        }

        let Some(record) = self.programs.get_mut(&location.program) else {
            return false;
        };
        let Some(decl) = record
            .linked
            .as_ref()
            .and_then(|l| l.uniforms.get(location.index as usize))
        else {
            return false;
        };

        if decl.ty != value.ty() {
            log::warn!(
                "uniform `{}` is declared {} but was given {}; skipped",
                decl.name,
                decl.ty,
                value.ty()
            );
            return false;
        }

        record.values[location.index as usize] = Some(value);
        true
    }

    /// Uniform values of `program`, by name, in binding order.
    pub fn uniform_values(&self, program: ProgramId) -> Vec<(String, Option<UniformValue>)> {
        let Some(record) = self.programs.get(&program) else {
            return Vec::new();
        };
        let Some(linked) = &record.linked else {
            return Vec::new();
        };
        linked
            .uniforms
            .iter()
            .zip(&record.values)
            .map(|(decl, value)| (decl.name.clone(), *value))
            .collect()
    }

    // ---- draws ----

    /// Validates an indexed draw against the current bindings.
    pub fn draw_call(&self, count: u32) -> Result<DrawCall, String> {
        let program = self.bound_program.ok_or("no program bound")?;
        let linked = self
            .linked(program)
            .ok_or_else(|| format!("program {} is not linked", program.0))?;

        let vertex_array = self.bound_vertex_array.ok_or("no vertex array bound")?;
        let record = self
            .vertex_arrays
            .get(&vertex_array)
            .ok_or("bound vertex array was deleted")?;

        let index_buffer = record.element_buffer.ok_or("vertex array has no index buffer")?;
        let indices = self
            .buffers
            .get(&index_buffer)
            .map(|b| b.size / std::mem::size_of::<u32>())
            .unwrap_or(0);
        if count as usize > indices {
            return Err(format!(
                "draw of {count} indices from an index buffer holding {indices}"
            ));
        }

        for input in linked.vertex_inputs() {
            let attr = record
                .attributes
                .get(&input.location)
                .filter(|a| a.enabled)
                .and_then(|a| a.layout);
            match attr {
                None => {
                    return Err(format!(
                        "vertex input @location({}) has no enabled attribute",
                        input.location
                    ));
                }
                Some((layout, _)) if layout.scalar != input.ty.scalar => {
                    return Err(format!(
                        "vertex input @location({}) is {} but the attribute is {:?}",
                        input.location, input.ty, layout.scalar
                    ));
                }
                Some(_) => {}
            }
        }

        Ok(DrawCall {
            program,
            vertex_array,
            index_buffer,
            count,
        })
    }
}
