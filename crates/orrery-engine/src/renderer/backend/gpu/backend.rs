use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use glam::Vec4;
use wgpu::util::DeviceExt;
use winit::window::Window;

use crate::renderer::api::RendererApi;
use crate::renderer::backend::state::BindingState;
use crate::renderer::backend::{
    Backend, BufferId, BufferTarget, ProgramId, StageId, UniformLocation, VertexArrayId,
    VertexAttribute,
};
use crate::renderer::shader::{StageKind, UniformValue};

use super::context::{Gpu, GpuFrame};
use super::pipeline::{ProgramResources, VertexLayouts};
use super::surface::SurfaceErrorAction;
use super::GpuInit;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
struct PipelineKey {
    program: ProgramId,
    vertex_array: VertexArrayId,
    revision: u64,
}

impl PipelineKey {
    fn same_target(&self, other: &PipelineKey) -> bool {
        self.program == other.program && self.vertex_array == other.vertex_array
    }
}

/// Caches `pipeline` under `key`, evicting pipelines built for older
/// revisions of the same program and vertex array.
fn cache_pipeline<P>(cache: &mut HashMap<PipelineKey, P>, key: PipelineKey, pipeline: P) {
    cache.retain(|cached, _| !cached.same_target(&key));
    cache.insert(key, pipeline);
}

/// Hardware backend.
///
/// Exposes the GL-shaped command surface on top of wgpu. Every clear and
/// draw is recorded into its own render pass and submitted immediately, so
/// uniform writes made between draws land in order. Pipelines are built
/// lazily per (program, vertex array layout) and cached.
pub struct WgpuBackend {
    // Field order is drop order: the frame must go before the surface.
    frame: RefCell<Option<GpuFrame>>,
    pipelines: RefCell<HashMap<PipelineKey, wgpu::RenderPipeline>>,
    programs: RefCell<HashMap<ProgramId, ProgramResources>>,
    buffers: RefCell<HashMap<BufferId, wgpu::Buffer>>,
    state: RefCell<BindingState>,
    gpu: RefCell<Gpu>,
    window: Arc<Window>,
}

impl WgpuBackend {
    /// Creates the device and surface for `window`. Blocks on adapter and
    /// device acquisition.
    pub fn new(window: Arc<Window>, init: GpuInit) -> Result<Self> {
        let gpu = pollster::block_on(Gpu::new(Arc::clone(&window), init))?;
        Ok(Self {
            frame: RefCell::new(None),
            pipelines: RefCell::new(HashMap::new()),
            programs: RefCell::new(HashMap::new()),
            buffers: RefCell::new(HashMap::new()),
            state: RefCell::new(BindingState::default()),
            gpu: RefCell::new(gpu),
            window,
        })
    }

    /// Acquires the frame's surface texture if not yet done. Returns false
    /// when this frame cannot be drawn (minimized window, surface error).
    fn acquire_frame(&self) -> bool {
        if self.frame.borrow().is_some() {
            return true;
        }

        let mut gpu = self.gpu.borrow_mut();
        let size = self.window.inner_size();
        if size != gpu.size() {
            gpu.resize(size);
        }
        if size.width == 0 || size.height == 0 {
            return false;
        }

        match gpu.begin_frame() {
            Ok(frame) => {
                *self.frame.borrow_mut() = Some(frame);
                true
            }
            Err(err) => {
                match gpu.handle_surface_error(err) {
                    SurfaceErrorAction::Fatal => log::error!("surface error, frame dropped"),
                    action => log::debug!("surface not ready ({action:?}), frame skipped"),
                }
                false
            }
        }
    }

    fn forget_pipelines(&self, keep: impl Fn(&PipelineKey) -> bool) {
        self.pipelines.borrow_mut().retain(|key, _| keep(key));
    }

    fn viewport(&self, surface: (u32, u32)) -> Option<(f32, f32, f32, f32)> {
        let (x, y, w, h) = self.state.borrow().viewport;
        let (sw, sh) = surface;
        if w == 0 || h == 0 {
            return None;
        }
        let x = x.min(sw);
        let y = y.min(sh);
        let w = w.min(sw - x);
        let h = h.min(sh - y);
        (w > 0 && h > 0).then_some((x as f32, y as f32, w as f32, h as f32))
    }
}

impl Backend for WgpuBackend {
    fn api(&self) -> RendererApi {
        RendererApi::Wgpu
    }

    fn init(&self) {
        let gpu = self.gpu.borrow();
        log::info!(
            "wgpu backend ready: surface {:?}, {}x{}",
            gpu.surface_format(),
            gpu.size().width,
            gpu.size().height
        );
    }

    fn create_buffer(&self, target: BufferTarget, data: &[u8]) -> BufferId {
        let id = self.state.borrow_mut().create_buffer(target, data.len());
        let usage = match target {
            BufferTarget::Vertex => wgpu::BufferUsages::VERTEX,
            BufferTarget::Index => wgpu::BufferUsages::INDEX,
        };
        let buffer = self
            .gpu
            .borrow()
            .device()
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("orrery buffer"),
                contents: data,
                usage: usage | wgpu::BufferUsages::COPY_DST,
            });
        self.buffers.borrow_mut().insert(id, buffer);
        id
    }

    fn bind_buffer(&self, target: BufferTarget, buffer: Option<BufferId>) {
        self.state.borrow_mut().bind_buffer(target, buffer);
    }

    fn delete_buffer(&self, buffer: BufferId) {
        self.state.borrow_mut().delete_buffer(buffer);
        self.buffers.borrow_mut().remove(&buffer);
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
        self.forget_pipelines(|key| key.vertex_array != array);
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
        let mut state = self.state.borrow_mut();
        state.link_program(program)?;
        let linked = state
            .linked(program)
            .ok_or_else(|| format!("program {} vanished during link", program.raw()))?;

        let resources = ProgramResources::new(self.gpu.borrow().device(), linked);
        self.programs.borrow_mut().insert(program, resources);
        self.forget_pipelines(|key| key.program != program);
        Ok(())
    }

    fn use_program(&self, program: Option<ProgramId>) {
        self.state.borrow_mut().use_program(program);
    }

    fn delete_program(&self, program: ProgramId) {
        self.state.borrow_mut().delete_program(program);
        self.programs.borrow_mut().remove(&program);
        self.forget_pipelines(|key| key.program != program);
    }

    fn uniform_location(&self, program: ProgramId, name: &str) -> Option<UniformLocation> {
        self.state.borrow().uniform_location(program, name)
    }

    fn upload_uniform(&self, location: UniformLocation, value: UniformValue) {
        if !self.state.borrow_mut().upload_uniform(location, value) {
            return;
        }
        let programs = self.programs.borrow();
        let Some(buffer) = programs
            .get(&location.program)
            .and_then(|p| p.uniform_buffers.get(location.index as usize))
        else {
            return;
        };
        self.gpu
            .borrow()
            .queue()
            .write_buffer(buffer, 0, &value.to_bytes());
    }

    fn set_viewport(&self, x: u32, y: u32, width: u32, height: u32) {
        self.state.borrow_mut().viewport = (x, y, width, height);
    }

    fn set_clear_color(&self, color: Vec4) {
        self.state.borrow_mut().clear_color = color;
    }

    fn clear(&self) {
        if !self.acquire_frame() {
            return;
        }
        let frame = self.frame.borrow();
        let Some(frame) = frame.as_ref() else {
            return;
        };

        let c = self.state.borrow().clear_color;
        let gpu = self.gpu.borrow();
        let mut encoder = gpu
            .device()
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("orrery clear encoder"),
            });
        {
            let _pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("orrery clear pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &frame.view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: c.x as f64,
                            g: c.y as f64,
                            b: c.z as f64,
                            a: c.w as f64,
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });
        }
        gpu.queue().submit(std::iter::once(encoder.finish()));
    }

    fn draw_indexed(&self, count: u32) -> Result<(), String> {
        let state = self.state.borrow();
        let call = state.draw_call(count)?;
        if count == 0 {
            return Ok(());
        }

        let bindings = state.vertex_bindings(call.vertex_array);
        let key = PipelineKey {
            program: call.program,
            vertex_array: call.vertex_array,
            revision: state
                .vertex_arrays
                .get(&call.vertex_array)
                .map(|r| r.revision)
                .unwrap_or(0),
        };
        drop(state);

        let buffers = self.buffers.borrow();
        let index_buffer = buffers
            .get(&call.index_buffer)
            .ok_or("index buffer has no GPU storage")?;
        let mut vertex_buffers = Vec::with_capacity(bindings.len());
        for binding in &bindings {
            let buffer = buffers
                .get(&binding.buffer)
                .ok_or_else(|| format!("vertex buffer {} has no GPU storage", binding.buffer.raw()))?;
            vertex_buffers.push(buffer);
        }
        if index_buffer.size() == 0 || vertex_buffers.iter().any(|b| b.size() == 0) {
            log::debug!("draw with an empty buffer skipped");
            return Ok(());
        }

        let programs = self.programs.borrow();
        let resources = programs
            .get(&call.program)
            .ok_or_else(|| format!("program {} has no GPU resources", call.program.raw()))?;

        if !self.pipelines.borrow().contains_key(&key) {
            let layouts = VertexLayouts::new(&bindings)?;
            let gpu = self.gpu.borrow();
            let pipeline = resources.create_pipeline(gpu.device(), gpu.surface_format(), &layouts);
            log::debug!(
                "pipeline built for program {} / vertex array {}",
                key.program.raw(),
                key.vertex_array.raw()
            );
            cache_pipeline(&mut *self.pipelines.borrow_mut(), key, pipeline);
        }

        if !self.acquire_frame() {
            return Ok(());
        }
        let frame = self.frame.borrow();
        let Some(frame) = frame.as_ref() else {
            return Ok(());
        };
        let pipelines = self.pipelines.borrow();
        let Some(pipeline) = pipelines.get(&key) else {
            return Ok(());
        };

        let gpu = self.gpu.borrow();
        let size = gpu.size();
        let mut encoder = gpu
            .device()
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("orrery draw encoder"),
            });
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("orrery draw pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &frame.view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });

            if let Some((x, y, w, h)) = self.viewport((size.width, size.height)) {
                pass.set_viewport(x, y, w, h, 0.0, 1.0);
            }
            pass.set_pipeline(pipeline);
            for (group, bind_group) in resources.bind_groups.iter().enumerate() {
                pass.set_bind_group(group as u32, bind_group, &[]);
            }
            for (slot, buffer) in vertex_buffers.iter().enumerate() {
                pass.set_vertex_buffer(slot as u32, buffer.slice(..));
            }
            pass.set_index_buffer(index_buffer.slice(..), wgpu::IndexFormat::Uint32);
            pass.draw_indexed(0..count, 0, 0..1);
        }
        gpu.queue().submit(std::iter::once(encoder.finish()));
        Ok(())
    }

    fn present(&self) {
        if let Some(frame) = self.frame.borrow_mut().take() {
            self.window.pre_present_notify();
            frame.surface_texture.present();
        }
    }
}
