use std::rc::Rc;

use super::backend::{Backend, VertexArrayId, VertexAttribute};
use super::buffer::{IndexBuffer, VertexBuffer};
use super::context::RenderContext;
use super::error::RenderError;

/// Vertex buffers plus an optional index buffer, bound as one unit.
///
/// Attribute slots are numbered from 0 in attach order and keep counting
/// across buffers, so a second buffer's first attribute lands after the last
/// slot of the first buffer.
pub struct VertexArray {
    backend: Rc<dyn Backend>,
    id: VertexArrayId,
    next_slot: u32,
    vertex_buffers: Vec<VertexBuffer>,
    index_buffer: Option<IndexBuffer>,
}

impl VertexArray {
    pub fn create(ctx: &RenderContext) -> Result<Self, RenderError> {
        let backend = ctx.backend("vertex array")?;
        let id = backend.create_vertex_array();
        Ok(Self {
            backend: Rc::clone(backend),
            id,
            next_slot: 0,
            vertex_buffers: Vec::new(),
            index_buffer: None,
        })
    }

    pub fn bind(&self) {
        self.backend.bind_vertex_array(Some(self.id));
    }

    pub fn unbind(&self) {
        self.backend.bind_vertex_array(None);
    }

    /// Attaches `buffer` and describes one attribute slot per layout column.
    pub fn add_vertex_buffer(&mut self, buffer: VertexBuffer) -> Result<(), RenderError> {
        let layout = buffer.layout();
        if layout.is_empty() {
            log::error!("vertex buffer has no layout");
            return Err(RenderError::EmptyLayout);
        }

        self.bind();
        buffer.bind();

        let stride = layout.stride();
        for element in layout.elements() {
            let ty = element.ty;
            let column_size = ty.column_components() * 4;
            for column in 0..ty.slot_count() {
                let slot = self.next_slot;
                self.backend.enable_vertex_attribute(slot);
                self.backend.describe_vertex_attribute(VertexAttribute {
                    slot,
                    scalar: ty.scalar_type(),
                    components: ty.column_components(),
                    normalized: element.normalized,
                    stride,
                    offset: element.offset + column * column_size,
                });
                self.next_slot += 1;
            }
        }

        self.vertex_buffers.push(buffer);
        Ok(())
    }

    pub fn set_index_buffer(&mut self, buffer: IndexBuffer) {
        self.bind();
        buffer.bind();
        self.index_buffer = Some(buffer);
    }

    pub fn vertex_buffers(&self) -> &[VertexBuffer] {
        &self.vertex_buffers
    }

    pub fn index_buffer(&self) -> Option<&IndexBuffer> {
        self.index_buffer.as_ref()
    }

    pub fn id(&self) -> VertexArrayId {
        self.id
    }
}

impl Drop for VertexArray {
    fn drop(&mut self) {
        self.backend.delete_vertex_array(self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::backend::{BufferTarget, HeadlessBackend, ResourceStats};
    use crate::renderer::buffer::{BufferElement, BufferLayout, ShaderDataType};

    fn headless() -> (RenderContext, Rc<HeadlessBackend>) {
        let backend = Rc::new(HeadlessBackend::new());
        (RenderContext::with_backend(backend.clone()), backend)
    }

    fn buffer(ctx: &RenderContext, elements: Vec<BufferElement>) -> VertexBuffer {
        let mut vb = VertexBuffer::create(ctx, &[0.0; 32]).unwrap();
        vb.set_layout(BufferLayout::new(elements));
        vb
    }

    #[test]
    fn slots_continue_across_buffers() {
        let (ctx, backend) = headless();
        let mut va = VertexArray::create(&ctx).unwrap();

        let first = buffer(
            &ctx,
            vec![
                BufferElement::new(ShaderDataType::Float3, "a_position"),
                BufferElement::new(ShaderDataType::Float4, "a_color"),
            ],
        );
        let second = buffer(&ctx, vec![BufferElement::new(ShaderDataType::Float2, "a_uv")]);
        let (first_id, second_id) = (first.id(), second.id());

        va.add_vertex_buffer(first).unwrap();
        va.add_vertex_buffer(second).unwrap();

        let attrs = backend.attributes(va.id());
        let slots: Vec<u32> = attrs.iter().map(|a| a.slot).collect();
        assert_eq!(slots, [0, 1, 2]);
        assert_eq!((attrs[1].offset, attrs[1].stride, attrs[1].components), (12, 28, 4));
        assert_eq!((attrs[2].offset, attrs[2].stride), (0, 8));

        let snapshot = backend.snapshot();
        let record = &snapshot.vertex_arrays[&va.id()];
        assert_eq!(record.attributes[&0].layout.map(|(_, b)| b), Some(first_id));
        assert_eq!(record.attributes[&2].layout.map(|(_, b)| b), Some(second_id));
    }

    #[test]
    fn matrices_take_one_slot_per_column() {
        let (ctx, backend) = headless();
        let mut va = VertexArray::create(&ctx).unwrap();
        va.add_vertex_buffer(buffer(
            &ctx,
            vec![
                BufferElement::new(ShaderDataType::Mat4, "a_transform"),
                BufferElement::new(ShaderDataType::Int, "a_id"),
            ],
        ))
        .unwrap();

        let attrs = backend.attributes(va.id());
        let offsets: Vec<u32> = attrs.iter().map(|a| a.offset).collect();
        assert_eq!(offsets, [0, 16, 32, 48, 64]);
        assert_eq!(attrs[4].slot, 4);
        assert!(attrs[..4].iter().all(|a| a.components == 4 && a.stride == 68));
    }

    #[test]
    fn empty_layout_is_fatal() {
        let (ctx, backend) = headless();
        let mut va = VertexArray::create(&ctx).unwrap();
        let err = va.add_vertex_buffer(buffer(&ctx, Vec::new())).unwrap_err();
        assert!(matches!(err, RenderError::EmptyLayout));
        assert!(va.vertex_buffers().is_empty());
        assert!(backend.attributes(va.id()).is_empty());
    }

    #[test]
    fn index_buffer_is_recorded_by_the_array() {
        let (ctx, backend) = headless();
        let mut va = VertexArray::create(&ctx).unwrap();
        let ib = IndexBuffer::create(&ctx, &[0, 1, 2, 2, 3, 0]).unwrap();
        let ib_id = ib.id();
        va.set_index_buffer(ib);

        assert_eq!(va.index_buffer().map(|b| b.count()), Some(6));
        assert_eq!(backend.index_buffer_of(va.id()), Some(ib_id));

        let other = VertexArray::create(&ctx).unwrap();
        other.bind();
        assert_eq!(backend.bound_buffer(BufferTarget::Index), None);
        va.bind();
        assert_eq!(backend.bound_buffer(BufferTarget::Index), Some(ib_id));
    }

    #[test]
    fn drop_releases_array_and_owned_buffers() {
        let (ctx, backend) = headless();
        let mut va = VertexArray::create(&ctx).unwrap();
        va.add_vertex_buffer(buffer(&ctx, vec![BufferElement::new(ShaderDataType::Float, "a")]))
            .unwrap();
        va.set_index_buffer(IndexBuffer::create(&ctx, &[0]).unwrap());
        drop(va);
        assert_eq!(backend.stats(), ResourceStats::default());
    }
}
