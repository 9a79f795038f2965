//! Vertex and index buffers plus vertex layout description.

use std::rc::Rc;

use super::backend::{Backend, BufferId, BufferTarget, ScalarType};
use super::context::RenderContext;
use super::error::RenderError;

/// Type of one vertex attribute.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum ShaderDataType {
    Float,
    Float2,
    Float3,
    Float4,
    Mat3,
    Mat4,
    Int,
    Int2,
    Int3,
    Int4,
}

impl ShaderDataType {
    /// Size in bytes.
    pub fn size(self) -> u32 {
        self.component_count() * 4
    }

    pub fn component_count(self) -> u32 {
        match self {
            ShaderDataType::Float | ShaderDataType::Int => 1,
            ShaderDataType::Float2 | ShaderDataType::Int2 => 2,
            ShaderDataType::Float3 | ShaderDataType::Int3 => 3,
            ShaderDataType::Float4 | ShaderDataType::Int4 => 4,
            ShaderDataType::Mat3 => 3 * 3,
            ShaderDataType::Mat4 => 4 * 4,
        }
    }

    pub fn scalar_type(self) -> ScalarType {
        match self {
            ShaderDataType::Int
            | ShaderDataType::Int2
            | ShaderDataType::Int3
            | ShaderDataType::Int4 => ScalarType::Int32,
            _ => ScalarType::Float32,
        }
    }

    /// Attribute slots occupied. Matrices take one slot per column.
    pub fn slot_count(self) -> u32 {
        match self {
            ShaderDataType::Mat3 => 3,
            ShaderDataType::Mat4 => 4,
            _ => 1,
        }
    }

    /// Components per slot.
    pub fn column_components(self) -> u32 {
        self.component_count() / self.slot_count()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BufferElement {
    pub name: String,
    pub ty: ShaderDataType,
    pub size: u32,
    pub offset: u32,
    pub normalized: bool,
}

impl BufferElement {
    pub fn new(ty: ShaderDataType, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ty,
            size: ty.size(),
            offset: 0,
            normalized: false,
        }
    }

    pub fn normalized(mut self) -> Self {
        self.normalized = true;
        self
    }

    pub fn component_count(&self) -> u32 {
        self.ty.component_count()
    }
}

/// Ordered attribute list of one vertex buffer. Offsets and stride are
/// derived from declaration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BufferLayout {
    elements: Vec<BufferElement>,
    stride: u32,
}

impl BufferLayout {
    pub fn new(elements: impl IntoIterator<Item = BufferElement>) -> Self {
        let mut elements: Vec<BufferElement> = elements.into_iter().collect();
        let mut offset = 0;
        for element in &mut elements {
            element.offset = offset;
            offset += element.size;
        }
        Self {
            elements,
            stride: offset,
        }
    }

    pub fn elements(&self) -> &[BufferElement] {
        &self.elements
    }

    pub fn stride(&self) -> u32 {
        self.stride
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}

impl FromIterator<BufferElement> for BufferLayout {
    fn from_iter<I: IntoIterator<Item = BufferElement>>(iter: I) -> Self {
        Self::new(iter)
    }
}

/// Static vertex data owned by the backend.
pub struct VertexBuffer {
    backend: Rc<dyn Backend>,
    id: BufferId,
    size: usize,
    layout: BufferLayout,
}

impl VertexBuffer {
    /// Uploads `vertices` as static data. The buffer is left bound.
    pub fn create(ctx: &RenderContext, vertices: &[f32]) -> Result<Self, RenderError> {
        let backend = ctx.backend("vertex buffer")?;
        let bytes: &[u8] = bytemuck::cast_slice(vertices);
        let id = backend.create_buffer(BufferTarget::Vertex, bytes);
        Ok(Self {
            backend: Rc::clone(backend),
            id,
            size: bytes.len(),
            layout: BufferLayout::default(),
        })
    }

    pub fn bind(&self) {
        self.backend.bind_buffer(BufferTarget::Vertex, Some(self.id));
    }

    pub fn unbind(&self) {
        self.backend.bind_buffer(BufferTarget::Vertex, None);
    }

    pub fn layout(&self) -> &BufferLayout {
        &self.layout
    }

    pub fn set_layout(&mut self, layout: BufferLayout) {
        self.layout = layout;
    }

    /// Size in bytes.
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn id(&self) -> BufferId {
        self.id
    }
}

impl Drop for VertexBuffer {
    fn drop(&mut self) {
        self.backend.delete_buffer(self.id);
    }
}

/// Static `u32` index data owned by the backend.
pub struct IndexBuffer {
    backend: Rc<dyn Backend>,
    id: BufferId,
    count: u32,
}

impl IndexBuffer {
    /// Uploads `indices` as static data.
    ///
    /// The bound vertex array keeps its own index buffer; attach this one
    /// with [`VertexArray::set_index_buffer`](super::VertexArray::set_index_buffer).
    pub fn create(ctx: &RenderContext, indices: &[u32]) -> Result<Self, RenderError> {
        let backend = ctx.backend("index buffer")?;
        let id = backend.create_buffer(BufferTarget::Index, bytemuck::cast_slice(indices));
        Ok(Self {
            backend: Rc::clone(backend),
            id,
            count: indices.len() as u32,
        })
    }

    pub fn bind(&self) {
        self.backend.bind_buffer(BufferTarget::Index, Some(self.id));
    }

    pub fn unbind(&self) {
        self.backend.bind_buffer(BufferTarget::Index, None);
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn id(&self) -> BufferId {
        self.id
    }
}

impl Drop for IndexBuffer {
    fn drop(&mut self) {
        self.backend.delete_buffer(self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::backend::HeadlessBackend;

    fn headless() -> (RenderContext, Rc<HeadlessBackend>) {
        let backend = Rc::new(HeadlessBackend::new());
        (RenderContext::with_backend(backend.clone()), backend)
    }

    // ---- layout ----

    #[test]
    fn layout_derives_offsets_and_stride() {
        let layout = BufferLayout::new([
            BufferElement::new(ShaderDataType::Float3, "a_position"),
            BufferElement::new(ShaderDataType::Float4, "a_color").normalized(),
            BufferElement::new(ShaderDataType::Int, "a_id"),
        ]);
        let offsets: Vec<u32> = layout.elements().iter().map(|e| e.offset).collect();
        assert_eq!(offsets, [0, 12, 28]);
        assert_eq!(layout.stride(), 32);
        assert!(layout.elements()[1].normalized);
    }

    #[test]
    fn data_type_sizes() {
        assert_eq!(ShaderDataType::Float.size(), 4);
        assert_eq!(ShaderDataType::Int3.size(), 12);
        assert_eq!(ShaderDataType::Mat3.size(), 36);
        assert_eq!(ShaderDataType::Mat4.size(), 64);
        assert_eq!(ShaderDataType::Mat4.column_components(), 4);
        assert_eq!(ShaderDataType::Mat3.slot_count(), 3);
    }

    // ---- buffers ----

    #[test]
    fn create_uploads_and_drop_releases() {
        let (ctx, backend) = headless();
        let vb = VertexBuffer::create(&ctx, &[0.0; 9]).unwrap();
        assert_eq!(vb.size(), 36);
        assert_eq!(backend.buffer_size(vb.id()), Some(36));

        let ib = IndexBuffer::create(&ctx, &[0, 1, 2]).unwrap();
        assert_eq!(ib.count(), 3);
        assert_eq!(backend.stats().buffers, 2);

        drop(vb);
        drop(ib);
        assert_eq!(backend.stats().buffers, 0);
    }

    #[test]
    fn binding_twice_matches_binding_once() {
        let (ctx, backend) = headless();
        let vb = VertexBuffer::create(&ctx, &[1.0, 2.0, 3.0]).unwrap();
        vb.bind();
        let once = backend.snapshot();
        vb.bind();
        assert_eq!(backend.snapshot(), once);
    }

    #[test]
    fn unbind_clears_target_and_is_noop_when_unbound() {
        let (ctx, backend) = headless();
        let vb = VertexBuffer::create(&ctx, &[1.0]).unwrap();
        assert_eq!(backend.bound_buffer(BufferTarget::Vertex), Some(vb.id()));
        vb.unbind();
        assert_eq!(backend.bound_buffer(BufferTarget::Vertex), None);

        let before = backend.snapshot();
        vb.unbind();
        assert_eq!(backend.snapshot(), before);
    }

    #[test]
    fn null_api_creates_nothing() {
        let ctx = RenderContext::null();
        assert!(matches!(
            VertexBuffer::create(&ctx, &[0.0]),
            Err(RenderError::UnsupportedApi { .. })
        ));
        assert!(matches!(
            IndexBuffer::create(&ctx, &[0]),
            Err(RenderError::UnsupportedApi { .. })
        ));
    }
}
