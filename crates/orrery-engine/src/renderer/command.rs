use std::rc::Rc;

use glam::Vec4;

use super::backend::Backend;
use super::context::RenderContext;
use super::error::RenderError;
use super::vertex_array::VertexArray;

/// Immediate render commands against the context's backend.
#[derive(Clone)]
pub struct RenderCommand {
    backend: Rc<dyn Backend>,
}

impl RenderCommand {
    pub fn new(ctx: &RenderContext) -> Result<Self, RenderError> {
        Ok(Self {
            backend: Rc::clone(ctx.backend("render commands")?),
        })
    }

    pub fn init(&self) {
        self.backend.init();
    }

    pub fn set_viewport(&self, x: u32, y: u32, width: u32, height: u32) {
        self.backend.set_viewport(x, y, width, height);
    }

    pub fn set_clear_color(&self, color: Vec4) {
        self.backend.set_clear_color(color);
    }

    pub fn clear(&self) {
        self.backend.clear();
    }

    /// Binds `vertex_array` and draws its whole index buffer.
    pub fn draw_indexed(&self, vertex_array: &VertexArray) -> Result<(), RenderError> {
        let count = vertex_array
            .index_buffer()
            .map(|ib| ib.count())
            .ok_or_else(|| {
                log::error!("draw of vertex array {} without an index buffer", vertex_array.id().raw());
                RenderError::MissingIndexBuffer
            })?;

        vertex_array.bind();
        self.backend.draw_indexed(count).map_err(|reason| {
            log::error!("draw rejected: {reason}");
            RenderError::InvalidDraw(reason)
        })
    }

    pub fn present(&self) {
        self.backend.present();
    }
}
