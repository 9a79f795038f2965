use glam::{Mat4, Vec4};

use super::camera::OrthographicCamera;
use super::command::RenderCommand;
use super::context::RenderContext;
use super::error::RenderError;
use super::shader::Shader;
use super::vertex_array::VertexArray;

/// Uniform names every scene shader is expected to declare.
pub const VIEW_PROJECTION_UNIFORM: &str = "u_view_projection";
pub const TRANSFORM_UNIFORM: &str = "u_transform";

#[derive(Debug, Clone, Copy)]
struct SceneData {
    view_projection: Mat4,
}

/// Scene-level renderer: camera state plus submission of geometry.
pub struct Renderer {
    ctx: RenderContext,
    command: RenderCommand,
    scene: SceneData,
}

impl Renderer {
    pub fn new(ctx: &RenderContext) -> Result<Self, RenderError> {
        Ok(Self {
            ctx: ctx.clone(),
            command: RenderCommand::new(ctx)?,
            scene: SceneData {
                view_projection: Mat4::IDENTITY,
            },
        })
    }

    pub fn init(&self) {
        log::info!("renderer initialised ({})", self.ctx.api());
        self.command.init();
    }

    pub fn on_window_resize(&self, width: u32, height: u32) {
        self.command.set_viewport(0, 0, width, height);
    }

    pub fn context(&self) -> &RenderContext {
        &self.ctx
    }

    pub fn command(&self) -> &RenderCommand {
        &self.command
    }

    pub fn begin_scene(&mut self, camera: &OrthographicCamera) {
        self.scene.view_projection = camera.view_projection();
    }

    pub fn end_scene(&mut self) {}

    /// Binds `shader`, uploads the scene matrices and draws `vertex_array`.
    pub fn submit(
        &self,
        shader: &Shader,
        vertex_array: &VertexArray,
        transform: Mat4,
    ) -> Result<(), RenderError> {
        shader.bind();
        shader.set_mat4(VIEW_PROJECTION_UNIFORM, self.scene.view_projection);
        shader.set_mat4(TRANSFORM_UNIFORM, transform);
        self.command.draw_indexed(vertex_array)
    }

    pub fn set_clear_color(&self, color: Vec4) {
        self.command.set_clear_color(color);
    }

    pub fn clear(&self) {
        self.command.clear();
    }

    pub fn present(&self) {
        self.command.present();
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use glam::Vec3;

    use super::*;
    use crate::renderer::backend::HeadlessBackend;
    use crate::renderer::buffer::{BufferElement, BufferLayout, IndexBuffer, ShaderDataType, VertexBuffer};
    use crate::renderer::shader::UniformValue;

    const SHADER: &str = "#type vertex\n\
        @group(0) @binding(0) var<uniform> u_view_projection: mat4x4<f32>;\n\
        @group(0) @binding(1) var<uniform> u_transform: mat4x4<f32>;\n\
        @vertex fn vs(@location(0) p: vec3<f32>) -> @builtin(position) vec4<f32> {\n\
            return u_view_projection * u_transform * vec4<f32>(p, 1.0);\n\
        }\n\
        #type fragment\n\
        @group(0) @binding(2) var<uniform> u_color: vec4<f32>;\n\
        @fragment fn fs() -> @location(0) vec4<f32> { return u_color; }\n";

    fn setup() -> (Rc<HeadlessBackend>, Renderer, Shader, VertexArray) {
        let backend = Rc::new(HeadlessBackend::new());
        let ctx = RenderContext::with_backend(backend.clone());
        let renderer = Renderer::new(&ctx).unwrap();
        let shader = Shader::from_source(&ctx, "flat", SHADER).unwrap();

        let mut vb = VertexBuffer::create(&ctx, &[-0.5, -0.5, 0.0, 0.5, -0.5, 0.0, 0.0, 0.5, 0.0]).unwrap();
        vb.set_layout(BufferLayout::new([BufferElement::new(ShaderDataType::Float3, "a_position")]));
        let mut va = VertexArray::create(&ctx).unwrap();
        va.add_vertex_buffer(vb).unwrap();
        va.set_index_buffer(IndexBuffer::create(&ctx, &[0, 1, 2]).unwrap());

        (backend, renderer, shader, va)
    }

    #[test]
    fn submit_uploads_scene_uniforms_and_draws() {
        let (backend, mut renderer, shader, va) = setup();
        let mut camera = OrthographicCamera::new(-1.0, 1.0, -1.0, 1.0);
        camera.set_position(Vec3::new(0.25, 0.0, 0.0));
        let transform = Mat4::from_translation(Vec3::new(1.0, 0.0, 0.0));

        renderer.begin_scene(&camera);
        renderer.submit(&shader, &va, transform).unwrap();
        renderer.end_scene();

        let draws = backend.draws();
        assert_eq!(draws.len(), 1);
        assert_eq!(draws[0].index_count, 3);
        assert_eq!(draws[0].program, shader.id());
        assert_eq!(
            draws[0].uniforms[0],
            (VIEW_PROJECTION_UNIFORM.to_owned(), Some(UniformValue::Mat4(camera.view_projection())))
        );
        assert_eq!(
            draws[0].uniforms[1],
            (TRANSFORM_UNIFORM.to_owned(), Some(UniformValue::Mat4(transform)))
        );
    }

    #[test]
    fn draw_without_index_buffer_fails() {
        let (_backend, renderer, shader, _va) = setup();
        let va = VertexArray::create(renderer.context()).unwrap();
        let err = renderer.submit(&shader, &va, Mat4::IDENTITY).unwrap_err();
        assert!(matches!(err, RenderError::MissingIndexBuffer));
    }

    #[test]
    fn building_a_second_mesh_keeps_the_first_drawable() {
        let (backend, renderer, shader, square) = setup();
        let ctx = renderer.context().clone();
        let square_ib = square.index_buffer().map(IndexBuffer::id);

        let tri_ib = IndexBuffer::create(&ctx, &[0, 1, 2]).unwrap();
        let mut vb = VertexBuffer::create(&ctx, &[0.0; 9]).unwrap();
        vb.set_layout(BufferLayout::new([BufferElement::new(ShaderDataType::Float3, "a_position")]));
        let mut tri = VertexArray::create(&ctx).unwrap();
        tri.add_vertex_buffer(vb).unwrap();
        tri.set_index_buffer(tri_ib);

        assert_eq!(backend.index_buffer_of(square.id()), square_ib);
        renderer.submit(&shader, &square, Mat4::IDENTITY).unwrap();

        drop(tri);
        assert_eq!(backend.index_buffer_of(square.id()), square_ib);
        renderer.submit(&shader, &square, Mat4::IDENTITY).unwrap();
        assert_eq!(backend.draws().len(), 2);
        assert_eq!(backend.failed_draws(), 0);
    }

    #[test]
    fn frame_commands_are_logged() {
        let (backend, renderer, _shader, _va) = setup();
        renderer.init();
        renderer.on_window_resize(800, 600);
        renderer.set_clear_color(Vec4::new(0.1, 0.1, 0.1, 1.0));
        renderer.clear();
        renderer.present();

        let log = backend.frame_log();
        assert!(log.initialized);
        assert_eq!(log.viewport, (0, 0, 800, 600));
        assert_eq!((log.clears, log.frames_presented), (1, 1));
    }

    #[test]
    fn renderer_needs_a_backend() {
        assert!(matches!(
            Renderer::new(&RenderContext::null()),
            Err(RenderError::UnsupportedApi { .. })
        ));
    }
}
