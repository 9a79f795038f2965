use std::path::PathBuf;
use std::rc::Rc;

use anyhow::{Context, Result};
use glam::{Mat4, Vec3, Vec4};
use orrery_engine::app::DebugPanel;
use orrery_engine::events::{Event, EventDispatcher};
use orrery_engine::input::Key;
use orrery_engine::layer::{Layer, LayerCtx};
use orrery_engine::renderer::{
    BufferElement, BufferLayout, IndexBuffer, OrthographicCamera, RenderContext, Shader,
    ShaderDataType, ShaderLibrary, VertexArray, VertexBuffer,
};
use orrery_engine::time::Timestep;

const MOVE_SPEED: f32 = 2.0;
const ROTATION_SPEED: f32 = 90.0;
const MIN_ZOOM: f32 = 0.25;
const MAX_ZOOM: f32 = 10.0;

const GRID: i32 = 10;
const CELL: f32 = 0.11;

fn shader_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("assets/shaders")
}

/// Camera-driven demo scene: a grid of flat squares and a vertex-coloured
/// triangle.
pub struct SandboxLayer {
    camera: OrthographicCamera,
    camera_position: Vec3,
    camera_rotation: f32,
    zoom: f32,
    aspect: f32,

    flat_color: Rc<Shader>,
    vertex_color: Rc<Shader>,
    square: VertexArray,
    triangle: VertexArray,
    square_color: Vec4,
}

impl SandboxLayer {
    pub fn new(ctx: &RenderContext, (width, height): (u32, u32)) -> Result<Self> {
        let mut library = ShaderLibrary::new();
        let dir = shader_dir();
        let flat_color = library
            .load(ctx, dir.join("flat_color.wgsl"))
            .context("failed to load the flat colour shader")?;
        let vertex_color = library
            .load(ctx, dir.join("vertex_color.wgsl"))
            .context("failed to load the vertex colour shader")?;

        let aspect = aspect_ratio(width, height);
        let zoom = 1.0;
        Ok(Self {
            camera: OrthographicCamera::new(-aspect * zoom, aspect * zoom, -zoom, zoom),
            camera_position: Vec3::ZERO,
            camera_rotation: 0.0,
            zoom,
            aspect,
            flat_color,
            vertex_color,
            square: square(ctx)?,
            triangle: triangle(ctx)?,
            square_color: Vec4::new(0.2, 0.3, 0.8, 1.0),
        })
    }

    fn update_projection(&mut self) {
        let (aspect, zoom) = (self.aspect, self.zoom);
        self.camera.set_projection(-aspect * zoom, aspect * zoom, -zoom, zoom);
    }

    fn move_camera(&mut self, ctx: &LayerCtx<'_>, dt: f32) {
        let input = ctx.input;
        let step = MOVE_SPEED * self.zoom * dt;

        if input.is_key_pressed(Key::A) || input.is_key_pressed(Key::ArrowLeft) {
            self.camera_position.x -= step;
        }
        if input.is_key_pressed(Key::D) || input.is_key_pressed(Key::ArrowRight) {
            self.camera_position.x += step;
        }
        if input.is_key_pressed(Key::W) || input.is_key_pressed(Key::ArrowUp) {
            self.camera_position.y += step;
        }
        if input.is_key_pressed(Key::S) || input.is_key_pressed(Key::ArrowDown) {
            self.camera_position.y -= step;
        }
        if input.is_key_pressed(Key::Q) {
            self.camera_rotation += ROTATION_SPEED * dt;
        }
        if input.is_key_pressed(Key::E) {
            self.camera_rotation -= ROTATION_SPEED * dt;
        }

        self.camera.set_position(self.camera_position);
        self.camera.set_rotation(self.camera_rotation);
    }
}

impl Layer for SandboxLayer {
    fn name(&self) -> &str {
        "Sandbox"
    }

    fn on_attach(&mut self, ctx: &mut LayerCtx<'_>) -> Result<()> {
        log::info!("sandbox attached ({})", ctx.render_context().api());
        Ok(())
    }

    fn on_update(&mut self, ctx: &mut LayerCtx<'_>, ts: Timestep) -> Result<()> {
        self.move_camera(ctx, ts.seconds());

        let renderer = &mut *ctx.renderer;
        renderer.set_clear_color(Vec4::new(0.1, 0.1, 0.1, 1.0));
        renderer.clear();

        renderer.begin_scene(&self.camera);

        let scale = Mat4::from_scale(Vec3::splat(0.1));
        self.flat_color.bind();
        self.flat_color.set_float4("u_color", self.square_color);
        for y in 0..GRID {
            for x in 0..GRID {
                let position = Vec3::new(x as f32 * CELL, y as f32 * CELL, 0.0);
                let transform = Mat4::from_translation(position) * scale;
                renderer.submit(&self.flat_color, &self.square, transform)?;
            }
        }

        renderer.submit(&self.vertex_color, &self.triangle, Mat4::IDENTITY)?;

        renderer.end_scene();
        Ok(())
    }

    fn on_debug_render(&mut self, panel: &mut DebugPanel) {
        panel.section("Camera");
        panel.entry(
            "position",
            format_args!("({:.2}, {:.2})", self.camera_position.x, self.camera_position.y),
        );
        panel.entry("rotation", format_args!("{:.1} deg", self.camera_rotation));
        panel.entry("zoom", format_args!("{:.2}", self.zoom));
    }

    fn on_event(&mut self, _ctx: &mut LayerCtx<'_>, event: &mut Event) {
        let mut dispatcher = EventDispatcher::new(event);

        dispatcher.on_mouse_scrolled(|_, y_offset| {
            self.zoom = (self.zoom - y_offset * 0.25).clamp(MIN_ZOOM, MAX_ZOOM);
            self.update_projection();
            true
        });

        dispatcher.on_window_resize(|width, height| {
            if width > 0 && height > 0 {
                self.aspect = aspect_ratio(width, height);
                self.update_projection();
            }
            false
        });
    }
}

fn aspect_ratio(width: u32, height: u32) -> f32 {
    if height == 0 {
        1.0
    } else {
        width as f32 / height as f32
    }
}

fn square(ctx: &RenderContext) -> Result<VertexArray> {
    #[rustfmt::skip]
    let vertices = [
        -0.5, -0.5, 0.0,
         0.5, -0.5, 0.0,
         0.5,  0.5, 0.0,
        -0.5,  0.5, 0.0,
    ];
    let mut vb = VertexBuffer::create(ctx, &vertices)?;
    vb.set_layout(BufferLayout::new([BufferElement::new(
        ShaderDataType::Float3,
        "a_position",
    )]));

    let mut va = VertexArray::create(ctx)?;
    va.add_vertex_buffer(vb)?;
    va.set_index_buffer(IndexBuffer::create(ctx, &[0, 1, 2, 2, 3, 0])?);
    Ok(va)
}

fn triangle(ctx: &RenderContext) -> Result<VertexArray> {
    #[rustfmt::skip]
    let vertices = [
        -0.5, -0.5, 0.0,  0.8, 0.2, 0.8, 1.0,
         0.5, -0.5, 0.0,  0.2, 0.3, 0.8, 1.0,
         0.0,  0.5, 0.0,  0.8, 0.8, 0.2, 1.0,
    ];
    let mut vb = VertexBuffer::create(ctx, &vertices)?;
    vb.set_layout(BufferLayout::new([
        BufferElement::new(ShaderDataType::Float3, "a_position"),
        BufferElement::new(ShaderDataType::Float4, "a_color"),
    ]));

    let mut va = VertexArray::create(ctx)?;
    va.add_vertex_buffer(vb)?;
    va.set_index_buffer(IndexBuffer::create(ctx, &[0, 1, 2])?);
    Ok(va)
}
