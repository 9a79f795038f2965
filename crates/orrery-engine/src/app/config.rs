use crate::logging::LoggingConfig;
use crate::renderer::RendererApi;
use crate::renderer::backend::GpuInit;
use crate::window::WindowConfig;

/// Everything [`Application::new`](super::Application::new) needs to start.
#[derive(Debug, Clone)]
pub struct ApplicationConfig {
    pub title: String,
    /// Logical pixels.
    pub width: u32,
    pub height: u32,
    pub vsync: bool,
    pub renderer: RendererApi,
    /// Only read by the wgpu backend. `vsync` overrides its present mode.
    pub gpu: GpuInit,
    pub logging: LoggingConfig,
}

impl ApplicationConfig {
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn with_vsync(mut self, vsync: bool) -> Self {
        self.vsync = vsync;
        self
    }

    pub fn with_renderer(mut self, renderer: RendererApi) -> Self {
        self.renderer = renderer;
        self
    }

    pub fn with_gpu(mut self, gpu: GpuInit) -> Self {
        self.gpu = gpu;
        self
    }

    pub fn with_logging(mut self, logging: LoggingConfig) -> Self {
        self.logging = logging;
        self
    }

    pub fn window_config(&self) -> WindowConfig {
        WindowConfig {
            title: self.title.clone(),
            width: self.width,
            height: self.height,
            vsync: self.vsync,
        }
    }

    /// GPU parameters with the present mode derived from `vsync`.
    pub fn gpu_init(&self) -> GpuInit {
        self.gpu.clone().with_vsync(self.vsync)
    }
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        let window = WindowConfig::default();
        Self {
            title: window.title,
            width: window.width,
            height: window.height,
            vsync: window.vsync,
            renderer: RendererApi::default(),
            gpu: GpuInit::default(),
            logging: LoggingConfig::default(),
        }
    }
}
