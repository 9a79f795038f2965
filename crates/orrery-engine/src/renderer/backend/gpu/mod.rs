//! wgpu backend: device/surface management plus the GL-style facade.

mod backend;
mod context;
mod init;
mod pipeline;
mod surface;

pub use backend::WgpuBackend;
pub use context::{Gpu, GpuFrame};
pub use init::GpuInit;
pub use surface::SurfaceErrorAction;
