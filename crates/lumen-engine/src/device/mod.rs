//! GPU device + surface acquisition.
//!
//! This module is responsible for:
//! - creating the wgpu Instance/Adapter/Device/Queue
//! - creating & configuring the Surface
//! - implementing [`RenderDevice`](crate::render::RenderDevice) on top of them

mod error;
mod gpu;
mod init;
mod surface;

pub use error::{AcquisitionError, SurfaceErrorAction};
pub use gpu::Gpu;
pub use init::GpuInit;
