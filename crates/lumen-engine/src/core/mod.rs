//! Contract between the window runtime and the application driving it.
//!
//! The runtime owns the event loop, the window and the GPU. The application
//! sees them only through [`App`] callbacks and the per-frame [`FrameCtx`].

mod app;
mod ctx;

pub use app::{App, AppControl};
pub use ctx::{FrameCtx, WindowCtx};
