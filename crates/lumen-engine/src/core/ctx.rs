use std::rc::Rc;

use winit::window::{Window, WindowId};

use crate::device::{Gpu, SurfaceErrorAction};

use super::app::AppControl;

/// Per-window handles and immutable window metadata.
pub struct WindowCtx<'a> {
    pub id: WindowId,
    pub window: &'a Window,
}

/// Per-frame context passed to [`App::on_frame`](super::App::on_frame).
pub struct FrameCtx<'a> {
    pub window: WindowCtx<'a>,
    pub gpu: &'a Rc<Gpu<'static>>,
    /// Frames delivered so far, starting at 0.
    pub frame_index: u64,
}

impl FrameCtx<'_> {
    /// Lets the GPU layer recover from a failed surface acquisition and tells
    /// the caller whether to keep running.
    pub fn recover_surface(&self, err: &wgpu::SurfaceError) -> AppControl {
        match self.gpu.handle_surface_error(err) {
            SurfaceErrorAction::Fatal => {
                log::error!("fatal surface error: {err}");
                AppControl::Exit
            }
            action => {
                log::debug!("surface error {err}: {action:?}");
                AppControl::Continue
            }
        }
    }
}
