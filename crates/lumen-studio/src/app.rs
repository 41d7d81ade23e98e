use std::rc::Rc;

use anyhow::Context;

use lumen_engine::core::{App, AppControl, FrameCtx};
use lumen_engine::device::Gpu;
use lumen_engine::host::{mount, GpuHost, HostError, HostOptions, Instance, MountedScene};
use lumen_markup::SceneDocument;

type Device = Gpu<'static>;

/// Mounts one scene when the GPU comes up and recommits it every frame.
pub struct StudioApp {
    name: String,
    doc: SceneDocument,
    options: HostOptions,
    mounted: Option<(GpuHost<Device>, MountedScene<Instance<Device>>)>,
    // Repeated per-frame failures are logged once.
    last_error: Option<String>,
}

impl StudioApp {
    pub fn new(name: String, doc: SceneDocument, options: HostOptions) -> Self {
        Self { name, doc, options, mounted: None, last_error: None }
    }

    fn report(&mut self, err: &HostError) {
        let msg = err.to_string();
        if self.last_error.as_deref() != Some(msg.as_str()) {
            log::error!("{}: commit failed: {msg}", self.name);
            self.last_error = Some(msg);
        }
    }
}

impl App for StudioApp {
    fn on_gpu_ready(&mut self, gpu: &Rc<Device>) -> anyhow::Result<()> {
        let info = gpu.adapter_info();
        let span = tracing::info_span!("scene", scene = %self.name, adapter = %info.name);
        let host = GpuHost::new(gpu.clone(), self.options.clone(), span);

        let scene = mount(&host, gpu, &self.doc).with_context(|| format!("failed to mount {}", self.name))?;
        log::info!("{}: {} instance(s) mounted", self.name, scene.len());

        self.mounted = Some((host, scene));
        Ok(())
    }

    fn on_frame(&mut self, ctx: &mut FrameCtx<'_>) -> AppControl {
        let Some((host, scene)) = &self.mounted else {
            return AppControl::Continue;
        };

        match scene.recommit(host, ctx.gpu) {
            Ok(()) => {
                self.last_error = None;
                AppControl::Continue
            }
            Err(HostError::Surface(err)) => ctx.recover_surface(&err),
            Err(err) => {
                self.report(&err);
                AppControl::Continue
            }
        }
    }
}
