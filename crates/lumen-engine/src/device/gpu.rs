use std::cell::{Cell, RefCell};
use std::sync::Arc;

use winit::dpi::PhysicalSize;

use super::{surface, AcquisitionError, GpuInit, SurfaceErrorAction};
use crate::render::{PassCmd, PassDesc, PipelineDesc, RenderDevice};

// Replaces wgpu's default handler, which panics.
fn log_device_error(err: wgpu::Error) {
    match &err {
        wgpu::Error::OutOfMemory { .. } => log::error!("gpu out of memory: {err}"),
        wgpu::Error::Validation { description, .. } => log::error!("gpu validation error: {description}"),
        wgpu::Error::Internal { description, .. } => log::error!("gpu internal error: {description}"),
    }
}

/// Owns wgpu core objects and the surface configuration.
///
/// This is the `{device, surface}` pair a scene root shares with all its
/// instances:
/// - creates and stores Adapter/Device/Queue
/// - creates and configures the Surface (swapchain)
/// - acquires the current texture, records one pass and presents it
///
/// Resizing only needs `&self` so the context can sit behind an `Rc`.
pub struct Gpu<'w> {
    /// Surface bound to the window.
    surface: wgpu::Surface<'w>,

    /// Selected adapter.
    adapter: wgpu::Adapter,

    /// Logical device.
    device: wgpu::Device,

    /// Command queue.
    queue: wgpu::Queue,

    /// Active surface configuration.
    config: RefCell<wgpu::SurfaceConfiguration>,

    /// Current drawable size in physical pixels.
    size: Cell<PhysicalSize<u32>>,
}

impl<'w> Gpu<'w> {
    /// Requests an adapter and device for `target` and configures its surface.
    ///
    /// Adapter/device acquisition is asynchronous under wgpu.
    pub async fn new(
        target: impl Into<wgpu::SurfaceTarget<'w>>,
        size: PhysicalSize<u32>,
        init: GpuInit,
    ) -> Result<Self, AcquisitionError> {
        if size.width == 0 || size.height == 0 {
            return Err(AcquisitionError::ZeroSize);
        }

        let GpuInit {
            prefer_srgb,
            present_mode,
            alpha_mode,
            required_features,
            required_limits,
            desired_maximum_frame_latency,
        } = init;

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let surface = instance.create_surface(target)?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await?;

        let info = adapter.get_info();
        log::info!("using adapter {:?} ({:?})", info.name, info.backend);

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("lumen device"),
                required_features,
                required_limits,
                experimental_features: wgpu::ExperimentalFeatures::disabled(),
                memory_hints: wgpu::MemoryHints::Performance,
                trace: wgpu::Trace::Off,
            })
            .await?;
        device.on_uncaptured_error(Arc::new(log_device_error));

        let caps = surface.get_capabilities(&adapter);
        let format = surface::choose_surface_format(&caps.formats, prefer_srgb)
            .ok_or(AcquisitionError::NoSurfaceFormat)?;
        let alpha_mode = surface::choose_alpha_mode(&caps.alpha_modes, alpha_mode);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.width,
            height: size.height,
            present_mode,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency,
        };

        surface.configure(&device, &config);
        log::debug!("surface configured: {format:?}, {alpha_mode:?}, {}x{}", size.width, size.height);

        Ok(Self {
            surface,
            adapter,
            device,
            queue,
            config: RefCell::new(config),
            size: Cell::new(size),
        })
    }

    /// Returns information about the selected adapter.
    pub fn adapter_info(&self) -> wgpu::AdapterInfo {
        self.adapter.get_info()
    }

    /// Returns the current drawable size (physical pixels).
    pub fn size(&self) -> PhysicalSize<u32> {
        self.size.get()
    }

    /// Reconfigures the surface after a resize.
    ///
    /// A 0x0 size only updates internal state; configuration is deferred.
    pub fn resize(&self, new_size: PhysicalSize<u32>) {
        self.size.set(new_size);
        let mut config = self.config.borrow_mut();
        if surface::apply_resize(&mut config, new_size) {
            self.surface.configure(&self.device, &config);
        }
    }

    /// Converts a `SurfaceError` into a higher-level action, reconfiguring the
    /// surface when it was lost or outdated.
    pub fn handle_surface_error(&self, err: &wgpu::SurfaceError) -> SurfaceErrorAction {
        let action = surface::map_surface_error(err);
        let size = self.size.get();
        if action == SurfaceErrorAction::Reconfigured && size.width > 0 && size.height > 0 {
            self.surface.configure(&self.device, &self.config.borrow());
        }
        action
    }
}

impl RenderDevice for Gpu<'_> {
    type Buffer = wgpu::Buffer;
    type ShaderModule = wgpu::ShaderModule;
    type Pipeline = wgpu::RenderPipeline;

    fn surface_format(&self) -> wgpu::TextureFormat {
        self.config.borrow().format
    }

    fn create_vertex_buffer(&self, label: &str, contents: &[u8]) -> wgpu::Buffer {
        let buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size: contents.len() as u64,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        self.queue.write_buffer(&buffer, 0, contents);
        buffer
    }

    fn create_shader_module(&self, label: &str, code: &str) -> wgpu::ShaderModule {
        self.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(label),
            source: wgpu::ShaderSource::Wgsl(code.into()),
        })
    }

    fn create_render_pipeline(&self, desc: &PipelineDesc<'_, wgpu::ShaderModule>) -> wgpu::RenderPipeline {
        let buffers: Vec<wgpu::VertexBufferLayout<'_>> =
            desc.vertex_layouts.iter().map(|l| l.as_wgpu()).collect();

        self.device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(desc.label),
            // Derived from the shader's declared bindings.
            layout: None,

            vertex: wgpu::VertexState {
                module: desc.module,
                entry_point: Some(desc.vertex_entry),
                compilation_options: Default::default(),
                buffers: &buffers,
            },

            fragment: Some(wgpu::FragmentState {
                module: desc.module,
                entry_point: Some(desc.fragment_entry),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: desc.target_format,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),

            primitive: wgpu::PrimitiveState {
                topology: desc.topology,
                ..Default::default()
            },

            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        })
    }

    fn submit_pass(
        &self,
        pass: &PassDesc<'_>,
        commands: &[PassCmd<'_, wgpu::RenderPipeline, wgpu::Buffer>],
    ) -> Result<(), wgpu::SurfaceError> {
        let surface_texture = self.surface.get_current_texture()?;
        let view = surface_texture
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("lumen frame encoder"),
            });

        // Pass borrows the encoder; dropped (ended) before finish().
        {
            let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some(pass.label),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(pass.clear),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });

            for cmd in commands {
                match cmd {
                    PassCmd::SetPipeline(pipeline) => rpass.set_pipeline(pipeline),
                    PassCmd::SetVertexBuffer { slot, buffer } => {
                        // Zero-sized buffers cannot be sliced.
                        if buffer.size() == 0 {
                            log::warn!("skipping empty vertex buffer at slot {slot}");
                            continue;
                        }
                        rpass.set_vertex_buffer(*slot, buffer.slice(..));
                    }
                    PassCmd::Draw { vertices, instances } => {
                        rpass.draw(vertices.clone(), instances.clone());
                    }
                }
            }
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        surface_texture.present();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn device_errors_are_logged_not_raised() {
        log_device_error(wgpu::Error::Validation {
            source: Box::new(std::fmt::Error),
            description: "invalid WGSL: unknown entry point".to_string(),
        });
        log_device_error(wgpu::Error::OutOfMemory { source: Box::new(std::fmt::Error) });
    }
}
