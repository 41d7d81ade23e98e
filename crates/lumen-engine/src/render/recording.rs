//! Headless render device.
//!
//! Performs no GPU work. Every call is appended to an event log so callers
//! can inspect exactly what the compiler asked for: buffers, modules,
//! pipelines, passes and submissions. Used by `lumen-studio --headless` and
//! by the engine's tests.

use std::cell::{Cell, RefCell};
use std::ops::Range;

use super::{PassCmd, PassDesc, PipelineDesc, RenderDevice, VertexLayout};

#[derive(Debug)]
pub struct RecordedBuffer {
    pub id: usize,
    pub bytes: Vec<u8>,
}

#[derive(Debug)]
pub struct RecordedShader {
    pub id: usize,
    pub code: String,
}

#[derive(Debug)]
pub struct RecordedPipeline {
    pub id: usize,
}

/// A pass command with handles replaced by their ids.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedCmd {
    SetPipeline(usize),
    SetVertexBuffer { slot: u32, buffer: usize },
    Draw { vertices: Range<u32>, instances: Range<u32> },
}

#[derive(Debug, Clone, PartialEq)]
pub enum GpuEvent {
    CreateBuffer {
        id: usize,
        label: String,
        size: u64,
        usage: wgpu::BufferUsages,
    },
    WriteBuffer {
        id: usize,
        offset: u64,
        len: usize,
    },
    CreateShaderModule {
        id: usize,
        label: String,
        code: String,
    },
    CreateRenderPipeline {
        id: usize,
        shader: usize,
        vertex_entry: String,
        fragment_entry: String,
        vertex_layouts: Vec<VertexLayout>,
        target_format: wgpu::TextureFormat,
        topology: wgpu::PrimitiveTopology,
    },
    AcquireFailed,
    RenderPass {
        label: String,
        color_attachments: usize,
        clear: wgpu::Color,
        commands: Vec<RecordedCmd>,
    },
    Submit,
    Present,
}

/// Recording implementation of [`RenderDevice`].
#[derive(Debug)]
pub struct RecordingDevice {
    surface_format: wgpu::TextureFormat,
    next_id: Cell<usize>,
    fail_next_acquire: Cell<bool>,
    events: RefCell<Vec<GpuEvent>>,
}

impl Default for RecordingDevice {
    fn default() -> Self {
        Self::new(wgpu::TextureFormat::Bgra8UnormSrgb)
    }
}

impl RecordingDevice {
    pub fn new(surface_format: wgpu::TextureFormat) -> Self {
        Self {
            surface_format,
            next_id: Cell::new(0),
            fail_next_acquire: Cell::new(false),
            events: RefCell::new(Vec::new()),
        }
    }

    /// Makes the next `submit_pass` fail as if the surface had been lost.
    pub fn fail_next_acquire(&self) {
        self.fail_next_acquire.set(true);
    }

    /// Snapshot of everything recorded so far.
    pub fn events(&self) -> Vec<GpuEvent> {
        self.events.borrow().clone()
    }

    /// Drains the event log.
    pub fn take_events(&self) -> Vec<GpuEvent> {
        std::mem::take(&mut *self.events.borrow_mut())
    }

    pub fn pipeline_count(&self) -> usize {
        self.count(|e| matches!(e, GpuEvent::CreateRenderPipeline { .. }))
    }

    pub fn submit_count(&self) -> usize {
        self.count(|e| matches!(e, GpuEvent::Submit))
    }

    /// Vertex ranges of every draw recorded across all passes, in order.
    pub fn draws(&self) -> Vec<(Range<u32>, Range<u32>)> {
        self.events
            .borrow()
            .iter()
            .filter_map(|e| match e {
                GpuEvent::RenderPass { commands, .. } => Some(commands),
                _ => None,
            })
            .flatten()
            .filter_map(|c| match c {
                RecordedCmd::Draw { vertices, instances } => Some((vertices.clone(), instances.clone())),
                _ => None,
            })
            .collect()
    }

    fn count(&self, pred: impl Fn(&GpuEvent) -> bool) -> usize {
        self.events.borrow().iter().filter(|e| pred(e)).count()
    }

    fn alloc_id(&self) -> usize {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        id
    }

    fn push(&self, event: GpuEvent) {
        log::trace!("RecordingDevice: {event:?}");
        self.events.borrow_mut().push(event);
    }
}

impl RenderDevice for RecordingDevice {
    type Buffer = RecordedBuffer;
    type ShaderModule = RecordedShader;
    type Pipeline = RecordedPipeline;

    fn surface_format(&self) -> wgpu::TextureFormat {
        self.surface_format
    }

    fn create_vertex_buffer(&self, label: &str, contents: &[u8]) -> RecordedBuffer {
        let id = self.alloc_id();
        self.push(GpuEvent::CreateBuffer {
            id,
            label: label.to_string(),
            size: contents.len() as u64,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        });
        self.push(GpuEvent::WriteBuffer { id, offset: 0, len: contents.len() });
        RecordedBuffer { id, bytes: contents.to_vec() }
    }

    fn create_shader_module(&self, label: &str, code: &str) -> RecordedShader {
        let id = self.alloc_id();
        self.push(GpuEvent::CreateShaderModule {
            id,
            label: label.to_string(),
            code: code.to_string(),
        });
        RecordedShader { id, code: code.to_string() }
    }

    fn create_render_pipeline(&self, desc: &PipelineDesc<'_, RecordedShader>) -> RecordedPipeline {
        let id = self.alloc_id();
        self.push(GpuEvent::CreateRenderPipeline {
            id,
            shader: desc.module.id,
            vertex_entry: desc.vertex_entry.to_string(),
            fragment_entry: desc.fragment_entry.to_string(),
            vertex_layouts: desc.vertex_layouts.iter().map(|l| (*l).clone()).collect(),
            target_format: desc.target_format,
            topology: desc.topology,
        });
        RecordedPipeline { id }
    }

    fn submit_pass(
        &self,
        pass: &PassDesc<'_>,
        commands: &[PassCmd<'_, RecordedPipeline, RecordedBuffer>],
    ) -> Result<(), wgpu::SurfaceError> {
        if self.fail_next_acquire.replace(false) {
            self.push(GpuEvent::AcquireFailed);
            return Err(wgpu::SurfaceError::Lost);
        }

        let commands = commands
            .iter()
            .map(|c| match c {
                PassCmd::SetPipeline(p) => RecordedCmd::SetPipeline(p.id),
                PassCmd::SetVertexBuffer { slot, buffer } => {
                    RecordedCmd::SetVertexBuffer { slot: *slot, buffer: buffer.id }
                }
                PassCmd::Draw { vertices, instances } => RecordedCmd::Draw {
                    vertices: vertices.clone(),
                    instances: instances.clone(),
                },
            })
            .collect();

        self.push(GpuEvent::RenderPass {
            label: pass.label.to_string(),
            color_attachments: 1,
            clear: pass.clear,
            commands,
        });
        self.push(GpuEvent::Submit);
        self.push(GpuEvent::Present);
        Ok(())
    }
}
