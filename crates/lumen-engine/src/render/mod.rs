//! Render-device seam.
//!
//! The scene compiler never talks to wgpu directly. It goes through
//! [`RenderDevice`], the `{device, surface}` pair shared by every instance
//! under one root:
//! - resource creation (vertex buffers, shader modules, pipelines)
//! - one-pass submission against the surface's current texture
//!
//! `device::Gpu` is the wgpu implementation; [`recording::RecordingDevice`]
//! records the same calls without a GPU.

use std::fmt;
use std::ops::Range;

pub mod recording;

// ── vertex layout ─────────────────────────────────────────────────────────

/// Owned vertex-buffer layout: attributes, stride and step mode.
#[derive(Debug, Clone, PartialEq)]
pub struct VertexLayout {
    pub attributes: Vec<wgpu::VertexAttribute>,
    pub array_stride: u64,
    pub step_mode: wgpu::VertexStepMode,
}

impl VertexLayout {
    pub fn new(array_stride: u64, step_mode: wgpu::VertexStepMode) -> Self {
        Self { attributes: Vec::new(), array_stride, step_mode }
    }

    pub fn with_attribute(
        mut self,
        shader_location: u32,
        offset: u64,
        format: wgpu::VertexFormat,
    ) -> Self {
        self.attributes.push(wgpu::VertexAttribute { format, offset, shader_location });
        self
    }

    /// Borrowed wgpu view of this layout.
    pub fn as_wgpu(&self) -> wgpu::VertexBufferLayout<'_> {
        wgpu::VertexBufferLayout {
            array_stride: self.array_stride,
            step_mode: self.step_mode,
            attributes: &self.attributes,
        }
    }
}

// ── pipeline / pass descriptions ──────────────────────────────────────────

/// Everything needed to build a render pipeline for one mesh.
///
/// The pipeline layout is always derived from the shader's declared bindings.
pub struct PipelineDesc<'a, M> {
    pub label: &'a str,
    pub module: &'a M,
    pub vertex_entry: &'a str,
    pub fragment_entry: &'a str,
    /// One layout per vertex-buffer slot, in slot order.
    pub vertex_layouts: &'a [&'a VertexLayout],
    /// Format of the single color target.
    pub target_format: wgpu::TextureFormat,
    pub topology: wgpu::PrimitiveTopology,
}

/// A render pass with a single color attachment on the surface's current
/// texture, cleared on load and stored on end.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PassDesc<'a> {
    pub label: &'a str,
    pub clear: wgpu::Color,
}

/// Command recorded into a pass, replayed in order by the device.
pub enum PassCmd<'a, P, B> {
    SetPipeline(&'a P),
    SetVertexBuffer { slot: u32, buffer: &'a B },
    Draw { vertices: Range<u32>, instances: Range<u32> },
}

// ── RenderDevice ──────────────────────────────────────────────────────────

/// The device/surface pair as seen by the scene compiler.
///
/// Resource creation is fire-and-forget. Validation problems go to the
/// device's own error channel (for [`Gpu`](crate::device::Gpu), a handler
/// that logs them), not returned here. Only surface texture acquisition can
/// fail synchronously.
pub trait RenderDevice {
    type Buffer: fmt::Debug;
    type ShaderModule: fmt::Debug;
    type Pipeline: fmt::Debug;

    /// Preferred presentation format the surface was configured with.
    fn surface_format(&self) -> wgpu::TextureFormat;

    /// Creates a `VERTEX | COPY_DST` buffer of `contents.len()` bytes and
    /// queues a write of `contents` into it.
    fn create_vertex_buffer(&self, label: &str, contents: &[u8]) -> Self::Buffer;

    /// Compiles a WGSL module.
    fn create_shader_module(&self, label: &str, code: &str) -> Self::ShaderModule;

    fn create_render_pipeline(&self, desc: &PipelineDesc<'_, Self::ShaderModule>) -> Self::Pipeline;

    /// Acquires the current surface texture, records `commands` into one pass,
    /// submits it to the queue and presents.
    ///
    /// If acquisition fails nothing is recorded or submitted.
    fn submit_pass(
        &self,
        pass: &PassDesc<'_>,
        commands: &[PassCmd<'_, Self::Pipeline, Self::Buffer>],
    ) -> Result<(), wgpu::SurfaceError>;
}
