//! Scene compiler host.
//!
//! An external reconciliation engine drives this module through
//! [`HostConfig`]. Element creation builds an [`Instance`] tree, child
//! attachment allocates GPU resources on the owning mesh, and each
//! `commit_mount` turns a mesh's accumulated state into one pipeline and one
//! submitted draw.
//!
//! ```text
//! create_instance ──► Instance tree
//! append_*child   ──► attach  (buffers, shader modules)
//! commit_mount    ──► commit  (pipeline, render pass, present)
//! ```
//!
//! [`mount`] stands in for the engine's initial mount when the scene comes
//! from a markup document.

mod attach;
mod commit;
pub mod descriptor;
mod error;
mod instance;
mod mount;
mod props;
mod protocol;

pub use error::HostError;
pub use instance::{
    ElementKind, Instance, MeshInstance, ShadersInstance, VertexBufferBinding, VertexBufferInstance,
};
pub use mount::{mount, MountedNode, MountedScene};
pub use protocol::{GpuHost, HostConfig};

/// How a mesh's vertex buffers are bound at draw time.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub enum VertexBinding {
    /// Bind only the first attached buffer, at slot 0.
    #[default]
    FirstSlot,
    /// Bind every attached buffer at its attach index.
    AllSlots,
}

/// Per-root compiler options.
#[derive(Debug, Clone)]
pub struct HostOptions {
    /// Color the surface is cleared to before each mesh draw.
    pub clear_color: wgpu::Color,
    /// WGSL vertex entry point, `vertex_main` by default.
    pub vertex_entry: String,
    /// WGSL fragment entry point, `fragment_main` by default.
    pub fragment_entry: String,
    /// Which attached buffers the pipeline declares and the pass binds.
    pub vertex_binding: VertexBinding,
}

impl Default for HostOptions {
    fn default() -> Self {
        Self {
            clear_color: wgpu::Color { r: 0.0, g: 0.5, b: 1.0, a: 1.0 },
            vertex_entry: "vertex_main".to_string(),
            fragment_entry: "fragment_main".to_string(),
            vertex_binding: VertexBinding::default(),
        }
    }
}
