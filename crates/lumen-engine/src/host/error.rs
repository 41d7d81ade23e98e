use super::ElementKind;

/// Errors raised by the mutation protocol.
///
/// All of them are synchronous and fatal for the call that raised them;
/// nothing is retried.
#[derive(Debug, thiserror::Error)]
pub enum HostError {
    /// Creation requested for a tag outside the closed element set, or a text node.
    #[error("unsupported element kind {0:?}")]
    UnsupportedElementKind(String),

    #[error("unsupported child kind {child} for parent kind {parent}")]
    UnsupportedAttachment { parent: ElementKind, child: ElementKind },

    /// Commit attempted on a mesh with no shader module attached.
    #[error("mesh must have shaders")]
    IncompleteMesh,

    /// Commit attempted on a mesh with no vertex buffer to draw from.
    #[error("mesh must have a vertex buffer")]
    MeshWithoutVertices,

    #[error("invalid prop `{prop}` on {kind}: {reason}")]
    InvalidProp {
        kind: ElementKind,
        prop: &'static str,
        reason: String,
    },

    /// The surface's current texture could not be acquired; nothing was submitted.
    #[error("failed to acquire surface texture: {0}")]
    Surface(#[from] wgpu::SurfaceError),
}
