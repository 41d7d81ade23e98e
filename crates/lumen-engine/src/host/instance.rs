use std::fmt;
use std::rc::Rc;
use std::str::FromStr;

use lumen_markup::Props;

use super::descriptor::{ShaderDescriptor, VertexBufferDescriptor, VertexLayout};
use super::HostError;
use crate::render::RenderDevice;

// ── ElementKind ───────────────────────────────────────────────────────────

/// Closed set of element kinds the compiler understands.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum ElementKind {
    Mesh,
    VertexBuffer,
    Shaders,
}

impl ElementKind {
    pub const ALL: [ElementKind; 3] = [Self::Mesh, Self::VertexBuffer, Self::Shaders];

    /// Tag as written in a scene.
    pub const fn tag(self) -> &'static str {
        match self {
            Self::Mesh => "mesh",
            Self::VertexBuffer => "vertexBuffer",
            Self::Shaders => "shaders",
        }
    }
}

impl FromStr for ElementKind {
    type Err = HostError;

    fn from_str(tag: &str) -> Result<Self, HostError> {
        Self::ALL
            .into_iter()
            .find(|k| k.tag() == tag)
            .ok_or_else(|| HostError::UnsupportedElementKind(tag.to_string()))
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

// ── Instance ──────────────────────────────────────────────────────────────

/// GPU buffer allocated for a `vertexBuffer` child, owned by its mesh.
pub struct VertexBufferBinding<D: RenderDevice> {
    pub buffer: D::Buffer,
    pub layout: VertexLayout,
    pub vertex_count: u32,
}

/// Accumulates the resources its children allocate at attach time.
pub struct MeshInstance<D: RenderDevice> {
    ctx: Rc<D>,
    pub(super) vertex_buffers: Vec<VertexBufferBinding<D>>,
    pub(super) shader_module: Option<D::ShaderModule>,
}

impl<D: RenderDevice> MeshInstance<D> {
    pub fn context(&self) -> &Rc<D> {
        &self.ctx
    }

    /// Bindings in attach order.
    pub fn vertex_buffers(&self) -> &[VertexBufferBinding<D>] {
        &self.vertex_buffers
    }

    pub fn shader_module(&self) -> Option<&D::ShaderModule> {
        self.shader_module.as_ref()
    }
}

pub struct VertexBufferInstance<D: RenderDevice> {
    ctx: Rc<D>,
    descriptor: VertexBufferDescriptor,
}

impl<D: RenderDevice> VertexBufferInstance<D> {
    pub fn context(&self) -> &Rc<D> {
        &self.ctx
    }

    pub fn descriptor(&self) -> &VertexBufferDescriptor {
        &self.descriptor
    }
}

pub struct ShadersInstance<D: RenderDevice> {
    ctx: Rc<D>,
    descriptor: ShaderDescriptor,
}

impl<D: RenderDevice> ShadersInstance<D> {
    pub fn context(&self) -> &Rc<D> {
        &self.ctx
    }

    pub fn descriptor(&self) -> &ShaderDescriptor {
        &self.descriptor
    }
}

/// A node of the compiler's instance tree.
///
/// Every variant holds the root's device context, fixed at creation.
pub enum Instance<D: RenderDevice> {
    Mesh(MeshInstance<D>),
    VertexBuffer(VertexBufferInstance<D>),
    Shaders(ShadersInstance<D>),
}

impl<D: RenderDevice> Instance<D> {
    /// Builds the variant for `kind`, extracting its descriptor from `props`.
    pub fn create(kind: ElementKind, props: &Props, ctx: Rc<D>) -> Result<Self, HostError> {
        Ok(match kind {
            ElementKind::Mesh => Self::mesh(ctx),
            ElementKind::VertexBuffer => {
                Self::vertex_buffer(ctx, VertexBufferDescriptor::from_props(props)?)
            }
            ElementKind::Shaders => Self::shaders(ctx, ShaderDescriptor::from_props(props)?),
        })
    }

    pub fn mesh(ctx: Rc<D>) -> Self {
        Self::Mesh(MeshInstance { ctx, vertex_buffers: Vec::new(), shader_module: None })
    }

    pub fn vertex_buffer(ctx: Rc<D>, descriptor: VertexBufferDescriptor) -> Self {
        Self::VertexBuffer(VertexBufferInstance { ctx, descriptor })
    }

    pub fn shaders(ctx: Rc<D>, descriptor: ShaderDescriptor) -> Self {
        Self::Shaders(ShadersInstance { ctx, descriptor })
    }

    pub fn kind(&self) -> ElementKind {
        match self {
            Self::Mesh(_) => ElementKind::Mesh,
            Self::VertexBuffer(_) => ElementKind::VertexBuffer,
            Self::Shaders(_) => ElementKind::Shaders,
        }
    }

    pub fn context(&self) -> &Rc<D> {
        match self {
            Self::Mesh(m) => m.context(),
            Self::VertexBuffer(v) => v.context(),
            Self::Shaders(s) => s.context(),
        }
    }

    pub fn as_mesh(&self) -> Option<&MeshInstance<D>> {
        match self {
            Self::Mesh(m) => Some(m),
            _ => None,
        }
    }
}

impl<D: RenderDevice> fmt::Debug for Instance<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mesh(m) => f
                .debug_struct("Mesh")
                .field("vertex_buffers", &m.vertex_buffers.len())
                .field("shader_module", &m.shader_module)
                .finish(),
            Self::VertexBuffer(v) => f
                .debug_struct("VertexBuffer")
                .field("descriptor", &v.descriptor)
                .finish(),
            Self::Shaders(s) => f
                .debug_struct("Shaders")
                .field("code_len", &s.descriptor.code.len())
                .finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::recording::RecordingDevice;

    #[test]
    fn tags_round_trip_through_kind() {
        for kind in ElementKind::ALL {
            assert_eq!(kind.tag().parse::<ElementKind>().unwrap(), kind);
        }
    }

    #[test]
    fn unknown_tag_is_unsupported() {
        match "paragraph".parse::<ElementKind>() {
            Err(HostError::UnsupportedElementKind(tag)) => assert_eq!(tag, "paragraph"),
            other => panic!("expected UnsupportedElementKind, got {other:?}"),
        }
        // Tags are case-sensitive.
        assert!("Mesh".parse::<ElementKind>().is_err());
    }

    #[test]
    fn new_mesh_is_empty() {
        let ctx = Rc::new(RecordingDevice::default());
        let inst = Instance::mesh(ctx.clone());
        let mesh = inst.as_mesh().unwrap();
        assert!(mesh.vertex_buffers().is_empty());
        assert!(mesh.shader_module().is_none());
        assert!(Rc::ptr_eq(inst.context(), &ctx));
        // Creation allocates nothing on the device.
        assert!(ctx.events().is_empty());
    }
}
