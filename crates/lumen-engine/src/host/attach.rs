//! Child attachment: the point where GPU resources are allocated.
//!
//! | parent | child | effect |
//! |--------|-------|--------|
//! | mesh | vertexBuffer | allocate + fill a vertex buffer, push a binding |
//! | mesh | shaders | compile a module, replace the mesh's module |
//! | anything else | | `UnsupportedAttachment` |

use tracing::Span;

use super::instance::{MeshInstance, ShadersInstance, VertexBufferBinding, VertexBufferInstance};
use super::{HostError, Instance};
use crate::render::RenderDevice;

pub(crate) fn attach<D: RenderDevice>(
    parent: &mut Instance<D>,
    child: &Instance<D>,
    span: &Span,
) -> Result<(), HostError> {
    match (parent, child) {
        (Instance::Mesh(mesh), Instance::VertexBuffer(vb)) => {
            attach_vertex_buffer(mesh, vb, span);
            Ok(())
        }
        (Instance::Mesh(mesh), Instance::Shaders(shaders)) => {
            attach_shaders(mesh, shaders, span);
            Ok(())
        }
        (parent, child) => Err(HostError::UnsupportedAttachment {
            parent: parent.kind(),
            child: child.kind(),
        }),
    }
}

fn attach_vertex_buffer<D: RenderDevice>(
    mesh: &mut MeshInstance<D>,
    child: &VertexBufferInstance<D>,
    span: &Span,
) {
    let desc = child.descriptor();
    let vertices = desc.vertices.produce();
    let bytes: &[u8] = bytemuck::cast_slice(&vertices);

    let expected = desc.expected_byte_len();
    if bytes.len() as u64 != expected {
        tracing::warn!(
            parent: span,
            produced = bytes.len(),
            expected,
            "vertex data length does not match arrayStride * vertexCount"
        );
    }

    let buffer = child.context().create_vertex_buffer("lumen vertex buffer", bytes);
    mesh.vertex_buffers.push(VertexBufferBinding {
        buffer,
        layout: desc.layout.clone(),
        vertex_count: desc.vertex_count,
    });

    tracing::debug!(
        parent: span,
        slot = mesh.vertex_buffers.len() - 1,
        bytes = bytes.len(),
        vertex_count = desc.vertex_count,
        "attached vertex buffer"
    );
}

fn attach_shaders<D: RenderDevice>(
    mesh: &mut MeshInstance<D>,
    child: &ShadersInstance<D>,
    span: &Span,
) {
    let module = child
        .context()
        .create_shader_module("lumen shader module", &child.descriptor().code);

    if mesh.shader_module.replace(module).is_some() {
        tracing::debug!(parent: span, "replaced mesh shader module");
    } else {
        tracing::debug!(parent: span, "attached shader module");
    }
}
