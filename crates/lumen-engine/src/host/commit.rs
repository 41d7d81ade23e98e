//! Commit compiler: turns a mesh's accumulated resources into one pipeline
//! and one submitted render pass.
//!
//! Nothing is cached between commits. Each call rebuilds the pipeline and
//! resubmits a full pass.

use tracing::Span;

use super::instance::MeshInstance;
use super::{HostError, HostOptions, Instance, VertexBinding};
use crate::render::{PassCmd, PassDesc, PipelineDesc, RenderDevice, VertexLayout};

pub(crate) fn commit<D: RenderDevice>(
    instance: &Instance<D>,
    options: &HostOptions,
    span: &Span,
) -> Result<(), HostError> {
    match instance {
        Instance::Mesh(mesh) => commit_mesh(mesh, options, span),
        Instance::VertexBuffer(_) | Instance::Shaders(_) => Ok(()),
    }
}

fn commit_mesh<D: RenderDevice>(
    mesh: &MeshInstance<D>,
    options: &HostOptions,
    span: &Span,
) -> Result<(), HostError> {
    let module = mesh.shader_module().ok_or(HostError::IncompleteMesh)?;
    let ctx = mesh.context();
    let bindings = mesh.vertex_buffers();
    // The draw count always comes from the first binding.
    let first = bindings.first().ok_or(HostError::MeshWithoutVertices)?;

    // The pipeline declares exactly the slots that get bound.
    let bound = match options.vertex_binding {
        VertexBinding::FirstSlot => &bindings[..1],
        VertexBinding::AllSlots => bindings,
    };
    let layouts: Vec<&VertexLayout> = bound.iter().map(|b| &b.layout).collect();
    let pipeline = ctx.create_render_pipeline(&PipelineDesc {
        label: "lumen mesh pipeline",
        module,
        vertex_entry: &options.vertex_entry,
        fragment_entry: &options.fragment_entry,
        vertex_layouts: &layouts,
        target_format: ctx.surface_format(),
        topology: wgpu::PrimitiveTopology::TriangleList,
    });

    let mut commands = vec![PassCmd::SetPipeline(&pipeline)];
    for (slot, binding) in (0u32..).zip(bound) {
        commands.push(PassCmd::SetVertexBuffer { slot, buffer: &binding.buffer });
    }
    commands.push(PassCmd::Draw { vertices: 0..first.vertex_count, instances: 0..1 });

    ctx.submit_pass(&PassDesc { label: "lumen mesh pass", clear: options.clear_color }, &commands)?;

    tracing::debug!(
        parent: span,
        bound = bound.len(),
        buffers = bindings.len(),
        vertices = first.vertex_count,
        "mesh committed"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::*;
    use crate::host::attach::attach;
    use crate::host::descriptor::{ShaderDescriptor, VertexBufferDescriptor, VertexProducer};
    use crate::render::recording::{GpuEvent, RecordedCmd, RecordingDevice};

    fn buffer(ctx: &Rc<RecordingDevice>, stride: u64, count: u32) -> Instance<RecordingDevice> {
        let layout = VertexLayout::new(stride, wgpu::VertexStepMode::Vertex)
            .with_attribute(0, 0, wgpu::VertexFormat::Float32x4);
        let floats = (stride as usize / 4) * count as usize;
        Instance::vertex_buffer(
            ctx.clone(),
            VertexBufferDescriptor::new(layout, count, VertexProducer::from_vec(vec![0.0; floats])),
        )
    }

    fn mesh_with(ctx: &Rc<RecordingDevice>, children: &[Instance<RecordingDevice>]) -> Instance<RecordingDevice> {
        let mut mesh = Instance::mesh(ctx.clone());
        for child in children {
            attach(&mut mesh, child, &Span::none()).unwrap();
        }
        mesh
    }

    fn shaders(ctx: &Rc<RecordingDevice>) -> Instance<RecordingDevice> {
        Instance::shaders(ctx.clone(), ShaderDescriptor::new("// wgsl"))
    }

    #[test]
    fn mesh_without_shaders_is_incomplete() {
        let ctx = Rc::new(RecordingDevice::default());
        let mesh = mesh_with(&ctx, &[buffer(&ctx, 32, 3)]);
        ctx.take_events();

        let err = commit(&mesh, &HostOptions::default(), &Span::none()).unwrap_err();
        assert!(matches!(err, HostError::IncompleteMesh));
        assert_eq!(err.to_string(), "mesh must have shaders");
        // Aborted before any pipeline or submission.
        assert!(ctx.events().is_empty());
    }

    #[test]
    fn one_buffer_one_module_draws_three_vertices() {
        let ctx = Rc::new(RecordingDevice::default());
        let mesh = mesh_with(&ctx, &[buffer(&ctx, 32, 3), shaders(&ctx)]);

        commit(&mesh, &HostOptions::default(), &Span::none()).unwrap();

        assert_eq!(ctx.pipeline_count(), 1);
        assert_eq!(ctx.submit_count(), 1);
        assert_eq!(ctx.draws(), vec![(0..3, 0..1)]);
    }

    #[test]
    fn pipeline_uses_entry_points_layouts_and_surface_format() {
        let ctx = Rc::new(RecordingDevice::new(wgpu::TextureFormat::Rgba8Unorm));
        let mesh = mesh_with(&ctx, &[buffer(&ctx, 32, 3), shaders(&ctx)]);
        ctx.take_events();

        commit(&mesh, &HostOptions::default(), &Span::none()).unwrap();

        let events = ctx.events();
        match &events[0] {
            GpuEvent::CreateRenderPipeline {
                vertex_entry,
                fragment_entry,
                vertex_layouts,
                target_format,
                topology,
                ..
            } => {
                assert_eq!(vertex_entry, "vertex_main");
                assert_eq!(fragment_entry, "fragment_main");
                assert_eq!(vertex_layouts.len(), 1);
                assert_eq!(vertex_layouts[0].array_stride, 32);
                assert_eq!(*target_format, wgpu::TextureFormat::Rgba8Unorm);
                assert_eq!(*topology, wgpu::PrimitiveTopology::TriangleList);
            }
            other => panic!("expected a pipeline first, got {other:?}"),
        }
    }

    #[test]
    fn pass_clears_to_background_and_binds_first_buffer_only() {
        let ctx = Rc::new(RecordingDevice::default());
        let mesh = mesh_with(&ctx, &[buffer(&ctx, 32, 3), buffer(&ctx, 16, 6), shaders(&ctx)]);
        let first_id = mesh.as_mesh().unwrap().vertex_buffers()[0].buffer.id;
        ctx.take_events();

        commit(&mesh, &HostOptions::default(), &Span::none()).unwrap();

        let pass = ctx
            .events()
            .into_iter()
            .find_map(|e| match e {
                GpuEvent::RenderPass { color_attachments, clear, commands, .. } => {
                    Some((color_attachments, clear, commands))
                }
                _ => None,
            })
            .unwrap();
        assert_eq!(pass.0, 1);
        assert_eq!(pass.1, wgpu::Color { r: 0.0, g: 0.5, b: 1.0, a: 1.0 });
        assert!(matches!(pass.2[0], RecordedCmd::SetPipeline(_)));
        assert_eq!(pass.2[1], RecordedCmd::SetVertexBuffer { slot: 0, buffer: first_id });
        assert_eq!(pass.2[2], RecordedCmd::Draw { vertices: 0..3, instances: 0..1 });
        assert_eq!(pass.2.len(), 3);
    }

    #[test]
    fn all_slots_binds_every_buffer() {
        let ctx = Rc::new(RecordingDevice::default());
        let mesh = mesh_with(&ctx, &[buffer(&ctx, 32, 3), buffer(&ctx, 16, 6), shaders(&ctx)]);
        let options = HostOptions { vertex_binding: VertexBinding::AllSlots, ..HostOptions::default() };

        commit(&mesh, &options, &Span::none()).unwrap();

        let slots: Vec<u32> = ctx
            .events()
            .iter()
            .filter_map(|e| match e {
                GpuEvent::RenderPass { commands, .. } => Some(commands.clone()),
                _ => None,
            })
            .flatten()
            .filter_map(|c| match c {
                RecordedCmd::SetVertexBuffer { slot, .. } => Some(slot),
                _ => None,
            })
            .collect();
        assert_eq!(slots, [0, 1]);
        assert_eq!(ctx.draws(), vec![(0..3, 0..1)]);
        assert!(ctx.events().iter().any(|e| matches!(
            e,
            GpuEvent::CreateRenderPipeline { vertex_layouts, .. } if vertex_layouts.len() == 2
        )));
    }

    #[test]
    fn repeated_commits_rebuild_and_redraw() {
        let ctx = Rc::new(RecordingDevice::default());
        let mesh = mesh_with(&ctx, &[buffer(&ctx, 32, 3), shaders(&ctx)]);

        commit(&mesh, &HostOptions::default(), &Span::none()).unwrap();
        commit(&mesh, &HostOptions::default(), &Span::none()).unwrap();

        assert_eq!(ctx.pipeline_count(), 2);
        assert_eq!(ctx.submit_count(), 2);
        assert_eq!(ctx.draws().len(), 2);
    }

    #[test]
    fn shaders_without_buffers_leave_the_surface_untouched() {
        let ctx = Rc::new(RecordingDevice::default());
        let mesh = mesh_with(&ctx, &[shaders(&ctx)]);
        ctx.take_events();

        let err = commit(&mesh, &HostOptions::default(), &Span::none()).unwrap_err();
        assert!(matches!(err, HostError::MeshWithoutVertices));
        assert_eq!(ctx.submit_count(), 0);
        assert_eq!(ctx.pipeline_count(), 0);
        assert!(ctx.events().is_empty());
    }

    #[test]
    fn first_slot_pipeline_declares_only_the_bound_layout() {
        let ctx = Rc::new(RecordingDevice::default());
        let mesh = mesh_with(&ctx, &[buffer(&ctx, 32, 3), buffer(&ctx, 16, 6), shaders(&ctx)]);
        ctx.take_events();

        commit(&mesh, &HostOptions::default(), &Span::none()).unwrap();

        let strides: Vec<u64> = ctx
            .events()
            .iter()
            .find_map(|e| match e {
                GpuEvent::CreateRenderPipeline { vertex_layouts, .. } => {
                    Some(vertex_layouts.iter().map(|l| l.array_stride).collect())
                }
                _ => None,
            })
            .unwrap();
        assert_eq!(strides, [32]);
    }

    #[test]
    fn acquisition_failure_submits_nothing() {
        let ctx = Rc::new(RecordingDevice::default());
        let mesh = mesh_with(&ctx, &[buffer(&ctx, 32, 3), shaders(&ctx)]);
        ctx.fail_next_acquire();

        let err = commit(&mesh, &HostOptions::default(), &Span::none()).unwrap_err();
        assert!(matches!(err, HostError::Surface(_)));
        assert_eq!(ctx.submit_count(), 0);

        // The next frame succeeds.
        commit(&mesh, &HostOptions::default(), &Span::none()).unwrap();
        assert_eq!(ctx.submit_count(), 1);
    }

    #[test]
    fn non_mesh_commit_is_a_no_op() {
        let ctx = Rc::new(RecordingDevice::default());
        let child = buffer(&ctx, 32, 3);
        commit(&child, &HostOptions::default(), &Span::none()).unwrap();
        commit(&shaders(&ctx), &HostOptions::default(), &Span::none()).unwrap();
        assert!(ctx.events().is_empty());
    }
}
