use std::convert::Infallible;
use std::rc::Rc;

use lumen_markup::Props;
use tracing::Span;

use super::attach::attach;
use super::commit::commit;
use super::{ElementKind, HostError, HostOptions, Instance};
use crate::render::RenderDevice;

/// Host operations consumed by a reconciliation engine.
///
/// The engine owns ordering: every attachment for a mesh must be issued
/// before that mesh's `commit_mount`. Implementations do no buffering or
/// reordering of their own.
pub trait HostConfig {
    type Instance;
    /// Text instances. Hosts without a text primitive use [`Infallible`].
    type TextInstance;
    /// Root container the top-level instances are appended to.
    type Container;
    /// Diff payload produced by `prepare_update` and consumed by `commit_update`.
    type UpdatePayload;
    type Error: std::error::Error;

    fn create_instance(&self, tag: &str, props: &Props) -> Result<Self::Instance, Self::Error>;
    fn create_text_instance(&self, text: &str) -> Result<Self::TextInstance, Self::Error>;
    fn should_set_text_content(&self, tag: &str, props: &Props) -> bool;

    fn append_initial_child(&self, parent: &mut Self::Instance, child: &Self::Instance) -> Result<(), Self::Error>;
    fn append_child(&self, parent: &mut Self::Instance, child: &Self::Instance) -> Result<(), Self::Error>;
    fn remove_child(&self, parent: &mut Self::Instance, child: &Self::Instance);
    fn insert_before(&self, parent: &mut Self::Instance, child: &Self::Instance, before: &Self::Instance);

    fn append_child_to_container(&self, container: &Self::Container, child: &Self::Instance);
    fn remove_child_from_container(&self, container: &Self::Container, child: &Self::Instance);
    fn insert_in_container_before(
        &self,
        container: &Self::Container,
        child: &Self::Instance,
        before: &Self::Instance,
    );

    /// Returns `true` when the instance wants a `commit_mount` call.
    fn finalize_initial_children(&self, instance: &mut Self::Instance, tag: &str, props: &Props) -> bool;
    fn prepare_update(
        &self,
        instance: &Self::Instance,
        tag: &str,
        old_props: &Props,
        new_props: &Props,
    ) -> Option<Self::UpdatePayload>;

    fn prepare_for_commit(&self, container: &Self::Container);
    fn reset_after_commit(&self, container: &Self::Container);

    fn commit_mount(&self, instance: &Self::Instance, tag: &str, props: &Props) -> Result<(), Self::Error>;
    fn commit_update(
        &self,
        instance: &mut Self::Instance,
        payload: Self::UpdatePayload,
        tag: &str,
        old_props: &Props,
        new_props: &Props,
    );

    fn clear_container(&self, container: &Self::Container);
    fn hide_instance(&self, instance: &Self::Instance);
    fn unhide_instance(&self, instance: &Self::Instance, props: &Props);
    fn hide_text_instance(&self, text: &Self::TextInstance);
    fn unhide_text_instance(&self, text: &Self::TextInstance, content: &str);
    fn detach_deleted_instance(&self, instance: &Self::Instance);
}

/// [`HostConfig`] for one root: every instance it creates shares `ctx`.
///
/// The container is the root's device context itself. Removal, reordering
/// and updates are accepted and traced but change nothing; the tree is built
/// once and recommitted every frame.
pub struct GpuHost<D: RenderDevice> {
    ctx: Rc<D>,
    options: HostOptions,
    span: Span,
}

impl<D: RenderDevice> GpuHost<D> {
    /// `span` parents every protocol event this host emits.
    pub fn new(ctx: Rc<D>, options: HostOptions, span: Span) -> Self {
        Self { ctx, options, span }
    }

    pub fn context(&self) -> &Rc<D> {
        &self.ctx
    }

    pub fn options(&self) -> &HostOptions {
        &self.options
    }

    pub fn span(&self) -> &Span {
        &self.span
    }

    fn ignored(&self, op: &'static str) {
        tracing::trace!(parent: &self.span, op, "accepted without effect");
    }
}

impl<D: RenderDevice> HostConfig for GpuHost<D> {
    type Instance = Instance<D>;
    type TextInstance = Infallible;
    type Container = Rc<D>;
    type UpdatePayload = ();
    type Error = HostError;

    fn create_instance(&self, tag: &str, props: &Props) -> Result<Instance<D>, HostError> {
        tracing::trace!(parent: &self.span, tag, props = props.len(), "create_instance");
        let kind: ElementKind = tag.parse()?;
        Instance::create(kind, props, self.ctx.clone())
    }

    fn create_text_instance(&self, text: &str) -> Result<Infallible, HostError> {
        tracing::trace!(parent: &self.span, len = text.len(), "create_text_instance");
        Err(HostError::UnsupportedElementKind("#text".to_string()))
    }

    fn should_set_text_content(&self, _tag: &str, _props: &Props) -> bool {
        false
    }

    fn append_initial_child(&self, parent: &mut Instance<D>, child: &Instance<D>) -> Result<(), HostError> {
        tracing::trace!(parent: &self.span, parent_kind = %parent.kind(), child_kind = %child.kind(), "append_initial_child");
        attach(parent, child, &self.span)
    }

    fn append_child(&self, parent: &mut Instance<D>, child: &Instance<D>) -> Result<(), HostError> {
        tracing::trace!(parent: &self.span, parent_kind = %parent.kind(), child_kind = %child.kind(), "append_child");
        attach(parent, child, &self.span)
    }

    // No reclamation: a removed child's buffer stays bound to its mesh.
    fn remove_child(&self, _parent: &mut Instance<D>, _child: &Instance<D>) {
        self.ignored("remove_child");
    }

    fn insert_before(&self, _parent: &mut Instance<D>, _child: &Instance<D>, _before: &Instance<D>) {
        self.ignored("insert_before");
    }

    fn append_child_to_container(&self, _container: &Rc<D>, _child: &Instance<D>) {
        self.ignored("append_child_to_container");
    }

    fn remove_child_from_container(&self, _container: &Rc<D>, _child: &Instance<D>) {
        self.ignored("remove_child_from_container");
    }

    fn insert_in_container_before(&self, _container: &Rc<D>, _child: &Instance<D>, _before: &Instance<D>) {
        self.ignored("insert_in_container_before");
    }

    fn finalize_initial_children(&self, _instance: &mut Instance<D>, _tag: &str, _props: &Props) -> bool {
        true
    }

    fn prepare_update(&self, _instance: &Instance<D>, _tag: &str, _old: &Props, _new: &Props) -> Option<()> {
        None
    }

    fn prepare_for_commit(&self, _container: &Rc<D>) {
        tracing::trace!(parent: &self.span, "prepare_for_commit");
    }

    fn reset_after_commit(&self, _container: &Rc<D>) {
        tracing::trace!(parent: &self.span, "reset_after_commit");
    }

    fn commit_mount(&self, instance: &Instance<D>, tag: &str, _props: &Props) -> Result<(), HostError> {
        tracing::trace!(parent: &self.span, tag, "commit_mount");
        commit(instance, &self.options, &self.span)
    }

    fn commit_update(&self, _instance: &mut Instance<D>, _payload: (), _tag: &str, _old: &Props, _new: &Props) {
        self.ignored("commit_update");
    }

    fn clear_container(&self, _container: &Rc<D>) {
        self.ignored("clear_container");
    }

    fn hide_instance(&self, _instance: &Instance<D>) {
        self.ignored("hide_instance");
    }

    fn unhide_instance(&self, _instance: &Instance<D>, _props: &Props) {
        self.ignored("unhide_instance");
    }

    fn hide_text_instance(&self, text: &Infallible) {
        match *text {}
    }

    fn unhide_text_instance(&self, text: &Infallible, _content: &str) {
        match *text {}
    }

    fn detach_deleted_instance(&self, _instance: &Instance<D>) {
        self.ignored("detach_deleted_instance");
    }
}

#[cfg(test)]
mod tests {
    use lumen_markup::Value;

    use super::*;
    use crate::host::descriptor::VertexProducer;
    use crate::render::recording::{GpuEvent, RecordingDevice};

    fn host() -> GpuHost<RecordingDevice> {
        GpuHost::new(Rc::new(RecordingDevice::default()), HostOptions::default(), Span::none())
    }

    fn num(n: f64) -> Value {
        Value::Number(n)
    }

    fn triangle_props() -> Props {
        let attr = |loc: f64, offset: f64| {
            Value::Record(
                Props::new()
                    .with("shaderLocation", num(loc))
                    .with("offset", num(offset))
                    .with("format", Value::Ident("float32x4".into())),
            )
        };
        #[rustfmt::skip]
        let vertices = [
            0.0, 0.6, 0.0, 1.0, 1.0, 0.0, 0.0, 1.0,
            -0.5, -0.6, 0.0, 1.0, 0.0, 1.0, 0.0, 1.0,
            0.5, -0.6, 0.0, 1.0, 0.0, 0.0, 1.0, 1.0,
        ];
        Props::new()
            .with("attributes", Value::List(vec![attr(0.0, 0.0), attr(1.0, 16.0)]))
            .with("arrayStride", num(32.0))
            .with("stepMode", Value::Ident("vertex".into()))
            .with("vertexCount", num(3.0))
            .with("vertices", Value::List(vertices.iter().map(|&v| num(v)).collect()))
    }

    fn shader_props() -> Props {
        Props::new().with("code", Value::Str(PASS_THROUGH.to_string()))
    }

    const PASS_THROUGH: &str = r#"
struct VertexOut {
    @builtin(position) position: vec4f,
    @location(0) color: vec4f,
}

@vertex
fn vertex_main(@location(0) position: vec4f, @location(1) color: vec4f) -> VertexOut {
    var out: VertexOut;
    out.position = position;
    out.color = color;
    return out;
}

@fragment
fn fragment_main(in: VertexOut) -> @location(0) vec4f {
    return in.color;
}
"#;

    #[test]
    fn supported_kinds_carry_the_root_context() {
        let host = host();
        let cases = [
            ("mesh", Props::new(), ElementKind::Mesh),
            ("vertexBuffer", triangle_props(), ElementKind::VertexBuffer),
            ("shaders", shader_props(), ElementKind::Shaders),
        ];
        for (tag, props, kind) in cases {
            let inst = host.create_instance(tag, &props).unwrap();
            assert_eq!(inst.kind(), kind);
            assert!(Rc::ptr_eq(inst.context(), host.context()));
        }
    }

    #[test]
    fn unsupported_kind_and_text_fail() {
        let host = host();
        let err = host.create_instance("paragraph", &Props::new()).unwrap_err();
        assert!(matches!(&err, HostError::UnsupportedElementKind(tag) if tag == "paragraph"));
        assert_eq!(err.to_string(), r#"unsupported element kind "paragraph""#);

        assert!(matches!(
            host.create_text_instance("hello"),
            Err(HostError::UnsupportedElementKind(_))
        ));
        assert!(!host.should_set_text_content("mesh", &Props::new()));
    }

    #[test]
    fn append_and_initial_append_attach_identically() {
        let host = host();
        let mut a = host.create_instance("mesh", &Props::new()).unwrap();
        let mut b = host.create_instance("mesh", &Props::new()).unwrap();
        let vb = host.create_instance("vertexBuffer", &triangle_props()).unwrap();

        host.append_initial_child(&mut a, &vb).unwrap();
        host.append_child(&mut b, &vb).unwrap();

        for mesh in [&a, &b] {
            let bindings = mesh.as_mesh().unwrap().vertex_buffers();
            assert_eq!(bindings.len(), 1);
            assert_eq!(bindings[0].vertex_count, 3);
            assert_eq!(bindings[0].layout.array_stride, 32);
        }
    }

    #[test]
    fn attaching_under_a_resource_fails() {
        let host = host();
        let mut shaders = host.create_instance("shaders", &shader_props()).unwrap();
        let vb = host.create_instance("vertexBuffer", &triangle_props()).unwrap();
        assert!(matches!(
            host.append_child(&mut shaders, &vb),
            Err(HostError::UnsupportedAttachment { .. })
        ));
    }

    #[test]
    fn structural_ops_change_nothing() {
        let host = host();
        let mut mesh = host.create_instance("mesh", &Props::new()).unwrap();
        let vb = host.create_instance("vertexBuffer", &triangle_props()).unwrap();
        let other = host.create_instance("vertexBuffer", &triangle_props()).unwrap();
        host.append_child(&mut mesh, &vb).unwrap();
        let before = host.context().events().len();

        host.remove_child(&mut mesh, &vb);
        host.insert_before(&mut mesh, &other, &vb);
        host.append_child_to_container(host.context(), &mesh);
        host.remove_child_from_container(host.context(), &mesh);
        host.insert_in_container_before(host.context(), &other, &mesh);
        host.clear_container(host.context());
        host.hide_instance(&mesh);
        host.unhide_instance(&mesh, &Props::new());
        host.detach_deleted_instance(&vb);
        host.commit_update(&mut mesh, (), "mesh", &Props::new(), &Props::new());

        assert_eq!(mesh.as_mesh().unwrap().vertex_buffers().len(), 1);
        assert_eq!(host.context().events().len(), before);
    }

    #[test]
    fn every_instance_requests_commit_mount_and_no_update_payload() {
        let host = host();
        for (tag, props) in [("mesh", Props::new()), ("shaders", shader_props())] {
            let mut inst = host.create_instance(tag, &props).unwrap();
            assert!(host.finalize_initial_children(&mut inst, tag, &props));
            assert!(host.prepare_update(&inst, tag, &props, &props).is_none());
        }
    }

    #[test]
    fn triangle_end_to_end() {
        let host = host();
        let ctx = host.context().clone();
        let mut mesh = host.create_instance("mesh", &Props::new()).unwrap();
        let vb = host.create_instance("vertexBuffer", &triangle_props()).unwrap();
        let sh = host.create_instance("shaders", &shader_props()).unwrap();

        host.append_initial_child(&mut mesh, &vb).unwrap();
        host.append_initial_child(&mut mesh, &sh).unwrap();
        host.prepare_for_commit(&ctx);
        host.append_child_to_container(&ctx, &mesh);
        host.reset_after_commit(&ctx);
        host.commit_mount(&vb, "vertexBuffer", &triangle_props()).unwrap();
        host.commit_mount(&sh, "shaders", &shader_props()).unwrap();
        host.commit_mount(&mesh, "mesh", &Props::new()).unwrap();

        assert_eq!(ctx.pipeline_count(), 1);
        let passes: Vec<_> = ctx
            .events()
            .into_iter()
            .filter_map(|e| match e {
                GpuEvent::RenderPass { color_attachments, clear, .. } => Some((color_attachments, clear)),
                _ => None,
            })
            .collect();
        assert_eq!(passes, vec![(1, wgpu::Color { r: 0.0, g: 0.5, b: 1.0, a: 1.0 })]);
        assert_eq!(ctx.draws(), vec![(0..3, 0..1)]);
        assert!(!ctx.events().contains(&GpuEvent::AcquireFailed));
    }

    #[test]
    fn custom_clear_color_reaches_the_pass() {
        let clear = wgpu::Color { r: 0.1, g: 0.2, b: 0.3, a: 1.0 };
        let ctx = Rc::new(RecordingDevice::default());
        let host = GpuHost::new(ctx.clone(), HostOptions { clear_color: clear, ..HostOptions::default() }, Span::none());
        let mut mesh = host.create_instance("mesh", &Props::new()).unwrap();
        host.append_child(&mut mesh, &host.create_instance("vertexBuffer", &triangle_props()).unwrap()).unwrap();
        host.append_child(&mut mesh, &host.create_instance("shaders", &shader_props()).unwrap()).unwrap();
        host.commit_mount(&mesh, "mesh", &Props::new()).unwrap();

        assert!(ctx.events().iter().any(|e| matches!(e, GpuEvent::RenderPass { clear: c, .. } if *c == clear)));
    }

    #[test]
    fn failing_mesh_does_not_affect_committed_one() {
        let host = host();
        let ctx = host.context().clone();
        let mut good = host.create_instance("mesh", &Props::new()).unwrap();
        host.append_child(&mut good, &host.create_instance("vertexBuffer", &triangle_props()).unwrap()).unwrap();
        host.append_child(&mut good, &host.create_instance("shaders", &shader_props()).unwrap()).unwrap();
        let bad = host.create_instance("mesh", &Props::new()).unwrap();

        host.commit_mount(&good, "mesh", &Props::new()).unwrap();
        assert!(matches!(host.commit_mount(&bad, "mesh", &Props::new()), Err(HostError::IncompleteMesh)));
        assert_eq!(ctx.draws().len(), 1);
    }

    #[test]
    fn producer_backed_descriptor_goes_through_the_host() {
        let host = host();
        let mut mesh = host.create_instance("mesh", &Props::new()).unwrap();
        let vb = Instance::vertex_buffer(
            host.context().clone(),
            crate::host::descriptor::VertexBufferDescriptor::new(
                crate::render::VertexLayout::new(8, wgpu::VertexStepMode::Vertex),
                2,
                VertexProducer::new(|| vec![0.0; 4]),
            ),
        );
        host.append_child(&mut mesh, &vb).unwrap();
        assert_eq!(mesh.as_mesh().unwrap().vertex_buffers()[0].vertex_count, 2);
    }
}
