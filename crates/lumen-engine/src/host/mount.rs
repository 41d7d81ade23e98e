//! Initial mount of a markup document through a [`HostConfig`].
//!
//! Follows the order a reconciliation engine uses for a first render:
//!
//! 1. render phase, bottom-up: each child subtree is fully built before its
//!    parent is created, then the parent receives `append_initial_child` for
//!    every child in source order and `finalize_initial_children`;
//! 2. commit phase: `prepare_for_commit`, `append_child_to_container` for each
//!    root, `reset_after_commit`, then `commit_mount` post-order for every
//!    instance that asked for it.
//!
//! There is no diffing. A mounted scene can only be recommitted as a whole.

use lumen_markup::{Node, Props, SceneDocument};

use super::HostConfig;

/// One mounted element and its subtree.
#[derive(Debug)]
pub struct MountedNode<I> {
    pub tag: String,
    pub props: Props,
    pub instance: I,
    pub children: Vec<MountedNode<I>>,
    needs_commit: bool,
}

impl<I> MountedNode<I> {
    fn visit_post_order<'a>(&'a self, f: &mut impl FnMut(&'a MountedNode<I>)) {
        for child in &self.children {
            child.visit_post_order(f);
        }
        f(self);
    }
}

/// Instance tree built by [`mount`].
#[derive(Debug)]
pub struct MountedScene<I> {
    roots: Vec<MountedNode<I>>,
}

impl<I> MountedScene<I> {
    pub fn roots(&self) -> &[MountedNode<I>] {
        &self.roots
    }

    /// Number of mounted instances, all levels.
    pub fn len(&self) -> usize {
        let mut n = 0;
        for root in &self.roots {
            root.visit_post_order(&mut |_| n += 1);
        }
        n
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Reruns the commit phase without rebuilding the tree.
    ///
    /// Each call is a new frame: every mesh rebuilds its pipeline and resubmits.
    pub fn recommit<H>(&self, host: &H, container: &H::Container) -> Result<(), H::Error>
    where
        H: HostConfig<Instance = I>,
    {
        host.prepare_for_commit(container);
        host.reset_after_commit(container);
        self.commit_mounts(host)
    }

    fn commit_mounts<H>(&self, host: &H) -> Result<(), H::Error>
    where
        H: HostConfig<Instance = I>,
    {
        let mut pending = Vec::new();
        for root in &self.roots {
            root.visit_post_order(&mut |node| {
                if node.needs_commit {
                    pending.push(node);
                }
            });
        }
        for node in pending {
            host.commit_mount(&node.instance, &node.tag, &node.props)?;
        }
        Ok(())
    }
}

/// Builds and commits `doc` against `host`.
///
/// Stops at the first error. Meshes committed before the failing one keep
/// whatever they already submitted.
pub fn mount<H: HostConfig>(
    host: &H,
    container: &H::Container,
    doc: &SceneDocument,
) -> Result<MountedScene<H::Instance>, H::Error> {
    let roots = doc
        .roots
        .iter()
        .map(|node| build(host, node))
        .collect::<Result<Vec<_>, _>>()?;
    let scene = MountedScene { roots };

    host.prepare_for_commit(container);
    for root in &scene.roots {
        host.append_child_to_container(container, &root.instance);
    }
    host.reset_after_commit(container);
    scene.commit_mounts(host)?;

    log::debug!("mounted {} instance(s) under {} root(s)", scene.len(), scene.roots.len());
    Ok(scene)
}

fn build<H: HostConfig>(host: &H, node: &Node) -> Result<MountedNode<H::Instance>, H::Error> {
    let children = node
        .children
        .iter()
        .map(|child| build(host, child))
        .collect::<Result<Vec<_>, _>>()?;

    let mut instance = host.create_instance(&node.tag, &node.props)?;
    for child in &children {
        host.append_initial_child(&mut instance, &child.instance)?;
    }
    let needs_commit = host.finalize_initial_children(&mut instance, &node.tag, &node.props);

    Ok(MountedNode {
        tag: node.tag.clone(),
        props: node.props.clone(),
        instance,
        children,
        needs_commit,
    })
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::convert::Infallible;
    use std::rc::Rc;

    use lumen_markup::parse_str;
    use tracing::Span;

    use super::*;
    use crate::host::{GpuHost, HostError, HostOptions};
    use crate::render::recording::{GpuEvent, RecordingDevice};

    /// Host that records the protocol calls it receives, by tag.
    #[derive(Default)]
    struct CallLog {
        calls: RefCell<Vec<String>>,
    }

    impl CallLog {
        fn log(&self, entry: String) {
            self.calls.borrow_mut().push(entry);
        }
    }

    #[derive(Debug, thiserror::Error)]
    #[error("rejected {0}")]
    struct Rejected(String);

    impl HostConfig for CallLog {
        type Instance = String;
        type TextInstance = Infallible;
        type Container = ();
        type UpdatePayload = ();
        type Error = Rejected;

        fn create_instance(&self, tag: &str, _props: &Props) -> Result<String, Rejected> {
            if tag == "bad" {
                return Err(Rejected(tag.to_string()));
            }
            self.log(format!("create {tag}"));
            Ok(tag.to_string())
        }
        fn create_text_instance(&self, text: &str) -> Result<Infallible, Rejected> {
            Err(Rejected(text.to_string()))
        }
        fn should_set_text_content(&self, _: &str, _: &Props) -> bool {
            false
        }
        fn append_initial_child(&self, parent: &mut String, child: &String) -> Result<(), Rejected> {
            self.log(format!("append {child} to {parent}"));
            Ok(())
        }
        fn append_child(&self, _: &mut String, _: &String) -> Result<(), Rejected> {
            unreachable!("initial mount only uses append_initial_child")
        }
        fn remove_child(&self, _: &mut String, _: &String) {}
        fn insert_before(&self, _: &mut String, _: &String, _: &String) {}
        fn append_child_to_container(&self, _: &(), child: &String) {
            self.log(format!("container {child}"));
        }
        fn remove_child_from_container(&self, _: &(), _: &String) {}
        fn insert_in_container_before(&self, _: &(), _: &String, _: &String) {}
        fn finalize_initial_children(&self, instance: &mut String, _: &str, _: &Props) -> bool {
            instance.as_str() != "skip"
        }
        fn prepare_update(&self, _: &String, _: &str, _: &Props, _: &Props) -> Option<()> {
            None
        }
        fn prepare_for_commit(&self, _: &()) {
            self.log("prepare".to_string());
        }
        fn reset_after_commit(&self, _: &()) {
            self.log("reset".to_string());
        }
        fn commit_mount(&self, instance: &String, _: &str, _: &Props) -> Result<(), Rejected> {
            self.log(format!("mount {instance}"));
            Ok(())
        }
        fn commit_update(&self, _: &mut String, _: (), _: &str, _: &Props, _: &Props) {}
        fn clear_container(&self, _: &()) {}
        fn hide_instance(&self, _: &String) {}
        fn unhide_instance(&self, _: &String, _: &Props) {}
        fn hide_text_instance(&self, text: &Infallible) {
            match *text {}
        }
        fn unhide_text_instance(&self, text: &Infallible, _: &str) {
            match *text {}
        }
        fn detach_deleted_instance(&self, _: &String) {}
    }

    #[test]
    fn children_are_built_and_committed_first() {
        let host = CallLog::default();
        let doc = parse_str("a { b { c } d }").unwrap();
        let scene = mount(&host, &(), &doc).unwrap();

        assert_eq!(scene.len(), 4);
        assert_eq!(
            *host.calls.borrow(),
            [
                "create c", "create b", "append c to b", "create d", "create a", "append b to a",
                "append d to a", "prepare", "container a", "reset", "mount c", "mount b",
                "mount d", "mount a",
            ]
        );
    }

    #[test]
    fn only_requested_instances_are_committed() {
        let host = CallLog::default();
        let scene = mount(&host, &(), &parse_str("skip x").unwrap()).unwrap();
        assert_eq!(scene.roots().len(), 2);
        let mounts: Vec<_> = host.calls.borrow().iter().filter(|c| c.starts_with("mount")).cloned().collect();
        assert_eq!(mounts, ["mount x"]);
    }

    #[test]
    fn recommit_skips_the_render_phase() {
        let host = CallLog::default();
        let scene = mount(&host, &(), &parse_str("a { b }").unwrap()).unwrap();
        host.calls.borrow_mut().clear();

        scene.recommit(&host, &()).unwrap();
        assert_eq!(*host.calls.borrow(), ["prepare", "reset", "mount b", "mount a"]);
    }

    #[test]
    fn creation_error_stops_the_mount() {
        let host = CallLog::default();
        let err = mount(&host, &(), &parse_str("a { bad }").unwrap()).unwrap_err();
        assert_eq!(err.to_string(), "rejected bad");
        assert!(!host.calls.borrow().iter().any(|c| c.starts_with("mount")));
    }

    const TRIANGLE_SCENE: &str = r#"
mesh {
    vertexBuffer {
        attributes: [
            { shaderLocation: 0 offset: 0 format: float32x4 }
            { shaderLocation: 1 offset: 16 format: float32x4 }
        ]
        arrayStride: 32
        stepMode: vertex
        vertexCount: 3
        vertices: [
             0.0,  0.6, 0, 1,  1, 0, 0, 1
            -0.5, -0.6, 0, 1,  0, 1, 0, 1
             0.5, -0.6, 0, 1,  0, 0, 1, 1
        ]
    }
    shaders { code: "@vertex fn vertex_main() {} @fragment fn fragment_main() {}" }
}
"#;

    fn gpu_host() -> GpuHost<RecordingDevice> {
        GpuHost::new(Rc::new(RecordingDevice::default()), HostOptions::default(), Span::none())
    }

    #[test]
    fn triangle_scene_draws_once_per_commit() {
        let host = gpu_host();
        let ctx = host.context().clone();
        let scene = mount(&host, &ctx, &parse_str(TRIANGLE_SCENE).unwrap()).unwrap();

        assert_eq!(ctx.pipeline_count(), 1);
        assert_eq!(ctx.draws(), vec![(0..3, 0..1)]);
        let mesh = scene.roots()[0].instance.as_mesh().unwrap();
        assert_eq!(mesh.vertex_buffers().len(), 1);
        assert!(mesh.shader_module().is_some());

        scene.recommit(&host, &ctx).unwrap();
        assert_eq!(ctx.pipeline_count(), 2);
        assert_eq!(ctx.submit_count(), 2);
        // The tree is not rebuilt: buffers and modules were created once.
        let buffers = ctx.events().iter().filter(|e| matches!(e, GpuEvent::CreateBuffer { .. })).count();
        assert_eq!(buffers, 1);
    }

    #[test]
    fn mesh_without_shaders_fails_the_mount() {
        let host = gpu_host();
        let ctx = host.context().clone();
        let doc = parse_str("mesh { vertexBuffer { arrayStride: 4 vertexCount: 1 vertices: [0] } }").unwrap();
        assert!(matches!(mount(&host, &ctx, &doc), Err(HostError::IncompleteMesh)));
        assert_eq!(ctx.submit_count(), 0);
    }

    #[test]
    fn unknown_tag_fails_the_mount() {
        let host = gpu_host();
        let ctx = host.context().clone();
        let err = mount(&host, &ctx, &parse_str("mesh { paragraph }").unwrap()).unwrap_err();
        assert!(matches!(err, HostError::UnsupportedElementKind(tag) if tag == "paragraph"));
        assert!(ctx.events().is_empty());
    }
}
