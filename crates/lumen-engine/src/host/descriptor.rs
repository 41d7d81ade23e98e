//! Plain resource descriptors carried by `vertexBuffer` and `shaders` elements.

use std::fmt;
use std::rc::Rc;

pub use crate::render::VertexLayout;

/// Zero-argument producer of flat vertex data.
///
/// Invoked once, when the owning element attaches to a mesh.
#[derive(Clone)]
pub struct VertexProducer(Rc<dyn Fn() -> Vec<f32>>);

impl VertexProducer {
    pub fn new(f: impl Fn() -> Vec<f32> + 'static) -> Self {
        Self(Rc::new(f))
    }

    /// Producer replaying a fixed array.
    pub fn from_vec(data: Vec<f32>) -> Self {
        Self::new(move || data.clone())
    }

    pub fn produce(&self) -> Vec<f32> {
        (self.0)()
    }
}

impl fmt::Debug for VertexProducer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("VertexProducer(..)")
    }
}

/// Vertex buffer element payload.
#[derive(Debug, Clone)]
pub struct VertexBufferDescriptor {
    pub layout: VertexLayout,
    pub vertex_count: u32,
    pub vertices: VertexProducer,
}

impl VertexBufferDescriptor {
    pub fn new(layout: VertexLayout, vertex_count: u32, vertices: VertexProducer) -> Self {
        Self { layout, vertex_count, vertices }
    }

    /// `array_stride * vertex_count`: the byte length the produced data should have.
    pub fn expected_byte_len(&self) -> u64 {
        self.layout.array_stride * u64::from(self.vertex_count)
    }
}

/// Shader program element payload: WGSL source with `vertex_main` and
/// `fragment_main` entry points.
#[derive(Debug, Clone, PartialEq)]
pub struct ShaderDescriptor {
    pub code: String,
}

impl ShaderDescriptor {
    pub fn new(code: impl Into<String>) -> Self {
        Self { code: code.into() }
    }
}
