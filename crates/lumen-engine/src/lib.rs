//! Lumen engine crate.
//!
//! Compiles a declarative scene of `mesh`, `vertexBuffer` and `shaders`
//! elements into wgpu pipelines and draw submissions, and owns the
//! window + GPU runtime that hosts it.

pub mod core;
pub mod device;
pub mod host;
pub mod logging;
pub mod render;
pub mod window;

pub use lumen_markup as markup;
