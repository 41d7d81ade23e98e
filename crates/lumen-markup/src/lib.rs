//! Lexer, parser, and AST for the **Lumen Scene Markup** (`.lsm`).
//!
//! An `.lsm` file is the declarative scene surface rendered by `lumen-engine`:
//! a tree of tagged elements, each carrying an untyped property bag. This crate
//! knows nothing about what the tags mean; it only produces the tree.
//!
//! # Structure
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`ast`] | `SceneDocument`, `Node`, `Props`, `Prop`, `Value` |
//! | [`error`] | `ParseError` |
//! | [`lexer`] | `Lexer`, `Token` |
//! | [`parser`] | `parse_str` entry point |
//!
//! # Quick start
//!
//! ```rust
//! use lumen_markup::parse_str;
//!
//! let src = r#"
//!     mesh {
//!         vertexBuffer {
//!             arrayStride: 8
//!             vertexCount: 1
//!             vertices: [0.0, 1.0]
//!         }
//!     }
//! "#;
//!
//! let doc = parse_str(src).unwrap();
//! assert_eq!(doc.roots[0].tag, "mesh");
//! assert_eq!(doc.roots[0].children[0].tag, "vertexBuffer");
//! ```

pub mod ast;
pub mod error;
pub mod lexer;
pub mod parser;

pub use ast::{Node, Prop, Props, SceneDocument, Value};
pub use error::ParseError;
pub use parser::parse_str;
