//! Built-in algorithms.
//!
//! - [`DataInject`] - entry point for externally produced data
//! - [`TriangleNormals`] - per-vertex normals for triangle meshes
//! - [`RenderTriangles`], [`RenderLines`] - visualizations

pub mod data_inject;
pub mod render;
pub mod triangle_normals;

pub use data_inject::{DataInject, Injector};
pub use render::{RenderLines, RenderStats, RenderTriangles, VertexBuffer};
pub use triangle_normals::TriangleNormals;
