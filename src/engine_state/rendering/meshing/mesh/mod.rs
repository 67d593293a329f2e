//! Mesh generation for voxel rendering.
//!
//! This module converts chunk snapshots into GPU-friendly geometry grouped by
//! texture, so a renderer can draw every chunk's faces of one texture before
//! switching to the next.
//!
//! # Architecture
//! - [`MeshGeometry`]: A chunk's geometry as `(texture, batch)` pairs
//! - [`VertexBatch`]: Vertices and indices of the faces sharing one texture
//! - [`Face`]: A single quad face of a voxel
//! - [`build_geometry`]: The culled-face mesher

mod face;
#[allow(clippy::module_inception)]
mod mesh;

pub use face::Face;
pub use mesh::*;
