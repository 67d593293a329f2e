//! Rendering side of the voxel engine.
//!
//! This module turns chunk state into geometry a renderer can draw: the
//! texture mapping, the vertex format, the background mesh build task and the
//! scheduler that keeps the mesh cache in step with the world. Drawing itself
//! belongs to whoever consumes [`meshing::ChunkMeshScheduler::current_frame_batches`].

pub mod meshing;
pub mod tasks;
pub mod texture;
mod vertex;

// Re-export commonly used types
pub use vertex::Vertex;
