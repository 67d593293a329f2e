//! # Voxel World
//!
//! This module contains the block-level world model the mesh scheduler
//! streams from.
//!
//! ## Architecture
//!
//! The voxel system is organized into several key components:
//!
//! * **Block**: Block types, faces and the one-byte block value
//! * **Chunk**: Fixed-size 16x16x16 block arrays, their flags and immutable snapshots
//! * **Coordinate**: The single world-position to chunk-coordinate mapping
//! * **Generator**: Deterministic noise fields and terrain layering
//! * **World**: Loaded chunks, edits, eviction and the `ChunkStore` contract
//! * **Persistence**: Saving and loading edited chunks
//! * **Tasks**: Background chunk generation on the worker pool
//!
//! ## Data Flow
//!
//! 1. The world requests missing chunks around the viewpoint (persistence, then generation tasks)
//! 2. Edits mutate chunks on the frame thread and mark them dirty and modified
//! 3. The mesh scheduler snapshots chunks and builds geometry from the snapshots
//! 4. Modified chunks are saved periodically and when they are evicted
//!
//! ## Thread Safety
//!
//! Chunks themselves are never shared. Workers receive either a copy of the
//! terrain generator or an immutable [`chunk::ChunkSnapshot`].

pub mod block;
pub mod chunk;
pub mod coordinate;
pub mod generator;
pub mod persistence;
pub mod tasks;
pub mod world;
