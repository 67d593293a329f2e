//! Task for building chunk geometry in a background thread.
//!
//! This module contains the `ChunkMeshGenerationTask` which runs the mesher on
//! a chunk snapshot. This keeps the frame thread responsive while geometry for
//! newly visible chunks is built.

use std::sync::Arc;

use log::trace;

use crate::{
    engine_state::{
        rendering::{meshing::build_geometry, meshing::MeshGeometry, texture::TextureAtlas},
        task_management::task::{task_pair, Task, TaskCompleter, TaskHandle},
        voxels::chunk::ChunkSnapshot,
    },
    error::BuildError,
};

/// A task that builds the geometry of one chunk snapshot.
///
/// Cancellation is checked before and after the build. A build that finishes
/// after its handle was cancelled reports `Cancelled` rather than its geometry.
pub struct ChunkMeshGenerationTask {
    /// Immutable copy of the chunk's blocks
    snapshot: Arc<ChunkSnapshot>,
    /// Shared, read-only texture mapping
    atlas: Arc<TextureAtlas>,
    /// Where the geometry goes
    completer: TaskCompleter<MeshGeometry>,
}

impl ChunkMeshGenerationTask {
    /// Creates a new mesh build task and the handle to collect its geometry.
    ///
    /// # Arguments
    /// * `snapshot` - The chunk state to mesh
    /// * `atlas` - The texture mapping
    pub fn new(
        snapshot: Arc<ChunkSnapshot>,
        atlas: Arc<TextureAtlas>,
    ) -> (Self, TaskHandle<MeshGeometry>) {
        let (handle, completer) = task_pair();
        (
            ChunkMeshGenerationTask {
                snapshot,
                atlas,
                completer,
            },
            handle,
        )
    }
}

impl Task for ChunkMeshGenerationTask {
    fn name(&self) -> &'static str {
        "chunk mesh build"
    }

    fn is_cancelled(&self) -> bool {
        self.completer.is_cancelled()
    }

    /// Builds the geometry on the worker thread.
    fn process(&mut self) {
        if self.completer.is_cancelled() {
            self.completer.complete(Err(BuildError::Cancelled));
            return;
        }

        let result = build_geometry(&self.snapshot, &self.atlas);

        if self.completer.is_cancelled() {
            trace!(
                "Mesh build for {} finished after cancellation",
                self.snapshot.position
            );
            self.completer.complete(Err(BuildError::Cancelled));
        } else {
            self.completer.complete(result);
        }
    }

    fn abandon(&mut self, error: BuildError) {
        self.completer.complete(Err(error));
    }
}

#[cfg(test)]
mod tests {
    use cgmath::Point3;

    use super::*;
    use crate::engine_state::voxels::{
        block::{block_type::BlockType, Block},
        chunk::Chunk,
        coordinate::ChunkCoordinate,
    };

    fn snapshot() -> Arc<ChunkSnapshot> {
        let mut chunk = Chunk::empty(ChunkCoordinate::new(0, 0));
        chunk.set_block(Point3::new(1, 1, 1), Block::new(BlockType::SAND));
        chunk.snapshot()
    }

    #[test]
    fn builds_the_same_geometry_as_inline() {
        let snapshot = snapshot();
        let atlas = Arc::new(TextureAtlas::default());
        let (mut task, mut handle) = ChunkMeshGenerationTask::new(snapshot.clone(), atlas.clone());
        task.process();
        let geometry = handle.take().unwrap().unwrap();
        assert_eq!(geometry, build_geometry(&snapshot, &atlas).unwrap());
    }

    #[test]
    fn cancelled_before_start_builds_nothing() {
        let (mut task, mut handle) =
            ChunkMeshGenerationTask::new(snapshot(), Arc::new(TextureAtlas::default()));
        handle.cancel();
        task.process();
        assert_eq!(handle.take().map(|r| r.err()), Some(Some(BuildError::Cancelled)));
    }
}
