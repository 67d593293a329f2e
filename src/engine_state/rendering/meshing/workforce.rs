//! The contract between the mesh scheduler and whatever runs its builds.

use std::sync::Arc;

use crate::engine_state::{
    rendering::{tasks::chunk_mesh_generation_task::ChunkMeshGenerationTask, texture::TextureAtlas},
    task_management::{task::TaskHandle, TaskManager},
    voxels::{chunk::ChunkSnapshot, coordinate::ChunkCoordinate},
};

use super::mesh::MeshGeometry;

/// Runs mesh builds off the frame thread.
///
/// Builds never touch scheduler state; their only way back is the returned
/// handle. Cancellation is best effort: a cancelled build may still complete.
pub trait MeshBuildWorkforce {
    /// Starts building the geometry of `snapshot`. A busy workforce queues the
    /// build rather than refusing it.
    fn submit(
        &mut self,
        coordinate: ChunkCoordinate,
        snapshot: Arc<ChunkSnapshot>,
        atlas: Arc<TextureAtlas>,
    ) -> TaskHandle<MeshGeometry>;

    /// Asks the build behind `handle` to stop.
    fn cancel(&mut self, handle: &TaskHandle<MeshGeometry>) {
        handle.cancel();
    }

    /// Drops every build that hasn't started yet.
    fn cancel_all(&mut self);

    /// Stops the workforce. Nothing may be submitted afterwards.
    fn shutdown(&mut self);
}

impl MeshBuildWorkforce for TaskManager {
    fn submit(
        &mut self,
        _coordinate: ChunkCoordinate,
        snapshot: Arc<ChunkSnapshot>,
        atlas: Arc<TextureAtlas>,
    ) -> TaskHandle<MeshGeometry> {
        let (task, handle) = ChunkMeshGenerationTask::new(snapshot, atlas);
        self.publish_task(Box::new(task));
        handle
    }

    fn cancel_all(&mut self) {
        TaskManager::cancel_all(self);
    }

    fn shutdown(&mut self) {
        TaskManager::shutdown(self);
    }
}
