//! # Chunk Generation Task
//!
//! This module defines the `ChunkGenerationTask` which handles asynchronous
//! generation of chunk data. It is scheduled when chunks inside the load
//! radius are neither loaded nor saved, typically as the viewpoint moves.

use crate::{
    engine_state::{
        task_management::task::{task_pair, Task, TaskCompleter, TaskHandle},
        voxels::{chunk::Chunk, coordinate::ChunkCoordinate, generator::TerrainGenerator},
    },
    error::BuildError,
};

/// A task that generates chunk data asynchronously.
///
/// The task owns a copy of the generator, so it never touches the world; the
/// generated chunk is handed back through the task's completer and installed
/// by the world on the frame thread.
pub struct ChunkGenerationTask {
    /// The seeded terrain generator
    generator: TerrainGenerator,
    /// The position of the chunk to generate (in chunk coordinates)
    position: ChunkCoordinate,
    /// Where the generated chunk goes
    completer: TaskCompleter<Chunk>,
}

impl ChunkGenerationTask {
    /// Creates a new chunk generation task and the handle to collect its chunk.
    ///
    /// # Arguments
    /// * `generator` - The terrain generator of the world
    /// * `position` - The chunk coordinates where the chunk should be generated
    pub fn new(generator: TerrainGenerator, position: ChunkCoordinate) -> (Self, TaskHandle<Chunk>) {
        let (handle, completer) = task_pair();
        (
            ChunkGenerationTask {
                generator,
                position,
                completer,
            },
            handle,
        )
    }
}

impl Task for ChunkGenerationTask {
    fn name(&self) -> &'static str {
        "chunk generation"
    }

    fn is_cancelled(&self) -> bool {
        self.completer.is_cancelled()
    }

    /// Generates the chunk on the worker thread.
    fn process(&mut self) {
        let chunk = self.generator.generate_chunk(self.position);
        if self.completer.is_cancelled() {
            self.completer.complete(Err(BuildError::Cancelled));
        } else {
            self.completer.complete(Ok(chunk));
        }
    }

    fn abandon(&mut self, error: BuildError) {
        self.completer.complete(Err(error));
    }
}
