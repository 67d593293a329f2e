//! # Engine State Module
//!
//! The frame coordinator of the streaming engine.
//!
//! ## Key Components
//!
//! * `EngineState` - Owns every subsystem and runs them once per frame
//! * `rendering` - Texture mapping, geometry and the chunk mesh scheduler
//! * `task_management` - The worker pool shared by generation and mesh builds
//! * `voxels` - Blocks, chunks, terrain generation, the world and persistence
//!
//! ## Frame Order
//!
//! 1. Free workers whose tasks finished and hand them queued tasks
//! 2. Request chunks around the viewpoint when it enters a new chunk, evicting far ones
//! 3. Install a bounded number of generated chunks
//! 4. Report the chunks edited since the last frame as priority chunks
//! 5. Run the mesh scheduler
//! 6. Save modified chunks when the save interval has passed
//!
//! Nothing in a frame returns an error: failures are logged and the frame
//! carries on with fewer chunks.

use std::{sync::Arc, time::Duration};

use cgmath::Point3;
use log::{info, warn};
use rendering::{
    meshing::{ChunkMeshScheduler, FrameReport, RenderBatch},
    texture::TextureAtlas,
};
use task_management::TaskManager;
use voxels::{
    block::{block_type::BlockType, Block},
    coordinate::{coordinates_within_radius, ChunkCoordinate},
    generator::TerrainGenerator,
    persistence::{ChunkPersistence, JsonDirectoryPersistence, MemoryPersistence},
    world::World,
};

use crate::{
    config::StreamingConfig,
    error::{PersistenceError, WorldError},
};

pub mod rendering;
pub mod task_management;
pub mod voxels;

/// The main state container of the streaming engine.
///
/// # Examples
///
/// ```rust,ignore
/// let mut engine_state = EngineState::new(StreamingConfig::default())?;
///
/// // Main loop
/// loop {
///     engine_state.frame(viewpoint);
///     for batch in engine_state.render_batches() {
///         // draw batch
///     }
/// }
/// ```
pub struct EngineState {
    /// Tunables the engine was created with
    config: StreamingConfig,
    /// The voxel world containing all chunk data
    pub world: World,
    /// Task manager for background generation and mesh builds
    pub task_manager: TaskManager,
    /// Decides which chunk meshes get rebuilt and where
    pub mesh_scheduler: ChunkMeshScheduler,
    /// Chunk the viewpoint was in during the last frame
    current_chunk_position: Option<ChunkCoordinate>,
    /// Chunks edited since the last frame
    edited_chunks: Vec<ChunkCoordinate>,
    /// When modified chunks were last saved
    last_save: web_time::Instant,
}

impl EngineState {
    /// Creates the engine and loads the chunks around the world origin.
    ///
    /// The spawn area is generated and meshed on the calling thread so the
    /// first frame already has geometry.
    ///
    /// # Errors
    /// Fails if the configured save directory can't be created.
    pub fn new(config: StreamingConfig) -> Result<Self, PersistenceError> {
        let persistence: Box<dyn ChunkPersistence> = match &config.save_directory {
            Some(directory) => Box::new(JsonDirectoryPersistence::new(directory)?),
            None => Box::new(MemoryPersistence::new()),
        };

        let atlas = Arc::new(TextureAtlas::default());
        let mut world = World::new(TerrainGenerator::new(config.seed), persistence);
        let mut task_manager = TaskManager::new(config.worker_count);
        let mut mesh_scheduler = ChunkMeshScheduler::new(&config, atlas);

        let spawn = ChunkCoordinate::new(0, 0);
        for position in coordinates_within_radius(spawn, config.render_distance) {
            world.generate_chunk_sync(position);
        }
        let built = mesh_scheduler.build_initial(&mut world, &mut task_manager);
        info!(
            "Spawn area ready: {} chunks loaded, {} meshed",
            world.loaded_count(),
            built
        );

        Ok(EngineState {
            config,
            world,
            task_manager,
            mesh_scheduler,
            current_chunk_position: None,
            edited_chunks: Vec::new(),
            last_save: web_time::Instant::now(),
        })
    }

    /// The configuration the engine runs with.
    pub fn config(&self) -> &StreamingConfig {
        &self.config
    }

    /// Processes completed and queued tasks
    ///
    /// This method should be called each frame, before anything publishes new
    /// tasks, so finished workers can take the next ones.
    pub fn process_tasks(&mut self) {
        self.task_manager.process_completed_tasks();
        self.task_manager.process_queued_tasks();
    }

    /// Runs one frame for a viewpoint at `viewpoint`.
    pub fn frame(&mut self, viewpoint: Point3<f32>) -> FrameReport {
        self.process_tasks();

        let chunk_position = ChunkCoordinate::from_world_position(viewpoint);
        if self.current_chunk_position != Some(chunk_position) {
            self.world.generate_chunks_around(
                chunk_position,
                self.config.load_radius,
                &mut self.task_manager,
            );
            let unloaded = self
                .world
                .unload_outside(chunk_position, self.config.load_radius);
            self.mesh_scheduler.evict(unloaded, &mut self.task_manager);
            self.current_chunk_position = Some(chunk_position);
        }

        self.world
            .process_generated(self.config.max_generated_chunks_per_frame);

        self.mesh_scheduler
            .set_priority_chunks(self.edited_chunks.drain(..));
        let report = self
            .mesh_scheduler
            .update(viewpoint, &mut self.world, &mut self.task_manager);

        if self.last_save.elapsed() >= Duration::from_secs(self.config.save_interval_secs) {
            self.save();
        }

        report
    }

    /// The draws of the current frame, grouped by texture.
    pub fn render_batches(&self) -> Vec<RenderBatch> {
        self.mesh_scheduler.current_frame_batches()
    }

    /// Breaks the block at a world block position.
    ///
    /// The chunk is rebuilt synchronously in the next frame.
    pub fn break_block(&mut self, position: Point3<i32>) -> Result<ChunkCoordinate, WorldError> {
        let chunk_position = self.world.break_block(position)?;
        self.edited_chunks.push(chunk_position);
        Ok(chunk_position)
    }

    /// Places a block at a world block position.
    ///
    /// The chunk is rebuilt synchronously in the next frame.
    pub fn place_block(
        &mut self,
        position: Point3<i32>,
        block_type: BlockType,
    ) -> Result<ChunkCoordinate, WorldError> {
        let chunk_position = self.world.place_block(position, block_type)?;
        self.edited_chunks.push(chunk_position);
        Ok(chunk_position)
    }

    /// Overwrites the block at a world block position.
    pub fn set_block(
        &mut self,
        position: Point3<i32>,
        block: Block,
    ) -> Result<ChunkCoordinate, WorldError> {
        let chunk_position = self.world.set_block(position, block)?;
        self.edited_chunks.push(chunk_position);
        Ok(chunk_position)
    }

    /// Saves every modified chunk now.
    ///
    /// # Returns
    /// The number of chunks saved. Failures are logged and retried on the
    /// next save.
    pub fn save(&mut self) -> usize {
        self.last_save = web_time::Instant::now();
        match self.world.save_modified_chunks() {
            Ok(saved) => saved,
            Err(error) => {
                warn!("Saving modified chunks failed: {}", error);
                0
            }
        }
    }

    /// Cancels background work, saves edits and stops the workers.
    pub fn shutdown(&mut self) {
        self.mesh_scheduler.cleanup(&mut self.task_manager);
        self.world.cancel_generation();
        self.save();
        self.task_manager.shutdown();
        info!("Engine shut down");
    }
}
