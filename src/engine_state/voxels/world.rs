//! # World Module
//!
//! This module provides the `World` struct which manages the loaded chunks of
//! the voxel world. It is the central coordinator for chunk loading,
//! unloading, editing and saving, and the [`ChunkStore`] the mesh scheduler
//! reads from.
//!
//! ## Architecture
//!
//! The world uses sparse storage: only chunks within the load radius of the
//! viewpoint are kept in memory, which allows effectively infinite worlds.
//!
//! ## Chunk Sources
//!
//! A chunk that enters the load radius comes from, in order:
//! 1. Persistence, if it was edited and saved earlier
//! 2. A background [`ChunkGenerationTask`] on the shared worker pool
//! 3. Inline generation via [`World::generate_chunk_sync`], used for the spawn area
//!
//! ## Edits
//!
//! Edits happen on the frame thread only. Each effective edit marks the chunk
//! dirty (geometry stale) and modified (needs saving) and returns the chunk
//! coordinate so the edit layer can report it to the mesh scheduler.

use std::collections::{HashMap, HashSet};

use cgmath::Point3;
use log::{debug, info, warn};

use crate::{
    engine_state::task_management::{task::TaskHandle, TaskManager},
    error::{BuildError, PersistenceError, WorldError},
};

use super::{
    block::{block_type::BlockType, Block},
    chunk::{Chunk, CHUNK_DIMENSION},
    coordinate::{coordinates_within_radius, split_block_position, ChunkCoordinate},
    generator::TerrainGenerator,
    persistence::ChunkPersistence,
    tasks::chunk_generation_task::ChunkGenerationTask,
};

/// Read access to loaded chunks plus the dirty-flag bookkeeping the mesh
/// scheduler needs.
pub trait ChunkStore {
    /// The loaded chunk at `position`, if any.
    fn chunk_at(&self, position: ChunkCoordinate) -> Option<&Chunk>;

    /// Whether the chunk's geometry is stale. Unloaded chunks are never dirty.
    fn is_dirty(&self, position: ChunkCoordinate) -> bool {
        self.chunk_at(position).is_some_and(Chunk::is_dirty)
    }

    /// Clears the dirty flag after a successful rebuild.
    fn mark_clean(&mut self, position: ChunkCoordinate);

    /// Number of solid blocks, 0 for unloaded chunks.
    fn visible_block_count(&self, position: ChunkCoordinate) -> usize {
        self.chunk_at(position)
            .map_or(0, Chunk::visible_block_count)
    }

    /// Every loaded chunk, in coordinate order.
    fn loaded_chunks(&self) -> Vec<&Chunk>;
}

/// Represents a voxel world composed of multiple chunks.
///
/// The world is a sparse 2D grid of 16x16x16 chunk columns. Chunks are loaded
/// on demand as the viewpoint moves and evicted again when it moves away.
pub struct World {
    /// A mapping from chunk coordinates to chunk data.
    chunks: HashMap<ChunkCoordinate, Chunk>,
    /// Seeded generator shared (by copy) with generation tasks
    generator: TerrainGenerator,
    /// Where edited chunks are saved and loaded from
    persistence: Box<dyn ChunkPersistence>,
    /// Generation tasks in flight
    pending_generation: HashMap<ChunkCoordinate, TaskHandle<Chunk>>,
    /// Coordinates whose generation failed; not retried until they are unloaded
    failed_generation: HashSet<ChunkCoordinate>,
}

impl World {
    /// Creates a new, empty world.
    ///
    /// # Arguments
    /// * `generator` - The terrain generator for chunks that were never saved
    /// * `persistence` - The store for edited chunks
    pub fn new(generator: TerrainGenerator, persistence: Box<dyn ChunkPersistence>) -> Self {
        World {
            chunks: HashMap::new(),
            generator,
            persistence,
            pending_generation: HashMap::new(),
            failed_generation: HashSet::new(),
        }
    }

    /// The world's terrain generator.
    pub fn generator(&self) -> &TerrainGenerator {
        &self.generator
    }

    /// Number of loaded chunks.
    pub fn loaded_count(&self) -> usize {
        self.chunks.len()
    }

    /// Whether the chunk at `position` is loaded.
    pub fn is_loaded(&self, position: ChunkCoordinate) -> bool {
        self.chunks.contains_key(&position)
    }

    /// Number of generation tasks that haven't been installed yet.
    pub fn pending_generation_count(&self) -> usize {
        self.pending_generation.len()
    }

    /// Installs a chunk, replacing whatever was loaded at its position.
    #[cfg(test)]
    pub fn insert_chunk(&mut self, chunk: Chunk) {
        if let Some(handle) = self.pending_generation.remove(&chunk.position) {
            handle.cancel();
        }
        self.chunks.insert(chunk.position, chunk);
    }

    /// The block at a world block position, `None` if its chunk isn't loaded
    /// or the height is outside the chunk column.
    pub fn get_block(&self, position: Point3<i32>) -> Option<Block> {
        if !(0..CHUNK_DIMENSION).contains(&position.y) {
            return None;
        }
        let (chunk_position, local) = split_block_position(position);
        self.chunks
            .get(&chunk_position)
            .map(|chunk| chunk.get_block(local.x, local.y, local.z))
    }

    /// Replaces the block at a world block position.
    ///
    /// # Returns
    /// The coordinate of the edited chunk. Writing the block that is already
    /// there succeeds without marking anything.
    pub fn set_block(
        &mut self,
        position: Point3<i32>,
        block: Block,
    ) -> Result<ChunkCoordinate, WorldError> {
        if !(0..CHUNK_DIMENSION).contains(&position.y) {
            return Err(WorldError::OutOfBounds(position.y));
        }
        let (chunk_position, local) = split_block_position(position);
        let chunk = self
            .chunks
            .get_mut(&chunk_position)
            .ok_or(WorldError::ChunkNotLoaded(chunk_position))?;
        chunk.set_block(local, block);
        Ok(chunk_position)
    }

    /// Removes a solid block, leaving air.
    pub fn break_block(&mut self, position: Point3<i32>) -> Result<ChunkCoordinate, WorldError> {
        match self.get_block(position) {
            Some(block) if block.is_solid() => self.set_block(position, Block::AIR),
            Some(_) => Err(WorldError::NothingToBreak),
            None => Err(self.missing_block_error(position)),
        }
    }

    /// Places a block into an air position.
    pub fn place_block(
        &mut self,
        position: Point3<i32>,
        block_type: BlockType,
    ) -> Result<ChunkCoordinate, WorldError> {
        match self.get_block(position) {
            Some(block) if block.is_solid() => Err(WorldError::Occupied),
            Some(_) => self.set_block(position, Block::new(block_type)),
            None => Err(self.missing_block_error(position)),
        }
    }

    fn missing_block_error(&self, position: Point3<i32>) -> WorldError {
        if !(0..CHUNK_DIMENSION).contains(&position.y) {
            WorldError::OutOfBounds(position.y)
        } else {
            WorldError::ChunkNotLoaded(ChunkCoordinate::from_block_position(position))
        }
    }

    /// Loads a saved chunk, logging (and ignoring) persistence errors.
    fn load_saved(&mut self, position: ChunkCoordinate) -> Option<Chunk> {
        match self.persistence.load(position) {
            Ok(chunk) => chunk,
            Err(error) => {
                warn!("Couldn't load saved chunk {}: {}", position, error);
                None
            }
        }
    }

    /// Requests every missing chunk within `radius` of `center`.
    ///
    /// Saved chunks are loaded immediately; all others are published as
    /// generation tasks. Coordinates already pending or whose generation
    /// failed are skipped.
    ///
    /// # Returns
    /// The number of generation tasks published.
    pub fn generate_chunks_around(
        &mut self,
        center: ChunkCoordinate,
        radius: i32,
        task_manager: &mut TaskManager,
    ) -> usize {
        let mut requested = 0;
        for position in coordinates_within_radius(center, radius) {
            if self.chunks.contains_key(&position)
                || self.pending_generation.contains_key(&position)
                || self.failed_generation.contains(&position)
            {
                continue;
            }

            if let Some(chunk) = self.load_saved(position) {
                debug!("Loaded saved chunk {}", position);
                self.chunks.insert(position, chunk);
                continue;
            }

            let (task, handle) = ChunkGenerationTask::new(self.generator, position);
            task_manager.publish_task(Box::new(task));
            self.pending_generation.insert(position, handle);
            requested += 1;
        }
        requested
    }

    /// Installs finished generation tasks, at most `budget` per call.
    ///
    /// Finished tasks are installed in coordinate order, so the result doesn't
    /// depend on hash map iteration.
    ///
    /// # Returns
    /// The coordinates of the chunks that were installed.
    pub fn process_generated(&mut self, budget: usize) -> Vec<ChunkCoordinate> {
        let mut ready: Vec<ChunkCoordinate> = self
            .pending_generation
            .iter()
            .filter(|(_, handle)| handle.is_ready())
            .map(|(position, _)| *position)
            .collect();
        ready.sort();

        let mut installed = Vec::new();
        for position in ready.into_iter().take(budget) {
            let Some(mut handle) = self.pending_generation.remove(&position) else {
                continue;
            };
            match handle.take() {
                Some(Ok(chunk)) => {
                    self.chunks.entry(position).or_insert(chunk);
                    installed.push(position);
                }
                Some(Err(BuildError::Cancelled)) => {}
                Some(Err(error)) => {
                    warn!("Generating chunk {} failed: {}", position, error);
                    self.failed_generation.insert(position);
                }
                None => {}
            }
        }
        installed
    }

    /// Loads or generates a chunk inline on the calling thread.
    pub fn generate_chunk_sync(&mut self, position: ChunkCoordinate) -> &Chunk {
        if let Some(handle) = self.pending_generation.remove(&position) {
            handle.cancel();
        }
        self.failed_generation.remove(&position);

        if !self.chunks.contains_key(&position) {
            let chunk = self
                .load_saved(position)
                .unwrap_or_else(|| self.generator.generate_chunk(position));
            self.chunks.insert(position, chunk);
        }
        &self.chunks[&position]
    }

    /// Saves every chunk with unsaved edits.
    ///
    /// Every modified chunk is attempted even if an earlier one fails; chunks
    /// that failed stay modified and are retried on the next save.
    ///
    /// # Returns
    /// The number of chunks saved, or the first error encountered.
    pub fn save_modified_chunks(&mut self) -> Result<usize, PersistenceError> {
        let mut saved = 0;
        let mut first_error = None;

        let mut modified: Vec<ChunkCoordinate> = self
            .chunks
            .values()
            .filter(|chunk| chunk.is_modified())
            .map(|chunk| chunk.position)
            .collect();
        modified.sort();

        for position in modified {
            let Some(chunk) = self.chunks.get_mut(&position) else {
                continue;
            };
            match self.persistence.save(chunk) {
                Ok(()) => {
                    chunk.mark_saved();
                    saved += 1;
                }
                Err(error) => {
                    warn!("Couldn't save chunk {}: {}", position, error);
                    first_error.get_or_insert(error);
                }
            }
        }

        if saved > 0 {
            info!("Saved {} modified chunks", saved);
        }
        match first_error {
            Some(error) => Err(error),
            None => Ok(saved),
        }
    }

    /// Evicts chunks farther than `radius` from `center`, saving modified ones
    /// first. A chunk whose save fails stays loaded so its edits aren't lost.
    /// Pending generation outside the radius is cancelled.
    ///
    /// # Returns
    /// The coordinates that were unloaded.
    pub fn unload_outside(&mut self, center: ChunkCoordinate, radius: i32) -> Vec<ChunkCoordinate> {
        let radius_squared = radius as i64 * radius as i64;
        let outside = |position: &ChunkCoordinate| position.distance_squared(&center) > radius_squared;

        self.pending_generation.retain(|position, handle| {
            if outside(position) {
                handle.cancel();
                false
            } else {
                true
            }
        });
        self.failed_generation.retain(|position| !outside(position));

        let mut evicted: Vec<ChunkCoordinate> =
            self.chunks.keys().copied().filter(|p| outside(p)).collect();
        evicted.sort();

        let mut unloaded = Vec::with_capacity(evicted.len());
        for position in evicted {
            let Some(chunk) = self.chunks.get(&position) else {
                continue;
            };
            if chunk.is_modified() {
                if let Err(error) = self.persistence.save(chunk) {
                    warn!("Keeping chunk {} loaded, save failed: {}", position, error);
                    continue;
                }
            }
            self.chunks.remove(&position);
            unloaded.push(position);
        }

        if !unloaded.is_empty() {
            debug!("Unloaded {} chunks", unloaded.len());
        }
        unloaded
    }

    /// Cancels every generation task in flight.
    pub fn cancel_generation(&mut self) {
        for (_, handle) in self.pending_generation.drain() {
            handle.cancel();
        }
    }
}

impl ChunkStore for World {
    fn chunk_at(&self, position: ChunkCoordinate) -> Option<&Chunk> {
        self.chunks.get(&position)
    }

    fn mark_clean(&mut self, position: ChunkCoordinate) {
        if let Some(chunk) = self.chunks.get_mut(&position) {
            chunk.mark_clean();
        }
    }

    fn loaded_chunks(&self) -> Vec<&Chunk> {
        let mut chunks: Vec<&Chunk> = self.chunks.values().collect();
        chunks.sort_by_key(|chunk| chunk.position);
        chunks
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use super::*;
    use crate::engine_state::voxels::persistence::MemoryPersistence;

    fn world() -> World {
        World::new(TerrainGenerator::new(12345), Box::new(MemoryPersistence::new()))
    }

    #[test]
    fn edits_mark_the_owning_chunk() {
        let mut world = world();
        world.insert_chunk(Chunk::empty(ChunkCoordinate::new(-1, 0)));

        let edited = world
            .place_block(Point3::new(-1, 5, 3), BlockType::STONE)
            .unwrap();
        assert_eq!(edited, ChunkCoordinate::new(-1, 0));
        assert!(world.is_dirty(edited));
        assert_eq!(world.visible_block_count(edited), 1);
        assert_eq!(
            world.get_block(Point3::new(-1, 5, 3)),
            Some(Block::new(BlockType::STONE))
        );

        assert_eq!(
            world.place_block(Point3::new(-1, 5, 3), BlockType::DIRT),
            Err(WorldError::Occupied)
        );
        assert_eq!(world.break_block(Point3::new(-1, 5, 3)), Ok(edited));
        assert_eq!(
            world.break_block(Point3::new(-1, 5, 3)),
            Err(WorldError::NothingToBreak)
        );
    }

    #[test]
    fn edits_outside_loaded_chunks_fail() {
        let mut world = world();
        assert_eq!(
            world.break_block(Point3::new(40, 2, 40)),
            Err(WorldError::ChunkNotLoaded(ChunkCoordinate::new(2, 2)))
        );
        world.insert_chunk(Chunk::empty(ChunkCoordinate::new(0, 0)));
        assert_eq!(
            world.place_block(Point3::new(0, 16, 0), BlockType::DIRT),
            Err(WorldError::OutOfBounds(16))
        );
        assert_eq!(
            world.set_block(Point3::new(0, -1, 0), Block::AIR),
            Err(WorldError::OutOfBounds(-1))
        );
    }

    #[test]
    fn sync_generation_matches_generator() {
        let mut world = world();
        let position = ChunkCoordinate::new(3, 4);
        let expected = TerrainGenerator::new(12345).generate_chunk(position);
        assert_eq!(world.generate_chunk_sync(position).blocks(), expected.blocks());
        assert!(!world.is_dirty(position));
    }

    #[test]
    fn evicted_edits_come_back_from_persistence() {
        let mut world = world();
        let position = ChunkCoordinate::new(5, 0);
        world.generate_chunk_sync(position);
        world.generate_chunk_sync(ChunkCoordinate::new(0, 0));
        world.set_block(Point3::new(80, 0, 0), Block::new(BlockType::SNOW)).unwrap();

        let unloaded = world.unload_outside(ChunkCoordinate::new(0, 0), 2);
        assert_eq!(unloaded, vec![position]);
        assert!(world.is_loaded(ChunkCoordinate::new(0, 0)));

        let reloaded = world.generate_chunk_sync(position);
        assert_eq!(
            reloaded.get_block(0, 0, 0),
            Block::new(BlockType::SNOW)
        );
        assert!(!reloaded.is_modified());
    }

    #[test]
    fn save_clears_modified_flags() {
        let mut world = world();
        world.generate_chunk_sync(ChunkCoordinate::new(0, 0));
        world.generate_chunk_sync(ChunkCoordinate::new(1, 0));
        world.set_block(Point3::new(3, 15, 3), Block::new(BlockType::STONE)).unwrap();

        assert_eq!(world.save_modified_chunks().unwrap(), 1);
        assert_eq!(world.save_modified_chunks().unwrap(), 0);
        // Saving doesn't touch the mesh flag
        assert!(world.is_dirty(ChunkCoordinate::new(0, 0)));
    }

    #[test]
    fn background_generation_installs_within_budget() {
        let mut world = world();
        let mut task_manager = TaskManager::new(2);
        let center = ChunkCoordinate::new(0, 0);

        let requested = world.generate_chunks_around(center, 2, &mut task_manager);
        assert_eq!(requested, 13);
        assert_eq!(world.generate_chunks_around(center, 2, &mut task_manager), 0);

        let deadline = Instant::now() + Duration::from_secs(20);
        while world.loaded_count() < 13 {
            task_manager.process_completed_tasks();
            task_manager.process_queued_tasks();
            let installed = world.process_generated(4);
            assert!(installed.len() <= 4);
            assert!(Instant::now() < deadline, "generation never finished");
            std::thread::sleep(Duration::from_millis(1));
        }
        assert_eq!(world.pending_generation_count(), 0);
        assert_eq!(world.loaded_chunks().len(), 13);
        assert!(world.loaded_chunks().iter().all(|chunk| !chunk.is_dirty()));
    }
}
