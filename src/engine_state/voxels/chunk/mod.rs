//! # Chunk Module
//!
//! This module provides the `Chunk` struct and related functionality for managing
//! 16x16x16 blocks of voxel data, plus the immutable `ChunkSnapshot` handed to
//! mesh workers.
//!
//! ## Storage
//!
//! - `blocks`: a dense array addressed by `x + 16 * (y + 16 * z)`
//! - `solid_array`: a padded bit vector (18³ bits) mirroring block solidity,
//!   with an always-air border so neighbour checks never go out of bounds
//! - `visible_blocks`: the cached number of solid blocks, for O(1) emptiness checks
//!
//! ## Lifecycle Flags
//!
//! - `dirty`: the block state changed since the last successful mesh build
//! - `modified`: the block state changed since the chunk was last persisted
//! - `revision`: bumped on every effective edit, carried by snapshots

use std::sync::Arc;

use bitvec::prelude::BitVec;
use cgmath::Point3;
use chunk_creation::ChunkCreationIterator;

use super::block::block_type::BlockType;
use super::block::Block;
use super::coordinate::ChunkCoordinate;

pub mod chunk_creation;
pub mod chunk_iteration;

/// The dimension (width, height, depth) of a chunk in blocks.
pub const CHUNK_DIMENSION: i32 = 16;
/// The number of blocks in a single 2D plane of a chunk (CHUNK_DIMENSION²).
pub const CHUNK_PLANE_SIZE: i32 = CHUNK_DIMENSION * CHUNK_DIMENSION;
/// The total number of blocks in a chunk (CHUNK_DIMENSION³).
pub const CHUNK_SIZE: usize = (CHUNK_PLANE_SIZE * CHUNK_DIMENSION) as usize;
/// The dimension of a chunk including an extra layer of blocks on each side for neighbor lookups.
pub const CHUNK_DIMENSION_WRAPPED: usize = (CHUNK_DIMENSION + 2) as usize;
/// The number of blocks in a wrapped 2D chunk plane.
pub const CHUNK_PLANE_SIZE_WRAPPED: usize = CHUNK_DIMENSION_WRAPPED * CHUNK_DIMENSION_WRAPPED;
/// The total number of blocks in a wrapped chunk.
pub const CHUNK_SIZE_WRAPPED: usize = CHUNK_PLANE_SIZE_WRAPPED * CHUNK_DIMENSION_WRAPPED;

/// Linear index of an in-chunk position in the dense block array.
pub fn block_index(x: usize, y: usize, z: usize) -> usize {
    x + CHUNK_DIMENSION as usize * (y + CHUNK_DIMENSION as usize * z)
}

/// Index into the padded solidity array. Accepts -1..=16 on every axis.
fn wrapped_index(x: i32, y: i32, z: i32) -> usize {
    (x + 1) as usize
        + CHUNK_DIMENSION_WRAPPED * (y + 1) as usize
        + CHUNK_PLANE_SIZE_WRAPPED * (z + 1) as usize
}

fn in_wrapped_bounds(x: i32, y: i32, z: i32) -> bool {
    let range = -1..=CHUNK_DIMENSION;
    range.contains(&x) && range.contains(&y) && range.contains(&z)
}

/// Represents a 16x16x16 collection of voxel blocks in the world.
///
/// Chunks are owned by the world and mutated only on the frame thread. Mesh
/// workers never see a `Chunk`; they receive a [`ChunkSnapshot`] instead.
#[derive(Debug, Clone)]
pub struct Chunk {
    /// The coordinate of this chunk on the horizontal chunk grid.
    pub position: ChunkCoordinate,
    blocks: Vec<Block>,
    solid_array: BitVec,
    visible_blocks: usize,
    modified: bool,
    dirty: bool,
    revision: u64,
}

impl Chunk {
    /// Creates a new, completely empty chunk (all blocks are air).
    pub fn empty(position: ChunkCoordinate) -> Self {
        ChunkCreationIterator::new(position).return_chunk()
    }

    /// Creates a chunk completely filled with one block type.
    pub fn solid(position: ChunkCoordinate, block_type: BlockType) -> Self {
        let mut cci = ChunkCreationIterator::new(position);
        for _ in 0..CHUNK_SIZE {
            cci.push_block_type(block_type);
        }
        cci.return_chunk()
    }

    /// Rebuilds a chunk from a dense block array, as stored by persistence.
    ///
    /// # Returns
    /// `None` if the array doesn't hold exactly one block per position.
    pub fn from_blocks(position: ChunkCoordinate, blocks: &[Block]) -> Option<Self> {
        if blocks.len() != CHUNK_SIZE {
            return None;
        }
        let mut cci = ChunkCreationIterator::new(position);
        for block in blocks {
            cci.push_block(*block);
        }
        Some(cci.return_chunk())
    }

    /// Gets the block at the specified chunk-relative coordinates.
    ///
    /// # Panics
    /// Panics if the coordinates are out of bounds.
    pub fn get_block(&self, x: usize, y: usize, z: usize) -> Block {
        self.blocks[block_index(x, y, z)]
    }

    /// Replaces the block at the given chunk-relative position.
    ///
    /// An effective change marks the chunk dirty and modified and bumps its
    /// revision. Writing the block that is already there changes nothing.
    ///
    /// # Returns
    /// The block that was previously at that position.
    ///
    /// # Panics
    /// Panics if the coordinates are out of bounds.
    pub fn set_block(&mut self, local: Point3<usize>, block: Block) -> Block {
        let index = block_index(local.x, local.y, local.z);
        let previous = self.blocks[index];
        if previous == block {
            return previous;
        }

        self.blocks[index] = block;
        match (previous.is_solid(), block.is_solid()) {
            (false, true) => self.visible_blocks += 1,
            (true, false) => self.visible_blocks -= 1,
            _ => {}
        }
        self.update_solid_array(local.x, local.y, local.z, block.is_solid());
        self.dirty = true;
        self.modified = true;
        self.revision += 1;
        previous
    }

    /// Checks if the block at the specified chunk-relative coordinates is solid.
    ///
    /// Coordinates one step outside the chunk are allowed and read as air.
    pub fn is_block_solid(&self, cx: i32, cy: i32, cz: i32) -> bool {
        in_wrapped_bounds(cx, cy, cz) && self.solid_array[wrapped_index(cx, cy, cz)]
    }

    /// Updates the solid state of a block in the padded solid array.
    fn update_solid_array(&mut self, cx: usize, cy: usize, cz: usize, solid_value: bool) {
        self.solid_array.set(
            wrapped_index(cx as i32, cy as i32, cz as i32),
            solid_value,
        );
    }

    /// Number of solid blocks in the chunk.
    pub fn visible_block_count(&self) -> usize {
        self.visible_blocks
    }

    /// Whether the chunk has anything to draw at all.
    pub fn has_visible_blocks(&self) -> bool {
        self.visible_blocks > 0
    }

    /// Whether the chunk's geometry is stale.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Whether the chunk has edits that haven't been persisted.
    pub fn is_modified(&self) -> bool {
        self.modified
    }

    /// Clears the dirty-for-mesh flag after a successful rebuild.
    pub fn mark_clean(&mut self) {
        self.dirty = false;
    }

    /// Clears the modified flag after the chunk was persisted.
    pub fn mark_saved(&mut self) {
        self.modified = false;
    }

    /// The edit counter of this chunk.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// The dense block array in storage order.
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Copies the block state into an immutable snapshot for a mesh build.
    ///
    /// The snapshot owns its data, so later edits to this chunk can't reach a
    /// build that is already running.
    pub fn snapshot(&self) -> Arc<ChunkSnapshot> {
        Arc::new(ChunkSnapshot {
            position: self.position,
            revision: self.revision,
            blocks: self.blocks.clone(),
            solid_array: self.solid_array.clone(),
            visible_blocks: self.visible_blocks,
        })
    }
}

/// An immutable copy of a chunk's block state at one revision.
#[derive(Debug, Clone)]
pub struct ChunkSnapshot {
    /// The chunk this snapshot was taken from
    pub position: ChunkCoordinate,
    /// The chunk revision at the time of the snapshot
    pub revision: u64,
    blocks: Vec<Block>,
    solid_array: BitVec,
    visible_blocks: usize,
}

impl ChunkSnapshot {
    /// Gets the block at the specified chunk-relative coordinates.
    ///
    /// # Panics
    /// Panics if the coordinates are out of bounds.
    pub fn get_block(&self, x: usize, y: usize, z: usize) -> Block {
        self.blocks[block_index(x, y, z)]
    }

    /// Solidity lookup, one step outside the chunk reads as air.
    pub fn is_block_solid(&self, cx: i32, cy: i32, cz: i32) -> bool {
        in_wrapped_bounds(cx, cy, cz) && self.solid_array[wrapped_index(cx, cy, cz)]
    }

    /// Number of solid blocks captured in the snapshot.
    pub fn visible_block_count(&self) -> usize {
        self.visible_blocks
    }

    /// Iterates over the solid blocks in storage order.
    pub fn solid_blocks(&self) -> chunk_iteration::ChunkBlockIterator<'_> {
        chunk_iteration::ChunkBlockIterator::new(&self.blocks)
    }
}
