//! # Chunk Creation Module
//!
//! This module provides the builder used by terrain generation and persistence
//! to populate a chunk block by block. It maintains the relationship between the
//! dense block array and the padded solidity bit vector while blocks are added.
//!
//! ## Padded Solidity
//!
//! The `ChunkCreationIterator` writes two structures:
//! 1. A dense vector (`blocks`) in `x + 16 * (y + 16 * z)` order
//! 2. A bit vector (`solid_array`) with a one-block border of air on every side
//!
//! The border lets the mesher look at `x - 1` or `z + 1` without bounds checks:
//! anything outside the chunk reads as air, so boundary faces are always kept.

use bitvec::vec::BitVec;

use crate::engine_state::voxels::{
    block::{block_type::BlockType, Block},
    coordinate::ChunkCoordinate,
};

use super::{Chunk, CHUNK_DIMENSION_WRAPPED, CHUNK_PLANE_SIZE_WRAPPED, CHUNK_SIZE, CHUNK_SIZE_WRAPPED};

/// A builder for creating and populating chunks in storage order.
///
/// Blocks must be pushed in the chunk's linear order (X fastest, then Y, then Z).
/// The builder keeps the padded `solid_array` and the visible block count
/// consistent with the pushed blocks.
pub struct ChunkCreationIterator {
    /// The coordinate of the chunk being created
    position: ChunkCoordinate,
    /// Bit vector where each bit represents whether a block is solid (1) or air (0)
    ///
    /// This is stored with padding (CHUNK_DIMENSION_WRAPPED) to simplify neighbor lookups.
    solid_array: BitVec,
    /// Dense block storage, one entry per position
    blocks: Vec<Block>,
    /// Number of solid blocks pushed so far
    visible_blocks: usize,
    /// Current X position within the chunk (1..CHUNK_DIMENSION_WRAPPED-1)
    ///
    /// Note the 1-based indexing to account for the padding in the solid array.
    local_x: usize,
    /// Current Y position within the chunk (1..CHUNK_DIMENSION_WRAPPED-1)
    local_y: usize,
    /// Current Z position within the chunk (1..CHUNK_DIMENSION_WRAPPED-1)
    local_z: usize,
}

impl ChunkCreationIterator {
    /// Creates a new `ChunkCreationIterator` for building a chunk at the given position.
    pub fn new(position: ChunkCoordinate) -> Self {
        let mut solid_array = BitVec::with_capacity(CHUNK_SIZE_WRAPPED);
        // Padding for the first plane, the first row and the first column
        for _ in 0..(CHUNK_PLANE_SIZE_WRAPPED + CHUNK_DIMENSION_WRAPPED + 1) {
            solid_array.push(false);
        }
        ChunkCreationIterator {
            position,
            solid_array,
            blocks: Vec::with_capacity(CHUNK_SIZE),
            visible_blocks: 0,
            local_x: 1,
            local_y: 1,
            local_z: 1,
        }
    }

    /// Number of blocks pushed so far.
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Whether every position of the chunk has been written.
    pub fn is_complete(&self) -> bool {
        self.blocks.len() == CHUNK_SIZE
    }

    /// Finalizes the chunk creation and returns the constructed `Chunk`.
    ///
    /// Positions that were never pushed are filled with air. A freshly created
    /// chunk is neither dirty nor modified.
    pub fn return_chunk(mut self) -> Chunk {
        while !self.is_complete() {
            self.push_block(Block::AIR);
        }
        Chunk {
            position: self.position,
            blocks: self.blocks,
            solid_array: self.solid_array,
            visible_blocks: self.visible_blocks,
            modified: false,
            dirty: false,
            revision: 0,
        }
    }

    /// Adds a block of the given type at the current position.
    pub fn push_block_type(&mut self, block_type: BlockType) {
        self.push_block(Block::new(block_type));
    }

    /// Adds a block at the current position and advances the position.
    ///
    /// Pushing past the end of the chunk is ignored.
    pub fn push_block(&mut self, block: Block) {
        if self.is_complete() {
            return;
        }

        let is_solid = block.is_solid();
        self.solid_array.push(is_solid);
        self.blocks.push(block);
        if is_solid {
            self.visible_blocks += 1;
        }

        self.local_x += 1;

        // End of row: trailing pad of this row, leading pad of the next
        if self.local_x == CHUNK_DIMENSION_WRAPPED - 1 {
            self.solid_array.push(false);
            self.solid_array.push(false);

            self.local_x = 1;
            self.local_y += 1;

            // End of plane: the padding row above plus the padding row below the next plane
            if self.local_y == CHUNK_DIMENSION_WRAPPED - 1 {
                for _ in 0..2 * CHUNK_DIMENSION_WRAPPED {
                    self.solid_array.push(false);
                }

                self.local_y = 1;
                self.local_z += 1;

                if self.local_z == CHUNK_DIMENSION_WRAPPED - 1 {
                    for _ in 0..CHUNK_PLANE_SIZE_WRAPPED - CHUNK_DIMENSION_WRAPPED - 1 {
                        self.solid_array.push(false);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn padded_array_has_wrapped_size() {
        let chunk = ChunkCreationIterator::new(ChunkCoordinate::new(0, 0)).return_chunk();
        assert_eq!(chunk.solid_array.len(), CHUNK_SIZE_WRAPPED);
        assert_eq!(chunk.blocks.len(), CHUNK_SIZE);
        assert_eq!(chunk.visible_block_count(), 0);
    }

    #[test]
    fn solid_bits_line_up_with_dense_positions() {
        let mut cci = ChunkCreationIterator::new(ChunkCoordinate::new(2, -3));
        for index in 0..CHUNK_SIZE {
            if index % 7 == 0 {
                cci.push_block_type(BlockType::STONE);
            } else {
                cci.push_block_type(BlockType::AIR);
            }
        }
        let chunk = cci.return_chunk();

        for z in 0..16 {
            for y in 0..16 {
                for x in 0..16 {
                    let index = x + 16 * (y + 16 * z);
                    assert_eq!(
                        chunk.is_block_solid(x as i32, y as i32, z as i32),
                        index % 7 == 0,
                        "({x}, {y}, {z})"
                    );
                }
            }
        }
        assert_eq!(chunk.visible_block_count(), (CHUNK_SIZE + 6) / 7);
        // Border reads as air
        assert!(!chunk.is_block_solid(-1, 0, 0));
        assert!(!chunk.is_block_solid(0, 16, 0));
    }
}
