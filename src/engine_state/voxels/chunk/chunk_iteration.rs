//! # Chunk Iteration Module
//!
//! This module provides an iterator over the solid blocks of a chunk's dense
//! block array, yielding each block with its chunk-relative position.

use cgmath::Point3;

use crate::engine_state::voxels::block::Block;

use super::{CHUNK_DIMENSION, CHUNK_SIZE};

/// An iterator over all non-air blocks in storage order (X fastest, then Y, then Z).
pub struct ChunkBlockIterator<'a> {
    /// The dense block array being iterated over
    blocks: &'a [Block],
    /// Next linear index to inspect
    current_offset: usize,
}

impl<'a> ChunkBlockIterator<'a> {
    /// Creates a new `ChunkBlockIterator` over a dense block array.
    pub fn new(blocks: &'a [Block]) -> Self {
        ChunkBlockIterator {
            blocks,
            current_offset: 0,
        }
    }
}

impl<'a> Iterator for ChunkBlockIterator<'a> {
    type Item = (Point3<usize>, Block);

    fn next(&mut self) -> Option<Self::Item> {
        let dimension = CHUNK_DIMENSION as usize;
        let end = self.blocks.len().min(CHUNK_SIZE);

        while self.current_offset < end {
            let offset = self.current_offset;
            self.current_offset += 1;

            let block = self.blocks[offset];
            if !block.is_solid() {
                continue;
            }

            let position = Point3::new(
                offset % dimension,
                (offset / dimension) % dimension,
                offset / (dimension * dimension),
            );
            return Some((position, block));
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine_state::voxels::{
        block::block_type::BlockType,
        chunk::{block_index, Chunk},
        coordinate::ChunkCoordinate,
    };

    #[test]
    fn yields_only_solid_blocks_with_positions() {
        let mut chunk = Chunk::empty(ChunkCoordinate::new(0, 0));
        chunk.set_block(Point3::new(0, 0, 0), Block::new(BlockType::DIRT));
        chunk.set_block(Point3::new(5, 9, 2), Block::new(BlockType::GRASS));
        chunk.set_block(Point3::new(15, 15, 15), Block::new(BlockType::STONE));

        let snapshot = chunk.snapshot();
        let found: Vec<_> = snapshot.solid_blocks().collect();

        assert_eq!(
            found,
            vec![
                (Point3::new(0, 0, 0), Block::new(BlockType::DIRT)),
                (Point3::new(5, 9, 2), Block::new(BlockType::GRASS)),
                (Point3::new(15, 15, 15), Block::new(BlockType::STONE)),
            ]
        );
        assert_eq!(block_index(15, 15, 15), CHUNK_SIZE - 1);
    }
}
