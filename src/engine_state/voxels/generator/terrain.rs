//! # Terrain Generator
//!
//! Turns the noise fields into block columns. Each column's surface height
//! comes from the height field and its surface material from the moisture
//! field; everything below the surface is a fixed layering of dirt over stone.

use noise::NoiseFn;

use crate::engine_state::voxels::{
    block::block_type::BlockType,
    chunk::{chunk_creation::ChunkCreationIterator, Chunk, CHUNK_DIMENSION},
    coordinate::ChunkCoordinate,
};

use super::noise::{HeightField, MoistureField, NoiseField};

/// World units per height-noise lattice cell.
pub const HEIGHT_SCALE: f64 = 8.0;
/// World units per moisture-noise lattice cell.
pub const MOISTURE_SCALE: f64 = 16.0;
/// Surface height for a noise value of zero.
pub const BASE_HEIGHT: f64 = 8.0;
/// Surface height change per unit of height noise.
pub const HEIGHT_AMPLITUDE: f64 = 5.0;
/// Lowest and highest surface block the generator produces.
pub const MIN_SURFACE: i32 = 1;
/// See [`MIN_SURFACE`].
pub const MAX_SURFACE: i32 = CHUNK_DIMENSION - 1;
/// Columns at or above this height get a snow cap.
pub const SNOW_LINE: i32 = 13;
/// Moisture below this value makes a dry (sand) column.
pub const DRY_THRESHOLD: f64 = -0.4;
/// Number of filler blocks between the surface block and stone.
pub const SOIL_DEPTH: i32 = 3;

/// Biome of a column, derived from moisture and height.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Biome {
    /// Dry columns: sand surface and sand soil
    Desert,
    /// Default columns: grass over dirt
    Plains,
    /// High columns: snow over dirt
    Mountain,
}

/// Surface description of one block column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    /// Y of the topmost solid block
    pub surface: i32,
    /// The column's biome
    pub biome: Biome,
}

impl Column {
    /// The block at height `y` in this column.
    pub fn block_at(&self, y: i32) -> BlockType {
        if y > self.surface {
            return BlockType::AIR;
        }
        let depth = self.surface - y;
        match (self.biome, depth) {
            (Biome::Desert, 0) => BlockType::SAND,
            (Biome::Plains, 0) => BlockType::GRASS,
            (Biome::Mountain, 0) => BlockType::SNOW,
            (_, d) if d <= SOIL_DEPTH => BlockType::DIRT,
            _ => BlockType::STONE,
        }
    }
}

/// Deterministic chunk generator for one world seed.
///
/// Cheap to clone and safe to share between generation workers.
#[derive(Debug, Clone, Copy)]
pub struct TerrainGenerator {
    noise: NoiseField,
    height: HeightField,
    moisture: MoistureField,
}

impl TerrainGenerator {
    /// Creates a generator for the given seed.
    pub fn new(seed: i64) -> Self {
        let noise = NoiseField::new(seed);
        TerrainGenerator {
            noise,
            height: noise.height_field(),
            moisture: noise.moisture_field(),
        }
    }

    /// The noise field backing this generator.
    pub fn noise(&self) -> &NoiseField {
        &self.noise
    }

    /// Describes the column at world block position `(x, z)`.
    pub fn column(&self, x: i32, z: i32) -> Column {
        let height_sample = self
            .height
            .get([x as f64 / HEIGHT_SCALE, z as f64 / HEIGHT_SCALE]);
        let surface = (BASE_HEIGHT + height_sample * HEIGHT_AMPLITUDE).round() as i32;
        let surface = surface.clamp(MIN_SURFACE, MAX_SURFACE);

        let moisture = self
            .moisture
            .get([x as f64 / MOISTURE_SCALE, z as f64 / MOISTURE_SCALE]);

        let biome = if moisture < DRY_THRESHOLD {
            Biome::Desert
        } else if surface >= SNOW_LINE {
            Biome::Mountain
        } else {
            Biome::Plains
        };

        Column { surface, biome }
    }

    /// Generates the full block content of a chunk.
    pub fn generate_chunk(&self, position: ChunkCoordinate) -> Chunk {
        let dimension = CHUNK_DIMENSION as usize;
        let origin = position.origin();

        let mut columns = Vec::with_capacity(dimension * dimension);
        for z in 0..CHUNK_DIMENSION {
            for x in 0..CHUNK_DIMENSION {
                columns.push(self.column(origin.x + x, origin.z + z));
            }
        }

        let mut cci = ChunkCreationIterator::new(position);
        for k in 0..dimension {
            for j in 0..CHUNK_DIMENSION {
                for i in 0..dimension {
                    cci.push_block_type(columns[i + dimension * k].block_at(j));
                }
            }
        }
        cci.return_chunk()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine_state::voxels::chunk::CHUNK_SIZE;

    #[test]
    fn generation_is_reproducible() {
        let a = TerrainGenerator::new(12345).generate_chunk(ChunkCoordinate::new(-3, 7));
        let b = TerrainGenerator::new(12345).generate_chunk(ChunkCoordinate::new(-3, 7));
        assert_eq!(a.blocks(), b.blocks());
        assert_eq!(a.visible_block_count(), b.visible_block_count());
    }

    #[test]
    fn chunks_follow_their_columns() {
        let generator = TerrainGenerator::new(4);
        let position = ChunkCoordinate::new(1, -1);
        let chunk = generator.generate_chunk(position);
        let origin = position.origin();

        for z in 0..16usize {
            for x in 0..16usize {
                let column = generator.column(origin.x + x as i32, origin.z + z as i32);
                assert!((MIN_SURFACE..=MAX_SURFACE).contains(&column.surface));
                for y in 0..16usize {
                    let expected = column.block_at(y as i32);
                    assert_eq!(
                        chunk.get_block(x, y, z).block_type(),
                        Some(expected),
                        "({x}, {y}, {z})"
                    );
                }
            }
        }
    }

    #[test]
    fn every_generated_chunk_has_ground() {
        let generator = TerrainGenerator::new(77);
        for x in -2..2 {
            for z in -2..2 {
                let chunk = generator.generate_chunk(ChunkCoordinate::new(x, z));
                // MIN_SURFACE guarantees at least two solid layers
                assert!(chunk.visible_block_count() >= 2 * 256);
                assert!(chunk.visible_block_count() < CHUNK_SIZE);
            }
        }
    }

    #[test]
    fn column_layering() {
        let plains = Column {
            surface: 9,
            biome: Biome::Plains,
        };
        assert_eq!(plains.block_at(10), BlockType::AIR);
        assert_eq!(plains.block_at(9), BlockType::GRASS);
        assert_eq!(plains.block_at(6), BlockType::DIRT);
        assert_eq!(plains.block_at(5), BlockType::STONE);

        let desert = Column {
            surface: 4,
            biome: Biome::Desert,
        };
        assert_eq!(desert.block_at(4), BlockType::SAND);
        assert_eq!(desert.block_at(3), BlockType::DIRT);
        assert_eq!(desert.block_at(1), BlockType::DIRT);
        assert_eq!(desert.block_at(0), BlockType::STONE);

        let mountain = Column {
            surface: 14,
            biome: Biome::Mountain,
        };
        assert_eq!(mountain.block_at(14), BlockType::SNOW);
        assert_eq!(mountain.block_at(13), BlockType::DIRT);
    }
}
