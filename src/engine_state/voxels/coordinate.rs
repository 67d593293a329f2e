//! # Chunk Coordinates
//!
//! The single definition of how world positions map onto the horizontal chunk
//! grid. Rendering, editing, generation and persistence all go through these
//! functions so a block can never be attributed to two different chunks.

use std::fmt;

use cgmath::Point3;
use serde::{Deserialize, Serialize};

use super::chunk::CHUNK_DIMENSION;

/// Largest chunk index whose blocks, face corners included, still have
/// `i32` world positions.
pub const MAX_CHUNK_INDEX: i32 = i32::MAX / CHUNK_DIMENSION - 1;

/// Identifies a chunk column on the 16x16 horizontal grid.
///
/// Used directly as the key of every per-chunk map (mesh cache, pending builds,
/// loaded chunks). Ordering is lexicographic on `(x, z)`.
#[derive(
    Copy, Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct ChunkCoordinate {
    /// Chunk index along world X
    pub x: i32,
    /// Chunk index along world Z
    pub z: i32,
}

impl ChunkCoordinate {
    /// Creates a coordinate from chunk indices.
    pub const fn new(x: i32, z: i32) -> Self {
        ChunkCoordinate { x, z }
    }

    /// The chunk containing a continuous world position (e.g. the viewpoint).
    pub fn from_world_position(position: Point3<f32>) -> Self {
        ChunkCoordinate::new(chunk_index(position.x), chunk_index(position.z))
    }

    /// The chunk containing an integer block position.
    pub fn from_block_position(position: Point3<i32>) -> Self {
        ChunkCoordinate::new(
            position.x.div_euclid(CHUNK_DIMENSION),
            position.z.div_euclid(CHUNK_DIMENSION),
        )
    }

    /// World position of the chunk's minimum corner, saturating at the
    /// edges of the `i32` range.
    pub fn origin(&self) -> Point3<i32> {
        Point3::new(
            self.x.saturating_mul(CHUNK_DIMENSION),
            0,
            self.z.saturating_mul(CHUNK_DIMENSION),
        )
    }

    /// Returns the coordinate shifted by whole chunks, clamped to
    /// `±MAX_CHUNK_INDEX`.
    pub fn offset(&self, dx: i32, dz: i32) -> Self {
        ChunkCoordinate::new(
            clamp_index(self.x.saturating_add(dx)),
            clamp_index(self.z.saturating_add(dz)),
        )
    }

    /// Returns the coordinate shifted by whole chunks, or `None` if it would
    /// leave the `±MAX_CHUNK_INDEX` grid.
    pub fn checked_offset(&self, dx: i32, dz: i32) -> Option<Self> {
        let x = self.x.checked_add(dx)?;
        let z = self.z.checked_add(dz)?;
        let range = -MAX_CHUNK_INDEX..=MAX_CHUNK_INDEX;
        (range.contains(&x) && range.contains(&z)).then_some(ChunkCoordinate::new(x, z))
    }

    /// Squared planar distance in chunk units.
    pub fn distance_squared(&self, other: &ChunkCoordinate) -> i64 {
        let dx = self.x as i64 - other.x as i64;
        let dz = self.z as i64 - other.z as i64;
        dx * dx + dz * dz
    }
}

impl fmt::Display for ChunkCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.z)
    }
}

/// `floor(world / CHUNK_DIMENSION)` for a continuous world coordinate,
/// clamped to `±MAX_CHUNK_INDEX`. NaN maps to chunk 0.
pub fn chunk_index(world_coordinate: f32) -> i32 {
    clamp_index((world_coordinate / CHUNK_DIMENSION as f32).floor() as i32)
}

fn clamp_index(index: i32) -> i32 {
    index.clamp(-MAX_CHUNK_INDEX, MAX_CHUNK_INDEX)
}

/// Every coordinate whose planar distance to `center` is at most `radius`
/// chunks (`dx² + dz² ≤ radius²`), nearest first.
///
/// Coordinates at equal distance keep their enumeration order (x-major), so
/// the result is fully deterministic. A negative radius yields nothing.
pub fn coordinates_within_radius(center: ChunkCoordinate, radius: i32) -> Vec<ChunkCoordinate> {
    if radius < 0 {
        return Vec::new();
    }
    let radius_squared = radius as i64 * radius as i64;
    let mut coordinates = Vec::new();
    for dx in -radius..=radius {
        for dz in -radius..=radius {
            let Some(candidate) = center.checked_offset(dx, dz) else {
                continue;
            };
            if candidate.distance_squared(&center) <= radius_squared {
                coordinates.push(candidate);
            }
        }
    }
    coordinates.sort_by_key(|coordinate| coordinate.distance_squared(&center));
    coordinates
}

/// Splits a block position into its chunk and the position inside that chunk.
pub fn split_block_position(position: Point3<i32>) -> (ChunkCoordinate, Point3<usize>) {
    let chunk = ChunkCoordinate::from_block_position(position);
    let local = Point3::new(
        position.x.rem_euclid(CHUNK_DIMENSION) as usize,
        position.y as usize,
        position.z.rem_euclid(CHUNK_DIMENSION) as usize,
    );
    (chunk, local)
}
