//! Vertex data structures for voxel geometry.
//!
//! This module defines the vertex format produced by the mesher and consumed by
//! whatever renderer draws the batches.

use cgmath::Point3;

use crate::engine_state::voxels::block::block_side::BlockSide;

/// A vertex of a block face.
///
/// The layout is plain old data so batches can be uploaded to a GPU buffer
/// with `bytemuck::cast_slice` and no conversion.
///
/// # Memory Layout
/// - Position: 3x i32 (12 bytes)
/// - Texture Index: u32 (4 bytes)
/// - Texture Coordinates: [f32; 2] (8 bytes)
/// - Side: u32 (4 bytes)
///
/// Total size: 28 bytes
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex {
    /// X coordinate in world space
    pub x: i32,
    /// Y coordinate in world space
    pub y: i32,
    /// Z coordinate in world space
    pub z: i32,
    /// Index of the tile in the texture atlas
    pub texture_index: u32,
    /// UV texture coordinates inside the atlas (normalized 0.0-1.0)
    pub tex_coords: [f32; 2],
    /// The face this vertex belongs to, as a `BlockSide` discriminant
    pub side: u32,
}

impl Vertex {
    /// Creates a new vertex.
    ///
    /// # Arguments
    /// * `pos` - The 3D position of the vertex in world space
    /// * `texture_index` - Index of the tile in the texture atlas
    /// * `tex_coords` - Atlas UV coordinates
    /// * `side` - The face the vertex belongs to
    pub fn new(pos: Point3<i32>, texture_index: u32, tex_coords: [f32; 2], side: BlockSide) -> Self {
        Vertex {
            x: pos.x,
            y: pos.y,
            z: pos.z,
            texture_index,
            tex_coords,
            side: side as u32,
        }
    }

    /// The vertex position as a point.
    pub fn position(&self) -> Point3<i32> {
        Point3::new(self.x, self.y, self.z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vertices_are_tightly_packed() {
        assert_eq!(std::mem::size_of::<Vertex>(), 28);
        let vertex = Vertex::new(Point3::new(1, -2, 3), 4, [0.5, 0.25], BlockSide::TOP);
        let bytes: &[u8] = bytemuck::bytes_of(&vertex);
        assert_eq!(bytes.len(), 28);
        assert_eq!(vertex.position(), Point3::new(1, -2, 3));
        assert_eq!(vertex.side, 3);
    }
}
