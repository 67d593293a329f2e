use cgmath::Point3;

use crate::engine_state::{
    rendering::Vertex,
    voxels::block::{block_side::BlockSide, block_type::BlockType},
};

/// Represents a single quad face of a voxel in the mesh.
///
/// A face is defined by four corner points (lower-left, lower-right, upper-right, upper-left)
/// in chunk-relative coordinates, and knows which block and which side it belongs to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Face {
    /// Lower-right corner of the face in chunk coordinates
    pub lr: Point3<usize>,
    /// Lower-left corner of the face in chunk coordinates
    pub ll: Point3<usize>,
    /// Upper-right corner of the face in chunk coordinates
    pub ur: Point3<usize>,
    /// Upper-left corner of the face in chunk coordinates
    pub ul: Point3<usize>,
    /// The block the face belongs to, used for texture mapping
    pub block_type: BlockType,
    /// Which side of the block this face represents
    pub block_side: BlockSide,
}

impl Face {
    /// Creates a new face for a voxel at the given coordinates.
    ///
    /// # Arguments
    /// * `i`, `j`, `k` - The coordinates of the voxel in chunk space
    /// * `block_type` - The type of the block, used for texture mapping
    /// * `block_side` - Which side of the block this face represents
    ///
    /// # Returns
    /// A new `Face` whose corners wind counter-clockwise when seen from outside the block.
    pub fn new(i: usize, j: usize, k: usize, block_type: BlockType, block_side: BlockSide) -> Self {
        let (ll, lr, ul, ur) = match block_side {
            BlockSide::FRONT => (
                Point3::new(i, j, k),
                Point3::new(i, j, k + 1),
                Point3::new(i, j + 1, k),
                Point3::new(i, j + 1, k + 1),
            ),
            BlockSide::BACK => (
                Point3::new(i + 1, j, k + 1),
                Point3::new(i + 1, j, k),
                Point3::new(i + 1, j + 1, k + 1),
                Point3::new(i + 1, j + 1, k),
            ),
            BlockSide::BOTTOM => (
                Point3::new(i, j, k + 1),
                Point3::new(i, j, k),
                Point3::new(i + 1, j, k + 1),
                Point3::new(i + 1, j, k),
            ),
            BlockSide::TOP => (
                Point3::new(i, j + 1, k),
                Point3::new(i, j + 1, k + 1),
                Point3::new(i + 1, j + 1, k),
                Point3::new(i + 1, j + 1, k + 1),
            ),
            BlockSide::LEFT => (
                Point3::new(i + 1, j, k),
                Point3::new(i, j, k),
                Point3::new(i + 1, j + 1, k),
                Point3::new(i, j + 1, k),
            ),
            BlockSide::RIGHT => (
                Point3::new(i, j, k + 1),
                Point3::new(i + 1, j, k + 1),
                Point3::new(i, j + 1, k + 1),
                Point3::new(i + 1, j + 1, k + 1),
            ),
        };

        Face {
            ll,
            lr,
            ul,
            ur,
            block_type,
            block_side,
        }
    }

    /// Generates the four vertices of the face in world space.
    ///
    /// # Arguments
    /// * `origin` - World position of the chunk's minimum corner
    /// * `texture_index` - Atlas tile of the face's texture
    /// * `uv` - The tile's UV rectangle as `(min, max)`
    ///
    /// # Returns
    /// Vertices in `[ll, lr, ul, ur]` order, matching [`Face::indices`].
    pub fn vertices(
        &self,
        origin: Point3<i32>,
        texture_index: u32,
        (uv_min, uv_max): ([f32; 2], [f32; 2]),
    ) -> [Vertex; 4] {
        let world = |corner: Point3<usize>| {
            Point3::new(
                origin.x + corner.x as i32,
                origin.y + corner.y as i32,
                origin.z + corner.z as i32,
            )
        };
        [
            Vertex::new(world(self.ll), texture_index, [uv_min[0], uv_max[1]], self.block_side),
            Vertex::new(world(self.lr), texture_index, [uv_max[0], uv_max[1]], self.block_side),
            Vertex::new(world(self.ul), texture_index, [uv_min[0], uv_min[1]], self.block_side),
            Vertex::new(world(self.ur), texture_index, [uv_max[0], uv_min[1]], self.block_side),
        ]
    }

    /// Index data for a face, offset by the number of faces already in the batch.
    ///
    /// # Returns
    /// Six indices forming the two triangles of the quad.
    pub fn indices(num_faces_generated: u32) -> [u32; 6] {
        let base = num_faces_generated * 4;
        [base, base + 1, base + 3, base, base + 3, base + 2]
    }
}
