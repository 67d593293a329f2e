//! Texture atlas mapping for the mesher.
//!
//! The atlas itself (the image) belongs to the renderer. The mesher only needs
//! to know which named texture a block face uses and where that texture's tile
//! sits in the atlas, which is what this module provides. The mapping is
//! read-only after construction and shared between all mesh workers.

use phf::phf_map;

use crate::engine_state::voxels::block::{block_side::BlockSide, block_type::BlockType};

/// Tile index of every texture in the atlas image, row-major.
static ATLAS_TILES: phf::Map<&'static str, u32> = phf_map! {
    "dirt" => 0,
    "grass_top" => 1,
    "grass_side" => 2,
    "stone" => 3,
    "sand" => 4,
    "snow" => 5,
    "snow_side" => 6,
};

/// Name of a texture in the atlas. Render batches are grouped and ordered by key.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureKey(pub &'static str);

impl TextureKey {
    /// The texture name.
    pub fn name(&self) -> &'static str {
        self.0
    }
}

/// Read-only mapping from block faces to atlas tiles.
#[derive(Debug, Clone, PartialEq)]
pub struct TextureAtlas {
    /// Number of tiles per atlas row (and column)
    tiles_per_row: u32,
}

impl Default for TextureAtlas {
    fn default() -> Self {
        TextureAtlas::new(4)
    }
}

impl TextureAtlas {
    /// Creates a mapping for a square atlas of `tiles_per_row²` tiles.
    pub fn new(tiles_per_row: u32) -> Self {
        TextureAtlas {
            tiles_per_row: tiles_per_row.max(1),
        }
    }

    /// The texture shown on `side` of a block, `None` for air.
    pub fn texture_for(&self, block_type: BlockType, side: BlockSide) -> Option<TextureKey> {
        let name = match (block_type, side) {
            (BlockType::AIR, _) => return None,
            (BlockType::DIRT, _) => "dirt",
            (BlockType::GRASS, BlockSide::TOP) => "grass_top",
            (BlockType::GRASS, BlockSide::BOTTOM) => "dirt",
            (BlockType::GRASS, _) => "grass_side",
            (BlockType::STONE, _) => "stone",
            (BlockType::SAND, _) => "sand",
            (BlockType::SNOW, BlockSide::TOP) => "snow",
            (BlockType::SNOW, BlockSide::BOTTOM) => "dirt",
            (BlockType::SNOW, _) => "snow_side",
        };
        Some(TextureKey(name))
    }

    /// The atlas tile of a texture, `None` for unknown names.
    pub fn tile_index(&self, key: TextureKey) -> Option<u32> {
        ATLAS_TILES.get(key.name()).copied()
    }

    /// UV rectangle of a tile as `(min, max)`.
    pub fn tile_uv(&self, tile_index: u32) -> ([f32; 2], [f32; 2]) {
        let size = 1.0 / self.tiles_per_row as f32;
        let column = (tile_index % self.tiles_per_row) as f32;
        let row = (tile_index / self.tiles_per_row) as f32;
        (
            [column * size, row * size],
            [(column + 1.0) * size, (row + 1.0) * size],
        )
    }

    /// Every texture name known to the atlas.
    pub fn texture_names(&self) -> impl Iterator<Item = &'static str> {
        ATLAS_TILES.keys().copied()
    }
}
