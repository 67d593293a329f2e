//! # Block Type Module
//!
//! This module defines the different types of blocks in the voxel world.
//! It provides conversion from the compact stored representation and the
//! solidity rule used by meshing and visibility counting.

use num_derive::FromPrimitive;
use num_traits::FromPrimitive;

use super::BlockTypeSize;

/// Enumerates all possible block types in the voxel world.
///
/// Each variant represents a distinct type of block. The `FromPrimitive` derive
/// allows conversion from the stored integer form, which is how chunk data is
/// persisted and handed to mesh workers.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, FromPrimitive)]
pub enum BlockType {
    /// An air block, which is non-solid and transparent.
    AIR,

    /// A basic dirt block found just below the surface.
    DIRT,

    /// A grass block with different textures on top and sides.
    /// The top is green, sides have grass on dirt, and bottom is plain dirt.
    GRASS,

    /// Bedrock-like filler beneath the dirt layer. Also the block players place.
    STONE,

    /// Surface block of dry biomes.
    SAND,

    /// Surface cap of high columns.
    SNOW,
}

impl BlockType {
    /// Converts a `BlockTypeSize` to a `BlockType`.
    ///
    /// # Returns
    /// `None` if the value doesn't correspond to a known block type, which
    /// only happens with corrupt or foreign chunk data.
    pub fn from_int(btype: BlockTypeSize) -> Option<Self> {
        FromPrimitive::from_u8(btype)
    }

    /// Whether this block occludes its neighbours and produces faces.
    pub fn is_solid(self) -> bool {
        self != BlockType::AIR
    }

    /// A stable lowercase name, used for texture lookups and log output.
    pub fn name(self) -> &'static str {
        match self {
            BlockType::AIR => "air",
            BlockType::DIRT => "dirt",
            BlockType::GRASS => "grass",
            BlockType::STONE => "stone",
            BlockType::SAND => "sand",
            BlockType::SNOW => "snow",
        }
    }
}
