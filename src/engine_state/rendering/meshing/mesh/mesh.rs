//! Mesh data structures and the culled-face mesher.
//!
//! This module turns an immutable chunk snapshot into renderable geometry:
//! one quad per solid block face whose neighbour is not solid, grouped into
//! one vertex batch per texture. Faces on the chunk boundary are always kept,
//! since a snapshot carries no neighbour data.

use std::{collections::BTreeMap, sync::Arc};

use crate::{
    engine_state::{
        rendering::{
            texture::{TextureAtlas, TextureKey},
            Vertex,
        },
        voxels::{
            block::block_side::BlockSide,
            chunk::ChunkSnapshot,
            coordinate::ChunkCoordinate,
        },
    },
    error::BuildError,
};

use super::face::Face;

/// Vertices and indices of all faces sharing one texture.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VertexBatch {
    /// The vertex data of this batch
    vertices: Vec<Vertex>,
    /// The index data of this batch, two triangles per face
    indices: Vec<u32>,
}

impl VertexBatch {
    /// Appends one face to the batch.
    pub fn push_face(&mut self, vertices: [Vertex; 4]) {
        let faces = self.quad_count() as u32;
        self.vertices.extend_from_slice(&vertices);
        self.indices.extend_from_slice(&Face::indices(faces));
    }

    /// The vertex data.
    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    /// The index data.
    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    /// Number of quads in the batch.
    pub fn quad_count(&self) -> usize {
        self.vertices.len() / 4
    }

    /// Whether the batch holds no faces.
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }
}

/// The renderable geometry of one chunk: vertex batches keyed by texture.
///
/// Batches are reference counted so render submissions can hold on to them
/// while the cache replaces the geometry.
#[derive(Debug, Clone, PartialEq)]
pub struct MeshGeometry {
    /// The chunk this geometry was built from
    pub coordinate: ChunkCoordinate,
    /// The chunk revision the geometry reflects
    pub revision: u64,
    /// Batches in ascending texture key order, never empty batches
    batches: Vec<(TextureKey, Arc<VertexBatch>)>,
}

impl MeshGeometry {
    /// Geometry without any faces.
    pub fn empty(coordinate: ChunkCoordinate, revision: u64) -> Self {
        MeshGeometry {
            coordinate,
            revision,
            batches: Vec::new(),
        }
    }

    /// Assembles geometry from batches. Empty batches are dropped and the rest
    /// sorted by texture key; a key given twice keeps its last batch.
    pub fn from_batches(
        coordinate: ChunkCoordinate,
        revision: u64,
        batches: impl IntoIterator<Item = (TextureKey, VertexBatch)>,
    ) -> Self {
        let by_key: BTreeMap<TextureKey, VertexBatch> = batches
            .into_iter()
            .filter(|(_, batch)| !batch.is_empty())
            .collect();
        MeshGeometry {
            coordinate,
            revision,
            batches: by_key
                .into_iter()
                .map(|(key, batch)| (key, Arc::new(batch)))
                .collect(),
        }
    }

    /// Whether there is nothing to draw.
    pub fn is_empty(&self) -> bool {
        self.batches.is_empty()
    }

    /// The `(texture, batch)` pairs in texture key order.
    pub fn batches(&self) -> &[(TextureKey, Arc<VertexBatch>)] {
        &self.batches
    }

    /// The textures used by this geometry.
    pub fn texture_keys(&self) -> impl Iterator<Item = TextureKey> + '_ {
        self.batches.iter().map(|(key, _)| *key)
    }

    /// The batch drawn with `key`, if any.
    pub fn batch(&self, key: TextureKey) -> Option<&Arc<VertexBatch>> {
        self.batches
            .binary_search_by_key(&key, |(k, _)| *k)
            .ok()
            .map(|index| &self.batches[index].1)
    }

    /// Total number of quads over all batches.
    pub fn quad_count(&self) -> usize {
        self.batches.iter().map(|(_, batch)| batch.quad_count()).sum()
    }
}

/// Builds the geometry of a chunk snapshot.
///
/// Pure function of its inputs: building the same snapshot twice yields
/// identical geometry.
///
/// # Errors
/// `GenerationFailure` if the snapshot holds a block id with no known type or
/// a texture that isn't in the atlas.
pub fn build_geometry(
    snapshot: &ChunkSnapshot,
    atlas: &TextureAtlas,
) -> Result<MeshGeometry, BuildError> {
    if snapshot.visible_block_count() == 0 {
        return Ok(MeshGeometry::empty(snapshot.position, snapshot.revision));
    }

    let origin = snapshot.position.origin();
    let mut batches: BTreeMap<TextureKey, VertexBatch> = BTreeMap::new();

    for (position, block) in snapshot.solid_blocks() {
        let block_type = block.block_type().ok_or_else(|| {
            BuildError::GenerationFailure(format!(
                "unknown block id {} at {:?} in chunk {}",
                block.block_type, position, snapshot.position
            ))
        })?;

        for side in BlockSide::all() {
            let normal = side.normal();
            let neighbour_solid = snapshot.is_block_solid(
                position.x as i32 + normal.x,
                position.y as i32 + normal.y,
                position.z as i32 + normal.z,
            );
            if neighbour_solid {
                continue;
            }

            let Some(key) = atlas.texture_for(block_type, side) else {
                continue;
            };
            let tile = atlas.tile_index(key).ok_or_else(|| {
                BuildError::GenerationFailure(format!("texture {} is not in the atlas", key.name()))
            })?;

            let face = Face::new(position.x, position.y, position.z, block_type, side);
            batches
                .entry(key)
                .or_default()
                .push_face(face.vertices(origin, tile, atlas.tile_uv(tile)));
        }
    }

    Ok(MeshGeometry::from_batches(
        snapshot.position,
        snapshot.revision,
        batches,
    ))
}
