//! # Chunk Persistence
//!
//! Storage for edited chunks. The world only saves chunks that carry edits;
//! untouched chunks are cheaper to regenerate from the seed than to store.
//!
//! Two backends are provided:
//! - [`MemoryPersistence`]: keeps saved block arrays in a map, used by tests
//!   and by sessions without a save directory
//! - [`JsonDirectoryPersistence`]: one `chunk_<x>_<z>.json` file per chunk,
//!   holding a [`ChunkRecord`]

use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use crate::error::PersistenceError;

use super::{
    block::{Block, BlockTypeSize},
    block::block_type::BlockType,
    chunk::Chunk,
    coordinate::ChunkCoordinate,
};

/// A store that chunks can be written to and read back from.
pub trait ChunkPersistence: Send {
    /// Loads a previously saved chunk, `Ok(None)` if it was never saved.
    fn load(&mut self, position: ChunkCoordinate) -> Result<Option<Chunk>, PersistenceError>;

    /// Saves the full block state of a chunk, replacing any earlier save.
    fn save(&mut self, chunk: &Chunk) -> Result<(), PersistenceError>;
}

/// Serialized form of one chunk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkRecord {
    /// Chunk index along world X
    pub x: i32,
    /// Chunk index along world Z
    pub z: i32,
    /// Block type ids in storage order
    pub blocks: Vec<BlockTypeSize>,
}

impl ChunkRecord {
    /// Captures the block state of a chunk.
    pub fn from_chunk(chunk: &Chunk) -> Self {
        ChunkRecord {
            x: chunk.position.x,
            z: chunk.position.z,
            blocks: bytemuck::cast_slice::<Block, BlockTypeSize>(chunk.blocks()).to_vec(),
        }
    }

    /// Rebuilds the chunk, rejecting records with a wrong size or unknown block ids.
    pub fn into_chunk(self) -> Result<Chunk, PersistenceError> {
        let position = ChunkCoordinate::new(self.x, self.z);
        if self
            .blocks
            .iter()
            .any(|id| BlockType::from_int(*id).is_none())
        {
            return Err(PersistenceError::CorruptChunk(position));
        }
        let blocks: &[Block] = bytemuck::cast_slice(&self.blocks);
        Chunk::from_blocks(position, blocks).ok_or(PersistenceError::CorruptChunk(position))
    }
}

/// Keeps saved chunks in memory for the lifetime of the process.
#[derive(Debug, Default)]
pub struct MemoryPersistence {
    records: HashMap<ChunkCoordinate, ChunkRecord>,
}

impl MemoryPersistence {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of chunks saved so far.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether nothing was saved yet.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl ChunkPersistence for MemoryPersistence {
    fn load(&mut self, position: ChunkCoordinate) -> Result<Option<Chunk>, PersistenceError> {
        self.records
            .get(&position)
            .cloned()
            .map(ChunkRecord::into_chunk)
            .transpose()
    }

    fn save(&mut self, chunk: &Chunk) -> Result<(), PersistenceError> {
        self.records
            .insert(chunk.position, ChunkRecord::from_chunk(chunk));
        Ok(())
    }
}

/// Stores each chunk as a JSON file in one directory.
#[derive(Debug, Clone)]
pub struct JsonDirectoryPersistence {
    directory: PathBuf,
}

impl JsonDirectoryPersistence {
    /// Uses `directory` for chunk files, creating it if needed.
    pub fn new(directory: impl AsRef<Path>) -> Result<Self, PersistenceError> {
        let directory = directory.as_ref().to_path_buf();
        fs::create_dir_all(&directory).map_err(|source| PersistenceError::Io {
            path: directory.clone(),
            source,
        })?;
        Ok(JsonDirectoryPersistence { directory })
    }

    /// The file a chunk is stored in.
    pub fn chunk_path(&self, position: ChunkCoordinate) -> PathBuf {
        self.directory
            .join(format!("chunk_{}_{}.json", position.x, position.z))
    }
}

impl ChunkPersistence for JsonDirectoryPersistence {
    fn load(&mut self, position: ChunkCoordinate) -> Result<Option<Chunk>, PersistenceError> {
        let path = self.chunk_path(position);
        let json = match fs::read_to_string(&path) {
            Ok(json) => json,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(PersistenceError::Io { path, source }),
        };

        let record: ChunkRecord = serde_json::from_str(&json)?;
        if ChunkCoordinate::new(record.x, record.z) != position {
            return Err(PersistenceError::CorruptChunk(position));
        }
        record.into_chunk().map(Some)
    }

    fn save(&mut self, chunk: &Chunk) -> Result<(), PersistenceError> {
        let path = self.chunk_path(chunk.position);
        let json = serde_json::to_string(&ChunkRecord::from_chunk(chunk))?;
        fs::write(&path, json).map_err(|source| PersistenceError::Io { path, source })
    }
}
