//! The authoritative store of displayable chunk geometry.
//!
//! One entry per chunk coordinate. Entries are only replaced or removed
//! explicitly; the optional capacity policy in [`MeshCache::trim`] is layered
//! on top and never touches entries the caller wants to keep.

use lru::LruCache;

use crate::engine_state::voxels::coordinate::ChunkCoordinate;

use super::mesh::MeshGeometry;

/// Geometry per chunk coordinate, ordered by most recent use.
pub struct MeshCache {
    entries: LruCache<ChunkCoordinate, MeshGeometry>,
}

impl Default for MeshCache {
    fn default() -> Self {
        MeshCache::new()
    }
}

impl MeshCache {
    /// Creates an empty cache with no implicit eviction.
    pub fn new() -> Self {
        MeshCache {
            entries: LruCache::unbounded(),
        }
    }

    /// Stores geometry for its coordinate, replacing the previous entry.
    ///
    /// # Returns
    /// The replaced geometry, if any.
    pub fn insert(&mut self, geometry: MeshGeometry) -> Option<MeshGeometry> {
        self.entries.put(geometry.coordinate, geometry)
    }

    /// Removes the entry of a coordinate.
    pub fn remove(&mut self, coordinate: ChunkCoordinate) -> Option<MeshGeometry> {
        self.entries.pop(&coordinate)
    }

    /// Looks up geometry without affecting recency.
    pub fn peek(&self, coordinate: ChunkCoordinate) -> Option<&MeshGeometry> {
        self.entries.peek(&coordinate)
    }

    /// Marks an entry as just used. Returns whether it exists.
    pub fn touch(&mut self, coordinate: ChunkCoordinate) -> bool {
        self.entries.get(&coordinate).is_some()
    }

    /// Whether a coordinate has an entry.
    pub fn contains(&self, coordinate: ChunkCoordinate) -> bool {
        self.entries.contains(&coordinate)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drops every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Evicts least recently used entries until at most `capacity` remain,
    /// skipping entries for which `keep` returns true.
    ///
    /// # Returns
    /// The evicted coordinates, least recently used first. The cache may
    /// stay above capacity if too many entries are kept.
    pub fn trim(
        &mut self,
        capacity: usize,
        keep: impl Fn(ChunkCoordinate) -> bool,
    ) -> Vec<ChunkCoordinate> {
        let excess = self.entries.len().saturating_sub(capacity);
        if excess == 0 {
            return Vec::new();
        }

        let victims: Vec<ChunkCoordinate> = self
            .entries
            .iter()
            .rev()
            .map(|(coordinate, _)| *coordinate)
            .filter(|coordinate| !keep(*coordinate))
            .take(excess)
            .collect();

        for coordinate in &victims {
            self.entries.pop(coordinate);
        }
        victims
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn geometry(x: i32, z: i32, revision: u64) -> MeshGeometry {
        MeshGeometry::empty(ChunkCoordinate::new(x, z), revision)
    }

    #[test]
    fn one_entry_per_coordinate() {
        let mut cache = MeshCache::new();
        assert!(cache.insert(geometry(0, 0, 1)).is_none());
        let replaced = cache.insert(geometry(0, 0, 2)).unwrap();
        assert_eq!(replaced.revision, 1);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.peek(ChunkCoordinate::new(0, 0)).unwrap().revision, 2);

        assert!(cache.remove(ChunkCoordinate::new(0, 0)).is_some());
        assert!(cache.is_empty());
        assert!(cache.remove(ChunkCoordinate::new(0, 0)).is_none());
    }

    #[test]
    fn trim_evicts_least_recent_unkept_entries() {
        let mut cache = MeshCache::new();
        for x in 0..5 {
            cache.insert(geometry(x, 0, 0));
        }
        // 0 becomes the most recent; 1 is now the least recent
        assert!(cache.touch(ChunkCoordinate::new(0, 0)));

        let evicted = cache.trim(2, |c| c.x == 1);
        assert_eq!(
            evicted,
            vec![
                ChunkCoordinate::new(2, 0),
                ChunkCoordinate::new(3, 0),
                ChunkCoordinate::new(4, 0)
            ]
        );
        assert!(cache.contains(ChunkCoordinate::new(0, 0)));
        assert!(cache.contains(ChunkCoordinate::new(1, 0)));
    }

    #[test]
    fn trim_can_leave_the_cache_over_capacity() {
        let mut cache = MeshCache::new();
        for x in 0..3 {
            cache.insert(geometry(x, 0, 0));
        }
        assert!(cache.trim(1, |_| true).is_empty());
        assert_eq!(cache.len(), 3);
        assert!(cache.trim(5, |_| false).is_empty());
    }
}
