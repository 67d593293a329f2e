//! Mesh generation and scheduling for voxel rendering.
//!
//! This module decides, every frame, which chunks get their geometry rebuilt
//! and where that work runs. The key goals are:
//! 1. Never block the frame on background work
//! 2. Show edits in the very next frame
//! 3. Bound the work done per frame, whatever the world or edit burst size
//!
//! # Architecture
//! - `ChunkMeshScheduler`: Main interface, owns the cache and all in-flight bookkeeping
//! - `MeshCache`: The geometry that is currently displayable, one entry per chunk
//! - `VisibleSet`: Chunks within render distance of the viewpoint, nearest first
//! - `MeshBuildWorkforce`: Runs background builds and hands back cancellable handles
//! - `mesh/`: The culled-face mesher and the geometry types
//!
//! # Frame Order
//! 1. Compute the visible set
//! 2. Drain at most K finished background builds into the cache
//! 3. Rebuild at most M priority chunks synchronously
//! 4. Start at most K background builds for visible chunks without geometry
//! 5. Apply the optional cache capacity
//!
//! # Epochs
//! Every time a coordinate is reported as a priority chunk its epoch is
//! bumped. A background build remembers the epoch and chunk revision it was
//! started with, and its result is thrown away if either moved on by the time
//! it is drained. A synchronous rebuild therefore always wins over a racing
//! background build of the same coordinate.

use std::{
    collections::{BTreeMap, HashMap, HashSet, VecDeque},
    sync::Arc,
};

use cgmath::Point3;
use log::{debug, trace, warn};

mod mesh;
mod mesh_cache;
mod stats;
mod visibility;
mod workforce;

pub use mesh::*;
pub use mesh_cache::MeshCache;
pub use stats::SchedulerStats;
pub use visibility::VisibleSet;
pub use workforce::MeshBuildWorkforce;

use crate::{
    config::StreamingConfig,
    engine_state::{
        rendering::texture::{TextureAtlas, TextureKey},
        task_management::task::TaskHandle,
        voxels::{coordinate::ChunkCoordinate, world::ChunkStore},
    },
    error::BuildError,
};

/// A background build the scheduler is waiting for.
struct PendingBuild {
    handle: TaskHandle<MeshGeometry>,
    /// Epoch of the coordinate when the build started
    epoch: u64,
    /// Revision of the snapshot being built
    revision: u64,
}

/// One draw of one chunk's faces with one texture.
#[derive(Debug, Clone)]
pub struct RenderBatch {
    /// Texture to bind
    pub texture: TextureKey,
    /// Chunk the geometry belongs to
    pub coordinate: ChunkCoordinate,
    /// The geometry, shared with the cache
    pub batch: Arc<VertexBatch>,
}

/// What one call to [`ChunkMeshScheduler::update`] did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameReport {
    /// Chunks in the visible set
    pub visible: usize,
    /// Finished background builds observed
    pub drained: usize,
    /// Priority chunks rebuilt on the frame thread
    pub sync_built: usize,
    /// Background builds started
    pub async_started: usize,
    /// Background results dropped as outdated
    pub stale_discarded: usize,
    /// Background builds cancelled in favour of a synchronous rebuild
    pub cancelled: usize,
    /// Cache entries dropped by the capacity policy
    pub evicted: usize,
}

/// Keeps the mesh cache in step with the chunk store around a moving
/// viewpoint.
///
/// The scheduler is owned by the frame thread. Workers only ever see chunk
/// snapshots and the shared atlas; their results come back through handles
/// that are polled here.
///
/// Per coordinate, outside of `update`, exactly one of these holds: no cache
/// entry and no pending build, a pending build and no cache entry, or a cache
/// entry and no pending build.
pub struct ChunkMeshScheduler {
    /// Render radius in chunks
    render_distance: i32,
    /// Background completions drained and builds started per frame (K)
    max_async_builds: usize,
    /// Synchronous rebuilds per frame (M)
    max_sync_builds: usize,
    /// Optional bound on cache entries
    cache_capacity: Option<usize>,
    /// Texture mapping shared with every build
    atlas: Arc<TextureAtlas>,
    /// Displayable geometry
    cache: MeshCache,
    /// Background builds in flight
    pending: HashMap<ChunkCoordinate, PendingBuild>,
    /// Coordinates waiting for a synchronous rebuild, in report order
    priority: VecDeque<ChunkCoordinate>,
    /// Members of `priority`
    queued_priority: HashSet<ChunkCoordinate>,
    /// Bumped whenever a coordinate becomes a priority chunk
    epochs: HashMap<ChunkCoordinate, u64>,
    /// Coordinates whose last build was empty or failed; not resubmitted
    /// until they turn dirty or re-enter the visible set
    settled: HashSet<ChunkCoordinate>,
    /// Chunk revision whose synchronous rebuild failed; that revision stays
    /// dirty but isn't promoted again
    failed_revisions: HashMap<ChunkCoordinate, u64>,
    /// Visible set of the last frame
    visible: VisibleSet,
    /// Frames processed so far
    frame: u64,
    stats: SchedulerStats,
    /// Frames between two statistics log lines
    stats_interval: u64,
}

impl ChunkMeshScheduler {
    /// Creates a scheduler with the budgets of `config`.
    pub fn new(config: &StreamingConfig, atlas: Arc<TextureAtlas>) -> Self {
        ChunkMeshScheduler {
            render_distance: config.render_distance,
            max_async_builds: config.max_async_builds_per_frame,
            max_sync_builds: config.max_sync_builds_per_frame,
            cache_capacity: config.mesh_cache_capacity,
            atlas,
            cache: MeshCache::new(),
            pending: HashMap::new(),
            priority: VecDeque::new(),
            queued_priority: HashSet::new(),
            epochs: HashMap::new(),
            settled: HashSet::new(),
            failed_revisions: HashMap::new(),
            visible: VisibleSet::default(),
            frame: 0,
            stats: SchedulerStats::default(),
            stats_interval: config.stats_interval_frames,
        }
    }

    /// Reports chunks that need a synchronous rebuild, typically after edits.
    ///
    /// Each coordinate's epoch is bumped, which invalidates any background
    /// build started before this call. Coordinates already waiting keep their
    /// place in the queue.
    pub fn set_priority_chunks(&mut self, coordinates: impl IntoIterator<Item = ChunkCoordinate>) {
        for coordinate in coordinates {
            *self.epochs.entry(coordinate).or_insert(0) += 1;
            self.settled.remove(&coordinate);
            if self.queued_priority.insert(coordinate) {
                self.priority.push_back(coordinate);
            }
        }
    }

    /// Throws away whatever geometry or build exists for `coordinate` and
    /// queues a synchronous rebuild.
    pub fn force_rebuild(
        &mut self,
        coordinate: ChunkCoordinate,
        workforce: &mut impl MeshBuildWorkforce,
    ) {
        if let Some(pending) = self.pending.remove(&coordinate) {
            workforce.cancel(&pending.handle);
            self.stats.cancelled += 1;
        }
        self.cache.remove(coordinate);
        self.set_priority_chunks([coordinate]);
    }

    /// Runs one frame of scheduling around `viewpoint`.
    pub fn update(
        &mut self,
        viewpoint: Point3<f32>,
        store: &mut impl ChunkStore,
        workforce: &mut impl MeshBuildWorkforce,
    ) -> FrameReport {
        let mut report = FrameReport::default();

        self.visible = VisibleSet::compute(
            ChunkCoordinate::from_world_position(viewpoint),
            self.render_distance,
        );
        report.visible = self.visible.len();
        self.refresh_visible(store);

        self.drain_completed(store, &mut report);
        self.process_priority(store, workforce, &mut report);
        self.start_async_builds(store, workforce, &mut report);
        self.apply_cache_capacity(&mut report);

        self.frame += 1;
        self.stats.frames += 1;
        self.stats.visible = self.visible.len();
        self.stats.cached = self.cache.len();
        self.stats.pending = self.pending.len();
        if self.stats_interval > 0 && self.frame % self.stats_interval == 0 {
            self.stats.log(self.frame);
            self.stats.reset();
        }

        report
    }

    /// Forgets settled coordinates that left the view and promotes dirty
    /// visible chunks nobody reported.
    fn refresh_visible(&mut self, store: &impl ChunkStore) {
        let visible = &self.visible;
        self.settled.retain(|coordinate| visible.contains(*coordinate));
        self.failed_revisions.retain(|coordinate, _| visible.contains(*coordinate));

        let unreported: Vec<ChunkCoordinate> = self
            .visible
            .iter()
            .filter(|coordinate| {
                !self.queued_priority.contains(coordinate) && store.is_dirty(*coordinate)
            })
            .filter(|coordinate| {
                let revision = store.chunk_at(*coordinate).map(|chunk| chunk.revision());
                self.failed_revisions.get(coordinate).copied() != revision
            })
            .collect();
        if !unreported.is_empty() {
            debug!("Promoting {} dirty chunks to priority", unreported.len());
            self.set_priority_chunks(unreported);
        }
    }

    /// Moves finished background builds into the cache, at most K per frame.
    fn drain_completed(&mut self, store: &impl ChunkStore, report: &mut FrameReport) {
        let center = self.visible.center();
        let mut ready: Vec<ChunkCoordinate> = self
            .pending
            .iter()
            .filter(|(_, pending)| pending.handle.is_ready())
            .map(|(coordinate, _)| *coordinate)
            .collect();
        ready.sort_by_key(|coordinate| (coordinate.distance_squared(&center), *coordinate));
        ready.truncate(self.max_async_builds);

        for coordinate in ready {
            let Some(mut pending) = self.pending.remove(&coordinate) else {
                continue;
            };
            let Some(result) = pending.handle.take() else {
                continue;
            };
            report.drained += 1;

            match result {
                Ok(geometry) => {
                    if self.is_outdated(store, coordinate, &pending) {
                        trace!("Discarding outdated mesh of {}", coordinate);
                        report.stale_discarded += 1;
                        self.stats.stale_discarded += 1;
                    } else if geometry.is_empty() {
                        self.settled.insert(coordinate);
                        self.stats.empty_results += 1;
                    } else {
                        debug!(
                            "Background mesh of {} done, {} quads",
                            coordinate,
                            geometry.quad_count()
                        );
                        self.cache.insert(geometry);
                        self.stats.async_completed += 1;
                    }
                }
                Err(BuildError::Cancelled) => {
                    self.stats.cancelled += 1;
                }
                Err(error) => {
                    warn!("Background mesh of {} failed: {}", coordinate, error);
                    self.settled.insert(coordinate);
                    self.stats.failures += 1;
                }
            }
        }
    }

    fn is_outdated(
        &self,
        store: &impl ChunkStore,
        coordinate: ChunkCoordinate,
        pending: &PendingBuild,
    ) -> bool {
        if pending.epoch != self.epoch(coordinate) {
            return true;
        }
        match store.chunk_at(coordinate) {
            Some(chunk) => chunk.is_dirty() || chunk.revision() != pending.revision,
            None => true,
        }
    }

    /// Rebuilds priority chunks on the frame thread, at most M per frame. The
    /// rest stay queued for later frames.
    fn process_priority(
        &mut self,
        store: &mut impl ChunkStore,
        workforce: &mut impl MeshBuildWorkforce,
        report: &mut FrameReport,
    ) {
        while report.sync_built < self.max_sync_builds {
            let Some(coordinate) = self.priority.pop_front() else {
                break;
            };
            self.queued_priority.remove(&coordinate);

            if let Some(pending) = self.pending.remove(&coordinate) {
                workforce.cancel(&pending.handle);
                report.cancelled += 1;
                self.stats.cancelled += 1;
            }
            self.cache.remove(coordinate);
            self.settled.remove(&coordinate);

            let Some(chunk) = store.chunk_at(coordinate) else {
                debug!("Priority chunk {} is not loaded, dropping it", coordinate);
                continue;
            };
            let snapshot = chunk.snapshot();

            match build_geometry(&snapshot, &self.atlas) {
                Ok(geometry) => {
                    debug!(
                        "Rebuilt {} synchronously, {} quads",
                        coordinate,
                        geometry.quad_count()
                    );
                    self.cache.insert(geometry);
                    self.failed_revisions.remove(&coordinate);
                    store.mark_clean(coordinate);
                }
                Err(error) => {
                    warn!("Synchronous mesh of {} failed: {}", coordinate, error);
                    self.settled.insert(coordinate);
                    self.failed_revisions.insert(coordinate, snapshot.revision);
                    self.stats.failures += 1;
                }
            }
            report.sync_built += 1;
            self.stats.sync_built += 1;
        }
    }

    /// Submits background builds for visible chunks without geometry, nearest
    /// first, at most K per frame.
    fn start_async_builds(
        &mut self,
        store: &impl ChunkStore,
        workforce: &mut impl MeshBuildWorkforce,
        report: &mut FrameReport,
    ) {
        for coordinate in self.visible.iter() {
            if report.async_started >= self.max_async_builds {
                break;
            }
            if self.cache.contains(coordinate)
                || self.pending.contains_key(&coordinate)
                || self.queued_priority.contains(&coordinate)
                || self.settled.contains(&coordinate)
            {
                continue;
            }
            let Some(chunk) = store.chunk_at(coordinate) else {
                continue;
            };
            if chunk.is_dirty() || !chunk.has_visible_blocks() {
                continue;
            }

            let epoch = self.epoch(coordinate);
            let handle = workforce.submit(coordinate, chunk.snapshot(), self.atlas.clone());
            self.pending.insert(
                coordinate,
                PendingBuild {
                    handle,
                    epoch,
                    revision: chunk.revision(),
                },
            );
            report.async_started += 1;
            self.stats.async_started += 1;
        }
    }

    /// Marks visible entries as used and trims the cache down to its capacity,
    /// never evicting visible chunks.
    fn apply_cache_capacity(&mut self, report: &mut FrameReport) {
        let Some(capacity) = self.cache_capacity else {
            return;
        };
        for coordinate in self.visible.iter() {
            self.cache.touch(coordinate);
        }
        let visible = &self.visible;
        let evicted = self.cache.trim(capacity, |coordinate| visible.contains(coordinate));
        report.evicted = evicted.len();
        self.stats.evicted += evicted.len() as u64;
    }

    /// The draws of the current frame, grouped by texture.
    ///
    /// All batches of one texture come before any batch of the next, in
    /// ascending texture order. Within a texture, chunks follow the visible
    /// set, nearest first. Chunks waiting for a priority rebuild are left out,
    /// so stale geometry is never drawn.
    pub fn current_frame_batches(&self) -> Vec<RenderBatch> {
        let mut by_texture: BTreeMap<TextureKey, Vec<RenderBatch>> = BTreeMap::new();
        for coordinate in self.visible.iter() {
            if self.queued_priority.contains(&coordinate) {
                continue;
            }
            let Some(geometry) = self.cache.peek(coordinate) else {
                continue;
            };
            for (texture, batch) in geometry.batches() {
                by_texture.entry(*texture).or_default().push(RenderBatch {
                    texture: *texture,
                    coordinate,
                    batch: batch.clone(),
                });
            }
        }
        by_texture.into_values().flatten().collect()
    }

    /// Builds every loaded chunk with visible blocks on the calling thread,
    /// e.g. before the first frame. Background builds the new geometry
    /// supersedes are cancelled.
    ///
    /// # Returns
    /// The number of chunks built.
    pub fn build_initial(
        &mut self,
        store: &mut impl ChunkStore,
        workforce: &mut impl MeshBuildWorkforce,
    ) -> usize {
        let mut built = Vec::new();
        for chunk in store.loaded_chunks() {
            if !chunk.has_visible_blocks() {
                continue;
            }
            match build_geometry(&chunk.snapshot(), &self.atlas) {
                Ok(geometry) => {
                    built.push(chunk.position);
                    self.cache.insert(geometry);
                }
                Err(error) => {
                    warn!("Initial mesh of {} failed: {}", chunk.position, error);
                    self.settled.insert(chunk.position);
                    self.stats.failures += 1;
                }
            }
        }

        for coordinate in &built {
            if let Some(pending) = self.pending.remove(coordinate) {
                workforce.cancel(&pending.handle);
                self.stats.cancelled += 1;
            }
            self.failed_revisions.remove(coordinate);
            if self.queued_priority.remove(coordinate) {
                self.priority.retain(|queued| queued != coordinate);
            }
            store.mark_clean(*coordinate);
        }
        self.stats.sync_built += built.len() as u64;
        debug!("Built {} meshes on startup", built.len());
        built.len()
    }

    /// Drops the geometry and pending builds of chunks that left the store.
    pub fn evict(
        &mut self,
        coordinates: impl IntoIterator<Item = ChunkCoordinate>,
        workforce: &mut impl MeshBuildWorkforce,
    ) {
        for coordinate in coordinates {
            if let Some(pending) = self.pending.remove(&coordinate) {
                workforce.cancel(&pending.handle);
                self.stats.cancelled += 1;
            }
            self.cache.remove(coordinate);
            self.settled.remove(&coordinate);
            self.failed_revisions.remove(&coordinate);
            self.epochs.remove(&coordinate);
            if self.queued_priority.remove(&coordinate) {
                self.priority.retain(|queued| *queued != coordinate);
            }
        }
    }

    /// Cancels every pending build and forgets all geometry and queued work.
    pub fn cleanup(&mut self, workforce: &mut impl MeshBuildWorkforce) {
        for (_, pending) in self.pending.drain() {
            workforce.cancel(&pending.handle);
        }
        workforce.cancel_all();
        self.cache.clear();
        self.priority.clear();
        self.queued_priority.clear();
        self.settled.clear();
        self.failed_revisions.clear();
        self.epochs.clear();
        debug!("Mesh scheduler cleaned up");
    }

    /// Whether `coordinate` has displayable geometry, possibly empty.
    pub fn has_mesh_for_chunk(&self, coordinate: ChunkCoordinate) -> bool {
        self.cache.contains(coordinate)
    }

    /// The cached geometry of `coordinate`.
    pub fn cached_geometry(&self, coordinate: ChunkCoordinate) -> Option<&MeshGeometry> {
        self.cache.peek(coordinate)
    }

    /// Number of cache entries.
    pub fn cached_count(&self) -> usize {
        self.cache.len()
    }

    /// Number of background builds in flight.
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Whether a background build of `coordinate` is in flight.
    pub fn is_pending(&self, coordinate: ChunkCoordinate) -> bool {
        self.pending.contains_key(&coordinate)
    }

    /// Number of coordinates waiting for a synchronous rebuild.
    pub fn priority_count(&self) -> usize {
        self.priority.len()
    }

    /// Current epoch of `coordinate`.
    pub fn epoch(&self, coordinate: ChunkCoordinate) -> u64 {
        self.epochs.get(&coordinate).copied().unwrap_or(0)
    }

    /// The visible set of the last frame.
    pub fn visible(&self) -> &VisibleSet {
        &self.visible
    }

    /// Counters of the current statistics interval.
    pub fn stats(&self) -> &SchedulerStats {
        &self.stats
    }

    /// Frames processed so far.
    pub fn frame(&self) -> u64 {
        self.frame
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine_state::{
        task_management::task::{task_pair, TaskCompleter},
        voxels::{
            block::{block_type::BlockType, Block},
            chunk::{Chunk, ChunkSnapshot},
        },
    };

    #[derive(Default)]
    struct TestStore {
        chunks: BTreeMap<ChunkCoordinate, Chunk>,
    }

    impl TestStore {
        fn with_columns(coordinates: &[ChunkCoordinate]) -> Self {
            let mut store = TestStore::default();
            for coordinate in coordinates {
                let mut chunk = Chunk::empty(*coordinate);
                chunk.set_block(Point3::new(8, 0, 8), Block::new(BlockType::STONE));
                chunk.mark_clean();
                store.chunks.insert(*coordinate, chunk);
            }
            store
        }

        fn edit(&mut self, coordinate: ChunkCoordinate, y: usize) {
            let chunk = self.chunks.get_mut(&coordinate).unwrap();
            chunk.set_block(Point3::new(0, y, 0), Block::new(BlockType::DIRT));
        }
    }

    impl ChunkStore for TestStore {
        fn chunk_at(&self, position: ChunkCoordinate) -> Option<&Chunk> {
            self.chunks.get(&position)
        }

        fn mark_clean(&mut self, position: ChunkCoordinate) {
            if let Some(chunk) = self.chunks.get_mut(&position) {
                chunk.mark_clean();
            }
        }

        fn loaded_chunks(&self) -> Vec<&Chunk> {
            self.chunks.values().collect()
        }
    }

    /// Holds builds until the test finishes them.
    #[derive(Default)]
    struct ManualWorkforce {
        builds: Vec<(Arc<ChunkSnapshot>, TaskCompleter<MeshGeometry>)>,
        submitted: usize,
    }

    impl ManualWorkforce {
        fn finish_all(&mut self) {
            let atlas = TextureAtlas::default();
            for (snapshot, completer) in self.builds.drain(..) {
                completer.complete(build_geometry(&snapshot, &atlas));
            }
        }
    }

    impl MeshBuildWorkforce for ManualWorkforce {
        fn submit(
            &mut self,
            _coordinate: ChunkCoordinate,
            snapshot: Arc<ChunkSnapshot>,
            _atlas: Arc<TextureAtlas>,
        ) -> TaskHandle<MeshGeometry> {
            let (handle, completer) = task_pair();
            self.builds.push((snapshot, completer));
            self.submitted += 1;
            handle
        }

        fn cancel_all(&mut self) {
            self.builds.clear();
        }

        fn shutdown(&mut self) {
            self.builds.clear();
        }
    }

    fn config(render_distance: i32) -> StreamingConfig {
        StreamingConfig {
            render_distance,
            load_radius: render_distance + 1,
            max_async_builds_per_frame: 12,
            max_sync_builds_per_frame: 5,
            ..StreamingConfig::default()
        }
    }

    fn origin() -> Point3<f32> {
        Point3::new(8.0, 8.0, 8.0)
    }

    #[test]
    fn visible_chunks_are_built_in_the_background() {
        let visible = VisibleSet::compute(ChunkCoordinate::new(0, 0), 1);
        let mut store = TestStore::with_columns(visible.as_slice());
        let mut workforce = ManualWorkforce::default();
        let mut scheduler = ChunkMeshScheduler::new(&config(1), Arc::new(TextureAtlas::default()));

        let first = scheduler.update(origin(), &mut store, &mut workforce);
        assert_eq!(first.async_started, 5);
        assert_eq!(scheduler.pending_count(), 5);
        assert!(scheduler.current_frame_batches().is_empty());

        workforce.finish_all();
        let second = scheduler.update(origin(), &mut store, &mut workforce);
        assert_eq!(second.drained, 5);
        assert_eq!(second.async_started, 0);
        assert_eq!(scheduler.cached_count(), 5);
        assert_eq!(scheduler.pending_count(), 0);
        // One stone texture per chunk
        assert_eq!(scheduler.current_frame_batches().len(), 5);
    }

    #[test]
    fn empty_chunks_never_start_builds() {
        let mut store = TestStore::default();
        store
            .chunks
            .insert(ChunkCoordinate::new(0, 0), Chunk::empty(ChunkCoordinate::new(0, 0)));
        let mut workforce = ManualWorkforce::default();
        let mut scheduler = ChunkMeshScheduler::new(&config(1), Arc::new(TextureAtlas::default()));

        let report = scheduler.update(origin(), &mut store, &mut workforce);
        assert_eq!(report.async_started, 0);
        assert_eq!(workforce.submitted, 0);
    }

    #[test]
    fn async_builds_start_at_most_k_per_frame() {
        let visible = VisibleSet::compute(ChunkCoordinate::new(0, 0), 4);
        let mut store = TestStore::with_columns(visible.as_slice());
        let mut workforce = ManualWorkforce::default();
        let mut scheduler = ChunkMeshScheduler::new(&config(4), Arc::new(TextureAtlas::default()));

        let report = scheduler.update(origin(), &mut store, &mut workforce);
        assert_eq!(report.async_started, 12);

        workforce.finish_all();
        let report = scheduler.update(origin(), &mut store, &mut workforce);
        assert_eq!(report.drained, 12);
        assert_eq!(report.async_started, 12);
    }

    #[test]
    fn edits_rebuild_synchronously_and_cancel_background_work() {
        let coordinate = ChunkCoordinate::new(0, 0);
        let mut store = TestStore::with_columns(&[coordinate]);
        let mut workforce = ManualWorkforce::default();
        let mut scheduler = ChunkMeshScheduler::new(&config(1), Arc::new(TextureAtlas::default()));

        scheduler.update(origin(), &mut store, &mut workforce);
        assert!(scheduler.is_pending(coordinate));

        store.edit(coordinate, 5);
        scheduler.set_priority_chunks([coordinate]);
        let report = scheduler.update(origin(), &mut store, &mut workforce);

        assert_eq!(report.sync_built, 1);
        assert_eq!(report.cancelled, 1);
        assert!(!scheduler.is_pending(coordinate));
        assert!(!store.is_dirty(coordinate));
        let geometry = scheduler.cached_geometry(coordinate).unwrap();
        assert_eq!(geometry.revision, store.chunk_at(coordinate).unwrap().revision());
    }

    #[test]
    fn late_background_results_lose_to_the_edit() {
        let coordinate = ChunkCoordinate::new(0, 0);
        let mut store = TestStore::with_columns(&[coordinate]);
        let mut workforce = ManualWorkforce::default();
        let mut config = config(1);
        config.max_sync_builds_per_frame = 1;
        let mut scheduler = ChunkMeshScheduler::new(&config, Arc::new(TextureAtlas::default()));

        scheduler.update(origin(), &mut store, &mut workforce);
        store.edit(coordinate, 5);
        scheduler.set_priority_chunks([coordinate]);
        // The stale build finishes before the priority pass sees it
        workforce.finish_all();

        let report = scheduler.update(origin(), &mut store, &mut workforce);
        assert_eq!(report.drained, 1);
        assert_eq!(report.stale_discarded, 1);
        assert_eq!(report.sync_built, 1);
        let geometry = scheduler.cached_geometry(coordinate).unwrap();
        assert_eq!(geometry.revision, store.chunk_at(coordinate).unwrap().revision());
    }

    #[test]
    fn priority_overflow_carries_over() {
        let visible = VisibleSet::compute(ChunkCoordinate::new(0, 0), 2);
        let mut store = TestStore::with_columns(visible.as_slice());
        let mut workforce = ManualWorkforce::default();
        let mut scheduler = ChunkMeshScheduler::new(&config(2), Arc::new(TextureAtlas::default()));

        for coordinate in visible.iter() {
            store.edit(coordinate, 3);
        }
        scheduler.set_priority_chunks(visible.iter());

        let mut frames = 0;
        while visible.iter().any(|c| store.is_dirty(c)) {
            let report = scheduler.update(origin(), &mut store, &mut workforce);
            assert!(report.sync_built <= 5);
            frames += 1;
        }
        assert_eq!(frames, 3);
        assert_eq!(scheduler.priority_count(), 0);
    }

    #[test]
    fn unreported_dirty_chunks_are_promoted() {
        let coordinate = ChunkCoordinate::new(0, 0);
        let mut store = TestStore::with_columns(&[coordinate]);
        let mut workforce = ManualWorkforce::default();
        let mut scheduler = ChunkMeshScheduler::new(&config(1), Arc::new(TextureAtlas::default()));

        store.edit(coordinate, 2);
        let report = scheduler.update(origin(), &mut store, &mut workforce);
        assert_eq!(report.sync_built, 1);
        assert_eq!(report.async_started, 0);
        assert!(scheduler.has_mesh_for_chunk(coordinate));
    }

    #[test]
    fn force_rebuild_replaces_the_cache_entry() {
        let coordinate = ChunkCoordinate::new(0, 0);
        let mut store = TestStore::with_columns(&[coordinate]);
        let mut workforce = ManualWorkforce::default();
        let mut scheduler = ChunkMeshScheduler::new(&config(1), Arc::new(TextureAtlas::default()));
        assert_eq!(scheduler.build_initial(&mut store, &mut workforce), 1);
        let before = scheduler.cached_geometry(coordinate).unwrap().clone();

        scheduler.force_rebuild(coordinate, &mut workforce);
        assert!(!scheduler.has_mesh_for_chunk(coordinate));
        let report = scheduler.update(origin(), &mut store, &mut workforce);
        assert_eq!(report.sync_built, 1);
        assert_eq!(scheduler.cached_geometry(coordinate), Some(&before));
    }

    #[test]
    fn failed_builds_are_not_retried_until_dirty() {
        let coordinate = ChunkCoordinate::new(0, 0);
        let mut store = TestStore::with_columns(&[coordinate]);
        let mut workforce = ManualWorkforce::default();
        let mut scheduler = ChunkMeshScheduler::new(&config(1), Arc::new(TextureAtlas::default()));

        scheduler.update(origin(), &mut store, &mut workforce);
        for (_, completer) in workforce.builds.drain(..) {
            completer.complete(Err(BuildError::GenerationFailure("boom".to_string())));
        }
        scheduler.update(origin(), &mut store, &mut workforce);
        scheduler.update(origin(), &mut store, &mut workforce);
        assert_eq!(workforce.submitted, 1);
        assert_eq!(scheduler.stats().failures, 1);

        store.edit(coordinate, 4);
        let report = scheduler.update(origin(), &mut store, &mut workforce);
        assert_eq!(report.sync_built, 1);
        assert!(scheduler.has_mesh_for_chunk(coordinate));
    }

    #[test]
    fn failed_synchronous_rebuild_keeps_the_chunk_dirty() {
        let coordinate = ChunkCoordinate::new(0, 0);
        let broken = Point3::new(1, 1, 1);
        let mut store = TestStore::with_columns(&[coordinate]);
        let mut workforce = ManualWorkforce::default();
        let mut scheduler = ChunkMeshScheduler::new(&config(1), Arc::new(TextureAtlas::default()));

        let chunk = store.chunks.get_mut(&coordinate).unwrap();
        chunk.set_block(broken, Block { block_type: 99 });
        scheduler.set_priority_chunks([coordinate]);
        let report = scheduler.update(origin(), &mut store, &mut workforce);
        assert_eq!(report.sync_built, 1);
        assert_eq!(scheduler.stats().failures, 1);
        assert!(store.is_dirty(coordinate));
        assert!(!scheduler.has_mesh_for_chunk(coordinate));

        // Same revision: neither promoted again nor handed to the workers
        let report = scheduler.update(origin(), &mut store, &mut workforce);
        assert_eq!(report.sync_built, 0);
        assert_eq!(report.async_started, 0);
        assert_eq!(workforce.submitted, 0);

        let chunk = store.chunks.get_mut(&coordinate).unwrap();
        chunk.set_block(broken, Block::new(BlockType::STONE));
        let report = scheduler.update(origin(), &mut store, &mut workforce);
        assert_eq!(report.sync_built, 1);
        assert!(!store.is_dirty(coordinate));
        assert!(scheduler.has_mesh_for_chunk(coordinate));
    }

    #[test]
    fn initial_build_cancels_superseded_background_work() {
        let visible = VisibleSet::compute(ChunkCoordinate::new(0, 0), 1);
        let mut store = TestStore::with_columns(visible.as_slice());
        let mut workforce = ManualWorkforce::default();
        let mut scheduler = ChunkMeshScheduler::new(&config(1), Arc::new(TextureAtlas::default()));

        scheduler.update(origin(), &mut store, &mut workforce);
        assert_eq!(workforce.builds.len(), 5);

        assert_eq!(scheduler.build_initial(&mut store, &mut workforce), 5);
        assert_eq!(scheduler.pending_count(), 0);
        assert!(workforce
            .builds
            .iter()
            .all(|(_, completer)| completer.is_cancelled()));
        assert_eq!(scheduler.stats().cancelled, 5);
    }

    #[test]
    fn capacity_never_evicts_visible_chunks() {
        let far = ChunkCoordinate::new(40, 40);
        let near = ChunkCoordinate::new(0, 0);
        let mut store = TestStore::with_columns(&[far, near]);
        let mut workforce = ManualWorkforce::default();
        let mut config = config(1);
        config.mesh_cache_capacity = Some(1);
        let mut scheduler = ChunkMeshScheduler::new(&config, Arc::new(TextureAtlas::default()));

        assert_eq!(scheduler.build_initial(&mut store, &mut workforce), 2);
        let report = scheduler.update(origin(), &mut store, &mut workforce);
        assert_eq!(report.evicted, 1);
        assert!(scheduler.has_mesh_for_chunk(near));
        assert!(!scheduler.has_mesh_for_chunk(far));
    }

    #[test]
    fn cleanup_cancels_everything() {
        let visible = VisibleSet::compute(ChunkCoordinate::new(0, 0), 1);
        let mut store = TestStore::with_columns(visible.as_slice());
        let mut workforce = ManualWorkforce::default();
        let mut scheduler = ChunkMeshScheduler::new(&config(1), Arc::new(TextureAtlas::default()));

        scheduler.update(origin(), &mut store, &mut workforce);
        scheduler.set_priority_chunks([ChunkCoordinate::new(0, 0)]);
        scheduler.cleanup(&mut workforce);

        assert_eq!(scheduler.pending_count(), 0);
        assert_eq!(scheduler.cached_count(), 0);
        assert_eq!(scheduler.priority_count(), 0);
        assert!(workforce.builds.is_empty());
    }
}
