use log::info;

/// Counters of the mesh scheduler, logged and reset every interval.
///
/// `visible`, `cached` and `pending` are gauges sampled at the end of the last
/// frame; the rest accumulate over the interval.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchedulerStats {
    /// Frames in this interval
    pub frames: u64,
    /// Visible coordinates
    pub visible: usize,
    /// Cache entries
    pub cached: usize,
    /// Builds in flight
    pub pending: usize,
    /// Background builds submitted
    pub async_started: u64,
    /// Background results stored in the cache
    pub async_completed: u64,
    /// Priority rebuilds run on the frame thread
    pub sync_built: u64,
    /// Background builds cancelled
    pub cancelled: u64,
    /// Background results dropped for an outdated epoch or revision
    pub stale_discarded: u64,
    /// Builds that failed
    pub failures: u64,
    /// Background builds without any faces
    pub empty_results: u64,
    /// Cache entries dropped by the capacity policy
    pub evicted: u64,
}

impl SchedulerStats {
    /// Writes the counters to the log.
    pub fn log(&self, frame: u64) {
        info!(
            "Mesh stats at frame {} over {} frames: visible {}, cached {}, pending {}, \
             async started {}, async completed {}, sync built {}, cancelled {}, \
             stale discarded {}, failures {}, empty {}, evicted {}",
            frame,
            self.frames,
            self.visible,
            self.cached,
            self.pending,
            self.async_started,
            self.async_completed,
            self.sync_built,
            self.cancelled,
            self.stale_discarded,
            self.failures,
            self.empty_results,
            self.evicted,
        );
    }

    /// Starts a new interval.
    pub fn reset(&mut self) {
        *self = SchedulerStats::default();
    }
}
