//! # Streaming Configuration
//!
//! Tunables for world streaming and mesh scheduling. Every field has a default
//! so a configuration file only needs to list what it changes:
//!
//! ```json
//! { "seed": 42, "render_distance": 6, "save_directory": "saves/world" }
//! ```

use std::{fs, path::Path, path::PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Environment variable naming a JSON configuration file for [`crate::run`].
pub const CONFIG_ENV_VAR: &str = "VOXEL_STREAMING_CONFIG";

/// All tunables of the streaming engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamingConfig {
    /// World seed for terrain generation
    pub seed: i64,
    /// Radius in chunks within which chunks are meshed and rendered
    pub render_distance: i32,
    /// Radius in chunks within which chunks are kept loaded
    pub load_radius: i32,
    /// Completed asynchronous builds drained per frame (K)
    pub max_async_builds_per_frame: usize,
    /// Synchronous priority rebuilds per frame (M)
    pub max_sync_builds_per_frame: usize,
    /// Generated chunks installed into the world per frame
    pub max_generated_chunks_per_frame: usize,
    /// Number of background worker threads
    pub worker_count: usize,
    /// Frames between two statistics log lines
    pub stats_interval_frames: u64,
    /// Upper bound on cached meshes; `None` keeps every mesh
    pub mesh_cache_capacity: Option<usize>,
    /// Seconds between automatic saves of modified chunks
    pub save_interval_secs: u64,
    /// Directory for chunk files; `None` keeps saved chunks in memory
    pub save_directory: Option<PathBuf>,
}

impl Default for StreamingConfig {
    fn default() -> Self {
        StreamingConfig {
            seed: 12345,
            render_distance: 4,
            load_radius: 5,
            max_async_builds_per_frame: 12,
            max_sync_builds_per_frame: 5,
            max_generated_chunks_per_frame: 8,
            worker_count: 4,
            stats_interval_frames: 120,
            mesh_cache_capacity: None,
            save_interval_secs: 30,
            save_directory: None,
        }
    }
}

impl StreamingConfig {
    /// Parses and validates a JSON configuration.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: StreamingConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a JSON configuration file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    /// Checks that every budget and radius is usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.render_distance <= 0 {
            return Err(ConfigError::Invalid(format!(
                "render_distance must be positive, got {}",
                self.render_distance
            )));
        }
        if self.load_radius < self.render_distance {
            return Err(ConfigError::Invalid(format!(
                "load_radius ({}) must be at least render_distance ({})",
                self.load_radius, self.render_distance
            )));
        }
        let budgets = [
            ("max_async_builds_per_frame", self.max_async_builds_per_frame),
            ("max_sync_builds_per_frame", self.max_sync_builds_per_frame),
            (
                "max_generated_chunks_per_frame",
                self.max_generated_chunks_per_frame,
            ),
            ("worker_count", self.worker_count),
        ];
        for (name, value) in budgets {
            if value == 0 {
                return Err(ConfigError::Invalid(format!("{name} must be positive")));
            }
        }
        if self.stats_interval_frames == 0 {
            return Err(ConfigError::Invalid(
                "stats_interval_frames must be positive".to_string(),
            ));
        }
        if self.mesh_cache_capacity == Some(0) {
            return Err(ConfigError::Invalid(
                "mesh_cache_capacity must be positive when set".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = StreamingConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.max_async_builds_per_frame, 12);
        assert_eq!(config.max_sync_builds_per_frame, 5);
        assert_eq!(config.render_distance, 4);
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config =
            StreamingConfig::from_json_str(r#"{ "seed": 42, "render_distance": 2, "load_radius": 3 }"#)
                .unwrap();
        assert_eq!(config.seed, 42);
        assert_eq!(config.render_distance, 2);
        assert_eq!(config.worker_count, 4);
        assert_eq!(config.save_directory, None);
    }

    #[test]
    fn rejects_unusable_values() {
        assert!(matches!(
            StreamingConfig::from_json_str(r#"{ "render_distance": 0 }"#),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            StreamingConfig::from_json_str(r#"{ "max_sync_builds_per_frame": 0 }"#),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            StreamingConfig::from_json_str(r#"{ "render_distance": 6, "load_radius": 5 }"#),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            StreamingConfig::from_json_str("{ not json"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let result = StreamingConfig::from_path("/definitely/not/here.json");
        assert!(matches!(result, Err(ConfigError::Io { .. })));
    }
}
