#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![warn(rustdoc::invalid_rust_codeblocks)]

//! # Voxel Streaming
//!
//! Streams an unbounded voxel world around a moving viewpoint: terrain is
//! generated from a seed, chunks are loaded and evicted around the viewpoint,
//! and chunk geometry is rebuilt in the background without ever blocking the
//! frame loop, while edits show up in the very next frame.
//!
//! ## Key Modules
//!
//! * `config` - Tunables, loaded from JSON
//! * `error` - Error types of the edit, build and persistence paths
//! * `engine_state` - The world, the worker pool and the chunk mesh scheduler
//!
//! ## Architecture
//!
//! One frame thread owns all state. A worker pool generates chunks and builds
//! meshes from immutable chunk snapshots and reports back through cancellable
//! handles. The mesh scheduler bounds every kind of work done per frame.
//!
//! ## Usage
//!
//! ```rust,ignore
//! fn main() {
//!     voxel_streaming::run();
//! }
//! ```
//!
//! Drawing is left to the embedding application, which pulls texture-major
//! batches from [`engine_state::EngineState::render_batches`] every frame.

use std::time::Duration;

use cgmath::Point3;
use engine_state::{voxels::block::block_type::BlockType, EngineState};
use log::{debug, error, info};

pub mod config;
pub mod engine_state;
pub mod error;

use config::{StreamingConfig, CONFIG_ENV_VAR};

/// Frames the headless driver runs for.
const HEADLESS_FRAMES: u64 = 1200;
/// Target duration of one frame.
const FRAME_DURATION: Duration = Duration::from_millis(16);
/// Blocks the viewpoint moves along X per frame.
const WALK_SPEED: f32 = 0.25;
/// Frames between two random edits.
const EDIT_INTERVAL: u64 = 10;

/// Initialises logging and runs the headless driver.
///
/// Reads the configuration from the file named by `VOXEL_STREAMING_CONFIG`,
/// or uses the defaults. The driver walks a viewpoint through the world,
/// breaks and places blocks around it at random and saves on the way.
pub fn run() {
    let mut log_builder = env_logger::Builder::new();
    log_builder
        .target(env_logger::Target::Stdout)
        .parse_env("RUST_LOG")
        .init();

    info!("Logger initialized");

    let config = match std::env::var(CONFIG_ENV_VAR) {
        Ok(path) => match StreamingConfig::from_path(&path) {
            Ok(config) => config,
            Err(err) => {
                error!("Couldn't load configuration from {}: {}", path, err);
                return;
            }
        },
        Err(_) => StreamingConfig::default(),
    };

    let mut engine = match EngineState::new(config) {
        Ok(engine) => engine,
        Err(err) => {
            error!("Couldn't start the engine: {}", err);
            return;
        }
    };

    run_headless(&mut engine, HEADLESS_FRAMES);
    engine.shutdown();
}

/// Drives `engine` for `frames` frames without a window.
pub fn run_headless(engine: &mut EngineState, frames: u64) {
    let mut rng = fastrand::Rng::with_seed(engine.config().seed as u64);
    let mut viewpoint = Point3::new(8.0f32, 24.0, 8.0);
    let mut drawn = 0;

    for frame in 0..frames {
        let frame_start = web_time::Instant::now();

        if frame > 0 && frame % EDIT_INTERVAL == 0 {
            random_edit(engine, &mut rng, viewpoint);
        }

        engine.frame(viewpoint);
        drawn += engine.render_batches().len();
        viewpoint.x += WALK_SPEED;

        if let Some(remaining) = FRAME_DURATION.checked_sub(frame_start.elapsed()) {
            std::thread::sleep(remaining);
        }
    }

    info!(
        "Ran {} frames, {} draws, {} chunks loaded, {} meshes cached",
        frames,
        drawn,
        engine.world.loaded_count(),
        engine.mesh_scheduler.cached_count()
    );
}

/// Breaks the surface block of a random column near `viewpoint`, or places a
/// block on top of it.
fn random_edit(engine: &mut EngineState, rng: &mut fastrand::Rng, viewpoint: Point3<f32>) {
    let x = (viewpoint.x.floor() as i32).saturating_add(rng.i32(-12..=12));
    let z = (viewpoint.z.floor() as i32).saturating_add(rng.i32(-12..=12));

    let Some(surface) = (0..16).rev().find(|y| {
        engine
            .world
            .get_block(Point3::new(x, *y, z))
            .is_some_and(|block| block.is_solid())
    }) else {
        return;
    };

    let result = if rng.bool() {
        engine.break_block(Point3::new(x, surface, z))
    } else {
        let block_type = match rng.u8(0..3) {
            0 => BlockType::DIRT,
            1 => BlockType::STONE,
            _ => BlockType::SAND,
        };
        engine.place_block(Point3::new(x, surface + 1, z), block_type)
    };

    if let Err(err) = result {
        debug!("Edit at ({}, {}) skipped: {}", x, z, err);
    }
}
