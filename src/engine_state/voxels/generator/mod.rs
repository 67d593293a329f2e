//! # World Generation
//!
//! Procedural terrain for the streamed world:
//!
//! * `noise` - the deterministic height and moisture noise fields
//! * `terrain` - column layering and whole-chunk generation on top of them
//!
//! Everything in here is a pure function of the world seed, so generation can
//! run on any worker thread and always reproduces the same world.

pub mod noise;
pub mod terrain;

pub use self::noise::NoiseField;
pub use terrain::TerrainGenerator;
