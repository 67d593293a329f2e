//! # Voxel Streaming Entry Point
//!
//! Runs the headless streaming driver of the library.
//!
//! ## Usage
//!
//! ```bash
//! RUST_LOG=info cargo run --release
//! ```

fn main() {
    voxel_streaming::run();
}
