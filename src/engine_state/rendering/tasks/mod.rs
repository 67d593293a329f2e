//! Background tasks of the rendering side.

pub mod chunk_mesh_generation_task;
