//! tilevox: NES tile frames in, layered voxel meshes out.
#![forbid(unsafe_code)]

pub mod config;
pub mod synth;

pub use config::EngineConfig;
pub use synth::{Scene, SourceFrame, SyntheticSource};

pub use tilevox_atlas as atlas;
pub use tilevox_geom as geom;
pub use tilevox_mesh_cpu as mesh;
pub use tilevox_model as model;
pub use tilevox_pattern as pattern;
pub use tilevox_runtime as runtime;
pub use tilevox_segment as segment;
pub use tilevox_tiles as tiles;
