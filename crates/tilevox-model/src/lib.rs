//! Voxel model building: pattern textures extruded into per-tile volumes and meshed.
#![forbid(unsafe_code)]

mod draw;
mod pattern3d;
mod settings;
mod state;
mod tile3d;
mod upload;

pub use pattern3d::{ALL_TAG, BuildContext, Deform, Geometry, MeshPools, Pattern3D};
pub use settings::{ColorMode, Layer, LayerSettings, LayerSlot, ModelSettings, RenderMode};
pub use state::{ModelState, SharedState};
pub use tile3d::Tile3D;
pub use upload::{ModelUpload, TileMesh, UploadSink};

/// Depth cap of any voxel volume.
pub const MAX_DEPTH: i32 = 96;
