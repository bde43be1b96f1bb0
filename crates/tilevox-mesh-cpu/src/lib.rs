//! CPU meshing of per-tile voxel volumes: greedy quads and multi-material marching cubes.
#![forbid(unsafe_code)]

mod face;
mod greedy;
mod marching;
mod mesh_build;
mod pool;
mod tables;
mod volume;

pub use face::Face;
pub use greedy::{GreedyColoring, mesh_greedy};
pub use marching::{MarchingField, mesh_marching};
pub use mesh_build::MeshBuild;
pub use pool::{BufferPool, Pooled, Recycle};
pub use volume::{Texel, UvVolume};

/// Palette lookups and atlas mapping for the texture a volume samples from.
pub trait TexelSource {
    /// Palette index (0 = transparent) of a texture coordinate.
    fn color(&self, texel: Texel) -> u8;
    /// UV of a (possibly fractional) texture coordinate.
    fn coord_to_uv(&self, coord: [f32; 2]) -> [f32; 2];
}
