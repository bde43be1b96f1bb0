//! Tile canonicalization: raw 2bpp tile planes to shared, analyzed canonical tiles.
#![forbid(unsafe_code)]

mod dir;
mod ids;
mod raw;
mod registry;
mod tile;

pub use dir::Dir;
pub use ids::{PatternId, TileId};
pub use raw::RawTile;
pub use registry::TileRegistry;
pub use tile::{CanonicalTile, ColorSet, Density, TileClass};

/// Tile edge length in pixels.
pub const TILE_SIZE: i32 = 8;
