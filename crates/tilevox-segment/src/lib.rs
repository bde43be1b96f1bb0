//! Shape segmentation: tile frames grouped into shapes and bound to cached patterns.
#![forbid(unsafe_code)]

mod create;
mod frame;
mod grid;
mod segmenter;
mod settings;
mod shape;

pub use frame::{Frame, FrameStats};
pub use grid::{GridTile, Owner, TileGrid, TileRecord, world_to_grid};
pub use segmenter::{SegmentStats, segment};
pub use settings::{SegmentSettings, TrackSettings, VideoSettings};
pub use shape::{Shape, ShapeInstance};
