//! Texture atlas: shelf-packed slots in fixed-size pages with deferred page writes.
#![forbid(unsafe_code)]

mod allocator;
mod error;
mod pages;
mod palette;
mod settings;
mod texture;

pub use allocator::{AtlasAllocator, AtlasSlot, atlas_channel};
pub use error::AtlasError;
pub use pages::AtlasPages;
pub use palette::{NES_PALETTE, PaletteIndex, Rgba};
pub use settings::AtlasSettings;
pub use texture::{ColorFormat, TextureData, TextureId};
