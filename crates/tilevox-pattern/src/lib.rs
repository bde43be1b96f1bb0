//! Pattern cache: tile-set keyed 3D patterns in a permanent and a provisional tier.
#![forbid(unsafe_code)]

mod pattern;
mod store;

pub use pattern::{Lifecycle, Pattern, PatternDraft, UNCONSTRAINED, VARIANT_OFFSET};
pub use store::{PatternStore, StoreStats};
