use serde::Deserialize;

use crate::error::AtlasError;

fn default_page_size() -> i32 {
    512
}
fn default_page_count() -> u32 {
    32
}
fn default_ring_capacity() -> usize {
    1024
}

/// `[atlas]` section of the engine config.
#[derive(Clone, Debug, Deserialize)]
pub struct AtlasSettings {
    #[serde(default = "default_page_size")]
    pub page_size: i32,
    #[serde(default = "default_page_count")]
    pub page_count: u32,
    /// Pending page writes held between two commits; older writes are overwritten past this.
    #[serde(default = "default_ring_capacity")]
    pub ring_capacity: usize,
}

impl Default for AtlasSettings {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            page_count: default_page_count(),
            ring_capacity: default_ring_capacity(),
        }
    }
}

impl AtlasSettings {
    /// Checks that a page can hold a texture whose longer side is `largest` pixels.
    pub fn validate(&self, largest: i32) -> Result<(), AtlasError> {
        if self.page_size < largest || self.page_count == 0 {
            return Err(AtlasError::PageTooSmall {
                page_size: self.page_size,
                required: largest,
            });
        }
        Ok(())
    }
}
