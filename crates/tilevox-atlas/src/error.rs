use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AtlasError {
    /// No free region on any page can hold a `width` x `height` texture.
    OutOfSpace { width: i32, height: i32, pages: u32 },
    /// Pages cannot hold the largest texture the video source can produce.
    PageTooSmall { page_size: i32, required: i32 },
}

impl fmt::Display for AtlasError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AtlasError::OutOfSpace {
                width,
                height,
                pages,
            } => write!(
                f,
                "atlas out of space: no free region for a {width}x{height} texture in {pages} pages"
            ),
            AtlasError::PageTooSmall {
                page_size,
                required,
            } => write!(
                f,
                "atlas page size {page_size} is smaller than the largest texture ({required})"
            ),
        }
    }
}

impl std::error::Error for AtlasError {}
