/// Handle of a canonical tile inside a [`crate::TileRegistry`].
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct TileId(pub u32);

impl TileId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Generation-checked handle of a pattern. A handle whose slot has been reused
/// since it was issued no longer resolves.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct PatternId {
    pub index: u32,
    pub generation: u32,
}

impl PatternId {
    #[inline]
    pub const fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }
}
