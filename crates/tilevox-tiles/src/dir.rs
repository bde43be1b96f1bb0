use tilevox_geom::IVec2;

/// Seam direction between neighbouring tiles. The discriminants are used as indices
/// into reach flags, and `opposite` is `3 - d`.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[repr(u8)]
pub enum Dir {
    Right = 0,
    Down = 1,
    Up = 2,
    Left = 3,
}

impl Dir {
    pub const ALL: [Dir; 4] = [Dir::Right, Dir::Down, Dir::Up, Dir::Left];

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    #[inline]
    pub fn from_index(i: usize) -> Dir {
        match i & 3 {
            0 => Dir::Right,
            1 => Dir::Down,
            2 => Dir::Up,
            _ => Dir::Left,
        }
    }

    #[inline]
    pub fn opposite(self) -> Dir {
        Dir::from_index(3 - self.index())
    }

    /// Unit step in pixel/grid space (+y is down).
    #[inline]
    pub fn delta(self) -> IVec2 {
        match self {
            Dir::Right => IVec2::new(1, 0),
            Dir::Down => IVec2::new(0, 1),
            Dir::Up => IVec2::new(0, -1),
            Dir::Left => IVec2::new(-1, 0),
        }
    }
}
