use tilevox_geom::Vec3;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Face {
    PosX = 0,
    PosY = 1,
    PosZ = 2,
    NegX = 3,
    NegY = 4,
    NegZ = 5,
}

impl Face {
    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Face of a sweep along `axis`; back faces look toward the negative axis.
    #[inline]
    pub fn from_axis(axis: usize, back: bool) -> Face {
        match (axis, back) {
            (0, false) => Face::PosX,
            (1, false) => Face::PosY,
            (2, false) => Face::PosZ,
            (0, true) => Face::NegX,
            (1, true) => Face::NegY,
            _ => Face::NegZ,
        }
    }

    #[inline]
    pub fn axis(self) -> usize {
        self.index() % 3
    }

    #[inline]
    pub fn normal(self) -> Vec3 {
        match self {
            Face::PosX => Vec3::new(1.0, 0.0, 0.0),
            Face::PosY => Vec3::new(0.0, 1.0, 0.0),
            Face::PosZ => Vec3::new(0.0, 0.0, 1.0),
            Face::NegX => Vec3::new(-1.0, 0.0, 0.0),
            Face::NegY => Vec3::new(0.0, -1.0, 0.0),
            Face::NegZ => Vec3::new(0.0, 0.0, -1.0),
        }
    }
}
