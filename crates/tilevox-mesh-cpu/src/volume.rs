use tilevox_geom::IVec3;

use crate::pool::Recycle;

/// Pixel coordinate inside a pattern texture.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub struct Texel {
    pub x: u16,
    pub y: u16,
}

impl Texel {
    #[inline]
    pub const fn new(x: u16, y: u16) -> Self {
        Self { x, y }
    }

    #[inline]
    pub fn as_f32(self) -> [f32; 2] {
        [self.x as f32, self.y as f32]
    }
}

/// Dense voxel grid holding, per voxel and per sweep axis, the texel its face samples.
/// `None` means the voxel is empty as seen from that axis.
#[derive(Clone, Debug, Default)]
pub struct UvVolume {
    size: IVec3,
    cells: Vec<Option<Texel>>,
}

impl UvVolume {
    pub fn new(size: IVec3) -> Self {
        let mut v = Self::default();
        v.reinit(size);
        v
    }

    /// Resizes to `size` and empties every cell, keeping the allocation.
    pub fn reinit(&mut self, size: IVec3) {
        let size = IVec3::new(size.x.max(0), size.y.max(0), size.z.max(0));
        self.size = size;
        self.cells.clear();
        self.cells
            .resize((size.x * size.y * size.z) as usize * 3, None);
    }

    #[inline]
    pub fn size(&self) -> IVec3 {
        self.size
    }

    #[inline]
    pub fn in_bounds(&self, p: IVec3) -> bool {
        p.x >= 0
            && p.y >= 0
            && p.z >= 0
            && p.x < self.size.x
            && p.y < self.size.y
            && p.z < self.size.z
    }

    #[inline]
    fn slot(&self, p: IVec3) -> usize {
        (((p.z * self.size.y + p.y) * self.size.x + p.x) * 3) as usize
    }

    /// Sets the texel seen along `axis`, or along every axis when `axis` is `None`.
    /// Out-of-range positions are ignored.
    pub fn set(&mut self, p: IVec3, texel: Option<Texel>, axis: Option<usize>) {
        if !self.in_bounds(p) {
            return;
        }
        let base = self.slot(p);
        match axis {
            Some(a) => self.cells[base + a.min(2)] = texel,
            None => self.cells[base..base + 3].fill(texel),
        }
    }

    #[inline]
    pub fn get(&self, p: IVec3, axis: usize) -> Option<Texel> {
        if !self.in_bounds(p) {
            return None;
        }
        self.cells[self.slot(p) + axis.min(2)]
    }

    /// Voxels with a texel on at least one axis.
    pub fn filled_count(&self) -> usize {
        self.cells
            .chunks_exact(3)
            .filter(|c| c.iter().any(Option::is_some))
            .count()
    }
}

impl Recycle for UvVolume {
    fn recycle(&mut self) {
        self.cells.clear();
        self.size = IVec3::default();
    }
}
