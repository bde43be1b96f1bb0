use std::sync::Arc;

use tilevox_geom::{IVec2, IVec3};
use tilevox_mesh_cpu::{BufferPool, MeshBuild, Pooled, Texel, UvVolume};
use tilevox_tiles::{TILE_SIZE, TileId};

use crate::settings::RenderMode;

/// Voxel sub-volume and mesh of one canonical tile inside a [`crate::Pattern3D`].
///
/// Volume coordinates have +y up: volume row 0 is the bottom pixel row of the tile.
pub struct Tile3D {
    tile: TileId,
    /// Pixel positions of this tile's occurrences in the pattern grid, kept at the
    /// extremes so seam lookups always land inside the pattern:
    ///
    /// ```text
    /// 0 1 2      0 = min x & min y   1 = min y   2 = max x & min y
    /// 3 4 5      3 = min x           4 = latest  5 = max x
    /// 6 7 8      6 = min x & max y   7 = max y   8 = max x & max y
    /// ```
    anchors: [Option<IVec2>; 9],
    cells: Vec<IVec2>,
    depth: i32,
    mode: RenderMode,
    volume: Option<Pooled<UvVolume>>,
    mesh: Option<Arc<Pooled<MeshBuild>>>,
}

impl Tile3D {
    pub fn new(tile: TileId) -> Self {
        Self {
            tile,
            anchors: [None; 9],
            cells: Vec::new(),
            depth: 0,
            mode: RenderMode::Greedy,
            volume: None,
            mesh: None,
        }
    }

    /// Structural copy: same tile and occurrences, no voxel or mesh data.
    pub(crate) fn blank_copy(&self) -> Self {
        Self {
            anchors: self.anchors,
            cells: self.cells.clone(),
            ..Self::new(self.tile)
        }
    }

    #[inline]
    pub fn tile(&self) -> TileId {
        self.tile
    }

    #[inline]
    pub fn depth(&self) -> i32 {
        self.depth
    }

    #[inline]
    pub fn anchor(&self, i: usize) -> Option<IVec2> {
        self.anchors.get(i).copied().flatten()
    }

    /// Pixel origins of every occurrence of the tile in the pattern.
    pub fn cells(&self) -> &[IVec2] {
        &self.cells
    }

    /// Records one occurrence at pattern pixel position `p`.
    pub(crate) fn add_occurrence(&mut self, p: IVec2) {
        self.cells.push(p);
        let keep: [fn(IVec2, IVec2) -> bool; 9] = [
            |a: IVec2, p: IVec2| a.x >= p.x && a.y >= p.y,
            |a: IVec2, p: IVec2| a.y >= p.y,
            |a: IVec2, p: IVec2| a.x <= p.x && a.y >= p.y,
            |a: IVec2, p: IVec2| a.x >= p.x,
            |_: IVec2, _: IVec2| true,
            |a: IVec2, p: IVec2| a.x <= p.x,
            |a: IVec2, p: IVec2| a.x >= p.x && a.y <= p.y,
            |a: IVec2, p: IVec2| a.y <= p.y,
            |a: IVec2, p: IVec2| a.x <= p.x && a.y <= p.y,
        ];
        for (slot, replace) in self.anchors.iter_mut().zip(keep) {
            match slot {
                Some(a) if !replace(*a, p) => {}
                _ => *slot = Some(p),
            }
        }
    }

    pub(crate) fn init_data(&mut self, depth: i32, mode: RenderMode, pool: &Arc<BufferPool<UvVolume>>) {
        self.depth = depth;
        self.mode = mode;
        let mut volume = pool.acquire();
        volume.reinit(IVec3::new(TILE_SIZE, TILE_SIZE, depth));
        self.volume = Some(volume);
    }

    /// Stores a texel at volume position (x, y, z). Marching volumes keep one texel per
    /// voxel, so `axis` is only honoured for greedy builds.
    pub(crate) fn set_uv(&mut self, p: IVec3, texel: Option<Texel>, axis: Option<usize>) {
        let axis = match self.mode {
            RenderMode::Greedy => axis,
            RenderMode::Marching => Some(0),
        };
        if let Some(volume) = self.volume.as_mut() {
            volume.set(p, texel, axis);
        }
    }

    #[inline]
    pub fn uv(&self, p: IVec3, axis: usize) -> Option<Texel> {
        self.volume.as_ref().and_then(|v| v.get(p, axis))
    }

    #[inline]
    pub(crate) fn volume(&self) -> Option<&UvVolume> {
        self.volume.as_deref()
    }

    pub(crate) fn set_mesh(&mut self, mesh: Pooled<MeshBuild>) {
        self.mesh = Some(Arc::new(mesh));
    }

    pub fn mesh(&self) -> Option<&Arc<Pooled<MeshBuild>>> {
        self.mesh.as_ref()
    }

    /// Returns the voxel grid to its pool; the mesh stays.
    pub(crate) fn release_volume(&mut self) {
        self.volume = None;
    }

    pub(crate) fn release(&mut self) {
        self.volume = None;
        self.mesh = None;
    }

    /// Maps a volume position, possibly one step outside the tile, to pattern pixel
    /// space (+y down) through the anchor on that side.
    pub(crate) fn pattern_pos(&self, v: IVec3) -> Option<IVec3> {
        let col = match v.x {
            -1 => 0,
            TILE_SIZE => 2,
            _ => 1,
        };
        let row = match v.y {
            -1 => 6,
            TILE_SIZE => 0,
            _ => 3,
        };
        let a = self.anchor(col + row).or(self.anchor(4))?;
        Some(IVec3::new(v.x + a.x, (TILE_SIZE - 1 - v.y) + a.y, v.z))
    }
}
