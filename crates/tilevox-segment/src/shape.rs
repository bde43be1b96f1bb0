use tilevox_geom::{IVec2, Vec3};
use tilevox_model::{ALL_TAG, Layer};
use tilevox_tiles::{CanonicalTile, ColorSet, PatternId, TileClass, TileId, TileRegistry};

use crate::grid::{GridTile, Owner, TileGrid, world_to_grid};
use crate::settings::SegmentSettings;

/// What the consumer sees of one variant of the pattern a shape is bound to.
#[derive(Clone, Debug, PartialEq)]
pub struct ShapeInstance {
    pub variant: usize,
    pub position: Vec3,
    /// Layer after resolving `Unidentified`.
    pub layer: Layer,
    pub depth: i32,
    pub enabled: bool,
    pub alpha: f32,
    pub tags: Vec<String>,
}

impl ShapeInstance {
    pub fn has_tag(&self, tag: &str) -> bool {
        tag == ALL_TAG || self.tags.iter().any(|t| t == tag)
    }
}

/// A connected group of tiles found in one frame.
///
/// Tile references are grid indices for background shapes and sprite indices for sprite
/// shapes. `id` only orders shapes within a run; identity across frames comes from tracking.
#[derive(Clone, Debug)]
pub struct Shape {
    key: usize,
    id: u64,
    background: bool,
    pub hidden: bool,
    palette: u8,
    tiles: Vec<usize>,
    distinct: Vec<TileId>,
    t_start: IVec2,
    t_end: IVec2,
    t_size: IVec2,
    p_start: IVec2,
    p_end: IVec2,
    pixel_count: u32,
    colors: ColorSet,
    self_connected: bool,
    all_full_rect: bool,
    pattern: Option<PatternId>,
    instances: Vec<ShapeInstance>,
}

impl Shape {
    pub(crate) fn new(key: usize, id: u64, background: bool) -> Self {
        Self {
            key,
            id,
            background,
            hidden: false,
            palette: 0,
            tiles: Vec::new(),
            distinct: Vec::new(),
            t_start: IVec2::ZERO,
            t_end: IVec2::ZERO,
            t_size: IVec2::ZERO,
            p_start: IVec2::ZERO,
            p_end: IVec2::ZERO,
            pixel_count: 0,
            colors: ColorSet::default(),
            self_connected: true,
            all_full_rect: true,
            pattern: None,
            instances: Vec::new(),
        }
    }

    #[inline]
    pub fn id(&self) -> u64 {
        self.id
    }

    #[inline]
    pub(crate) fn key(&self) -> usize {
        self.key
    }

    #[inline]
    pub fn is_background(&self) -> bool {
        self.background
    }

    /// Palette group; sprite groups follow the four background ones.
    #[inline]
    pub fn palette(&self) -> u8 {
        self.palette
    }

    #[inline]
    pub fn tiles(&self) -> &[usize] {
        &self.tiles
    }

    #[inline]
    pub fn tile_count(&self) -> usize {
        self.tiles.len()
    }

    /// Distinct canonical tiles in the order they joined.
    #[inline]
    pub fn distinct(&self) -> &[TileId] {
        &self.distinct
    }

    /// Sorted distinct tiles, the pattern cache key.
    pub fn pattern_key(&self) -> Vec<TileId> {
        let mut key = self.distinct.clone();
        key.sort_unstable();
        key
    }

    #[inline]
    pub fn t_start(&self) -> IVec2 {
        self.t_start
    }

    #[inline]
    pub fn t_end(&self) -> IVec2 {
        self.t_end
    }

    #[inline]
    pub fn t_size(&self) -> IVec2 {
        self.t_size
    }

    /// Inclusive pixel bounds of the nonzero pixels.
    #[inline]
    pub fn p_start(&self) -> IVec2 {
        self.p_start
    }

    #[inline]
    pub fn p_end(&self) -> IVec2 {
        self.p_end
    }

    #[inline]
    pub fn pixel_count(&self) -> u32 {
        self.pixel_count
    }

    #[inline]
    pub fn colors(&self) -> ColorSet {
        self.colors
    }

    #[inline]
    pub fn self_connected(&self) -> bool {
        self.self_connected
    }

    #[inline]
    pub(crate) fn set_self_connected(&mut self, value: bool) {
        self.self_connected = value;
    }

    /// Every tile is a full rectangle.
    #[inline]
    pub fn all_full_rect(&self) -> bool {
        self.all_full_rect
    }

    #[inline]
    pub fn pattern(&self) -> Option<PatternId> {
        self.pattern
    }

    #[inline]
    pub(crate) fn bind(&mut self, pattern: PatternId) {
        self.pattern = Some(pattern);
    }

    pub fn instances(&self) -> &[ShapeInstance] {
        &self.instances
    }

    pub(crate) fn set_instances(&mut self, instances: Vec<ShapeInstance>) {
        self.instances = instances;
    }

    #[inline]
    pub(crate) fn owns(&self, tile: &GridTile) -> bool {
        tile.owner == Owner::Shape(self.key)
    }

    pub(crate) fn push_tile(&mut self, r: usize, tile: &GridTile, canon: &CanonicalTile) {
        if !self.background {
            self.hidden |= tile.hidden;
        }
        let p_start = tile.pos + canon.start;
        let p_end = tile.pos + canon.end;
        if self.tiles.is_empty() {
            self.palette = tile.palette + if self.background { 0 } else { 4 };
            self.t_start = tile.cell;
            self.t_end = tile.cell;
            self.p_start = p_start;
            self.p_end = p_end;
        } else {
            self.t_start = self.t_start.min(tile.cell);
            self.t_end = self.t_end.max(tile.cell);
            self.p_start = self.p_start.min(p_start);
            self.p_end = self.p_end.max(p_end);
        }
        self.t_size = self.t_end - self.t_start + IVec2::ONE;
        self.tiles.push(r);
        self.pixel_count += canon.pixel_count;

        if let Some(id) = tile.tile {
            if !self.distinct.contains(&id) {
                self.distinct.push(id);
            }
        }
        self.colors = self.colors.union(canon.colors);
        self.self_connected &= canon.self_connected;
        if canon.class != TileClass::FullRect {
            self.all_full_rect = false;
        }
    }

    /// Tile size the shape would have after taking a tile at grid `cell`.
    pub fn size_with(&self, cell: IVec2) -> IVec2 {
        if self.tiles.is_empty() {
            return IVec2::ONE;
        }
        self.t_end.max(cell) - self.t_start.min(cell) + IVec2::ONE
    }

    #[inline]
    pub fn is_big(&self, settings: &SegmentSettings) -> bool {
        self.t_size.x >= settings.big_width || self.t_size.y >= settings.big_height
    }

    #[inline]
    pub fn is_rect_solid(&self) -> bool {
        self.tiles.len() as i32 == self.t_size.area()
    }

    /// Pixel bounds clear the masked screen edges on all four sides.
    pub fn inside(&self, mask: IVec2, screen_px: IVec2) -> bool {
        self.p_start.x > mask.x
            && self.p_end.x + mask.x < screen_px.x - 1
            && self.p_start.y > mask.y
            && self.p_end.y + mask.y < screen_px.y - 1
    }

    /// Complete on screen: the same tiles will not grow into a bigger shape.
    pub fn is_finished(&self, mask: IVec2, screen_px: IVec2, settings: &SegmentSettings) -> bool {
        self.inside(mask, screen_px) || self.is_big(settings)
    }

    #[inline]
    fn owns_cell(&self, grid: &TileGrid, cell: IVec2) -> bool {
        grid.cell_at(self.background, cell)
            .is_some_and(|t| self.owns(t))
    }

    /// `cell` lies strictly inside the bounds and has shape tiles on its left, right, top
    /// and bottom.
    pub fn encloses(&self, grid: &TileGrid, cell: IVec2) -> bool {
        if !(self.t_start.x < cell.x
            && self.t_start.y < cell.y
            && self.t_end.x > cell.x
            && self.t_end.y > cell.y)
        {
            return false;
        }
        (self.t_start.x..cell.x).any(|x| self.owns_cell(grid, IVec2::new(x, cell.y)))
            && (cell.x + 1..=self.t_end.x).any(|x| self.owns_cell(grid, IVec2::new(x, cell.y)))
            && (self.t_start.y..cell.y).any(|y| self.owns_cell(grid, IVec2::new(cell.x, y)))
            && (cell.y + 1..=self.t_end.y).any(|y| self.owns_cell(grid, IVec2::new(cell.x, y)))
    }

    /// No foreign cell is enclosed by the shape.
    pub fn is_solid(&self, grid: &TileGrid) -> bool {
        for x in self.t_start.x + 1..self.t_end.x {
            for y in self.t_start.y + 1..self.t_end.y {
                let cell = IVec2::new(x, y);
                if !self.owns_cell(grid, cell) && self.encloses(grid, cell) {
                    return false;
                }
            }
        }
        true
    }

    /// Colour index of the shape at screen pixel `p`, 0 where the shape has no pixel.
    pub fn color_at(&self, grid: &TileGrid, registry: &TileRegistry, p: IVec2) -> u8 {
        let Some(first) = self.tiles.first() else {
            return 0;
        };
        let origin = grid.tile(self.background, *first).pos;
        let fine = IVec2::new((p.x - origin.x) & 7, (p.y - origin.y) & 7);
        let cell = world_to_grid(p.x - fine.x, p.y - fine.y);
        match grid.cell_at(self.background, cell) {
            Some(t) if self.owns(t) => t
                .tile
                .map_or(0, |id| registry.get(id).color(fine.x, fine.y)),
            _ => 0,
        }
    }

    #[inline]
    pub fn active_at(&self, grid: &TileGrid, registry: &TileRegistry, p: IVec2) -> bool {
        self.color_at(grid, registry, p) > 0
    }

    /// `other` stands on top of this shape: along other's bottom edge, nothing of ours is
    /// just above it and more than half of the columns have our pixels just below.
    pub fn is_contact_with(&self, other: &Shape, grid: &TileGrid, registry: &TileRegistry) -> bool {
        let low = other.p_end.y - 3;
        let high = other.p_end.y + 2;
        let mut count = 0;
        for x in other.p_start.x..=other.p_end.x {
            if self.active_at(grid, registry, IVec2::new(x, low)) {
                return false;
            }
            if self.active_at(grid, registry, IVec2::new(x, high)) {
                count += 1;
            }
        }
        count * 2 > other.p_end.x - other.p_start.x
    }

    /// Overlap test between two shapes; the one with more tiles samples the other.
    pub fn overlaps(a: &Shape, b: &Shape, grid: &TileGrid, registry: &TileRegistry) -> bool {
        if a.tiles.len() >= b.tiles.len() {
            a.overlaps_with(b, grid, registry)
        } else {
            b.overlaps_with(a, grid, registry)
        }
    }

    fn overlaps_with(&self, other: &Shape, grid: &TileGrid, registry: &TileRegistry) -> bool {
        let start = other.p_start + IVec2::new(3, 3);
        let end = other.p_end - IVec2::new(3, 3);
        let rect_hit = start.x < self.p_end.x
            && end.x > self.p_start.x
            && start.y < self.p_end.y
            && end.y > self.p_start.y;
        if !rect_hit {
            return false;
        }
        let mid = IVec2::new((start.x + end.x) >> 1, (start.y + end.y) >> 1);
        [
            IVec2::new(mid.x, end.y),
            IVec2::new(mid.x, start.y),
            IVec2::new(start.x, mid.y),
            IVec2::new(end.x, mid.y),
            start,
            IVec2::new(start.x, end.y),
            IVec2::new(end.x, start.y),
            end,
            mid,
        ]
        .into_iter()
        .any(|p| self.active_at(grid, registry, p))
    }

    /// Squared distance between the first instances of two shapes.
    pub fn distance(&self, other: &Shape) -> Option<f32> {
        let a = self.instances.first()?;
        let b = other.instances.first()?;
        Some((a.position - b.position).length_squared())
    }
}
