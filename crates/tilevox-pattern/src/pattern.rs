use tilevox_atlas::{AtlasAllocator, AtlasError, ColorFormat, TextureData};
use tilevox_geom::{IVec2, Vec3};
use tilevox_model::{BuildContext, Geometry, Layer, Pattern3D};
use tilevox_tiles::{ColorSet, Density, TILE_SIZE, TileId, TileRegistry};

/// Size constraint of patterns that bind shapes of any size.
pub const UNCONSTRAINED: IVec2 = IVec2::new(99, 99);

/// Offset of a variant added with [`Pattern::add_variant`] relative to its source.
pub const VARIANT_OFFSET: Vec3 = Vec3::new(8.0, 8.0, 8.0);

/// Frame counters kept per pattern while it is on screen.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct Lifecycle {
    pub start_frame: u64,
    pub end_frame: u64,
    pub contact_count: u32,
    pub last_contact_frame: u64,
    pub overlap_count: u32,
    pub last_overlap_frame: u64,
}

impl Lifecycle {
    /// Marks the pattern as present in `frame`. A gap restarts the occurrence, as does the
    /// first touch (`end_frame` is 0 until then).
    pub fn touch(&mut self, frame: u64) {
        if self.end_frame == frame {
            return;
        }
        if self.end_frame == 0 || self.end_frame + 1 != frame {
            self.start_frame = frame;
        }
        self.end_frame = frame;
    }

    /// Consecutive frames of the current occurrence.
    #[inline]
    pub fn lifespan(&self) -> u64 {
        self.end_frame.saturating_sub(self.start_frame) + 1
    }

    /// Counts one more frame of contact; at most once per frame. Returns the run length.
    pub fn record_contact(&mut self, frame: u64) -> u32 {
        if self.last_contact_frame != frame {
            self.contact_count = if self.last_contact_frame + 1 == frame {
                self.contact_count + 1
            } else {
                1
            };
            self.last_contact_frame = frame;
        }
        self.contact_count
    }

    pub fn record_overlap(&mut self, frame: u64) -> u32 {
        if self.last_overlap_frame != frame {
            self.overlap_count = if self.last_overlap_frame + 1 == frame {
                self.overlap_count + 1
            } else {
                1
            };
            self.last_overlap_frame = frame;
        }
        self.overlap_count
    }
}

/// Everything needed to create a pattern, as measured on the shape that produced it.
#[derive(Clone, Debug)]
pub struct PatternDraft {
    /// Distinct canonical tiles, any order.
    pub tiles: Vec<TileId>,
    pub permanent: bool,
    pub constraint: IVec2,
    /// Tile window the model covers.
    pub window: IVec2,
    /// Row-major `window` grid of tiles, `None` for holes.
    pub grid: Vec<Option<TileId>>,
    pub pixel_count: u32,
    pub colors: ColorSet,
    pub tile_density: Density,
    pub pixel_density: Density,
    pub self_connected: bool,
    pub geometry: Geometry,
    pub depth: i32,
}

/// A cached 3D description shared by every shape with the same set of canonical tiles.
pub struct Pattern {
    key: Vec<TileId>,
    permanent: bool,
    pub constraint: IVec2,
    window: IVec2,
    grid: Vec<Option<TileId>>,
    default_texture: TextureData,
    pub pixel_count: u32,
    pub colors: ColorSet,
    pub tile_density: Density,
    pub pixel_density: Density,
    pub self_connected: bool,
    pub lifecycle: Lifecycle,
    variants: Vec<Pattern3D>,
}

impl Pattern {
    /// Paints the default texture from the canonical tiles of the grid and sets up the
    /// primary variant. Nothing is built yet.
    pub fn from_draft(draft: PatternDraft, tiles: &TileRegistry) -> Self {
        let mut key = draft.tiles;
        key.sort_unstable();
        key.dedup();

        let size = draft.window * TILE_SIZE;
        let mut texture = TextureData::new(size.x, size.y, ColorFormat::Index);
        for (i, cell) in draft.grid.iter().enumerate() {
            let Some(id) = cell else { continue };
            let origin = IVec2::new(i as i32 % draft.window.x, i as i32 / draft.window.x) * TILE_SIZE;
            let tile = tiles.get(*id);
            for y in 0..TILE_SIZE {
                for x in 0..TILE_SIZE {
                    texture.set_pixel(origin.x + x, origin.y + y, tile.color(x, y) as u32);
                }
            }
        }

        let mut primary = Pattern3D::new(draft.window, &draft.grid, texture.duplicate());
        primary.geometry = draft.geometry;
        primary.depth = draft.depth;

        Self {
            key,
            permanent: draft.permanent,
            constraint: draft.constraint,
            window: draft.window,
            grid: draft.grid,
            default_texture: texture,
            pixel_count: draft.pixel_count,
            colors: draft.colors,
            tile_density: draft.tile_density,
            pixel_density: draft.pixel_density,
            self_connected: draft.self_connected,
            lifecycle: Lifecycle::default(),
            variants: vec![primary],
        }
    }

    /// Sorted distinct tiles; the cache key.
    #[inline]
    pub fn key(&self) -> &[TileId] {
        &self.key
    }

    #[inline]
    pub fn is_permanent(&self) -> bool {
        self.permanent
    }

    #[inline]
    pub fn window(&self) -> IVec2 {
        self.window
    }

    pub fn grid(&self) -> &[Option<TileId>] {
        &self.grid
    }

    pub fn default_texture(&self) -> &TextureData {
        &self.default_texture
    }

    /// Every tile of `other` (sorted) is part of this pattern.
    pub fn covers(&self, other: &[TileId]) -> bool {
        let mut mine = self.key.iter();
        other.iter().all(|t| mine.any(|m| m == t))
    }

    /// The shape size fits the constraint window.
    #[inline]
    pub fn accepts_size(&self, size: IVec2) -> bool {
        size.fits_within(self.constraint)
    }

    pub fn variants(&self) -> &[Pattern3D] {
        &self.variants
    }

    pub fn variant(&self, i: usize) -> Option<&Pattern3D> {
        self.variants.get(i)
    }

    pub fn variant_mut(&mut self, i: usize) -> Option<&mut Pattern3D> {
        self.variants.get_mut(i)
    }

    pub fn variant_count(&self) -> usize {
        self.variants.len()
    }

    #[inline]
    pub fn primary(&self) -> &Pattern3D {
        &self.variants[0]
    }

    #[inline]
    pub fn primary_mut(&mut self) -> &mut Pattern3D {
        &mut self.variants[0]
    }

    #[inline]
    pub fn layer(&self) -> Layer {
        self.primary().layer
    }

    pub fn set_layer(&mut self, layer: Layer) {
        self.primary_mut().layer = layer;
    }

    pub fn build(&mut self, ctx: &mut BuildContext<'_>) -> Result<(), AtlasError> {
        for variant in &mut self.variants {
            variant.build(ctx)?;
        }
        Ok(())
    }

    pub fn release(&mut self, atlas: &mut AtlasAllocator) {
        for variant in &mut self.variants {
            variant.release(atlas);
        }
    }

    /// Clones variant `from` with [`VARIANT_OFFSET`] and builds the copy. Returns its index.
    pub fn add_variant(&mut self, from: usize, ctx: &mut BuildContext<'_>) -> Result<usize, AtlasError> {
        let Some(source) = self.variants.get(from) else {
            return Ok(from);
        };
        let mut copy = source.duplicate();
        copy.offset += VARIANT_OFFSET;
        copy.build(ctx)?;
        self.variants.push(copy);
        Ok(self.variants.len() - 1)
    }

    /// Drops variant `i` unless it is the only one left.
    pub(crate) fn remove_variant(&mut self, i: usize, atlas: &mut AtlasAllocator) -> bool {
        if self.variants.len() <= 1 || i >= self.variants.len() {
            return false;
        }
        let mut variant = self.variants.remove(i);
        variant.release(atlas);
        true
    }
}
