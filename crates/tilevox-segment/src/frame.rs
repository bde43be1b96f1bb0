use std::sync::atomic::{AtomicU64, Ordering};

use slab::Slab;
use tilevox_atlas::PaletteIndex;
use tilevox_geom::IVec2;
use tilevox_model::LayerSettings;
use tilevox_pattern::PatternStore;
use tilevox_tiles::{PatternId, TileRegistry};

use crate::grid::{Owner, TileGrid, TileRecord};
use crate::settings::{TrackSettings, VideoSettings};
use crate::shape::{Shape, ShapeInstance};

static NEXT_SHAPE_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct FrameStats {
    pub frame_counter: u64,
    /// Seconds since the source started, `frame_counter / fps`.
    pub time: f32,
    pub bg_tile_count: usize,
    pub bg_pixel_count: u64,
    pub sprite_tile_count: usize,
    pub shape_count: usize,
    pub bg_shape_count: usize,
    pub instance_count: usize,
    pub tile3d_count: usize,
}

/// One frame of tiles and the shapes segmented from it.
///
/// Shape order is background shapes first, then sprite shapes.
pub struct Frame {
    video: VideoSettings,
    grid: TileGrid,
    shapes: Slab<Shape>,
    order: Vec<usize>,
    bg_shape_count: usize,
    palette: PaletteIndex,
    mask: IVec2,
    stats: FrameStats,
}

impl Frame {
    pub fn new(video: &VideoSettings) -> Self {
        let mut grid = TileGrid::new(video);
        grid.reset();
        Self {
            video: video.clone(),
            grid,
            shapes: Slab::new(),
            order: Vec::new(),
            bg_shape_count: 0,
            palette: PaletteIndex::default(),
            mask: IVec2::ZERO,
            stats: FrameStats::default(),
        }
    }

    /// Drops every shape and disables every tile.
    pub fn reset(&mut self) {
        self.shapes.clear();
        self.order.clear();
        self.bg_shape_count = 0;
        self.mask = IVec2::ZERO;
        self.stats = FrameStats::default();
        self.grid.reset();
    }

    /// Loads the tiles of one video frame into a freshly reset frame.
    ///
    /// Empty tiles and sprites below the screen are skipped; every other tile is interned.
    pub fn ingest(
        &mut self,
        records: &[TileRecord],
        palette: &PaletteIndex,
        mask: IVec2,
        frame_counter: u64,
        registry: &mut TileRegistry,
    ) {
        self.palette = *palette;
        self.mask = mask;
        self.stats.frame_counter = frame_counter;
        self.stats.time = frame_counter as f32 / self.video.fps.max(1) as f32;

        let sprite_cap = self.video.sprite_count * 2;
        let height_px = self.video.height_px();
        for rec in records {
            if rec.raw.is_empty() {
                continue;
            }
            if rec.background {
                let id = registry.intern(rec.raw);
                if self.grid.place_background(rec, id).is_some() {
                    self.stats.bg_tile_count += 1;
                    self.stats.bg_pixel_count += registry.get(id).pixel_count as u64;
                }
            } else if rec.y < height_px {
                if self.grid.sprites().len() >= sprite_cap {
                    log::debug!(target: "frames", "sprite limit {sprite_cap} reached, dropping tile");
                    continue;
                }
                let id = registry.intern(rec.raw);
                if self.grid.place_sprite(rec, id).is_some() {
                    self.stats.sprite_tile_count += 1;
                }
            }
        }
        log::trace!(
            target: "frames",
            "frame {frame_counter}: {} bg tiles, {} sprite tiles",
            self.stats.bg_tile_count,
            self.stats.sprite_tile_count
        );
    }

    #[inline]
    pub fn grid(&self) -> &TileGrid {
        &self.grid
    }

    #[inline]
    pub fn video(&self) -> &VideoSettings {
        &self.video
    }

    #[inline]
    pub fn screen_px(&self) -> IVec2 {
        IVec2::new(self.video.width_px(), self.video.height_px())
    }

    #[inline]
    pub fn mask(&self) -> IVec2 {
        self.mask
    }

    pub fn palette(&self) -> &PaletteIndex {
        &self.palette
    }

    #[inline]
    pub fn frame_counter(&self) -> u64 {
        self.stats.frame_counter
    }

    #[inline]
    pub fn time(&self) -> f32 {
        self.stats.time
    }

    pub fn stats(&self) -> FrameStats {
        FrameStats {
            shape_count: self.order.len(),
            bg_shape_count: self.bg_shape_count,
            ..self.stats
        }
    }

    /// Committed shapes, background first.
    pub fn shapes(&self) -> impl Iterator<Item = &Shape> + '_ {
        self.order.iter().map(|k| &self.shapes[*k])
    }

    pub fn bg_shapes(&self) -> impl Iterator<Item = &Shape> + '_ {
        self.order[..self.bg_shape_count].iter().map(|k| &self.shapes[*k])
    }

    pub fn sprite_shapes(&self) -> impl Iterator<Item = &Shape> + '_ {
        self.order[self.bg_shape_count..].iter().map(|k| &self.shapes[*k])
    }

    /// Shape at position `i` of the frame order.
    pub fn shape(&self, i: usize) -> Option<&Shape> {
        self.order.get(i).map(|k| &self.shapes[*k])
    }

    #[inline]
    pub fn shape_count(&self) -> usize {
        self.order.len()
    }

    #[inline]
    pub fn bg_shape_count(&self) -> usize {
        self.bg_shape_count
    }

    pub(crate) fn new_shape(&mut self, background: bool) -> usize {
        let entry = self.shapes.vacant_entry();
        let key = entry.key();
        let id = NEXT_SHAPE_ID.fetch_add(1, Ordering::Relaxed);
        entry.insert(Shape::new(key, id, background));
        key
    }

    #[inline]
    pub(crate) fn pending(&self, key: usize) -> &Shape {
        &self.shapes[key]
    }

    pub(crate) fn add_tile(&mut self, key: usize, r: usize, registry: &TileRegistry) {
        let shape = &mut self.shapes[key];
        let background = shape.is_background();
        let tile = self.grid.tile(background, r);
        let Some(id) = tile.tile else {
            return;
        };
        shape.push_tile(r, tile, registry.get(id));
        self.grid.tile_mut(background, r).owner = Owner::Shape(key);
        if !background {
            self.grid.set_sprite_cell(r);
        }
    }

    /// Frees the shape's tiles and drops the shape.
    pub(crate) fn release_shape(&mut self, key: usize) {
        let shape = self.shapes.remove(key);
        for r in shape.tiles() {
            let tile = self.grid.tile_mut(shape.is_background(), *r);
            if tile.owner == Owner::Shape(key) {
                tile.owner = Owner::Free;
            }
        }
    }

    pub(crate) fn commit(&mut self, key: usize) {
        self.order.push(key);
    }

    pub(crate) fn bind(&mut self, key: usize, pattern: PatternId) {
        self.shapes[key].bind(pattern);
    }

    pub(crate) fn set_self_connected(&mut self, key: usize, value: bool) {
        self.shapes[key].set_self_connected(value);
    }

    pub(crate) fn mark_background_done(&mut self) {
        self.bg_shape_count = self.order.len();
    }

    /// Sorts background and sprite shapes separately by tile start, then tile end.
    pub fn sort_by_location(&mut self) {
        let shapes = &self.shapes;
        let location = |k: &usize| {
            let s = &shapes[*k];
            (s.t_start().y, s.t_start().x, s.t_end().y, s.t_end().x)
        };
        let (bg, sprites) = self.order.split_at_mut(self.bg_shape_count);
        bg.sort_by_key(location);
        sprites.sort_by_key(location);
    }

    /// Sorts sprite shapes by tile count, largest first.
    pub fn sort_sprites_by_area(&mut self) {
        let shapes = &self.shapes;
        self.order[self.bg_shape_count..]
            .sort_by_key(|k| std::cmp::Reverse(shapes[*k].tile_count()));
    }

    /// Recomputes every shape's instance snapshots from its pattern's variants.
    pub fn refresh_instances(&mut self, store: &PatternStore, layers: &LayerSettings) {
        let screen_height = self.video.height_px();
        let mut instance_count = 0;
        let mut tile3d_count = 0;
        for key in &self.order {
            let shape = &mut self.shapes[*key];
            let Some(pattern) = shape.pattern().and_then(|id| store.get(id)) else {
                shape.set_instances(Vec::new());
                continue;
            };
            let background = shape.is_background();
            let instances: Vec<ShapeInstance> = pattern
                .variants()
                .iter()
                .enumerate()
                .map(|(i, v)| ShapeInstance {
                    variant: i,
                    position: v.position(shape.p_start(), shape.p_end(), screen_height, background, layers),
                    layer: layers.resolve(v.layer, background),
                    depth: v.depth,
                    enabled: v.enabled,
                    alpha: v.alpha,
                    tags: v.tags().to_vec(),
                })
                .collect();
            instance_count += instances.len();
            tile3d_count += instances.len() * shape.tile_count();
            shape.set_instances(instances);
        }
        self.stats.instance_count = instance_count;
        self.stats.tile3d_count = tile3d_count;
    }

    /// Instances carrying `tag`, with their shapes.
    pub fn shapes_with_tag<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = (&'a Shape, &'a ShapeInstance)> + 'a {
        self.shapes()
            .flat_map(move |s| s.instances().iter().filter(move |i| i.has_tag(tag)).map(move |i| (s, i)))
    }

    /// Nearest shape of the same kind within that kind's tracking threshold, typically
    /// a shape from an earlier frame looked up in this one. Equal distances prefer the
    /// shape with the same id.
    pub fn track(&self, shape: &Shape, settings: &TrackSettings) -> Option<&Shape> {
        let (candidates, mut best) = if shape.is_background() {
            (&self.order[..self.bg_shape_count], settings.bg_threshold)
        } else {
            (&self.order[self.bg_shape_count..], settings.fg_threshold)
        };
        let mut found = None;
        for k in candidates {
            let other = &self.shapes[*k];
            let Some(d) = shape.distance(other) else {
                continue;
            };
            if d < best || (d == best && other.id() == shape.id()) {
                best = d;
                found = Some(other);
            }
        }
        found
    }
}
