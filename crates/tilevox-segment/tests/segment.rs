use std::collections::BTreeMap;
use std::sync::Mutex;

use proptest::prelude::*;

use tilevox_atlas::{AtlasAllocator, AtlasPages, AtlasSettings, PaletteIndex, atlas_channel};
use tilevox_geom::IVec2;
use tilevox_model::{ALL_TAG, BuildContext, Layer, LayerSettings, MeshPools, ModelSettings, ModelUpload, UploadSink};
use tilevox_pattern::PatternStore;
use tilevox_segment::{
    Frame, SegmentSettings, SegmentStats, TileRecord, TrackSettings, VideoSettings, segment,
};
use tilevox_tiles::RawTile;

#[derive(Default)]
struct Collect(Mutex<Vec<ModelUpload>>);

impl UploadSink for Collect {
    fn submit(&self, upload: ModelUpload) {
        self.0.lock().unwrap().push(upload);
    }
}

struct Rig {
    atlas: AtlasAllocator,
    _pages: AtlasPages,
    store: PatternStore,
    pools: MeshPools,
    model: ModelSettings,
    sink: Collect,
    frame: Frame,
}

impl Rig {
    fn new(video: &VideoSettings) -> Self {
        let (atlas, pages) = atlas_channel(&AtlasSettings::default());
        Self {
            atlas,
            _pages: pages,
            store: PatternStore::new(),
            pools: MeshPools::new(4),
            model: ModelSettings::default(),
            sink: Collect::default(),
            frame: Frame::new(video),
        }
    }

    fn run(&mut self, records: &[TileRecord], counter: u64) -> SegmentStats {
        self.frame.reset();
        self.frame.ingest(
            records,
            &PaletteIndex::default(),
            IVec2::ZERO,
            counter,
            self.store.tiles_mut(),
        );
        let mut ctx = BuildContext {
            atlas: &mut self.atlas,
            pools: &self.pools,
            settings: &self.model,
            sink: &self.sink,
        };
        segment(&mut self.frame, &mut self.store, &mut ctx, &SegmentSettings::default()).unwrap()
    }
}

const SOLID_1: RawTile = RawTile::new(u64::MAX, 0, false, false);
const SOLID_2: RawTile = RawTile::new(0, u64::MAX, false, false);

fn bg(x: i32, y: i32, raw: RawTile) -> TileRecord {
    TileRecord {
        x,
        y,
        raw,
        palette: 0,
        background: true,
        hidden: false,
    }
}

fn sprite(x: i32, y: i32, raw: RawTile, palette: u8) -> TileRecord {
    TileRecord {
        x,
        y,
        raw,
        palette,
        background: false,
        hidden: false,
    }
}

/// Tile with a single lit pixel in the middle; reaches no edge.
fn dot() -> RawTile {
    let mut px = [0u8; 64];
    px[3 * 8 + 3] = 1;
    RawTile::from_pixels(&px, false, false)
}

/// Tile lit along its top row and left column.
fn corner() -> RawTile {
    let mut px = [0u8; 64];
    for i in 0..8 {
        px[i] = 3;
        px[i * 8] = 3;
    }
    RawTile::from_pixels(&px, false, false)
}

#[test]
fn small_known_shape_rolls_back_then_binds_existing_pattern() {
    let video = VideoSettings::default();
    let mut rig = Rig::new(&video);
    let scene = [bg(64, 64, SOLID_1), bg(72, 64, SOLID_1)];

    let first = rig.run(&scene, 1);
    assert_eq!(first.created_permanent, 1);
    assert_eq!(rig.frame.shape_count(), 1);

    let second = rig.run(&scene, 2);
    assert_eq!(second.rollbacks, 1);
    assert_eq!(second.created_permanent + second.created_temp, 0);
    assert_eq!(rig.frame.shape_count(), 1);
    let shape = rig.frame.shape(0).unwrap();
    assert_eq!(shape.tile_count(), 2);
    assert_eq!(rig.store.permanent_count(), 1);
}

#[test]
fn big_known_shape_is_kept_without_rollback() {
    let video = VideoSettings::default();
    let mut rig = Rig::new(&video);
    let row: Vec<TileRecord> = (0..30).map(|i| bg(8 + i * 8, 64, SOLID_1)).collect();

    let first = rig.run(&row, 1);
    assert_eq!(first.created_permanent, 1);

    let second = rig.run(&row, 2);
    assert_eq!(second.rollbacks, 0);
    assert_eq!(second.bound_existing, 1);
    assert_eq!(rig.frame.shape_count(), 1);
    assert_eq!(rig.frame.shape(0).unwrap().tile_count(), 30);
}

#[test]
fn big_ragged_shape_splits_at_complete_row() {
    let video = VideoSettings::default();
    let mut rig = Rig::new(&video);
    let mut scene: Vec<TileRecord> = (0..30).map(|i| bg(8 + i * 8, 64, SOLID_1)).collect();
    scene.push(bg(40, 72, SOLID_2));

    let stats = rig.run(&scene, 1);
    assert_eq!(stats.splits, 1);
    assert_eq!(rig.frame.bg_shape_count(), 2);
    let mut sizes: Vec<usize> = rig.frame.bg_shapes().map(|s| s.tile_count()).collect();
    sizes.sort_unstable();
    assert_eq!(sizes, vec![1, 30]);
}

#[test]
fn isolated_glyphs_stay_single_tile_shapes() {
    let video = VideoSettings::default();
    let mut rig = Rig::new(&video);
    let scene = [bg(64, 64, dot()), bg(72, 64, dot()), bg(80, 64, dot())];

    rig.run(&scene, 1);
    assert_eq!(rig.frame.bg_shape_count(), 3);
    assert!(rig.frame.bg_shapes().all(|s| s.tile_count() == 1));
}

#[test]
fn adjacent_sprites_group_by_palette() {
    let video = VideoSettings::default();
    let mut rig = Rig::new(&video);
    let scene = [
        sprite(100, 50, SOLID_1, 0),
        sprite(108, 50, SOLID_1, 0),
        sprite(116, 50, SOLID_1, 1),
    ];

    let stats = rig.run(&scene, 1);
    assert_eq!(stats.bg_shapes, 0);
    assert_eq!(stats.sprite_shapes, 2);
    let mut groups: Vec<(u8, usize)> = rig
        .frame
        .sprite_shapes()
        .map(|s| (s.palette(), s.tile_count()))
        .collect();
    groups.sort_unstable();
    assert_eq!(groups, vec![(4, 2), (5, 1)]);
}

#[test]
fn sprites_beyond_cap_are_dropped() {
    let video = VideoSettings {
        sprite_count: 2,
        ..VideoSettings::default()
    };
    let mut rig = Rig::new(&video);
    let scene: Vec<TileRecord> = (0..6).map(|i| sprite(20 + i * 32, 40, SOLID_1, 0)).collect();

    rig.run(&scene, 1);
    assert_eq!(rig.frame.stats().sprite_tile_count, 4);
    assert_eq!(rig.frame.sprite_shapes().count(), 4);
}

#[test]
fn sort_by_location_orders_rows_first() {
    let video = VideoSettings::default();
    let mut rig = Rig::new(&video);
    let scene = [bg(64, 120, SOLID_1), bg(160, 40, SOLID_2)];

    rig.run(&scene, 1);
    rig.frame.sort_by_location();
    let first = rig.frame.shape(0).unwrap();
    let second = rig.frame.shape(1).unwrap();
    assert!(first.t_start().y < second.t_start().y);
}

#[test]
fn tracking_finds_same_kind_shape_in_next_frame() {
    let video = VideoSettings::default();
    let mut rig = Rig::new(&video);
    let scene = [bg(64, 64, SOLID_1), sprite(64, 64, SOLID_1, 0), sprite(200, 160, SOLID_2, 0)];
    let layers = LayerSettings {
        default_bg: Layer::L1,
        ..LayerSettings::default()
    };
    let track = TrackSettings::default();

    rig.run(&scene, 1);
    rig.frame.refresh_instances(&rig.store, &layers);
    let sprite_before = rig
        .frame
        .sprite_shapes()
        .find(|s| s.p_start() == IVec2::new(64, 64))
        .cloned()
        .unwrap();
    let bg_before = rig.frame.bg_shapes().next().cloned().unwrap();

    rig.run(&scene, 2);
    rig.frame.refresh_instances(&rig.store, &layers);

    let found = rig.frame.track(&sprite_before, &track).unwrap();
    assert!(!found.is_background());
    assert_eq!(found.p_start(), IVec2::new(64, 64));
    assert_eq!(sprite_before.distance(found), Some(0.0));

    let found = rig.frame.track(&bg_before, &track).unwrap();
    assert!(found.is_background());
    assert_eq!(found.p_start(), IVec2::new(64, 64));
}

#[test]
fn tracking_ignores_shapes_beyond_threshold() {
    let video = VideoSettings::default();
    let mut rig = Rig::new(&video);
    let layers = LayerSettings::default();
    let track = TrackSettings::default();

    rig.run(&[sprite(64, 64, SOLID_1, 0)], 1);
    rig.frame.refresh_instances(&rig.store, &layers);
    let before = rig.frame.sprite_shapes().next().cloned().unwrap();

    rig.run(&[bg(64, 64, SOLID_1), sprite(200, 160, SOLID_1, 0)], 2);
    rig.frame.refresh_instances(&rig.store, &layers);
    assert!(rig.frame.track(&before, &track).is_none());
}

#[test]
fn every_instance_carries_the_all_tag() {
    let video = VideoSettings::default();
    let mut rig = Rig::new(&video);
    let scene = [bg(64, 64, SOLID_1), bg(128, 64, corner()), sprite(30, 30, SOLID_2, 2)];

    rig.run(&scene, 1);
    rig.frame.refresh_instances(&rig.store, &LayerSettings::default());
    let stats = rig.frame.stats();
    assert_eq!(stats.instance_count, rig.frame.shapes_with_tag(ALL_TAG).count());
    assert_eq!(rig.frame.shapes_with_tag("no-such-tag").count(), 0);
}

fn tile_kind(kind: u8) -> RawTile {
    match kind {
        0 => SOLID_1,
        1 => SOLID_2,
        2 => corner(),
        _ => dot(),
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    // every ingested tile ends up in exactly one bound shape
    #[test]
    fn segmentation_covers_every_tile(
        cells in prop::collection::vec((0i32..32, 0i32..30, 0u8..4, 0u8..2), 0..40),
        sprites in prop::collection::vec((0i32..31, 0i32..29, 0u8..4, 0u8..2), 0..8),
        frames in 1u64..3,
    ) {
        let video = VideoSettings::default();
        let mut rig = Rig::new(&video);
        let bg_cells: BTreeMap<(i32, i32), (u8, u8)> =
            cells.into_iter().map(|(x, y, k, p)| ((x, y), (k, p))).collect();
        let sprite_cells: BTreeMap<(i32, i32), (u8, u8)> =
            sprites.into_iter().map(|(x, y, k, p)| ((x, y), (k, p))).collect();
        let mut records: Vec<TileRecord> = bg_cells
            .iter()
            .map(|(&(x, y), &(k, p))| TileRecord { palette: p, ..bg(x * 8, y * 8, tile_kind(k)) })
            .collect();
        records.extend(
            sprite_cells
                .iter()
                .map(|(&(x, y), &(k, p))| sprite(x * 8, y * 8, tile_kind(k), p)),
        );

        for counter in 1..=frames {
            rig.run(&records, counter);
            let stats = rig.frame.stats();
            let owned: usize = rig.frame.shapes().map(|s| s.tile_count()).sum();
            prop_assert_eq!(owned, stats.bg_tile_count + stats.sprite_tile_count);
            prop_assert_eq!(stats.bg_tile_count, bg_cells.len());
            prop_assert!(rig.frame.shapes().all(|s| s.pattern().is_some()));
            prop_assert!(rig.frame.bg_shapes().all(|s| s.is_background()));
            prop_assert!(rig.frame.sprite_shapes().all(|s| !s.is_background()));
        }
    }
}
