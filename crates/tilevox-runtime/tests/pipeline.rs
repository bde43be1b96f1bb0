use std::thread;
use std::time::Duration;

use proptest::prelude::*;

use tilevox_atlas::{AtlasSettings, PaletteIndex, atlas_channel};
use tilevox_geom::IVec2;
use tilevox_model::{Layer, LayerSettings, RenderMode};
use tilevox_pattern::PatternStore;
use tilevox_runtime::{
    FrameManager, FramePipeline, FrameScript, PipelineSettings, ScriptError, UploadDrain,
    main_thread_queue,
};
use tilevox_segment::{Frame, TileRecord, VideoSettings};
use tilevox_tiles::RawTile;

const SOLID_1: RawTile = RawTile::new(u64::MAX, 0, false, false);
const SOLID_2: RawTile = RawTile::new(0, u64::MAX, false, false);

fn tile(x: i32, y: i32, raw: RawTile, background: bool) -> TileRecord {
    TileRecord {
        x,
        y,
        raw,
        palette: 0,
        background,
        hidden: false,
    }
}

fn settings() -> PipelineSettings {
    PipelineSettings {
        reset_settle: Duration::ZERO,
        ..PipelineSettings::default()
    }
}

fn pipeline(settings: PipelineSettings) -> (FramePipeline, UploadDrain) {
    let (atlas, _pages) = atlas_channel(&AtlasSettings::default());
    let (queue, drain) = main_thread_queue();
    (FramePipeline::new(settings, atlas, queue), drain)
}

/// Platform of six tiles with a 2x2 sprite block standing on it.
fn platform_scene() -> Vec<TileRecord> {
    let mut out: Vec<TileRecord> = (0..6).map(|i| tile(64 + i * 8, 120, SOLID_1, true)).collect();
    for (x, y) in [(80, 104), (88, 104), (80, 112), (88, 112)] {
        out.push(tile(x, y, SOLID_2, false));
    }
    out
}

fn run(pipe: &mut FramePipeline, scene: &[TileRecord]) {
    pipe.process_frame(scene, &PaletteIndex::default(), IVec2::ZERO).unwrap();
}

#[test]
fn published_frame_reflects_last_processed_frame() {
    let (mut pipe, drain) = pipeline(settings());
    let scene = platform_scene();
    run(&mut pipe, &scene);
    run(&mut pipe, &scene);

    let frames = pipe.frames();
    let online = frames.take_online();
    assert_eq!(online.frame_counter(), 2);
    assert_eq!(online.bg_shape_count(), 1);
    assert_eq!(online.sprite_shapes().count(), 1);
    assert!(online.shapes().all(|s| !s.instances().is_empty()));
    drop(online);

    assert!(drain.drain(|_| {}) >= 2);
    assert_eq!(pipe.stats().frame.frame_counter, 2);
}

#[test]
fn sprite_standing_on_platform_moves_it_to_front_layer() {
    let settings = PipelineSettings {
        layers: LayerSettings {
            contact_frames: 2,
            ..LayerSettings::default()
        },
        ..settings()
    };
    let (mut pipe, _drain) = pipeline(settings);
    let scene = platform_scene();

    for _ in 0..2 {
        run(&mut pipe, &scene);
    }
    let platform = |pipe: &FramePipeline| {
        let frames = pipe.frames();
        let online = frames.take_online();
        let id = online.bg_shapes().next().and_then(|s| s.pattern()).unwrap();
        pipe.store().get(id).unwrap().layer()
    };
    assert_eq!(platform(&pipe), Layer::Unidentified);

    run(&mut pipe, &scene);
    assert_eq!(platform(&pipe), Layer::L1);
    assert_eq!(pipe.stats().layer_moves, 1);
}

/// Two-row platform with a 2x2 sprite block drawn over its middle.
fn crossing_scene() -> Vec<TileRecord> {
    let mut out = Vec::new();
    for y in [112, 120] {
        out.extend((0..6).map(|i| tile(64 + i * 8, y, SOLID_1, true)));
    }
    for (x, y) in [(80, 112), (88, 112), (80, 120), (88, 120)] {
        out.push(tile(x, y, SOLID_2, false));
    }
    out
}

fn crossing_layers(sprite_layer: Option<Layer>) -> (Layer, usize) {
    let settings = PipelineSettings {
        layers: LayerSettings {
            overlap_frames: 2,
            ..LayerSettings::default()
        },
        ..settings()
    };
    let (mut pipe, _drain) = pipeline(settings);
    let scene = crossing_scene();
    let published = |pipe: &FramePipeline| {
        let frames = pipe.frames();
        let online = frames.take_online();
        (
            online.bg_shapes().next().and_then(|s| s.pattern()).unwrap(),
            online.sprite_shapes().next().and_then(|s| s.pattern()).unwrap(),
        )
    };

    run(&mut pipe, &scene);
    let mut moves = 0;
    for _ in 0..4 {
        if let Some(layer) = sprite_layer {
            let (_, sprite) = published(&pipe);
            pipe.store_mut().get_mut(sprite).unwrap().set_layer(layer);
        }
        run(&mut pipe, &scene);
        moves += pipe.stats().layer_moves;
    }
    let (platform, _) = published(&pipe);
    (pipe.store().get(platform).unwrap().layer(), moves)
}

#[test]
fn sprite_crossing_platform_moves_it_behind() {
    assert_eq!(crossing_layers(None), (Layer::L2, 1));
    assert_eq!(crossing_layers(Some(Layer::L1)), (Layer::L2, 1));
}

#[test]
fn sprite_behind_background_never_pushes_platform_back() {
    assert_eq!(crossing_layers(Some(Layer::L2)), (Layer::Unidentified, 0));
}

struct Tagger;

impl FrameScript for Tagger {
    fn name(&self) -> &str {
        "tagger"
    }

    fn on_frame(&mut self, frame: &Frame, store: &mut PatternStore) -> Result<(), ScriptError> {
        for shape in frame.sprite_shapes() {
            if let Some(pattern) = shape.pattern().and_then(|id| store.get_mut(id)) {
                pattern.primary_mut().set_tags("hero, player");
            }
        }
        Ok(())
    }
}

struct FailsOnSecondFrame {
    calls: u32,
}

impl FrameScript for FailsOnSecondFrame {
    fn name(&self) -> &str {
        "flaky"
    }

    fn on_frame(&mut self, _frame: &Frame, _store: &mut PatternStore) -> Result<(), ScriptError> {
        self.calls += 1;
        if self.calls == 2 {
            return Err(ScriptError::Malformed("bad tag".into()));
        }
        Ok(())
    }
}

#[test]
fn failing_script_is_disabled_and_others_keep_running() {
    let (mut pipe, _drain) = pipeline(settings());
    pipe.add_script(Box::new(FailsOnSecondFrame { calls: 0 }));
    pipe.add_script(Box::new(Tagger));
    let scene = platform_scene();

    for _ in 0..3 {
        run(&mut pipe, &scene);
    }
    assert_eq!(pipe.active_scripts(), vec!["tagger"]);

    let tagged = pipe.shapes_by_tag("player");
    assert_eq!(tagged.len(), 1);
    assert!(!tagged[0].0.is_background());
    assert!(pipe.shapes_by_tag("enemy").is_empty());
}

#[test]
fn reset_drops_patterns_and_published_shapes() {
    let (mut pipe, _drain) = pipeline(settings());
    run(&mut pipe, &platform_scene());
    assert!(!pipe.store().is_empty());

    pipe.reset();
    assert!(pipe.store().is_empty());
    assert!(pipe.store().tiles().is_empty());
    assert_eq!(pipe.atlas().live_count(), 0);
    assert_eq!(pipe.frames().take_online().shape_count(), 0);
}

#[test]
fn render_mode_switch_rebuilds_models() {
    let (mut pipe, drain) = pipeline(settings());
    run(&mut pipe, &platform_scene());
    drain.drain(|_| {});
    let patterns = pipe.store().len();

    pipe.set_render_mode(RenderMode::Marching).unwrap();
    assert_eq!(pipe.settings().model.render_mode, RenderMode::Marching);
    assert_eq!(drain.drain(|_| {}), patterns);
}

#[test]
fn render_mode_switch_before_drain_finishes_only_rebuilt_models() {
    let (mut pipe, drain) = pipeline(settings());
    run(&mut pipe, &platform_scene());
    pipe.set_render_mode(RenderMode::Marching).unwrap();
    let patterns = pipe.store().len();

    let mut handed = 0;
    assert_eq!(drain.drain(|_| handed += 1), patterns);
    assert_eq!(handed, patterns);
    assert!(pipe.store().iter().all(|(_, p)| p.primary().is_ready()));
}

#[test]
fn tracking_follows_sprite_into_next_frame() {
    let (mut pipe, _drain) = pipeline(PipelineSettings {
        layers: LayerSettings {
            default_bg: Layer::L1,
            auto: false,
            ..LayerSettings::default()
        },
        ..settings()
    });
    let scene = [
        tile(64, 64, SOLID_1, true),
        tile(160, 160, SOLID_2, false),
        tile(168, 160, SOLID_2, false),
    ];
    run(&mut pipe, &scene);
    let sprite = {
        let frames = pipe.frames();
        let online = frames.take_online();
        online.sprite_shapes().next().cloned().unwrap()
    };

    run(&mut pipe, &scene);
    let found = pipe.track(&sprite).unwrap();
    assert!(!found.is_background());
    assert_eq!(found.tile_count(), 2);
    assert_eq!(found.p_start(), IVec2::new(160, 160));
    assert_eq!(sprite.distance(&found), Some(0.0));
}

#[test]
fn readers_never_see_a_frame_change_under_them() {
    let (mut pipe, _drain) = pipeline(settings());
    let frames = pipe.frames();
    let scenes = [platform_scene(), vec![tile(40, 40, SOLID_2, true)]];

    thread::scope(|scope| {
        let reader = scope.spawn(|| {
            let mut last = 0;
            for _ in 0..200 {
                let online = frames.take_online();
                let counter = online.frame_counter();
                let shapes = online.shape_count();
                assert!(counter >= last);
                thread::sleep(Duration::from_micros(50));
                assert_eq!(online.frame_counter(), counter);
                assert_eq!(online.shape_count(), shapes);
                last = counter;
            }
        });
        for i in 0..60 {
            run(&mut pipe, &scenes[i % 2]);
        }
        reader.join().unwrap();
    });
    assert_eq!(pipe.frames().take_online().frame_counter(), 60);
}

#[derive(Clone, Debug)]
enum Op {
    TakeOnline,
    DropOnline,
    Publish,
    Discard,
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        Just(Op::TakeOnline),
        Just(Op::DropOnline),
        Just(Op::Publish),
        Just(Op::Discard),
    ]
}

proptest! {
    // the producer never gets the slot a reader holds, and fresh readers see the last publish
    #[test]
    fn offline_slot_never_aliases_readers(ops in prop::collection::vec(op(), 1..40)) {
        let frames = FrameManager::new(&VideoSettings::default());
        let mut readers = Vec::new();
        let mut published = None;
        for op in ops {
            match op {
                Op::TakeOnline if readers.len() < 3 => {
                    let online = frames.take_online();
                    if readers.is_empty() {
                        if let Some(slot) = published {
                            prop_assert_eq!(online.slot(), slot);
                        }
                    }
                    readers.push(online);
                }
                Op::TakeOnline => {}
                Op::DropOnline => {
                    readers.pop();
                }
                Op::Publish | Op::Discard => {
                    let offline = frames.take_offline();
                    for r in &readers {
                        prop_assert_ne!(r.slot(), offline.slot());
                    }
                    if matches!(op, Op::Publish) {
                        published = Some(offline.slot());
                        offline.publish();
                    }
                }
            }
        }
    }
}
