use criterion::{Criterion, black_box, criterion_group, criterion_main};

use tilevox_atlas::{AtlasSettings, PaletteIndex, atlas_channel};
use tilevox_geom::IVec2;
use tilevox_model::{BuildContext, MeshPools, ModelSettings, ModelUpload, UploadSink};
use tilevox_pattern::PatternStore;
use tilevox_segment::{Frame, SegmentSettings, TileRecord, VideoSettings, segment};
use tilevox_tiles::RawTile;

struct Discard;

impl UploadSink for Discard {
    fn submit(&self, _upload: ModelUpload) {}
}

/// Ground strip, a few floating platforms and a handful of sprites.
fn scene() -> Vec<TileRecord> {
    let ground = RawTile::new(u64::MAX, 0, false, false);
    let brick = RawTile::new(0xFF81_8181_8181_81FF, u64::MAX, false, false);
    let mut out = Vec::new();
    for y in 26..30 {
        for x in 0..32 {
            out.push(TileRecord {
                x: x * 8,
                y: y * 8,
                raw: ground,
                palette: 0,
                background: true,
                hidden: false,
            });
        }
    }
    for (px, py) in [(4, 18), (12, 14), (20, 18)] {
        for x in px..px + 5 {
            out.push(TileRecord {
                x: x * 8,
                y: py * 8,
                raw: brick,
                palette: 1,
                background: true,
                hidden: false,
            });
        }
    }
    for i in 0..8 {
        out.push(TileRecord {
            x: 40 + (i % 2) * 8,
            y: 150 + (i / 2) * 8,
            raw: brick,
            palette: 2,
            background: false,
            hidden: false,
        });
    }
    out
}

fn bench_segment(c: &mut Criterion) {
    let video = VideoSettings::default();
    let (mut atlas, _pages) = atlas_channel(&AtlasSettings::default());
    let pools = MeshPools::new(8);
    let model = ModelSettings::default();
    let settings = SegmentSettings::default();
    let mut store = PatternStore::new();
    let mut frame = Frame::new(&video);
    let records = scene();
    let palette = PaletteIndex::default();
    let mut counter = 0u64;

    c.bench_function("segment_steady_frame", |b| {
        b.iter(|| {
            counter += 1;
            frame.reset();
            frame.ingest(&records, &palette, IVec2::ZERO, counter, store.tiles_mut());
            let mut ctx = BuildContext {
                atlas: &mut atlas,
                pools: &pools,
                settings: &model,
                sink: &Discard,
            };
            let stats = segment(&mut frame, &mut store, &mut ctx, &settings);
            black_box(stats.map(|s| s.bg_shapes + s.sprite_shapes).unwrap_or(0));
        })
    });
}

criterion_group!(benches, bench_segment);
criterion_main!(benches);
