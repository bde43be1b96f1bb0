use std::sync::Mutex;

use proptest::prelude::*;

use tilevox_atlas::{AtlasError, AtlasSettings, ColorFormat, TextureData, atlas_channel};
use tilevox_geom::{IVec2, Vec3};
use tilevox_model::{
    BuildContext, Geometry, Layer, LayerSettings, MeshPools, ModelSettings, ModelState,
    ModelUpload, Pattern3D, RenderMode, UploadSink,
};
use tilevox_tiles::TileId;

#[derive(Default)]
struct Collect(Mutex<Vec<ModelUpload>>);

impl UploadSink for Collect {
    fn submit(&self, upload: ModelUpload) {
        self.0.lock().unwrap().push(upload);
    }
}

impl Collect {
    fn take(&self) -> Vec<ModelUpload> {
        std::mem::take(&mut *self.0.lock().unwrap())
    }
}

fn solid_texture(w: i32, h: i32) -> TextureData {
    let mut tex = TextureData::new(w, h, ColorFormat::Index);
    for y in 0..h {
        for x in 0..w {
            tex.set_pixel(x, y, 1 + ((x + y) & 1) as u32);
        }
    }
    tex
}

/// Two occurrences of one tile side by side.
fn twin_model(geometry: Geometry, depth: i32) -> Pattern3D {
    let mut model = Pattern3D::new(
        IVec2::new(2, 1),
        &[Some(TileId(0)), Some(TileId(0))],
        solid_texture(16, 8),
    );
    model.geometry = geometry;
    model.depth = depth;
    model
}

#[test]
fn build_hands_off_then_becomes_ready() {
    let (mut atlas, _pages) = atlas_channel(&AtlasSettings::default());
    let pools = MeshPools::new(8);
    let settings = ModelSettings::default();
    let sink = Collect::default();
    let mut model = twin_model(Geometry::Box, 4);

    let mut ctx = BuildContext {
        atlas: &mut atlas,
        pools: &pools,
        settings: &settings,
        sink: &sink,
    };
    model.build(&mut ctx).unwrap();
    assert_eq!(model.state(), ModelState::DataCreated);
    assert!(atlas.slot(model.texture().id()).is_some());

    let mut uploads = sink.take();
    assert_eq!(uploads.len(), 1);
    let upload = uploads.pop().unwrap();
    assert_eq!(upload.texture, model.texture().id());
    assert_eq!(upload.meshes.len(), 1);
    assert_eq!(upload.meshes[0].cells, vec![IVec2::new(0, 0), IVec2::new(8, 0)]);
    assert!(!upload.meshes[0].mesh.is_empty());
    assert!(upload.finish());
    assert!(model.is_ready());
}

#[test]
fn released_model_rejects_pending_upload() {
    let (mut atlas, _pages) = atlas_channel(&AtlasSettings::default());
    let pools = MeshPools::new(8);
    let settings = ModelSettings::default();
    let sink = Collect::default();
    let mut model = twin_model(Geometry::Default, 2);
    model
        .build(&mut BuildContext {
            atlas: &mut atlas,
            pools: &pools,
            settings: &settings,
            sink: &sink,
        })
        .unwrap();

    model.release(&mut atlas);
    assert_eq!(atlas.live_count(), 0);
    let upload = sink.take().pop().unwrap();
    assert!(!upload.finish());
    assert_eq!(model.state(), ModelState::Released);
    assert!(model.tiles().iter().all(|t| t.mesh().is_none()));
}

#[test]
fn rebuild_supersedes_queued_upload() {
    let (mut atlas, _pages) = atlas_channel(&AtlasSettings::default());
    let pools = MeshPools::new(8);
    let greedy = ModelSettings::default();
    let marching = ModelSettings {
        render_mode: RenderMode::Marching,
        ..ModelSettings::default()
    };
    let sink = Collect::default();
    let mut model = twin_model(Geometry::Box, 4);
    for settings in [&greedy, &marching] {
        model
            .build(&mut BuildContext {
                atlas: &mut atlas,
                pools: &pools,
                settings,
                sink: &sink,
            })
            .unwrap();
    }

    let mut uploads = sink.take();
    assert_eq!(uploads.len(), 2);
    let fresh = uploads.pop().unwrap();
    let old = uploads.pop().unwrap();
    assert!(old.is_stale());
    assert!(!fresh.is_stale());
    assert!(!old.finish());
    assert_eq!(model.state(), ModelState::DataCreated);
    assert!(fresh.finish());
    assert!(model.is_ready());
}

#[test]
fn undersized_atlas_fails_build() {
    let (mut atlas, _pages) = atlas_channel(&AtlasSettings {
        page_size: 8,
        page_count: 1,
        ..AtlasSettings::default()
    });
    let pools = MeshPools::new(2);
    let settings = ModelSettings::default();
    let sink = Collect::default();
    let mut model = twin_model(Geometry::Box, 4);
    let err = model
        .build(&mut BuildContext {
            atlas: &mut atlas,
            pools: &pools,
            settings: &settings,
            sink: &sink,
        })
        .unwrap_err();
    assert!(matches!(err, AtlasError::OutOfSpace { width: 16, height: 8, .. }));
    assert!(sink.take().is_empty());
}

#[test]
fn marching_mode_emits_triangles_unless_forced_greedy() {
    let (mut atlas, _pages) = atlas_channel(&AtlasSettings::default());
    let pools = MeshPools::new(8);
    let settings = ModelSettings {
        render_mode: RenderMode::Marching,
        parallel_mesh: false,
        ..ModelSettings::default()
    };
    let sink = Collect::default();

    let mut smooth = twin_model(Geometry::Default, 2);
    let mut blocky = twin_model(Geometry::Default, 2);
    blocky.force_greedy = true;
    for model in [&mut smooth, &mut blocky] {
        model
            .build(&mut BuildContext {
                atlas: &mut atlas,
                pools: &pools,
                settings: &settings,
                sink: &sink,
            })
            .unwrap();
    }

    let smooth_mesh = smooth.tiles()[0].mesh().unwrap();
    assert!(smooth_mesh.triangle_count() > 0);
    assert_eq!(smooth_mesh.quad_count(), 0);
    let blocky_mesh = blocky.tiles()[0].mesh().unwrap();
    assert!(blocky_mesh.quad_count() > 0);
}

#[test]
fn depth_is_capped() {
    let (mut atlas, _pages) = atlas_channel(&AtlasSettings::default());
    let pools = MeshPools::new(2);
    let settings = ModelSettings {
        max_depth: 12,
        ..ModelSettings::default()
    };
    let sink = Collect::default();
    let mut model = twin_model(Geometry::Default, 40);
    model
        .build(&mut BuildContext {
            atlas: &mut atlas,
            pools: &pools,
            settings: &settings,
            sink: &sink,
        })
        .unwrap();
    assert_eq!(model.depth, 12);
}

#[test]
fn duplicate_owns_a_fresh_texture() {
    let mut model = twin_model(Geometry::HCylinder, 8);
    model.set_tags("door");
    let copy = model.duplicate();
    assert_ne!(copy.texture().id(), model.texture().id());
    assert_eq!(copy.geometry, Geometry::HCylinder);
    assert_eq!(copy.tags(), model.tags());
    assert_eq!(copy.state(), ModelState::Initialized);
    assert_eq!(copy.tiles().len(), 1);
}

#[test]
fn tags_split_on_separators() {
    let mut model = twin_model(Geometry::Box, 1);
    model.set_tags("enemy, flying;boss  big");
    assert_eq!(model.tags(), ["enemy", "flying", "boss", "big"]);
    assert!(model.has_tag("boss"));
    assert!(model.has_tag("*"));
    assert!(!model.has_tag("fly"));
}

#[test]
fn position_uses_resolved_layer() {
    let layers = LayerSettings::default();
    let mut model = twin_model(Geometry::Box, 8);
    let start = IVec2::new(0, 0);
    let end = IVec2::new(15, 7);

    let sprite = model.position(start, end, 240, false, &layers);
    assert_eq!(sprite, Vec3::new(8.0, 237.0, 4.0));

    let background = model.position(start, end, 240, true, &layers);
    assert_eq!(background.z, layers.l2.offset + 4.0);

    model.layer = Layer::Ui;
    model.offset = Vec3::new(1.0, 0.0, 0.0);
    let ui = model.position(start, end, 240, true, &layers);
    assert_eq!(ui, Vec3::new(9.0, 237.0, layers.ui.offset + 4.0));
}

proptest! {
    // Tags never carry separators and never come out empty
    #[test]
    fn tags_are_clean_tokens(raw in "[a-z,; \t]{0,40}") {
        let mut model = twin_model(Geometry::Box, 1);
        model.set_tags(&raw);
        for tag in model.tags() {
            prop_assert!(!tag.is_empty());
            prop_assert!(!tag.contains([',', ';', ' ', '\t']));
            prop_assert!(model.has_tag(tag));
        }
        prop_assert_eq!(model.tag_str(), raw.as_str());
    }
}
