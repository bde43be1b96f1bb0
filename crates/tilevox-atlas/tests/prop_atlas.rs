use std::sync::Arc;

use proptest::prelude::*;
use tilevox_atlas::{
    AtlasError, AtlasSettings, AtlasSlot, ColorFormat, TextureData, TextureId, atlas_channel,
};
use tilevox_geom::IVec2;

fn settings(page_size: i32, page_count: u32, ring_capacity: usize) -> AtlasSettings {
    AtlasSettings {
        page_size,
        page_count,
        ring_capacity,
    }
}

fn tex(w: i32, h: i32) -> Arc<TextureData> {
    Arc::new(TextureData::new(w, h, ColorFormat::Index))
}

#[derive(Clone, Debug)]
enum Op {
    Alloc(i32, i32),
    Release(usize),
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (1i32..40, 1i32..40).prop_map(|(w, h)| Op::Alloc(w, h)),
        2 => any::<usize>().prop_map(Op::Release),
    ]
}

fn check_live(live: &[(TextureId, IVec2, AtlasSlot)], page_size: i32) -> Result<(), TestCaseError> {
    for (i, (_, size, a)) in live.iter().enumerate() {
        let placed = if a.flipped { size.transposed() } else { *size };
        prop_assert_eq!(a.rect.size(), placed);
        prop_assert!(a.rect.x >= 0 && a.rect.y >= 0);
        prop_assert!(a.rect.x + a.rect.w <= page_size && a.rect.y + a.rect.h <= page_size);
        for (_, _, b) in &live[i + 1..] {
            if a.page == b.page {
                prop_assert!(!a.rect.overlaps(&b.rect), "{:?} overlaps {:?}", a, b);
            }
        }
    }
    Ok(())
}

proptest! {
    // Live slots never overlap under any allocate/release order
    #[test]
    fn live_slots_never_overlap(ops in proptest::collection::vec(arb_op(), 1..120)) {
        let (mut alloc, _pages) = atlas_channel(&settings(64, 3, 8));
        let mut live: Vec<(TextureId, IVec2, AtlasSlot)> = Vec::new();
        for op in ops {
            match op {
                Op::Alloc(w, h) => {
                    let t = tex(w, h);
                    match alloc.register(&t) {
                        Ok(slot) => live.push((t.id(), t.size(), slot)),
                        Err(AtlasError::OutOfSpace { .. }) => {}
                        Err(e) => prop_assert!(false, "unexpected {e}"),
                    }
                }
                Op::Release(i) if !live.is_empty() => {
                    let (id, _, slot) = live.swap_remove(i % live.len());
                    prop_assert_eq!(alloc.deregister(id), Some(slot));
                }
                Op::Release(_) => {}
            }
            check_live(&live, 64)?;
        }
        prop_assert_eq!(alloc.live_count(), live.len());
    }

    // A released rectangle is reused first by a same-or-smaller texture
    #[test]
    fn released_slot_is_reused(
        sizes in proptest::collection::vec((1i32..24, 1i32..24), 2..10),
        pick in any::<usize>(),
        shrink in (0i32..8, 0i32..8),
    ) {
        let (mut alloc, _pages) = atlas_channel(&settings(128, 2, 64));
        let mut live = Vec::new();
        for (w, h) in sizes {
            let t = tex(w, h);
            let slot = alloc.register(&t).expect("fits in an empty atlas");
            live.push((t, slot));
        }
        let (gone, slot) = live.swap_remove(pick % live.len());
        alloc.deregister(gone.id());
        let w = (slot.rect.w - shrink.0).max(1);
        let h = (slot.rect.h - shrink.1).max(1);
        let again = alloc.register(&tex(w, h)).expect("released space is reusable");
        prop_assert_eq!(again.page, slot.page);
        prop_assert_eq!((again.rect.x, again.rect.y), (slot.rect.x, slot.rect.y));
    }
}

#[test]
fn re_registering_restamps_same_slot() {
    let (mut alloc, mut pages) = atlas_channel(&settings(64, 1, 16));
    let t = tex(8, 16);
    let first = alloc.register(&t).unwrap();
    let second = alloc.register(&t).unwrap();
    assert_eq!(first, second);
    assert_eq!(alloc.live_count(), 1);
    assert_eq!(pages.commit(|_, _| {}), 2);
}

#[test]
fn exhausted_page_reports_out_of_space() {
    let (mut alloc, _pages) = atlas_channel(&settings(16, 1, 4));
    alloc.register(&tex(16, 16)).unwrap();
    let err = alloc.register(&tex(8, 8)).unwrap_err();
    assert_eq!(
        err,
        AtlasError::OutOfSpace {
            width: 8,
            height: 8,
            pages: 1
        }
    );
    assert!(err.to_string().contains("8x8"));
}

#[test]
fn tall_texture_in_empty_page_is_transposed() {
    let (mut alloc, _pages) = atlas_channel(&settings(64, 1, 4));
    let t = tex(8, 16);
    let slot = alloc.register(&t).unwrap();
    assert!(slot.flipped);
    assert_eq!(slot.rect.size(), IVec2::new(16, 8));
    let uv = alloc.coord_to_uv(t.id(), [2.0, 6.0]).unwrap();
    assert_eq!(uv, [6.0 / 64.0, 2.0 / 64.0]);
    assert_eq!(alloc.coord_to_uv(TextureId(u64::MAX), [0.0, 0.0]), None);
}

#[test]
fn commit_writes_alpha_and_flushes_only_dirty_pages() {
    let (mut alloc, mut pages) = atlas_channel(&settings(32, 2, 8));
    let mut data = TextureData::new(4, 2, ColorFormat::Index);
    data.set_pixel(1, 0, 3);
    data.set_pixel(2, 1, 1);
    let t = Arc::new(data);
    let slot = alloc.register(&t).unwrap();
    assert!(!slot.flipped);

    let mut flushed = Vec::new();
    assert_eq!(pages.commit(|page, bytes| flushed.push((page, bytes.len()))), 1);
    assert_eq!(flushed, vec![(slot.page, 32 * 32 * 4)]);
    let x = slot.rect.x;
    let y = slot.rect.y;
    assert_eq!(pages.texel(slot.page, x + 1, y), Some([0, 0, 0, 255]));
    assert_eq!(pages.texel(slot.page, x + 2, y + 1), Some([0, 0, 0, 85]));
    assert_eq!(pages.texel(slot.page, x, y), Some([0, 0, 0, 0]));

    flushed.clear();
    assert_eq!(pages.commit(|page, _| flushed.push((page, 0))), 0);
    assert!(flushed.is_empty());
}

#[test]
fn full_ring_overwrites_oldest_write() {
    let (mut alloc, mut pages) = atlas_channel(&settings(64, 1, 2));
    for _ in 0..3 {
        alloc.register(&tex(4, 4)).unwrap();
    }
    assert_eq!(alloc.overwritten(), 1);
    assert_eq!(pages.commit(|_, _| {}), 2);
}

#[test]
fn reset_frees_everything() {
    let (mut alloc, mut pages) = atlas_channel(&settings(16, 2, 8));
    alloc.register(&tex(16, 16)).unwrap();
    alloc.register(&tex(16, 16)).unwrap();
    assert!(alloc.register(&tex(1, 1)).is_err());
    alloc.reset();
    assert_eq!(alloc.live_count(), 0);
    assert_eq!(alloc.free_region_count(), 2);
    assert_eq!(pages.commit(|_, _| {}), 0);
    assert!(alloc.register(&tex(16, 16)).is_ok());
}

#[test]
fn validate_rejects_small_pages() {
    assert!(AtlasSettings::default().validate(256).is_ok());
    assert_eq!(
        settings(128, 4, 8).validate(256),
        Err(AtlasError::PageTooSmall {
            page_size: 128,
            required: 256
        })
    );
}
