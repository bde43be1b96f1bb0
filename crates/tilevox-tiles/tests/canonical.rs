use proptest::prelude::*;
use tilevox_tiles::{CanonicalTile, Density, Dir, PatternId, RawTile, TileClass, TileRegistry};

fn pixels() -> impl Strategy<Value = [u8; 64]> {
    prop::collection::vec(0u8..4, 64).prop_map(|v| {
        let mut out = [0u8; 64];
        out.copy_from_slice(&v);
        out
    })
}

fn filled(color: u8) -> [u8; 64] {
    [color; 64]
}

fn mirror_x(p: &[u8; 64]) -> [u8; 64] {
    let mut out = [0u8; 64];
    for y in 0..8 {
        for x in 0..8 {
            out[y * 8 + x] = p[y * 8 + (7 - x)];
        }
    }
    out
}

proptest! {
    // Same raw data interned twice yields the same handle and registry size
    #[test]
    fn intern_is_idempotent(p in pixels(), fx in any::<bool>(), fy in any::<bool>()) {
        let mut reg = TileRegistry::new();
        let raw = RawTile::from_pixels(&p, fx, fy);
        let a = reg.intern(raw);
        let b = reg.intern(raw);
        prop_assert_eq!(a, b);
        prop_assert_eq!(reg.len(), 1);
        prop_assert_eq!(reg.lookup(&raw), Some(a));
    }

    // Decoding the encoded planes gives back the pixels
    #[test]
    fn planes_decode_to_pixels(p in pixels()) {
        let raw = RawTile::from_pixels(&p, false, false);
        prop_assert_eq!(raw.pixels(), p);
    }

    // Flip X on mirrored planes shows the original pixels
    #[test]
    fn flip_x_mirrors(p in pixels()) {
        let raw = RawTile::from_pixels(&mirror_x(&p), true, false);
        prop_assert_eq!(raw.pixels(), p);
    }

    // Mirrored non-symmetric tiles stay distinct; symmetric ones collapse
    #[test]
    fn mirrored_tiles_distinct_unless_identical(p in pixels()) {
        let mut reg = TileRegistry::new();
        let plain = reg.intern(RawTile::from_pixels(&p, false, false));
        let mirrored = reg.intern(RawTile::from_pixels(&p, true, false));
        let symmetric = mirror_x(&p) == p;
        prop_assert_eq!(plain == mirrored, symmetric);
    }

    // Analysis invariants
    #[test]
    fn analysis_counts_consistent(p in pixels()) {
        let t = CanonicalTile::analyze(RawTile::from_pixels(&p, false, false));
        let count = p.iter().filter(|c| **c != 0).count() as u32;
        prop_assert_eq!(t.pixel_count, count);
        prop_assert_eq!(t.density, Density::from_pixel_count(count));
        if count > 0 {
            prop_assert!(t.start.x <= t.end.x && t.start.y <= t.end.y);
            prop_assert_eq!(t.reaches(Dir::Left), t.start.x == 0);
            prop_assert_eq!(t.reaches(Dir::Down), t.end.y == 7);
            prop_assert_eq!(t.reaches(Dir::Right), t.end.x == 7);
            prop_assert_eq!(t.reaches(Dir::Up), t.start.y == 0);
            let reached = Dir::ALL.iter().filter(|d| t.reaches(**d)).count() as u8;
            prop_assert_eq!(t.border_count(), reached);
        }
    }
}

#[test]
fn solid_tile_is_full_rect_and_reaches_all_sides() {
    let t = CanonicalTile::analyze(RawTile::from_pixels(&filled(1), false, false));
    assert!(t.is_solid());
    assert_eq!(t.class, TileClass::FullRect);
    assert_eq!(t.density, Density::Solid);
    assert!(t.self_connected);
    assert_eq!(t.border_count(), 4);
    for d in Dir::ALL {
        assert!(t.reaches(d));
    }
}

#[test]
fn thin_glyph_is_char() {
    let mut p = [0u8; 64];
    // Vertical bar in the middle, touches top and bottom only
    for y in 0..8 {
        p[y * 8 + 3] = 2;
    }
    let t = CanonicalTile::analyze(RawTile::from_pixels(&p, false, false));
    assert_eq!(t.border_count(), 2);
    assert_eq!(t.class, TileClass::Char);
    assert!(t.self_connected);
}

#[test]
fn split_pixels_are_not_self_connected() {
    let mut p = [0u8; 64];
    p[0] = 1;
    p[63] = 1;
    let t = CanonicalTile::analyze(RawTile::from_pixels(&p, false, false));
    assert!(!t.self_connected);
    assert_eq!(t.pixel_count, 2);
    assert_eq!(t.density, Density::Low);
}

#[test]
fn links_drive_permanence() {
    let mut reg = TileRegistry::new();
    let t = reg.intern(RawTile::from_pixels(&filled(3), false, false));
    assert!(reg.is_new(t));
    let p = PatternId::new(0, 1);
    reg.link(t, p, false);
    assert!(reg.is_temp(t) && !reg.is_permanent(t));
    reg.link(t, p, true);
    assert!(reg.is_permanent(t));
    assert_eq!(reg.permanent_patterns(t), vec![p]);
    reg.unlink(t, p, true);
    reg.unlink(t, p, false);
    assert!(reg.is_new(t));
}

#[test]
fn density_ratio_buckets() {
    assert_eq!(Density::from_ratio(4, 4), Density::Solid);
    assert_eq!(Density::from_ratio(1, 4), Density::Low);
    assert_eq!(Density::from_ratio(3, 4), Density::Medium);
    assert_eq!(Density::from_ratio(7, 8), Density::High);
    assert_eq!(Density::from_ratio(0, 8), Density::Empty);
}
