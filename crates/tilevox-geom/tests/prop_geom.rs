use proptest::prelude::*;
use tilevox_geom::{IRect, IVec2, Vec3};

fn approx(a: f32, b: f32, eps: f32) -> bool {
    (a - b).abs() <= eps
}

fn small_rect() -> impl Strategy<Value = IRect> {
    (-64i32..64, -64i32..64, 0i32..32, 0i32..32).prop_map(|(x, y, w, h)| IRect::new(x, y, w, h))
}

fn small_vec() -> impl Strategy<Value = IVec2> {
    (-100i32..100, -100i32..100).prop_map(|(x, y)| IVec2::new(x, y))
}

proptest! {
    // Overlap is symmetric
    #[test]
    fn overlap_symmetric(a in small_rect(), b in small_rect()) {
        prop_assert_eq!(a.overlaps(&b), b.overlaps(&a));
    }

    // A non-empty rect overlaps itself, an empty one never overlaps anything
    #[test]
    fn overlap_self(a in small_rect()) {
        prop_assert_eq!(a.overlaps(&a), !a.is_empty());
    }

    // Side-by-side rects share an edge but do not overlap
    #[test]
    fn adjacent_rects_do_not_overlap(a in small_rect()) {
        let right = IRect::new(a.x + a.w, a.y, a.w, a.h);
        let below = IRect::new(a.x, a.y + a.h, a.w, a.h);
        prop_assert!(!a.overlaps(&right));
        prop_assert!(!a.overlaps(&below));
    }

    // Containing rect contains every interior point of the contained one
    #[test]
    fn contains_rect_implies_points(a in small_rect(), dx in 0i32..8, dy in 0i32..8) {
        let inner = IRect::new(a.x + dx.min(a.w), a.y + dy.min(a.h), (a.w - dx).max(0), (a.h - dy).max(0));
        prop_assert!(a.contains_rect(&inner));
        if !inner.is_empty() {
            prop_assert!(a.contains_point(IVec2::new(inner.x, inner.y)));
        }
    }

    #[test]
    fn fits_within_matches_components(a in small_vec(), b in small_vec()) {
        prop_assert_eq!(a.fits_within(b), a.x <= b.x && a.y <= b.y);
        prop_assert!(a.min(b).fits_within(a));
        prop_assert!(a.fits_within(a.max(b)));
    }

    #[test]
    fn transposed_twice_is_identity(a in small_vec()) {
        prop_assert_eq!(a.transposed().transposed(), a);
        prop_assert_eq!(a.transposed().min_elem(), a.min_elem());
    }
}

#[test]
fn vec3_cross_and_length() {
    let x = Vec3::new(1.0, 0.0, 0.0);
    let y = Vec3::new(0.0, 1.0, 0.0);
    let z = x.cross(y);
    assert!(approx(z.z, 1.0, 1e-6));
    assert!(approx(Vec3::new(3.0, 4.0, 0.0).length_squared(), 25.0, 1e-6));
    assert!(approx(Vec3::new(-1.0, 2.0, -2.0).length_squared(), 9.0, 1e-6));
    assert!(approx((z - z).length_squared(), 0.0, 1e-6));
    assert_eq!(Vec3::ONE.mul_elem(Vec3::splat(2.0)), Vec3::splat(2.0));
}

#[test]
fn min_axis_picks_smaller_component() {
    assert_eq!(IVec2::new(2, 5).min_axis(), 0);
    assert_eq!(IVec2::new(5, 2).min_axis(), 1);
    assert_eq!(IVec2::new(3, 3).min_axis(), 0);
}
