use proptest::prelude::*;
use tilevox_geom::IVec3;
use tilevox_mesh_cpu::{
    GreedyColoring, MeshBuild, Texel, TexelSource, UvVolume, mesh_greedy, mesh_marching,
};

/// Texel x encodes the palette index; UVs are the raw coordinates.
struct XColor;

impl TexelSource for XColor {
    fn color(&self, texel: Texel) -> u8 {
        (texel.x & 3) as u8
    }

    fn coord_to_uv(&self, coord: [f32; 2]) -> [f32; 2] {
        coord
    }
}

fn solid(w: i32, h: i32, d: i32, color: u16) -> UvVolume {
    let mut vol = UvVolume::new(IVec3::new(w, h, d));
    for z in 0..d {
        for y in 0..h {
            for x in 0..w {
                vol.set(IVec3::new(x, y, z), Some(Texel::new(color, 0)), None);
            }
        }
    }
    vol
}

fn greedy(vol: &UvVolume, coloring: GreedyColoring) -> MeshBuild {
    let mut out = MeshBuild::default();
    mesh_greedy(vol, &XColor, coloring, &mut out);
    out
}

proptest! {
    // A solid cuboid collapses to one quad per face whatever its size
    #[test]
    fn solid_cuboid_is_six_quads(w in 1i32..10, h in 1i32..10, d in 1i32..24) {
        let vol = solid(w, h, d, 1);
        for coloring in [GreedyColoring::Atlas, GreedyColoring::Palette] {
            let mesh = greedy(&vol, coloring);
            prop_assert_eq!(mesh.quad_count(), 6);
            prop_assert_eq!(mesh.vertex_count(), 24);
            prop_assert_eq!(mesh.triangle_count(), 12);
        }
    }

    // Greedy output is centered on the volume
    #[test]
    fn solid_cuboid_bounds_are_centered(w in 1i32..10, h in 1i32..10, d in 1i32..24) {
        let mesh = greedy(&solid(w, h, d, 2), GreedyColoring::Atlas);
        let (lo, hi) = mesh.bounds().unwrap();
        prop_assert_eq!((lo.x, lo.y, lo.z), (-w as f32 / 2.0, -h as f32 / 2.0, -d as f32 / 2.0));
        prop_assert_eq!((hi.x, hi.y, hi.z), (w as f32 / 2.0, h as f32 / 2.0, d as f32 / 2.0));
    }
}

#[test]
fn empty_volume_has_no_faces() {
    let vol = UvVolume::new(IVec3::new(8, 8, 8));
    assert!(greedy(&vol, GreedyColoring::Atlas).is_empty());
    let mut out = MeshBuild::default();
    mesh_marching(&vol, &XColor, &mut out);
    assert!(out.is_empty());
}

#[test]
fn palette_mode_splits_colors() {
    let mut vol = UvVolume::new(IVec3::new(2, 1, 1));
    vol.set(IVec3::new(0, 0, 0), Some(Texel::new(1, 0)), None);
    vol.set(IVec3::new(1, 0, 0), Some(Texel::new(2, 0)), None);
    // four long faces split in two, plus the two end caps
    assert_eq!(greedy(&vol, GreedyColoring::Palette).quad_count(), 10);
    assert_eq!(greedy(&vol, GreedyColoring::Atlas).quad_count(), 6);
}

#[test]
fn hollow_axis_exposes_inner_faces() {
    let mut vol = solid(3, 3, 1, 1);
    vol.set(IVec3::new(1, 1, 0), None, None);
    let mesh = greedy(&vol, GreedyColoring::Atlas);
    // the hole adds four inner walls; front and back faces need four quads each
    assert!(mesh.quad_count() > 6);
    assert_eq!(mesh.triangle_count(), mesh.quad_count() * 2);
}

#[test]
fn palette_uvs_encode_the_color() {
    let mesh = greedy(&solid(1, 1, 1, 3), GreedyColoring::Palette);
    assert!(mesh.uv.chunks_exact(2).all(|uv| uv == [1.0, 1.0]));
}

#[test]
fn marching_single_voxel_caps_every_corner() {
    let vol = solid(1, 1, 1, 1);
    let mut out = MeshBuild::default();
    mesh_marching(&vol, &XColor, &mut out);
    assert_eq!(out.triangle_count(), 8);
    assert!(out.uv.chunks_exact(2).all(|uv| uv == [1.5, 0.5]));
}

#[test]
fn marching_triangulates_each_color_separately() {
    let mut vol = UvVolume::new(IVec3::new(2, 1, 1));
    vol.set(IVec3::new(0, 0, 0), Some(Texel::new(1, 0)), None);
    vol.set(IVec3::new(1, 0, 0), Some(Texel::new(2, 0)), None);
    let mut out = MeshBuild::default();
    mesh_marching(&vol, &XColor, &mut out);
    assert_eq!(out.triangle_count(), 16);
}
