use tilevox_geom::{IVec3, Vec3};

use crate::TexelSource;
use crate::face::Face;
use crate::mesh_build::MeshBuild;
use crate::volume::{Texel, UvVolume};

/// How merged quads are colored.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum GreedyColoring {
    /// Quads carry atlas UVs of their corner texels; any exposed faces merge.
    #[default]
    Atlas,
    /// Quads carry a palette-index code as UV; only faces of one color merge.
    Palette,
}

/// UV code of palette index 0..=3 in [`GreedyColoring::Palette`] meshes.
pub const PALETTE_UV: [[f32; 2]; 4] = [[0.0, 0.0], [1.0, 0.0], [0.0, 1.0], [1.0, 1.0]];

/// Greedy-merges the exposed faces of `vol` into quads appended to `out`.
///
/// Positions are relative to the volume center. A face between two voxels is exposed
/// when exactly one of them holds a texel for the sweep axis.
pub fn mesh_greedy(
    vol: &UvVolume,
    texels: &impl TexelSource,
    coloring: GreedyColoring,
    out: &mut MeshBuild,
) {
    let s = vol.size();
    let size = [s.x, s.y, s.z];
    let center = s.as_vec3() / 2.0;
    let plane = (size[0] * size[1]).max(size[1] * size[2]).max(size[0] * size[2]) as usize;
    let mut mask: Vec<Option<Texel>> = vec![None; plane];
    let color_of = |t: Option<Texel>| t.map_or(0, |t| texels.color(t));

    for back in [true, false] {
        for d in 0..3 {
            let u = (d + 1) % 3;
            let v = (d + 2) % 3;
            let su = size[u] as usize;
            let mut q = [0i32; 3];
            q[d] = 1;
            let mut x = [0i32; 3];
            x[d] = -1;
            while x[d] < size[d] {
                let mut n = 0;
                for xv in 0..size[v] {
                    x[v] = xv;
                    for xu in 0..size[u] {
                        x[u] = xu;
                        let p = IVec3::new(x[0], x[1], x[2]);
                        let a = if x[d] >= 0 { vol.get(p, d) } else { None };
                        let b = if x[d] + 1 < size[d] {
                            vol.get(IVec3::new(x[0] + q[0], x[1] + q[1], x[2] + q[2]), d)
                        } else {
                            None
                        };
                        mask[n] = match (a, b) {
                            (Some(_), Some(_)) => None,
                            _ if back => b,
                            _ => a,
                        };
                        n += 1;
                    }
                }
                x[d] += 1;

                n = 0;
                for xv in 0..size[v] {
                    x[v] = xv;
                    let mut xu = 0;
                    while xu < size[u] {
                        x[u] = xu;
                        let Some(first) = mask[n] else {
                            xu += 1;
                            n += 1;
                            continue;
                        };
                        let color = match coloring {
                            GreedyColoring::Palette => texels.color(first),
                            GreedyColoring::Atlas => 0,
                        };
                        let same = |cell: Option<Texel>| match coloring {
                            GreedyColoring::Palette => color_of(cell) == color,
                            GreedyColoring::Atlas => cell.is_some(),
                        };
                        let mut w = 1usize;
                        while xu + (w as i32) < size[u] && same(mask[n + w]) {
                            w += 1;
                        }
                        let mut h = 1usize;
                        'rows: while xv + (h as i32) < size[v] {
                            let row = n + h * su;
                            for k in 0..w {
                                if !same(mask[row + k]) {
                                    break 'rows;
                                }
                            }
                            h += 1;
                        }

                        let mut du = [0i32; 3];
                        du[u] = w as i32;
                        let mut dv = [0i32; 3];
                        dv[v] = h as i32;
                        let corner = |a: [i32; 3], b: [i32; 3]| {
                            Vec3::new(
                                (x[0] + a[0] + b[0]) as f32,
                                (x[1] + a[1] + b[1]) as f32,
                                (x[2] + a[2] + b[2]) as f32,
                            ) - center
                        };
                        let zero = [0i32; 3];
                        let bl = corner(zero, zero);
                        let tl = corner(dv, zero);
                        let br = corner(du, zero);
                        let tr = corner(du, dv);

                        let last_row = n + su * (h - 1);
                        let uvs = match coloring {
                            GreedyColoring::Palette => [PALETTE_UV[(color & 3) as usize]; 4],
                            GreedyColoring::Atlas => atlas_uvs(
                                texels,
                                d,
                                first,
                                mask[last_row].unwrap_or(first),
                                mask[n + w - 1].unwrap_or(first),
                                mask[last_row + w - 1].unwrap_or(first),
                            ),
                        };
                        out.add_quad([bl, tl, br, tr], uvs, Face::from_axis(d, back).normal(), back);

                        for j in 0..h {
                            mask[n + j * su..n + j * su + w].fill(None);
                        }
                        xu += w as i32;
                        n += w;
                    }
                }
            }
        }
    }
}

/// Corner texels widened by one texel toward the far side of the quad so the UV rectangle
/// covers whole pixels. Sweeps along z map texel x/y the other way round.
fn atlas_uvs(
    texels: &impl TexelSource,
    d: usize,
    bl: Texel,
    tl: Texel,
    br: Texel,
    tr: Texel,
) -> [[f32; 2]; 4] {
    let [mut bl, mut tl, mut br, mut tr] = [bl.as_f32(), tl.as_f32(), br.as_f32(), tr.as_f32()];
    let z_sweep = d == 2;
    for c in 0..2 {
        let is_x = c == 0;
        if tr[c] >= bl[c] {
            // far side is the top-right corner
            if z_sweep == is_x {
                tr[c] += 1.0;
                br[c] += 1.0;
            } else {
                tr[c] += 1.0;
                tl[c] += 1.0;
            }
        } else if z_sweep == is_x {
            bl[c] += 1.0;
            tl[c] += 1.0;
        } else {
            bl[c] += 1.0;
            br[c] += 1.0;
        }
    }
    [
        texels.coord_to_uv(bl),
        texels.coord_to_uv(tl),
        texels.coord_to_uv(br),
        texels.coord_to_uv(tr),
    ]
}
