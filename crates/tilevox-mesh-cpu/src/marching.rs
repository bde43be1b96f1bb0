use tilevox_geom::{IVec3, Vec3};

use crate::TexelSource;
use crate::mesh_build::MeshBuild;
use crate::tables::{EDGE_TABLE, TRI_TABLE};
use crate::volume::{Texel, UvVolume};

/// Corner grid sampled by [`mesh_marching`].
pub trait MarchingField {
    /// Voxel extent; cubes are visited from -1 to `size - 1` on every axis.
    fn size(&self) -> IVec3;
    /// Texel at a voxel corner. Corners may lie one step outside the extent.
    fn corner(&self, p: IVec3) -> Option<Texel>;
    /// Seam cubes that a neighbouring volume emits instead.
    fn skip_cube(&self, _origin: IVec3) -> bool {
        false
    }
}

impl MarchingField for UvVolume {
    fn size(&self) -> IVec3 {
        UvVolume::size(self)
    }

    fn corner(&self, p: IVec3) -> Option<Texel> {
        self.get(p, 0)
    }
}

const CORNERS: [IVec3; 8] = [
    IVec3::new(0, 0, 1),
    IVec3::new(1, 0, 1),
    IVec3::new(1, 0, 0),
    IVec3::new(0, 0, 0),
    IVec3::new(0, 1, 1),
    IVec3::new(1, 1, 1),
    IVec3::new(1, 1, 0),
    IVec3::new(0, 1, 0),
];

const EDGE_CORNERS: [(usize, usize); 12] = [
    (0, 1),
    (1, 2),
    (2, 3),
    (3, 0),
    (4, 5),
    (5, 6),
    (6, 7),
    (7, 4),
    (0, 4),
    (1, 5),
    (2, 6),
    (3, 7),
];

/// Multi-material marching cubes: every nonzero color present at a cube's corners is
/// triangulated on its own, treating corners of that color as inside.
///
/// Each emitted triangle carries the UV of one texel of its color, sampled at the texel
/// center. Positions are relative to the center of the corner grid.
pub fn mesh_marching(field: &impl MarchingField, texels: &impl TexelSource, out: &mut MeshBuild) {
    let size = field.size();
    let center = (size.as_vec3() - Vec3::ONE) / 2.0;
    let mut corner_pos = [IVec3::default(); 8];
    let mut corner_uv: [Option<Texel>; 8] = [None; 8];
    let mut corner_color = [0u8; 8];
    let mut colors: Vec<u8> = Vec::with_capacity(4);
    let mut verts = [Vec3::ZERO; 12];

    for z in -1..size.z {
        for y in -1..size.y {
            for x in -1..size.x {
                let origin = IVec3::new(x, y, z);
                if field.skip_cube(origin) {
                    continue;
                }
                colors.clear();
                for i in 0..8 {
                    corner_pos[i] = origin + CORNERS[i];
                    corner_uv[i] = field.corner(corner_pos[i]);
                    corner_color[i] = corner_uv[i].map_or(0, |t| texels.color(t));
                    if corner_color[i] != 0 && !colors.contains(&corner_color[i]) {
                        colors.push(corner_color[i]);
                    }
                }

                for &color in &colors {
                    let mut cube_index = 0usize;
                    let mut texel = Texel::default();
                    for i in 0..8 {
                        if corner_color[i] == color {
                            cube_index |= 1 << i;
                            if let Some(t) = corner_uv[i] {
                                texel = t;
                            }
                        }
                    }
                    if cube_index == 255 {
                        break;
                    }
                    let edges = EDGE_TABLE[cube_index];
                    for (e, (a, b)) in EDGE_CORNERS.iter().enumerate() {
                        if edges & (1 << e) != 0 {
                            verts[e] = (corner_pos[*a].as_vec3() + corner_pos[*b].as_vec3()) / 2.0;
                        }
                    }
                    let [tx, ty] = texel.as_f32();
                    let uv = texels.coord_to_uv([tx + 0.5, ty + 0.5]);
                    for tri in TRI_TABLE[cube_index].chunks_exact(3) {
                        if tri[0] < 0 {
                            break;
                        }
                        out.add_triangle(
                            verts[tri[0] as usize] - center,
                            verts[tri[1] as usize] - center,
                            verts[tri[2] as usize] - center,
                            uv,
                        );
                    }
                }
            }
        }
    }
}
