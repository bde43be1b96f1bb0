use tilevox_geom::Vec3;

use crate::pool::Recycle;

/// Vertex, normal, UV and index lists of one generated mesh.
#[derive(Default, Clone, Debug)]
pub struct MeshBuild {
    pub pos: Vec<f32>,
    pub norm: Vec<f32>,
    pub uv: Vec<f32>,
    pub idx: Vec<u32>,
    quads: usize,
}

impl MeshBuild {
    /// Clears all arrays but retains capacity for reuse across builds.
    #[inline]
    pub fn clear_keep_capacity(&mut self) {
        self.pos.clear();
        self.norm.clear();
        self.uv.clear();
        self.idx.clear();
        self.quads = 0;
    }

    /// Pre-reserve capacity for approximately `n_quads` quads worth of data.
    #[inline]
    pub fn reserve_quads(&mut self, n_quads: usize) {
        self.pos.reserve(n_quads * 4 * 3);
        self.norm.reserve(n_quads * 4 * 3);
        self.uv.reserve(n_quads * 4 * 2);
        self.idx.reserve(n_quads * 6);
    }

    #[inline]
    fn push_vertex(&mut self, p: Vec3, n: Vec3, uv: [f32; 2]) {
        self.pos.extend_from_slice(&[p.x, p.y, p.z]);
        self.norm.extend_from_slice(&[n.x, n.y, n.z]);
        self.uv.extend_from_slice(&uv);
    }

    /// Appends a quad given its corners as bottom-left, top-left, bottom-right, top-right
    /// in the sweep plane. Back faces use the reversed winding.
    pub fn add_quad(&mut self, corners: [Vec3; 4], uvs: [[f32; 2]; 4], n: Vec3, back_face: bool) {
        let base = self.vertex_count() as u32;
        for (p, uv) in corners.into_iter().zip(uvs) {
            self.push_vertex(p, n, uv);
        }
        let order: [u32; 6] = if back_face {
            [2, 0, 1, 1, 3, 2]
        } else {
            [2, 3, 1, 1, 0, 2]
        };
        self.idx.extend(order.iter().map(|i| base + i));
        self.quads += 1;
    }

    /// Appends one triangle, emitted in `c, b, a` index order, with a flat normal.
    pub fn add_triangle(&mut self, a: Vec3, b: Vec3, c: Vec3, uv: [f32; 2]) {
        let base = self.vertex_count() as u32;
        let cross = (b - c).cross(a - c);
        let len = cross.length_squared().sqrt();
        let n = if len > 0.0 { cross / len } else { Vec3::ZERO };
        for p in [a, b, c] {
            self.push_vertex(p, n, uv);
        }
        self.idx.extend_from_slice(&[base + 2, base + 1, base]);
    }

    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.pos.len() / 3
    }

    #[inline]
    pub fn triangle_count(&self) -> usize {
        self.idx.len() / 3
    }

    /// Quads emitted by [`MeshBuild::add_quad`] since the last clear.
    #[inline]
    pub fn quad_count(&self) -> usize {
        self.quads
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.idx.is_empty()
    }

    /// Returns a slice of interleaved vertex positions (x,y,z per vertex).
    pub fn positions(&self) -> &[f32] {
        &self.pos
    }

    /// Returns a slice of interleaved vertex normals (x,y,z per vertex).
    pub fn normals(&self) -> &[f32] {
        &self.norm
    }

    /// Axis-aligned bounds of all vertices, `None` for an empty mesh.
    pub fn bounds(&self) -> Option<(Vec3, Vec3)> {
        let mut it = self.pos.chunks_exact(3).map(|p| Vec3::new(p[0], p[1], p[2]));
        let first = it.next()?;
        Some(it.fold((first, first), |(lo, hi), p| {
            (
                Vec3::new(lo.x.min(p.x), lo.y.min(p.y), lo.z.min(p.z)),
                Vec3::new(hi.x.max(p.x), hi.y.max(p.y), hi.z.max(p.z)),
            )
        }))
    }
}

impl Recycle for MeshBuild {
    fn recycle(&mut self) {
        self.clear_keep_capacity();
    }
}
