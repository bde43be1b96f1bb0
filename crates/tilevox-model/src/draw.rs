//! Extrusion generators: write texels into the tile volumes of a [`Pattern3D`].
//!
//! All coordinates here are pattern pixel coordinates (+y down) plus a depth `z`.

use std::sync::Arc;

use tilevox_geom::{IVec2, IVec3};
use tilevox_mesh_cpu::Texel;

use crate::pattern3d::{Geometry, Pattern3D};

/// Which pixel runs an ellipse is swept along.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) enum Sweep {
    /// Along x at row `h` (vertical cylinders).
    Row,
    /// Along y at column `h` (horizontal cylinders).
    Column,
}

const ALL_QUARTERS: u8 = 0b1111;

impl Pattern3D {
    pub(crate) fn generate(&mut self) {
        match self.geometry {
            Geometry::Box => self.extrude_box(),
            Geometry::VCylinder => self.extrude_cylinder(Sweep::Row, false),
            Geometry::HCylinder => self.extrude_cylinder(Sweep::Column, false),
            Geometry::HalfVCylinder => self.extrude_cylinder(Sweep::Row, true),
            Geometry::HalfHCylinder => self.extrude_cylinder(Sweep::Column, true),
            Geometry::Default => self.extrude_default(),
        }
    }

    fn texel_at(&self, uv: IVec2) -> Option<Texel> {
        let tex = self.texture();
        if tex.pixel(uv.x, uv.y) == 0 {
            return None;
        }
        Some(Texel::new(
            uv.x.rem_euclid(tex.width().max(1)) as u16,
            uv.y.rem_euclid(tex.height().max(1)) as u16,
        ))
    }

    /// Stores the texel `uv` at pattern pixel (x, y), depth z. Transparent texels clear
    /// the voxel; positions outside the pattern or on a hole are ignored.
    pub(crate) fn set_uv(&mut self, x: i32, y: i32, z: i32, uv: IVec2, axis: Option<usize>) {
        let Some(t) = self.tile_index_at(x, y) else {
            return;
        };
        let texel = self.texel_at(uv);
        self.tile_at_mut(t)
            .set_uv(IVec3::new(x & 7, 7 - (y & 7), z), texel, axis);
    }

    fn plot(&mut self, sweep: Sweep, a: i32, h: i32, z: i32, uv_a: i32) {
        match sweep {
            Sweep::Row => self.set_uv(a, h, z, IVec2::new(uv_a, h), None),
            Sweep::Column => self.set_uv(h, a, z, IVec2::new(h, uv_a), None),
        }
    }

    /// Writes one step of the ellipse: `x1`/`x2` are the two positions along the run,
    /// `y1`/`y2` the two depths, `uv` the texture positions sampled for `x1` and `x2`.
    fn plot_quarters(&mut self, sweep: Sweep, h: i32, x: [i32; 2], y: [i32; 2], uv: [i32; 2], quarters: u8) {
        if !self.solid {
            let points = [(x[0], y[0]), (x[0], y[1]), (x[1], y[0]), (x[1], y[1])];
            for (i, (a, z)) in points.into_iter().enumerate() {
                if quarters & (1 << i) != 0 {
                    self.plot(sweep, a, h, z, uv[i / 2]);
                }
            }
        } else {
            for z in y[1]..=y[0] {
                if quarters & 0b0011 == 0b0011 {
                    self.plot(sweep, x[0], h, z, uv[0]);
                }
                if quarters & 0b1100 == 0b1100 {
                    self.plot(sweep, x[1], h, z, uv[1]);
                }
            }
        }
    }

    /// Midpoint ellipse in doubled coordinates: centre `(x0, y0) / 2`, radii `(dx, dy) / 2`.
    /// The first axis runs along the pixel run at `h`, the second is depth.
    ///
    /// `quarters` selects the (+x, +z), (+x, -z), (-x, +z), (-x, -z) quadrants by bit.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn draw_ellipse(&mut self, x0: i32, y0: i32, dx: i32, dy: i32, h: i32, sweep: Sweep, quarters: u8) {
        if dx == 0 || dy == 0 {
            self.plot(sweep, x0 >> 1, h, y0 >> 1, x0 >> 1);
            return;
        }
        let a2 = 2 * dx * dx;
        let b2 = 2 * dy * dy;
        let max_x = match sweep {
            Sweep::Row => self.pixel_size().x,
            Sweep::Column => self.pixel_size().y,
        };

        let mut error = dx * dx * dy;
        let (mut x, mut y) = (0, dy);
        let (mut stop_y, mut stop_x) = (0, a2 * dy);
        while stop_y <= stop_x {
            let x1 = ((x0 + x - 1) >> 1).clamp(0, max_x);
            let x2 = ((x0 - x - 1) >> 1).clamp(0, max_x);
            let y1 = (y0 + y) >> 1;
            let y2 = (y0 - y + 1) >> 1;
            self.plot_quarters(sweep, h, [x1, x2], [y1, y2], [x1, x2], quarters);
            x += 1;
            error -= b2 * (x - 1);
            stop_y += b2;
            if error <= 0 {
                error += a2 * (y - 1);
                y -= 1;
                stop_x -= a2;
            }
        }

        error = dy * dy * dx;
        (x, y) = (dx, 0);
        (stop_y, stop_x) = (b2 * dx, 0);
        while stop_y >= stop_x {
            let x1 = (x0 + x - 1) >> 1;
            let x2 = (x0 - x) >> 1;
            let y1 = (y0 + y) >> 1;
            let y2 = (y0 - y + 1) >> 1;
            let uv = if self.anti_shadow {
                [(x0 + y) >> 1, (x0 - y + 1) >> 1]
            } else {
                [x1, x2]
            };
            self.plot_quarters(sweep, h, [x1, x2], [y1, y2], uv, quarters);
            y += 1;
            error -= a2 * (y - 1);
            stop_x += a2;
            if error < 0 {
                error += b2 * (x - 1);
                x -= 1;
                stop_y -= b2;
            }
        }
    }

    /// Sweeps every opaque run of pixels into an ellipse whose diameter along the run is
    /// the run length and whose depth diameter is capped by the model depth. The depth
    /// afterwards is the deepest ellipse drawn.
    fn extrude_cylinder(&mut self, sweep: Sweep, half: bool) {
        let tex = Arc::clone(self.texture());
        let size = self.pixel_size();
        let (lines, run_len) = match sweep {
            Sweep::Row => (size.y, size.x),
            Sweep::Column => (size.x, size.y),
        };
        let opaque = |h: i32, a: i32| match sweep {
            Sweep::Row => tex.pixel(a, h) != 0,
            Sweep::Column => tex.pixel(h, a) != 0,
        };
        let z_max = self.depth - 1;
        let mut real_depth = 0;
        for h in 0..lines {
            let mut a = 0;
            while a < run_len {
                if opaque(h, a) {
                    let mut end = a + 1;
                    while end < run_len && opaque(h, end) {
                        end += 1;
                    }
                    end -= 1;
                    let z_diameter;
                    if half {
                        z_diameter = z_max.min((end - a) * 2);
                        let (x0, quarters) = match (sweep, self.flip) {
                            (Sweep::Column, false) => (end * 2, 0b1100),
                            (Sweep::Column, true) => (a * 2, 0b0011),
                            (Sweep::Row, false) => (a * 2, 0b0011),
                            (Sweep::Row, true) => (end * 2, 0b1100),
                        };
                        self.draw_ellipse(x0, z_max, (end - a) * 2, z_diameter, h, sweep, quarters);
                    } else {
                        z_diameter = z_max.min(end - a);
                        self.draw_ellipse(end + a, z_max, end - a, z_diameter, h, sweep, ALL_QUARTERS);
                    }
                    real_depth = real_depth.max(z_diameter + 1);
                    a = end;
                }
                a += 1;
            }
        }
        self.depth = real_depth;
    }

    /// Six textured walls: front and back show the texture, the sides and the top and
    /// bottom stretch its edge rows and columns over the depth.
    fn extrude_box(&mut self) {
        let size = self.pixel_size();
        let depth = self.depth;
        for i in 0..size.x {
            for j in 0..depth {
                self.set_uv(i, size.y - 1, j, IVec2::new(i, j), Some(1));
                self.set_uv(i, 0, j, IVec2::new(i, depth - 1 - j), Some(1));
            }
        }
        for i in 0..size.y {
            for j in 0..depth {
                self.set_uv(0, i, j, IVec2::new(depth - 1 - j, i), Some(0));
                self.set_uv(size.x - 1, i, j, IVec2::new(depth - 1 - j, i), Some(0));
            }
        }
        for i in 0..size.x {
            for j in 0..size.y {
                self.set_uv(i, j, depth - 1, IVec2::new(i, j), Some(2));
                self.set_uv(i, j, 0, IVec2::new(i, j), Some(2));
            }
        }
    }

    /// Stacks the texture `depth` times. In full-warp mode each layer samples the nearest
    /// opaque pixel at or above `y + z`, which terraces the relief.
    fn extrude_default(&mut self) {
        let tex = Arc::clone(self.texture());
        let size = self.pixel_size();
        for i in 0..size.x {
            for j in 0..size.y {
                if self.full_warp && tex.pixel(i, j) == 0 {
                    continue;
                }
                for k in 0..self.depth {
                    let uv = if self.full_warp {
                        let mut j1 = j + k;
                        while tex.pixel(i, j1) == 0 {
                            j1 -= 1;
                        }
                        IVec2::new(i, j1)
                    } else {
                        IVec2::new(i, j)
                    };
                    self.set_uv(i, j, k, uv, None);
                }
            }
        }
    }
}
