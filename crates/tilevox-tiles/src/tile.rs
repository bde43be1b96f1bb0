use std::collections::VecDeque;

use tilevox_geom::IVec2;

use crate::dir::Dir;
use crate::raw::RawTile;

/// Six coarse fill buckets, ordered from empty to solid.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub enum Density {
    #[default]
    Empty,
    Low,
    Average,
    Medium,
    High,
    Solid,
}

impl Density {
    pub const COUNT: usize = 6;

    pub fn from_pixel_count(count: u32) -> Density {
        match count {
            64.. => Density::Solid,
            48..=63 => Density::High,
            32..=47 => Density::Medium,
            16..=31 => Density::Average,
            1..=15 => Density::Low,
            0 => Density::Empty,
        }
    }

    /// Bucket for `count` filled units out of `area`: Solid when full, otherwise
    /// `ceil(count * 4 / area)` into Empty..High.
    pub fn from_ratio(count: u32, area: u32) -> Density {
        if area == 0 || count == 0 {
            return Density::Empty;
        }
        if count >= area {
            return Density::Solid;
        }
        let steps = (Density::COUNT - 2) as u32;
        match (count * steps).div_ceil(area) {
            0 => Density::Empty,
            1 => Density::Low,
            2 => Density::Average,
            3 => Density::Medium,
            _ => Density::High,
        }
    }
}

/// Coarse 2D geometry of a tile's pixels.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub enum TileClass {
    #[default]
    Unidentified,
    /// Thin single-color glyph (text, outlines).
    Char,
    /// Pixels exactly fill their bounding box.
    Rect,
    /// Nearly the whole tile is filled.
    FullRect,
}

/// Bit set of the color indices (0..=3) present in a tile.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub struct ColorSet(pub u8);

impl ColorSet {
    #[inline]
    pub fn insert(&mut self, color: u8) {
        self.0 |= 1 << (color & 3);
    }

    #[inline]
    pub fn union(self, other: ColorSet) -> ColorSet {
        ColorSet(self.0 | other.0)
    }

    #[inline]
    pub fn count(self) -> u32 {
        self.0.count_ones()
    }

    #[inline]
    pub fn intersects(self, other: ColorSet) -> bool {
        self.0 & other.0 != 0
    }
}

/// Analyzed, immutable form of a [`RawTile`].
#[derive(Clone, Debug)]
pub struct CanonicalTile {
    pub raw: RawTile,
    pixels: [u8; 64],
    /// Inclusive pixel bounding box of the nonzero pixels.
    pub start: IVec2,
    pub end: IVec2,
    pub size: IVec2,
    pub pixel_count: u32,
    pub colors: ColorSet,
    pub density: Density,
    pub class: TileClass,
    pub self_connected: bool,
    reached: [bool; 4],
    border_count: u8,
}

impl CanonicalTile {
    pub fn analyze(raw: RawTile) -> Self {
        let pixels = raw.pixels();
        let mut start = IVec2::new(7, 7);
        let mut end = IVec2::new(0, 0);
        let mut pixel_count = 0u32;
        let mut colors = ColorSet::default();
        for y in 0..8 {
            for x in 0..8 {
                let c = pixels[(y * 8 + x) as usize];
                if c != 0 {
                    pixel_count += 1;
                    start = start.min(IVec2::new(x, y));
                    end = end.max(IVec2::new(x, y));
                    colors.insert(c);
                }
            }
        }
        let size = end - start + IVec2::ONE;

        let reached = [end.x == 7, end.y == 7, start.y == 0, start.x == 0];
        let border_count = reached.iter().filter(|r| **r).count() as u8;

        let mut tile = CanonicalTile {
            raw,
            pixels,
            start,
            end,
            size,
            pixel_count,
            colors,
            density: Density::from_pixel_count(pixel_count),
            class: TileClass::Unidentified,
            self_connected: false,
            reached,
            border_count,
        };
        tile.self_connected = tile.detect_self_connection();
        tile.class = tile.detect_class();
        tile
    }

    /// Color index of pixel (x, y), coordinates wrapped into the tile.
    #[inline]
    pub fn color(&self, x: i32, y: i32) -> u8 {
        self.pixels[(((y & 7) << 3) | (x & 7)) as usize]
    }

    #[inline]
    pub fn active(&self, x: i32, y: i32) -> bool {
        self.color(x, y) != 0
    }

    #[inline]
    pub fn pixels(&self) -> &[u8; 64] {
        &self.pixels
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.pixel_count == 0
    }

    /// Nearly full and single colored.
    #[inline]
    pub fn is_solid(&self) -> bool {
        self.pixel_count >= 61 && self.colors.count() == 1
    }

    #[inline]
    pub fn is_char(&self) -> bool {
        self.class == TileClass::Char
    }

    /// Nonzero pixels touch the tile edge facing `dir`.
    #[inline]
    pub fn reaches(&self, dir: Dir) -> bool {
        self.reached[dir.index()]
    }

    #[inline]
    pub fn border_count(&self) -> u8 {
        self.border_count
    }

    fn detect_self_connection(&self) -> bool {
        if self.pixel_count == 0 {
            return false;
        }
        let mut seen = [false; 64];
        let y0 = self.start.y;
        let Some(x0) = (self.start.x..=self.end.x).find(|x| self.active(*x, y0)) else {
            return false;
        };
        let mut queue = VecDeque::new();
        seen[(y0 * 8 + x0) as usize] = true;
        queue.push_back(IVec2::new(x0, y0));
        let mut area = 1u32;
        while let Some(p) = queue.pop_front() {
            for d in Dir::ALL {
                let n = p + d.delta();
                if n.x < 0 || n.x >= 8 || n.y < 0 || n.y >= 8 {
                    continue;
                }
                let i = (n.y * 8 + n.x) as usize;
                if !seen[i] && self.pixels[i] != 0 {
                    seen[i] = true;
                    area += 1;
                    queue.push_back(n);
                }
            }
        }
        area == self.pixel_count
    }

    fn detect_class(&self) -> TileClass {
        let glyph = self.colors.count() == 1
            && self.density <= Density::Medium
            && (self.border_count <= 2 || (!self.self_connected && self.border_count == 4));
        if self.pixel_count >= 60 {
            TileClass::FullRect
        } else if glyph {
            TileClass::Char
        } else if self.pixel_count as i32 == self.size.area() {
            TileClass::Rect
        } else {
            TileClass::Unidentified
        }
    }
}
