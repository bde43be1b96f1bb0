use std::cmp::Ordering;
use std::hash::{Hash, Hasher};

/// Bitplane encoding of one 8x8 tile plus mirror flags, exactly as delivered by the video
/// source. Bit `y * 8 + (7 - x)` of each plane holds one bit of pixel (x, y)'s color index.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct RawTile {
    pub low: u64,
    pub high: u64,
    pub flip_x: bool,
    pub flip_y: bool,
}

impl RawTile {
    #[inline]
    pub const fn new(low: u64, high: u64, flip_x: bool, flip_y: bool) -> Self {
        Self {
            low,
            high,
            flip_x,
            flip_y,
        }
    }

    /// Builds planes from a row-major 8x8 array of color indices (0..=3).
    pub fn from_pixels(pixels: &[u8; 64], flip_x: bool, flip_y: bool) -> Self {
        let mut low = 0u64;
        let mut high = 0u64;
        for y in 0..8usize {
            for x in 0..8usize {
                let c = pixels[y * 8 + x] & 3;
                let bit = y * 8 + (7 - x);
                low |= ((c & 1) as u64) << bit;
                high |= (((c >> 1) & 1) as u64) << bit;
            }
        }
        Self::new(low, high, flip_x, flip_y)
    }

    #[inline]
    pub fn flip(&self) -> u8 {
        (self.flip_x as u8) | ((self.flip_y as u8) << 1)
    }

    /// Color index of pixel (x, y) after the mirror flags are applied.
    #[inline]
    pub fn color(&self, x: i32, y: i32) -> u8 {
        let x = if self.flip_x { !x & 7 } else { x & 7 };
        let y = if self.flip_y { !y & 7 } else { y & 7 };
        let bit = ((y << 3) | (!x & 7)) as u32;
        ((((self.high >> bit) & 1) << 1) | ((self.low >> bit) & 1)) as u8
    }

    /// Decoded, mirror-applied pixels in row-major order.
    pub fn pixels(&self) -> [u8; 64] {
        let mut out = [0u8; 64];
        for y in 0..8 {
            for x in 0..8 {
                out[(y * 8 + x) as usize] = self.color(x, y);
            }
        }
        out
    }

    /// Clears mirror flags that do not change the decoded pixels, so that a symmetric tile
    /// drawn mirrored maps to the same key as the unmirrored one.
    pub fn normalized(&self) -> RawTile {
        let pixels = self.pixels();
        let mut best = *self;
        for flip in 0..4u8 {
            if flip >= best.flip() {
                break;
            }
            let cand = RawTile::new(self.low, self.high, flip & 1 != 0, flip & 2 != 0);
            if cand.pixels() == pixels {
                best = cand;
                break;
            }
        }
        best
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.low == 0 && self.high == 0
    }

    fn fold_hash(&self) -> u32 {
        ((self.low >> 32) as u32)
            ^ (self.low as u32)
            ^ ((self.high >> 32) as u32)
            ^ (self.high as u32)
            ^ self.flip() as u32
    }
}

impl Hash for RawTile {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u32(self.fold_hash());
    }
}

impl Ord for RawTile {
    fn cmp(&self, other: &Self) -> Ordering {
        self.high
            .cmp(&other.high)
            .then(self.low.cmp(&other.low))
            .then(self.flip().cmp(&other.flip()))
    }
}

impl PartialOrd for RawTile {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
