use std::sync::atomic::{AtomicU64, Ordering};

use tilevox_geom::IVec2;

use crate::palette::{PaletteIndex, Rgba};

static NEXT_TEXTURE_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of a texture buffer. Clones share it; [`TextureData::duplicate`] does not.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct TextureId(pub u64);

impl TextureId {
    pub fn fresh() -> Self {
        TextureId(NEXT_TEXTURE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum ColorFormat {
    /// 2-bit palette indices, 16 pixels per word.
    #[default]
    Index,
    /// One packed `0xRRGGBBAA` color per word.
    Direct,
}

/// A `width` x `height` pixel buffer. Pixel reads and writes wrap around the edges.
#[derive(Clone, Debug)]
pub struct TextureData {
    id: TextureId,
    width: i32,
    height: i32,
    format: ColorFormat,
    data: Vec<u32>,
}

fn words_for(width: i32, height: i32, format: ColorFormat) -> usize {
    let count = (width.max(0) * height.max(0)) as usize;
    match format {
        ColorFormat::Index => count.div_ceil(16),
        ColorFormat::Direct => count,
    }
}

impl TextureData {
    pub fn new(width: i32, height: i32, format: ColorFormat) -> Self {
        Self {
            id: TextureId::fresh(),
            width,
            height,
            format,
            data: vec![0; words_for(width, height, format)],
        }
    }

    #[inline]
    pub fn id(&self) -> TextureId {
        self.id
    }

    #[inline]
    pub fn width(&self) -> i32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> i32 {
        self.height
    }

    #[inline]
    pub fn size(&self) -> IVec2 {
        IVec2::new(self.width, self.height)
    }

    #[inline]
    pub fn format(&self) -> ColorFormat {
        self.format
    }

    #[inline]
    fn linear(&self, x: i32, y: i32) -> usize {
        let x = x.rem_euclid(self.width.max(1));
        let y = y.rem_euclid(self.height.max(1));
        (y * self.width + x) as usize
    }

    /// Palette index (index format) or packed color (direct format) at (x, y).
    pub fn pixel(&self, x: i32, y: i32) -> u32 {
        if self.data.is_empty() {
            return 0;
        }
        let i = self.linear(x, y);
        match self.format {
            ColorFormat::Index => (self.data[i >> 4] >> ((i & 15) * 2)) & 3,
            ColorFormat::Direct => self.data[i],
        }
    }

    pub fn set_pixel(&mut self, x: i32, y: i32, value: u32) {
        if self.data.is_empty() {
            return;
        }
        let i = self.linear(x, y);
        match self.format {
            ColorFormat::Index => {
                let shift = (i & 15) * 2;
                let word = &mut self.data[i >> 4];
                *word = (*word & !(3 << shift)) | ((value & 3) << shift);
            }
            ColorFormat::Direct => self.data[i] = value,
        }
    }

    /// Copy of the `w` x `h` region at (x, y), in index format.
    pub fn sub_rect(&self, x: i32, y: i32, w: i32, h: i32) -> TextureData {
        let mut out = TextureData::new(w, h, ColorFormat::Index);
        for i in 0..w {
            for j in 0..h {
                out.set_pixel(i, j, self.pixel(x + i, y + j));
            }
        }
        out
    }

    /// Pastes `src` at (x, y). Textures of different formats are left untouched.
    pub fn paste(&mut self, src: &TextureData, x: i32, y: i32) -> bool {
        if src.format != self.format {
            log::debug!(target: "atlas", "paste skipped: {:?} into {:?}", src.format, self.format);
            return false;
        }
        for i in 0..src.width {
            for j in 0..src.height {
                self.set_pixel(x + i, y + j, src.pixel(i, j));
            }
        }
        true
    }

    /// Same pixels under a new identity, so it gets its own atlas slot.
    pub fn duplicate(&self) -> TextureData {
        TextureData {
            id: TextureId::fresh(),
            ..self.clone()
        }
    }

    /// Resolves palette indices to colors of palette `group`; index 0 stays transparent.
    pub fn to_direct(&mut self, palette: &PaletteIndex, group: u8) {
        if self.format == ColorFormat::Direct {
            return;
        }
        let mut data = vec![0u32; words_for(self.width, self.height, ColorFormat::Direct)];
        for y in 0..self.height {
            for x in 0..self.width {
                let index = self.pixel(x, y) as u8;
                if index > 0 {
                    data[(y * self.width + x) as usize] = palette.group_color(group, index).to_u32();
                }
            }
        }
        self.data = data;
        self.format = ColorFormat::Direct;
    }

    /// Pixel as stored in an atlas page: index format becomes black with alpha `index / 3`.
    pub fn page_color(&self, x: i32, y: i32) -> Rgba {
        let v = self.pixel(x, y);
        match self.format {
            ColorFormat::Index => Rgba::new(0, 0, 0, (v * 85) as u8),
            ColorFormat::Direct => Rgba::from_u32(v),
        }
    }

    /// Same size, format and pixels; identity is ignored.
    pub fn is_identical(&self, other: &TextureData) -> bool {
        self.format == other.format
            && self.width == other.width
            && self.height == other.height
            && self.data == other.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_pixels_pack_and_wrap() {
        let mut tex = TextureData::new(20, 3, ColorFormat::Index);
        tex.set_pixel(17, 1, 3);
        tex.set_pixel(18, 1, 2);
        assert_eq!(tex.pixel(17, 1), 3);
        assert_eq!(tex.pixel(18, 1), 2);
        assert_eq!(tex.pixel(-3, 4), 3);
        assert_eq!(tex.pixel(16, 1), 0);
    }

    #[test]
    fn duplicate_gets_new_identity() {
        let tex = TextureData::new(8, 8, ColorFormat::Index);
        let copy = tex.clone();
        let dup = tex.duplicate();
        assert_eq!(copy.id(), tex.id());
        assert_ne!(dup.id(), tex.id());
        assert!(dup.is_identical(&tex));
    }

    #[test]
    fn to_direct_keeps_zero_transparent() {
        let mut pal = PaletteIndex::default();
        pal.set(1, 0x16);
        let mut tex = TextureData::new(2, 1, ColorFormat::Index);
        tex.set_pixel(1, 0, 1);
        tex.to_direct(&pal, 0);
        assert_eq!(tex.format(), ColorFormat::Direct);
        assert_eq!(tex.pixel(0, 0), 0);
        assert_eq!(tex.page_color(1, 0), crate::NES_PALETTE[0x16]);
    }
}
