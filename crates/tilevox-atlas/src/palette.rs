/// 8-bit RGBA color.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const TRANSPARENT: Rgba = Rgba::new(0, 0, 0, 0);

    #[inline]
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Opaque color from a `0xRRGGBB` literal.
    #[inline]
    pub const fn from_rgb_hex(hex: u32) -> Self {
        Self::new((hex >> 16) as u8, (hex >> 8) as u8, hex as u8, 0xFF)
    }

    /// Packs as `0xRRGGBBAA`, the storage of direct-format textures.
    #[inline]
    pub const fn to_u32(self) -> u32 {
        ((self.r as u32) << 24) | ((self.g as u32) << 16) | ((self.b as u32) << 8) | self.a as u32
    }

    #[inline]
    pub const fn from_u32(v: u32) -> Self {
        Self::new((v >> 24) as u8, (v >> 16) as u8, (v >> 8) as u8, v as u8)
    }

    #[inline]
    pub fn to_bytes(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

const NES_RGB: [u32; 64] = [
    0x788084, 0x0000FC, 0x0000C4, 0x4028C4, 0x94008C, 0xAC0028, 0xAC1000, 0x8C1800, //
    0x503000, 0x007800, 0x006800, 0x005800, 0x004058, 0x000000, 0x000000, 0x000000, //
    0xBCC0C4, 0x0078FC, 0x0088FC, 0x6848FC, 0xDC00D4, 0xE40060, 0xFC3800, 0xE46018, //
    0xAC8000, 0x00B800, 0x00A800, 0x00A848, 0x008894, 0x2C2C2C, 0x000000, 0x000000, //
    0xFCF8FC, 0x38C0FC, 0x6888FC, 0x9C78FC, 0xFC78FC, 0xFC589C, 0xFC7858, 0xFCA048, //
    0xFCB800, 0xBCF818, 0x58D858, 0x58F89C, 0x00E8E4, 0x606060, 0x000000, 0x000000, //
    0xFCF8FC, 0xA4E8FC, 0xBCB8FC, 0xDCB8FC, 0xFCB8FC, 0xF4C0E0, 0xF4D0B4, 0xFCE0B4, //
    0xFCD884, 0xDCF878, 0xB8F878, 0xB0F0D8, 0x00F8FC, 0xC8C0C0, 0x000000, 0x000000, //
];

const fn build_nes_palette() -> [Rgba; 64] {
    let mut out = [Rgba::TRANSPARENT; 64];
    let mut i = 0;
    while i < 64 {
        out[i] = Rgba::from_rgb_hex(NES_RGB[i]);
        i += 1;
    }
    out
}

/// The 64-color master palette of the console.
pub const NES_PALETTE: [Rgba; 64] = build_nes_palette();

/// The 32 palette RAM entries of a frame: 8 groups of 4 master-palette indices.
/// Entry 0 of every group reads as the shared backdrop color.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct PaletteIndex(pub [u8; 32]);

impl PaletteIndex {
    #[inline]
    pub fn get(&self, index: usize) -> u8 {
        self.0[index & 31]
    }

    #[inline]
    pub fn set(&mut self, index: usize, value: u8) {
        self.0[index & 31] = value;
    }

    /// Color of entry `index` (`group * 4 + color`).
    pub fn to_rgba(&self, index: usize) -> Rgba {
        let entry = if index & 3 == 0 { self.0[0] } else { self.get(index) };
        NES_PALETTE[(entry & 63) as usize]
    }

    /// Color of `color` (0..=3) in palette `group` (0..=7).
    #[inline]
    pub fn group_color(&self, group: u8, color: u8) -> Rgba {
        self.to_rgba(group as usize * 4 + (color & 3) as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backdrop_shared_by_every_group() {
        let mut pal = PaletteIndex::default();
        pal.set(0, 0x21);
        pal.set(4, 0x05);
        pal.set(5, 0x16);
        assert_eq!(pal.group_color(1, 0), NES_PALETTE[0x21]);
        assert_eq!(pal.group_color(1, 1), NES_PALETTE[0x16]);
    }

    #[test]
    fn packed_round_trip() {
        let c = Rgba::new(1, 2, 3, 4);
        assert_eq!(Rgba::from_u32(c.to_u32()), c);
        assert_eq!(NES_PALETTE[1], Rgba::new(0, 0, 0xFC, 0xFF));
    }
}
