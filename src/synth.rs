//! Deterministic tile scenes standing in for a video source.

use tilevox_atlas::PaletteIndex;
use tilevox_geom::IVec2;
use tilevox_segment::{TileRecord, VideoSettings};
use tilevox_tiles::RawTile;

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, clap::ValueEnum)]
pub enum Scene {
    /// Static level with platforms, a walking hero and a score counter.
    #[default]
    Platformer,
    /// Level scrolling one pixel per frame under a fixed hero.
    Scroller,
    /// A ground strip and a swarm of small sprites.
    Swarm,
}

/// One frame as a video source delivers it.
#[derive(Clone, Debug)]
pub struct SourceFrame {
    pub tiles: Vec<TileRecord>,
    pub palette: PaletteIndex,
    pub mask: IVec2,
}

const PALETTE: [u8; 32] = [
    0x22, 0x29, 0x1A, 0x0F, 0x22, 0x36, 0x17, 0x0F, 0x22, 0x30, 0x21, 0x0F, 0x22, 0x27, 0x17, 0x0F,
    0x22, 0x16, 0x27, 0x18, 0x22, 0x1A, 0x30, 0x27, 0x22, 0x16, 0x30, 0x27, 0x22, 0x0F, 0x36, 0x17,
];

/// Digit glyphs, five rows of three bits.
const DIGITS: [[u8; 5]; 10] = [
    [0b111, 0b101, 0b101, 0b101, 0b111],
    [0b010, 0b110, 0b010, 0b010, 0b111],
    [0b111, 0b001, 0b111, 0b100, 0b111],
    [0b111, 0b001, 0b111, 0b001, 0b111],
    [0b101, 0b101, 0b111, 0b001, 0b001],
    [0b111, 0b100, 0b111, 0b001, 0b111],
    [0b111, 0b100, 0b111, 0b101, 0b111],
    [0b111, 0b001, 0b010, 0b010, 0b010],
    [0b111, 0b101, 0b111, 0b101, 0b111],
    [0b111, 0b101, 0b111, 0b001, 0b111],
];

/// Tile from eight rows of `.123` characters.
fn tile(rows: [&str; 8]) -> RawTile {
    let mut px = [0u8; 64];
    for (y, row) in rows.iter().enumerate() {
        for (x, c) in row.bytes().take(8).enumerate() {
            px[y * 8 + x] = c.saturating_sub(b'0').min(3);
        }
    }
    RawTile::from_pixels(&px, false, false)
}

fn digit(d: usize) -> RawTile {
    let mut px = [0u8; 64];
    for (y, bits) in DIGITS[d % 10].iter().enumerate() {
        for x in 0..3 {
            if bits & (0b100 >> x) != 0 {
                px[(y + 1) * 8 + x + 2] = 3;
            }
        }
    }
    RawTile::from_pixels(&px, false, false)
}

fn with_flip(raw: RawTile, flip_x: bool) -> RawTile {
    RawTile::new(raw.low, raw.high, flip_x, false)
}

struct TileSet {
    grass: RawTile,
    ground: RawTile,
    brick: RawTile,
    cloud_left: RawTile,
    cloud_right: RawTile,
    coin: RawTile,
    hero: [RawTile; 4],
    digits: [RawTile; 10],
}

impl TileSet {
    fn new() -> Self {
        Self {
            grass: tile([
                "22222222", "21222122", "11111111", "11111111", "11111111", "11111111",
                "11111111", "11111111",
            ]),
            ground: tile([
                "11111111", "11111111", "11131111", "11111111", "11111111", "11111131",
                "11111111", "11111111",
            ]),
            brick: tile([
                "33331333", "33331333", "33331333", "11111111", "13333333", "13333333",
                "13333333", "11111111",
            ]),
            cloud_left: tile([
                "........", "....1111", "..111111", ".1111111", "11111111", "11111111",
                ".1111111", "........",
            ]),
            cloud_right: tile([
                "........", "1111....", "111111..", "1111111.", "11111111", "11111111",
                "1111111.", "........",
            ]),
            coin: tile([
                "........", "...22...", "..2332..", "..2332..", "..2332..", "..2332..",
                "...22...", "........",
            ]),
            hero: [
                tile([
                    "....1111", "...11111", "...22232", "..222322", "..222233", "....2222",
                    "...11311", "..111311",
                ]),
                tile([
                    "1.......", "1111....", "2.......", "22......", "222.....", "22......",
                    "1.......", "11......",
                ]),
                tile([
                    ".1111333", ".2213313", ".2233333", "..333333", "..333.33", "..111...",
                    ".1111...", ".1111...",
                ]),
                tile([
                    "3111....", "31122...", "33322...", "333.....", "333.....", "111.....",
                    "1111....", "1111....",
                ]),
            ],
            digits: std::array::from_fn(digit),
        }
    }
}

/// Endless sequence of frames of one scene.
pub struct SyntheticSource {
    scene: Scene,
    width: i32,
    height: i32,
    frame: u64,
    tiles: TileSet,
}

impl SyntheticSource {
    pub fn new(scene: Scene, video: &VideoSettings) -> Self {
        Self {
            scene,
            width: video.width,
            height: video.height,
            frame: 0,
            tiles: TileSet::new(),
        }
    }

    #[inline]
    pub fn scene(&self) -> Scene {
        self.scene
    }

    pub fn next_frame(&mut self) -> SourceFrame {
        let frame = self.frame;
        self.frame += 1;
        let mut out = Vec::with_capacity((self.width * self.height) as usize / 2);
        let mask = match self.scene {
            Scene::Platformer => {
                self.platformer(frame, &mut out);
                IVec2::ZERO
            }
            Scene::Scroller => {
                self.scroller(frame, &mut out);
                IVec2::new(8, 0)
            }
            Scene::Swarm => {
                self.swarm(frame, &mut out);
                IVec2::ZERO
            }
        };
        SourceFrame {
            tiles: out,
            palette: PaletteIndex(PALETTE),
            mask,
        }
    }

    fn bg(out: &mut Vec<TileRecord>, x: i32, y: i32, raw: RawTile, palette: u8) {
        out.push(TileRecord {
            x,
            y,
            raw,
            palette,
            background: true,
            hidden: false,
        });
    }

    fn sprite(out: &mut Vec<TileRecord>, x: i32, y: i32, raw: RawTile, palette: u8) {
        out.push(TileRecord {
            x,
            y,
            raw,
            palette,
            background: false,
            hidden: false,
        });
    }

    fn ground(&self, out: &mut Vec<TileRecord>, scroll: i32) {
        let fine = scroll & 7;
        for row in self.height - 3..self.height {
            let raw = if row == self.height - 3 {
                self.tiles.grass
            } else {
                self.tiles.ground
            };
            for col in 0..=self.width {
                let x = col * 8 - fine;
                if x < self.width * 8 {
                    Self::bg(out, x, row * 8, raw, 0);
                }
            }
        }
    }

    fn score(&self, out: &mut Vec<TileRecord>, value: u64) {
        let mut v = value;
        for i in (0..6).rev() {
            Self::bg(out, (2 + i) * 8, 8, self.tiles.digits[(v % 10) as usize], 3);
            v /= 10;
        }
    }

    /// 2x2 hero at pixel (x, y), mirrored when walking left.
    fn hero(&self, out: &mut Vec<TileRecord>, x: i32, y: i32, left: bool) {
        for (i, raw) in self.tiles.hero.iter().enumerate() {
            let col = (i % 2) as i32;
            let col = if left { 1 - col } else { col };
            let row = (i / 2) as i32;
            Self::sprite(out, x + col * 8, y + row * 8, with_flip(*raw, left), 0);
        }
    }

    fn platformer(&self, frame: u64, out: &mut Vec<TileRecord>) {
        self.score(out, frame / 4 * 10);
        for (x, y) in [(4, 5), (20, 6)] {
            Self::bg(out, x * 8, y * 8, self.tiles.cloud_left, 2);
            Self::bg(out, (x + 1) * 8, y * 8, self.tiles.cloud_right, 2);
        }
        for (start, len, row) in [(6, 5, 20), (18, 6, 16)] {
            for col in start..start + len {
                Self::bg(out, col * 8, row * 8, self.tiles.brick, 1);
            }
        }
        self.ground(out, 0);

        let span = 160;
        let step = (frame % (2 * span as u64)) as i32;
        let (x, left) = if step < span {
            (16 + step, false)
        } else {
            (16 + 2 * span - step, true)
        };
        self.hero(out, x, (self.height - 3) * 8 - 16, left);
        let bob = ((frame / 8) % 4) as i32;
        Self::sprite(out, 60, 140 + bob, self.tiles.coin, 1);
    }

    fn scroller(&self, frame: u64, out: &mut Vec<TileRecord>) {
        let scroll = frame as i32;
        let fine = scroll & 7;
        let first = scroll >> 3;
        self.score(out, 0);
        for col in 0..=self.width {
            let x = col * 8 - fine;
            if x >= self.width * 8 {
                continue;
            }
            let world = first + col;
            // pipes two tiles wide every sixteen columns, growing with the column index
            if world % 16 < 2 {
                let height = 2 + (world / 16) % 3;
                for row in self.height - 3 - height..self.height - 3 {
                    Self::bg(out, x, row * 8, self.tiles.brick, 1);
                }
            }
            if world % 24 == 7 {
                Self::bg(out, x, 48, self.tiles.cloud_left, 2);
            } else if world % 24 == 8 {
                Self::bg(out, x, 48, self.tiles.cloud_right, 2);
            }
        }
        self.ground(out, scroll);
        self.hero(out, 120, (self.height - 3) * 8 - 16, false);
    }

    fn swarm(&self, frame: u64, out: &mut Vec<TileRecord>) {
        self.ground(out, 0);
        let t = frame as f32 / 30.0;
        for i in 0..16 {
            let a = t + i as f32 * std::f32::consts::TAU / 16.0;
            let x = 124.0 + a.cos() * (40.0 + (i % 4) as f32 * 12.0);
            let y = 100.0 + a.sin() * 50.0;
            Self::sprite(out, x as i32, y as i32, self.tiles.coin, (i % 4) as u8);
        }
    }
}

impl Iterator for SyntheticSource {
    type Item = SourceFrame;

    fn next(&mut self) -> Option<SourceFrame> {
        Some(self.next_frame())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tilevox_tiles::CanonicalTile;

    #[test]
    fn digits_are_glyph_tiles() {
        for d in 0..10 {
            assert!(CanonicalTile::analyze(digit(d)).is_char(), "digit {d}");
        }
    }

    #[test]
    fn frames_are_deterministic() {
        let video = VideoSettings::default();
        for scene in [Scene::Platformer, Scene::Scroller, Scene::Swarm] {
            let a: Vec<_> = SyntheticSource::new(scene, &video).take(5).collect();
            let b: Vec<_> = SyntheticSource::new(scene, &video).take(5).collect();
            for (fa, fb) in a.iter().zip(&b) {
                assert_eq!(fa.tiles.len(), fb.tiles.len());
                let same = fa
                    .tiles
                    .iter()
                    .zip(&fb.tiles)
                    .all(|(x, y)| x.raw == y.raw && x.x == y.x && x.y == y.y);
                assert!(same);
            }
        }
    }

    #[test]
    fn scrolled_tiles_stay_on_screen() {
        let video = VideoSettings::default();
        let mut source = SyntheticSource::new(Scene::Scroller, &video);
        for _ in 0..20 {
            let frame = source.next_frame();
            assert!(frame.tiles.iter().all(|t| t.x > -8 && t.x < video.width_px()));
        }
    }
}
