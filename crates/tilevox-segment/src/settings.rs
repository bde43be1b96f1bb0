use serde::Deserialize;

fn default_width() -> i32 {
    32
}
fn default_height() -> i32 {
    30
}
fn default_sprite_count() -> usize {
    64
}
fn default_fps() -> u32 {
    60
}

/// `[video]` section: dimensions of the tile source.
#[derive(Clone, Debug, Deserialize)]
pub struct VideoSettings {
    /// Visible width in tiles.
    #[serde(default = "default_width")]
    pub width: i32,
    #[serde(default = "default_height")]
    pub height: i32,
    #[serde(default = "default_sprite_count")]
    pub sprite_count: usize,
    #[serde(default = "default_fps")]
    pub fps: u32,
}

impl Default for VideoSettings {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
            sprite_count: default_sprite_count(),
            fps: default_fps(),
        }
    }
}

impl VideoSettings {
    #[inline]
    pub fn width_px(&self) -> i32 {
        self.width * 8
    }

    #[inline]
    pub fn height_px(&self) -> i32 {
        self.height * 8
    }

    /// Longest side, in pixels, of any texture a shape on this screen can produce.
    pub fn largest_texture(&self) -> i32 {
        self.width_px().max(self.height_px())
    }
}

fn default_solid_min_tiles() -> usize {
    8
}
fn default_solid_min_distinct() -> usize {
    2
}
fn default_big_width() -> i32 {
    28
}
fn default_big_height() -> i32 {
    26
}

/// `[segment]` section: acceptance thresholds of speculative background shapes.
#[derive(Clone, Debug, Deserialize)]
pub struct SegmentSettings {
    #[serde(default = "default_solid_min_tiles")]
    pub solid_min_tiles: usize,
    #[serde(default = "default_solid_min_distinct")]
    pub solid_min_distinct: usize,
    /// A shape at least this many tiles wide counts as big.
    #[serde(default = "default_big_width")]
    pub big_width: i32,
    #[serde(default = "default_big_height")]
    pub big_height: i32,
}

impl Default for SegmentSettings {
    fn default() -> Self {
        Self {
            solid_min_tiles: default_solid_min_tiles(),
            solid_min_distinct: default_solid_min_distinct(),
            big_width: default_big_width(),
            big_height: default_big_height(),
        }
    }
}

fn default_bg_threshold() -> f32 {
    50.0
}
fn default_fg_threshold() -> f32 {
    6.0
}

/// `[tracking]` section. Thresholds are squared distances.
#[derive(Clone, Debug, Deserialize)]
pub struct TrackSettings {
    #[serde(default = "default_bg_threshold")]
    pub bg_threshold: f32,
    #[serde(default = "default_fg_threshold")]
    pub fg_threshold: f32,
}

impl Default for TrackSettings {
    fn default() -> Self {
        Self {
            bg_threshold: default_bg_threshold(),
            fg_threshold: default_fg_threshold(),
        }
    }
}
