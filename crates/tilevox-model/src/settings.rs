use serde::Deserialize;
use tilevox_mesh_cpu::GreedyColoring;

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderMode {
    #[default]
    Greedy,
    Marching,
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorMode {
    #[default]
    Atlas,
    Palette,
}

impl From<ColorMode> for GreedyColoring {
    fn from(mode: ColorMode) -> Self {
        match mode {
            ColorMode::Atlas => GreedyColoring::Atlas,
            ColorMode::Palette => GreedyColoring::Palette,
        }
    }
}

fn default_max_depth() -> i32 {
    crate::MAX_DEPTH
}
fn default_true() -> bool {
    true
}

/// `[model]` section of the engine config.
#[derive(Clone, Debug, Deserialize)]
pub struct ModelSettings {
    #[serde(default)]
    pub render_mode: RenderMode,
    #[serde(default = "default_max_depth")]
    pub max_depth: i32,
    #[serde(default)]
    pub greedy_coloring: ColorMode,
    /// Mesh the tiles of one model on the rayon pool.
    #[serde(default = "default_true")]
    pub parallel_mesh: bool,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            render_mode: RenderMode::default(),
            max_depth: default_max_depth(),
            greedy_coloring: ColorMode::default(),
            parallel_mesh: true,
        }
    }
}

/// Depth band a model is drawn in.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Layer {
    #[default]
    Unidentified,
    Ui,
    L1,
    L2,
    L3,
    L4,
}

/// Z placement of one layer: `offset` plus `coef` times half the model depth.
#[derive(Copy, Clone, Debug, PartialEq, Deserialize)]
pub struct LayerSlot {
    pub offset: f32,
    #[serde(default = "default_coef")]
    pub coef: f32,
}

fn default_coef() -> f32 {
    1.0
}

impl LayerSlot {
    pub const fn new(offset: f32, coef: f32) -> Self {
        Self { offset, coef }
    }
}

fn default_bg_layer() -> Layer {
    Layer::L2
}
fn default_frames() -> u32 {
    30
}
fn default_ui() -> LayerSlot {
    LayerSlot::new(32.0, 1.0)
}
fn default_l1() -> LayerSlot {
    LayerSlot::new(0.0, 1.0)
}
fn default_l2() -> LayerSlot {
    LayerSlot::new(-32.0, 1.0)
}
fn default_l3() -> LayerSlot {
    LayerSlot::new(-64.0, 1.0)
}
fn default_l4() -> LayerSlot {
    LayerSlot::new(-96.0, 1.0)
}

/// `[layers]` section of the engine config.
#[derive(Clone, Debug, Deserialize)]
pub struct LayerSettings {
    /// Move background patterns between layers from sprite contact/overlap history.
    #[serde(default = "default_true")]
    pub auto: bool,
    /// Layer of background models whose layer is still unidentified.
    #[serde(default = "default_bg_layer")]
    pub default_bg: Layer,
    #[serde(default = "default_frames")]
    pub contact_frames: u32,
    #[serde(default = "default_frames")]
    pub overlap_frames: u32,
    #[serde(default = "default_ui")]
    pub ui: LayerSlot,
    #[serde(default = "default_l1")]
    pub l1: LayerSlot,
    #[serde(default = "default_l2")]
    pub l2: LayerSlot,
    #[serde(default = "default_l3")]
    pub l3: LayerSlot,
    #[serde(default = "default_l4")]
    pub l4: LayerSlot,
}

impl Default for LayerSettings {
    fn default() -> Self {
        Self {
            auto: true,
            default_bg: default_bg_layer(),
            contact_frames: default_frames(),
            overlap_frames: default_frames(),
            ui: default_ui(),
            l1: default_l1(),
            l2: default_l2(),
            l3: default_l3(),
            l4: default_l4(),
        }
    }
}

impl LayerSettings {
    /// Layer actually used for drawing: unidentified background goes to `default_bg`,
    /// unidentified sprites to L1.
    pub fn resolve(&self, layer: Layer, background: bool) -> Layer {
        match layer {
            Layer::Unidentified if background => self.default_bg,
            Layer::Unidentified => Layer::L1,
            other => other,
        }
    }

    pub fn slot(&self, layer: Layer) -> LayerSlot {
        match layer {
            Layer::Ui => self.ui,
            Layer::L1 | Layer::Unidentified => self.l1,
            Layer::L2 => self.l2,
            Layer::L3 => self.l3,
            Layer::L4 => self.l4,
        }
    }
}
