use std::error::Error;
use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use tilevox_atlas::{AtlasError, AtlasSettings};
use tilevox_model::{LayerSettings, ModelSettings};
use tilevox_runtime::PipelineSettings;
use tilevox_segment::{SegmentSettings, TrackSettings, VideoSettings};

fn default_reset_settle_ms() -> u64 {
    100
}

/// Engine configuration; every section and field is optional.
#[derive(Clone, Debug, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub video: VideoSettings,
    #[serde(default)]
    pub atlas: AtlasSettings,
    #[serde(default)]
    pub segment: SegmentSettings,
    #[serde(default)]
    pub model: ModelSettings,
    #[serde(default)]
    pub layers: LayerSettings,
    #[serde(default)]
    pub tracking: TrackSettings,
    /// Wait after a full reset or render-mode switch, in milliseconds.
    #[serde(default = "default_reset_settle_ms")]
    pub reset_settle_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            video: VideoSettings::default(),
            atlas: AtlasSettings::default(),
            segment: SegmentSettings::default(),
            model: ModelSettings::default(),
            layers: LayerSettings::default(),
            tracking: TrackSettings::default(),
            reset_settle_ms: default_reset_settle_ms(),
        }
    }
}

impl EngineConfig {
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, Box<dyn Error>> {
        let text = fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, Box<dyn Error>> {
        Ok(toml::from_str(text)?)
    }

    /// Atlas pages must hold the widest pattern texture the screen can produce.
    pub fn validate(&self) -> Result<(), AtlasError> {
        self.atlas.validate(self.video.largest_texture())
    }

    pub fn pipeline_settings(&self) -> PipelineSettings {
        PipelineSettings {
            video: self.video.clone(),
            segment: self.segment.clone(),
            model: self.model.clone(),
            layers: self.layers.clone(),
            tracking: self.tracking.clone(),
            reset_settle: Duration::from_millis(self.reset_settle_ms),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tilevox_model::{Layer, RenderMode};

    #[test]
    fn empty_file_gives_defaults() {
        let cfg = EngineConfig::from_toml_str("").unwrap();
        assert_eq!(cfg.video.width, 32);
        assert_eq!(cfg.atlas.page_size, 512);
        assert_eq!(cfg.segment.solid_min_tiles, 8);
        assert_eq!(cfg.reset_settle_ms, 100);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn sections_override_single_fields() {
        let cfg = EngineConfig::from_toml_str(
            r#"
            reset_settle_ms = 5

            [segment]
            big_width = 20

            [model]
            render_mode = "marching"

            [layers]
            default_bg = "l3"
            l1 = { offset = 4.0 }
            "#,
        )
        .unwrap();
        assert_eq!(cfg.segment.big_width, 20);
        assert_eq!(cfg.segment.big_height, 26);
        assert_eq!(cfg.model.render_mode, RenderMode::Marching);
        assert_eq!(cfg.layers.default_bg, Layer::L3);
        assert_eq!(cfg.layers.l1.offset, 4.0);
        assert_eq!(cfg.layers.l1.coef, 1.0);
        assert_eq!(cfg.pipeline_settings().reset_settle, Duration::from_millis(5));
    }

    #[test]
    fn undersized_pages_fail_validation() {
        let cfg = EngineConfig::from_toml_str("[atlas]\npage_size = 128\n").unwrap();
        assert!(matches!(
            cfg.validate(),
            Err(AtlasError::PageTooSmall { page_size: 128, required: 256 })
        ));
    }

    #[test]
    fn malformed_toml_is_an_error() {
        assert!(EngineConfig::from_toml_str("[video\nwidth = 3").is_err());
        assert!(EngineConfig::from_toml_str("[video]\nwidth = \"wide\"").is_err());
    }
}
