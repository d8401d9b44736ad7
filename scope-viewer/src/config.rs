use std::path::Path;

use anyhow::{Context, bail};
use serde::{Deserialize, Serialize};

/// Largest accepted canvas edge in pixels.
pub const MAX_DIMENSION: u32 = 16_384;

/// Historical sprite capacity of the viewer's particle layer.
pub const DEFAULT_MAX_SPRITES: usize = 200_000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    pub width: u32,
    pub height: u32,
    pub max_sprites: usize,
    /// Pixels per dataset unit before zoom.
    pub unit_scale: f32,
    /// Sprite radius in pixels.
    pub sprite_scale: f32,
    pub scale_extent: [f32; 2],
    /// Coalesce semantic rebinning into one pass per frame.
    pub deferred_rebin: bool,
    /// Number of datasets whose coordinates stay cached.
    pub coordinate_cache: usize,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
            max_sprites: DEFAULT_MAX_SPRITES,
            unit_scale: 10.0,
            sprite_scale: 2.5,
            scale_extent: [1.0, 8.0],
            deferred_rebin: false,
            coordinate_cache: 4,
        }
    }
}

impl ViewerConfig {
    /// Reads a JSON config. A missing file yields the defaults.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            log::info!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        Self::from_json(&content).with_context(|| format!("Invalid config {}", path.display()))
    }

    pub fn from_json(content: &str) -> anyhow::Result<Self> {
        let config: ViewerConfig = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.width == 0 || self.height == 0 {
            bail!("Viewer size must be non-zero, got {}x{}", self.width, self.height);
        }
        if self.width > MAX_DIMENSION || self.height > MAX_DIMENSION {
            bail!(
                "Viewer size {}x{} exceeds {MAX_DIMENSION} px per side",
                self.width,
                self.height
            );
        }
        if self.max_sprites == 0 {
            bail!("max_sprites must be at least 1");
        }
        if !(self.unit_scale.is_finite() && self.unit_scale > 0.0) {
            bail!("unit_scale must be positive, got {}", self.unit_scale);
        }
        let [lower, upper] = self.scale_extent;
        if !(lower > 0.0 && lower <= upper) {
            bail!("Invalid scale extent [{lower}, {upper}]");
        }
        Ok(())
    }

    pub fn center(&self) -> (f32, f32) {
        (self.width as f32 / 2.0, self.height as f32 / 2.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_fills_defaults() {
        let config = ViewerConfig::from_json(r#"{ "width": 400, "max_sprites": 10 }"#).unwrap();
        assert_eq!(config.width, 400);
        assert_eq!(config.height, 600);
        assert_eq!(config.max_sprites, 10);
        assert_eq!(config.scale_extent, [1.0, 8.0]);
    }

    #[test]
    fn rejects_inverted_extent() {
        let err = ViewerConfig::from_json(r#"{ "scale_extent": [4.0, 2.0] }"#).unwrap_err();
        assert!(err.to_string().contains("scale extent"));
    }

    #[test]
    fn rejects_oversized_canvas() {
        let err = ViewerConfig::from_json(r#"{ "width": 70000, "height": 70000 }"#).unwrap_err();
        assert!(err.to_string().contains("exceeds"));
        assert!(ViewerConfig::from_json(r#"{ "width": 16384, "height": 16384 }"#).is_ok());
    }

    #[test]
    fn missing_file_is_default() {
        let config = ViewerConfig::load("/definitely/not/here/scope.json").unwrap();
        assert_eq!(config, ViewerConfig::default());
    }
}
