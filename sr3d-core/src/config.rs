/// Renderer configuration
///
/// Settings can be serialized to and loaded from RON files. Every field has a
/// default, so a config file only needs the values it changes.
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Lighting and shadow-test parameters for the camera pass
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ShadingConfig {
    /// Constant added to every channel
    pub ambient: f32,
    /// Weight of the Lambert term
    pub diffuse: f32,
    /// Weight of the Phong specular term
    pub specular: f32,
    /// Depth slack (in depth units) before a fragment counts as occluded
    pub shadow_bias: f32,
    /// Light factor applied to occluded fragments
    pub shadowed_factor: f32,
    /// Phong exponent for meshes without a specular map
    pub default_specular_exponent: f32,
}

impl Default for ShadingConfig {
    fn default() -> Self {
        Self {
            ambient: 20.0,
            diffuse: 0.8,
            specular: 0.3,
            shadow_bias: 43.34,
            shadowed_factor: 0.3,
            default_specular_exponent: 10.0,
        }
    }
}

/// Resolution, viewport and shading settings for a [`Renderer`](crate::Renderer)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RenderConfig {
    pub width: usize,
    pub height: usize,
    /// Fraction of the image left empty on each side of the viewport
    pub viewport_margin: f32,
    /// Clear color when the scene has no background image
    pub background: [u8; 3],
    /// Run the light pass and apply the shadow test
    pub shadows: bool,
    pub shading: ShadingConfig,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 800,
            height: 800,
            viewport_margin: 0.125,
            background: [30, 30, 36],
            shadows: true,
            shading: ShadingConfig::default(),
        }
    }
}

impl RenderConfig {
    pub fn with_size(mut self, width: usize, height: usize) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn from_ron(text: &str) -> Result<Self, ConfigError> {
        Ok(ron::from_str(text)?)
    }

    pub fn to_ron(&self) -> Result<String, ConfigError> {
        Ok(ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_ron(&text)?;
        tracing::info!("render config loaded from {}", path.display());
        Ok(config)
    }

    /// Pixel rectangle `(x, y, width, height)` the unit cube maps onto
    pub fn viewport_rect(&self) -> (f32, f32, f32, f32) {
        let (w, h) = (self.width as f32, self.height as f32);
        let margin = self.viewport_margin.clamp(0.0, 0.49);
        (w * margin, h * margin, w * (1.0 - 2.0 * margin), h * (1.0 - 2.0 * margin))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ron_round_trip() {
        let mut config = RenderConfig::default().with_size(320, 240);
        config.shading.shadow_bias = 5.0;
        config.shadows = false;

        let text = config.to_ron().unwrap();
        assert_eq!(RenderConfig::from_ron(&text).unwrap(), config);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config = RenderConfig::from_ron("(width: 64, shading: (ambient: 0.0))").unwrap();
        assert_eq!(config.width, 64);
        assert_eq!(config.height, 800);
        assert_eq!(config.shading.ambient, 0.0);
        assert_eq!(config.shading.shadow_bias, 43.34);
    }

    #[test]
    fn test_invalid_config() {
        assert!(matches!(
            RenderConfig::from_ron("(width: \"wide\")"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_load_missing_file() {
        assert!(matches!(
            RenderConfig::load("/no/such/config.ron"),
            Err(ConfigError::Io { .. })
        ));
    }

    #[test]
    fn test_viewport_rect() {
        let config = RenderConfig::default().with_size(800, 400);
        assert_eq!(config.viewport_rect(), (100.0, 50.0, 600.0, 300.0));
    }
}
