//! Lighting configuration
//!
//! Loaded from TOML; every field has a default so partial files are valid.

use std::path::Path;

use image::Rgba;
use serde::{Deserialize, Serialize};

use crate::constants::display::{DEFAULT_INTERNAL_HEIGHT, DEFAULT_INTERNAL_WIDTH};
use crate::constants::lighting::{
    ANGLE_DEDUP_EPSILON, CORNER_PROBE_EPSILON, DEFAULT_AMBIENT, DEFAULT_KERNEL_CACHE_CAPACITY,
    DEFAULT_VISIBILITY_SAMPLES, MIN_VISIBILITY_SAMPLES,
};
use crate::constants::surface::MAX_SURFACE_DIMENSION;
use crate::error::{config_error, LightingResult};
use crate::surface::{Color, Filter};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LightingConfig {
    /// Resolution the scene and lightmap are rendered at
    pub internal_width: u32,
    pub internal_height: u32,
    /// RGBA ambient light
    pub ambient: [u8; 4],
    /// Falloff kernels kept alive between frames
    pub kernel_cache_capacity: usize,
    /// Evenly spaced rays per shadowed light
    pub visibility_samples: usize,
    /// Angular probe around each occluder corner (radians)
    pub corner_probe_epsilon: f32,
    pub cast_vertex_rays_against_all_occluders: bool,
    /// Filtering used when scaling to the viewport
    pub filter: Filter,
}

impl Default for LightingConfig {
    fn default() -> Self {
        Self {
            internal_width: DEFAULT_INTERNAL_WIDTH,
            internal_height: DEFAULT_INTERNAL_HEIGHT,
            ambient: DEFAULT_AMBIENT,
            kernel_cache_capacity: DEFAULT_KERNEL_CACHE_CAPACITY,
            visibility_samples: DEFAULT_VISIBILITY_SAMPLES,
            corner_probe_epsilon: CORNER_PROBE_EPSILON,
            cast_vertex_rays_against_all_occluders: false,
            filter: Filter::Linear,
        }
    }
}

impl LightingConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(source: &str) -> LightingResult<Self> {
        let config: LightingConfig = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML file
    pub fn load(path: impl AsRef<Path>) -> LightingResult<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&source)?;
        log::info!("[LightingConfig::load] Loaded lighting config from {}", path.display());
        Ok(config)
    }

    pub fn ambient_color(&self) -> Color {
        Rgba(self.ambient)
    }

    pub fn validate(&self) -> LightingResult<()> {
        for (field, value) in [
            ("internal_width", self.internal_width),
            ("internal_height", self.internal_height),
        ] {
            if value == 0 || value > MAX_SURFACE_DIMENSION {
                return Err(config_error(
                    field,
                    format!("must be in 1..={}, got {}", MAX_SURFACE_DIMENSION, value),
                ));
            }
        }
        if self.kernel_cache_capacity == 0 {
            return Err(config_error("kernel_cache_capacity", "must be at least 1"));
        }
        if self.visibility_samples < MIN_VISIBILITY_SAMPLES {
            return Err(config_error(
                "visibility_samples",
                format!("must be at least {}, got {}", MIN_VISIBILITY_SAMPLES, self.visibility_samples),
            ));
        }
        if !(self.corner_probe_epsilon > ANGLE_DEDUP_EPSILON && self.corner_probe_epsilon < 0.1) {
            return Err(config_error(
                "corner_probe_epsilon",
                format!(
                    "must be in ({}, 0.1), got {}",
                    ANGLE_DEDUP_EPSILON, self.corner_probe_epsilon
                ),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LightingError;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let config = LightingConfig::default();
        config.validate().unwrap();
        assert_eq!(config.visibility_samples, 256);
        assert_eq!(config.filter, Filter::Linear);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = LightingConfig::from_toml_str(
            r#"
            internal_width = 320
            internal_height = 180
            ambient = [128, 128, 128, 255]
            filter = "nearest"
            "#,
        )
        .unwrap();

        assert_eq!((config.internal_width, config.internal_height), (320, 180));
        assert_eq!(config.ambient_color(), Rgba([128, 128, 128, 255]));
        assert_eq!(config.filter, Filter::Nearest);
        assert_eq!(config.kernel_cache_capacity, DEFAULT_KERNEL_CACHE_CAPACITY);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let err = LightingConfig::from_toml_str("internal_width = 0").unwrap_err();
        assert!(matches!(err, LightingError::InvalidConfig { ref field, .. } if field == "internal_width"));

        let err = LightingConfig::from_toml_str("visibility_samples = 2").unwrap_err();
        assert!(matches!(err, LightingError::InvalidConfig { .. }));

        let err = LightingConfig::from_toml_str("corner_probe_epsilon = 0.0").unwrap_err();
        assert!(matches!(err, LightingError::InvalidConfig { .. }));

        let err = LightingConfig::from_toml_str("internal_width = \"wide\"").unwrap_err();
        assert!(matches!(err, LightingError::ConfigParse(_)));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "kernel_cache_capacity = 4").unwrap();

        let config = LightingConfig::load(file.path()).unwrap();
        assert_eq!(config.kernel_cache_capacity, 4);

        assert!(matches!(
            LightingConfig::load(file.path().with_extension("missing")),
            Err(LightingError::Io(_))
        ));
    }
}
