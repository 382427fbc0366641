//! Engine configuration.
//!
//! ```toml
//! target_fps = 60
//! logic_tick_rate = 30
//! dynamic_light_capacity = 384
//! present_interval = 1
//!
//! [[preload_shaders]]
//! program_id = 0x01045045
//! raytrace = true
//! filter = "linear"
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tickframe_shared::constants::{DEFAULT_TARGET_FPS, LOGIC_TICK_RATE, MAX_DYNAMIC_LIGHTS};
use tracing::debug;

use crate::error::{RenderError, RenderResult};
use crate::interpolator::FrameSchedule;
use crate::shader::ShaderPreload;

/// Engine settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Output frames per second.
    pub target_fps: u32,
    /// Logic ticks per second.
    pub logic_tick_rate: u32,
    /// Dynamic lights allowed per tick.
    pub dynamic_light_capacity: usize,
    /// Present interval handed to the backend.
    pub present_interval: u32,
    /// Shader variants created at startup.
    pub preload_shaders: Vec<ShaderPreload>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            target_fps: DEFAULT_TARGET_FPS,
            logic_tick_rate: LOGIC_TICK_RATE,
            dynamic_light_capacity: MAX_DYNAMIC_LIGHTS,
            present_interval: 1,
            preload_shaders: Vec::new(),
        }
    }
}

impl EngineConfig {
    /// Parses and validates a TOML configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is malformed or the values are invalid.
    pub fn from_toml_str(text: &str) -> RenderResult<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML configuration file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, is malformed, or holds
    /// invalid values.
    pub fn from_file(path: impl AsRef<Path>) -> RenderResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&text)?;
        debug!(path = %path.display(), target_fps = config.target_fps, "loaded engine config");
        Ok(config)
    }

    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::InvalidConfig`] naming the first bad value.
    pub fn validate(&self) -> RenderResult<()> {
        if self.logic_tick_rate == 0 {
            return Err(RenderError::InvalidConfig("logic_tick_rate must be positive".into()));
        }
        if self.target_fps < self.logic_tick_rate {
            return Err(RenderError::InvalidConfig(format!(
                "target_fps {} is below logic_tick_rate {}",
                self.target_fps, self.logic_tick_rate
            )));
        }
        if self.dynamic_light_capacity > MAX_DYNAMIC_LIGHTS {
            return Err(RenderError::InvalidConfig(format!(
                "dynamic_light_capacity {} exceeds {MAX_DYNAMIC_LIGHTS}",
                self.dynamic_light_capacity
            )));
        }
        Ok(())
    }

    /// Sub-frame schedule implied by the rates.
    #[must_use]
    pub fn schedule(&self) -> FrameSchedule {
        FrameSchedule::new(self.target_fps, self.logic_tick_rate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::texture::Filter;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.target_fps, 30);
        assert_eq!(config.dynamic_light_capacity, 384);
        assert_eq!(config.schedule().count(), 1);
        config.validate().unwrap();
    }

    #[test]
    fn test_parse_partial_document() {
        let text = r#"
            target_fps = 90

            [[preload_shaders]]
            program_id = 17
            raytrace = true
            filter = "linear"
        "#;
        let config = EngineConfig::from_toml_str(text).unwrap();
        assert_eq!(config.target_fps, 90);
        assert_eq!(config.logic_tick_rate, 30);
        assert_eq!(config.schedule().count(), 3);
        assert_eq!(config.preload_shaders.len(), 1);
        let preload = config.preload_shaders[0];
        assert_eq!(preload.program_id, 17);
        assert!(preload.params.raytrace);
        assert_eq!(preload.params.filter, Filter::Linear);
        assert!(!preload.params.normal_map);
    }

    #[test]
    fn test_validation() {
        assert!(matches!(
            EngineConfig::from_toml_str("logic_tick_rate = 0"),
            Err(RenderError::InvalidConfig(_))
        ));
        assert!(matches!(
            EngineConfig::from_toml_str("target_fps = 20"),
            Err(RenderError::InvalidConfig(_))
        ));
        assert!(matches!(
            EngineConfig::from_toml_str("dynamic_light_capacity = 500"),
            Err(RenderError::InvalidConfig(_))
        ));
        assert!(matches!(EngineConfig::from_toml_str("target_fps = \"fast\""), Err(RenderError::Parse(_))));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let result = EngineConfig::from_file("/nonexistent/tickframe.toml");
        assert!(matches!(result, Err(RenderError::Io(_))));
    }
}
