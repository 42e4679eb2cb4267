//! Frame loop settings
//!
//! Read from the `[loop]` table of a TOML file; every field is optional.
//!
//! ```toml
//! [loop]
//! fixed_timestep_hz = 50.0
//! max_frame_time = 0.1
//! max_fixed_steps_per_frame = 4
//! ```

use cadence_core::{CadenceError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoopConfig {
    #[serde(default = "default_fixed_timestep_hz")]
    pub fixed_timestep_hz: f64,
    /// Seconds; longer frames are clamped to this
    #[serde(default = "default_max_frame_time")]
    pub max_frame_time: f64,
    /// Fixed steps beyond this in one frame are dropped
    #[serde(default = "default_max_fixed_steps")]
    pub max_fixed_steps_per_frame: u32,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            fixed_timestep_hz: default_fixed_timestep_hz(),
            max_frame_time: default_max_frame_time(),
            max_fixed_steps_per_frame: default_max_fixed_steps(),
        }
    }
}

fn default_fixed_timestep_hz() -> f64 {
    60.0
}
fn default_max_frame_time() -> f64 {
    0.25
}
fn default_max_fixed_steps() -> u32 {
    8
}

/// File layout holding the `[loop]` table next to anything else
#[derive(Debug, Default, Deserialize)]
struct LoopConfigFile {
    #[serde(default, rename = "loop")]
    frame_loop: Option<LoopConfig>,
}

impl LoopConfig {
    /// Parse the `[loop]` table; a document without one yields the defaults
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let file: LoopConfigFile = toml::from_str(content)?;
        let config = file.frame_loop.unwrap_or_default();
        config.validate()?;
        Ok(config)
    }

    pub fn load_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content).map_err(|e| {
            CadenceError::TomlParseError(format!(
                "Failed to read loop config {}: {}",
                path.display(),
                e
            ))
        })
    }

    /// Fixed step length in seconds
    pub fn fixed_timestep(&self) -> f64 {
        1.0 / self.fixed_timestep_hz
    }

    fn validate(&self) -> Result<()> {
        if !self.fixed_timestep_hz.is_finite() || self.fixed_timestep_hz <= 0.0 {
            return Err(CadenceError::TomlParseError(format!(
                "fixed_timestep_hz must be positive, got {}",
                self.fixed_timestep_hz
            )));
        }
        if self.max_frame_time.is_nan() || self.max_frame_time <= 0.0 {
            return Err(CadenceError::TomlParseError(format!(
                "max_frame_time must be positive, got {}",
                self.max_frame_time
            )));
        }
        Ok(())
    }
}
