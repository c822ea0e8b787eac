//! Configuration management for Gamepad GW
//!
//! Handles loading the YAML configuration file. A missing file is not an
//! error; everything has a workable default and the operator can adjust
//! the rest from the REPL.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub midi: MidiConfig,
    #[serde(default)]
    pub polling: PollingConfig,
    /// Avatar scene YAML to load at startup; the bundled sample scene is
    /// used when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scene: Option<PathBuf>,
    /// Directory for preset export/import; platform data dir when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub presets_dir: Option<PathBuf>,
}

/// MIDI output configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct MidiConfig {
    /// Output port to connect at startup (substring match); none means
    /// start idle until the operator selects one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_port: Option<String>,
}

/// Polling cadence configuration
#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct PollingConfig {
    #[serde(default = "default_tick_hz")]
    pub tick_hz: u32,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self { tick_hz: default_tick_hz() }
    }
}

impl AppConfig {
    /// Load configuration from file; a missing file yields the defaults
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: AppConfig = serde_yaml::from_str(&contents)
            .with_context(|| format!("Failed to parse YAML config: {}", path.display()))?;

        Ok(config)
    }
}

// Default value functions
fn default_tick_hz() -> u32 {
    60
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.polling.tick_hz, 60);
        assert!(config.midi.output_port.is_none());
        assert!(config.scene.is_none());
    }

    #[test]
    fn test_parse_full_config() {
        let yaml = r#"
midi:
  output_port: "loopMIDI"
polling:
  tick_hz: 120
scene: scenes/sample.yaml
presets_dir: /tmp/presets
"#;
        let config: AppConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.midi.output_port.as_deref(), Some("loopMIDI"));
        assert_eq!(config.polling.tick_hz, 120);
        assert_eq!(config.scene.as_deref(), Some(Path::new("scenes/sample.yaml")));
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let config: AppConfig = serde_yaml::from_str("midi:\n  output_port: foo\n").unwrap();
        assert_eq!(config.polling.tick_hz, 60);
        assert_eq!(config.midi.output_port.as_deref(), Some("foo"));
    }
}
