//! Declarative avatar scene tables
//!
//! A scene names the expressions and gestures its avatar understands and
//! optionally assigns default actions to button indices. The gateway only
//! consults these tables to route button events; all animation timing
//! lives in the avatar consumer.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Reserved action name that maps to the consumer's reset-all entrypoint
pub const RESET_ACTION: &str = "reset";

/// Descriptive entry for one expression or gesture
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ActionInfo {
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// One avatar scene: its action vocabulary and default button assignments
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SceneConfig {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Facial expressions, keyed by action name
    #[serde(default)]
    pub expressions: BTreeMap<String, ActionInfo>,

    /// Gesture animations, keyed by action name
    #[serde(default)]
    pub gestures: BTreeMap<String, ActionInfo>,

    /// Default button index → action name assignments
    #[serde(default)]
    pub buttons: BTreeMap<usize, String>,
}

impl SceneConfig {
    /// Load a scene from a YAML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read scene file: {}", path.display()))?;
        serde_yaml::from_str(&contents)
            .with_context(|| format!("Failed to parse scene YAML: {}", path.display()))
    }

    /// The bundled sample scene
    pub fn sample() -> Self {
        serde_yaml::from_str(include_str!("../scenes/sample.yaml"))
            .expect("bundled sample scene must parse")
    }

    /// Whether `action` is part of this scene's vocabulary
    ///
    /// The reserved "reset" action is always known.
    pub fn action_known(&self, action: &str) -> bool {
        action == RESET_ACTION
            || self.expressions.contains_key(action)
            || self.gestures.contains_key(action)
    }

    /// All valid action names, reset first, for operator display
    pub fn action_names(&self) -> Vec<&str> {
        let mut names = vec![RESET_ACTION];
        names.extend(self.expressions.keys().map(|s| s.as_str()));
        names.extend(self.gestures.keys().map(|s| s.as_str()));
        names
    }
}
