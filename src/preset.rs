//! Preset capture, apply, and the portable serialization format
//!
//! A preset is a named snapshot of every per-control mapping for one
//! device. The on-disk document is a literal name→preset JSON map so it
//! round-trips exactly and stays portable across controller types.
//! Applying a preset to a mismatched device is advisory, never fatal:
//! matching indices are written, the rest ignored, and the operator gets
//! a warning string describing the mismatch.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;
use tracing::info;

use crate::registry::{AxisConfig, ButtonConfig, ControlKey, ControlRegistry};

/// Errors from the preset codec
#[derive(Debug, Error)]
pub enum PresetError {
    #[error("failed to parse preset document: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("unknown preset: {0}")]
    Unknown(String),
}

/// Identity of the device a preset was captured from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresetMeta {
    pub device_id: String,
    pub device_index: usize,
    pub axis_count: usize,
    pub button_count: usize,
    pub created_at: DateTime<Utc>,
}

/// Named snapshot of all per-control mapping configuration for one device
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preset {
    pub metadata: PresetMeta,
    pub axes: BTreeMap<usize, AxisConfig>,
    pub buttons: BTreeMap<usize, ButtonConfig>,
}

impl Preset {
    /// Snapshot every axis/button config of a device, defaulting entries
    /// the registry has not materialized yet
    pub fn capture(
        device_index: usize,
        device_id: &str,
        axis_count: usize,
        button_count: usize,
        registry: &ControlRegistry,
    ) -> Self {
        let axes = (0..axis_count)
            .map(|i| (i, registry.axis_config(ControlKey::new(device_index, i))))
            .collect();
        let buttons = (0..button_count)
            .map(|i| (i, registry.button_config(ControlKey::new(device_index, i))))
            .collect();

        Self {
            metadata: PresetMeta {
                device_id: device_id.to_string(),
                device_index,
                axis_count,
                button_count,
                created_at: Utc::now(),
            },
            axes,
            buttons,
        }
    }

    /// Write this preset's settings into the registry for a live device
    ///
    /// Settings for indices at or beyond the live control counts are
    /// ignored. Returns an advisory warning describing any identity or
    /// count mismatch; `None` when the preset matches the device exactly.
    pub fn apply_to(
        &self,
        registry: &mut ControlRegistry,
        device_index: usize,
        device_id: &str,
        axis_count: usize,
        button_count: usize,
    ) -> Option<String> {
        for (&index, config) in &self.axes {
            if index < axis_count {
                registry.set_axis_config(ControlKey::new(device_index, index), *config);
            }
        }
        for (&index, config) in &self.buttons {
            if index < button_count {
                registry.set_button_config(ControlKey::new(device_index, index), *config);
            }
        }

        let mut mismatches = Vec::new();
        if self.metadata.device_id != device_id {
            mismatches.push(format!(
                "device id mismatch: preset '{}', live '{}'",
                self.metadata.device_id, device_id
            ));
        }
        if self.metadata.axis_count != axis_count {
            mismatches.push(format!(
                "axis count mismatch: preset {}, live {}",
                self.metadata.axis_count, axis_count
            ));
        }
        if self.metadata.button_count != button_count {
            mismatches.push(format!(
                "button count mismatch: preset {}, live {}",
                self.metadata.button_count, button_count
            ));
        }

        if mismatches.is_empty() {
            None
        } else {
            Some(mismatches.join("; "))
        }
    }
}

/// Process-wide named preset collection
///
/// Names are unique keys; saving under an existing name overwrites it.
#[derive(Debug, Default)]
pub struct PresetStore {
    presets: BTreeMap<String, Preset>,
}

impl PresetStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create or update a named preset (last write wins)
    pub fn insert(&mut self, name: impl Into<String>, preset: Preset) {
        self.presets.insert(name.into(), preset);
    }

    pub fn get(&self, name: &str) -> Result<&Preset, PresetError> {
        self.presets
            .get(name)
            .ok_or_else(|| PresetError::Unknown(name.to_string()))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.presets.keys().map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.presets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.presets.is_empty()
    }

    /// Serialize the whole collection as a literal name→preset document
    pub fn serialize_all(&self) -> Result<String, PresetError> {
        Ok(serde_json::to_string_pretty(&self.presets)?)
    }

    /// Replace the whole collection from a serialized document
    ///
    /// A parse failure leaves the existing collection untouched.
    pub fn import_document(&mut self, text: &str) -> Result<usize, PresetError> {
        let parsed: BTreeMap<String, Preset> = serde_json::from_str(text)?;
        let count = parsed.len();
        self.presets = parsed;
        Ok(count)
    }

    /// Export the collection to a file
    pub fn export_to_file(&self, path: &Path) -> Result<()> {
        let document = self
            .serialize_all()
            .context("Failed to serialize presets")?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
        std::fs::write(path, document)
            .with_context(|| format!("Failed to write preset file: {}", path.display()))?;
        info!("Exported {} preset(s) to {}", self.len(), path.display());
        Ok(())
    }

    /// Import a preset file, replacing the whole collection on success
    pub fn import_from_file(&mut self, path: &Path) -> Result<usize> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read preset file: {}", path.display()))?;
        let count = self
            .import_document(&text)
            .with_context(|| format!("Failed to parse preset file: {}", path.display()))?;
        info!("Imported {} preset(s) from {}", count, path.display());
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_preset(device_id: &str, axis_count: usize, button_count: usize) -> Preset {
        let mut registry = ControlRegistry::new();
        registry.register_device(0, axis_count, button_count);
        registry.update_axis_config(ControlKey::new(0, 0), |c| {
            c.enabled = true;
            c.inverted = true;
            c.cc = 74;
        });
        registry.update_button_config(ControlKey::new(0, 1), |c| {
            c.enabled = true;
            c.note = 48;
            c.velocity = 100;
        });
        Preset::capture(0, device_id, axis_count, button_count, &registry)
    }

    #[test]
    fn test_capture_defaults_missing_entries() {
        let registry = ControlRegistry::new();
        let preset = Preset::capture(2, "Pad", 3, 2, &registry);

        assert_eq!(preset.axes.len(), 3);
        assert_eq!(preset.buttons.len(), 2);
        assert_eq!(preset.axes[&1], AxisConfig::default_for(1));
        assert_eq!(preset.metadata.device_index, 2);
        assert_eq!(preset.metadata.axis_count, 3);
    }

    #[test]
    fn test_apply_matching_device_yields_no_warning() {
        let preset = sample_preset("Pad", 4, 12);
        let mut registry = ControlRegistry::new();

        let warning = preset.apply_to(&mut registry, 1, "Pad", 4, 12);
        assert_eq!(warning, None);

        let axis = registry.axis_config(ControlKey::new(1, 0));
        assert!(axis.enabled && axis.inverted);
        assert_eq!(axis.cc, 74);
        let button = registry.button_config(ControlKey::new(1, 1));
        assert_eq!((button.note, button.velocity), (48, 100));
    }

    #[test]
    fn test_apply_mismatch_warns_with_both_counts() {
        let preset = sample_preset("Pad", 6, 16);
        let mut registry = ControlRegistry::new();

        let warning = preset
            .apply_to(&mut registry, 0, "Pad", 6, 12)
            .expect("mismatch must warn");
        assert!(warning.contains("16"));
        assert!(warning.contains("12"));
        assert!(warning.contains("button count"));
    }

    #[test]
    fn test_apply_ignores_indices_beyond_live_counts() {
        let preset = sample_preset("Pad", 6, 16);
        let mut registry = ControlRegistry::new();

        preset.apply_to(&mut registry, 0, "Pad", 2, 2);

        // Index 5 was in the preset but the live device has 2 axes
        assert_eq!(
            registry.axis_config(ControlKey::new(0, 5)),
            AxisConfig::default_for(5)
        );
    }

    #[test]
    fn test_apply_joins_multiple_mismatches() {
        let preset = sample_preset("Pad A", 6, 16);
        let mut registry = ControlRegistry::new();

        let warning = preset
            .apply_to(&mut registry, 0, "Pad B", 4, 12)
            .expect("mismatch must warn");
        assert!(warning.contains("device id mismatch"));
        assert!(warning.contains("axis count mismatch"));
        assert!(warning.contains("button count mismatch"));
    }

    #[test]
    fn test_document_round_trip_is_exact() {
        let mut store = PresetStore::new();
        store.insert("default", sample_preset("Pad", 4, 12));
        store.insert("inverted sticks", sample_preset("Other Pad", 6, 16));

        let document = store.serialize_all().unwrap();
        let mut restored = PresetStore::new();
        restored.import_document(&document).unwrap();

        assert_eq!(
            store.presets.keys().collect::<Vec<_>>(),
            restored.presets.keys().collect::<Vec<_>>()
        );
        for (name, preset) in &store.presets {
            assert_eq!(restored.get(name).unwrap(), preset);
        }
    }

    #[test]
    fn test_parse_failure_leaves_collection_untouched() {
        let mut store = PresetStore::new();
        store.insert("keep me", sample_preset("Pad", 4, 12));

        let result = store.import_document("{ not json at all");
        assert!(matches!(result, Err(PresetError::Parse(_))));
        assert_eq!(store.len(), 1);
        assert!(store.get("keep me").is_ok());
    }

    #[test]
    fn test_insert_same_name_overwrites() {
        let mut store = PresetStore::new();
        store.insert("p", sample_preset("Pad", 4, 12));
        store.insert("p", sample_preset("Pad", 2, 2));

        assert_eq!(store.len(), 1);
        assert_eq!(store.get("p").unwrap().metadata.axis_count, 2);
    }

    #[test]
    fn test_file_export_import_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("presets.json");

        let mut store = PresetStore::new();
        store.insert("default", sample_preset("Pad", 4, 12));
        store.export_to_file(&path).unwrap();

        let mut restored = PresetStore::new();
        let count = restored.import_from_file(&path).unwrap();
        assert_eq!(count, 1);
        assert_eq!(
            restored.get("default").unwrap(),
            store.get("default").unwrap()
        );
    }
}
