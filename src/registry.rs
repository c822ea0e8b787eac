//! Control registry: per-control MIDI mapping configuration and live state
//!
//! Keyed by (device slot, control index). Writes are permissive: numeric
//! fields are clamped to their legal MIDI ranges, never rejected, because
//! they arrive from uncontrolled operator input. Every write replaces the
//! whole stored value so a snapshot mid-tick never observes a partial
//! update.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Identity of one physical control
///
/// Stable for the lifetime of a connected device; a device reconnecting
/// at the same slot reuses the same keys (with freshly defaulted configs).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ControlKey {
    pub device: usize,
    pub control: usize,
}

impl ControlKey {
    pub fn new(device: usize, control: usize) -> Self {
        Self { device, control }
    }
}

/// Mapping configuration for one analog axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AxisConfig {
    pub enabled: bool,
    #[serde(default)]
    pub inverted: bool,
    pub cc: u8,
    #[serde(default)]
    pub channel: u8,
}

impl AxisConfig {
    /// Default mapping for an axis at `index`: disabled, CC = index + 1
    pub fn default_for(index: usize) -> Self {
        Self {
            enabled: false,
            inverted: false,
            cc: ((index + 1).min(127)) as u8,
            channel: 0,
        }
    }

    /// Clamp numeric fields to their legal MIDI ranges
    pub fn clamped(mut self) -> Self {
        self.cc = self.cc.min(127);
        self.channel = self.channel.min(15);
        self
    }
}

/// Mapping configuration for one button
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ButtonConfig {
    pub enabled: bool,
    pub note: u8,
    pub velocity: u8,
    #[serde(default)]
    pub channel: u8,
}

impl ButtonConfig {
    /// Default mapping for a button at `index`: disabled, note = 60 + index
    pub fn default_for(index: usize) -> Self {
        Self {
            enabled: false,
            note: ((60 + index).min(127)) as u8,
            velocity: 127,
            channel: 0,
        }
    }

    /// Clamp numeric fields to their legal MIDI ranges
    pub fn clamped(mut self) -> Self {
        self.note = self.note.min(127);
        self.velocity = self.velocity.clamp(1, 127);
        self.channel = self.channel.min(15);
        self
    }
}

/// Per-control transient state, never persisted
///
/// Cleared for a device the moment it disconnects so a reconnect at the
/// same slot starts from scratch.
#[derive(Debug, Default)]
pub struct LiveState {
    /// Last MIDI value actually sent per axis
    last_sent: HashMap<ControlKey, u8>,
    /// Last observed pressed flag per button (the MIDI edge tracker)
    pressed: HashMap<ControlKey, bool>,
}

impl LiveState {
    pub fn last_sent(&self, key: ControlKey) -> Option<u8> {
        self.last_sent.get(&key).copied()
    }

    pub fn set_last_sent(&mut self, key: ControlKey, value: u8) {
        self.last_sent.insert(key, value);
    }

    pub fn pressed(&self, key: ControlKey) -> bool {
        self.pressed.get(&key).copied().unwrap_or(false)
    }

    pub fn set_pressed(&mut self, key: ControlKey, pressed: bool) {
        self.pressed.insert(key, pressed);
    }

    fn remove_device(&mut self, device: usize) {
        self.last_sent.retain(|k, _| k.device != device);
        self.pressed.retain(|k, _| k.device != device);
    }
}

/// Registry of axis/button mappings plus their live state
#[derive(Debug, Default)]
pub struct ControlRegistry {
    axes: HashMap<ControlKey, AxisConfig>,
    buttons: HashMap<ControlKey, ButtonConfig>,
    live: LiveState,
}

impl ControlRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stored config for an axis, or the default for its index
    pub fn axis_config(&self, key: ControlKey) -> AxisConfig {
        self.axes
            .get(&key)
            .copied()
            .unwrap_or_else(|| AxisConfig::default_for(key.control))
    }

    /// Replace the config for an axis, clamping numeric fields
    pub fn set_axis_config(&mut self, key: ControlKey, config: AxisConfig) {
        self.axes.insert(key, config.clamped());
    }

    /// Read-modify-replace for an axis config
    pub fn update_axis_config(&mut self, key: ControlKey, f: impl FnOnce(&mut AxisConfig)) {
        let mut config = self.axis_config(key);
        f(&mut config);
        self.set_axis_config(key, config);
    }

    /// Stored config for a button, or the default for its index
    pub fn button_config(&self, key: ControlKey) -> ButtonConfig {
        self.buttons
            .get(&key)
            .copied()
            .unwrap_or_else(|| ButtonConfig::default_for(key.control))
    }

    /// Replace the config for a button, clamping numeric fields
    pub fn set_button_config(&mut self, key: ControlKey, config: ButtonConfig) {
        self.buttons.insert(key, config.clamped());
    }

    /// Read-modify-replace for a button config
    pub fn update_button_config(&mut self, key: ControlKey, f: impl FnOnce(&mut ButtonConfig)) {
        let mut config = self.button_config(key);
        f(&mut config);
        self.set_button_config(key, config);
    }

    /// Materialize default configs for every control of a newly seen device
    pub fn register_device(&mut self, device: usize, axis_count: usize, button_count: usize) {
        for index in 0..axis_count {
            let key = ControlKey::new(device, index);
            self.axes
                .entry(key)
                .or_insert_with(|| AxisConfig::default_for(index));
        }
        for index in 0..button_count {
            let key = ControlKey::new(device, index);
            self.buttons
                .entry(key)
                .or_insert_with(|| ButtonConfig::default_for(index));
        }
    }

    /// Purge all configuration and live state for a device
    pub fn remove_device(&mut self, device: usize) {
        self.axes.retain(|k, _| k.device != device);
        self.buttons.retain(|k, _| k.device != device);
        self.live.remove_device(device);
    }

    /// True if any config entry exists for the device
    pub fn has_device(&self, device: usize) -> bool {
        self.axes.keys().any(|k| k.device == device)
            || self.buttons.keys().any(|k| k.device == device)
    }

    pub fn live(&self) -> &LiveState {
        &self.live
    }

    pub fn live_mut(&mut self) -> &mut LiveState {
        &mut self.live
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_follow_control_index() {
        let registry = ControlRegistry::new();

        let axis = registry.axis_config(ControlKey::new(0, 2));
        assert!(!axis.enabled);
        assert_eq!(axis.cc, 3);
        assert_eq!(axis.channel, 0);

        let button = registry.button_config(ControlKey::new(0, 5));
        assert!(!button.enabled);
        assert_eq!(button.note, 65);
        assert_eq!(button.velocity, 127);
    }

    #[test]
    fn test_set_replaces_whole_value() {
        let mut registry = ControlRegistry::new();
        let key = ControlKey::new(1, 0);

        registry.set_axis_config(
            key,
            AxisConfig { enabled: true, inverted: true, cc: 11, channel: 2 },
        );

        let stored = registry.axis_config(key);
        assert!(stored.enabled);
        assert!(stored.inverted);
        assert_eq!(stored.cc, 11);
        assert_eq!(stored.channel, 2);
    }

    #[test]
    fn test_out_of_range_writes_are_clamped() {
        let mut registry = ControlRegistry::new();
        let key = ControlKey::new(0, 0);

        registry.set_axis_config(
            key,
            AxisConfig { enabled: true, inverted: false, cc: 200, channel: 99 },
        );
        assert_eq!(registry.axis_config(key).cc, 127);
        assert_eq!(registry.axis_config(key).channel, 15);

        registry.set_button_config(
            key,
            ButtonConfig { enabled: true, note: 255, velocity: 0, channel: 20 },
        );
        let button = registry.button_config(key);
        assert_eq!(button.note, 127);
        assert_eq!(button.velocity, 1);
        assert_eq!(button.channel, 15);
    }

    #[test]
    fn test_update_preserves_other_fields() {
        let mut registry = ControlRegistry::new();
        let key = ControlKey::new(0, 3);

        registry.update_axis_config(key, |c| c.enabled = true);
        registry.update_axis_config(key, |c| c.cc = 40);

        let axis = registry.axis_config(key);
        assert!(axis.enabled);
        assert_eq!(axis.cc, 40);
    }

    #[test]
    fn test_remove_device_purges_configs_and_live_state() {
        let mut registry = ControlRegistry::new();
        registry.register_device(0, 4, 12);
        registry.register_device(1, 2, 2);

        let key = ControlKey::new(0, 1);
        registry.update_axis_config(key, |c| c.cc = 99);
        registry.live_mut().set_last_sent(key, 64);
        registry.live_mut().set_pressed(ControlKey::new(0, 0), true);

        registry.remove_device(0);

        assert!(!registry.has_device(0));
        assert!(registry.has_device(1));
        assert_eq!(registry.live().last_sent(key), None);
        assert!(!registry.live().pressed(ControlKey::new(0, 0)));

        // Reconnect at the same slot starts from defaults, not stale config
        registry.register_device(0, 4, 12);
        assert_eq!(registry.axis_config(key).cc, 2);
    }

    #[test]
    fn test_register_device_keeps_existing_configs() {
        let mut registry = ControlRegistry::new();
        let key = ControlKey::new(0, 0);
        registry.set_axis_config(
            key,
            AxisConfig { enabled: true, inverted: false, cc: 21, channel: 0 },
        );

        registry.register_device(0, 4, 4);
        assert_eq!(registry.axis_config(key).cc, 21);
    }
}
