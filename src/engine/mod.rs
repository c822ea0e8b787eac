//! Mapping engine: device lifecycle, edge detection, and the tick
//!
//! One `Engine` owns all mutable state (registry, emitter, animation
//! bridge, device table, mirror views) and is driven by an external
//! scheduler calling [`Engine::tick`]. Operator commands mutate the same
//! engine between ticks, so no locking is involved; configuration writes
//! are whole-value replacements.


use anyhow::{anyhow, Result};
use std::collections::{HashMap, HashSet};
use tracing::info;

use crate::avatar::AnimationBridge;
use crate::input::{DeviceSnapshot, InputSource};
use crate::midi::axis_to_midi;
use crate::mirror::{AxisView, ButtonView, DeviceView};
use crate::output::Emitter;
use crate::preset::Preset;
use crate::registry::{ControlKey, ControlRegistry};

/// Identity and shape of a connected device
#[derive(Debug, Clone)]
pub struct DeviceInfo {
    pub id: String,
    pub axis_count: usize,
    pub button_count: usize,
}

/// Coordinator for the whole input→protocol mapping path
pub struct Engine {
    registry: ControlRegistry,
    emitter: Emitter,
    bridge: AnimationBridge,
    devices: HashMap<usize, DeviceInfo>,
    views: Vec<DeviceView>,
}

impl Engine {
    pub fn new(emitter: Emitter, bridge: AnimationBridge) -> Self {
        Self {
            registry: ControlRegistry::new(),
            emitter,
            bridge,
            devices: HashMap::new(),
            views: Vec::new(),
        }
    }

    /// One polling cycle: enumerate, purge disconnects, register new
    /// devices, run every snapshot through the edge detector, refresh
    /// the mirror views
    ///
    /// Disconnect handling runs first so a vanished device is fully
    /// purged before any snapshot is read.
    pub fn tick(&mut self, input: &mut dyn InputSource) {
        let snapshots = input.list_connected_devices();

        let seen: HashSet<usize> = snapshots.iter().map(|s| s.index).collect();
        let gone: Vec<usize> = self
            .devices
            .keys()
            .filter(|index| !seen.contains(index))
            .copied()
            .collect();
        for index in gone {
            self.remove_device(index);
        }

        let mut views = Vec::with_capacity(snapshots.len());
        for snapshot in &snapshots {
            self.register_if_new(snapshot);
            views.push(self.process_device(snapshot));
        }
        self.views = views;
    }

    fn register_if_new(&mut self, snapshot: &DeviceSnapshot) {
        if let Some(info) = self.devices.get_mut(&snapshot.index) {
            // Same slot, same connection: keep identity fresh (names can
            // arrive late on some backends)
            info.id = snapshot.id.clone();
            return;
        }

        info!(
            "Device connected: [{}] {} ({} axes, {} buttons)",
            snapshot.index,
            snapshot.id,
            snapshot.axes.len(),
            snapshot.buttons.len()
        );

        self.devices.insert(
            snapshot.index,
            DeviceInfo {
                id: snapshot.id.clone(),
                axis_count: snapshot.axes.len(),
                button_count: snapshot.buttons.len(),
            },
        );
        self.registry
            .register_device(snapshot.index, snapshot.axes.len(), snapshot.buttons.len());
        self.bridge
            .apply_scene_defaults(snapshot.index, snapshot.buttons.len());
    }

    fn remove_device(&mut self, index: usize) {
        if let Some(info) = self.devices.remove(&index) {
            info!("Device disconnected: [{}] {}", index, info.id);
        }
        self.registry.remove_device(index);
        self.bridge.remove_device(index);
    }

    /// Run one device snapshot through the edge detector
    ///
    /// Nothing in here can fail a tick: emitter errors are contained and
    /// one device's state never blocks another's processing.
    fn process_device(&mut self, snapshot: &DeviceSnapshot) -> DeviceView {
        let mut axis_views = Vec::with_capacity(snapshot.axes.len());
        for (index, &raw) in snapshot.axes.iter().enumerate() {
            let key = ControlKey::new(snapshot.index, index);
            let config = self.registry.axis_config(key);
            let mapped = axis_to_midi(raw, config.inverted);

            // Hysteresis: re-emit only when the mapped value moved by
            // more than 1 since the last value actually sent
            if config.enabled && self.emitter.is_connected() {
                let last = self.registry.live().last_sent(key);
                let changed = match last {
                    None => true,
                    Some(last) => (i16::from(last) - i16::from(mapped)).abs() > 1,
                };
                if changed {
                    self.emitter.send_cc(config.cc, mapped, config.channel);
                    self.registry.live_mut().set_last_sent(key, mapped);
                }
            }

            axis_views.push(AxisView {
                raw,
                midi: mapped,
                enabled: config.enabled,
                cc: config.cc,
            });
        }

        let mut button_views = Vec::with_capacity(snapshot.buttons.len());
        for (index, sample) in snapshot.buttons.iter().enumerate() {
            let key = ControlKey::new(snapshot.index, index);
            let config = self.registry.button_config(key);
            let was_pressed = self.registry.live().pressed(key);

            // The edge tracker updates regardless of the enabled flag or
            // sink presence, so re-enabling never replays a stale edge
            if sample.pressed && !was_pressed {
                self.registry.live_mut().set_pressed(key, true);
                if config.enabled {
                    self.emitter
                        .send_note_on(config.note, config.velocity, config.channel);
                }
            } else if !sample.pressed && was_pressed {
                self.registry.live_mut().set_pressed(key, false);
                if config.enabled {
                    self.emitter.send_note_off(config.note, config.channel);
                }
            }

            // The bridge keeps its own edge cache with its own cadence
            self.bridge.on_button(key, sample.pressed);

            button_views.push(ButtonView {
                pressed: sample.pressed,
                value: sample.value,
                enabled: config.enabled,
                note: config.note,
            });
        }

        DeviceView {
            index: snapshot.index,
            id: snapshot.id.clone(),
            mapping: snapshot.mapping.clone(),
            axes: axis_views,
            buttons: button_views,
        }
    }

    /// Snapshot the full mapping of a connected device as a preset
    pub fn capture_preset(&self, device_index: usize) -> Result<Preset> {
        let info = self
            .devices
            .get(&device_index)
            .ok_or_else(|| anyhow!("No connected device at slot {}", device_index))?;
        Ok(Preset::capture(
            device_index,
            &info.id,
            info.axis_count,
            info.button_count,
            &self.registry,
        ))
    }

    /// Apply a preset to a connected device; returns the compatibility
    /// warning, if any
    pub fn apply_preset(&mut self, device_index: usize, preset: &Preset) -> Result<Option<String>> {
        let info = self
            .devices
            .get(&device_index)
            .ok_or_else(|| anyhow!("No connected device at slot {}", device_index))?
            .clone();
        Ok(preset.apply_to(
            &mut self.registry,
            device_index,
            &info.id,
            info.axis_count,
            info.button_count,
        ))
    }

    pub fn devices(&self) -> &HashMap<usize, DeviceInfo> {
        &self.devices
    }

    pub fn views(&self) -> &[DeviceView] {
        &self.views
    }

    pub fn registry(&self) -> &ControlRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut ControlRegistry {
        &mut self.registry
    }

    pub fn emitter(&self) -> &Emitter {
        &self.emitter
    }

    pub fn emitter_mut(&mut self) -> &mut Emitter {
        &mut self.emitter
    }

    pub fn bridge(&self) -> &AnimationBridge {
        &self.bridge
    }

    pub fn bridge_mut(&mut self) -> &mut AnimationBridge {
        &mut self.bridge
    }
}
