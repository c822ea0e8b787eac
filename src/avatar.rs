//! Avatar consumer seam and the animation mapping bridge
//!
//! The bridge routes button press edges to named avatar actions. It keeps
//! its own per-button `triggered` flag, independent of the MIDI edge
//! tracker, because the same physical press can drive both a note (held
//! for the press duration) and an animation (auto-reset owned by the
//! consumer) with different re-trigger cadences.

use std::collections::HashMap;
use tracing::{debug, info};

use crate::registry::ControlKey;
use crate::scene::{SceneConfig, RESET_ACTION};

/// Target for animation triggers; fire-and-forget by contract
///
/// The consumer owns all timing (auto-reset, blend durations). The
/// gateway never waits on or observes completion.
pub trait AvatarConsumer: Send {
    fn trigger_action(&self, name: &str);
    fn reset_all(&self);
}

/// Default consumer standing in for a 3D renderer: traces every call
pub struct LoggingAvatar;

impl AvatarConsumer for LoggingAvatar {
    fn trigger_action(&self, name: &str) {
        info!("🎬 avatar action: {}", name);
    }

    fn reset_all(&self) {
        info!("🔄 avatar reset");
    }
}

/// Per-button animation assignment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnimationMapping {
    pub enabled: bool,
    /// Expression name, gesture name, or the reserved "reset"
    pub action: String,
}

/// Routes button edges to avatar actions through declarative scene tables
pub struct AnimationBridge {
    consumer: Box<dyn AvatarConsumer>,
    scene: Option<SceneConfig>,
    mappings: HashMap<ControlKey, AnimationMapping>,
    /// Independent press-edge cache (distinct from the MIDI tracker)
    triggered: HashMap<ControlKey, bool>,
}

impl AnimationBridge {
    pub fn new(consumer: Box<dyn AvatarConsumer>) -> Self {
        Self {
            consumer,
            scene: None,
            mappings: HashMap::new(),
            triggered: HashMap::new(),
        }
    }

    /// Install the active scene
    pub fn set_scene(&mut self, scene: SceneConfig) {
        info!("Avatar scene loaded: {}", scene.name);
        self.scene = Some(scene);
    }

    pub fn scene(&self) -> Option<&SceneConfig> {
        self.scene.as_ref()
    }

    /// Assign an action to a button (whole-value replacement)
    pub fn set_mapping(&mut self, key: ControlKey, mapping: AnimationMapping) {
        self.mappings.insert(key, mapping);
    }

    pub fn mapping(&self, key: ControlKey) -> Option<&AnimationMapping> {
        self.mappings.get(&key)
    }

    /// Read-modify-replace for a button's animation mapping
    pub fn update_mapping(&mut self, key: ControlKey, f: impl FnOnce(&mut AnimationMapping)) {
        let mut mapping = self.mappings.get(&key).cloned().unwrap_or(AnimationMapping {
            enabled: false,
            action: String::new(),
        });
        f(&mut mapping);
        self.mappings.insert(key, mapping);
    }

    /// Seed scene-default actions for a newly registered device
    ///
    /// Only button indices without an explicit operator mapping are
    /// touched.
    pub fn apply_scene_defaults(&mut self, device: usize, button_count: usize) {
        let Some(scene) = &self.scene else {
            return;
        };
        for (&index, action) in &scene.buttons {
            if index >= button_count {
                continue;
            }
            let key = ControlKey::new(device, index);
            self.mappings.entry(key).or_insert_with(|| AnimationMapping {
                enabled: true,
                action: action.clone(),
            });
        }
    }

    /// Purge mappings and edge state for a disconnected device
    pub fn remove_device(&mut self, device: usize) {
        self.mappings.retain(|k, _| k.device != device);
        self.triggered.retain(|k, _| k.device != device);
    }

    /// Feed one raw button sample; fires the consumer on press edges
    ///
    /// The edge cache updates on every transition regardless of the
    /// mapping's enabled flag, so enabling a held button never fires a
    /// stale trigger. Release edges only clear the local flag; any
    /// auto-return is the consumer's business.
    pub fn on_button(&mut self, key: ControlKey, pressed: bool) {
        let was_triggered = self.triggered.get(&key).copied().unwrap_or(false);

        if pressed && !was_triggered {
            self.triggered.insert(key, true);
            self.fire(key);
        } else if !pressed && was_triggered {
            self.triggered.insert(key, false);
        }
    }

    fn fire(&mut self, key: ControlKey) {
        let Some(mapping) = self.mappings.get(&key) else {
            return;
        };
        if !mapping.enabled || mapping.action.is_empty() {
            return;
        }

        if mapping.action == RESET_ACTION {
            self.consumer.reset_all();
            return;
        }

        // Unknown names are skipped, never an error; with no scene loaded
        // every name is forwarded and the consumer owns interpretation.
        if let Some(scene) = &self.scene {
            if !scene.action_known(&mapping.action) {
                debug!(
                    "Ignoring unknown avatar action '{}' for device {} button {}",
                    mapping.action, key.device, key.control
                );
                return;
            }
        }

        self.consumer.trigger_action(&mapping.action);
    }
}
