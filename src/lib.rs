//! Gamepad GW - controller-to-MIDI gateway
//!
//! Polls game-controller state and translates it into MIDI messages and
//! avatar animation triggers, with per-control mappings, portable
//! presets, and a console mirror of live state.

pub mod avatar;
pub mod cli;
pub mod config;
pub mod engine;
pub mod input;
pub mod midi;
pub mod midilog;
pub mod mirror;
pub mod output;
pub mod paths;
pub mod preset;
pub mod registry;
pub mod scene;

pub use engine::Engine;
pub use input::{DeviceSnapshot, InputSource};
pub use output::{Emitter, OutputSink};
pub use preset::{Preset, PresetStore};
pub use registry::{AxisConfig, ButtonConfig, ControlKey, ControlRegistry};
