//! GilRs-backed input source
//!
//! Drains pending gilrs events to keep hot-plug state fresh, then
//! snapshots every connected gamepad into the ordered axis/button layout
//! the engine expects. Gamepads are assigned small stable slot indices;
//! a controller reconnecting while a slot is free takes the lowest free
//! slot again.

use gilrs::{Axis, Button, Gilrs};
use std::collections::HashMap;
use tracing::{debug, info, warn};

use super::{ButtonSample, DeviceSnapshot, InputSource};

/// Ordered axes, matching the standard-gamepad convention of paired
/// sticks followed by triggers
const AXIS_ORDER: [Axis; 6] = [
    Axis::LeftStickX,
    Axis::LeftStickY,
    Axis::RightStickX,
    Axis::RightStickY,
    Axis::LeftZ,
    Axis::RightZ,
];

/// Ordered buttons, matching the standard-gamepad index convention
/// (face, shoulders, triggers, menu, sticks, d-pad)
const BUTTON_ORDER: [Button; 16] = [
    Button::South,
    Button::East,
    Button::West,
    Button::North,
    Button::LeftTrigger,
    Button::RightTrigger,
    Button::LeftTrigger2,
    Button::RightTrigger2,
    Button::Select,
    Button::Start,
    Button::LeftThumb,
    Button::RightThumb,
    Button::DPadUp,
    Button::DPadDown,
    Button::DPadLeft,
    Button::DPadRight,
];

/// Polling input source backed by gilrs
pub struct GilrsSource {
    gilrs: Gilrs,
    /// Assigned slot per gilrs gamepad id
    slots: HashMap<gilrs::GamepadId, usize>,
}

impl GilrsSource {
    pub fn new() -> anyhow::Result<Self> {
        let gilrs = Gilrs::new().map_err(|e| anyhow::anyhow!("Failed to initialize GilRs: {}", e))?;
        info!("GilRs initialized");

        let connected = gilrs
            .gamepads()
            .filter(|(_, gp)| gp.is_connected())
            .count();
        if connected == 0 {
            warn!("No gamepads detected yet; hot-plug will pick them up");
        } else {
            info!("Found {} connected gamepad(s)", connected);
        }

        Ok(Self {
            gilrs,
            slots: HashMap::new(),
        })
    }

    /// Lowest slot index not currently assigned
    fn lowest_free_slot(&self) -> usize {
        let mut slot = 0;
        while self.slots.values().any(|&s| s == slot) {
            slot += 1;
        }
        slot
    }

    fn slot_for(&mut self, id: gilrs::GamepadId) -> usize {
        if let Some(&slot) = self.slots.get(&id) {
            return slot;
        }
        let slot = self.lowest_free_slot();
        self.slots.insert(id, slot);
        slot
    }
}

impl InputSource for GilrsSource {
    fn list_connected_devices(&mut self) -> Vec<DeviceSnapshot> {
        // Drain events so connect/disconnect state is current before the
        // snapshot pass
        while let Some(event) = self.gilrs.next_event() {
            match event.event {
                gilrs::EventType::Connected => {
                    debug!("Gamepad connected: {:?}", event.id);
                }
                gilrs::EventType::Disconnected => {
                    debug!("Gamepad disconnected: {:?}", event.id);
                }
                _ => {}
            }
        }

        // Release slots of gamepads that are gone
        let gilrs = &self.gilrs;
        self.slots
            .retain(|id, _| gilrs.connected_gamepad(*id).is_some());

        let connected: Vec<gilrs::GamepadId> = self
            .gilrs
            .gamepads()
            .filter(|(_, gp)| gp.is_connected())
            .map(|(id, _)| id)
            .collect();

        let mut snapshots = Vec::with_capacity(connected.len());
        for id in connected {
            let index = self.slot_for(id);
            let Some(gamepad) = self.gilrs.connected_gamepad(id) else {
                continue;
            };

            let axes = AXIS_ORDER
                .iter()
                .map(|&axis| gamepad.axis_data(axis).map(|d| d.value()).unwrap_or(0.0))
                .collect();

            let buttons = BUTTON_ORDER
                .iter()
                .map(|&button| match gamepad.button_data(button) {
                    Some(data) => ButtonSample {
                        pressed: data.is_pressed(),
                        value: data.value(),
                    },
                    None => ButtonSample::released(),
                })
                .collect();

            snapshots.push(DeviceSnapshot {
                index,
                id: gamepad.name().to_string(),
                mapping: format!("{:?}", gamepad.mapping_source()).to_lowercase(),
                axes,
                buttons,
            });
        }

        snapshots.sort_by_key(|s| s.index);
        snapshots
    }
}
