//! MIDI utilities and message types
//!
//! Provides the outbound message types, 3-byte encoding, and the
//! axis-value conversion used by the mapping engine.

use std::fmt;

/// MIDI message types emitted by the gateway
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MidiMessage {
    /// Note Off: channel (0-15), note (0-127)
    ///
    /// The velocity byte is always 0 on the wire, regardless of the
    /// velocity configured for the control.
    NoteOff { channel: u8, note: u8 },

    /// Note On: channel (0-15), note (0-127), velocity (1-127)
    NoteOn { channel: u8, note: u8, velocity: u8 },

    /// Control Change: channel (0-15), cc (0-127), value (0-127)
    ControlChange { channel: u8, cc: u8, value: u8 },
}

impl MidiMessage {
    /// Encode the message to its 3-byte wire form
    pub fn encode(&self) -> [u8; 3] {
        match *self {
            MidiMessage::NoteOff { channel, note } => {
                [0x80 | (channel & 0x0F), note & 0x7F, 0]
            }
            MidiMessage::NoteOn { channel, note, velocity } => {
                [0x90 | (channel & 0x0F), note & 0x7F, velocity & 0x7F]
            }
            MidiMessage::ControlChange { channel, cc, value } => {
                [0xB0 | (channel & 0x0F), cc & 0x7F, value & 0x7F]
            }
        }
    }

    /// Parse a 3-byte message back into its typed form
    ///
    /// Only the message kinds the gateway emits are recognized; anything
    /// else returns `None`. Used by tests and log display.
    pub fn parse(data: &[u8]) -> Option<Self> {
        if data.len() < 3 {
            return None;
        }

        let status = data[0];
        let channel = status & 0x0F;

        match status & 0xF0 {
            0x80 => Some(MidiMessage::NoteOff { channel, note: data[1] & 0x7F }),
            0x90 => {
                let note = data[1] & 0x7F;
                let velocity = data[2] & 0x7F;
                // Note On with velocity 0 is a Note Off by convention
                if velocity == 0 {
                    Some(MidiMessage::NoteOff { channel, note })
                } else {
                    Some(MidiMessage::NoteOn { channel, note, velocity })
                }
            }
            0xB0 => Some(MidiMessage::ControlChange {
                channel,
                cc: data[1] & 0x7F,
                value: data[2] & 0x7F,
            }),
            _ => None,
        }
    }
}

impl fmt::Display for MidiMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            MidiMessage::NoteOff { channel, note } => {
                write!(f, "NoteOff ch:{} n:{}", channel + 1, note)
            }
            MidiMessage::NoteOn { channel, note, velocity } => {
                write!(f, "NoteOn ch:{} n:{} v:{}", channel + 1, note, velocity)
            }
            MidiMessage::ControlChange { channel, cc, value } => {
                write!(f, "CC ch:{} cc:{} v:{}", channel + 1, cc, value)
            }
        }
    }
}

/// Convert a raw axis value in [-1, 1] to a MIDI CC value in [0, 127]
///
/// Center (0.0) maps to 64. The `* 63.5` scale and the rounding are kept
/// exactly as tuned; presets in the wild depend on the resulting values.
pub fn axis_to_midi(raw: f32, inverted: bool) -> u8 {
    let clamped = raw.clamp(-1.0, 1.0);
    let value = ((clamped + 1.0) * 63.5).round() as u8;
    if inverted {
        127 - value
    } else {
        value
    }
}

/// Format MIDI bytes as hex string for debugging
pub fn format_hex(data: &[u8]) -> String {
    data.iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(" ")
}
