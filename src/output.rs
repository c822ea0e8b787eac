//! MIDI output: sink abstraction, midir transport, and the message emitter
//!
//! The emitter is the single place outbound messages are assembled. It is
//! a silent no-op while no sink is selected; that is the expected idle
//! state before the operator picks a destination, not an error.

use anyhow::{Context, Result};
use midir::{MidiOutput, MidiOutputConnection};
use std::sync::Mutex;
use tracing::{debug, info, warn};

use crate::midi::{format_hex, MidiMessage};
use crate::midilog::{LogKind, MidiLog};

/// Client name announced to the MIDI subsystem
const CLIENT_NAME: &str = "Gamepad-GW";

/// Destination for encoded 3-byte MIDI messages
///
/// Implemented by the midir transport in production and by recording
/// doubles in tests.
pub trait OutputSink: Send {
    /// Human-readable destination name (port name)
    fn name(&self) -> &str;

    /// Deliver one wire message
    fn send(&self, bytes: &[u8; 3]) -> Result<()>;
}

/// midir-backed output sink
pub struct MidirSink {
    conn: Mutex<MidiOutputConnection>,
    port_name: String,
}

impl MidirSink {
    /// Connect to the first output port whose name contains `pattern`
    /// (case-insensitive)
    pub fn connect(pattern: &str) -> Result<Self> {
        let midi_out = MidiOutput::new(CLIENT_NAME).context("Failed to create MIDI output")?;

        debug!("Found {} MIDI output ports", midi_out.port_count());

        let (port, port_name) = find_output_port(&midi_out, pattern)
            .ok_or_else(|| anyhow::anyhow!("Output port '{}' not found", pattern))?;

        info!("Connecting to output port: {}", port_name);

        let conn = midi_out
            .connect(&port, CLIENT_NAME)
            .map_err(|e| anyhow::anyhow!("Failed to connect to output port: {}", e))?;

        Ok(Self {
            conn: Mutex::new(conn),
            port_name,
        })
    }
}

impl OutputSink for MidirSink {
    fn name(&self) -> &str {
        &self.port_name
    }

    fn send(&self, bytes: &[u8; 3]) -> Result<()> {
        let mut conn = self
            .conn
            .lock()
            .map_err(|_| anyhow::anyhow!("MIDI output connection poisoned"))?;
        conn.send(bytes)
            .map_err(|e| anyhow::anyhow!("MIDI send failed: {}", e))
    }
}

/// List available MIDI output port names
pub fn list_output_ports() -> Result<Vec<String>> {
    let midi_out = MidiOutput::new(CLIENT_NAME)?;

    let mut port_names = Vec::new();
    for port in midi_out.ports() {
        if let Ok(name) = midi_out.port_name(&port) {
            port_names.push(name);
        }
    }

    Ok(port_names)
}

/// Find an output port by substring match (Windows-friendly)
fn find_output_port(
    midi_out: &MidiOutput,
    pattern: &str,
) -> Option<(midir::MidiOutputPort, String)> {
    let ports = midi_out.ports();
    for port in ports {
        if let Ok(name) = midi_out.port_name(&port) {
            if name.to_lowercase().contains(&pattern.to_lowercase()) {
                debug!("Found port '{}' matching pattern '{}'", name, pattern);
                return Some((port, name));
            }
        }
    }
    None
}

/// Assembles and dispatches outbound messages, recording each send
pub struct Emitter {
    sink: Option<Box<dyn OutputSink>>,
    log: MidiLog,
}

impl Default for Emitter {
    fn default() -> Self {
        Self::new()
    }
}

impl Emitter {
    pub fn new() -> Self {
        Self {
            sink: None,
            log: MidiLog::new(),
        }
    }

    /// Select a destination; replaces any previous sink
    pub fn set_sink(&mut self, sink: Box<dyn OutputSink>) {
        info!("MIDI output: {}", sink.name());
        self.sink = Some(sink);
    }

    /// Drop the current destination; subsequent sends become no-ops
    pub fn clear_sink(&mut self) {
        if let Some(sink) = self.sink.take() {
            info!("MIDI output released: {}", sink.name());
        }
    }

    pub fn is_connected(&self) -> bool {
        self.sink.is_some()
    }

    pub fn sink_name(&self) -> Option<&str> {
        self.sink.as_deref().map(|s| s.name())
    }

    pub fn log(&self) -> &MidiLog {
        &self.log
    }

    pub fn log_mut(&mut self) -> &mut MidiLog {
        &mut self.log
    }

    /// Send a Control Change message
    pub fn send_cc(&mut self, cc: u8, value: u8, channel: u8) {
        let msg = MidiMessage::ControlChange { channel, cc, value };
        if self.dispatch(msg) {
            self.log.push(
                LogKind::Cc,
                format!("CC {} sent", cc),
                format!("value: {}", value),
            );
        }
    }

    /// Send a Note On message
    pub fn send_note_on(&mut self, note: u8, velocity: u8, channel: u8) {
        let msg = MidiMessage::NoteOn { channel, note, velocity };
        if self.dispatch(msg) {
            self.log.push(
                LogKind::NoteOn,
                format!("Note {} on", note),
                format!("velocity: {}", velocity),
            );
        }
    }

    /// Send a Note Off message (velocity byte is always 0 on the wire)
    pub fn send_note_off(&mut self, note: u8, channel: u8) {
        let msg = MidiMessage::NoteOff { channel, note };
        if self.dispatch(msg) {
            self.log
                .push(LogKind::NoteOff, format!("Note {} off", note), String::new());
        }
    }

    /// Returns true when the message was actually delivered
    fn dispatch(&mut self, msg: MidiMessage) -> bool {
        let Some(sink) = self.sink.as_deref() else {
            return false;
        };

        let bytes = msg.encode();
        match sink.send(&bytes) {
            Ok(()) => {
                debug!("→ {} | {}", msg, format_hex(&bytes));
                true
            }
            Err(e) => {
                warn!("MIDI send failed ({}): {}", msg, e);
                false
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Sink double that records every wire message
    #[derive(Clone, Default)]
    pub struct RecordingSink {
        pub sent: Arc<Mutex<Vec<[u8; 3]>>>,
    }

    impl RecordingSink {
        pub fn messages(&self) -> Vec<[u8; 3]> {
            self.sent.lock().unwrap().clone()
        }
    }

    impl OutputSink for RecordingSink {
        fn name(&self) -> &str {
            "recording"
        }

        fn send(&self, bytes: &[u8; 3]) -> Result<()> {
            self.sent.lock().unwrap().push(*bytes);
            Ok(())
        }
    }
}
