//! Console mirror of live controller state
//!
//! Renders the engine's per-device views: raw axis positions with the
//! MIDI value their current mapping would send, and button pressed
//! state with analog depth. The analog depth only ever feeds this
//! display; MIDI edges come from the pressed flag.

use colored::Colorize;

/// View of one axis after the conversion pass
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisView {
    pub raw: f32,
    /// Mapped MIDI value for the current config (inversion applied)
    pub midi: u8,
    pub enabled: bool,
    pub cc: u8,
}

/// View of one button after the edge pass
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ButtonView {
    pub pressed: bool,
    pub value: f32,
    pub enabled: bool,
    pub note: u8,
}

/// Per-device view handed to the mirror each tick
#[derive(Debug, Clone)]
pub struct DeviceView {
    pub index: usize,
    pub id: String,
    pub mapping: String,
    pub axes: Vec<AxisView>,
    pub buttons: Vec<ButtonView>,
}

/// Label an axis by stick pair: "0 X", "0 Y", "1 X", ...
///
/// A trailing unpaired axis keeps its bare index.
pub fn axis_pair_label(index: usize, total: usize) -> String {
    if index % 2 == 0 && index + 1 < total {
        format!("{} X", index / 2)
    } else if index % 2 == 1 {
        format!("{} Y", index / 2)
    } else {
        format!("{}", index)
    }
}

/// Render all device views for the console
pub fn render(views: &[DeviceView]) -> String {
    if views.is_empty() {
        return format!("{}\n", "no devices connected".dimmed());
    }

    let mut out = String::new();
    for view in views {
        out.push_str(&format!(
            "{} {} ({})\n",
            format!("[{}]", view.index).bold(),
            view.id.bright_white(),
            view.mapping.dimmed()
        ));

        out.push_str("  axes:\n");
        for (i, axis) in view.axes.iter().enumerate() {
            let label = axis_pair_label(i, view.axes.len());
            let state = if axis.enabled {
                format!("cc {}", axis.cc).green()
            } else {
                "off".dimmed()
            };
            out.push_str(&format!(
                "    {:>4}  {:+.2}  midi {:>3}  {}\n",
                label, axis.raw, axis.midi, state
            ));
        }

        out.push_str("  buttons:\n");
        for (i, button) in view.buttons.iter().enumerate() {
            let dot = if button.pressed {
                "●".red().to_string()
            } else {
                "○".dimmed().to_string()
            };
            let state = if button.enabled {
                format!("note {}", button.note).green()
            } else {
                "off".dimmed()
            };
            out.push_str(&format!(
                "    {:>4}  {}  {:.2}  {}\n",
                i, dot, button.value, state
            ));
        }
    }
    out
}
