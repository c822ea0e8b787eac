//! Synthetic input source: scripted frames for tests, procedural motion
//! for demo mode
//!
//! Substitutes for real hardware behind the same [`InputSource`] seam,
//! so the whole mapping path can run deterministically with no devices
//! attached.

use std::collections::VecDeque;

use super::{ButtonSample, DeviceSnapshot, InputSource};

/// Deterministic input source fed from a script or a procedural pattern
pub struct SyntheticSource {
    frames: VecDeque<Vec<DeviceSnapshot>>,
    /// Frame repeated once the script runs out
    hold: Vec<DeviceSnapshot>,
    /// Procedural demo state; None for scripted sources
    demo: Option<DemoState>,
}

struct DemoState {
    tick: u64,
    axis_count: usize,
    button_count: usize,
}

impl SyntheticSource {
    /// Play the given frames in order, then keep returning the last one
    pub fn scripted(frames: Vec<Vec<DeviceSnapshot>>) -> Self {
        let hold = frames.last().cloned().unwrap_or_default();
        Self {
            frames: frames.into(),
            hold,
            demo: None,
        }
    }

    /// Endless procedural device: slow axis sweeps, periodic presses
    pub fn demo() -> Self {
        Self {
            frames: VecDeque::new(),
            hold: Vec::new(),
            demo: Some(DemoState {
                tick: 0,
                axis_count: 4,
                button_count: 12,
            }),
        }
    }

    /// Convenience snapshot builder for scripts
    pub fn device(index: usize, id: &str, axes: Vec<f32>, buttons: Vec<ButtonSample>) -> DeviceSnapshot {
        DeviceSnapshot {
            index,
            id: id.to_string(),
            mapping: "standard".to_string(),
            axes,
            buttons,
        }
    }
}

impl InputSource for SyntheticSource {
    fn list_connected_devices(&mut self) -> Vec<DeviceSnapshot> {
        if let Some(demo) = &mut self.demo {
            let t = demo.tick;
            demo.tick += 1;

            let axes = (0..demo.axis_count)
                .map(|i| {
                    let phase = (t as f32) / (60.0 + 10.0 * i as f32);
                    phase.sin()
                })
                .collect();

            // Each button held for 30 ticks out of a staggered 240-tick cycle
            let buttons = (0..demo.button_count)
                .map(|i| {
                    let held = (t + (i as u64) * 20) % 240 < 30;
                    ButtonSample {
                        pressed: held,
                        value: if held { 1.0 } else { 0.0 },
                    }
                })
                .collect();

            return vec![DeviceSnapshot {
                index: 0,
                id: "Synthetic Pad".to_string(),
                mapping: "standard".to_string(),
                axes,
                buttons,
            }];
        }

        match self.frames.pop_front() {
            Some(frame) => frame,
            None => self.hold.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scripted_frames_play_in_order_then_hold() {
        let f1 = vec![SyntheticSource::device(0, "Pad", vec![0.0], vec![])];
        let f2 = vec![SyntheticSource::device(0, "Pad", vec![1.0], vec![])];
        let mut source = SyntheticSource::scripted(vec![f1, f2]);

        assert_eq!(source.list_connected_devices()[0].axes[0], 0.0);
        assert_eq!(source.list_connected_devices()[0].axes[0], 1.0);
        // Script exhausted: last frame repeats
        assert_eq!(source.list_connected_devices()[0].axes[0], 1.0);
    }

    #[test]
    fn test_empty_script_reports_no_devices() {
        let mut source = SyntheticSource::scripted(vec![]);
        assert!(source.list_connected_devices().is_empty());
    }

    #[test]
    fn test_demo_axes_stay_in_range() {
        let mut source = SyntheticSource::demo();
        for _ in 0..500 {
            for device in source.list_connected_devices() {
                assert!(device.axes.iter().all(|a| (-1.0..=1.0).contains(a)));
            }
        }
    }

    #[test]
    fn test_demo_buttons_produce_edges() {
        let mut source = SyntheticSource::demo();
        let mut saw_press = false;
        let mut saw_release = false;
        let mut last = false;
        for _ in 0..500 {
            let pressed = source.list_connected_devices()[0].buttons[0].pressed;
            if pressed && !last {
                saw_press = true;
            }
            if !pressed && last {
                saw_release = true;
            }
            last = pressed;
        }
        assert!(saw_press && saw_release);
    }
}
