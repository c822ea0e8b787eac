//! Application path helpers
//!
//! Preset documents live in the platform data directory by default
//! (%APPDATA% on Windows, ~/.local/share on Linux); exports embed the
//! current date in the filename.

use chrono::{Local, NaiveDate};
use std::path::PathBuf;

/// Application name used for the data directory
const APP_NAME: &str = "gamepad-gw";

/// Default directory for preset export/import
pub fn default_presets_dir() -> PathBuf {
    dirs::data_dir()
        .map(|dir| dir.join(APP_NAME).join("presets"))
        .unwrap_or_else(|| PathBuf::from("presets"))
}

/// Export filename for a given date, e.g. "presets-2024-11-30.json"
pub fn export_file_name(date: NaiveDate) -> String {
    format!("presets-{}.json", date.format("%Y-%m-%d"))
}

/// Full export path for today, inside `dir`
pub fn export_path_today(dir: &std::path::Path) -> PathBuf {
    dir.join(export_file_name(Local::now().date_naive()))
}
