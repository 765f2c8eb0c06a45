use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::frames::Navigator;
use crate::geometry::Viewport;

/// Operator preferences, all adjustable while the app runs.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Canvas size as a percentage of the screen.
    pub canvas_zoom_percent: u32,
    /// Delay between steps while a scan button is held.
    pub advance_delay_ms: u64,
    pub feather_enabled: bool,
    pub feather_radius: u32,
    pub backup_on_save: bool,
    pub backup_on_use_original: bool,
    pub keep_tools_visible: bool,
    pub last_directory: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            canvas_zoom_percent: 30,
            advance_delay_ms: 100,
            feather_enabled: false,
            feather_radius: 3,
            backup_on_save: true,
            backup_on_use_original: true,
            keep_tools_visible: false,
            last_directory: None,
        }
    }
}

impl Settings {
    pub fn set_canvas_zoom_percent(&mut self, percent: u32) {
        self.canvas_zoom_percent = percent.clamp(Viewport::MIN_PERCENT, Viewport::MAX_PERCENT);
    }

    pub fn set_advance_delay_ms(&mut self, delay_ms: u64) {
        self.advance_delay_ms = delay_ms.clamp(Navigator::MIN_DELAY_MS, Navigator::MAX_DELAY_MS);
    }

    pub fn set_feather_radius(&mut self, radius: u32) {
        self.feather_radius = radius.max(1);
    }

    /// Bring values read from disk back into range.
    fn sanitized(mut self) -> Self {
        self.set_canvas_zoom_percent(self.canvas_zoom_percent);
        self.set_advance_delay_ms(self.advance_delay_ms);
        self.set_feather_radius(self.feather_radius);
        self
    }

    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .map(|d| d.join("merge-review").join("settings.json"))
            .unwrap_or_else(|| PathBuf::from("merge-review-settings.json"))
    }

    /// Missing or unreadable files fall back to defaults.
    pub fn load(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(data) => match serde_json::from_str::<Settings>(&data) {
                Ok(settings) => {
                    log::info!("Loaded settings from {}", path.display());
                    settings.sanitized()
                }
                Err(e) => {
                    log::warn!("Failed to parse {}: {}, using defaults", path.display(), e);
                    Settings::default()
                }
            },
            Err(_) => {
                log::info!("No settings at {}, using defaults", path.display());
                Settings::default()
            }
        }
    }

    pub fn save(&self, path: &Path) {
        if let Some(parent) = path.parent() {
            let _ = fs::create_dir_all(parent);
        }
        match serde_json::to_string_pretty(self) {
            Ok(data) => match fs::write(path, data) {
                Ok(()) => log::debug!("Saved settings to {}", path.display()),
                Err(e) => log::error!("Failed to save settings to {}: {}", path.display(), e),
            },
            Err(e) => log::error!("Failed to serialize settings: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn setters_clamp() {
        let mut s = Settings::default();
        s.set_canvas_zoom_percent(5);
        assert_eq!(s.canvas_zoom_percent, 20);
        s.set_canvas_zoom_percent(99);
        assert_eq!(s.canvas_zoom_percent, 80);
        s.set_advance_delay_ms(0);
        assert_eq!(s.advance_delay_ms, 1);
        s.set_advance_delay_ms(60_000);
        assert_eq!(s.advance_delay_ms, 1000);
        s.set_feather_radius(0);
        assert_eq!(s.feather_radius, 1);
    }

    #[test]
    fn save_then_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");
        let mut s = Settings::default();
        s.feather_enabled = true;
        s.set_feather_radius(7);
        s.last_directory = Some(PathBuf::from("/work/merged"));
        s.save(&path);
        assert_eq!(Settings::load(&path), s);
    }

    #[test]
    fn partial_and_out_of_range_files_are_repaired() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{ "canvas_zoom_percent": 150, "keep_tools_visible": true }"#).unwrap();
        let s = Settings::load(&path);
        assert_eq!(s.canvas_zoom_percent, 80);
        assert!(s.keep_tools_visible);
        assert_eq!(s.advance_delay_ms, 100);
    }

    #[test]
    fn garbage_falls_back_to_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "{{{").unwrap();
        assert_eq!(Settings::load(&path), Settings::default());
        assert_eq!(Settings::load(&dir.path().join("missing.json")), Settings::default());
    }
}
