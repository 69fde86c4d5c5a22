use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use coinspot_core::shared::constants::{DEFAULT_SEARCH_RESOLUTION, DEFAULT_TARGET_FPS};

/// Run settings read from an optional JSON file. Missing fields take their
/// defaults; command-line flags override whatever the file says.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub target_fps: f32,
    pub grayscale: bool,
    pub capture_fps: f64,
    pub surface_width: f64,
    pub surface_height: f64,
    /// Any name `FillMode` parses, e.g. `aspect-fill` or `resizeAspectFill`.
    pub fill_mode: String,
    pub search_resolution: u32,
    pub loops: u32,
    pub realtime: bool,
    /// Emit a progress line every N processed frames.
    pub log_every: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            target_fps: DEFAULT_TARGET_FPS,
            grayscale: false,
            capture_fps: 30.0,
            surface_width: 390.0,
            surface_height: 844.0,
            fill_mode: "aspect-fill".to_string(),
            search_resolution: DEFAULT_SEARCH_RESOLUTION,
            loops: 1,
            realtime: false,
            log_every: 100,
        }
    }
}

impl Settings {
    pub fn load(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let data = fs::read_to_string(path)
            .map_err(|e| format!("Cannot read settings {}: {e}", path.display()))?;
        let settings = serde_json::from_str(&data)
            .map_err(|e| format!("Invalid settings {}: {e}", path.display()))?;
        Ok(settings)
    }
}
