use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::Result;

/// Top-level configuration structure for the tour and its page helpers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TourConfig {
    /// Upper bound of the seek slider. The lower bound is always zero.
    pub slider_max: f64,
    pub highlight: HighlightConfig,
    /// Id of the element that hosts the "start tour" button.
    pub startup_container_id: String,
    /// Preference key under which the auto-scroll flag is persisted.
    pub auto_scroll_key: String,
    pub page: PageConfig,
}

impl Default for TourConfig {
    fn default() -> Self {
        Self {
            slider_max: 200.0,
            highlight: HighlightConfig::default(),
            startup_container_id: "virtual-tour-startup-container".to_string(),
            auto_scroll_key: "virtualTourAutoScroll".to_string(),
            page: PageConfig::default(),
        }
    }
}

impl TourConfig {
    /// Reads a JSON configuration file. Missing fields fall back to defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }
}

/// Timing and colour of the highlight flash applied by the tour.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HighlightConfig {
    pub color: String,
    pub flash_ms: u64,
    pub fade_ms: u64,
}

impl Default for HighlightConfig {
    fn default() -> Self {
        Self {
            color: "rgb(255, 244, 214)".to_string(),
            flash_ms: 200,
            fade_ms: 600,
        }
    }
}

/// Settings for the page chrome helpers (transitions and text scaling).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PageConfig {
    pub fade_out_ms: u64,
    pub min_font_size: f64,
}

impl Default for PageConfig {
    fn default() -> Self {
        Self {
            fade_out_ms: 50,
            min_font_size: 1.0,
        }
    }
}
