//! Editor preferences and render settings.
//!
//! Both load from partial settings documents: every field has a default.

use serde::{Deserialize, Serialize};

use crate::parse::ParseOptions;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorPreferences {
    pub font_size: f32,
    pub line_spacing: f32,
}

impl Default for EditorPreferences {
    fn default() -> Self {
        Self {
            font_size: 16.0,
            line_spacing: 1.4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageCacheLimits {
    pub max_count: usize,
    /// Approximate decoded bytes.
    pub max_total_cost: usize,
}

impl Default for ImageCacheLimits {
    fn default() -> Self {
        Self {
            max_count: 64,
            max_total_cost: 256 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderSettings {
    /// Quiet period after the last keystroke before a reparse.
    pub debounce_ms: u64,
    pub max_image_width: u32,
    pub remote_images: bool,
    pub image_cache: ImageCacheLimits,
    pub parse: ParseOptions,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            debounce_ms: 150,
            max_image_width: 640,
            remote_images: false,
            image_cache: ImageCacheLimits::default(),
            parse: ParseOptions::default(),
        }
    }
}

impl RenderSettings {
    pub fn debounce(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.debounce_ms)
    }
}
