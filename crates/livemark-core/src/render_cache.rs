//! Style pass caching.
//!
//! A full pass records everything the incremental pass needs to restyle on
//! cursor moves without reparsing: spans, markers, image spans, and the
//! inputs they were styled with.

use crate::config::EditorPreferences;
use crate::syntax::{ImageSpan, SyntaxMarker};
use crate::types::StyleSpan;

/// Result of the last full style pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StylePassCache {
    /// Document order, outer constructs first.
    pub spans: Vec<StyleSpan>,
    pub markers: Vec<SyntaxMarker>,
    pub images: Vec<ImageSpan>,
    pub font_size: f32,
    pub line_spacing: f32,
    pub theme_revision: u64,
    /// Document revision the spans were parsed from.
    pub generation: u64,
}

impl StylePassCache {
    /// Whether an incremental pass may reuse this cache.
    ///
    /// Cursor moves never invalidate; reparse, theme change, and
    /// preference change all do.
    pub fn is_valid_for(
        &self,
        preferences: &EditorPreferences,
        theme_revision: u64,
        generation: u64,
    ) -> bool {
        self.generation == generation
            && self.theme_revision == theme_revision
            && self.font_size == preferences.font_size
            && self.line_spacing == preferences.line_spacing
    }

    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }
}
