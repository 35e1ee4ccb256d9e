//! Style pass orchestration.
//!
//! A full pass restyles the whole document from a fresh parse and returns
//! the cache the incremental pass reuses on cursor moves.

use web_time::Instant;

use crate::attributes::StyledText;
use crate::collector::collect_document_spans;
use crate::config::EditorPreferences;
use crate::parse::ParsedDocument;
use crate::render::ImageRenderer;
use crate::render_cache::StylePassCache;
use crate::style::StyleContext;
use crate::syntax::compute_markers;
use crate::text::EditorRope;
use crate::theme::Theme;
use crate::visibility::{VisibilityStats, apply_full, apply_incremental, restyle_range};

/// Everything a pass reads besides the document.
#[derive(Debug, Clone, Copy)]
pub struct PassEnv<'a, R> {
    pub theme: &'a Theme,
    pub theme_revision: u64,
    pub preferences: &'a EditorPreferences,
    pub images: R,
}

impl<'a, R: ImageRenderer> PassEnv<'a, R> {
    pub fn new(theme: &'a Theme, preferences: &'a EditorPreferences, images: R) -> Self {
        Self {
            theme,
            theme_revision: 0,
            preferences,
            images,
        }
    }

    pub fn with_theme_revision(mut self, revision: u64) -> Self {
        self.theme_revision = revision;
        self
    }

    pub fn style(&self) -> StyleContext<'a> {
        StyleContext::new(self.theme, self.preferences)
    }
}

/// Restyle `storage` from scratch for `doc` with the cursor at `cursor`.
///
/// `storage` must hold exactly `doc.text`.
pub fn run_full_pass<S, R>(
    doc: &ParsedDocument,
    generation: u64,
    storage: &mut S,
    cursor: usize,
    env: &PassEnv<'_, R>,
) -> StylePassCache
where
    S: StyledText,
    R: ImageRenderer,
{
    let started = Instant::now();
    let ctx = env.style();

    let spans = collect_document_spans(doc);
    let rope = EditorRope::from(doc.text.as_str());
    let marker_set = compute_markers(&spans, &rope, doc.frontmatter.as_ref());

    let cache = StylePassCache {
        spans,
        markers: marker_set.markers,
        images: marker_set.images,
        font_size: env.preferences.font_size,
        line_spacing: env.preferences.line_spacing,
        theme_revision: env.theme_revision,
        generation,
    };

    storage.begin_editing();
    let len = storage.len_utf16();
    restyle_range(storage, 0..len, &cache.spans, &ctx);
    let stats = apply_full(storage, &cache, cursor, &env.images);
    storage.end_editing();

    if tracing::enabled!(target: "livemark::render", tracing::Level::DEBUG) {
        tracing::debug!(
            target: "livemark::render",
            generation,
            spans = cache.spans.len(),
            markers = cache.markers.len(),
            images = cache.images.len(),
            hidden = stats.hidden,
            images_rendered = stats.images_rendered,
            elapsed_us = started.elapsed().as_micros() as u64,
            "full style pass"
        );
    }
    cache
}

/// Restyle only what a cursor move changed.
pub fn run_incremental_pass<S, R>(
    storage: &mut S,
    cache: &StylePassCache,
    old_cursor: usize,
    new_cursor: usize,
    env: &PassEnv<'_, R>,
) -> VisibilityStats
where
    S: StyledText,
    R: ImageRenderer,
{
    if old_cursor == new_cursor {
        return VisibilityStats::default();
    }
    storage.begin_editing();
    let stats = apply_incremental(
        storage,
        cache,
        old_cursor,
        new_cursor,
        &env.style(),
        &env.images,
    );
    storage.end_editing();
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attributes::AttributedString;
    use crate::parse::{ParseOptions, parse_document};
    use crate::style::HIDDEN_FONT_SIZE;

    fn full(text: &str, cursor: usize) -> (AttributedString, StylePassCache) {
        let theme = Theme::default();
        let prefs = EditorPreferences::default();
        let env = PassEnv::new(&theme, &prefs, ());
        let doc = parse_document(text.to_string(), ParseOptions::default());
        let mut storage = AttributedString::new(text);
        let cache = run_full_pass(&doc, 1, &mut storage, cursor, &env);
        (storage, cache)
    }

    #[test]
    fn heading_marker_follows_cursor() {
        let text = "# Heading\n\nParagraph";
        let (storage, _) = full(text, 15);
        let marker = storage.attributes_at(0).cloned().unwrap_or_default();
        assert_eq!(marker.font_size, Some(HIDDEN_FONT_SIZE));

        let (storage, _) = full(text, 4);
        let theme = Theme::default();
        let natural = theme.heading_size(1, EditorPreferences::default().font_size);
        assert_eq!(storage.attributes_at(0).and_then(|a| a.font_size), Some(natural));
    }

    #[test]
    fn quoted_fences_hide_together() {
        let text = "> ```\n> code\n> ```\n\nx";
        let (storage, _) = full(text, 21);
        let size = |offset| storage.attributes_at(offset).and_then(|a| a.font_size);
        assert_eq!(size(2), Some(HIDDEN_FONT_SIZE));
        assert_eq!(size(15), Some(HIDDEN_FONT_SIZE));
        assert_eq!(size(17), Some(HIDDEN_FONT_SIZE));
        // Code text stays.
        assert_ne!(size(9), Some(HIDDEN_FONT_SIZE));
    }

    #[test]
    fn cache_records_inputs() {
        let (_, cache) = full("Some **bold** word", 0);
        assert_eq!(cache.generation, 1);
        assert_eq!(cache.markers.len(), 2);
        assert!(cache.is_valid_for(&EditorPreferences::default(), 0, 1));
    }

    #[test]
    fn incremental_matches_full_pass() {
        let text = "# Title\n\n> quote with **bold**\n\nSome *it* and `code`";
        let theme = Theme::default();
        let prefs = EditorPreferences::default();
        let env = PassEnv::new(&theme, &prefs, ());
        let doc = parse_document(text.to_string(), ParseOptions::default());

        let mut moved = AttributedString::new(text);
        let cache = run_full_pass(&doc, 1, &mut moved, 0, &env);
        let mut cursor = 0;
        for next in [3, 12, 25, 40, 47, 0, 30] {
            run_incremental_pass(&mut moved, &cache, cursor, next, &env);
            cursor = next;

            let mut fresh = AttributedString::new(text);
            run_full_pass(&doc, 1, &mut fresh, next, &env);
            assert_eq!(moved.runs(), fresh.runs(), "cursor {next}");
        }
    }

    #[test]
    fn passes_batch_their_edits() {
        let theme = Theme::default();
        let prefs = EditorPreferences::default();
        let env = PassEnv::new(&theme, &prefs, ());
        let doc = parse_document("**a**".to_string(), ParseOptions::default());
        let mut storage = AttributedString::new("**a**");
        let cache = run_full_pass(&doc, 1, &mut storage, 0, &env);
        run_incremental_pass(&mut storage, &cache, 0, 9, &env);
        assert_eq!(storage.batches(), 2);
        // Same position: nothing to do, no batch.
        run_incremental_pass(&mut storage, &cache, 9, 9, &env);
        assert_eq!(storage.batches(), 2);
    }
}
