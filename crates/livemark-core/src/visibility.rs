//! Cursor visibility resolution.
//!
//! Markers and images outside the cursor's construct are hidden (or
//! substituted); inside, they show at their construct's natural style.
//! The incremental pass only touches entries whose inside/outside state
//! flipped between two cursor positions.

use std::ops::Range;

use crate::attributes::{Color, StyledText, TextAttributes};
use crate::render::ImageRenderer;
use crate::render_cache::StylePassCache;
use crate::style::{StyleContext, hidden};
use crate::syntax::{ImageSpan, SyntaxMarker};
use crate::types::{StyleSpan, intersect};

/// What a visibility pass touched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VisibilityStats {
    pub hidden: usize,
    pub revealed: usize,
    pub images_rendered: usize,
    pub image_fallbacks: usize,
}

impl VisibilityStats {
    pub fn touched(&self) -> usize {
        self.hidden + self.revealed + self.images_rendered + self.image_fallbacks
    }
}

/// Reset `range` to base attributes, then re-apply every span overlapping
/// it in list order.
///
/// Spans are ordered outer-first, so bold inside a heading ends up with
/// the heading's size and bold weight regardless of prior state.
pub fn restyle_range<S: StyledText>(
    storage: &mut S,
    range: Range<usize>,
    spans: &[StyleSpan],
    ctx: &StyleContext<'_>,
) {
    storage.set_attributes(range.clone(), &ctx.base());
    for span in spans {
        if let Some(overlap) = intersect(&span.range, &range) {
            storage.add_attributes(overlap, &ctx.for_kind(&span.kind));
        }
    }
}

pub fn hide_marker<S: StyledText>(storage: &mut S, marker: &SyntaxMarker) {
    storage.add_attributes(marker.range.clone(), &hidden(marker.preserve_line_height));
}

/// Substitute a rendered image over the span. Returns `false` when the
/// literal markdown stays.
pub fn show_image<S: StyledText, R: ImageRenderer>(
    storage: &mut S,
    image: &ImageSpan,
    renderer: &R,
) -> bool {
    let Some(source) = image.source.as_deref() else {
        return false;
    };
    match renderer.render_image(source) {
        Some(rendered) => {
            storage.add_attributes(
                image.range.clone(),
                &TextAttributes {
                    foreground: Some(Color::TRANSPARENT),
                    image: Some(rendered),
                    ..Default::default()
                },
            );
            true
        }
        None => false,
    }
}

/// Visibility for a freshly styled document.
///
/// Expects every range to already carry its base and per-kind style.
pub fn apply_full<S: StyledText, R: ImageRenderer>(
    storage: &mut S,
    cache: &StylePassCache,
    cursor: usize,
    renderer: &R,
) -> VisibilityStats {
    let mut stats = VisibilityStats::default();
    for marker in &cache.markers {
        if !marker.cursor_in_range(cursor) {
            hide_marker(storage, marker);
            stats.hidden += 1;
        }
    }
    for image in &cache.images {
        if !image.cursor_in_range(cursor) {
            record_image(&mut stats, show_image(storage, image, renderer));
        }
    }
    stats
}

/// Restyle only what changed between `old_cursor` and `new_cursor`.
pub fn apply_incremental<S: StyledText, R: ImageRenderer>(
    storage: &mut S,
    cache: &StylePassCache,
    old_cursor: usize,
    new_cursor: usize,
    ctx: &StyleContext<'_>,
    renderer: &R,
) -> VisibilityStats {
    let mut stats = VisibilityStats::default();
    let mut revealed: Vec<Range<usize>> = Vec::new();

    for marker in &cache.markers {
        let was = marker.cursor_in_range(old_cursor);
        let is = marker.cursor_in_range(new_cursor);
        match (was, is) {
            (false, true) => {
                restyle_range(storage, marker.range.clone(), &cache.spans, ctx);
                revealed.push(marker.range.clone());
                stats.revealed += 1;
            }
            (true, false) => {
                hide_marker(storage, marker);
                stats.hidden += 1;
            }
            _ => {}
        }
    }

    for image in &cache.images {
        let was = image.cursor_in_range(old_cursor);
        let is = image.cursor_in_range(new_cursor);
        match (was, is) {
            (false, true) => {
                restyle_range(storage, image.range.clone(), &cache.spans, ctx);
                revealed.push(image.range.clone());
                stats.revealed += 1;
            }
            (true, false) => record_image(&mut stats, show_image(storage, image, renderer)),
            _ => {}
        }
    }

    if !revealed.is_empty() {
        // A reveal resets its range wholesale, which can uncover nested
        // markers or images that must stay hidden.
        let overlaps_revealed =
            |range: &Range<usize>| revealed.iter().any(|r| intersect(r, range).is_some());
        for marker in &cache.markers {
            if !marker.cursor_in_range(new_cursor) && overlaps_revealed(&marker.range) {
                hide_marker(storage, marker);
            }
        }
        for image in &cache.images {
            if !image.cursor_in_range(new_cursor) && overlaps_revealed(&image.range) {
                show_image(storage, image, renderer);
            }
        }
    }

    tracing::trace!(
        target: "livemark::render",
        old_cursor,
        new_cursor,
        hidden = stats.hidden,
        revealed = stats.revealed,
        images = stats.images_rendered,
        "incremental visibility"
    );
    stats
}

fn record_image(stats: &mut VisibilityStats, rendered: bool) {
    if rendered {
        stats.images_rendered += 1;
    } else {
        stats.image_fallbacks += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attributes::{AttributedString, RenderedImage};
    use crate::config::EditorPreferences;
    use crate::style::HIDDEN_FONT_SIZE;
    use crate::syntax::compute_markers;
    use crate::text::EditorRope;
    use crate::theme::Theme;
    use crate::types::StyleKind;

    struct Fixture {
        storage: AttributedString,
        cache: StylePassCache,
        theme: Theme,
        prefs: EditorPreferences,
    }

    impl Fixture {
        fn new(text: &str, spans: Vec<StyleSpan>) -> Self {
            let set = compute_markers(&spans, &EditorRope::from(text), None);
            Self {
                storage: AttributedString::new(text),
                cache: StylePassCache {
                    spans,
                    markers: set.markers,
                    images: set.images,
                    ..Default::default()
                },
                theme: Theme::default(),
                prefs: EditorPreferences::default(),
            }
        }

        fn full(&mut self, cursor: usize, renderer: &impl ImageRenderer) -> VisibilityStats {
            let ctx = StyleContext::new(&self.theme, &self.prefs);
            let len = self.storage.len_utf16();
            restyle_range(&mut self.storage, 0..len, &self.cache.spans, &ctx);
            apply_full(&mut self.storage, &self.cache, cursor, renderer)
        }

        fn step(&mut self, old: usize, new: usize, renderer: &impl ImageRenderer) -> VisibilityStats {
            let ctx = StyleContext::new(&self.theme, &self.prefs);
            apply_incremental(&mut self.storage, &self.cache, old, new, &ctx, renderer)
        }

        fn size_at(&self, offset: usize) -> Option<f32> {
            self.storage.attributes_at(offset).and_then(|a| a.font_size)
        }
    }

    #[test]
    fn markers_hide_outside_and_reveal_inside() {
        let mut fx = Fixture::new(
            "Some **bold** word",
            vec![StyleSpan::new(StyleKind::Bold, 5..13)],
        );
        let stats = fx.full(0, &());
        assert_eq!(stats.hidden, 2);
        assert_eq!(fx.size_at(5), Some(HIDDEN_FONT_SIZE));
        assert_eq!(fx.size_at(12), Some(HIDDEN_FONT_SIZE));
        assert_eq!(fx.size_at(8), Some(16.0));

        let stats = fx.step(0, 8, &());
        assert_eq!(stats.revealed, 2);
        assert_eq!(fx.size_at(5), Some(16.0));
        assert_eq!(fx.storage.attributes_at(5).and_then(|a| a.bold), Some(true));

        // Moving within the construct touches nothing.
        assert_eq!(fx.step(8, 9, &()).touched(), 0);

        let stats = fx.step(9, 17, &());
        assert_eq!(stats.hidden, 2);
        assert_eq!(fx.size_at(6), Some(HIDDEN_FONT_SIZE));
    }

    #[test]
    fn reveal_recomputes_nested_style() {
        // "# **b**": bold inside a heading.
        let mut fx = Fixture::new(
            "# **b**\n\nx",
            vec![
                StyleSpan::new(StyleKind::Heading { level: 1 }, 0..8),
                StyleSpan::new(StyleKind::Bold, 2..7),
            ],
        );
        fx.full(9, &());
        let heading_size = fx.theme.heading_size(1, fx.prefs.font_size);
        assert_eq!(fx.size_at(2), Some(HIDDEN_FONT_SIZE));

        fx.step(9, 4, &());
        assert_eq!(fx.size_at(2), Some(heading_size));
        assert_eq!(fx.size_at(0), Some(heading_size));
    }

    #[test]
    fn empty_quote_line_keeps_its_height() {
        let mut fx = Fixture::new(
            "> a\n>\n> b\n\nx",
            vec![StyleSpan::new(StyleKind::Blockquote { nesting_level: 1 }, 0..10)],
        );
        fx.full(12, &());
        let attrs = fx.storage.attributes_at(4).cloned().unwrap_or_default();
        assert_eq!(attrs.font_size, Some(16.0));
        assert_eq!(attrs.foreground, Some(Color::TRANSPARENT));
        assert_eq!(fx.size_at(0), Some(HIDDEN_FONT_SIZE));
    }

    struct AlwaysRender;

    impl ImageRenderer for AlwaysRender {
        fn render_image(&self, source: &str) -> Option<RenderedImage> {
            Some(RenderedImage {
                cache_key: source.into(),
                width: 4,
                height: 2,
            })
        }
    }

    #[test]
    fn images_render_outside_and_fall_back_to_literal() {
        let text = "![a](p.png)\n\nx";
        let span = StyleSpan::new(
            StyleKind::Image {
                source: Some("p.png".into()),
                alt: "a".into(),
            },
            0..11,
        );

        let mut fx = Fixture::new(text, vec![span.clone()]);
        let stats = fx.full(13, &AlwaysRender);
        assert_eq!(stats.images_rendered, 1);
        assert!(fx.storage.attributes_at(3).and_then(|a| a.image.as_ref()).is_some());

        let stats = fx.step(13, 5, &AlwaysRender);
        assert_eq!(stats.revealed, 1);
        assert!(fx.storage.attributes_at(3).and_then(|a| a.image.as_ref()).is_none());

        let mut fx = Fixture::new(text, vec![span]);
        let stats = fx.full(13, &());
        assert_eq!(stats.image_fallbacks, 1);
        assert!(fx.storage.attributes_at(3).and_then(|a| a.image.as_ref()).is_none());
    }
}
