//! Syntax marker calculation for conditional visibility.
//!
//! Derives, per style span, which literal characters are markdown syntax
//! (like `**`, `#`, `>`) so they can be shown or hidden based on cursor
//! position (Obsidian-style editing).

use std::ops::Range;

use smol_str::SmolStr;

use crate::frontmatter::FrontmatterBlock;
use crate::text::{TextBuffer, utf16_len};
use crate::types::{StyleKind, StyleSpan};

/// A run of syntax characters belonging to a span.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxMarker {
    /// What gets hidden.
    pub range: Range<usize>,
    /// What the cursor test runs against: the whole construct.
    pub parent_range: Range<usize>,
    /// Lets a reveal re-apply the right style.
    pub parent_kind: StyleKind,
    /// Empty blockquote continuation line: hide by color only, or the
    /// line's height collapses.
    pub preserve_line_height: bool,
}

impl SyntaxMarker {
    fn new(range: Range<usize>, span: &StyleSpan) -> Self {
        Self {
            range,
            parent_range: span.range.clone(),
            parent_kind: span.kind.clone(),
            preserve_line_height: false,
        }
    }

    /// Check if cursor is within the visibility range for this syntax.
    ///
    /// Inclusive at both ends: a cursor sitting just after the closing
    /// `**` still shows the markers. Two adjacent constructs can therefore
    /// both count the shared boundary as inside.
    pub fn cursor_in_range(&self, cursor: usize) -> bool {
        cursor_in_range(&self.parent_range, cursor)
    }
}

/// An image construct. Hidden or shown as a whole.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageSpan {
    pub range: Range<usize>,
    pub source: Option<SmolStr>,
    pub alt: SmolStr,
}

impl ImageSpan {
    pub fn cursor_in_range(&self, cursor: usize) -> bool {
        cursor_in_range(&self.range, cursor)
    }
}

/// Inclusive-both-ends cursor test shared by markers and images.
pub fn cursor_in_range(range: &Range<usize>, cursor: usize) -> bool {
    cursor >= range.start && cursor <= range.end
}

/// Output of one marker calculation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MarkerSet {
    pub markers: Vec<SyntaxMarker>,
    pub images: Vec<ImageSpan>,
}

/// Compute markers and image spans for every span.
pub fn compute_markers<T: TextBuffer>(
    spans: &[StyleSpan],
    text: &T,
    frontmatter: Option<&FrontmatterBlock>,
) -> MarkerSet {
    let mut set = MarkerSet::default();

    for span in spans {
        if let StyleKind::Image { source, alt } = &span.kind {
            set.images.push(ImageSpan {
                range: span.range.clone(),
                source: source.clone(),
                alt: alt.clone(),
            });
            continue;
        }
        if matches!(span.kind, StyleKind::Frontmatter) {
            if let Some(block) = frontmatter {
                set.markers.extend(
                    block
                        .delimiter_ranges
                        .iter()
                        .map(|range| SyntaxMarker::new(range.clone(), span)),
                );
            }
            continue;
        }
        let Some(source) = text.slice_utf16(span.range.clone()) else {
            tracing::trace!(
                target: "livemark::render",
                kind = span.kind.name(),
                range = ?span.range,
                "span range outside text, no markers"
            );
            continue;
        };
        markers_for_span(span, &source, &mut set.markers);
    }

    set
}

fn markers_for_span(span: &StyleSpan, source: &str, out: &mut Vec<SyntaxMarker>) {
    let start = span.range.start;
    let end = span.range.end;
    let len = span.range.len();
    let mut push = |range: Range<usize>, preserve_line_height: bool| {
        out.push(SyntaxMarker {
            preserve_line_height,
            ..SyntaxMarker::new(range, span)
        })
    };

    match &span.kind {
        StyleKind::Heading { level } => {
            if source.starts_with('#') {
                let hidden = (*level as usize + 1).min(len);
                push(start..start + hidden, false);
            } else if let Some(underline) = line_ranges(source).into_iter().skip(1).find(|line| {
                let text = &source[line.bytes.clone()];
                let trimmed = text.trim();
                !trimmed.is_empty() && trimmed.chars().all(|c| c == '=' || c == '-')
            }) {
                // Setext: the underline is the syntax.
                push(start + underline.utf16.start..start + underline.utf16.end, false);
            }
        }
        StyleKind::Bold | StyleKind::Strikethrough => {
            let width = if source.starts_with('~') && !source.starts_with("~~") {
                1
            } else {
                2
            };
            if len >= width * 2 {
                push(start..start + width, false);
                push(end - width..end, false);
            }
        }
        StyleKind::Italic => {
            if len >= 2 {
                push(start..start + 1, false);
                push(end - 1..end, false);
            }
        }
        StyleKind::InlineCode => {
            let width = if source.starts_with("``") && len >= 4 { 2 } else { 1 };
            if len >= width * 2 {
                push(start..start + width, false);
                push(end - width..end, false);
            }
        }
        StyleKind::Link => {
            if source.starts_with("[[") && source.ends_with("]]") && len >= 4 {
                push(start..start + 2, false);
                push(end - 2..end, false);
            } else if source.starts_with('[') {
                push(start..start + 1, false);
                if let Some(idx) = label_end(source)
                    .filter(|&idx| matches!(source.as_bytes().get(idx + 1), Some(b'(' | b'[')))
                {
                    push(start + utf16_len(&source[..idx])..end, false);
                }
            }
        }
        StyleKind::Blockquote { .. } => {
            for line in line_ranges(source) {
                let text = &source[line.bytes.clone()];
                let run = text.chars().take_while(|c| *c == '>' || *c == ' ').count();
                if run == 0 {
                    continue;
                }
                let range = start + line.utf16.start..start + line.utf16.start + run;
                push(range, run == text.chars().count());
            }
        }
        StyleKind::CodeBlock => {
            // Content per non-blank line, after any quote prefix and indentation.
            // The prefix belongs to an enclosing blockquote's marker.
            let lines: Vec<(usize, &str, usize)> = line_ranges(source)
                .into_iter()
                .filter_map(|line| {
                    let text = &source[line.bytes.clone()];
                    let prefix = text
                        .chars()
                        .take_while(|c| matches!(c, '>' | ' ' | '\t'))
                        .count();
                    let rest = &text[prefix..];
                    (!rest.trim().is_empty())
                        .then_some((line.utf16.start + prefix, rest, line.utf16.end))
                })
                .collect();
            let is_fence = |rest: &str| rest.starts_with("```") || rest.starts_with("~~~");
            let Some(&(first_start, first, first_end)) = lines.first() else {
                return;
            };
            if !is_fence(first) {
                // Indented code blocks have no fences.
                return;
            }
            push(start + first_start..start + first_end, false);
            if lines.len() > 1 {
                if let Some(&(last_start, _, last_end)) =
                    lines.last().filter(|(_, rest, _)| is_fence(rest))
                {
                    push(start + last_start..start + last_end, false);
                }
            }
        }
        StyleKind::Table | StyleKind::TableHeader | StyleKind::TableCell => {}
        // Handled by the caller.
        StyleKind::Frontmatter | StyleKind::Image { .. } => {}
    }
}

/// Byte index of the `]` closing the link label that opens `source`.
///
/// Nested brackets (an image inside a link) and backslash escapes are
/// skipped.
fn label_end(source: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut escaped = false;
    for (idx, byte) in source.bytes().enumerate() {
        match byte {
            _ if escaped => escaped = false,
            b'\\' => escaped = true,
            b'[' => depth += 1,
            b']' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(idx);
                }
            }
            _ => {}
        }
    }
    None
}

/// A physical line within a span, terminator excluded.
#[derive(Debug, Clone)]
struct LineRange {
    bytes: Range<usize>,
    utf16: Range<usize>,
}

fn line_ranges(source: &str) -> Vec<LineRange> {
    let mut out = Vec::new();
    let mut byte_offset = 0;
    let mut utf16_offset = 0;
    for line in source.split_inclusive('\n') {
        let content = line
            .strip_suffix('\n')
            .map(|l| l.strip_suffix('\r').unwrap_or(l))
            .unwrap_or(line);
        let content_units = utf16_len(content);
        out.push(LineRange {
            bytes: byte_offset..byte_offset + content.len(),
            utf16: utf16_offset..utf16_offset + content_units,
        });
        byte_offset += line.len();
        utf16_offset += utf16_len(line);
    }
    out
}
