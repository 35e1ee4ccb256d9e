//! Style spans: what was parsed where.
//!
//! Spans carry no text, only a classification over an absolute UTF-16
//! range of the document as it was when parsed. They are rebuilt wholesale
//! on every full pass and never mutated.

use std::ops::Range;

use smol_str::SmolStr;

/// The closed set of constructs the styling core understands.
///
/// Every consumer matches on this exhaustively, so a new construct fails
/// to compile everywhere it needs handling.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StyleKind {
    Heading { level: u8 },
    Bold,
    Italic,
    Strikethrough,
    InlineCode,
    Link,
    Blockquote { nesting_level: usize },
    CodeBlock,
    Table,
    TableHeader,
    TableCell,
    Frontmatter,
    Image { source: Option<SmolStr>, alt: SmolStr },
}

impl StyleKind {
    /// Short lowercase name, used in logs and snapshot listings.
    pub fn name(&self) -> &'static str {
        match self {
            StyleKind::Heading { .. } => "heading",
            StyleKind::Bold => "bold",
            StyleKind::Italic => "italic",
            StyleKind::Strikethrough => "strikethrough",
            StyleKind::InlineCode => "inline_code",
            StyleKind::Link => "link",
            StyleKind::Blockquote { .. } => "blockquote",
            StyleKind::CodeBlock => "code_block",
            StyleKind::Table => "table",
            StyleKind::TableHeader => "table_header",
            StyleKind::TableCell => "table_cell",
            StyleKind::Frontmatter => "frontmatter",
            StyleKind::Image { .. } => "image",
        }
    }

    pub fn is_image(&self) -> bool {
        matches!(self, StyleKind::Image { .. })
    }
}

/// One parsed construct over a UTF-16 range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleSpan {
    pub kind: StyleKind,
    pub range: Range<usize>,
}

impl StyleSpan {
    pub fn new(kind: StyleKind, range: Range<usize>) -> Self {
        Self { kind, range }
    }

    pub fn len(&self) -> usize {
        self.range.len()
    }

    pub fn is_empty(&self) -> bool {
        self.range.is_empty()
    }

    /// Whether this span shares at least one code unit with `range`.
    pub fn overlaps(&self, range: &Range<usize>) -> bool {
        self.range.start < range.end && range.start < self.range.end
    }
}

/// Intersection of two ranges, if non-empty.
pub fn intersect(a: &Range<usize>, b: &Range<usize>) -> Option<Range<usize>> {
    let start = a.start.max(b.start);
    let end = a.end.min(b.end);
    (start < end).then_some(start..end)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overlap_is_half_open() {
        let span = StyleSpan::new(StyleKind::Bold, 5..10);
        assert!(span.overlaps(&(9..12)));
        assert!(!span.overlaps(&(10..12)));
        assert!(!span.overlaps(&(0..5)));
    }

    #[test]
    fn intersect_ranges() {
        assert_eq!(intersect(&(0..5), &(3..8)), Some(3..5));
        assert_eq!(intersect(&(0..5), &(5..8)), None);
    }
}
