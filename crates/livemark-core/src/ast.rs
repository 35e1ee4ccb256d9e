//! Parsed markdown tree with source locations.
//!
//! This is the shape the style collector consumes. Ranges are parser
//! locations (line, UTF-8 column); a node without a range cannot be styled
//! and is skipped.

use smol_str::SmolStr;

use crate::position::SourceRange;

/// Constructs the collector distinguishes. Everything else is `Other`,
/// whose children are still walked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Document,
    Paragraph,
    Heading { level: u8 },
    Emphasis,
    Strong,
    Strikethrough,
    InlineCode,
    Link { destination: SmolStr },
    Image { source: SmolStr, title: SmolStr },
    BlockQuote,
    CodeBlock { fenced: bool },
    Table,
    TableHead,
    TableRow,
    TableCell,
    Text(SmolStr),
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkdownNode {
    pub kind: NodeKind,
    pub range: Option<SourceRange>,
    pub children: Vec<MarkdownNode>,
}

impl MarkdownNode {
    pub fn new(kind: NodeKind, range: Option<SourceRange>) -> Self {
        Self {
            kind,
            range,
            children: Vec::new(),
        }
    }

    pub fn with_children(mut self, children: Vec<MarkdownNode>) -> Self {
        self.children = children;
        self
    }

    /// Concatenated text of all descendant text nodes (image alt text).
    pub fn plain_text(&self) -> String {
        let mut out = String::new();
        self.push_text(&mut out);
        out
    }

    fn push_text(&self, out: &mut String) {
        if let NodeKind::Text(text) = &self.kind {
            out.push_str(text);
        }
        for child in &self.children {
            child.push_text(out);
        }
    }
}
