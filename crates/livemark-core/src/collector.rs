//! Style span collection.
//!
//! Walks the parsed tree in document order and emits one [`StyleSpan`] per
//! supported construct. Parents are emitted before their children, so a
//! span list is always ordered outer-first for nested constructs.

use crate::ast::{MarkdownNode, NodeKind};
use crate::frontmatter::FrontmatterBlock;
use crate::parse::ParsedDocument;
use crate::position::PositionMapper;
use crate::types::{StyleKind, StyleSpan};

/// Collect spans for a parsed tree.
///
/// Nodes whose location cannot be mapped are dropped silently.
pub fn collect_spans(tree: &MarkdownNode, mapper: &PositionMapper<'_>) -> Vec<StyleSpan> {
    let mut collector = Collector {
        mapper,
        spans: Vec::new(),
        blockquote_depth: 0,
        dropped: 0,
    };
    collector.visit(tree);

    if collector.dropped > 0 {
        tracing::debug!(
            target: "livemark::render",
            dropped = collector.dropped,
            kept = collector.spans.len(),
            "dropped spans without a resolvable range"
        );
    }
    collector.spans
}

/// Collect spans for a whole document, frontmatter included.
///
/// Body spans touching the frontmatter block are discarded and the block
/// itself leads the list as a single `Frontmatter` span.
pub fn collect_document_spans(doc: &ParsedDocument) -> Vec<StyleSpan> {
    let mapper = PositionMapper::new(&doc.text);
    let body = collect_spans(&doc.tree, &mapper);
    match &doc.frontmatter {
        Some(block) => {
            let mut spans = vec![StyleSpan::new(
                StyleKind::Frontmatter,
                block.full_range.clone(),
            )];
            spans.extend(exclude_frontmatter(body, block));
            spans
        }
        None => body,
    }
}

/// Drop every span overlapping the frontmatter block.
pub fn exclude_frontmatter(spans: Vec<StyleSpan>, block: &FrontmatterBlock) -> Vec<StyleSpan> {
    spans
        .into_iter()
        .filter(|span| !block.overlaps(&span.range))
        .collect()
}

struct Collector<'a, 'm> {
    mapper: &'m PositionMapper<'a>,
    spans: Vec<StyleSpan>,
    blockquote_depth: usize,
    dropped: usize,
}

impl Collector<'_, '_> {
    fn visit(&mut self, node: &MarkdownNode) {
        match &node.kind {
            NodeKind::BlockQuote => {
                self.blockquote_depth += 1;
                self.emit(
                    node,
                    StyleKind::Blockquote {
                        nesting_level: self.blockquote_depth,
                    },
                );
                self.visit_children(node);
                self.blockquote_depth -= 1;
                return;
            }
            NodeKind::Image { source, .. } => {
                let source = (!source.is_empty()).then(|| source.clone());
                let alt = node.plain_text().into();
                self.emit(node, StyleKind::Image { source, alt });
                // Alt text is part of the image, not separately styled.
                return;
            }
            NodeKind::Heading { level } => {
                self.emit(
                    node,
                    StyleKind::Heading {
                        level: (*level).clamp(1, 6),
                    },
                );
            }
            NodeKind::Strong => self.emit(node, StyleKind::Bold),
            NodeKind::Emphasis => self.emit(node, StyleKind::Italic),
            NodeKind::Strikethrough => self.emit(node, StyleKind::Strikethrough),
            NodeKind::InlineCode => self.emit(node, StyleKind::InlineCode),
            NodeKind::Link { .. } => self.emit(node, StyleKind::Link),
            NodeKind::CodeBlock { .. } => self.emit(node, StyleKind::CodeBlock),
            NodeKind::Table => self.emit(node, StyleKind::Table),
            NodeKind::TableHead => self.emit(node, StyleKind::TableHeader),
            NodeKind::TableCell => self.emit(node, StyleKind::TableCell),
            NodeKind::Document
            | NodeKind::Paragraph
            | NodeKind::TableRow
            | NodeKind::Text(_)
            | NodeKind::Other => {}
        }
        self.visit_children(node);
    }

    fn visit_children(&mut self, node: &MarkdownNode) {
        for child in &node.children {
            self.visit(child);
        }
    }

    fn emit(&mut self, node: &MarkdownNode, kind: StyleKind) {
        let Some(source_range) = node.range else {
            self.dropped += 1;
            return;
        };
        match self.mapper.range(source_range) {
            Ok(range) => self.spans.push(StyleSpan::new(kind, range)),
            Err(err) => {
                tracing::trace!(
                    target: "livemark::render",
                    kind = kind.name(),
                    %err,
                    "span range did not map"
                );
                self.dropped += 1;
            }
        }
    }
}
