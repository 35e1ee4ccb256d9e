//! Markdown parser adapter.
//!
//! Wraps pulldown-cmark's offset iterator and rebuilds its event stream
//! into a [`MarkdownNode`] tree whose ranges are parser-style line/column
//! locations.

use std::ops::Range;

use pulldown_cmark::{CodeBlockKind, Event, Options, Parser, Tag};
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use crate::ast::{MarkdownNode, NodeKind};
use crate::frontmatter::{FrontmatterBlock, detect_frontmatter};
use crate::position::{LineIndex, SourceRange};

/// Parser feature switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParseOptions {
    /// GitHub-style blockquote tags (`> [!NOTE]`).
    pub block_directives: bool,
    /// `[[Page]]` style links.
    pub symbol_links: bool,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            block_directives: true,
            symbol_links: true,
        }
    }
}

impl ParseOptions {
    pub fn to_pulldown(self) -> Options {
        let mut options = Options::ENABLE_TABLES
            | Options::ENABLE_STRIKETHROUGH
            | Options::ENABLE_YAML_STYLE_METADATA_BLOCKS
            | Options::ENABLE_PLUSES_DELIMITED_METADATA_BLOCKS;
        if self.block_directives {
            options |= Options::ENABLE_GFM;
        }
        if self.symbol_links {
            options |= Options::ENABLE_WIKILINKS;
        }
        options
    }
}

/// One parse of one document revision.
#[derive(Debug, Clone)]
pub struct ParsedDocument {
    pub text: String,
    pub frontmatter: Option<FrontmatterBlock>,
    pub tree: MarkdownNode,
}

/// Detect frontmatter and parse the full text.
///
/// The parser always sees the whole document so its locations line up
/// with the text; body spans inside the frontmatter are discarded later.
pub fn parse_document(text: String, options: ParseOptions) -> ParsedDocument {
    let frontmatter = detect_frontmatter(&text);
    let tree = parse_markdown(&text, options);
    ParsedDocument {
        text,
        frontmatter,
        tree,
    }
}

/// Parse markdown into a located tree.
pub fn parse_markdown(text: &str, options: ParseOptions) -> MarkdownNode {
    let index = LineIndex::new(text);
    let locate = |range: Range<usize>| {
        SourceRange::new(index.location(range.start), index.location(range.end))
    };

    let mut stack = vec![MarkdownNode::new(
        NodeKind::Document,
        Some(locate(0..text.len())),
    )];
    let mut event_count = 0usize;

    for (event, range) in Parser::new_ext(text, options.to_pulldown()).into_offset_iter() {
        event_count += 1;
        match event {
            Event::Start(tag) => {
                stack.push(MarkdownNode::new(kind_for_tag(&tag), Some(locate(range))));
            }
            Event::End(_) => {
                // The root never closes.
                if stack.len() > 1 {
                    if let Some(node) = stack.pop() {
                        attach(&mut stack, node);
                    }
                }
            }
            Event::Code(code) => {
                let leaf = MarkdownNode::new(NodeKind::InlineCode, Some(locate(range)))
                    .with_children(vec![MarkdownNode::new(
                        NodeKind::Text(SmolStr::new(&*code)),
                        None,
                    )]);
                attach(&mut stack, leaf);
            }
            Event::Text(text) => {
                attach(
                    &mut stack,
                    MarkdownNode::new(NodeKind::Text(SmolStr::new(&*text)), Some(locate(range))),
                );
            }
            _ => {}
        }
    }

    tracing::trace!(target: "livemark::parse", event_count, len = text.len(), "parsed markdown");

    // Close anything left open so the tree is always well formed.
    while let Some(node) = stack.pop() {
        match stack.last_mut() {
            Some(parent) => parent.children.push(node),
            None => return node,
        }
    }
    MarkdownNode::new(NodeKind::Document, None)
}

fn attach(stack: &mut [MarkdownNode], node: MarkdownNode) {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(node);
    }
}

fn kind_for_tag(tag: &Tag<'_>) -> NodeKind {
    match tag {
        Tag::Paragraph => NodeKind::Paragraph,
        Tag::Heading { level, .. } => NodeKind::Heading {
            level: *level as u8,
        },
        Tag::BlockQuote(_) => NodeKind::BlockQuote,
        Tag::CodeBlock(kind) => NodeKind::CodeBlock {
            fenced: matches!(kind, CodeBlockKind::Fenced(_)),
        },
        Tag::Emphasis => NodeKind::Emphasis,
        Tag::Strong => NodeKind::Strong,
        Tag::Strikethrough => NodeKind::Strikethrough,
        Tag::Link { dest_url, .. } => NodeKind::Link {
            destination: SmolStr::new(&**dest_url),
        },
        Tag::Image {
            dest_url, title, ..
        } => NodeKind::Image {
            source: SmolStr::new(&**dest_url),
            title: SmolStr::new(&**title),
        },
        Tag::Table(_) => NodeKind::Table,
        Tag::TableHead => NodeKind::TableHead,
        Tag::TableRow => NodeKind::TableRow,
        Tag::TableCell => NodeKind::TableCell,
        _ => NodeKind::Other,
    }
}
