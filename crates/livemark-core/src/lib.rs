//! livemark-core: incremental WYSIWYG styling over markdown source.
//!
//! The text is never rewritten. Parsed constructs become attribute runs on
//! a host-owned styled-text buffer, syntax characters hide unless the
//! cursor is inside their construct, and cursor moves restyle only what
//! crossed a boundary.
//!
//! This crate provides:
//! - `PositionMapper` - parser line/column to UTF-16 offsets
//! - `detect_frontmatter` - YAML, TOML and JSON headers
//! - `collect_spans` / `compute_markers` - what to style, what to hide
//! - `run_full_pass` / `run_incremental_pass` - applying it to a `StyledText`
//! - `decode_entities` / `EntityTracker` - reversible character references
//! - `ImageCache` and `CachedImageRenderer` - images drawn in place
//! - `EditorSession` - revisions, debounced background parsing, save

pub mod ast;
pub mod attributes;
pub mod collector;
pub mod config;
pub mod delta;
pub mod entity;
pub mod error;
pub mod frontmatter;
pub mod images;
pub mod parse;
pub mod pass;
pub mod position;
pub mod render;
pub mod render_cache;
pub mod revision;
pub mod session;
pub mod style;
pub mod syntax;
pub mod text;
pub mod theme;
pub mod types;
pub mod visibility;

pub use attributes::{
    AttributedString, BlockquoteInfo, Color, ParagraphStyle, RenderedImage, StyledText,
    TextAttributes,
};
pub use collector::{collect_document_spans, collect_spans};
pub use config::{EditorPreferences, ImageCacheLimits, RenderSettings};
pub use delta::{TextDelta, text_delta};
pub use entity::{DecodedText, EntityMapping, EntityTracker, decode_entities, encode_entities};
pub use error::{ImageError, PositionError, WorkerError};
pub use frontmatter::{FrontmatterBlock, FrontmatterFormat, detect_frontmatter};
pub use images::{CachedImageRenderer, ImageCache, ImageContext, ResolvedImage, resolve_image};
pub use parse::{ParseOptions, ParsedDocument, parse_document};
pub use pass::{PassEnv, run_full_pass, run_incremental_pass};
pub use position::{LineIndex, PositionMapper, SourceLocation, SourceRange};
pub use render::ImageRenderer;
pub use render_cache::StylePassCache;
pub use revision::{Debouncer, ParseOutcome, ParseRequest, ParseWorker, RevisionCounter};
pub use session::EditorSession;
pub use smol_str::SmolStr;
pub use syntax::{ImageSpan, MarkerSet, SyntaxMarker, compute_markers};
pub use text::{EditorRope, TextBuffer};
pub use theme::{SharedTheme, Theme};
pub use types::{StyleKind, StyleSpan};
pub use visibility::VisibilityStats;
