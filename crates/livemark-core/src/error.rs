//! Error types for the styling core.
//!
//! Nothing here is ever surfaced to the user: callers log and degrade
//! (drop the span, show literal text, skip the stale result).

use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

/// Failure converting a parser source location into a document offset.
#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
pub enum PositionError {
    #[error("line and column are 1-based, got {line}:{column}")]
    #[diagnostic(code(livemark::position::zero_based))]
    ZeroBased { line: usize, column: usize },

    #[error("line {line} is past the end of the document ({line_count} lines)")]
    #[diagnostic(code(livemark::position::line_out_of_range))]
    LineOutOfRange { line: usize, line_count: usize },

    #[error("column {column} is past the end of line {line} ({line_len} bytes)")]
    #[diagnostic(code(livemark::position::column_out_of_range))]
    ColumnOutOfRange {
        line: usize,
        column: usize,
        line_len: usize,
    },

    #[error("column {column} on line {line} falls inside a multi-byte character")]
    #[diagnostic(code(livemark::position::not_char_boundary))]
    NotCharBoundary { line: usize, column: usize },

    #[error("range start {start} is after range end {end}")]
    #[diagnostic(code(livemark::position::inverted))]
    Inverted { start: usize, end: usize },
}

/// Failure resolving or loading an image referenced from markdown.
#[derive(Debug, Error, Diagnostic)]
pub enum ImageError {
    #[error("image source is empty")]
    #[diagnostic(code(livemark::image::empty_source))]
    EmptySource,

    #[error("remote images are disabled: {0}")]
    #[diagnostic(code(livemark::image::remote_disabled))]
    RemoteDisabled(String),

    #[error("site-relative image {0} has no site root to resolve against")]
    #[diagnostic(code(livemark::image::no_site_root))]
    NoSiteRoot(String),

    #[error("image path {} escapes the site and document directories", .0.display())]
    #[diagnostic(code(livemark::image::escapes_sandbox))]
    EscapesSandbox(PathBuf),

    #[error("invalid image url: {0}")]
    #[diagnostic(code(livemark::image::invalid_url))]
    InvalidUrl(String),

    #[error("remote image loading is not available for {0}")]
    #[diagnostic(code(livemark::image::remote_unavailable))]
    RemoteUnavailable(String),

    #[error("failed to load image {}", path.display())]
    #[diagnostic(code(livemark::image::decode))]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("image {0} has no pixels")]
    #[diagnostic(code(livemark::image::zero_sized))]
    ZeroSized(String),
}

/// Failure talking to the background parse worker.
#[derive(Debug, Error, Diagnostic)]
pub enum WorkerError {
    #[error("parse worker has shut down")]
    #[diagnostic(code(livemark::worker::disconnected))]
    Disconnected,

    #[error("failed to spawn parse worker")]
    #[diagnostic(code(livemark::worker::spawn))]
    Spawn(#[from] std::io::Error),
}
