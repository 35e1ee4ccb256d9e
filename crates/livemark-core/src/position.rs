//! Source location to document offset mapping.
//!
//! Markdown parsers report positions as 1-based line numbers plus 1-based
//! UTF-8 byte columns. The display addresses text in UTF-16 code units.
//! Reusing byte columns directly misplaces styling on any line with
//! non-ASCII content, so every location goes through [`PositionMapper`].

use std::ops::Range;

use crate::error::PositionError;
use crate::text::utf16_len;

/// A parser location: 1-based line, 1-based UTF-8 byte column.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SourceLocation {
    pub line: usize,
    pub column: usize,
}

impl SourceLocation {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

/// A parser range, end exclusive.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SourceRange {
    pub start: SourceLocation,
    pub end: SourceLocation,
}

impl SourceRange {
    pub fn new(start: SourceLocation, end: SourceLocation) -> Self {
        Self { start, end }
    }
}

/// Line table for a document.
///
/// `\n` and `\r\n` each count as one line break; a lone `\r` does not.
/// A document always has at least one (possibly empty) line, and a trailing
/// break opens a final empty line.
#[derive(Clone, Debug)]
pub struct LineIndex {
    /// Byte range of each line's content, terminator excluded.
    lines: Vec<Range<usize>>,
    /// UTF-16 offset of each line start.
    utf16_starts: Vec<usize>,
}

impl LineIndex {
    pub fn new(text: &str) -> Self {
        let bytes = text.as_bytes();
        let mut lines = Vec::new();
        let mut utf16_starts = Vec::new();
        let mut line_start = 0;
        let mut utf16_offset = 0;

        for (idx, &byte) in bytes.iter().enumerate() {
            if byte == b'\n' {
                let content_end = if idx > line_start && bytes[idx - 1] == b'\r' {
                    idx - 1
                } else {
                    idx
                };
                lines.push(line_start..content_end);
                utf16_starts.push(utf16_offset);
                utf16_offset += utf16_len(&text[line_start..=idx]);
                line_start = idx + 1;
            }
        }
        lines.push(line_start..text.len());
        utf16_starts.push(utf16_offset);

        Self {
            lines,
            utf16_starts,
        }
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// Byte range of a 1-based line's content, terminator excluded.
    pub fn line_bytes(&self, line: usize) -> Option<Range<usize>> {
        line.checked_sub(1)
            .and_then(|idx| self.lines.get(idx))
            .cloned()
    }

    /// Locate a byte offset as a parser-style location.
    ///
    /// Offsets that fall inside a line terminator clamp to the end of that
    /// line's content.
    pub fn location(&self, byte_offset: usize) -> SourceLocation {
        let idx = self
            .lines
            .partition_point(|line| line.start <= byte_offset)
            .saturating_sub(1);
        let line = &self.lines[idx];
        let column = byte_offset.min(line.end).saturating_sub(line.start) + 1;
        SourceLocation::new(idx + 1, column)
    }
}

/// Converts parser locations into UTF-16 document offsets.
#[derive(Clone, Debug)]
pub struct PositionMapper<'a> {
    text: &'a str,
    index: LineIndex,
}

impl<'a> PositionMapper<'a> {
    pub fn new(text: &'a str) -> Self {
        Self {
            text,
            index: LineIndex::new(text),
        }
    }

    pub fn line_index(&self) -> &LineIndex {
        &self.index
    }

    /// Convert a single location to an absolute UTF-16 offset.
    ///
    /// The column may point one past the last byte of the line (end of
    /// line) but no further.
    pub fn offset(&self, location: SourceLocation) -> Result<usize, PositionError> {
        let SourceLocation { line, column } = location;
        if line == 0 || column == 0 {
            return Err(PositionError::ZeroBased { line, column });
        }
        let bytes = self
            .index
            .line_bytes(line)
            .ok_or(PositionError::LineOutOfRange {
                line,
                line_count: self.index.line_count(),
            })?;
        let content = &self.text[bytes];
        let byte_column = column - 1;
        if byte_column > content.len() {
            return Err(PositionError::ColumnOutOfRange {
                line,
                column,
                line_len: content.len(),
            });
        }
        if !content.is_char_boundary(byte_column) {
            return Err(PositionError::NotCharBoundary { line, column });
        }
        Ok(self.index.utf16_starts[line - 1] + utf16_len(&content[..byte_column]))
    }

    /// Convert a parser range to a UTF-16 range.
    pub fn range(&self, range: SourceRange) -> Result<Range<usize>, PositionError> {
        let start = self.offset(range.start)?;
        let end = self.offset(range.end)?;
        if start > end {
            return Err(PositionError::Inverted { start, end });
        }
        Ok(start..end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loc(line: usize, column: usize) -> SourceLocation {
        SourceLocation::new(line, column)
    }

    #[test]
    fn ascii_offsets() {
        let mapper = PositionMapper::new("abc\ndef");
        assert_eq!(mapper.offset(loc(1, 1)), Ok(0));
        assert_eq!(mapper.offset(loc(1, 4)), Ok(3));
        assert_eq!(mapper.offset(loc(2, 1)), Ok(4));
        assert_eq!(mapper.offset(loc(2, 4)), Ok(7));
    }

    #[test]
    fn multibyte_columns_translate_to_utf16() {
        // "é" is 2 bytes / 1 unit, "😀" is 4 bytes / 2 units.
        let mapper = PositionMapper::new("# é😀 x\nnext");
        // Byte column of "x": "# " (2) + é (2) + 😀 (4) + " " (1) = 9, so column 10.
        assert_eq!(mapper.offset(loc(1, 10)), Ok(6));
        // Second line starts after 7 units + newline.
        assert_eq!(mapper.offset(loc(2, 1)), Ok(8));
    }

    #[test]
    fn crlf_counts_as_one_break() {
        let mapper = PositionMapper::new("ab\r\ncd\r\n");
        assert_eq!(mapper.line_index().line_count(), 3);
        assert_eq!(mapper.offset(loc(2, 1)), Ok(4));
        assert_eq!(mapper.offset(loc(2, 3)), Ok(6));
        assert_eq!(mapper.offset(loc(3, 1)), Ok(8));
    }

    #[test]
    fn lone_carriage_return_is_not_a_break() {
        let mapper = PositionMapper::new("a\rb\nc");
        assert_eq!(mapper.line_index().line_count(), 2);
        assert_eq!(mapper.offset(loc(1, 4)), Ok(3));
    }

    #[test]
    fn out_of_range_locations_fail() {
        let mapper = PositionMapper::new("abc\nde");
        assert_eq!(
            mapper.offset(loc(3, 1)),
            Err(PositionError::LineOutOfRange {
                line: 3,
                line_count: 2
            })
        );
        assert_eq!(
            mapper.offset(loc(2, 4)),
            Err(PositionError::ColumnOutOfRange {
                line: 2,
                column: 4,
                line_len: 2
            })
        );
        assert!(matches!(
            mapper.offset(loc(0, 1)),
            Err(PositionError::ZeroBased { .. })
        ));
    }

    #[test]
    fn column_inside_a_character_fails() {
        let mapper = PositionMapper::new("é");
        assert_eq!(
            mapper.offset(loc(1, 2)),
            Err(PositionError::NotCharBoundary { line: 1, column: 2 })
        );
    }

    #[test]
    fn inverted_range_fails() {
        let mapper = PositionMapper::new("abcdef");
        let range = SourceRange::new(loc(1, 4), loc(1, 2));
        assert_eq!(
            mapper.range(range),
            Err(PositionError::Inverted { start: 3, end: 1 })
        );
        let range = SourceRange::new(loc(1, 2), loc(1, 4));
        assert_eq!(mapper.range(range), Ok(1..3));
    }

    #[test]
    fn locations_on_different_lines_never_collide() {
        let text = "a😀\n\nλx\r\nend";
        let mapper = PositionMapper::new(text);
        let index = mapper.line_index();
        let mut seen = std::collections::HashMap::new();
        for line in 1..=index.line_count() {
            let bytes = index.line_bytes(line).unwrap();
            let content = &text[bytes.clone()];
            for column in 1..=content.len() + 1 {
                if let Ok(offset) = mapper.offset(loc(line, column)) {
                    if let Some(other_line) = seen.insert(offset, line) {
                        assert_eq!(other_line, line, "offset {offset} reached from two lines");
                    }
                }
            }
        }
    }

    #[test]
    fn byte_offsets_round_trip_through_locations() {
        let text = "ab\r\nλ😀\nz";
        let index = LineIndex::new(text);
        assert_eq!(index.location(0), loc(1, 1));
        assert_eq!(index.location(2), loc(1, 3));
        // Inside the CRLF terminator clamps to end of line.
        assert_eq!(index.location(3), loc(1, 3));
        assert_eq!(index.location(4), loc(2, 1));
        assert_eq!(index.location(text.len()), loc(3, 2));

        let mapper = PositionMapper::new(text);
        assert_eq!(mapper.offset(index.location(6)), Ok(5));
    }
}
