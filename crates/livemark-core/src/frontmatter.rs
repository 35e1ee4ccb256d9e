//! Frontmatter detection.
//!
//! Content files may open with one metadata block: YAML between `---`
//! lines, TOML between `+++` lines, or a bare JSON object. The block is
//! excluded from body styling. Delimiters are reported separately from the
//! overall range so the display can hide the fences while showing the
//! payload.
//!
//! Malformed or unterminated blocks are simply "no frontmatter".

use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::text::utf16_len;

const BYTE_ORDER_MARK: char = '\u{FEFF}';

/// Metadata block syntax.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FrontmatterFormat {
    Yaml,
    Toml,
    Json,
}

impl FrontmatterFormat {
    /// Fence line for delimited formats.
    pub fn delimiter(self) -> Option<&'static str> {
        match self {
            FrontmatterFormat::Yaml => Some("---"),
            FrontmatterFormat::Toml => Some("+++"),
            FrontmatterFormat::Json => None,
        }
    }
}

/// The metadata block at the start of a document.
///
/// All ranges are UTF-16 code units into the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrontmatterBlock {
    pub format: FrontmatterFormat,
    /// From document start (byte-order mark included) through the closing
    /// delimiter or brace. The terminating line break is not part of it.
    pub full_range: Range<usize>,
    /// Opening and closing fence lines. Empty for JSON, whose braces belong
    /// to the payload.
    pub delimiter_ranges: Vec<Range<usize>>,
    /// Range of the metadata text itself.
    pub payload_range: Range<usize>,
    pub payload: String,
}

impl FrontmatterBlock {
    /// Whether a body range touches this block and must be discarded.
    pub fn overlaps(&self, range: &Range<usize>) -> bool {
        if range.is_empty() {
            return self.full_range.contains(&range.start);
        }
        range.start < self.full_range.end && self.full_range.start < range.end
    }
}

/// Find the frontmatter block, trying YAML, TOML, then JSON.
pub fn detect_frontmatter(text: &str) -> Option<FrontmatterBlock> {
    detect_delimited(text, FrontmatterFormat::Yaml)
        .or_else(|| detect_delimited(text, FrontmatterFormat::Toml))
        .or_else(|| detect_json(text))
}

fn bom_len(text: &str) -> usize {
    if text.starts_with(BYTE_ORDER_MARK) {
        BYTE_ORDER_MARK.len_utf8()
    } else {
        0
    }
}

/// Byte ranges of line contents (terminator excluded) starting at `from`.
fn lines_from(text: &str, from: usize) -> impl Iterator<Item = Range<usize>> + '_ {
    let mut offset = from;
    text[from..].split_inclusive('\n').map(move |line| {
        let start = offset;
        offset += line.len();
        let content = line
            .strip_suffix('\n')
            .map(|l| l.strip_suffix('\r').unwrap_or(l))
            .unwrap_or(line);
        start..start + content.len()
    })
}

fn detect_delimited(text: &str, format: FrontmatterFormat) -> Option<FrontmatterBlock> {
    let marker = format.delimiter()?;
    let start = bom_len(text);
    let mut lines = lines_from(text, start);

    let opening = lines.next()?;
    if text[opening.clone()].trim_end() != marker {
        return None;
    }

    let closing = lines.find(|line| text[line.clone()].trim() == marker)?;

    let payload_start = (opening.end..closing.start)
        .find(|&idx| text.as_bytes()[idx] == b'\n')
        .map(|idx| idx + 1)
        .unwrap_or(closing.start);
    let payload_bytes = payload_start..closing.start;

    tracing::trace!(
        target: "livemark::frontmatter",
        ?format,
        end_byte = closing.end,
        "detected delimited frontmatter"
    );

    let to_utf16 = |r: Range<usize>| utf16_len(&text[..r.start])..utf16_len(&text[..r.end]);
    Some(FrontmatterBlock {
        format,
        full_range: to_utf16(0..closing.end),
        delimiter_ranges: vec![to_utf16(opening), to_utf16(closing)],
        payload_range: to_utf16(payload_bytes.clone()),
        payload: text[payload_bytes].to_string(),
    })
}

fn detect_json(text: &str) -> Option<FrontmatterBlock> {
    let start = bom_len(text);
    let body = &text[start..];
    if !body.starts_with('{') {
        return None;
    }

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    let mut end = None;

    for (idx, ch) in body.char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    end = Some(start + idx + 1);
                    break;
                }
            }
            _ => {}
        }
    }

    let end = end?;
    tracing::trace!(target: "livemark::frontmatter", end_byte = end, "detected json frontmatter");

    let payload_range = utf16_len(&text[..start])..utf16_len(&text[..end]);
    Some(FrontmatterBlock {
        format: FrontmatterFormat::Json,
        full_range: 0..payload_range.end,
        delimiter_ranges: Vec::new(),
        payload_range,
        payload: text[start..end].to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn yaml_block_ends_at_closing_fence() {
        let text = "---\na: 1\n---\nbody";
        let block = detect_frontmatter(text).unwrap();
        assert_eq!(block.format, FrontmatterFormat::Yaml);
        assert_eq!(block.full_range, 0..12);
        assert_eq!(block.delimiter_ranges, vec![0..3, 9..12]);
        assert_eq!(block.payload, "a: 1\n");
        assert_eq!(block.payload_range, 4..9);
        assert!(!block.overlaps(&(13..17)));
    }

    #[test]
    fn toml_block() {
        let text = "+++\ntitle = \"x\"\n+++\n\n# Heading";
        let block = detect_frontmatter(text).unwrap();
        assert_eq!(block.format, FrontmatterFormat::Toml);
        assert_eq!(block.full_range, 0..19);
        assert_eq!(block.payload, "title = \"x\"\n");
    }

    #[test]
    fn json_block_ends_at_matching_brace() {
        let text = "{\"a\":1}\nbody";
        let block = detect_frontmatter(text).unwrap();
        assert_eq!(block.format, FrontmatterFormat::Json);
        assert_eq!(block.full_range, 0..7);
        assert!(block.delimiter_ranges.is_empty());
        assert_eq!(block.payload, "{\"a\":1}");
    }

    #[test]
    fn json_braces_inside_strings_do_not_count() {
        let text = "{\"t\": \"a } b \\\" {\", \"n\": {\"x\": 2}}\nrest";
        let block = detect_frontmatter(text).unwrap();
        let end = text.find("\nrest").unwrap();
        assert_eq!(block.full_range, 0..end);
    }

    #[test]
    fn unterminated_blocks_are_not_frontmatter() {
        assert_eq!(detect_frontmatter("---\na: 1\nno close"), None);
        assert_eq!(detect_frontmatter("+++\na = 1\n"), None);
        assert_eq!(detect_frontmatter("{\"a\": {\"b\": 1}\nbody"), None);
    }

    #[test]
    fn opening_fence_must_be_first_line_and_alone() {
        assert_eq!(detect_frontmatter("\n---\na: 1\n---\n"), None);
        assert_eq!(detect_frontmatter("--- a\nb\n---\n"), None);
        assert_eq!(detect_frontmatter("# Title\n---\n"), None);
    }

    #[test]
    fn closing_fence_is_matched_after_trimming() {
        let text = "---\na: 1\n  ---  \nbody";
        let block = detect_frontmatter(text).unwrap();
        assert_eq!(block.full_range, 0..16);
    }

    #[test]
    fn byte_order_mark_is_skipped() {
        let text = "\u{FEFF}---\na: 1\n---\nbody";
        let block = detect_frontmatter(text).unwrap();
        assert_eq!(block.full_range, 0..13);
        assert_eq!(block.delimiter_ranges[0], 1..4);
    }

    #[test]
    fn crlf_line_endings() {
        let text = "---\r\na: 1\r\n---\r\nbody";
        let block = detect_frontmatter(text).unwrap();
        assert_eq!(block.full_range, 0..14);
        assert_eq!(block.payload, "a: 1\r\n");
    }

    #[test]
    fn yaml_wins_over_json_shaped_payloads() {
        let text = "---\n{\"a\": 1}\n---\n";
        let block = detect_frontmatter(text).unwrap();
        assert_eq!(block.format, FrontmatterFormat::Yaml);
    }
}
