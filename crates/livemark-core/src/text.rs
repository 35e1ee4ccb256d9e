//! Read access to document text in display units.
//!
//! Spans and markers are UTF-16 ranges, while the parser and Rust strings
//! work in UTF-8 bytes. `TextBuffer` slices text by UTF-16 range so the
//! marker calculator can inspect a span's literal source.

use smol_str::{SmolStr, ToSmolStr};
use std::ops::Range;

/// Text addressable by char and UTF-16 offsets.
pub trait TextBuffer {
    /// Total length in UTF-16 code units.
    fn len_utf16(&self) -> usize;

    /// Slice by char range. None if the range is inverted or out of bounds.
    fn slice(&self, char_range: Range<usize>) -> Option<SmolStr>;

    /// Slice by UTF-16 range.
    ///
    /// Returns None if the range is out of bounds, inverted, or splits a
    /// surrogate pair.
    fn slice_utf16(&self, utf16_range: Range<usize>) -> Option<SmolStr> {
        if utf16_range.start > utf16_range.end || utf16_range.end > self.len_utf16() {
            return None;
        }
        let start = self.utf16_to_char(utf16_range.start);
        let end = self.utf16_to_char(utf16_range.end);
        if self.char_to_utf16(start) != utf16_range.start
            || self.char_to_utf16(end) != utf16_range.end
        {
            return None;
        }
        self.slice(start..end)
    }

    fn char_to_utf16(&self, char_offset: usize) -> usize;

    /// An offset inside a surrogate pair resolves to the char containing it.
    fn utf16_to_char(&self, utf16_offset: usize) -> usize;
}

/// Ropey-backed document text, built once per full pass.
#[derive(Clone, Debug, Default)]
pub struct EditorRope {
    rope: ropey::Rope,
}

impl TextBuffer for EditorRope {
    fn len_utf16(&self) -> usize {
        self.rope.len_utf16_cu()
    }

    fn slice(&self, char_range: Range<usize>) -> Option<SmolStr> {
        if char_range.start > char_range.end || char_range.end > self.rope.len_chars() {
            return None;
        }
        Some(self.rope.slice(char_range).to_smolstr())
    }

    fn char_to_utf16(&self, char_offset: usize) -> usize {
        self.rope
            .char_to_utf16_cu(char_offset.min(self.rope.len_chars()))
    }

    fn utf16_to_char(&self, utf16_offset: usize) -> usize {
        self.rope
            .utf16_cu_to_char(utf16_offset.min(self.rope.len_utf16_cu()))
    }
}

impl From<&str> for EditorRope {
    fn from(s: &str) -> Self {
        Self {
            rope: ropey::Rope::from_str(s),
        }
    }
}

/// UTF-16 length of a string slice.
pub fn utf16_len(text: &str) -> usize {
    text.chars().map(char::len_utf16).sum()
}

/// Convert a UTF-16 offset into a byte offset within `text`.
///
/// Returns None past the end or inside a surrogate pair.
pub fn utf16_to_byte(text: &str, utf16_offset: usize) -> Option<usize> {
    let mut units = 0;
    for (byte_idx, ch) in text.char_indices() {
        if units == utf16_offset {
            return Some(byte_idx);
        }
        if units > utf16_offset {
            return None;
        }
        units += ch.len_utf16();
    }
    (units == utf16_offset).then_some(text.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emoji_counts_two_units() {
        let rope = EditorRope::from("a😀b");
        assert_eq!(rope.len_utf16(), 4);
        assert_eq!(rope.char_to_utf16(2), 3);
        assert_eq!(rope.utf16_to_char(3), 2);
        // Inside the pair resolves to the emoji itself.
        assert_eq!(rope.utf16_to_char(2), 1);
    }

    #[test]
    fn utf16_slices_respect_surrogates() {
        let rope = EditorRope::from("a😀b");
        assert_eq!(rope.slice_utf16(1..3).as_deref(), Some("😀"));
        assert_eq!(rope.slice_utf16(3..4).as_deref(), Some("b"));
        assert_eq!(rope.slice_utf16(2..4), None);
        assert_eq!(rope.slice_utf16(0..9), None);
    }

    #[test]
    fn char_slices_are_bounds_checked() {
        let rope = EditorRope::from("> quote");
        assert_eq!(rope.slice(2..7).as_deref(), Some("quote"));
        assert_eq!(rope.slice(0..8), None);
    }

    #[test]
    fn byte_offsets_from_utf16() {
        let text = "é😀x";
        assert_eq!(utf16_to_byte(text, 0), Some(0));
        assert_eq!(utf16_to_byte(text, 1), Some(2));
        assert_eq!(utf16_to_byte(text, 2), None);
        assert_eq!(utf16_to_byte(text, 3), Some(6));
        assert_eq!(utf16_to_byte(text, 4), Some(7));
        assert_eq!(utf16_to_byte(text, 5), None);
        assert_eq!(utf16_len(text), 4);
    }
}
