//! Minimal changed range between two versions of a text.
//!
//! The editing surface hands us whole strings, not edit operations. Entity
//! mappings still need to know which part of the document moved, so we
//! recover a single bounding edit from the longest common prefix and
//! suffix. Several discontiguous edits collapse into one range covering all
//! of them.
//!
//! Ranges are UTF-16 code units. Comparison walks chars, so a range never
//! splits a surrogate pair.

use std::ops::Range;

/// A bounding edit: `old_range` in the old text became `new_range` in the new.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextDelta {
    pub old_range: Range<usize>,
    pub new_range: Range<usize>,
}

impl TextDelta {
    /// Signed change in length, in UTF-16 units.
    pub fn len_change(&self) -> isize {
        self.new_range.len() as isize - self.old_range.len() as isize
    }

    /// True when nothing was removed.
    pub fn is_insertion(&self) -> bool {
        self.old_range.is_empty()
    }
}

/// Compute the bounding changed range between `old` and `new`.
///
/// Returns `None` when the texts are identical.
pub fn text_delta(old: &str, new: &str) -> Option<TextDelta> {
    if old == new {
        return None;
    }

    let mut prefix_chars = 0;
    let mut prefix_units = 0;
    for (a, b) in old.chars().zip(new.chars()) {
        if a != b {
            break;
        }
        prefix_chars += 1;
        prefix_units += a.len_utf16();
    }

    let old_chars = old.chars().count();
    let new_chars = new.chars().count();
    // The suffix may not reuse characters already claimed by the prefix.
    let max_suffix = old_chars.min(new_chars) - prefix_chars;

    let mut suffix_units = 0;
    for (a, b) in old.chars().rev().zip(new.chars().rev()).take(max_suffix) {
        if a != b {
            break;
        }
        suffix_units += a.len_utf16();
    }

    let old_len: usize = old.chars().map(char::len_utf16).sum();
    let new_len: usize = new.chars().map(char::len_utf16).sum();

    Some(TextDelta {
        old_range: prefix_units..old_len - suffix_units,
        new_range: prefix_units..new_len - suffix_units,
    })
}
