//! Styled-text buffer abstraction.
//!
//! The styling core never owns the display. It writes attribute runs
//! through [`StyledText`], which a host implements over its own text
//! storage. [`AttributedString`] is the in-memory implementation used by
//! tests and headless consumers.

use std::fmt;
use std::ops::Range;

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use crate::text::{utf16_len, utf16_to_byte};

/// An sRGB color with alpha.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const TRANSPARENT: Color = Color::rgba(0, 0, 0, 0);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 0xff }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Parse `#rrggbb` or `#rrggbbaa`.
    pub fn from_hex(hex: &str) -> Option<Self> {
        let digits = hex.strip_prefix('#')?;
        if !digits.is_ascii() {
            return None;
        }
        let byte = |i: usize| u8::from_str_radix(digits.get(i..i + 2)?, 16).ok();
        match digits.len() {
            6 => Some(Self::rgb(byte(0)?, byte(2)?, byte(4)?)),
            8 => Some(Self::rgba(byte(0)?, byte(2)?, byte(4)?, byte(6)?)),
            _ => None,
        }
    }

    pub fn is_transparent(&self) -> bool {
        self.a == 0
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)?;
        if self.a != 0xff {
            write!(f, "{:02x}", self.a)?;
        }
        Ok(())
    }
}

impl TryFrom<String> for Color {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Color::from_hex(&value).ok_or_else(|| format!("invalid color `{value}`"))
    }
}

impl From<Color> for String {
    fn from(color: Color) -> Self {
        color.to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ParagraphStyle {
    pub head_indent: f32,
    pub first_line_head_indent: f32,
    pub line_spacing: f32,
    pub paragraph_spacing: f32,
}

/// Custom tag read by the drawing layer to paint quote bars.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockquoteInfo {
    pub nesting_level: usize,
}

/// Custom tag marking a range drawn as an image instead of text.
///
/// The drawing layer looks the bitmap up in the image cache by
/// `cache_key`; `width`/`height` are the display size after capping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedImage {
    pub cache_key: SmolStr,
    pub width: u32,
    pub height: u32,
}

/// Attributes over a run of text. `None` means "not set".
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TextAttributes {
    pub font_family: Option<SmolStr>,
    pub font_size: Option<f32>,
    pub bold: Option<bool>,
    pub italic: Option<bool>,
    pub foreground: Option<Color>,
    pub background: Option<Color>,
    pub underline: Option<bool>,
    pub strikethrough: Option<bool>,
    pub paragraph: Option<ParagraphStyle>,
    pub blockquote: Option<BlockquoteInfo>,
    pub image: Option<RenderedImage>,
}

impl TextAttributes {
    /// `overlay` wins wherever it sets a field.
    pub fn merge(&self, overlay: &TextAttributes) -> TextAttributes {
        TextAttributes {
            font_family: overlay.font_family.clone().or_else(|| self.font_family.clone()),
            font_size: overlay.font_size.or(self.font_size),
            bold: overlay.bold.or(self.bold),
            italic: overlay.italic.or(self.italic),
            foreground: overlay.foreground.or(self.foreground),
            background: overlay.background.or(self.background),
            underline: overlay.underline.or(self.underline),
            strikethrough: overlay.strikethrough.or(self.strikethrough),
            paragraph: overlay.paragraph.or(self.paragraph),
            blockquote: overlay.blockquote.or(self.blockquote),
            image: overlay.image.clone().or_else(|| self.image.clone()),
        }
    }
}

/// A mutable styled-text buffer addressed in UTF-16 code units.
pub trait StyledText {
    fn len_utf16(&self) -> usize;

    /// Replace all attributes over `range`.
    fn set_attributes(&mut self, range: Range<usize>, attributes: &TextAttributes);

    /// Overlay the fields `attributes` sets, keeping the rest.
    fn add_attributes(&mut self, range: Range<usize>, attributes: &TextAttributes);

    /// Start of a batch of attribute edits.
    fn begin_editing(&mut self) {}

    fn end_editing(&mut self) {}
}

impl<S: StyledText + ?Sized> StyledText for &mut S {
    fn len_utf16(&self) -> usize {
        (**self).len_utf16()
    }

    fn set_attributes(&mut self, range: Range<usize>, attributes: &TextAttributes) {
        (**self).set_attributes(range, attributes)
    }

    fn add_attributes(&mut self, range: Range<usize>, attributes: &TextAttributes) {
        (**self).add_attributes(range, attributes)
    }

    fn begin_editing(&mut self) {
        (**self).begin_editing()
    }

    fn end_editing(&mut self) {
        (**self).end_editing()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AttributeRun {
    pub range: Range<usize>,
    pub attributes: TextAttributes,
}

/// Text plus a contiguous, coalesced list of attribute runs.
#[derive(Debug, Clone, Default)]
pub struct AttributedString {
    text: String,
    len: usize,
    runs: Vec<AttributeRun>,
    edit_depth: usize,
    batches: usize,
}

impl AttributedString {
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let len = utf16_len(&text);
        let runs = if len == 0 {
            Vec::new()
        } else {
            vec![AttributeRun {
                range: 0..len,
                attributes: TextAttributes::default(),
            }]
        };
        Self {
            text,
            len,
            runs,
            edit_depth: 0,
            batches: 0,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn runs(&self) -> &[AttributeRun] {
        &self.runs
    }

    /// Completed `begin_editing`/`end_editing` batches.
    pub fn batches(&self) -> usize {
        self.batches
    }

    pub fn attributes_at(&self, offset: usize) -> Option<&TextAttributes> {
        let idx = self.runs.partition_point(|run| run.range.end <= offset);
        self.runs
            .get(idx)
            .filter(|run| run.range.contains(&offset))
            .map(|run| &run.attributes)
    }

    /// Replace the text over a UTF-16 range. Inserted text takes the
    /// attributes of the run it lands in.
    ///
    /// Returns `false` when the range does not fall on character boundaries.
    pub fn replace_range(&mut self, range: Range<usize>, replacement: &str) -> bool {
        let (Some(start_byte), Some(end_byte)) = (
            utf16_to_byte(&self.text, range.start),
            utf16_to_byte(&self.text, range.end),
        ) else {
            return false;
        };
        if start_byte > end_byte {
            return false;
        }
        self.text.replace_range(start_byte..end_byte, replacement);

        let inserted = utf16_len(replacement);
        let inherited = self
            .attributes_at(range.start)
            .or_else(|| range.start.checked_sub(1).and_then(|o| self.attributes_at(o)))
            .cloned()
            .unwrap_or_default();

        let removed = range.len();
        let mut runs = Vec::with_capacity(self.runs.len() + 1);
        for run in self.runs.drain(..) {
            if run.range.end <= range.start {
                runs.push(run);
            } else if run.range.start >= range.end {
                runs.push(AttributeRun {
                    range: run.range.start - removed + inserted..run.range.end - removed + inserted,
                    attributes: run.attributes,
                });
            } else {
                // Keep whatever survives outside the replaced range.
                if run.range.start < range.start {
                    runs.push(AttributeRun {
                        range: run.range.start..range.start,
                        attributes: run.attributes.clone(),
                    });
                }
                if run.range.end > range.end {
                    runs.push(AttributeRun {
                        range: range.end - removed + inserted..run.range.end - removed + inserted,
                        attributes: run.attributes,
                    });
                }
            }
        }
        if inserted > 0 {
            let at = runs.partition_point(|run| run.range.end <= range.start);
            runs.insert(
                at,
                AttributeRun {
                    range: range.start..range.start + inserted,
                    attributes: inherited,
                },
            );
        }
        self.runs = runs;
        self.len = utf16_len(&self.text);
        self.coalesce();
        true
    }

    /// Split the run containing `offset` so a run starts there. Returns
    /// the index of that run.
    fn split_at(&mut self, offset: usize) -> usize {
        if offset >= self.len {
            return self.runs.len();
        }
        let idx = self.runs.partition_point(|run| run.range.end <= offset);
        let run = &mut self.runs[idx];
        if run.range.start == offset {
            return idx;
        }
        let tail = AttributeRun {
            range: offset..run.range.end,
            attributes: run.attributes.clone(),
        };
        run.range.end = offset;
        self.runs.insert(idx + 1, tail);
        idx + 1
    }

    fn clamp(&self, range: Range<usize>) -> Option<Range<usize>> {
        let end = range.end.min(self.len);
        let start = range.start.min(end);
        (start < end).then_some(start..end)
    }

    fn coalesce(&mut self) {
        let mut merged: Vec<AttributeRun> = Vec::with_capacity(self.runs.len());
        for run in self.runs.drain(..) {
            if run.range.is_empty() {
                continue;
            }
            match merged.last_mut() {
                Some(last) if last.attributes == run.attributes => {
                    last.range.end = run.range.end;
                }
                _ => merged.push(run),
            }
        }
        self.runs = merged;
    }
}

impl StyledText for AttributedString {
    fn len_utf16(&self) -> usize {
        self.len
    }

    fn set_attributes(&mut self, range: Range<usize>, attributes: &TextAttributes) {
        let Some(range) = self.clamp(range) else {
            return;
        };
        let first = self.split_at(range.start);
        let last = self.split_at(range.end);
        self.runs.splice(
            first..last,
            [AttributeRun {
                range,
                attributes: attributes.clone(),
            }],
        );
        self.coalesce();
    }

    fn add_attributes(&mut self, range: Range<usize>, attributes: &TextAttributes) {
        let Some(range) = self.clamp(range) else {
            return;
        };
        let first = self.split_at(range.start);
        let last = self.split_at(range.end);
        for run in &mut self.runs[first..last] {
            run.attributes = run.attributes.merge(attributes);
        }
        self.coalesce();
    }

    fn begin_editing(&mut self) {
        self.edit_depth += 1;
    }

    fn end_editing(&mut self) {
        if self.edit_depth > 0 {
            self.edit_depth -= 1;
            if self.edit_depth == 0 {
                self.batches += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bold() -> TextAttributes {
        TextAttributes {
            bold: Some(true),
            ..Default::default()
        }
    }

    #[test]
    fn color_hex_roundtrip() {
        assert_eq!(Color::from_hex("#2b303b"), Some(Color::rgb(0x2b, 0x30, 0x3b)));
        assert_eq!(Color::from_hex("#00000000"), Some(Color::TRANSPARENT));
        assert_eq!(Color::from_hex("2b303b"), None);
        assert_eq!(Color::from_hex("#2b30"), None);
        assert_eq!(Color::rgba(1, 2, 3, 4).to_string(), "#01020304");
    }

    #[test]
    fn color_serde_uses_hex_strings() {
        let json = serde_json::to_string(&Color::rgb(255, 0, 16)).unwrap();
        assert_eq!(json, "\"#ff0010\"");
        let back: Color = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Color::rgb(255, 0, 16));
        assert!(serde_json::from_str::<Color>("\"red\"").is_err());
    }

    #[test]
    fn merge_prefers_overlay() {
        let base = TextAttributes {
            font_size: Some(16.0),
            bold: Some(false),
            ..Default::default()
        };
        let merged = base.merge(&bold());
        assert_eq!(merged.font_size, Some(16.0));
        assert_eq!(merged.bold, Some(true));
    }

    #[test]
    fn set_attributes_splits_and_coalesces() {
        let mut s = AttributedString::new("hello world");
        s.set_attributes(6..11, &bold());
        assert_eq!(s.runs().len(), 2);
        assert_eq!(s.attributes_at(5).and_then(|a| a.bold), None);
        assert_eq!(s.attributes_at(6).and_then(|a| a.bold), Some(true));

        s.set_attributes(0..11, &TextAttributes::default());
        assert_eq!(s.runs().len(), 1);
    }

    #[test]
    fn add_attributes_overlays_existing_fields() {
        let mut s = AttributedString::new("abcdef");
        s.add_attributes(
            0..6,
            &TextAttributes {
                font_size: Some(12.0),
                ..Default::default()
            },
        );
        s.add_attributes(2..4, &bold());
        let mid = s.attributes_at(3).unwrap();
        assert_eq!(mid.font_size, Some(12.0));
        assert_eq!(mid.bold, Some(true));
        assert_eq!(s.runs().len(), 3);
    }

    #[test]
    fn out_of_range_writes_are_clamped() {
        let mut s = AttributedString::new("abc");
        s.set_attributes(2..40, &bold());
        assert_eq!(s.attributes_at(2).and_then(|a| a.bold), Some(true));
        s.set_attributes(10..20, &TextAttributes::default());
        assert_eq!(s.attributes_at(10), None);
    }

    #[test]
    fn replace_range_shifts_runs_and_inherits_style() {
        let mut s = AttributedString::new("ab cd");
        s.set_attributes(3..5, &bold());
        assert!(s.replace_range(0..0, "😀"));
        assert_eq!(s.text(), "😀ab cd");
        assert_eq!(s.len_utf16(), 7);
        assert_eq!(s.attributes_at(5).and_then(|a| a.bold), Some(true));

        // Typing inside the bold run extends it.
        assert!(s.replace_range(6..6, "x"));
        assert_eq!(s.attributes_at(6).and_then(|a| a.bold), Some(true));
        assert_eq!(s.text(), "😀ab cxd");

        // Splitting the surrogate pair is refused.
        assert!(!s.replace_range(1..2, "y"));
    }

    #[test]
    fn editing_batches_nest() {
        let mut s = AttributedString::new("x");
        s.begin_editing();
        s.begin_editing();
        s.end_editing();
        assert_eq!(s.batches(), 0);
        s.end_editing();
        assert_eq!(s.batches(), 1);
    }
}
