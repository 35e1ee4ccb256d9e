//! HTML character reference mapping.
//!
//! Documents are edited decoded (`&amp;` shows as `&`) and saved encoded.
//! Each decoded reference remembers where it sits in the decoded text and
//! how it was spelled, so saving restores the original spelling. Edits
//! shift mappings before them, leave mappings after them alone, and drop
//! any mapping they touch.
//!
//! Numeric references (`&#233;`, `&#xE9;`) decode for any valid code point.
//! Named references cover only a small table of common punctuation and
//! symbols ([`NAMED_ENTITIES`]); anything else, accented letters such as
//! `&eacute;` included, stays literal in the decoded text and is saved
//! unchanged.

use std::ops::Range;

use smol_str::SmolStr;

use crate::delta::TextDelta;
use crate::text::{utf16_len, utf16_to_byte};

/// Named references understood by the decoder.
pub const NAMED_ENTITIES: &[(&str, &str)] = &[
    ("amp", "&"),
    ("lt", "<"),
    ("gt", ">"),
    ("quot", "\""),
    ("apos", "'"),
    ("nbsp", "\u{a0}"),
    ("copy", "©"),
    ("reg", "®"),
    ("trade", "™"),
    ("hellip", "…"),
    ("mdash", "—"),
    ("ndash", "–"),
    ("lsquo", "‘"),
    ("rsquo", "’"),
    ("ldquo", "“"),
    ("rdquo", "”"),
    ("laquo", "«"),
    ("raquo", "»"),
    ("bull", "•"),
    ("middot", "·"),
    ("deg", "°"),
    ("euro", "€"),
    ("pound", "£"),
    ("yen", "¥"),
    ("cent", "¢"),
    ("sect", "§"),
    ("para", "¶"),
    ("times", "×"),
    ("divide", "÷"),
    ("plusmn", "±"),
];

/// Longest reference body we try to match, `&` and `;` excluded.
const MAX_REFERENCE_LEN: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityMapping {
    /// UTF-16 range in the decoded text.
    pub decoded_range: Range<usize>,
    /// As written in the source, e.g. `&amp;`.
    pub encoded_text: SmolStr,
    pub decoded_text: SmolStr,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DecodedText {
    pub decoded: String,
    pub mappings: Vec<EntityMapping>,
}

/// Decode every supported reference in `raw`.
///
/// Unknown or malformed references are left exactly as written.
pub fn decode_entities(raw: &str) -> DecodedText {
    let mut decoded = String::with_capacity(raw.len());
    let mut mappings = Vec::new();
    let mut decoded_units = 0;
    let mut rest = raw;

    while let Some(amp) = rest.find('&') {
        let (before, tail) = rest.split_at(amp);
        decoded.push_str(before);
        decoded_units += utf16_len(before);

        match parse_reference(tail) {
            Some((encoded_len, value)) => {
                let value_units = utf16_len(&value);
                mappings.push(EntityMapping {
                    decoded_range: decoded_units..decoded_units + value_units,
                    encoded_text: SmolStr::new(&tail[..encoded_len]),
                    decoded_text: SmolStr::new(&value),
                });
                decoded.push_str(&value);
                decoded_units += value_units;
                rest = &tail[encoded_len..];
            }
            None => {
                decoded.push('&');
                decoded_units += 1;
                rest = &tail[1..];
            }
        }
    }
    decoded.push_str(rest);

    if !mappings.is_empty() {
        tracing::trace!(target: "livemark::entity", count = mappings.len(), "decoded entities");
    }
    DecodedText { decoded, mappings }
}

/// Parse a reference at the start of `text` (which begins with `&`).
/// Returns its encoded byte length and decoded value.
fn parse_reference(text: &str) -> Option<(usize, String)> {
    let body_and_rest = text.get(1..)?;
    let semi = body_and_rest
        .char_indices()
        .take(MAX_REFERENCE_LEN + 1)
        .find(|(_, c)| *c == ';')
        .map(|(idx, _)| idx)?;
    let body = &body_and_rest[..semi];
    let encoded_len = semi + 2;

    if let Some(numeric) = body.strip_prefix('#') {
        let code = match numeric.strip_prefix(['x', 'X']) {
            Some(hex) if !hex.is_empty() && hex.chars().all(|c| c.is_ascii_hexdigit()) => {
                u32::from_str_radix(hex, 16).ok()?
            }
            None if !numeric.is_empty() && numeric.chars().all(|c| c.is_ascii_digit()) => {
                numeric.parse().ok()?
            }
            _ => return None,
        };
        if code == 0 {
            return None;
        }
        let ch = char::from_u32(code)?;
        return Some((encoded_len, ch.to_string()));
    }

    NAMED_ENTITIES
        .iter()
        .find(|(name, _)| *name == body)
        .map(|(_, value)| (encoded_len, (*value).to_string()))
}

/// Re-encode `decoded`, restoring each mapping's original spelling.
///
/// A mapping whose range no longer holds its recorded text is skipped and
/// the current text is written literally.
pub fn encode_entities(decoded: &str, mappings: &[EntityMapping]) -> String {
    let mut ordered: Vec<&EntityMapping> = mappings.iter().collect();
    ordered.sort_by_key(|m| m.decoded_range.start);

    let mut out = String::with_capacity(decoded.len());
    let mut copied = 0;
    let mut stale = 0;
    for mapping in ordered {
        let (Some(start), Some(end)) = (
            utf16_to_byte(decoded, mapping.decoded_range.start),
            utf16_to_byte(decoded, mapping.decoded_range.end),
        ) else {
            stale += 1;
            continue;
        };
        if start < copied || start > end || decoded[start..end] != *mapping.decoded_text {
            stale += 1;
            continue;
        }
        out.push_str(&decoded[copied..start]);
        out.push_str(&mapping.encoded_text);
        copied = end;
    }
    out.push_str(&decoded[copied..]);

    if stale > 0 {
        tracing::debug!(target: "livemark::entity", stale, "skipped stale entity mappings");
    }
    out
}

/// Entity mappings for one open document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntityTracker {
    mappings: Vec<EntityMapping>,
}

impl EntityTracker {
    pub fn new(mappings: Vec<EntityMapping>) -> Self {
        Self { mappings }
    }

    pub fn mappings(&self) -> &[EntityMapping] {
        &self.mappings
    }

    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }

    /// Move mappings across an edit.
    ///
    /// Mappings wholly before the edit stay, those wholly after shift by
    /// the length change, and anything the edit touches is dropped for
    /// good.
    pub fn apply_delta(&mut self, delta: &TextDelta) {
        let old = &delta.old_range;
        let shift = delta.len_change();
        let before = self.mappings.len();
        self.mappings.retain_mut(|mapping| {
            let range = &mut mapping.decoded_range;
            if old.end <= range.start {
                range.start = range.start.saturating_add_signed(shift);
                range.end = range.end.saturating_add_signed(shift);
                true
            } else {
                old.start >= range.end
            }
        });
        let dropped = before - self.mappings.len();
        if dropped > 0 {
            tracing::trace!(target: "livemark::entity", dropped, ?old, "edit invalidated entity mappings");
        }
    }

    /// Drop mappings whose range no longer holds their decoded text.
    pub fn retain_valid(&mut self, decoded: &str) {
        self.mappings.retain(|mapping| {
            match (
                utf16_to_byte(decoded, mapping.decoded_range.start),
                utf16_to_byte(decoded, mapping.decoded_range.end),
            ) {
                (Some(start), Some(end)) if start <= end => {
                    decoded[start..end] == *mapping.decoded_text
                }
                _ => false,
            }
        });
    }

    pub fn encode(&self, decoded: &str) -> String {
        encode_entities(decoded, &self.mappings)
    }
}
