//! Per-kind attribute rules.
//!
//! Pure functions from a span kind plus theme and preferences to the
//! attributes it carries. The pass and the visibility resolver decide
//! where they go.

use crate::attributes::{BlockquoteInfo, Color, ParagraphStyle, TextAttributes};
use crate::config::EditorPreferences;
use crate::theme::Theme;
use crate::types::StyleKind;

/// Font size for hidden syntax. Zero breaks some layout engines.
pub const HIDDEN_FONT_SIZE: f32 = 0.01;

/// Theme and preferences for one pass.
#[derive(Debug, Clone, Copy)]
pub struct StyleContext<'a> {
    pub theme: &'a Theme,
    pub preferences: &'a EditorPreferences,
}

impl<'a> StyleContext<'a> {
    pub fn new(theme: &'a Theme, preferences: &'a EditorPreferences) -> Self {
        Self { theme, preferences }
    }

    fn paragraph(&self) -> ParagraphStyle {
        ParagraphStyle {
            line_spacing: self.preferences.line_spacing,
            paragraph_spacing: self.theme.spacing.paragraph_spacing,
            ..Default::default()
        }
    }

    /// Every field set, so writing these resets a range completely.
    pub fn base(&self) -> TextAttributes {
        TextAttributes {
            font_family: Some(self.theme.fonts.body.clone()),
            font_size: Some(self.preferences.font_size),
            bold: Some(false),
            italic: Some(false),
            foreground: Some(self.theme.colors.foreground),
            background: Some(Color::TRANSPARENT),
            underline: Some(false),
            strikethrough: Some(false),
            paragraph: Some(self.paragraph()),
            blockquote: None,
            image: None,
        }
    }

    /// Overlay for one construct.
    pub fn for_kind(&self, kind: &StyleKind) -> TextAttributes {
        let theme = self.theme;
        match kind {
            StyleKind::Heading { level } => TextAttributes {
                font_family: Some(theme.fonts.heading.clone()),
                font_size: Some(theme.heading_size(*level, self.preferences.font_size)),
                bold: Some(true),
                ..Default::default()
            },
            StyleKind::Bold => TextAttributes {
                bold: Some(true),
                ..Default::default()
            },
            StyleKind::Italic => TextAttributes {
                italic: Some(true),
                ..Default::default()
            },
            StyleKind::Strikethrough => TextAttributes {
                strikethrough: Some(true),
                ..Default::default()
            },
            StyleKind::InlineCode => TextAttributes {
                font_family: Some(theme.fonts.monospace.clone()),
                background: Some(theme.colors.code_background),
                ..Default::default()
            },
            StyleKind::Link => TextAttributes {
                foreground: Some(theme.colors.link),
                underline: Some(true),
                ..Default::default()
            },
            StyleKind::Blockquote { nesting_level } => {
                let indent = theme.spacing.blockquote_indent * *nesting_level as f32;
                TextAttributes {
                    foreground: Some(theme.colors.blockquote),
                    paragraph: Some(ParagraphStyle {
                        head_indent: indent,
                        first_line_head_indent: indent,
                        ..self.paragraph()
                    }),
                    blockquote: Some(BlockquoteInfo {
                        nesting_level: *nesting_level,
                    }),
                    ..Default::default()
                }
            }
            StyleKind::CodeBlock => {
                let indent = theme.spacing.code_block_indent;
                TextAttributes {
                    font_family: Some(theme.fonts.monospace.clone()),
                    background: Some(theme.colors.code_background),
                    paragraph: Some(ParagraphStyle {
                        head_indent: indent,
                        first_line_head_indent: indent,
                        ..self.paragraph()
                    }),
                    ..Default::default()
                }
            }
            StyleKind::Table => TextAttributes {
                font_family: Some(theme.fonts.monospace.clone()),
                ..Default::default()
            },
            StyleKind::TableHeader => TextAttributes {
                bold: Some(true),
                background: Some(theme.colors.table_header_background),
                ..Default::default()
            },
            StyleKind::TableCell => TextAttributes::default(),
            StyleKind::Frontmatter => TextAttributes {
                font_family: Some(theme.fonts.monospace.clone()),
                foreground: Some(theme.colors.muted),
                ..Default::default()
            },
            // Literal markdown at base style while revealed.
            StyleKind::Image { .. } => TextAttributes::default(),
        }
    }
}

/// Overlay that hides syntax characters.
///
/// An empty blockquote continuation line keeps its font size: shrinking
/// its only glyphs would collapse the line.
pub fn hidden(preserve_line_height: bool) -> TextAttributes {
    TextAttributes {
        font_size: (!preserve_line_height).then_some(HIDDEN_FONT_SIZE),
        foreground: Some(Color::TRANSPARENT),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_sets_every_resettable_field() {
        let theme = Theme::default();
        let prefs = EditorPreferences::default();
        let base = StyleContext::new(&theme, &prefs).base();
        assert_eq!(base.font_size, Some(prefs.font_size));
        assert_eq!(base.bold, Some(false));
        assert_eq!(base.foreground, Some(theme.colors.foreground));
        assert!(base.image.is_none());
    }

    #[test]
    fn nested_blockquotes_indent_further() {
        let theme = Theme::default();
        let prefs = EditorPreferences::default();
        let ctx = StyleContext::new(&theme, &prefs);
        let indent = |level| {
            ctx.for_kind(&StyleKind::Blockquote {
                nesting_level: level,
            })
            .paragraph
            .map(|p| p.head_indent)
        };
        assert_eq!(indent(1), Some(20.0));
        assert_eq!(indent(2), Some(40.0));
    }

    #[test]
    fn hidden_respects_line_height() {
        assert_eq!(hidden(false).font_size, Some(HIDDEN_FONT_SIZE));
        assert_eq!(hidden(true).font_size, None);
        assert_eq!(hidden(true).foreground, Some(Color::TRANSPARENT));
    }
}
