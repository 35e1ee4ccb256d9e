//! Theme values and the observable "current theme".
//!
//! Styling functions take a `&Theme` explicitly. [`SharedTheme`] only
//! exists so a host can swap themes at runtime and tell open sessions
//! their style passes are stale.

use std::sync::{Arc, Mutex, RwLock};

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use crate::attributes::Color;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Theme {
    pub colors: ColorScheme,
    pub fonts: FontScheme,
    pub spacing: SpacingScheme,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorScheme {
    pub background: Color,
    pub foreground: Color,
    pub link: Color,
    /// Revealed syntax markers and frontmatter payload.
    pub muted: Color,
    pub code_background: Color,
    pub blockquote: Color,
    pub table_header_background: Color,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FontScheme {
    pub body: SmolStr,
    pub heading: SmolStr,
    pub monospace: SmolStr,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpacingScheme {
    /// Ratio between consecutive heading levels; h6 is body size.
    pub heading_scale: f32,
    /// Per nesting level.
    pub blockquote_indent: f32,
    pub code_block_indent: f32,
    pub paragraph_spacing: f32,
}

impl Default for ColorScheme {
    fn default() -> Self {
        Self {
            background: Color::rgb(0xfa, 0xf4, 0xed),
            foreground: Color::rgb(0x2b, 0x30, 0x3b),
            link: Color::rgb(0x28, 0x69, 0x83),
            muted: Color::rgb(0x98, 0x93, 0xa5),
            code_background: Color::rgb(0xf2, 0xe9, 0xe1),
            blockquote: Color::rgb(0x57, 0x52, 0x79),
            table_header_background: Color::rgb(0xf4, 0xed, 0xe8),
        }
    }
}

impl Default for FontScheme {
    fn default() -> Self {
        Self {
            body: SmolStr::new("IBM Plex Sans"),
            heading: SmolStr::new("IBM Plex Sans"),
            monospace: SmolStr::new("IBM Plex Mono"),
        }
    }
}

impl Default for SpacingScheme {
    fn default() -> Self {
        Self {
            heading_scale: 1.2,
            blockquote_indent: 20.0,
            code_block_indent: 12.0,
            paragraph_spacing: 4.0,
        }
    }
}

impl Theme {
    /// Font size for a heading level, given the body size.
    pub fn heading_size(&self, level: u8, base: f32) -> f32 {
        let steps = 6 - level.clamp(1, 6) as i32;
        base * self.spacing.heading_scale.powi(steps)
    }
}

pub type ThemeCallback = Box<dyn Fn(&Theme, u64) + Send + Sync>;

struct Current {
    theme: Arc<Theme>,
    revision: u64,
}

/// The active theme, shared between sessions.
///
/// Every `set` bumps the revision; style pass caches record the revision
/// they were built with and are stale once it moves.
#[derive(Clone)]
pub struct SharedTheme {
    current: Arc<RwLock<Current>>,
    callbacks: Arc<Mutex<Vec<ThemeCallback>>>,
}

impl SharedTheme {
    pub fn new(theme: Theme) -> Self {
        Self {
            current: Arc::new(RwLock::new(Current {
                theme: Arc::new(theme),
                revision: 0,
            })),
            callbacks: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn current(&self) -> Arc<Theme> {
        match self.current.read() {
            Ok(current) => current.theme.clone(),
            Err(poisoned) => poisoned.into_inner().theme.clone(),
        }
    }

    pub fn revision(&self) -> u64 {
        match self.current.read() {
            Ok(current) => current.revision,
            Err(poisoned) => poisoned.into_inner().revision,
        }
    }

    /// Swap the theme and notify subscribers. Returns the new revision.
    pub fn set(&self, theme: Theme) -> u64 {
        let theme = Arc::new(theme);
        let revision = {
            let mut current = match self.current.write() {
                Ok(current) => current,
                Err(poisoned) => poisoned.into_inner(),
            };
            current.theme = theme.clone();
            current.revision += 1;
            current.revision
        };
        tracing::debug!(target: "livemark::render", revision, "theme changed");

        let callbacks = match self.callbacks.lock() {
            Ok(callbacks) => callbacks,
            Err(poisoned) => poisoned.into_inner(),
        };
        for callback in callbacks.iter() {
            callback(&theme, revision);
        }
        revision
    }

    /// Subscribe to theme changes.
    pub fn subscribe<F>(&self, callback: F)
    where
        F: Fn(&Theme, u64) + Send + Sync + 'static,
    {
        let mut callbacks = match self.callbacks.lock() {
            Ok(callbacks) => callbacks,
            Err(poisoned) => poisoned.into_inner(),
        };
        callbacks.push(Box::new(callback));
    }
}

impl Default for SharedTheme {
    fn default() -> Self {
        Self::new(Theme::default())
    }
}

impl std::fmt::Debug for SharedTheme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedTheme")
            .field("revision", &self.revision())
            .finish_non_exhaustive()
    }
}
