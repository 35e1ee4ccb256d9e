//! Image source resolution.
//!
//! Maps a markdown image source to a local file under the site or the
//! document's directory, or to a remote URL when remote images are on.

use std::path::{Component, Path, PathBuf};

use url::Url;

use crate::error::ImageError;

/// Where the document being edited lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageContext {
    /// The document file itself.
    pub post_path: PathBuf,
    pub site_root: Option<PathBuf>,
    pub remote_enabled: bool,
}

impl ImageContext {
    pub fn new(post_path: impl Into<PathBuf>) -> Self {
        Self {
            post_path: post_path.into(),
            site_root: None,
            remote_enabled: false,
        }
    }

    pub fn with_site_root(mut self, site_root: impl Into<PathBuf>) -> Self {
        self.site_root = Some(site_root.into());
        self
    }

    pub fn with_remote(mut self, enabled: bool) -> Self {
        self.remote_enabled = enabled;
        self
    }

    pub fn post_dir(&self) -> &Path {
        self.post_path.parent().unwrap_or(Path::new(""))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedImage {
    Local { path: PathBuf, url: Url },
    Remote(Url),
}

impl ResolvedImage {
    /// Cache key: the resolved URL.
    pub fn url(&self) -> &Url {
        match self {
            ResolvedImage::Local { url, .. } => url,
            ResolvedImage::Remote(url) => url,
        }
    }
}

/// Resolve `source` against `context`.
///
/// - `http(s)://` is remote, allowed only when enabled.
/// - A leading `/` is site-relative under `static/`.
/// - `assets/` and `static/` are site subdirectories.
/// - Anything else is relative to the document's directory.
///
/// Local results must stay inside the site root or the document's
/// directory, compared by path component. Escapes are rejected.
pub fn resolve_image(source: &str, context: &ImageContext) -> Result<ResolvedImage, ImageError> {
    let source = source.trim();
    if source.is_empty() {
        return Err(ImageError::EmptySource);
    }

    if is_remote(source) {
        let url = Url::parse(source).map_err(|_| ImageError::InvalidUrl(source.to_string()))?;
        if !context.remote_enabled {
            return Err(ImageError::RemoteDisabled(source.to_string()));
        }
        return Ok(ResolvedImage::Remote(url));
    }

    let site = || {
        context
            .site_root
            .as_deref()
            .ok_or_else(|| ImageError::NoSiteRoot(source.to_string()))
    };
    let candidate = if let Some(rest) = source.strip_prefix('/') {
        site()?.join("static").join(rest)
    } else if source.starts_with("assets/") || source.starts_with("static/") {
        site()?.join(source)
    } else {
        context.post_dir().join(source)
    };

    let path = normalize(&candidate);
    let post_dir = normalize(context.post_dir());
    let inside_site = context
        .site_root
        .as_deref()
        .is_some_and(|root| path.starts_with(normalize(root)));
    if !inside_site && !path.starts_with(&post_dir) {
        tracing::debug!(
            target: "livemark::image",
            source,
            path = %path.display(),
            "image path escapes sandbox"
        );
        return Err(ImageError::EscapesSandbox(path));
    }

    let url = Url::from_file_path(&path)
        .map_err(|_| ImageError::InvalidUrl(path.display().to_string()))?;
    Ok(ResolvedImage::Local { path, url })
}

fn is_remote(source: &str) -> bool {
    let lower = source.get(..8).unwrap_or(source).to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// Canonical path when it exists on disk, lexically cleaned otherwise.
fn normalize(path: &Path) -> PathBuf {
    if let Ok(canonical) = std::fs::canonicalize(path) {
        return canonical;
    }
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                // `..` at the root stays at the root.
                if !out.pop() && !out.has_root() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}
