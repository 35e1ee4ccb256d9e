//! Image loading and the cache-backed renderer.

use std::sync::Arc;

use image::DynamicImage;

use super::cache::ImageCache;
use super::resolve::{ImageContext, ResolvedImage, resolve_image};
use crate::attributes::RenderedImage;
use crate::config::RenderSettings;
use crate::error::ImageError;
use crate::render::ImageRenderer;

/// Decodes a resolved image.
pub trait ImageLoader {
    fn load(&self, image: &ResolvedImage) -> Result<DynamicImage, ImageError>;
}

impl<T: ImageLoader + ?Sized> ImageLoader for &T {
    fn load(&self, image: &ResolvedImage) -> Result<DynamicImage, ImageError> {
        (**self).load(image)
    }
}

/// Loads local files. Remote images are reported unavailable so the
/// literal markdown stays visible.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileImageLoader;

impl ImageLoader for FileImageLoader {
    fn load(&self, image: &ResolvedImage) -> Result<DynamicImage, ImageError> {
        match image {
            ResolvedImage::Local { path, .. } => {
                let decoded = image::open(path).map_err(|source| ImageError::Decode {
                    path: path.clone(),
                    source,
                })?;
                if decoded.width() == 0 || decoded.height() == 0 {
                    return Err(ImageError::ZeroSized(path.display().to_string()));
                }
                Ok(decoded)
            }
            ResolvedImage::Remote(url) => Err(ImageError::RemoteUnavailable(url.to_string())),
        }
    }
}

/// Display size capped to `max_width`, aspect preserved. Zero means no cap.
pub fn display_size(width: u32, height: u32, max_width: u32) -> (u32, u32) {
    if max_width == 0 || width <= max_width {
        return (width, height);
    }
    let scaled = (u64::from(height) * u64::from(max_width) + u64::from(width) / 2) / u64::from(width);
    (max_width, u32::try_from(scaled).unwrap_or(u32::MAX).max(1))
}

/// Resolves, loads through the cache, and sizes images for display.
#[derive(Debug, Clone)]
pub struct CachedImageRenderer<'c, L = FileImageLoader> {
    pub context: ImageContext,
    pub cache: &'c ImageCache,
    pub loader: L,
    pub max_width: u32,
}

impl<'c> CachedImageRenderer<'c, FileImageLoader> {
    pub fn new(context: ImageContext, max_width: u32) -> Self {
        Self {
            context,
            cache: ImageCache::shared(),
            loader: FileImageLoader,
            max_width,
        }
    }

    /// A renderer configured from `settings`: remote images, display width,
    /// and the cache caps, which are applied to `cache` here.
    pub fn from_settings(
        context: ImageContext,
        settings: &RenderSettings,
        cache: &'c ImageCache,
    ) -> Self {
        cache.set_limits(settings.image_cache);
        Self::new(context.with_remote(settings.remote_images), settings.max_image_width)
            .with_cache(cache)
    }
}

impl<'c, L: ImageLoader> CachedImageRenderer<'c, L> {
    pub fn with_cache(mut self, cache: &'c ImageCache) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_loader<M: ImageLoader>(self, loader: M) -> CachedImageRenderer<'c, M> {
        CachedImageRenderer {
            context: self.context,
            cache: self.cache,
            loader,
            max_width: self.max_width,
        }
    }

    /// Resolve and load, returning the cache key with the bitmap.
    pub fn load(&self, source: &str) -> Result<(String, Arc<DynamicImage>), ImageError> {
        let resolved = resolve_image(source, &self.context)?;
        let key = resolved.url().to_string();
        let image = self.cache.get_or_load(&key, || self.loader.load(&resolved))?;
        Ok((key, image))
    }
}

impl<L: ImageLoader> ImageRenderer for CachedImageRenderer<'_, L> {
    fn render_image(&self, source: &str) -> Option<RenderedImage> {
        match self.load(source) {
            Ok((key, image)) => {
                let (width, height) = display_size(image.width(), image.height(), self.max_width);
                Some(RenderedImage {
                    cache_key: key.into(),
                    width,
                    height,
                })
            }
            Err(err) => {
                tracing::debug!(
                    target: "livemark::image",
                    source,
                    %err,
                    "image left as literal markdown"
                );
                None
            }
        }
    }
}
