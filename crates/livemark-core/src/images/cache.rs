//! Process-wide decoded image cache.
//!
//! An LRU bounded by both entry count and total cost. Every operation,
//! lookups included, takes the lock: a hit promotes the entry.

use std::sync::{Arc, LazyLock, Mutex, MutexGuard};

use image::DynamicImage;
use lru::LruCache;

use crate::config::ImageCacheLimits;
use crate::error::ImageError;

/// Approximate decoded size in bytes, never below 1.
pub fn image_cost(image: &DynamicImage) -> usize {
    let pixels = u64::from(image.width()) * u64::from(image.height());
    usize::try_from(pixels.saturating_mul(4))
        .unwrap_or(usize::MAX)
        .max(1)
}

struct Entry {
    image: Arc<DynamicImage>,
    cost: usize,
}

struct Inner {
    entries: LruCache<String, Entry>,
    total_cost: usize,
    limits: ImageCacheLimits,
}

impl Inner {
    fn evict(&mut self) {
        while self.entries.len() > self.limits.max_count
            || self.total_cost > self.limits.max_total_cost
        {
            let Some((key, entry)) = self.entries.pop_lru() else {
                break;
            };
            self.total_cost = self.total_cost.saturating_sub(entry.cost);
            tracing::trace!(target: "livemark::image", key = %key, cost = entry.cost, "evicted image");
        }
    }
}

pub struct ImageCache {
    inner: Mutex<Inner>,
}

static SHARED: LazyLock<ImageCache> = LazyLock::new(|| ImageCache::new(ImageCacheLimits::default()));

impl ImageCache {
    pub fn new(limits: ImageCacheLimits) -> Self {
        Self {
            inner: Mutex::new(Inner {
                entries: LruCache::unbounded(),
                total_cost: 0,
                limits,
            }),
        }
    }

    /// The cache shared by every open document.
    pub fn shared() -> &'static ImageCache {
        &SHARED
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        match self.inner.lock() {
            Ok(inner) => inner,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Change the caps, evicting immediately if now over either.
    pub fn set_limits(&self, limits: ImageCacheLimits) {
        let mut inner = self.lock();
        inner.limits = limits;
        inner.evict();
    }

    pub fn limits(&self) -> ImageCacheLimits {
        self.lock().limits
    }

    /// Look up and promote to most recently used.
    pub fn get(&self, key: &str) -> Option<Arc<DynamicImage>> {
        self.lock().entries.get(key).map(|entry| entry.image.clone())
    }

    /// Membership test that leaves recency untouched.
    pub fn contains(&self, key: &str) -> bool {
        self.lock().entries.contains(key)
    }

    /// Cache `image` under `key` and hand it back.
    ///
    /// An image costing more than the whole cost cap is returned uncached
    /// and leaves the other entries in place.
    pub fn insert(&self, key: impl Into<String>, image: DynamicImage) -> Arc<DynamicImage> {
        let key = key.into();
        let image = Arc::new(image);
        let cost = image_cost(&image);
        let mut inner = self.lock();
        if cost > inner.limits.max_total_cost {
            if let Some(old) = inner.entries.pop(&key) {
                inner.total_cost = inner.total_cost.saturating_sub(old.cost);
            }
            tracing::debug!(
                target: "livemark::image",
                key = %key,
                cost,
                max_total_cost = inner.limits.max_total_cost,
                "image larger than the cache, not cached"
            );
            return image;
        }
        if let Some(old) = inner.entries.put(
            key,
            Entry {
                image: image.clone(),
                cost,
            },
        ) {
            inner.total_cost = inner.total_cost.saturating_sub(old.cost);
        }
        inner.total_cost = inner.total_cost.saturating_add(cost);
        inner.evict();
        image
    }

    /// Return the cached image or load and insert it. The loader runs
    /// without the lock held.
    pub fn get_or_load<F>(&self, key: &str, load: F) -> Result<Arc<DynamicImage>, ImageError>
    where
        F: FnOnce() -> Result<DynamicImage, ImageError>,
    {
        if let Some(image) = self.get(key) {
            return Ok(image);
        }
        let image = load()?;
        Ok(self.insert(key, image))
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn total_cost(&self) -> usize {
        self.lock().total_cost
    }

    pub fn clear(&self) {
        let mut inner = self.lock();
        inner.entries.clear();
        inner.total_cost = 0;
    }
}

impl std::fmt::Debug for ImageCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.lock();
        f.debug_struct("ImageCache")
            .field("len", &inner.entries.len())
            .field("total_cost", &inner.total_cost)
            .field("limits", &inner.limits)
            .finish()
    }
}
