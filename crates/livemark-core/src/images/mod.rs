//! Images referenced from markdown: resolution, loading, caching.

pub mod cache;
pub mod loader;
pub mod resolve;

pub use cache::{ImageCache, image_cost};
pub use loader::{CachedImageRenderer, FileImageLoader, ImageLoader, display_size};
pub use resolve::{ImageContext, ResolvedImage, resolve_image};
