//! Rendering traits for the styling passes.
//!
//! Image substitution is an external concern: the pass asks an
//! [`ImageRenderer`] for a rendered representation and falls back to the
//! literal markdown when it gets none.

use crate::attributes::RenderedImage;

/// Turns an image source into something the drawing layer can paint.
pub trait ImageRenderer {
    /// Returns `None` to keep the literal markdown visible.
    fn render_image(&self, source: &str) -> Option<RenderedImage>;
}

/// Unit type implementation - images always stay literal.
impl ImageRenderer for () {
    fn render_image(&self, _source: &str) -> Option<RenderedImage> {
        None
    }
}

impl<T: ImageRenderer + ?Sized> ImageRenderer for &T {
    fn render_image(&self, source: &str) -> Option<RenderedImage> {
        (**self).render_image(source)
    }
}

impl<T: ImageRenderer> ImageRenderer for Option<T> {
    fn render_image(&self, source: &str) -> Option<RenderedImage> {
        self.as_ref().and_then(|r| r.render_image(source))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedRenderer;

    impl ImageRenderer for FixedRenderer {
        fn render_image(&self, source: &str) -> Option<RenderedImage> {
            source.ends_with(".png").then(|| RenderedImage {
                cache_key: source.into(),
                width: 10,
                height: 5,
            })
        }
    }

    #[test]
    fn test_unit_impl() {
        assert_eq!(().render_image("a.png"), None);
    }

    #[test]
    fn test_option_and_ref_impls() {
        let some = Some(FixedRenderer);
        assert_eq!(some.render_image("a.png").map(|r| r.width), Some(10));
        assert_eq!(some.render_image("a.txt"), None);

        let none: Option<FixedRenderer> = None;
        assert_eq!(none.render_image("a.png"), None);

        let by_ref = &FixedRenderer;
        assert!(by_ref.render_image("b.png").is_some());
    }
}
