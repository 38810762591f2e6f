//! GPU-texture-backed images

use glow::HasContext;
use quadra_paint::Rectangle;

use crate::engine::Engine;

/// A handle to a GPU texture plus cached metadata.
///
/// Whoever holds the image owns its texture and must release it
/// exactly once via [`Image::release`]; releasing an already-empty
/// image is a no-op. Drawing an empty image is a caller error, guarded
/// with [`Image::is_empty`].
#[derive(Debug)]
pub struct Image {
    id: Option<glow::Texture>,
    width: u32,
    height: u32,
    flipped: bool,
    has_alpha: bool,
}

impl Image {
    /// The sentinel empty image: zero size, no texture.
    pub fn empty() -> Image {
        Image {
            id: None,
            width: 0,
            height: 0,
            flipped: false,
            has_alpha: false,
        }
    }

    pub(crate) fn from_texture(
        id: glow::Texture,
        width: u32,
        height: u32,
        flipped: bool,
        has_alpha: bool,
    ) -> Image {
        Image {
            id: Some(id),
            width,
            height,
            flipped,
            has_alpha,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Whether the texture rows are stored top-down (decoded images)
    /// rather than in GL's bottom-up order (canvas targets). Sampling
    /// compensates with a vertical flip.
    pub fn is_flipped(&self) -> bool {
        self.flipped
    }

    pub fn has_alpha(&self) -> bool {
        self.has_alpha
    }

    pub(crate) fn texture(&self) -> Option<glow::Texture> {
        self.id
    }

    /// The full image area, anchored at the origin.
    pub fn area(&self) -> Rectangle {
        Rectangle::new(0, 0, self.width, self.height)
    }

    /// Draw `src_area` of the image into `dst_area` of the current
    /// target, modulated by `alpha`.
    pub fn draw(&self, engine: &mut Engine, dst_area: Rectangle, src_area: Rectangle, alpha: u8) {
        engine.draw_image(
            self,
            dst_area.transformation(),
            src_area.transformation(),
            alpha,
        );
    }

    /// Draw the whole image into `dst_area`.
    pub fn draw_all(&self, engine: &mut Engine, dst_area: Rectangle, alpha: u8) {
        self.draw(engine, dst_area, self.area(), alpha);
    }

    /// Free the GPU texture and turn this image into the empty
    /// sentinel. Safe to call again afterwards.
    pub fn release(&mut self, engine: &Engine) {
        if let Some(id) = self.id.take() {
            unsafe { engine.gl.delete_texture(id) };
        }
        self.width = 0;
        self.height = 0;
        self.flipped = false;
        self.has_alpha = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_sentinel() {
        let image = Image::empty();
        assert!(image.is_empty());
        assert_eq!(image.width(), 0);
        assert_eq!(image.height(), 0);
        assert!(image.texture().is_none());
    }

    #[test]
    fn test_area_is_anchored_at_origin() {
        let image = Image {
            id: None,
            width: 640,
            height: 480,
            flipped: true,
            has_alpha: false,
        };
        assert_eq!(image.area(), Rectangle::new(0, 0, 640, 480));
    }
}
