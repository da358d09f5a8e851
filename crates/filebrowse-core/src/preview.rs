//! Preview images.

use std::sync::OnceLock;

/// A decoded preview image in 8-bit RGBA.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewImage {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Pixel data, `width * height * 4` bytes.
    pub rgba: Vec<u8>,
}

impl PreviewImage {
    /// Create an image, returning `None` when the buffer size does not match the dimensions.
    pub fn new(width: u32, height: u32, rgba: Vec<u8>) -> Option<Self> {
        let expected = (width as usize)
            .checked_mul(height as usize)?
            .checked_mul(4)?;
        (rgba.len() == expected).then_some(Self {
            width,
            height,
            rgba,
        })
    }

    /// A single-colour image, mostly useful for generators and tests.
    pub fn solid(width: u32, height: u32, color: [u8; 4]) -> Self {
        let pixels = width as usize * height as usize;
        let rgba = color.iter().copied().cycle().take(pixels * 4).collect();
        Self {
            width,
            height,
            rgba,
        }
    }
}

/// Preview owned by a live object, rendered elsewhere and published once.
#[derive(Debug, Default)]
pub struct LocalPreview {
    image: OnceLock<PreviewImage>,
}

impl LocalPreview {
    /// Create an unfinished preview.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an already finished preview.
    pub fn finished_with(image: PreviewImage) -> Self {
        let preview = Self::new();
        preview.finish(image);
        preview
    }

    /// Publish the rendered image. Later calls are ignored.
    pub fn finish(&self, image: PreviewImage) {
        let _ = self.image.set(image);
    }

    /// The finished image, if rendering completed.
    pub fn finished(&self) -> Option<&PreviewImage> {
        self.image.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preview_size_check() {
        assert!(PreviewImage::new(2, 2, vec![0; 16]).is_some());
        assert!(PreviewImage::new(2, 2, vec![0; 15]).is_none());
    }

    #[test]
    fn test_solid_preview() {
        let img = PreviewImage::solid(3, 1, [1, 2, 3, 4]);
        assert_eq!(img.rgba, vec![1, 2, 3, 4, 1, 2, 3, 4, 1, 2, 3, 4]);
    }

    #[test]
    fn test_local_preview_finish_once() {
        let preview = LocalPreview::new();
        assert!(preview.finished().is_none());
        preview.finish(PreviewImage::solid(1, 1, [0; 4]));
        preview.finish(PreviewImage::solid(2, 2, [0; 4]));
        assert_eq!(preview.finished().map(|i| i.width), Some(1));
    }
}
