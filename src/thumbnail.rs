//! Thumbnail generation for catalog previews

use crate::error::{Diagnostic, Reporter};
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, RgbaImage};
use std::path::Path;
use std::sync::Arc;

/// Default maximum preview width in pixels
pub const DEFAULT_MAX_WIDTH: u32 = 128;

/// A decoded, size-bounded preview
#[derive(Debug, Clone, PartialEq)]
pub struct Thumbnail {
    pub width: u32,
    pub height: u32,
    pub pixels: RgbaImage,
}

/// Shared, immutable handle to a thumbnail. Cloning never copies pixels.
pub type ThumbnailHandle = Arc<Thumbnail>;

/// Produces a preview for one file
pub trait Thumbnailer: Send + Sync {
    fn thumbnail(&self, path: &Path) -> Result<Thumbnail, String>;
}

/// Decodes files with the `image` crate and shrinks them to a maximum width
#[derive(Debug, Clone)]
pub struct ImageThumbnailer {
    max_width: u32,
}

impl ImageThumbnailer {
    pub fn new(max_width: u32) -> Self {
        Self {
            max_width: max_width.max(1),
        }
    }
}

impl Default for ImageThumbnailer {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_WIDTH)
    }
}

impl Thumbnailer for ImageThumbnailer {
    fn thumbnail(&self, path: &Path) -> Result<Thumbnail, String> {
        let img = image::open(path).map_err(|e| e.to_string())?;
        let img = shrink_to_width(img, self.max_width);
        let (width, height) = img.dimensions();

        Ok(Thumbnail {
            width,
            height,
            pixels: img.to_rgba8(),
        })
    }
}

/// Scale down (never up) so the width fits, keeping the aspect ratio
fn shrink_to_width(img: DynamicImage, max_width: u32) -> DynamicImage {
    let (width, height) = img.dimensions();
    if width <= max_width {
        return img;
    }
    let new_height = ((height as u64 * max_width as u64) / width as u64).max(1) as u32;
    img.resize_exact(max_width, new_height, FilterType::Triangle)
}

/// Turns a thumbnailer's results into shareable handles, reporting failures.
///
/// Handles are stored on catalog entries, so an entry that survives a rescan
/// keeps the handle it was created with.
pub struct ThumbnailCache {
    thumbnailer: Box<dyn Thumbnailer>,
}

impl ThumbnailCache {
    pub fn new(thumbnailer: Box<dyn Thumbnailer>) -> Self {
        Self { thumbnailer }
    }

    pub fn with_max_width(max_width: u32) -> Self {
        Self::new(Box::new(ImageThumbnailer::new(max_width)))
    }

    /// Decode a preview. A file that cannot be decoded gets no thumbnail.
    pub fn thumbnail_for(&self, path: &Path, reporter: &Reporter) -> Option<ThumbnailHandle> {
        match self.thumbnailer.thumbnail(path) {
            Ok(thumbnail) => Some(Arc::new(thumbnail)),
            Err(reason) => {
                reporter.report(Diagnostic::DecodeFailure {
                    path: path.to_path_buf(),
                    reason,
                });
                None
            }
        }
    }
}

impl Default for ThumbnailCache {
    fn default() -> Self {
        Self::new(Box::new(ImageThumbnailer::default()))
    }
}
