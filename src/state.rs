//! Catalog entry types and the image extension policy

use crate::thumbnail::ThumbnailHandle;
use std::path::{Path, PathBuf};

/// Supported image extensions
pub const SUPPORTED_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp", "gif", "webp"];

/// Extensions that are never catalogued, even if someone adds them to the
/// allow-list above. Opening these would hand control to the OS shell.
pub const BLOCKED_EXTENSIONS: &[&str] = &["lnk", "url", "ico", "svg", "exe", "desktop"];

/// Whether a path has an extension the scanner accepts (case-insensitive)
pub fn is_supported_image(path: &Path) -> bool {
    let Some(ext) = path.extension() else {
        return false;
    };
    let ext_lower = ext.to_string_lossy().to_lowercase();
    !BLOCKED_EXTENSIONS.contains(&ext_lower.as_str())
        && SUPPORTED_EXTENSIONS.contains(&ext_lower.as_str())
}

/// Case-folded file name, the key used for tags and for cross-folder dedup
pub fn name_key(file_name: &str) -> String {
    file_name.to_lowercase()
}

/// A single image known to the catalog.
///
/// `file_path` identifies the entry across scans; `file_name` is what tags
/// are attached to.
#[derive(Debug, Clone)]
pub struct CatalogEntry {
    pub id: String,
    pub file_path: PathBuf,
    pub file_name: String,
    pub thumbnail: Option<ThumbnailHandle>,
}

impl CatalogEntry {
    pub fn new(file_path: PathBuf, file_name: String, thumbnail: Option<ThumbnailHandle>) -> Self {
        Self {
            id: crate::image_manager::generate_image_id(&file_path),
            file_path,
            file_name,
            thumbnail,
        }
    }

    pub fn folder(&self) -> String {
        self.file_path
            .parent()
            .map(|p| p.to_string_lossy().to_string())
            .unwrap_or_default()
    }

    pub fn has_thumbnail(&self) -> bool {
        self.thumbnail.is_some()
    }
}
