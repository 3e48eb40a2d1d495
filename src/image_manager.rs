//! Image discovery - enumerating watched folders for catalogable files

use crate::error::{Diagnostic, Reporter};
use crate::folders::{FolderEntry, FolderSet};
use crate::state::is_supported_image;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Generate a unique ID for an image based on its path
pub fn generate_image_id(path: &Path) -> String {
    let hash = md5::compute(path.to_string_lossy().as_bytes());
    format!("{:x}", hash)[..12].to_string()
}

/// One image file found during a scan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedFile {
    pub file_path: PathBuf,
    pub file_name: String,
    /// Position of the producing folder in the folder set
    pub folder_index: usize,
}

/// Scan every enabled folder, in folder order.
///
/// Folders that are missing or cannot be listed contribute nothing; the
/// scan always completes.
pub fn scan_folders(folders: &FolderSet, reporter: &Reporter) -> Vec<ScannedFile> {
    let mut scanned = Vec::new();

    for (idx, folder) in folders.entries().iter().enumerate() {
        if !folder.enabled {
            continue;
        }

        if !folder.is_scannable() {
            reporter.report(Diagnostic::FolderUnavailable {
                path: PathBuf::from(&folder.path),
                reason: "folder does not exist".to_string(),
            });
            continue;
        }

        match scan_folder(folder, idx) {
            Ok(files) => {
                log::debug!("{} image(s) in {}", files.len(), folder.path);
                scanned.extend(files);
            }
            Err(e) => reporter.report(Diagnostic::FolderUnavailable {
                path: PathBuf::from(&folder.path),
                reason: e.to_string(),
            }),
        }
    }

    scanned
}

/// List the images directly inside one folder, sorted by file name.
///
/// A failure to read the folder itself fails the whole folder; an
/// unreadable individual entry is skipped.
pub fn scan_folder(folder: &FolderEntry, folder_index: usize) -> Result<Vec<ScannedFile>, walkdir::Error> {
    let root = Path::new(&folder.path);
    let walker = WalkDir::new(root)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
        .sort_by_file_name();

    let mut files = Vec::new();
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) if e.depth() == 0 => return Err(e),
            Err(e) => {
                log::debug!("Skipping unreadable entry in {}: {}", folder.path, e);
                continue;
            }
        };

        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        if !is_supported_image(path) {
            continue;
        }

        files.push(ScannedFile {
            file_path: path.to_path_buf(),
            file_name: entry.file_name().to_string_lossy().to_string(),
            folder_index,
        });
    }

    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;

    fn touch(dir: &Path, name: &str) {
        fs::write(dir.join(name), b"not really an image").unwrap();
    }

    fn names(files: &[ScannedFile]) -> Vec<&str> {
        files.iter().map(|f| f.file_name.as_str()).collect()
    }

    #[test]
    fn test_scan_filters_extensions_and_is_not_recursive() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "b.JPG");
        touch(dir.path(), "a.png");
        touch(dir.path(), "notes.txt");
        touch(dir.path(), "shortcut.lnk");
        touch(dir.path(), "vector.svg");
        fs::create_dir(dir.path().join("nested")).unwrap();
        touch(&dir.path().join("nested"), "deep.png");

        let folder = FolderEntry::new(dir.path().to_string_lossy());
        let files = scan_folder(&folder, 3).unwrap();

        assert_eq!(names(&files), vec!["a.png", "b.JPG"]);
        assert!(files.iter().all(|f| f.folder_index == 3));
    }

    #[test]
    fn test_scan_skips_disabled_and_missing_folders() {
        let live = TempDir::new().unwrap();
        let disabled = TempDir::new().unwrap();
        touch(live.path(), "one.png");
        touch(disabled.path(), "two.png");

        let mut set = FolderSet::default();
        set.add("/no/such/folder/for/hyio");
        set.add(disabled.path().to_string_lossy());
        set.add(live.path().to_string_lossy());
        set.set_enabled(&disabled.path().to_string_lossy(), false);

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let reporter = Reporter::new(move |d| sink.lock().unwrap().push(d.clone()));

        let files = scan_folders(&set, &reporter);

        assert_eq!(names(&files), vec!["one.png"]);
        assert_eq!(files[0].folder_index, 2);
        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert!(matches!(seen[0], Diagnostic::FolderUnavailable { .. }));
    }

    #[test]
    fn test_generate_image_id_is_short_hex() {
        let id = generate_image_id(Path::new("/pictures/cat.png"));
        assert_eq!(id.len(), 12);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
