//! The catalog - merging scan results into the known image set

use crate::error::Reporter;
use crate::image_manager::ScannedFile;
use crate::state::{name_key, CatalogEntry};
use crate::thumbnail::ThumbnailCache;
use rayon::prelude::*;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::{Path, PathBuf};

/// The images currently known, in presentation order.
///
/// No two entries share a path, and no two entries share a file name
/// (compared case-insensitively).
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    entries: Vec<CatalogEntry>,
}

/// Result of reconciling a scan against the previous catalog
#[derive(Debug, Clone, Default)]
pub struct MergeOutcome {
    pub catalog: Catalog,
    pub added: BTreeSet<PathBuf>,
    pub removed: BTreeSet<PathBuf>,
}

impl Catalog {
    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, file_path: &Path) -> Option<&CatalogEntry> {
        self.entries.iter().find(|e| e.file_path == file_path)
    }

    /// Look up an entry by file name, ignoring case
    pub fn find_by_name(&self, file_name: &str) -> Option<&CatalogEntry> {
        let key = name_key(file_name);
        self.entries.iter().find(|e| name_key(&e.file_name) == key)
    }

    /// Case-folded names of every entry; the live set for tag collection
    pub fn live_names(&self) -> HashSet<String> {
        self.entries.iter().map(|e| name_key(&e.file_name)).collect()
    }

    /// Reconcile a scan with this catalog.
    ///
    /// Entries whose path was seen again are carried over untouched, thumbnail
    /// included. New paths get a fresh entry and a thumbnail, decoded in
    /// parallel once classification is finished. When several folders produce
    /// the same file name, the file from the earliest folder wins.
    pub fn merge(
        &self,
        scanned: Vec<ScannedFile>,
        thumbnails: &ThumbnailCache,
        reporter: &Reporter,
    ) -> MergeOutcome {
        let survivors = resolve_name_collisions(scanned);
        let seen: HashSet<&Path> = survivors.iter().map(|f| f.file_path.as_path()).collect();
        let previous: HashMap<&Path, &CatalogEntry> = self
            .entries
            .iter()
            .map(|e| (e.file_path.as_path(), e))
            .collect();

        let mut kept = Vec::with_capacity(survivors.len());
        let mut removed = BTreeSet::new();
        for entry in &self.entries {
            if seen.contains(entry.file_path.as_path()) {
                kept.push(entry.clone());
            } else {
                removed.insert(entry.file_path.clone());
            }
        }

        let new_files: Vec<&ScannedFile> = survivors
            .iter()
            .filter(|f| !previous.contains_key(f.file_path.as_path()))
            .collect();
        let added: BTreeSet<PathBuf> = new_files.iter().map(|f| f.file_path.clone()).collect();

        let fresh: Vec<CatalogEntry> = new_files
            .par_iter()
            .map(|f| {
                let thumbnail = thumbnails.thumbnail_for(&f.file_path, reporter);
                CatalogEntry::new(f.file_path.clone(), f.file_name.clone(), thumbnail)
            })
            .collect();

        kept.extend(fresh);

        MergeOutcome {
            catalog: Catalog { entries: kept },
            added,
            removed,
        }
    }
}

/// Keep the first file per case-folded name, taking folders in priority order
fn resolve_name_collisions(mut scanned: Vec<ScannedFile>) -> Vec<ScannedFile> {
    scanned.sort_by_key(|f| f.folder_index);

    let mut taken = HashSet::new();
    scanned
        .into_iter()
        .filter(|f| {
            let fresh = taken.insert(name_key(&f.file_name));
            if !fresh {
                log::debug!("{} shadowed by an earlier folder", f.file_path.display());
            }
            fresh
        })
        .collect()
}
