//! Watched folder list

use serde::{Deserialize, Serialize};
use std::path::Path;

/// A watched folder. Disabled folders stay in the list but are not scanned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct FolderEntry {
    #[serde(default)]
    pub path: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl FolderEntry {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            enabled: true,
        }
    }

    /// Whether this folder takes part in a scan right now
    pub fn is_scannable(&self) -> bool {
        self.enabled && Path::new(&self.path).is_dir()
    }
}

/// Ordered list of watched folders.
///
/// Order matters: when two folders contain a file with the same name, the
/// one listed first wins.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FolderSet {
    entries: Vec<FolderEntry>,
}

impl FolderSet {
    pub fn new(entries: Vec<FolderEntry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[FolderEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn enabled(&self) -> impl Iterator<Item = &FolderEntry> {
        self.entries.iter().filter(|f| f.enabled)
    }

    fn position(&self, path: &str) -> Option<usize> {
        self.entries.iter().position(|f| f.path == path)
    }

    /// Add a folder at the end. Returns false if the path is already watched.
    pub fn add(&mut self, path: impl Into<String>) -> bool {
        let path = path.into();
        if self.position(&path).is_some() {
            return false;
        }
        self.entries.push(FolderEntry::new(path));
        true
    }

    pub fn remove(&mut self, path: &str) -> bool {
        match self.position(path) {
            Some(idx) => {
                self.entries.remove(idx);
                true
            }
            None => false,
        }
    }

    pub fn move_up(&mut self, path: &str) -> bool {
        match self.position(path) {
            Some(idx) if idx > 0 => {
                self.entries.swap(idx, idx - 1);
                true
            }
            _ => false,
        }
    }

    pub fn move_down(&mut self, path: &str) -> bool {
        match self.position(path) {
            Some(idx) if idx + 1 < self.entries.len() => {
                self.entries.swap(idx, idx + 1);
                true
            }
            _ => false,
        }
    }

    pub fn set_enabled(&mut self, path: &str, enabled: bool) -> bool {
        match self.entries.iter_mut().find(|f| f.path == path) {
            Some(entry) => {
                entry.enabled = enabled;
                true
            }
            None => false,
        }
    }
}

impl From<Vec<FolderEntry>> for FolderSet {
    fn from(entries: Vec<FolderEntry>) -> Self {
        Self::new(entries)
    }
}
