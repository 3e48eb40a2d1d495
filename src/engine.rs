//! The catalog engine - owns folders, catalog and tags, and keeps them in
//! step across rescans.
//!
//! Lock order is always tags, then catalog. A scan holds the scan gate for
//! its whole run; tag edits only need the tags lock, so they can land
//! between the scan's merge and its tag collection without being lost.

use crate::catalog::Catalog;
use crate::config::{NoPersist, TagPersist};
use crate::error::{Diagnostic, EngineError, EngineResult, Reporter};
use crate::folders::FolderSet;
use crate::image_manager::scan_folders;
use crate::search::{filter, TaggedEntry};
use crate::state::CatalogEntry;
use crate::tags::{parse_tag_text, tags_text, TagIndex};
use crate::thumbnail::ThumbnailCache;
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, TryLockError};

/// What to do when a scan is requested while another is running
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScanPolicy {
    /// Fail with [`EngineError::ConcurrentScanRejected`]
    #[default]
    Reject,
    /// Queue behind the running scan
    Wait,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ScanReport {
    #[serde(serialize_with = "lossy_paths")]
    pub added: BTreeSet<PathBuf>,
    #[serde(serialize_with = "lossy_paths")]
    pub removed: BTreeSet<PathBuf>,
    pub total: usize,
    /// File names whose tags were dropped because the image is gone
    pub collected_tags: Vec<String>,
}

/// Paths that are not valid UTF-8 still show up, with replacement characters
fn lossy_paths<S: serde::Serializer>(paths: &BTreeSet<PathBuf>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_seq(paths.iter().map(|p| p.to_string_lossy()))
}

/// One line of the tag manager: a live file name and its tags
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TagRow {
    pub file_name: String,
    pub tags: Vec<String>,
    pub tags_text: String,
}

pub struct Engine {
    folders: RwLock<FolderSet>,
    catalog: RwLock<Catalog>,
    tags: Mutex<TagIndex>,
    scan_gate: Mutex<()>,
    thumbnails: ThumbnailCache,
    persist: Arc<dyn TagPersist>,
    reporter: Reporter,
}

impl Engine {
    /// An engine with an empty catalog. Nothing is scanned until
    /// [`Engine::rescan`] is called.
    pub fn new(folders: FolderSet, tags: TagIndex) -> Self {
        Self {
            folders: RwLock::new(folders),
            catalog: RwLock::new(Catalog::default()),
            tags: Mutex::new(tags),
            scan_gate: Mutex::new(()),
            thumbnails: ThumbnailCache::default(),
            persist: Arc::new(NoPersist),
            reporter: Reporter::silent(),
        }
    }

    pub fn with_persist(mut self, persist: Arc<dyn TagPersist>) -> Self {
        self.persist = persist;
        self
    }

    pub fn with_thumbnails(mut self, thumbnails: ThumbnailCache) -> Self {
        self.thumbnails = thumbnails;
        self
    }

    pub fn with_diagnostics<F>(mut self, callback: F) -> Self
    where
        F: Fn(&Diagnostic) + Send + Sync + 'static,
    {
        self.reporter = Reporter::new(callback);
        self
    }

    fn lock_tags(&self) -> MutexGuard<'_, TagIndex> {
        self.tags.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn folders(&self) -> FolderSet {
        self.folders.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Replace the folder list. Takes effect on the next scan.
    pub fn set_folders(&self, folders: FolderSet) {
        *self.folders.write().unwrap_or_else(PoisonError::into_inner) = folders;
    }

    /// Snapshot of the catalog. Entries share thumbnails with the engine.
    pub fn catalog(&self) -> Catalog {
        self.catalog.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn tag_index(&self) -> TagIndex {
        self.lock_tags().clone()
    }

    pub fn is_scanning(&self) -> bool {
        matches!(self.scan_gate.try_lock(), Err(TryLockError::WouldBlock))
    }

    /// Rescan, refusing to run alongside another scan
    pub fn rescan(&self) -> EngineResult<ScanReport> {
        self.rescan_with(ScanPolicy::Reject)
    }

    /// Enumerate the folders, merge into the catalog, then drop tags of
    /// file names that no longer exist.
    pub fn rescan_with(&self, policy: ScanPolicy) -> EngineResult<ScanReport> {
        let _scan = match policy {
            ScanPolicy::Reject => match self.scan_gate.try_lock() {
                Ok(guard) => guard,
                Err(TryLockError::WouldBlock) => return Err(EngineError::ConcurrentScanRejected),
                Err(TryLockError::Poisoned(p)) => p.into_inner(),
            },
            ScanPolicy::Wait => self.scan_gate.lock().unwrap_or_else(PoisonError::into_inner),
        };

        let folders = self.folders();
        let scanned = scan_folders(&folders, &self.reporter);
        let outcome = self.catalog().merge(scanned, &self.thumbnails, &self.reporter);
        let live = outcome.catalog.live_names();
        let total = outcome.catalog.len();

        let collected_tags = {
            let mut tags = self.lock_tags();
            *self.catalog.write().unwrap_or_else(PoisonError::into_inner) = outcome.catalog;
            let dropped = tags.garbage_collect(&live);
            if !dropped.is_empty() {
                self.persist_tags(&tags);
            }
            dropped
        };

        log::info!(
            "Scan finished: {} image(s), {} added, {} removed, {} tag key(s) dropped",
            total,
            outcome.added.len(),
            outcome.removed.len(),
            collected_tags.len()
        );

        Ok(ScanReport {
            added: outcome.added,
            removed: outcome.removed,
            total,
            collected_tags,
        })
    }

    fn persist_tags(&self, tags: &TagIndex) {
        if let Err(e) = self.persist.persist(tags) {
            self.reporter.report(Diagnostic::PersistFailed {
                reason: e.to_string(),
            });
        }
    }

    pub fn tags_for(&self, file_name: &str) -> Vec<String> {
        self.lock_tags().get(file_name)
    }

    /// Replace the tags of a file name and persist. Returns what was stored.
    pub fn set_tags<S: AsRef<str>>(&self, file_name: &str, tags: &[S]) -> Vec<String> {
        let mut index = self.lock_tags();
        let update = index.set(file_name, tags);

        for (tag, reason) in update.rejected {
            self.reporter.report(Diagnostic::TagValidationRejected {
                file_name: file_name.to_string(),
                tag,
                reason,
            });
        }
        if update.changed {
            self.persist_tags(&index);
        }

        update.stored
    }

    /// Like [`Engine::set_tags`], from comma separated text
    pub fn set_tag_text(&self, file_name: &str, text: &str) -> Vec<String> {
        self.set_tags(file_name, parse_tag_text(text).as_slice())
    }

    pub fn search(&self, keyword: &str) -> Vec<TaggedEntry> {
        let tags = self.lock_tags();
        let catalog = self.catalog.read().unwrap_or_else(PoisonError::into_inner);
        filter(&catalog, &tags, keyword)
    }

    pub fn entry_by_name(&self, file_name: &str) -> Option<CatalogEntry> {
        self.catalog
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .find_by_name(file_name)
            .cloned()
    }

    /// Every live file name, sorted ignoring case, with its tags
    pub fn tag_rows(&self) -> Vec<TagRow> {
        let tags = self.lock_tags();
        let catalog = self.catalog.read().unwrap_or_else(PoisonError::into_inner);

        let mut rows: Vec<TagRow> = catalog
            .entries()
            .iter()
            .map(|entry| {
                let entry_tags = tags.get(&entry.file_name);
                TagRow {
                    file_name: entry.file_name.clone(),
                    tags_text: tags_text(&entry_tags),
                    tags: entry_tags,
                }
            })
            .collect();
        rows.sort_by_key(|row| row.file_name.to_lowercase());
        rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigError;
    use crate::folders::FolderEntry;
    use crate::thumbnail::{Thumbnail, Thumbnailer};
    use std::fs;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::mpsc;
    use tempfile::TempDir;

    #[derive(Default)]
    struct CountingPersist {
        calls: AtomicUsize,
        last: Mutex<Option<TagIndex>>,
    }

    impl TagPersist for CountingPersist {
        fn persist(&self, tags: &TagIndex) -> Result<(), ConfigError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last.lock().unwrap() = Some(tags.clone());
            Ok(())
        }
    }

    struct FailingPersist;

    impl TagPersist for FailingPersist {
        fn persist(&self, _tags: &TagIndex) -> Result<(), ConfigError> {
            Err(ConfigError::Io {
                path: PathBuf::from("/readonly/config.json"),
                source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only"),
            })
        }
    }

    /// Parks the scan while decoding `new.png` until the test releases it
    struct GatedThumbnailer {
        entered: Mutex<mpsc::Sender<()>>,
        release: Mutex<mpsc::Receiver<()>>,
    }

    impl Thumbnailer for GatedThumbnailer {
        fn thumbnail(&self, path: &Path) -> Result<Thumbnail, String> {
            if path.ends_with("new.png") {
                self.entered.lock().unwrap().send(()).unwrap();
                self.release.lock().unwrap().recv().unwrap();
            }
            Err("not an image".to_string())
        }
    }

    fn folder_with(files: &[&str]) -> TempDir {
        let dir = TempDir::new().unwrap();
        for name in files {
            fs::write(dir.path().join(name), b"").unwrap();
        }
        dir
    }

    fn engine_for(dir: &TempDir) -> Engine {
        let folders = FolderSet::new(vec![FolderEntry::new(dir.path().to_string_lossy())]);
        Engine::new(folders, TagIndex::default())
    }

    #[test]
    fn test_set_tags_persists_only_on_change() {
        let dir = folder_with(&["cat.png"]);
        let persist = Arc::new(CountingPersist::default());
        let engine = engine_for(&dir).with_persist(persist.clone());

        assert_eq!(engine.set_tags("cat.png", &["pet"]), vec!["#pet"]);
        engine.set_tags("cat.png", &["#pet"]);
        assert_eq!(persist.calls.load(Ordering::SeqCst), 1);

        let last = persist.last.lock().unwrap().clone().unwrap();
        assert_eq!(last.get("cat.png"), vec!["#pet"]);
    }

    #[test]
    fn test_rejected_tags_are_reported() {
        let dir = folder_with(&["cat.png"]);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let engine = engine_for(&dir).with_diagnostics(move |d| sink.lock().unwrap().push(d.clone()));

        let stored = engine.set_tag_text("cat.png", "pet, this-tag-is-far-too-long-to-keep");

        assert_eq!(stored, vec!["#pet"]);
        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert!(matches!(seen[0], Diagnostic::TagValidationRejected { .. }));
    }

    #[test]
    fn test_persist_failure_is_a_diagnostic() {
        let dir = folder_with(&["cat.png"]);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let engine = engine_for(&dir)
            .with_persist(Arc::new(FailingPersist))
            .with_diagnostics(move |d| sink.lock().unwrap().push(d.clone()));

        assert_eq!(engine.set_tags("cat.png", &["pet"]), vec!["#pet"]);
        assert_eq!(engine.tags_for("cat.png"), vec!["#pet"]);
        assert!(matches!(seen.lock().unwrap()[0], Diagnostic::PersistFailed { .. }));
    }

    #[test]
    fn test_scan_rejected_while_gate_held() {
        let dir = folder_with(&["cat.png"]);
        let engine = engine_for(&dir);

        let held = engine.scan_gate.lock().unwrap();
        assert!(engine.is_scanning());
        assert!(matches!(engine.rescan(), Err(EngineError::ConcurrentScanRejected)));
        drop(held);

        assert!(!engine.is_scanning());
        assert_eq!(engine.rescan().unwrap().total, 1);
    }

    #[test]
    fn test_waiting_scan_runs_after_current_one() {
        let dir = folder_with(&["cat.png"]);
        let engine = Arc::new(engine_for(&dir));

        let held = engine.scan_gate.lock().unwrap();
        let waiter = {
            let engine = Arc::clone(&engine);
            std::thread::spawn(move || engine.rescan_with(ScanPolicy::Wait))
        };
        std::thread::sleep(std::time::Duration::from_millis(50));
        assert!(engine.catalog().is_empty());
        drop(held);

        let report = waiter.join().unwrap().unwrap();
        assert_eq!(report.total, 1);
    }

    #[test]
    fn test_tag_edit_during_scan_survives_gc() {
        let dir = folder_with(&["cat.png", "gone.png"]);
        let (entered_tx, entered_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel();
        let persist = Arc::new(CountingPersist::default());
        let engine = engine_for(&dir)
            .with_persist(persist.clone())
            .with_thumbnails(ThumbnailCache::new(Box::new(GatedThumbnailer {
                entered: Mutex::new(entered_tx),
                release: Mutex::new(release_rx),
            })));
        engine.rescan().unwrap();
        engine.set_tags("gone.png", &["old"]);

        fs::remove_file(dir.path().join("gone.png")).unwrap();
        fs::write(dir.path().join("new.png"), b"").unwrap();

        let report = std::thread::scope(|s| {
            let scan = s.spawn(|| engine.rescan());
            entered_rx.recv().unwrap();
            assert!(engine.is_scanning());
            assert_eq!(engine.set_tags("cat.png", &["pet"]), vec!["#pet"]);
            release_tx.send(()).unwrap();
            scan.join().unwrap().unwrap()
        });

        assert_eq!(report.collected_tags, vec!["gone.png"]);
        assert_eq!(engine.tags_for("cat.png"), vec!["#pet"]);

        let last = persist.last.lock().unwrap().clone().unwrap();
        assert_eq!(last.get("cat.png"), vec!["#pet"]);
        assert!(!last.contains("gone.png"));
    }

    #[test]
    fn test_gc_persists_once_and_reports_names() {
        let dir = folder_with(&["cat.png", "dog.png"]);
        let persist = Arc::new(CountingPersist::default());
        let engine = engine_for(&dir).with_persist(persist.clone());
        engine.rescan().unwrap();
        engine.set_tags("dog.png", &["good"]);

        fs::remove_file(dir.path().join("dog.png")).unwrap();
        let report = engine.rescan().unwrap();

        assert_eq!(report.collected_tags, vec!["dog.png"]);
        assert_eq!(persist.calls.load(Ordering::SeqCst), 2);
        assert!(engine.tag_index().is_empty());

        let quiet = engine.rescan().unwrap();
        assert!(quiet.collected_tags.is_empty());
        assert_eq!(persist.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_tag_rows_sorted_and_tagged() {
        let dir = folder_with(&["b.png", "A.png", "c.gif"]);
        let engine = engine_for(&dir);
        engine.rescan().unwrap();
        engine.set_tags("c.gif", &["anim", "loop"]);

        let rows = engine.tag_rows();
        let names: Vec<&str> = rows.iter().map(|r| r.file_name.as_str()).collect();
        assert_eq!(names, vec!["A.png", "b.png", "c.gif"]);
        assert_eq!(rows[2].tags_text, "#anim, #loop");
        assert!(rows[0].tags.is_empty());
    }

    #[test]
    fn test_set_folders_applies_on_next_scan() {
        let first = folder_with(&["one.png"]);
        let second = folder_with(&["two.png"]);
        let engine = engine_for(&first);
        engine.rescan().unwrap();

        let mut folders = engine.folders();
        folders.add(second.path().to_string_lossy());
        folders.set_enabled(&first.path().to_string_lossy(), false);
        engine.set_folders(folders);
        assert!(engine.entry_by_name("one.png").is_some());

        let report = engine.rescan().unwrap();
        assert_eq!(report.total, 1);
        assert!(engine.entry_by_name("one.png").is_none());
        assert!(engine.entry_by_name("TWO.png").is_some());
    }
}
