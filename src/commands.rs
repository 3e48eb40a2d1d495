//! Command handlers - each returns a serializable response

use crate::cli::{Command, FolderAction, SettingsAction, TagAction, Toggle};
use crate::config::{Config, ConfigStore};
use crate::dispatch::{dispatch, FileCopySink};
use crate::engine::{Engine, ScanPolicy, ScanReport, TagRow};
use crate::error::{EngineError, EngineResult};
use crate::folders::FolderSet;
use crate::hotkey::Hotkey;
use crate::search::TaggedEntry;
use crate::tags::TagIndex;
use crate::thumbnail::ThumbnailCache;
use serde::Serialize;
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

// ============================================================================
// Response types
// ============================================================================

#[derive(Serialize)]
pub struct FolderInfo {
    pub path: String,
    pub enabled: bool,
    pub exists: bool,
}

#[derive(Serialize)]
pub struct FoldersResponse {
    pub changed: bool,
    pub folders: Vec<FolderInfo>,
}

#[derive(Serialize)]
pub struct ScanResponse {
    #[serde(flatten)]
    pub report: ScanReport,
    pub warnings: Vec<String>,
}

#[derive(Serialize)]
pub struct ThumbnailInfo {
    pub width: u32,
    pub height: u32,
}

#[derive(Serialize)]
pub struct ImageInfo {
    pub id: String,
    pub file_name: String,
    pub file_path: String,
    pub folder: String,
    pub tags: Vec<String>,
    pub thumbnail: Option<ThumbnailInfo>,
}

impl From<TaggedEntry> for ImageInfo {
    fn from(item: TaggedEntry) -> Self {
        let entry = item.entry;
        Self {
            folder: entry.folder(),
            id: entry.id,
            file_path: entry.file_path.to_string_lossy().to_string(),
            thumbnail: entry.thumbnail.as_ref().map(|t| ThumbnailInfo {
                width: t.width,
                height: t.height,
            }),
            file_name: entry.file_name,
            tags: item.tags,
        }
    }
}

#[derive(Serialize)]
pub struct SearchResponse {
    pub keyword: String,
    pub total: usize,
    pub matches: Vec<ImageInfo>,
}

#[derive(Serialize)]
pub struct TagsResponse {
    pub file_name: String,
    pub tags: Vec<String>,
}

#[derive(Serialize)]
pub struct SettingsResponse {
    pub hotkey: String,
    pub auto_paste_enabled: bool,
    pub config_path: String,
}

#[derive(Serialize)]
pub struct CopyResponse {
    pub file_name: String,
    pub destination: String,
    pub pasted: bool,
}

// ============================================================================
// Context
// ============================================================================

/// Everything a command needs: the config file and an engine built from it
pub struct AppContext {
    pub store: Arc<ConfigStore>,
    pub engine: Engine,
    warnings: Arc<Mutex<Vec<String>>>,
}

impl AppContext {
    pub fn open(store: Arc<ConfigStore>, thumbnail_width: u32) -> Self {
        let config = store.snapshot();
        let warnings = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&warnings);

        let engine = Engine::new(config.folders.clone(), TagIndex::from_map(&config.tags))
            .with_persist(store.clone())
            .with_thumbnails(ThumbnailCache::with_max_width(thumbnail_width))
            .with_diagnostics(move |d| {
                sink.lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .push(d.to_string())
            });

        Self {
            store,
            engine,
            warnings,
        }
    }

    fn take_warnings(&self) -> Vec<String> {
        std::mem::take(&mut *self.warnings.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

/// Run one parsed command and return its response as JSON
pub fn execute(ctx: &AppContext, command: Command) -> EngineResult<serde_json::Value> {
    let value = match command {
        Command::Folders { action } => to_json(folders(ctx, action)?)?,
        Command::Scan => to_json(scan(ctx)?)?,
        Command::Search { keyword } => to_json(search(ctx, keyword.as_deref().unwrap_or(""))?)?,
        Command::Tags { action } => match action {
            TagAction::List => to_json(tag_rows(ctx)?)?,
            TagAction::Get { file_name } => to_json(get_tags(ctx, &file_name)?)?,
            TagAction::Set { file_name, text } => to_json(set_tags(ctx, &file_name, &text)?)?,
        },
        Command::Settings { action } => to_json(settings(ctx, action)?)?,
        Command::Copy { file_name, out } => to_json(copy_image(ctx, &file_name, &out)?)?,
    };
    Ok(value)
}

fn to_json<T: Serialize>(response: T) -> EngineResult<serde_json::Value> {
    Ok(serde_json::to_value(response)?)
}

// ============================================================================
// Folder commands
// ============================================================================

fn folder_infos(folders: &FolderSet) -> Vec<FolderInfo> {
    folders
        .entries()
        .iter()
        .map(|f| FolderInfo {
            path: f.path.clone(),
            enabled: f.enabled,
            exists: Path::new(&f.path).is_dir(),
        })
        .collect()
}

pub fn folders(ctx: &AppContext, action: FolderAction) -> EngineResult<FoldersResponse> {
    let mut folders = ctx.engine.folders();
    let changed = match &action {
        FolderAction::List => false,
        FolderAction::Add { path } => folders.add(path.as_str()),
        FolderAction::Remove { path } => folders.remove(path),
        FolderAction::Up { path } => folders.move_up(path),
        FolderAction::Down { path } => folders.move_down(path),
        FolderAction::Enable { path } => folders.set_enabled(path, true),
        FolderAction::Disable { path } => folders.set_enabled(path, false),
    };

    if changed {
        let saved = folders.clone();
        ctx.store.update(|config| config.folders = saved)?;
        ctx.engine.set_folders(folders.clone());
    }

    Ok(FoldersResponse {
        changed,
        folders: folder_infos(&folders),
    })
}

// ============================================================================
// Catalog commands
// ============================================================================

pub fn scan(ctx: &AppContext) -> EngineResult<ScanResponse> {
    let report = ctx.engine.rescan_with(ScanPolicy::Wait)?;
    Ok(ScanResponse {
        report,
        warnings: ctx.take_warnings(),
    })
}

pub fn search(ctx: &AppContext, keyword: &str) -> EngineResult<SearchResponse> {
    ctx.engine.rescan_with(ScanPolicy::Wait)?;
    let matches: Vec<ImageInfo> = ctx.engine.search(keyword).into_iter().map(ImageInfo::from).collect();

    Ok(SearchResponse {
        keyword: keyword.to_string(),
        total: ctx.engine.catalog().len(),
        matches,
    })
}

pub fn copy_image(ctx: &AppContext, file_name: &str, out: &Path) -> EngineResult<CopyResponse> {
    ctx.engine.rescan_with(ScanPolicy::Wait)?;
    let entry = ctx
        .engine
        .entry_by_name(file_name)
        .ok_or_else(|| EngineError::ImageNotFound(file_name.to_string()))?;

    if ctx.store.snapshot().auto_paste_enabled {
        log::debug!("Auto-paste is on but there is no window to paste into");
    }
    let outcome = dispatch(&entry, &FileCopySink::new(out), None)?;

    Ok(CopyResponse {
        file_name: entry.file_name,
        destination: out.to_string_lossy().to_string(),
        pasted: outcome.pasted,
    })
}

// ============================================================================
// Tag commands
// ============================================================================

pub fn tag_rows(ctx: &AppContext) -> EngineResult<Vec<TagRow>> {
    ctx.engine.rescan_with(ScanPolicy::Wait)?;
    Ok(ctx.engine.tag_rows())
}

pub fn get_tags(ctx: &AppContext, file_name: &str) -> EngineResult<TagsResponse> {
    Ok(TagsResponse {
        file_name: file_name.to_string(),
        tags: ctx.engine.tags_for(file_name),
    })
}

/// Tags can only be attached to images that currently exist
pub fn set_tags(ctx: &AppContext, file_name: &str, text: &str) -> EngineResult<TagsResponse> {
    ctx.engine.rescan_with(ScanPolicy::Wait)?;
    let entry = ctx
        .engine
        .entry_by_name(file_name)
        .ok_or_else(|| EngineError::ImageNotFound(file_name.to_string()))?;

    let tags = ctx.engine.set_tag_text(&entry.file_name, text);
    Ok(TagsResponse {
        file_name: entry.file_name,
        tags,
    })
}

// ============================================================================
// Settings commands
// ============================================================================

fn settings_response(ctx: &AppContext, config: &Config) -> SettingsResponse {
    SettingsResponse {
        hotkey: config.hotkey.clone(),
        auto_paste_enabled: config.auto_paste_enabled,
        config_path: ctx.store.path().to_string_lossy().to_string(),
    }
}

pub fn settings(ctx: &AppContext, action: SettingsAction) -> EngineResult<SettingsResponse> {
    let config = match action {
        SettingsAction::Show => ctx.store.snapshot(),
        SettingsAction::Hotkey { combo } => {
            let hotkey = Hotkey::parse(&combo)?;
            ctx.store.update(|config| config.hotkey = hotkey.to_string())?
        }
        SettingsAction::AutoPaste { state } => {
            ctx.store.update(|config| config.auto_paste_enabled = state == Toggle::On)?
        }
    };
    Ok(settings_response(ctx, &config))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn context(config_dir: &TempDir) -> AppContext {
        let store = Arc::new(ConfigStore::open(config_dir.path().join("config.json")));
        AppContext::open(store, 64)
    }

    fn with_only_folder(ctx: &AppContext, folder: &Path) {
        for existing in ctx.engine.folders().entries() {
            folders(ctx, FolderAction::Remove { path: existing.path.clone() }).unwrap();
        }
        folders(ctx, FolderAction::Add { path: folder.to_string_lossy().to_string() }).unwrap();
    }

    #[test]
    fn test_folder_edits_are_saved() {
        let config_dir = TempDir::new().unwrap();
        let pics = TempDir::new().unwrap();
        let ctx = context(&config_dir);
        with_only_folder(&ctx, pics.path());

        let path = pics.path().to_string_lossy().to_string();
        let response = folders(&ctx, FolderAction::Disable { path: path.clone() }).unwrap();
        assert!(response.changed);
        assert!(!response.folders[0].enabled);
        assert!(response.folders[0].exists);

        let saved = Config::load_from(&config_dir.path().join("config.json"));
        assert_eq!(saved.folders.entries().len(), 1);
        assert!(!saved.folders.entries()[0].enabled);
    }

    #[test]
    fn test_set_tags_requires_existing_image() {
        let config_dir = TempDir::new().unwrap();
        let pics = TempDir::new().unwrap();
        fs::write(pics.path().join("cat.png"), b"").unwrap();
        let ctx = context(&config_dir);
        with_only_folder(&ctx, pics.path());

        let response = set_tags(&ctx, "CAT.png", "pet, cute").unwrap();
        assert_eq!(response.file_name, "cat.png");
        assert_eq!(response.tags, vec!["#pet", "#cute"]);

        assert!(matches!(
            set_tags(&ctx, "dog.png", "good"),
            Err(EngineError::ImageNotFound(_))
        ));

        let saved = Config::load_from(&config_dir.path().join("config.json"));
        assert_eq!(saved.tags["cat.png"], vec!["#pet", "#cute"]);
    }

    #[test]
    fn test_scan_reports_decode_warnings() {
        let config_dir = TempDir::new().unwrap();
        let pics = TempDir::new().unwrap();
        fs::write(pics.path().join("broken.png"), b"").unwrap();
        let ctx = context(&config_dir);
        with_only_folder(&ctx, pics.path());

        let response = scan(&ctx).unwrap();
        assert_eq!(response.report.total, 1);
        assert_eq!(response.warnings.len(), 1);
        assert!(response.warnings[0].contains("broken.png"));
    }

    #[test]
    fn test_settings_normalizes_hotkey() {
        let config_dir = TempDir::new().unwrap();
        let ctx = context(&config_dir);

        let response = settings(&ctx, SettingsAction::Hotkey { combo: "shift+ctrl+p".into() }).unwrap();
        assert_eq!(response.hotkey, "Ctrl+Shift+P");

        assert!(matches!(
            settings(&ctx, SettingsAction::Hotkey { combo: "ctrl+nope".into() }),
            Err(EngineError::Hotkey(_))
        ));

        let response = settings(&ctx, SettingsAction::AutoPaste { state: Toggle::On }).unwrap();
        assert!(response.auto_paste_enabled);
    }

    #[test]
    fn test_execute_search_returns_json() {
        let config_dir = TempDir::new().unwrap();
        let pics = TempDir::new().unwrap();
        fs::write(pics.path().join("sunset.png"), b"").unwrap();
        let ctx = context(&config_dir);
        with_only_folder(&ctx, pics.path());

        let value = execute(&ctx, Command::Search { keyword: Some("sun".into()) }).unwrap();
        assert_eq!(value["total"], 1);
        assert_eq!(value["matches"][0]["file_name"], "sunset.png");
        assert!(value["matches"][0]["thumbnail"].is_null());
    }

    #[cfg(unix)]
    #[test]
    fn test_execute_scan_with_non_utf8_file_name() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let config_dir = TempDir::new().unwrap();
        let pics = TempDir::new().unwrap();
        let odd = pics.path().join(OsStr::from_bytes(b"bad\xff.png"));
        if fs::write(&odd, b"").is_err() {
            // filesystem insists on UTF-8 names
            return;
        }
        let ctx = context(&config_dir);
        with_only_folder(&ctx, pics.path());

        let value = execute(&ctx, Command::Scan).unwrap();
        assert_eq!(value["total"], 1);
        let added = value["added"].as_array().unwrap();
        assert_eq!(added.len(), 1);
        assert!(added[0].as_str().unwrap().ends_with("bad\u{fffd}.png"));
    }
}
