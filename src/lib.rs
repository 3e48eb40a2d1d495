//! HyIO - Image Catalog and Tagging
//!
//! Watches a list of folders, keeps a deduplicated catalog of the images in
//! them with cached thumbnails, and maintains a tag index by file name that
//! is pruned whenever images disappear.

pub mod catalog;
pub mod cli;
pub mod commands;
pub mod config;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod folders;
pub mod hotkey;
pub mod image_manager;
pub mod logging;
pub mod search;
pub mod state;
pub mod tags;
pub mod thumbnail;

pub use catalog::{Catalog, MergeOutcome};
pub use engine::{Engine, ScanPolicy, ScanReport};
pub use error::{Diagnostic, EngineError, EngineResult};
pub use folders::{FolderEntry, FolderSet};
pub use state::CatalogEntry;
pub use tags::TagIndex;

use clap::Parser;
use cli::Cli;
use commands::AppContext;
use config::ConfigStore;
use std::sync::Arc;

/// Entry point of the `hyio` binary
pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let _logger = logging::init_logging(&cli.log_level, cli.log_file.as_deref())?;

    let store = match &cli.config {
        Some(path) => ConfigStore::open(path),
        None => ConfigStore::open_default(),
    };
    let ctx = AppContext::open(Arc::new(store), cli.thumbnail_width);

    let response = commands::execute(&ctx, cli.command)?;
    println!("{}", serde_json::to_string_pretty(&response)?);

    Ok(())
}
