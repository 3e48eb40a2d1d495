//! Command-line arguments

use crate::thumbnail::DEFAULT_MAX_WIDTH;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "hyio", version, about = "Browse, tag and search images in watched folders")]
pub struct Cli {
    /// Config file to use instead of the per-user one
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log level or flexi_logger spec
    #[arg(long, global = true, default_value = "warn")]
    pub log_level: String,

    /// Write the log to this file instead of stderr
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    /// Maximum thumbnail width in pixels
    #[arg(long, global = true, default_value_t = DEFAULT_MAX_WIDTH)]
    pub thumbnail_width: u32,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Manage watched folders
    Folders {
        #[command(subcommand)]
        action: FolderAction,
    },
    /// Rescan watched folders
    Scan,
    /// List images whose name or tags contain a keyword
    Search { keyword: Option<String> },
    /// Show or edit tags
    Tags {
        #[command(subcommand)]
        action: TagAction,
    },
    /// Show or change settings
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },
    /// Copy an image's original file to a destination
    Copy {
        file_name: String,
        #[arg(long)]
        out: PathBuf,
    },
}

#[derive(Debug, Subcommand)]
pub enum FolderAction {
    List,
    Add { path: String },
    Remove { path: String },
    Up { path: String },
    Down { path: String },
    Enable { path: String },
    Disable { path: String },
}

#[derive(Debug, Subcommand)]
pub enum TagAction {
    /// Every image with its tags
    List,
    Get { file_name: String },
    /// Replace tags with comma separated text; empty text clears them
    Set {
        file_name: String,
        #[arg(default_value = "")]
        text: String,
    },
}

#[derive(Debug, Subcommand)]
pub enum SettingsAction {
    Show,
    Hotkey { combo: String },
    AutoPaste { state: Toggle },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Toggle {
    On,
    Off,
}
