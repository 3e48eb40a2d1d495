//! Handing a selected image to the outside world (clipboard, auto-paste)

use crate::state::CatalogEntry;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("Image not found: {0}")]
    Missing(PathBuf),

    #[error("Sink rejected {path}: {reason}")]
    Sink { path: PathBuf, reason: String },

    #[error("Paste failed: {0}")]
    Paste(String),
}

/// Somewhere a full-resolution image can be placed, usually a clipboard
pub trait ImageSink {
    fn place_image(&self, path: &Path) -> Result<(), DispatchError>;
}

/// Fires a paste into whatever window has focus
pub trait PasteTrigger {
    fn trigger_paste(&self) -> Result<(), DispatchError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct DispatchOutcome {
    pub pasted: bool,
}

/// Place the original file of `entry` on the sink, then paste if a trigger
/// was supplied (auto-paste on).
pub fn dispatch(
    entry: &CatalogEntry,
    sink: &dyn ImageSink,
    paste: Option<&dyn PasteTrigger>,
) -> Result<DispatchOutcome, DispatchError> {
    if !entry.file_path.is_file() {
        return Err(DispatchError::Missing(entry.file_path.clone()));
    }

    sink.place_image(&entry.file_path)?;
    log::debug!("Placed {} on sink", entry.file_path.display());

    let pasted = match paste {
        Some(trigger) => {
            trigger.trigger_paste()?;
            true
        }
        None => false,
    };

    Ok(DispatchOutcome { pasted })
}

/// Sink that copies the original bytes to a fixed destination file
#[derive(Debug, Clone)]
pub struct FileCopySink {
    destination: PathBuf,
}

impl FileCopySink {
    pub fn new(destination: impl Into<PathBuf>) -> Self {
        Self {
            destination: destination.into(),
        }
    }
}

impl ImageSink for FileCopySink {
    fn place_image(&self, path: &Path) -> Result<(), DispatchError> {
        let sink_err = |e: std::io::Error| DispatchError::Sink {
            path: path.to_path_buf(),
            reason: e.to_string(),
        };

        if let Some(parent) = self.destination.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(sink_err)?;
            }
        }
        fs::copy(path, &self.destination).map_err(sink_err)?;
        Ok(())
    }
}
