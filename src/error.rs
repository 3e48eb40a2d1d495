//! Error types and per-item diagnostics

use std::fmt;
use std::path::PathBuf;

use crate::config::ConfigError;
use crate::dispatch::DispatchError;
use crate::hotkey::HotkeyError;

/// Errors surfaced to callers of the engine.
///
/// Per-item failures during a scan or tag edit are not errors; they are
/// reported as [`Diagnostic`] values and the operation carries on.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("A scan is already in progress")]
    ConcurrentScanRejected,

    #[error("No image named {0} in the catalog")]
    ImageNotFound(String),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Dispatch error: {0}")]
    Dispatch(#[from] DispatchError),

    #[error("Hotkey error: {0}")]
    Hotkey(#[from] HotkeyError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type EngineResult<T> = Result<T, EngineError>;

/// Why a single tag was dropped during normalization
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagRejection {
    Empty,
    TooLong { max: usize },
}

impl fmt::Display for TagRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TagRejection::Empty => write!(f, "tag is empty"),
            TagRejection::TooLong { max } => write!(f, "tag exceeds {} characters", max),
        }
    }
}

/// A non-fatal problem with one item; the rest of the catalog is unaffected
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    FolderUnavailable { path: PathBuf, reason: String },
    DecodeFailure { path: PathBuf, reason: String },
    TagValidationRejected {
        file_name: String,
        tag: String,
        reason: TagRejection,
    },
    PersistFailed { reason: String },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::FolderUnavailable { path, reason } => {
                write!(f, "Folder unavailable: {} ({})", path.display(), reason)
            }
            Diagnostic::DecodeFailure { path, reason } => {
                write!(f, "Could not decode image {}: {}", path.display(), reason)
            }
            Diagnostic::TagValidationRejected {
                file_name,
                tag,
                reason,
            } => write!(f, "Tag {:?} for {} rejected: {}", tag, file_name, reason),
            Diagnostic::PersistFailed { reason } => {
                write!(f, "Failed to persist tags: {}", reason)
            }
        }
    }
}

type DiagnosticFn = dyn Fn(&Diagnostic) + Send + Sync;

/// Fans a diagnostic out to the log and to an optional caller callback
#[derive(Clone, Default)]
pub struct Reporter {
    callback: Option<std::sync::Arc<DiagnosticFn>>,
}

impl Reporter {
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn(&Diagnostic) + Send + Sync + 'static,
    {
        Self {
            callback: Some(std::sync::Arc::new(callback)),
        }
    }

    /// A reporter that only logs
    pub fn silent() -> Self {
        Self::default()
    }

    pub fn report(&self, diagnostic: Diagnostic) {
        log::warn!("{}", diagnostic);
        if let Some(callback) = &self.callback {
            callback(&diagnostic);
        }
    }
}

impl fmt::Debug for Reporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reporter")
            .field("callback", &self.callback.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_reporter_forwards_to_callback() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let reporter = Reporter::new(move |d| sink.lock().unwrap().push(d.clone()));

        reporter.report(Diagnostic::PersistFailed {
            reason: "disk full".to_string(),
        });

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert!(seen[0].to_string().contains("disk full"));
    }

    #[test]
    fn test_tag_rejection_display() {
        assert_eq!(
            TagRejection::TooLong { max: 20 }.to_string(),
            "tag exceeds 20 characters"
        );
    }
}
