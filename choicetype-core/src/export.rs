//! Saving unlocked wallpapers to the device gallery.
//!
//! The core only builds the request and enforces the unlock precondition;
//! the host supplies a [`MediaExport`] that performs the actual copy.
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

use crate::constants::EXPORT_FAILURE_MESSAGE;

/// Where the image comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExportSource {
    /// Bundled asset by file name.
    Bundled(String),
    LocalFile(PathBuf),
    Remote(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportRequest {
    pub source: ExportSource,
    /// File name without extension or timestamp, e.g. `wall_calm`.
    pub file_stem: String,
    pub album: String,
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("permission to write to the gallery was denied")]
    PermissionDenied,
    #[error("download failed: {0}")]
    Network(String),
    #[error("file operation failed: {0}")]
    Filesystem(#[from] std::io::Error),
    #[error("wallpaper '{0}' is locked")]
    Locked(String),
}

impl ExportError {
    /// Text shown to the user. Every failure reads the same and is not retried.
    #[must_use]
    pub const fn user_message(&self) -> &'static str {
        EXPORT_FAILURE_MESSAGE
    }
}

/// Platform capability that writes an image into a gallery album.
pub trait MediaExport {
    /// Export the image and return where it landed.
    ///
    /// # Errors
    ///
    /// Returns an error on permission, network or filesystem failure.
    fn export_image(&self, request: &ExportRequest) -> Result<PathBuf, ExportError>;
}
