//! Upload acceptance and storage

use crate::config::StorageConfig;
use crate::db::models::FileKind;
use crate::errors::{AppError, Result};
use chrono::Utc;
use std::path::{Path, PathBuf};
use tracing::info;

/// A file written to the upload directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredUpload {
    /// Sanitised original name
    pub filename: String,
    pub path: PathBuf,
    pub kind: FileKind,
}

/// Keep `[A-Za-z0-9._-]`, replace whitespace with underscores and drop
/// everything else, including any directory components
pub fn sanitize_filename(name: &str) -> String {
    let base = name.rsplit(|c: char| c == '/' || c == '\\').next().unwrap_or(name);

    let cleaned: String = base
        .trim()
        .chars()
        .filter_map(|c| match c {
            c if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') => Some(c),
            c if c.is_whitespace() => Some('_'),
            _ => None,
        })
        .collect();

    cleaned.trim_start_matches('.').to_string()
}

fn extension_of(name: &str) -> Option<&str> {
    Path::new(name).extension().and_then(|ext| ext.to_str())
}

/// Validates uploads and writes them under the configured directory
#[derive(Debug, Clone)]
pub struct UploadStore {
    dir: PathBuf,
    max_bytes: usize,
}

impl UploadStore {
    pub fn new(config: &StorageConfig) -> Self {
        Self {
            dir: config.upload_dir.clone(),
            max_bytes: config.max_upload_bytes,
        }
    }

    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    /// Check type and size, then persist the bytes
    pub async fn store(&self, original_name: &str, bytes: &[u8]) -> Result<StoredUpload> {
        let filename = sanitize_filename(original_name);
        if filename.is_empty() {
            return Err(AppError::validation("file", "No file selected"));
        }

        let extension = extension_of(&filename).unwrap_or_default();
        let kind = FileKind::from_extension(extension).ok_or_else(|| {
            AppError::UnsupportedFileType {
                extension: extension.to_string(),
            }
        })?;

        if bytes.len() > self.max_bytes {
            return Err(AppError::PayloadTooLarge {
                limit: self.max_bytes,
            });
        }

        tokio::fs::create_dir_all(&self.dir).await?;

        let stamp = Utc::now().format("%Y%m%d%H%M%S%3f");
        let path = self.dir.join(format!("{}_{}", stamp, filename));
        tokio::fs::write(&path, bytes).await?;

        info!(filename = %filename, kind = kind.as_str(), size = bytes.len(), "Stored upload");

        Ok(StoredUpload {
            filename,
            path,
            kind,
        })
    }
}
