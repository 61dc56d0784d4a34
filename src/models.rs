//! Core data types shared by intake, the organizer, the session and export.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use uuid::Uuid;

/// Where a file's bytes live
#[derive(Debug, Clone)]
pub enum FileData {
    /// Read lazily from disk; the read may fail later
    Path(PathBuf),
    /// Already in memory (dropped payloads, tests)
    Bytes(Arc<[u8]>),
}

/// A file-like input as handed over by the picker or a drop target
#[derive(Debug, Clone)]
pub struct RawFile {
    /// Original file name, used as the archive entry name on export
    pub name: String,
    /// MIME type, e.g. `image/jpeg`
    pub content_type: String,
    pub data: FileData,
}

impl RawFile {
    /// Build a file from in-memory bytes with an explicit content type
    pub fn from_bytes(
        name: impl Into<String>,
        content_type: impl Into<String>,
        bytes: impl Into<Arc<[u8]>>,
    ) -> Self {
        Self {
            name: name.into(),
            content_type: content_type.into(),
            data: FileData::Bytes(bytes.into()),
        }
    }

    /// Build a file backed by a path; the content type is guessed from the extension
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let content_type = guess_content_type(&path);

        Self {
            name,
            content_type,
            data: FileData::Path(path),
        }
    }

    /// Whether the declared content type is an image type
    pub fn is_image(&self) -> bool {
        self.content_type
            .trim()
            .to_ascii_lowercase()
            .starts_with("image/")
    }

    /// Read the file's bytes
    pub async fn read(&self) -> std::io::Result<Arc<[u8]>> {
        match &self.data {
            FileData::Path(path) => tokio::fs::read(path).await.map(Arc::from),
            FileData::Bytes(bytes) => Ok(Arc::clone(bytes)),
        }
    }
}

fn guess_content_type(path: &Path) -> String {
    mime_guess::from_path(path)
        .first_or_octet_stream()
        .essence_str()
        .to_string()
}

/// Transient, revocable handle a renderer uses to reach a photo's bytes
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PreviewUrl(String);

impl PreviewUrl {
    pub(crate) fn generate() -> Self {
        Self(format!("preview:{}", Uuid::new_v4()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PreviewUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A photo accepted by intake
#[derive(Debug, Clone)]
pub struct Photo {
    pub file: RawFile,
    pub preview: PreviewUrl,
}

impl Photo {
    pub fn name(&self) -> &str {
        &self.file.name
    }
}

/// A group of photos suggested by the classification service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Folder {
    pub name: String,
    /// One-sentence description of what the photos have in common
    pub description: String,
    /// Zero-based indices into the photo list that was submitted.
    /// Not range-checked on arrival.
    pub member_indices: Vec<i64>,
}
