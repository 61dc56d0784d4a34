//! Folder export
//!
//! Bundles the photos of one folder into an in-memory zip archive.

use crate::models::{Folder, Photo};
use crate::services::previews::{PreviewError, PreviewRegistry};
use futures::future::try_join_all;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Error type for folder exports
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("Photo index {index} is out of range ({count} photos loaded)")]
    IndexOutOfRange { index: i64, count: usize },
    #[error("Failed to read {name}: {source}")]
    Fetch {
        name: String,
        #[source]
        source: PreviewError,
    },
    #[error("Failed to build archive: {0}")]
    Archive(String),
    #[error("Failed to save archive: {0}")]
    Save(#[from] std::io::Error),
}

impl From<ExportError> for String {
    fn from(err: ExportError) -> Self {
        err.to_string()
    }
}

/// A finished archive, ready to be offered as a download
#[derive(Debug, Clone)]
pub struct Archive {
    pub file_name: String,
    pub bytes: Vec<u8>,
    /// Entry names in archive order
    pub entries: Vec<String>,
}

impl Archive {
    /// Write the archive into `dir`, returning the full path
    pub async fn save_to(&self, dir: &Path) -> Result<PathBuf, ExportError> {
        tokio::fs::create_dir_all(dir).await?;
        let path = dir.join(&self.file_name);
        tokio::fs::write(&path, &self.bytes).await?;
        Ok(path)
    }
}

/// Where downloads go when no directory is given
pub fn default_export_dir() -> PathBuf {
    dirs::download_dir().unwrap_or_else(|| PathBuf::from("."))
}

/// `Summer Trip 2024!` -> `summer_trip_2024_.zip`
pub fn archive_file_name(folder_name: &str) -> String {
    let stem: String = folder_name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect();
    format!("{}.zip", stem)
}

/// Bundle a folder's photos into a zip archive.
///
/// All member indices must resolve against `photos`. Bytes are fetched
/// through each photo's preview handle, concurrently; any failure aborts the
/// export. Entries are named after the original file names, so two photos
/// with the same name collapse into one entry holding the later photo.
pub async fn export_folder(
    registry: &PreviewRegistry,
    folder: &Folder,
    photos: &[Photo],
) -> Result<Archive, ExportError> {
    let members = resolve_members(folder, photos)?;

    let fetched = try_join_all(members.iter().map(|photo| async move {
        registry
            .fetch(&photo.preview)
            .await
            .map(|bytes| (photo.name().to_string(), bytes))
            .map_err(|source| ExportError::Fetch {
                name: photo.name().to_string(),
                source,
            })
    }))
    .await?;

    let entries = collapse_duplicate_names(fetched);
    let bytes = write_zip(&entries)?;
    let file_name = archive_file_name(&folder.name);

    tracing::info!(
        folder = %folder.name,
        archive = %file_name,
        entries = entries.len(),
        size = bytes.len(),
        "Exported folder"
    );

    Ok(Archive {
        file_name,
        bytes,
        entries: entries.into_iter().map(|(name, _)| name).collect(),
    })
}

fn resolve_members<'a>(folder: &Folder, photos: &'a [Photo]) -> Result<Vec<&'a Photo>, ExportError> {
    folder
        .member_indices
        .iter()
        .map(|&index| {
            usize::try_from(index)
                .ok()
                .and_then(|i| photos.get(i))
                .ok_or(ExportError::IndexOutOfRange {
                    index,
                    count: photos.len(),
                })
        })
        .collect()
}

/// Last writer wins; the entry keeps the position of its first occurrence
fn collapse_duplicate_names(files: Vec<(String, Arc<[u8]>)>) -> Vec<(String, Arc<[u8]>)> {
    let mut entries: Vec<(String, Arc<[u8]>)> = Vec::with_capacity(files.len());

    for (name, bytes) in files {
        match entries.iter_mut().find(|(existing, _)| *existing == name) {
            Some(entry) => {
                tracing::debug!(name = %name, "Duplicate file name in folder, keeping the later photo");
                entry.1 = bytes;
            }
            None => entries.push((name, bytes)),
        }
    }

    entries
}

fn write_zip(entries: &[(String, Arc<[u8]>)]) -> Result<Vec<u8>, ExportError> {
    let archive_err = |e: &dyn std::fmt::Display| ExportError::Archive(e.to_string());

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options: FileOptions<'_, ()> =
        FileOptions::default().compression_method(CompressionMethod::Deflated);

    for (name, bytes) in entries {
        zip.start_file(name.as_str(), options)
            .map_err(|e| archive_err(&e))?;
        zip.write_all(bytes).map_err(|e| archive_err(&e))?;
    }

    let cursor = zip.finish().map_err(|e| archive_err(&e))?;
    Ok(cursor.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RawFile;
    use crate::services::intake::select_photos;
    use std::io::Read;
    use tempfile::tempdir;
    use zip::ZipArchive;

    fn jpeg(name: &str, bytes: &[u8]) -> RawFile {
        RawFile::from_bytes(name, "image/jpeg", bytes.to_vec())
    }

    fn folder(name: &str, indices: Vec<i64>) -> Folder {
        Folder {
            name: name.to_string(),
            description: String::new(),
            member_indices: indices,
        }
    }

    fn read_entries(bytes: &[u8]) -> Vec<(String, Vec<u8>)> {
        let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        (0..archive.len())
            .map(|i| {
                let mut file = archive.by_index(i).unwrap();
                let mut content = Vec::new();
                file.read_to_end(&mut content).unwrap();
                (file.name().to_string(), content)
            })
            .collect()
    }

    #[tokio::test]
    async fn test_export_selected_members_only() {
        let registry = PreviewRegistry::new();
        let photos = select_photos(
            &registry,
            (0..6)
                .map(|i| jpeg(&format!("photo{}.jpg", i), format!("bytes{}", i).as_bytes()))
                .collect(),
        );

        let archive = export_folder(&registry, &folder("Evens", vec![0, 2, 4]), &photos)
            .await
            .unwrap();

        assert_eq!(archive.file_name, "evens.zip");
        assert_eq!(archive.entries, vec!["photo0.jpg", "photo2.jpg", "photo4.jpg"]);
        assert_eq!(
            read_entries(&archive.bytes),
            vec![
                ("photo0.jpg".to_string(), b"bytes0".to_vec()),
                ("photo2.jpg".to_string(), b"bytes2".to_vec()),
                ("photo4.jpg".to_string(), b"bytes4".to_vec()),
            ]
        );
    }

    #[tokio::test]
    async fn test_out_of_range_index_fails() {
        let registry = PreviewRegistry::new();
        let photos = select_photos(&registry, vec![jpeg("a.jpg", b"a"), jpeg("b.jpg", b"b")]);

        let err = export_folder(&registry, &folder("X", vec![0, 2]), &photos)
            .await
            .unwrap_err();
        assert!(matches!(err, ExportError::IndexOutOfRange { index: 2, count: 2 }));

        let err = export_folder(&registry, &folder("X", vec![-1]), &photos)
            .await
            .unwrap_err();
        assert!(matches!(err, ExportError::IndexOutOfRange { index: -1, .. }));
    }

    #[tokio::test]
    async fn test_duplicate_names_keep_last_photo() {
        let registry = PreviewRegistry::new();
        let photos = select_photos(
            &registry,
            vec![jpeg("img.jpg", b"first"), jpeg("other.jpg", b"o"), jpeg("img.jpg", b"second")],
        );

        let archive = export_folder(&registry, &folder("Dupes", vec![0, 2]), &photos)
            .await
            .unwrap();

        assert_eq!(
            read_entries(&archive.bytes),
            vec![("img.jpg".to_string(), b"second".to_vec())]
        );
    }

    #[tokio::test]
    async fn test_revoked_preview_fails_whole_export() {
        let registry = PreviewRegistry::new();
        let photos = select_photos(&registry, vec![jpeg("a.jpg", b"a"), jpeg("b.jpg", b"b")]);
        registry.revoke(&photos[1].preview).unwrap();

        let err = export_folder(&registry, &folder("Both", vec![0, 1]), &photos)
            .await
            .unwrap_err();
        match err {
            ExportError::Fetch { name, source } => {
                assert_eq!(name, "b.jpg");
                assert!(matches!(source, PreviewError::Revoked(_)));
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[tokio::test]
    async fn test_export_reads_photos_from_disk() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("sunset.jpg");
        std::fs::write(&path, b"sunset-bytes").unwrap();

        let registry = PreviewRegistry::new();
        let photos = select_photos(&registry, vec![RawFile::from_path(&path)]);
        let archive = export_folder(&registry, &folder("Sunsets", vec![0]), &photos)
            .await
            .unwrap();

        assert_eq!(
            read_entries(&archive.bytes),
            vec![("sunset.jpg".to_string(), b"sunset-bytes".to_vec())]
        );
    }

    #[tokio::test]
    async fn test_save_to_directory() {
        let dir = tempdir().unwrap();
        let registry = PreviewRegistry::new();
        let photos = select_photos(&registry, vec![jpeg("a.jpg", b"a")]);
        let archive = export_folder(&registry, &folder("My Trip", vec![0]), &photos)
            .await
            .unwrap();

        let saved = archive.save_to(&dir.path().join("downloads")).await.unwrap();
        assert_eq!(saved.file_name().unwrap(), "my_trip.zip");
        assert_eq!(std::fs::read(saved).unwrap(), archive.bytes);
    }

    #[test]
    fn test_archive_file_name() {
        assert_eq!(archive_file_name("Beach Day"), "beach_day.zip");
        assert_eq!(archive_file_name("Summer Trip 2024!"), "summer_trip_2024_.zip");
        assert_eq!(archive_file_name("Café/Food"), "caf__food.zip");
        assert_eq!(archive_file_name(""), ".zip");
    }
}
