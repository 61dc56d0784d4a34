use crate::models::{Photo, RawFile};
use crate::services::previews::PreviewRegistry;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

/// Where an intake batch came from. Both sources end up in [`select_photos`].
#[derive(Debug, Clone)]
pub enum IntakeSource {
    /// Paths chosen in a picker; directories are expanded
    Picker(Vec<PathBuf>),
    /// Files dropped onto the window, content type already known
    Drop(Vec<RawFile>),
}

#[derive(Debug, Clone)]
pub struct IntakeOptions {
    /// How deep to descend into picked directories (1 = direct children only)
    pub max_depth: usize,
    pub include_hidden: bool,
}

impl Default for IntakeOptions {
    fn default() -> Self {
        Self {
            max_depth: 1,
            include_hidden: false,
        }
    }
}

/// Turn an intake source into a flat list of file-like inputs, in order
pub fn collect_files(source: IntakeSource, options: &IntakeOptions) -> Vec<RawFile> {
    match source {
        IntakeSource::Drop(files) => files,
        IntakeSource::Picker(paths) => {
            let mut files = Vec::new();
            for path in &paths {
                if path.is_dir() {
                    files.extend(scan_directory(path, options));
                } else if path.is_file() {
                    files.push(RawFile::from_path(path));
                } else {
                    tracing::warn!(path = %path.display(), "Skipping missing path");
                }
            }
            files
        }
    }
}

/// Keep the image entries and give each one a preview handle.
/// Non-images are dropped without an error; input order is preserved.
pub fn select_photos(registry: &PreviewRegistry, files: Vec<RawFile>) -> Vec<Photo> {
    files
        .into_iter()
        .filter(|file| {
            let keep = file.is_image();
            if !keep {
                tracing::debug!(
                    name = %file.name,
                    content_type = %file.content_type,
                    "Ignoring non-image file"
                );
            }
            keep
        })
        .map(|file| {
            let preview = registry.allocate(&file);
            Photo { file, preview }
        })
        .collect()
}

fn scan_directory(dir: &Path, options: &IntakeOptions) -> Vec<RawFile> {
    let include_hidden = options.include_hidden;

    WalkDir::new(dir)
        .min_depth(1)
        .max_depth(options.max_depth.max(1))
        .sort_by_file_name()
        .into_iter()
        .filter_entry(move |entry| include_hidden || entry.depth() == 0 || !is_hidden(entry))
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                // Permission denied and friends: skip, keep scanning
                tracing::warn!(error = %e, "Cannot read directory entry");
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| RawFile::from_path(entry.into_path()))
        .collect()
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.file_name().to_string_lossy().starts_with('.')
}
