//! Preview registry
//!
//! Hands out revocable preview handles for intake photos and resolves them
//! back to bytes. A handle stays live until it is revoked; revoking twice is
//! reported instead of ignored so leaks and double releases show up in tests.
//! Uses DashMap so the session and concurrent exports can share it without a lock.

use crate::models::{Photo, PreviewUrl, RawFile};
use dashmap::DashMap;
use std::sync::Arc;
use tracing::warn;

/// Error type for preview lookups and releases
#[derive(Debug, thiserror::Error)]
pub enum PreviewError {
    #[error("Preview {0} does not exist")]
    Unknown(PreviewUrl),
    #[error("Preview {0} has already been revoked")]
    Revoked(PreviewUrl),
    #[error("Failed to read bytes behind {url}: {source}")]
    Read {
        url: PreviewUrl,
        #[source]
        source: std::io::Error,
    },
}

/// Registry of live preview handles
#[derive(Default)]
pub struct PreviewRegistry {
    /// url -> file; `None` marks a revoked handle
    entries: DashMap<PreviewUrl, Option<RawFile>>,
}

impl PreviewRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a new live handle for a file
    pub fn allocate(&self, file: &RawFile) -> PreviewUrl {
        let url = PreviewUrl::generate();
        self.entries.insert(url.clone(), Some(file.clone()));
        url
    }

    /// Resolve a live handle to the file it points at
    pub fn resolve(&self, url: &PreviewUrl) -> Result<RawFile, PreviewError> {
        match self.entries.get(url) {
            Some(slot) => slot
                .value()
                .clone()
                .ok_or_else(|| PreviewError::Revoked(url.clone())),
            None => Err(PreviewError::Unknown(url.clone())),
        }
    }

    /// Read the bytes behind a live handle
    pub async fn fetch(&self, url: &PreviewUrl) -> Result<Arc<[u8]>, PreviewError> {
        // Clone out of the map first; no shard lock may be held across the read.
        let file = self.resolve(url)?;
        file.read().await.map_err(|source| PreviewError::Read {
            url: url.clone(),
            source,
        })
    }

    /// Release a handle. A second release of the same handle is an error.
    pub fn revoke(&self, url: &PreviewUrl) -> Result<(), PreviewError> {
        let mut slot = self
            .entries
            .get_mut(url)
            .ok_or_else(|| PreviewError::Unknown(url.clone()))?;

        match slot.take() {
            Some(_) => Ok(()),
            None => Err(PreviewError::Revoked(url.clone())),
        }
    }

    /// Release the handles of a whole photo set, returning how many were released
    pub fn revoke_all(&self, photos: &[Photo]) -> usize {
        let mut released = 0;
        for photo in photos {
            match self.revoke(&photo.preview) {
                Ok(()) => released += 1,
                Err(e) => warn!(photo = photo.name(), error = %e, "Preview release failed"),
            }
        }
        released
    }

    pub fn is_live(&self, url: &PreviewUrl) -> bool {
        self.entries
            .get(url)
            .map(|slot| slot.value().is_some())
            .unwrap_or(false)
    }

    /// Number of handles allocated and not yet revoked
    pub fn live_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|entry| entry.value().is_some())
            .count()
    }
}
