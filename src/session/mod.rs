//! Photo session
//!
//! Owns the live photo set, its preview handles and the organize result.
//! All changes go through the named operations below; the state lock is never
//! held across the classification call, so the `Organizing` phase is what
//! keeps a second run (or a reset) out while one is in flight. A run whose
//! future is dropped lands in `Failed` through [`OrganizeGuard`].
//! Exports hold the lock for the whole call, so a reset waits for them.

pub mod state;

use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::ai::client::ClassificationService;
use crate::ai::organizer::{CoverageReport, OrganizeError, Organizer};
use crate::models::{Folder, PreviewUrl, RawFile};
use crate::services::export::{self, Archive, ExportError};
use crate::services::intake::{self, IntakeOptions, IntakeSource};
use crate::services::previews::PreviewRegistry;

pub use state::{AppState, Phase, NO_PHOTOS_NOTICE};

/// Error type for session operations
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("{}", NO_PHOTOS_NOTICE)]
    NoPhotos,
    #[error("Photos are still being organized; wait for the current run to finish")]
    Busy,
    #[error("No organize run is in progress")]
    NotOrganizing,
    #[error("There is no organized result to export from")]
    NoResult,
    #[error("Folder #{0} does not exist in the current result")]
    UnknownFolder(usize),
    #[error(transparent)]
    Organize(#[from] OrganizeError),
    #[error(transparent)]
    Export(#[from] ExportError),
}

impl From<SessionError> for String {
    fn from(err: SessionError) -> Self {
        err.to_string()
    }
}

/// Render-ready view of the session
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    pub phase: Phase,
    pub photos: Vec<PhotoView>,
    pub folders: Vec<Folder>,
    /// Error or validation message
    pub message: Option<String>,
    pub coverage: Option<CoverageReport>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PhotoView {
    pub name: String,
    pub content_type: String,
    pub preview: PreviewUrl,
}

pub struct PhotoSession {
    state: Arc<Mutex<AppState>>,
    registry: Arc<PreviewRegistry>,
    organizer: Organizer,
}

impl PhotoSession {
    pub fn new(service: Arc<dyn ClassificationService>) -> Self {
        Self::with_registry(service, Arc::new(PreviewRegistry::new()))
    }

    pub fn with_registry(
        service: Arc<dyn ClassificationService>,
        registry: Arc<PreviewRegistry>,
    ) -> Self {
        Self {
            state: Arc::new(Mutex::new(AppState::default())),
            registry,
            organizer: Organizer::new(service),
        }
    }

    pub fn registry(&self) -> &Arc<PreviewRegistry> {
        &self.registry
    }

    /// Collect files from a picker or a drop and make them the photo set
    pub async fn intake(
        &self,
        source: IntakeSource,
        options: &IntakeOptions,
    ) -> Result<usize, SessionError> {
        let files = intake::collect_files(source, options);
        self.select_photos(files).await
    }

    /// Replace the photo set, releasing the previous previews.
    /// Returns how many photos were accepted.
    pub async fn select_photos(&self, files: Vec<RawFile>) -> Result<usize, SessionError> {
        let mut state = self.state.lock().await;
        // Check before allocating so a rejected batch leaves no live handles behind
        if state.is_busy() {
            return Err(SessionError::Busy);
        }

        let offered = files.len();
        let photos = intake::select_photos(&self.registry, files);
        let accepted = photos.len();

        let previous = state.replace_photos(photos)?;
        let released = self.registry.revoke_all(&previous);

        tracing::info!(offered, accepted, released, "Photo set replaced");
        Ok(accepted)
    }

    /// Run the organizer over the current photo set
    pub async fn organize(&self) -> Result<Vec<Folder>, SessionError> {
        let photos = {
            let mut state = self.state.lock().await;
            state.begin_organize()?
        };

        let guard = OrganizeGuard::arm(&self.state);

        tracing::info!(photos = photos.len(), "Organizing photos");
        let outcome = self.organizer.organize(&photos).await;

        let mut state = self.state.lock().await;
        let finished = state.finish_organize(outcome.clone());
        guard.disarm();
        finished?;

        match outcome {
            Ok(folders) => {
                if let Some(coverage) = state.coverage().filter(|c| !c.is_complete()) {
                    tracing::warn!(
                        out_of_range = ?coverage.out_of_range,
                        missing = ?coverage.missing,
                        duplicated = ?coverage.duplicated,
                        "Folders do not cover every photo exactly once"
                    );
                }
                tracing::info!(folders = folders.len(), "Organize finished");
                Ok(folders)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Organize failed");
                Err(e.into())
            }
        }
    }

    /// Drop everything and release all previews. Safe to call repeatedly.
    pub async fn reset(&self) -> Result<(), SessionError> {
        let mut state = self.state.lock().await;
        let previous = state.clear()?;
        let released = self.registry.revoke_all(&previous);

        tracing::debug!(released, "Session reset");
        Ok(())
    }

    /// Archive one folder of the current result.
    /// The photo set cannot be replaced or reset until the archive is built.
    pub async fn export_folder(&self, folder_index: usize) -> Result<Archive, SessionError> {
        let state = self.state.lock().await;
        let folders = state.folders().ok_or(SessionError::NoResult)?;
        let folder = folders
            .get(folder_index)
            .ok_or(SessionError::UnknownFolder(folder_index))?;

        Ok(export::export_folder(&self.registry, folder, state.photos()).await?)
    }

    /// Index of the folder with the given name (case-insensitive)
    pub async fn find_folder(&self, name: &str) -> Option<usize> {
        let state = self.state.lock().await;
        state
            .folders()?
            .iter()
            .position(|f| f.name.eq_ignore_ascii_case(name.trim()))
    }

    pub async fn phase(&self) -> Phase {
        self.state.lock().await.phase()
    }

    pub async fn folders(&self) -> Vec<Folder> {
        let state = self.state.lock().await;
        state.folders().map(<[Folder]>::to_vec).unwrap_or_default()
    }

    pub async fn snapshot(&self) -> SessionView {
        let state = self.state.lock().await;

        SessionView {
            phase: state.phase(),
            photos: state
                .photos()
                .iter()
                .map(|photo| PhotoView {
                    name: photo.file.name.clone(),
                    content_type: photo.file.content_type.clone(),
                    preview: photo.preview.clone(),
                })
                .collect(),
            folders: state.folders().map(<[Folder]>::to_vec).unwrap_or_default(),
            message: state.message().map(str::to_string),
            coverage: state.coverage().cloned(),
        }
    }
}

/// Moves an abandoned organize run from `Organizing` to `Failed`.
///
/// Armed once the state enters `Organizing`; if the organize future is
/// dropped before the outcome is recorded, the photos stay selected and
/// become releasable again.
struct OrganizeGuard {
    state: Arc<Mutex<AppState>>,
    armed: bool,
}

impl OrganizeGuard {
    fn arm(state: &Arc<Mutex<AppState>>) -> Self {
        Self {
            state: Arc::clone(state),
            armed: true,
        }
    }

    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for OrganizeGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }

        tracing::warn!("Organize run dropped before it finished");
        if let Ok(mut state) = self.state.try_lock() {
            cancel_organize(&mut state);
            return;
        }

        // Someone holds the lock; finish the transition once they let go
        let state = Arc::clone(&self.state);
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    cancel_organize(&mut *state.lock().await);
                });
            }
            Err(_) => tracing::error!("No runtime left to release the cancelled organize run"),
        }
    }
}

fn cancel_organize(state: &mut AppState) {
    // NotOrganizing means the outcome was recorded after all
    let _ = state.finish_organize(Err(OrganizeError::Cancelled));
}
