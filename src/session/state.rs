//! Session state machine
//!
//! ```text
//!   Empty ──select──▶ Ready ──organize──▶ Organizing ──ok──▶ Organized
//!     ▲                 ▲                     │                  │
//!     │                 └──────select─────────┼──────────────────┤
//!     │                                       └──err──▶ Failed ──┘
//!     └─────────────── reset (any state but Organizing)
//! ```
//!
//! Transitions are pure: they hand back the photos that left the state so
//! the caller can release their previews.

use serde::Serialize;

use super::SessionError;
use crate::ai::organizer::{CoverageReport, OrganizeError};
use crate::models::{Folder, Photo};

/// Shown when organize is requested without photos
pub const NO_PHOTOS_NOTICE: &str = "Please select photos to organize first.";

#[derive(Debug, Clone)]
pub enum AppState {
    Empty {
        /// Validation message from a rejected request, if any
        notice: Option<String>,
    },
    Ready {
        photos: Vec<Photo>,
    },
    Organizing {
        photos: Vec<Photo>,
    },
    Organized {
        photos: Vec<Photo>,
        folders: Vec<Folder>,
        coverage: CoverageReport,
    },
    Failed {
        photos: Vec<Photo>,
        error: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Empty,
    Ready,
    Organizing,
    Organized,
    Failed,
}

impl Default for AppState {
    fn default() -> Self {
        AppState::Empty { notice: None }
    }
}

impl AppState {
    pub fn phase(&self) -> Phase {
        match self {
            AppState::Empty { .. } => Phase::Empty,
            AppState::Ready { .. } => Phase::Ready,
            AppState::Organizing { .. } => Phase::Organizing,
            AppState::Organized { .. } => Phase::Organized,
            AppState::Failed { .. } => Phase::Failed,
        }
    }

    pub fn photos(&self) -> &[Photo] {
        match self {
            AppState::Empty { .. } => &[],
            AppState::Ready { photos }
            | AppState::Organizing { photos }
            | AppState::Organized { photos, .. }
            | AppState::Failed { photos, .. } => photos.as_slice(),
        }
    }

    pub fn folders(&self) -> Option<&[Folder]> {
        match self {
            AppState::Organized { folders, .. } => Some(folders.as_slice()),
            _ => None,
        }
    }

    pub fn coverage(&self) -> Option<&CoverageReport> {
        match self {
            AppState::Organized { coverage, .. } => Some(coverage),
            _ => None,
        }
    }

    /// Error or validation message to show, if any
    pub fn message(&self) -> Option<&str> {
        match self {
            AppState::Empty { notice } => notice.as_deref(),
            AppState::Failed { error, .. } => Some(error.as_str()),
            _ => None,
        }
    }

    pub fn is_busy(&self) -> bool {
        matches!(self, AppState::Organizing { .. })
    }

    /// Swap in a new photo set, dropping any result or error.
    /// Returns the previous photos.
    pub fn replace_photos(&mut self, photos: Vec<Photo>) -> Result<Vec<Photo>, SessionError> {
        let previous = self.take_photos()?;
        *self = if photos.is_empty() {
            AppState::Empty { notice: None }
        } else {
            AppState::Ready { photos }
        };
        Ok(previous)
    }

    /// Enter `Organizing`, returning the photos to submit
    pub fn begin_organize(&mut self) -> Result<Vec<Photo>, SessionError> {
        if self.is_busy() {
            return Err(SessionError::Busy);
        }

        let photos = self.photos().to_vec();
        if photos.is_empty() {
            *self = AppState::Empty {
                notice: Some(NO_PHOTOS_NOTICE.to_string()),
            };
            return Err(SessionError::NoPhotos);
        }

        *self = AppState::Organizing {
            photos: photos.clone(),
        };
        Ok(photos)
    }

    /// Leave `Organizing` with the organizer's outcome. The folders are stored untouched.
    pub fn finish_organize(
        &mut self,
        outcome: Result<Vec<Folder>, OrganizeError>,
    ) -> Result<(), SessionError> {
        let AppState::Organizing { photos } = self else {
            return Err(SessionError::NotOrganizing);
        };
        let photos = std::mem::take(photos);

        *self = match outcome {
            Ok(folders) => {
                let coverage = CoverageReport::check(&folders, photos.len());
                AppState::Organized {
                    photos,
                    folders,
                    coverage,
                }
            }
            Err(e) => AppState::Failed {
                photos,
                error: e.to_string(),
            },
        };
        Ok(())
    }

    /// Back to `Empty`, returning the photos that were held
    pub fn clear(&mut self) -> Result<Vec<Photo>, SessionError> {
        let previous = self.take_photos()?;
        *self = AppState::Empty { notice: None };
        Ok(previous)
    }

    fn take_photos(&mut self) -> Result<Vec<Photo>, SessionError> {
        match self {
            AppState::Organizing { .. } => Err(SessionError::Busy),
            AppState::Empty { .. } => Ok(Vec::new()),
            AppState::Ready { photos }
            | AppState::Organized { photos, .. }
            | AppState::Failed { photos, .. } => Ok(std::mem::take(photos)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RawFile;
    use crate::services::intake::select_photos;
    use crate::services::previews::PreviewRegistry;

    fn some_photos(n: usize) -> Vec<Photo> {
        let registry = PreviewRegistry::new();
        select_photos(
            &registry,
            (0..n)
                .map(|i| RawFile::from_bytes(format!("{}.jpg", i), "image/jpeg", vec![i as u8]))
                .collect(),
        )
    }

    fn one_folder() -> Vec<Folder> {
        vec![Folder {
            name: "All".to_string(),
            description: "Everything.".to_string(),
            member_indices: vec![0, 1],
        }]
    }

    #[test]
    fn test_select_moves_to_ready_or_stays_empty() {
        let mut state = AppState::default();
        assert!(state.replace_photos(some_photos(2)).unwrap().is_empty());
        assert_eq!(state.phase(), Phase::Ready);

        let previous = state.replace_photos(Vec::new()).unwrap();
        assert_eq!(previous.len(), 2);
        assert_eq!(state.phase(), Phase::Empty);
    }

    #[test]
    fn test_organize_from_empty_sets_notice() {
        let mut state = AppState::default();
        assert!(matches!(state.begin_organize(), Err(SessionError::NoPhotos)));
        assert_eq!(state.phase(), Phase::Empty);
        assert_eq!(state.message(), Some(NO_PHOTOS_NOTICE));
    }

    #[test]
    fn test_successful_organize_keeps_folders_verbatim() {
        let mut state = AppState::default();
        state.replace_photos(some_photos(2)).unwrap();

        let submitted = state.begin_organize().unwrap();
        assert_eq!(submitted.len(), 2);
        assert_eq!(state.phase(), Phase::Organizing);

        state.finish_organize(Ok(one_folder())).unwrap();
        assert_eq!(state.phase(), Phase::Organized);
        assert_eq!(state.folders().unwrap(), one_folder().as_slice());
        assert!(state.coverage().unwrap().is_complete());
        assert_eq!(state.message(), None);
    }

    #[test]
    fn test_failed_organize_keeps_photos_and_drops_result() {
        let mut state = AppState::default();
        state.replace_photos(some_photos(3)).unwrap();
        state.begin_organize().unwrap();
        state.finish_organize(Ok(one_folder())).unwrap();

        state.begin_organize().unwrap();
        assert!(state.folders().is_none());
        state
            .finish_organize(Err(OrganizeError::MalformedResponse("bad".to_string())))
            .unwrap();

        assert_eq!(state.phase(), Phase::Failed);
        assert_eq!(state.photos().len(), 3);
        assert!(state.folders().is_none());
        assert!(state.message().unwrap().contains("bad"));
    }

    #[test]
    fn test_busy_rejects_everything_but_finish() {
        let mut state = AppState::default();
        state.replace_photos(some_photos(1)).unwrap();
        state.begin_organize().unwrap();

        assert!(matches!(state.begin_organize(), Err(SessionError::Busy)));
        assert!(matches!(state.replace_photos(some_photos(1)), Err(SessionError::Busy)));
        assert!(matches!(state.clear(), Err(SessionError::Busy)));
        assert_eq!(state.phase(), Phase::Organizing);
        assert_eq!(state.photos().len(), 1);
    }

    #[test]
    fn test_finish_without_begin() {
        let mut state = AppState::default();
        assert!(matches!(
            state.finish_organize(Ok(Vec::new())),
            Err(SessionError::NotOrganizing)
        ));
    }

    #[test]
    fn test_retry_after_failure() {
        let mut state = AppState::default();
        state.replace_photos(some_photos(2)).unwrap();
        state.begin_organize().unwrap();
        state
            .finish_organize(Err(OrganizeError::Encoding("disk".to_string())))
            .unwrap();

        assert_eq!(state.begin_organize().unwrap().len(), 2);
        assert_eq!(state.phase(), Phase::Organizing);
    }

    #[test]
    fn test_clear_is_idempotent() {
        let mut state = AppState::default();
        state.replace_photos(some_photos(2)).unwrap();

        assert_eq!(state.clear().unwrap().len(), 2);
        assert!(state.clear().unwrap().is_empty());
        assert_eq!(state.phase(), Phase::Empty);
        assert_eq!(state.message(), None);
    }
}
