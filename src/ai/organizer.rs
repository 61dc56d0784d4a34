//! Photo organizer
//!
//! Encodes a photo batch, makes exactly one classification call and validates
//! the structured answer into folders. Range and coverage of the returned
//! indices are NOT enforced here; see [`CoverageReport`].

use base64::{engine::general_purpose::STANDARD, Engine};
use futures::future::try_join_all;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

use super::client::{ClassificationRequest, ClassificationService, EncodedImage, ServiceError};
use super::prompts;
use crate::models::{Folder, Photo};

/// Error type for organize calls. Callers only ever show the message.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OrganizeError {
    #[error("Failed to prepare photos: {0}")]
    Encoding(String),
    #[error("Classification service failed: {0}")]
    Service(#[from] ServiceError),
    #[error("The AI returned an unexpected response: {0}")]
    MalformedResponse(String),
    #[error("Organizing was cancelled before the service answered")]
    Cancelled,
}

impl From<OrganizeError> for String {
    fn from(err: OrganizeError) -> Self {
        err.to_string()
    }
}

pub struct Organizer {
    service: Arc<dyn ClassificationService>,
}

impl Organizer {
    pub fn new(service: Arc<dyn ClassificationService>) -> Self {
        Self { service }
    }

    /// Group photos into folders with one classification call
    pub async fn organize(&self, photos: &[Photo]) -> Result<Vec<Folder>, OrganizeError> {
        if photos.is_empty() {
            return Err(OrganizeError::Encoding("no photos to organize".to_string()));
        }

        let images = encode_photos(photos).await?;
        let payload_bytes: usize = images.iter().map(|i| i.data.len()).sum();
        tracing::debug!(
            photos = images.len(),
            payload_bytes,
            "Encoded photos for classification"
        );

        let request = ClassificationRequest {
            instruction: prompts::ORGANIZE_INSTRUCTION.to_string(),
            images,
            response_schema: prompts::folder_response_schema(),
        };

        let payload = self.service.classify(&request).await?;
        parse_folders(&payload)
    }
}

/// Encode every photo concurrently; the first failure aborts the batch
pub async fn encode_photos(photos: &[Photo]) -> Result<Vec<EncodedImage>, OrganizeError> {
    try_join_all(photos.iter().map(encode_photo)).await
}

async fn encode_photo(photo: &Photo) -> Result<EncodedImage, OrganizeError> {
    let bytes = photo
        .file
        .read()
        .await
        .map_err(|e| OrganizeError::Encoding(format!("Failed to read {}: {}", photo.name(), e)))?;

    Ok(EncodedImage {
        mime_type: photo.file.content_type.clone(),
        data: STANDARD.encode(&bytes),
    })
}

/// Decode and validate a structured classification payload.
///
/// The payload must be a JSON array whose elements each carry a string
/// `folderName` and an integer array `photoIndices`. A missing or non-string
/// `description` becomes empty.
pub fn parse_folders(payload: &str) -> Result<Vec<Folder>, OrganizeError> {
    let value: Value = serde_json::from_str(payload.trim())
        .map_err(|e| OrganizeError::MalformedResponse(format!("not valid JSON ({})", e)))?;

    let items = value.as_array().ok_or_else(|| {
        OrganizeError::MalformedResponse("expected a JSON array of folders".to_string())
    })?;

    items
        .iter()
        .enumerate()
        .map(|(position, item)| parse_folder(position, item))
        .collect()
}

fn parse_folder(position: usize, item: &Value) -> Result<Folder, OrganizeError> {
    let malformed =
        |what: &str| OrganizeError::MalformedResponse(format!("folder #{}: {}", position, what));

    let name = item
        .get("folderName")
        .and_then(Value::as_str)
        .ok_or_else(|| malformed("missing string field `folderName`"))?;

    let indices = item
        .get("photoIndices")
        .and_then(Value::as_array)
        .ok_or_else(|| malformed("missing array field `photoIndices`"))?;

    let member_indices = indices
        .iter()
        .map(|index| {
            index
                .as_i64()
                .ok_or_else(|| malformed(&format!("photo index {} is not an integer", index)))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let description = item
        .get("description")
        .and_then(Value::as_str)
        .unwrap_or_default();

    Ok(Folder {
        name: name.to_string(),
        description: description.to_string(),
        member_indices,
    })
}

/// How well a folder set covers the photos it was computed for
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CoverageReport {
    /// Indices outside `0..photo_count`, in encounter order
    pub out_of_range: Vec<i64>,
    /// Photos no folder mentions
    pub missing: Vec<usize>,
    /// Photos mentioned more than once
    pub duplicated: Vec<usize>,
}

impl CoverageReport {
    pub fn check(folders: &[Folder], photo_count: usize) -> Self {
        let mut seen = vec![0usize; photo_count];
        let mut out_of_range = Vec::new();

        for index in folders.iter().flat_map(|f| f.member_indices.iter().copied()) {
            match usize::try_from(index).ok().filter(|i| *i < photo_count) {
                Some(i) => seen[i] += 1,
                None => out_of_range.push(index),
            }
        }

        let with_count = |pred: fn(usize) -> bool| -> Vec<usize> {
            seen.iter()
                .enumerate()
                .filter(|(_, count)| pred(**count))
                .map(|(i, _)| i)
                .collect()
        };

        Self {
            out_of_range,
            missing: with_count(|c| c == 0),
            duplicated: with_count(|c| c > 1),
        }
    }

    /// Every photo in exactly one folder, no stray indices
    pub fn is_complete(&self) -> bool {
        self.out_of_range.is_empty() && self.missing.is_empty() && self.duplicated.is_empty()
    }
}
