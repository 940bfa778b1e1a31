use actix_multipart::form::{tempfile::TempFile, text::Text, MultipartForm};
use derive_more::Display;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Coarse media category derived from the declared MIME type.
///
/// Dispatch is binary: anything that is not `image/*` is treated as video.
/// A mislabeled upload is probed by the wrong prober and degrades to an
/// empty metadata record instead of failing the request.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    #[display("image")]
    Image,
    #[display("video")]
    Video,
}

impl MediaKind {
    pub fn from_mime(mime: &str) -> Self {
        if mime.starts_with("image/") {
            MediaKind::Image
        } else {
            MediaKind::Video
        }
    }
}

/// Best-effort technical metadata for an uploaded file.
///
/// Every field is optional for both media kinds: an absent field means
/// extraction did not produce it, not that the request failed. A total
/// extraction failure serializes as `{}`.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct TechnicalMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolution: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub aspect_ratio: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub creation_time: Option<String>,

    /// Container format detected by the image prober, e.g. "JPEG".
    /// Never set for videos.
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

impl TechnicalMetadata {
    pub fn is_empty(&self) -> bool {
        self.resolution.is_none()
            && self.aspect_ratio.is_none()
            && self.duration.is_none()
            && self.quality.is_none()
            && self.creation_time.is_none()
            && self.kind.is_none()
    }
}

/// A curated portfolio entry. Constructed by the upload use case and
/// re-submitted verbatim by the client on portfolio saves.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct MediaItem {
    pub id: String,
    pub filename: String,
    pub media_type: String,
    pub title: String,
    pub description: String,
    pub category: String,
    pub technical_metadata: Option<TechnicalMetadata>,
    pub upload_date: String,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct Portfolio {
    #[validate(length(min = 1, message = "user_id cannot be empty"))]
    pub user_id: String,
    pub items: Vec<MediaItem>,
}

// ───── Upload Request / Response ─────────────────────────────────────

#[derive(Debug, MultipartForm)]
pub struct MediaUploadForm {
    #[multipart(rename = "file")]
    pub file: TempFile,

    pub title: Text<String>,
    pub description: Text<String>,
    pub category: Text<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct NewMediaMetadata {
    #[validate(length(min = 1, max = 200, message = "Title must be 1-200 characters"))]
    pub title: String,

    #[validate(length(max = 2000, message = "Description must be at most 2000 characters"))]
    pub description: String,

    #[validate(length(min = 1, max = 100, message = "Category must be 1-100 characters"))]
    pub category: String,
}

/// Response body for a successful upload. Mirrors [`MediaItem`] plus the
/// served path and original client filename.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct UploadResponse {
    pub id: String,
    pub filename: String,
    pub file_path: String,
    pub original_filename: String,
    pub media_type: String,
    pub title: String,
    pub description: String,
    pub category: String,
    pub technical_metadata: TechnicalMetadata,
    pub upload_date: String,
}
