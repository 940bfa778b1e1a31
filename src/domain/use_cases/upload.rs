use std::path::Path;

use chrono::Utc;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::{
    constants::UPLOADS_URL_PREFIX,
    entities::media::{MediaUploadForm, NewMediaMetadata, UploadResponse},
    errors::AppError,
    infrastructure::storage::MediaStorage,
    use_cases::metadata::MetadataExtractor,
};

pub struct MediaUploadHandler<S>
where
    S: MediaStorage,
{
    pub storage: S,
    pub extractor: MetadataExtractor,
}

impl<S> MediaUploadHandler<S>
where
    S: MediaStorage,
{
    pub fn new(storage: S, extractor: MetadataExtractor) -> Self {
        MediaUploadHandler { storage, extractor }
    }

    /// Accepts a multipart upload: validates first, persists second, so a
    /// rejected request leaves nothing behind in storage. Metadata
    /// extraction is best-effort and never fails the upload.
    pub async fn handle_upload(&self, form: MediaUploadForm) -> Result<UploadResponse, AppError> {
        let metadata = NewMediaMetadata {
            title: form.title.into_inner(),
            description: form.description.into_inner(),
            category: form.category.into_inner(),
        };
        metadata.validate()?;

        let media_type = form
            .file
            .content_type
            .as_ref()
            .map(|m| m.essence_str().to_string())
            .ok_or(AppError::InvalidFileType)?;

        if !(media_type.starts_with("image/") || media_type.starts_with("video/")) {
            return Err(AppError::InvalidFileType);
        }

        let original_filename = form
            .file
            .file_name
            .clone()
            .unwrap_or_else(|| "upload".to_string());

        let id = Uuid::new_v4();
        let stored_name = format!("{id}{}", file_extension(&original_filename));

        let stored_path = self
            .storage
            .persist(form.file.file.path(), &stored_name)
            .await?;

        let technical_metadata = self.extractor.extract(&stored_path, &media_type).await;

        info!(
            id = %id,
            media_type = %media_type,
            size = form.file.size,
            metadata_empty = technical_metadata.is_empty(),
            "stored upload"
        );

        Ok(UploadResponse {
            id: id.to_string(),
            filename: stored_name.clone(),
            file_path: format!("{UPLOADS_URL_PREFIX}/{stored_name}"),
            original_filename,
            media_type,
            title: metadata.title,
            description: metadata.description,
            category: metadata.category,
            technical_metadata,
            upload_date: Utc::now().to_rfc3339(),
        })
    }
}

/// Extension with its leading dot, lowercased; empty when the original
/// filename has none.
fn file_extension(filename: &str) -> String {
    Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| format!(".{}", ext.to_ascii_lowercase()))
        .unwrap_or_default()
}
