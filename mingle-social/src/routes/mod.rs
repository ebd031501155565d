pub mod comments;
pub mod follows;
pub mod health;
pub mod live;
pub mod notifications;
pub mod posts;
pub mod profile;

use std::collections::HashMap;

use axum::extract::Multipart;

use mingle_shared::errors::{AppError, AppResult, ErrorCode};

use crate::services::post_service::MediaUpload;

/// A multipart form split into its `file` part and its text fields.
#[derive(Debug, Default)]
pub(crate) struct UploadForm {
    pub media: Option<MediaUpload>,
    pub fields: HashMap<String, String>,
}

pub(crate) async fn read_upload_form(mut multipart: Multipart) -> AppResult<UploadForm> {
    let mut form = UploadForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::new(ErrorCode::MediaUploadFailed, format!("failed to read multipart: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_string();
        if name == "file" {
            let content_type = field
                .content_type()
                .unwrap_or("application/octet-stream")
                .to_string();
            let file_name = field.file_name().map(str::to_string);
            let bytes = field
                .bytes()
                .await
                .map_err(|e| AppError::new(ErrorCode::MediaUploadFailed, format!("failed to read file data: {e}")))?;
            form.media = Some(MediaUpload {
                content_type,
                file_name,
                bytes: bytes.to_vec(),
            });
        } else {
            let value = field
                .text()
                .await
                .map_err(|e| AppError::bad_request(format!("invalid form field {name}: {e}")))?;
            form.fields.insert(name, value);
        }
    }

    Ok(form)
}
