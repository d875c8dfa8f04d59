//! Collecting uploaded files out of a multipart body.

use axum::extract::Multipart;
use faceverify_pipeline::Upload;

use crate::error::{AppError, AppResult};

/// Read every file part named `field_name`.
///
/// Parts with another name and parts with an empty filename are skipped.
pub async fn collect_files(multipart: &mut Multipart, field_name: &str) -> AppResult<Vec<Upload>> {
    let mut uploads = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        if field.name() != Some(field_name) {
            continue;
        }
        let filename = match field.file_name() {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => continue,
        };

        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(e.to_string()))?;

        uploads.push(Upload::new(filename, data.to_vec()));
    }

    Ok(uploads)
}
