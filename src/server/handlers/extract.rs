use std::str::FromStr;
use std::sync::Arc;

use axum::extract::multipart::MultipartRejection;
use axum::extract::{Multipart, State};
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::core::errors::ApiError;
use crate::extract::upload::validate_upload;
use crate::extract::{requires_file, ExtractSource, UploadedFile};
use crate::knowledge::SourceType;
use crate::server::handlers::utils::multipart_error;
use crate::state::AppState;

#[derive(Debug, Default)]
struct ExtractForm {
    source_type: Option<String>,
    url: Option<String>,
    file: Option<UploadedFile>,
}

/// Runs the extractor for `source_type` over the uploaded `file` or the `url`
/// form field and returns the text as `{content}`.
pub async fn extract_content(
    State(state): State<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let multipart = multipart.map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;
    let form = read_form(multipart).await?;

    let source_type = form
        .source_type
        .as_deref()
        .and_then(|raw| SourceType::from_str(raw).ok())
        .ok_or_else(|| ApiError::BadRequest("Invalid source type".to_string()))?;

    let source = match requires_file(source_type) {
        Some(true) => {
            let file = form
                .file
                .ok_or_else(|| ApiError::BadRequest("No file provided".to_string()))?;
            if file.bytes.len() > state.settings.uploads.max_bytes {
                return Err(ApiError::PayloadTooLarge(format!(
                    "File exceeds the maximum upload size of {} bytes",
                    state.settings.uploads.max_bytes
                )));
            }
            validate_upload(&state.settings.uploads, source_type, &file)?;
            ExtractSource::File(file)
        }
        Some(false) => {
            let url = form
                .url
                .filter(|url| !url.trim().is_empty())
                .ok_or_else(|| ApiError::BadRequest("No URL provided".to_string()))?;
            ExtractSource::Url(url.trim().to_string())
        }
        None => return Err(ApiError::BadRequest("Invalid source type".to_string())),
    };

    let content = state
        .extractors
        .extract(source_type, source)
        .await
        .map_err(|err| {
            tracing::error!("Error extracting {} content: {}", source_type, err);
            ApiError::from(err)
        })?;

    Ok(Json(json!({ "content": content })))
}

async fn read_form(mut multipart: Multipart) -> Result<ExtractForm, ApiError> {
    let mut form = ExtractForm::default();
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "source_type" => form.source_type = Some(field.text().await.map_err(multipart_error)?),
            "url" => form.url = Some(field.text().await.map_err(multipart_error)?),
            "file" => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let content_type = field.content_type().map(str::to_string);
                let bytes = field.bytes().await.map_err(multipart_error)?;
                // browsers send an empty part when no file was chosen
                if file_name.is_empty() && bytes.is_empty() {
                    continue;
                }
                form.file = Some(UploadedFile {
                    file_name,
                    content_type,
                    bytes: bytes.to_vec(),
                });
            }
            other => tracing::debug!("Ignoring form field {}", other),
        }
    }
    Ok(form)
}
