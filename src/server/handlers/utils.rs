use axum::extract::multipart::MultipartError;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::Json;

use crate::core::errors::ApiError;

const SIZE_UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

/// Turns axum's plain-text JSON rejection into an `{error}` response.
pub fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    match payload {
        Ok(Json(value)) => Ok(value),
        Err(rejection) if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE => {
            Err(ApiError::PayloadTooLarge(rejection.body_text()))
        }
        Err(rejection) => Err(ApiError::BadRequest(rejection.body_text())),
    }
}

pub fn multipart_error(err: MultipartError) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge("Uploaded file exceeds the maximum allowed size".to_string())
    } else {
        ApiError::BadRequest(format!("Invalid multipart form: {}", err.body_text()))
    }
}

/// Human-readable byte count, e.g. `1.50 KB`; `0B` for zero.
pub fn format_file_size(bytes: u64) -> String {
    if bytes == 0 {
        return "0B".to_string();
    }
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < SIZE_UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    format!("{:.2} {}", size, SIZE_UNITS[unit])
}
