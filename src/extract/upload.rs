use crate::core::config::settings::UploadSettings;
use crate::knowledge::SourceType;

use super::ExtractError;

const GENERIC_MIME: &str = "application/octet-stream";

#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    /// Lowercased extension without the dot.
    pub fn extension(&self) -> Option<String> {
        let (stem, ext) = self.file_name.rsplit_once('.')?;
        if stem.is_empty() || ext.is_empty() {
            return None;
        }
        Some(ext.to_ascii_lowercase())
    }
}

/// Extensions accepted for each upload-backed source type.
pub fn extensions_for(source_type: SourceType) -> &'static [&'static str] {
    match source_type {
        SourceType::Text => &["txt"],
        SourceType::Pdf => &["pdf"],
        SourceType::Audio => &["mp3", "wav"],
        SourceType::Image => &["jpg", "jpeg", "png"],
        SourceType::Youtube | SourceType::Website | SourceType::Manual => &[],
    }
}

/// Checks the file name and declared MIME type against the configured allow-list.
pub fn validate_upload(
    settings: &UploadSettings,
    source_type: SourceType,
    file: &UploadedFile,
) -> Result<(), ExtractError> {
    if file.bytes.is_empty() {
        return Err(ExtractError::InvalidInput("Uploaded file is empty".to_string()));
    }

    let ext = file.extension().ok_or_else(|| {
        ExtractError::InvalidInput(format!("File '{}' has no extension", file.file_name))
    })?;

    let allowed_mimes = settings.allowed_extensions.get(&ext).ok_or_else(|| {
        ExtractError::InvalidInput(format!("File type '.{}' is not allowed", ext))
    })?;

    if !extensions_for(source_type).contains(&ext.as_str()) {
        return Err(ExtractError::InvalidInput(format!(
            "File type '.{}' does not match source type '{}'",
            ext, source_type
        )));
    }

    if let Some(declared) = declared_mime(file) {
        if !allowed_mimes.iter().any(|m| m.eq_ignore_ascii_case(&declared)) {
            return Err(ExtractError::InvalidInput(format!(
                "MIME type '{}' is not allowed for '.{}' files",
                declared, ext
            )));
        }
    }

    Ok(())
}

/// Declared content type, ignoring parameters and the generic binary type.
fn declared_mime(file: &UploadedFile) -> Option<String> {
    let raw = file.content_type.as_deref()?;
    let mime = raw.split(';').next().unwrap_or("").trim().to_ascii_lowercase();
    if mime.is_empty() || mime == GENERIC_MIME {
        None
    } else {
        Some(mime)
    }
}

/// MIME type to send upstream: declared type, else one derived from the extension.
pub fn guess_mime(file: &UploadedFile, default: &str) -> String {
    if let Some(declared) = declared_mime(file) {
        return declared;
    }
    let by_ext = match file.extension().as_deref() {
        Some("mp3") => "audio/mpeg",
        Some("wav") => "audio/wav",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("pdf") => "application/pdf",
        Some("txt") => "text/plain",
        _ => default,
    };
    by_ext.to_string()
}
