use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use super::upload::{guess_mime, UploadedFile};
use super::ExtractError;
use crate::llm::{GeminiClient, Part};

const AUDIO_PROMPT: &str = "Transcribe this audio clip accurately";
const IMAGE_PROMPT: &str = "Extract and transcribe all visible text from this image";

pub async fn transcribe_audio(
    gemini: &GeminiClient,
    file: UploadedFile,
) -> Result<String, ExtractError> {
    let mime_type = guess_mime(&file, "audio/mpeg");
    let display_name = file.file_name.clone();

    let file_uri = gemini
        .upload_file(file.bytes, &mime_type, &display_name)
        .await
        .map_err(|e| {
            tracing::error!("Error uploading audio: {}", e);
            ExtractError::Upstream(format!("Failed to transcribe audio: {}", e.message()))
        })?;

    let parts = vec![
        Part::Text(AUDIO_PROMPT.to_string()),
        Part::FileData {
            mime_type,
            file_uri,
        },
    ];
    let text = gemini.generate_content(parts).await.map_err(|e| {
        tracing::error!("Error transcribing audio: {}", e);
        ExtractError::Upstream(format!("Failed to transcribe audio: {}", e.message()))
    })?;
    non_empty(text, "No speech could be transcribed from the audio")
}

pub async fn extract_image_text(
    gemini: &GeminiClient,
    file: UploadedFile,
) -> Result<String, ExtractError> {
    let mime_type = guess_mime(&file, "image/jpeg");
    let parts = vec![
        Part::Text(IMAGE_PROMPT.to_string()),
        Part::InlineData {
            mime_type,
            data: STANDARD.encode(&file.bytes),
        },
    ];
    let text = gemini.generate_content(parts).await.map_err(|e| {
        tracing::error!("Error extracting text from image: {}", e);
        ExtractError::Upstream(format!("Failed to extract text from image: {}", e.message()))
    })?;
    non_empty(text, "No text could be extracted from the image")
}

fn non_empty(text: String, message: &str) -> Result<String, ExtractError> {
    if text.trim().is_empty() {
        Err(ExtractError::NoContent(message.to_string()))
    } else {
        Ok(text)
    }
}
