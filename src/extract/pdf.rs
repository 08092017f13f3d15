use super::ExtractError;

pub const NO_PDF_TEXT: &str = "No text could be extracted from the PDF";

/// pdf-extract can panic on malformed input, so it runs on the blocking pool
/// behind `catch_unwind`.
pub async fn extract_pdf(bytes: Vec<u8>) -> Result<String, ExtractError> {
    let result = tokio::task::spawn_blocking(move || {
        std::panic::catch_unwind(|| pdf_extract::extract_text_from_mem(&bytes))
    })
    .await
    .map_err(|e| ExtractError::Upstream(format!("PDF extraction task failed: {}", e)))?;

    let text = match result {
        Ok(Ok(text)) => text,
        Ok(Err(e)) => {
            tracing::error!("Error extracting text from PDF: {}", e);
            return Err(ExtractError::Malformed(format!(
                "Failed to read PDF: {}",
                e
            )));
        }
        Err(_panic) => {
            tracing::error!("PDF parser panicked");
            return Err(ExtractError::Malformed(
                "Failed to read PDF: unsupported or corrupt document".to_string(),
            ));
        }
    };

    if text.trim().is_empty() {
        return Err(ExtractError::NoContent(NO_PDF_TEXT.to_string()));
    }
    Ok(text)
}
