//! Content extractors: turn an upload or URL into plain text.
//!
//! Every extractor returns `Result<String, ExtractError>`; a failed extraction
//! is never passed off as document text.

mod media;
mod pdf;
pub mod upload;
mod website;
mod youtube;

use std::time::Duration;

use reqwest::redirect::Policy;
use reqwest::Client;
use thiserror::Error;

use crate::core::errors::ApiError;
use crate::knowledge::SourceType;
use crate::llm::GeminiClient;

pub use upload::UploadedFile;
pub use youtube::parse_video_id;

const USER_AGENT: &str = concat!(
    "Mozilla/5.0 (compatible; lore-backend/",
    env!("CARGO_PKG_VERSION"),
    ")"
);

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("{0}")]
    InvalidInput(String),
    #[error("{0}")]
    Malformed(String),
    #[error("{0}")]
    NoContent(String),
    #[error("{0}")]
    Upstream(String),
}

impl ExtractError {
    /// Whether the caller's input is at fault (400) rather than a dependency (500).
    pub fn is_client_error(&self) -> bool {
        !matches!(self, ExtractError::Upstream(_))
    }
}

impl From<ExtractError> for ApiError {
    fn from(err: ExtractError) -> Self {
        if err.is_client_error() {
            ApiError::BadRequest(err.to_string())
        } else {
            ApiError::Internal(err.to_string())
        }
    }
}

/// What to extract from. Uploads carry the file; link sources carry the URL.
#[derive(Debug, Clone)]
pub enum ExtractSource {
    File(UploadedFile),
    Url(String),
}

#[derive(Clone)]
pub struct Extractors {
    gemini: GeminiClient,
    web: Client,
}

impl Extractors {
    pub fn new(gemini: GeminiClient) -> Result<Self, ApiError> {
        let web = Client::builder()
            .user_agent(USER_AGENT)
            .redirect(Policy::limited(5))
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(ApiError::internal)?;
        Ok(Self { gemini, web })
    }

    pub async fn extract(
        &self,
        source_type: SourceType,
        source: ExtractSource,
    ) -> Result<String, ExtractError> {
        match (source_type, source) {
            (SourceType::Text, ExtractSource::File(file)) => Ok(extract_text(&file.bytes)),
            (SourceType::Pdf, ExtractSource::File(file)) => pdf::extract_pdf(file.bytes).await,
            (SourceType::Audio, ExtractSource::File(file)) => {
                media::transcribe_audio(&self.gemini, file).await
            }
            (SourceType::Image, ExtractSource::File(file)) => {
                media::extract_image_text(&self.gemini, file).await
            }
            (SourceType::Youtube, ExtractSource::Url(url)) => {
                youtube::fetch_transcript(&self.web, &url).await
            }
            (SourceType::Website, ExtractSource::Url(url)) => {
                website::extract_website(&self.web, &url).await
            }
            (kind, ExtractSource::Url(_)) => Err(ExtractError::InvalidInput(format!(
                "Source type '{}' requires a file",
                kind
            ))),
            (kind, ExtractSource::File(_)) => Err(ExtractError::InvalidInput(format!(
                "Source type '{}' requires a URL",
                kind
            ))),
        }
    }
}

/// Plain-text uploads: UTF-8 with replacement of undecodable bytes.
pub fn extract_text(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

/// Source types handled by `/api/extract-content` and whether each needs an upload.
pub fn requires_file(source_type: SourceType) -> Option<bool> {
    match source_type {
        SourceType::Text | SourceType::Pdf | SourceType::Audio | SourceType::Image => Some(true),
        SourceType::Youtube | SourceType::Website => Some(false),
        SourceType::Manual => None,
    }
}
