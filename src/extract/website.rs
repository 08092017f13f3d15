use reqwest::Client;

use super::ExtractError;

const RENDER_WIDTH: usize = 100;

pub async fn extract_website(client: &Client, url: &str) -> Result<String, ExtractError> {
    let parsed = reqwest::Url::parse(url.trim())
        .map_err(|_| ExtractError::InvalidInput(format!("Invalid URL: {}", url)))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ExtractError::InvalidInput(format!(
            "Unsupported URL scheme: {}",
            parsed.scheme()
        )));
    }

    let response = client.get(parsed.clone()).send().await.map_err(|e| {
        tracing::error!("Error extracting text from website: {}", e);
        ExtractError::Upstream(format!("Failed to extract text from website: {}", e))
    })?;

    if !response.status().is_success() {
        return Err(ExtractError::Upstream(format!(
            "Failed to extract text from website: {} returned {}",
            parsed,
            response.status()
        )));
    }

    let html = response.text().await.map_err(|e| {
        ExtractError::Upstream(format!("Failed to extract text from website: {}", e))
    })?;

    let text = html_to_text(&html)?;
    if text.is_empty() {
        return Err(ExtractError::NoContent(format!(
            "Could not extract text from {}. The website might block scraping or contain no text content.",
            url
        )));
    }
    Ok(text)
}

/// Renders HTML as plain text and drops blank lines.
pub fn html_to_text(html: &str) -> Result<String, ExtractError> {
    let rendered = html2text::config::plain()
        .string_from_read(html.as_bytes(), RENDER_WIDTH)
        .map_err(|e| ExtractError::Malformed(format!("Failed to parse HTML: {}", e)))?;

    Ok(rendered
        .lines()
        .map(str::trim_end)
        .filter(|line| !line.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n"))
}
