use std::sync::Arc;

use super::provider::LlmProvider;
use crate::core::errors::ApiError;

const TITLE_CONTEXT_CHARS: usize = 300;
const MAX_TITLE_CHARS: usize = 100;

/// Asks the LLM for a short descriptive title of a document.
#[derive(Clone)]
pub struct TitleGenerator {
    llm: Arc<dyn LlmProvider>,
}

impl TitleGenerator {
    pub fn new(llm: Arc<dyn LlmProvider>) -> Self {
        Self { llm }
    }

    pub async fn generate(&self, content: &str) -> Result<String, ApiError> {
        let prompt = title_prompt(content);
        let raw = self.llm.generate(&prompt).await?;
        let title = clean_title(&raw);
        if title.is_empty() {
            return Err(ApiError::BadGateway(
                "Title generation returned an empty title".to_string(),
            ));
        }
        Ok(title)
    }
}

fn title_prompt(content: &str) -> String {
    let preview = if content.chars().count() > TITLE_CONTEXT_CHARS {
        let head: String = content.chars().take(TITLE_CONTEXT_CHARS).collect();
        format!("{}...", head)
    } else {
        content.to_string()
    };

    format!(
        "Generate a concise, descriptive title for the following content.\n\
         The title should be 5-10 words and accurately reflect the main topic.\n\
         Reply with the title only.\n\n\
         Content: {}\n\n\
         Title:",
        preview
    )
}

/// Trims quotes and whitespace, then caps the title at 100 characters.
fn clean_title(raw: &str) -> String {
    let line = raw.lines().find(|l| !l.trim().is_empty()).unwrap_or("");
    let title = line
        .trim()
        .trim_matches(|c| c == '"' || c == '\'' || c == '*')
        .trim();

    if title.chars().count() > MAX_TITLE_CHARS {
        let head: String = title.chars().take(MAX_TITLE_CHARS - 3).collect();
        format!("{}...", head)
    } else {
        title.to_string()
    }
}
