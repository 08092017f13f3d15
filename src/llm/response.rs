//! Chat answer generation over retrieved knowledge and web snippets.
//!
//! Snippets are numbered `[KB<n>]` and `[WEB<n>]` in the prompt; the citation
//! list mirrors that numbering, knowledge entries first.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::provider::LlmProvider;

pub const APOLOGY: &str =
    "I encountered an error while processing your request. Please try again.";

const NO_CONTEXT: &str = "No additional context provided.";
const KNOWLEDGE_SOURCE: &str = "Knowledge Base";
const WEB_SOURCE_MARKER: &str = "[Source: ";
const WEB_SOURCE_FALLBACK: &str = "[Source: Web]";

pub const DEFAULT_INSTRUCTIONS: &str = "Instructions:
1. Answer the user's query based on the provided information and your knowledge
2. If the context information is relevant, incorporate it and cite the source using the format [KB1], [WEB1], etc.
3. If you don't have relevant information, just answer to the best of your ability
4. Be concise and clear in your response
5. Format the answer in a way that's easy to read
6. Do not include timestamps or date information in your responses";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citation {
    pub id: String,
    pub text: String,
    pub source: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatAnswer {
    pub response: String,
    pub citations: Vec<Citation>,
}

pub struct ResponseGenerator {
    llm: Arc<dyn LlmProvider>,
    instructions: String,
    snippet_chars: usize,
}

impl ResponseGenerator {
    pub fn new(llm: Arc<dyn LlmProvider>, instructions: String, snippet_chars: usize) -> Self {
        Self {
            llm,
            instructions,
            snippet_chars,
        }
    }

    /// Never fails: an LLM error becomes the apology text with no citations.
    pub async fn generate(&self, query: &str, knowledge: &[String], web: &[String]) -> ChatAnswer {
        let (context, citations) = build_context(knowledge, web, self.snippet_chars);
        let prompt = build_prompt(query, &context, &self.instructions);

        match self.llm.generate(&prompt).await {
            Ok(response) => ChatAnswer {
                response,
                citations,
            },
            Err(err) => {
                tracing::error!("Error generating AI response: {}", err);
                ChatAnswer {
                    response: APOLOGY.to_string(),
                    citations: Vec::new(),
                }
            }
        }
    }
}

/// Loads the instruction block from a template file, falling back to the
/// built-in block when the file is missing or empty.
pub fn load_instructions(path: &Path) -> String {
    match fs::read_to_string(path) {
        Ok(text) if !text.trim().is_empty() => text.trim().to_string(),
        Ok(_) => DEFAULT_INSTRUCTIONS.to_string(),
        Err(err) => {
            tracing::warn!(
                "Prompt template {} not available ({}), using built-in instructions",
                path.display(),
                err
            );
            DEFAULT_INSTRUCTIONS.to_string()
        }
    }
}

pub fn build_context(
    knowledge: &[String],
    web: &[String],
    snippet_chars: usize,
) -> (String, Vec<Citation>) {
    let mut lines = Vec::new();
    let mut citations = Vec::with_capacity(knowledge.len() + web.len());

    if !knowledge.is_empty() {
        lines.push("Information from Knowledge Base:".to_string());
        for (i, result) in knowledge.iter().enumerate() {
            let id = format!("KB{}", i + 1);
            lines.push(format!("[{}]: {}", id, result));
            citations.push(Citation {
                id,
                text: snippet(result, snippet_chars),
                source: KNOWLEDGE_SOURCE.to_string(),
            });
        }
    }

    if !web.is_empty() {
        lines.push("Information from Web Search:".to_string());
        for (i, result) in web.iter().enumerate() {
            let id = format!("WEB{}", i + 1);
            lines.push(format!("[{}]: {}", id, result));
            citations.push(Citation {
                id,
                text: snippet(result, snippet_chars),
                source: web_source(result),
            });
        }
    }

    let context = if lines.is_empty() {
        NO_CONTEXT.to_string()
    } else {
        lines.join("\n")
    };
    (context, citations)
}

pub fn build_prompt(query: &str, context: &str, instructions: &str) -> String {
    format!(
        "User Query: {}\n\n{}\n\n{}",
        query, context, instructions
    )
}

/// The trailing `[Source: ...]` marker of a web snippet.
pub fn web_source(result: &str) -> String {
    match result.rfind(WEB_SOURCE_MARKER) {
        Some(start) => result[start..].to_string(),
        None => WEB_SOURCE_FALLBACK.to_string(),
    }
}

fn snippet(text: &str, max_chars: usize) -> String {
    if text.chars().count() > max_chars {
        let head: String = text.chars().take(max_chars).collect();
        format!("{}...", head)
    } else {
        text.to_string()
    }
}
