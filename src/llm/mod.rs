pub mod gemini;
pub mod provider;
pub mod response;
pub mod title;

pub use gemini::{GeminiClient, Part};
pub use provider::LlmProvider;
pub use response::{ChatAnswer, Citation, ResponseGenerator};
pub use title::TitleGenerator;
