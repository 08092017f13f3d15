pub mod core;
pub mod embedding;
pub mod extract;
pub mod knowledge;
pub mod llm;
pub mod search;
pub mod server;
pub mod state;
