pub mod chat;
pub mod documents;
pub mod extract;
pub mod health;
pub mod utils;
