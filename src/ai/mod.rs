pub mod openai;

pub use openai::{Message, ModerationResult, OpenAiClient};
