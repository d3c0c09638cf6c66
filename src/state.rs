use crate::{ai::OpenAiClient, config::Config, rubrics::RubricStore};

/// Application state shared across all handlers.
///
/// Everything here is immutable after start-up: the capability client, the
/// configuration and the default rubric are safe for unsynchronized
/// concurrent reads.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub openai: OpenAiClient,
    pub rubrics: RubricStore,
}

impl AppState {
    pub fn new(config: Config, openai: OpenAiClient, rubrics: RubricStore) -> Self {
        Self {
            config,
            openai,
            rubrics,
        }
    }
}
