use anyhow::{Context, Result};
use serde::Deserialize;
use std::env;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub openai: OpenAiConfig,
    pub evaluation: EvaluationConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub base_url: String,
    pub request_timeout_seconds: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EvaluationConfig {
    pub evaluator_model: String,
    pub relevance_model: String,
    pub moderation_model: String,
    pub embedding_model: String,
    pub rubrics_path: String,
    /// Vector store holding rubric documents, used as a retrieval fallback
    /// when a request carries no rubrics of its own.
    pub rubrics_vector_store_id: Option<String>,
    pub moderation_audit_path: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        // Load .env file if it exists (for local development)
        dotenvy::dotenv().ok();

        let config = Config {
            server: ServerConfig {
                host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: env::var("PORT")
                    .unwrap_or_else(|_| "5000".to_string())
                    .parse()
                    .context("Failed to parse PORT")?,
            },
            openai: OpenAiConfig {
                api_key: env::var("OPENAI_API_KEY")
                    .context("OPENAI_API_KEY must be set")?,
                base_url: env::var("OPENAI_BASE_URL")
                    .unwrap_or_else(|_| "https://api.openai.com/v1".to_string()),
                request_timeout_seconds: env::var("OPENAI_REQUEST_TIMEOUT_SECONDS")
                    .unwrap_or_else(|_| "120".to_string())
                    .parse()
                    .context("Failed to parse OPENAI_REQUEST_TIMEOUT_SECONDS")?,
            },
            evaluation: EvaluationConfig {
                evaluator_model: env::var("EVALUATOR_MODEL")
                    .unwrap_or_else(|_| "gpt-4o".to_string()),
                relevance_model: env::var("RELEVANCE_MODEL")
                    .unwrap_or_else(|_| "gpt-4o-mini".to_string()),
                moderation_model: env::var("MODERATION_MODEL")
                    .unwrap_or_else(|_| "omni-moderation-latest".to_string()),
                embedding_model: env::var("EMBEDDING_MODEL")
                    .unwrap_or_else(|_| "text-embedding-3-small".to_string()),
                rubrics_path: env::var("RUBRICS_PATH")
                    .unwrap_or_else(|_| "rubrics.json".to_string()),
                rubrics_vector_store_id: env::var("RUBRICS_VECTOR_STORE_ID").ok(),
                moderation_audit_path: env::var("MODERATION_AUDIT_PATH")
                    .unwrap_or_else(|_| "moderation_result.json".to_string()),
            },
        };

        Ok(config)
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
