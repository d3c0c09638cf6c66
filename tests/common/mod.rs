use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Request, Response};
use axum::Router;
use serde_json::json;

use evaluator_api::ai::OpenAiClient;
use evaluator_api::config::{Config, EvaluationConfig, OpenAiConfig, ServerConfig};
use evaluator_api::models::{Criterion, CriterionLevel};
use evaluator_api::routes::create_router;
use evaluator_api::rubrics::RubricStore;
use evaluator_api::state::AppState;

pub const EVALUATOR_MODEL: &str = "gpt-4o";
pub const RELEVANCE_MODEL: &str = "gpt-4o-mini";

static AUDIT_SEQ: AtomicUsize = AtomicUsize::new(0);

pub fn level(name: &str, value: i64) -> CriterionLevel {
    CriterionLevel {
        name: name.to_string(),
        value,
        description: format!("{} level", name),
        quote: String::new(),
    }
}

pub fn criterion(name: &str, levels: Vec<CriterionLevel>) -> Criterion {
    Criterion {
        criterion: name.to_string(),
        levels,
    }
}

/// Two criteria, max value 3 each: max score 6.
pub fn default_rubric() -> Vec<Criterion> {
    vec![
        criterion(
            "Understanding of Concepts",
            vec![level("Excellent", 3), level("Good", 2), level("Needs Improvement", 1)],
        ),
        criterion(
            "Clarity of Communication",
            vec![level("Excellent", 3), level("Good", 2), level("Needs Improvement", 1)],
        ),
    ]
}

fn fresh_audit_path() -> String {
    let seq = AUDIT_SEQ.fetch_add(1, Ordering::SeqCst);
    std::env::temp_dir()
        .join(format!(
            "evaluator-api-audit-{}-{}.json",
            std::process::id(),
            seq
        ))
        .to_string_lossy()
        .into_owned()
}

pub fn test_config(base_url: &str, audit_path: &str) -> Config {
    Config {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
        },
        openai: OpenAiConfig {
            api_key: "sk-test".to_string(),
            base_url: base_url.to_string(),
            request_timeout_seconds: 5,
        },
        evaluation: EvaluationConfig {
            evaluator_model: EVALUATOR_MODEL.to_string(),
            relevance_model: RELEVANCE_MODEL.to_string(),
            moderation_model: "omni-moderation-latest".to_string(),
            embedding_model: "text-embedding-3-small".to_string(),
            rubrics_path: "rubrics.json".to_string(),
            rubrics_vector_store_id: None,
            moderation_audit_path: audit_path.to_string(),
        },
    }
}

/// Router wired against a mock capability server.
pub fn test_router(base_url: &str) -> Router {
    test_router_with_audit(base_url).0
}

/// Same, also returning the moderation audit path for assertions.
pub fn test_router_with_audit(base_url: &str) -> (Router, String) {
    let audit_path = fresh_audit_path();
    let config = test_config(base_url, &audit_path);
    let openai = OpenAiClient::new(
        config.openai.api_key.clone(),
        config.openai.base_url.clone(),
        Duration::from_secs(config.openai.request_timeout_seconds),
    )
    .unwrap();
    let rubrics = RubricStore::new(default_rubric());
    let state = AppState::new(config, openai, rubrics);
    (create_router(state), audit_path)
}

pub fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn get_request(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

pub async fn body_text(response: Response<Body>) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    serde_json::from_str(&body_text(response).await).unwrap()
}

/// Extract the `data:` payloads from an SSE body, ignoring comments and
/// blank lines.
pub fn data_lines(body: &str) -> Vec<String> {
    body.lines()
        .filter_map(|line| line.strip_prefix("data: ").map(|s| s.to_string()))
        .collect()
}

/// A one-shot chat completion body whose assistant content is `content`.
pub fn chat_completion_body(content: &str) -> serde_json::Value {
    json!({
        "choices": [{
            "message": { "content": content },
            "finish_reason": "stop"
        }]
    })
}

pub fn relevance_verdict_body(is_relevant: bool, reasoning: &str) -> serde_json::Value {
    let content = json!({
        "reasoning": reasoning,
        "is_relevant": is_relevant,
    })
    .to_string();
    chat_completion_body(&content)
}

pub fn moderation_pass_body() -> serde_json::Value {
    json!({
        "results": [{
            "flagged": false,
            "categories": {},
            "category_scores": {}
        }]
    })
}

pub fn moderation_flagged_body() -> serde_json::Value {
    json!({
        "results": [{
            "flagged": true,
            "categories": { "harassment": true, "hate": false },
            "category_scores": { "harassment": 0.91, "hate": 0.02 }
        }]
    })
}
