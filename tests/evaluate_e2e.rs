mod common;

use axum::http::StatusCode;
use serde_json::json;
use tower::ServiceExt;
use wiremock::matchers::{any, body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::*;

fn scoring_output(rubrics: serde_json::Value, is_correct: bool) -> String {
    json!({
        "feedback": "Clear explanation with a concrete example. Consider also covering variable capture semantics to round out the answer.",
        "is_correct": is_correct,
        "rubrics": rubrics,
    })
    .to_string()
}

#[tokio::test]
async fn missing_answer_returns_400_without_any_capability_call() {
    let server = MockServer::start().await;

    // Cost-avoidance contract: no capability may be called on invalid input
    Mock::given(any())
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let app = test_router(&server.uri());
    let response = app
        .oneshot(json_request(
            "POST",
            "/evaluate",
            json!({ "question": "What is a closure?", "answer": "" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body, json!({ "error": "Both question and answer are required" }));
}

#[tokio::test]
async fn missing_question_field_returns_400() {
    let server = MockServer::start().await;
    let app = test_router(&server.uri());

    let response = app
        .oneshot(json_request(
            "POST",
            "/evaluate",
            json!({ "answer": "An answer with no question" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"], "Both question and answer are required");
}

#[tokio::test]
async fn flagged_answer_returns_content_policy_violation() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/moderations"))
        .respond_with(ResponseTemplate::new(200).set_body_json(moderation_flagged_body()))
        .expect(1)
        .mount(&server)
        .await;

    // Moderation short-circuits: neither relevance nor scoring may run
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let (app, audit_path) = test_router_with_audit(&server.uri());
    let response = app
        .oneshot(json_request(
            "POST",
            "/evaluate",
            json!({ "question": "What is recursion?", "answer": "some toxic text" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"], "Content policy violation");
    let message = body["message"].as_str().unwrap();
    assert!(message.contains("harassment"));
    assert!(message.contains("Please revise your answer."));

    // The raw moderation response was persisted for audit
    let audit = std::fs::read_to_string(&audit_path).unwrap();
    assert!(audit.contains("harassment"));
    std::fs::remove_file(&audit_path).ok();
}

#[tokio::test]
async fn off_topic_answer_returns_off_topic_rejection() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/moderations"))
        .respond_with(ResponseTemplate::new(200).set_body_json(moderation_pass_body()))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_partial_json(json!({ "model": RELEVANCE_MODEL })))
        .respond_with(ResponseTemplate::new(200).set_body_json(relevance_verdict_body(
            false,
            "The question is about recursion but the answer discusses cooking.",
        )))
        .expect(1)
        .mount(&server)
        .await;

    // Relevance rejection short-circuits before the scoring call
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_partial_json(json!({ "model": EVALUATOR_MODEL })))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let app = test_router(&server.uri());
    let response = app
        .oneshot(json_request(
            "POST",
            "/evaluate",
            json!({
                "question": "Explain recursion.",
                "answer": "My favourite lasagna recipe starts with fresh pasta."
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"], "Off-topic response");
    assert!(body["message"]
        .as_str()
        .unwrap()
        .contains("unrelated to the question"));
}

#[tokio::test]
async fn valid_answer_returns_rating_against_supplied_rubrics() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/moderations"))
        .respond_with(ResponseTemplate::new(200).set_body_json(moderation_pass_body()))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_partial_json(json!({ "model": RELEVANCE_MODEL })))
        .respond_with(ResponseTemplate::new(200).set_body_json(relevance_verdict_body(
            true,
            "The answer addresses the question topic.",
        )))
        .mount(&server)
        .await;

    // Achieved levels: Good (4) on correctness, Excellent (5) on clarity
    let achieved = json!([
        {
            "criterion": "Correctness",
            "levels": [{ "name": "Good", "value": 4, "description": "Mostly right", "quote": "a closure captures its environment" }]
        },
        {
            "criterion": "Clarity",
            "levels": [{ "name": "Excellent", "value": 5, "description": "Very clear", "quote": "for example" }]
        }
    ]);
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_partial_json(json!({ "model": EVALUATOR_MODEL })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(chat_completion_body(&scoring_output(achieved, true))),
        )
        .expect(1)
        .mount(&server)
        .await;

    // Caller rubric: max values 10 and 5, with the maximum not listed first
    let rubrics = json!([
        {
            "criterion": "Correctness",
            "levels": [
                { "name": "Good", "value": 4, "description": "Mostly right" },
                { "name": "Excellent", "value": 10, "description": "Fully right" }
            ]
        },
        {
            "criterion": "Clarity",
            "levels": [
                { "name": "Excellent", "value": 5, "description": "Very clear" },
                { "name": "Poor", "value": 2, "description": "Hard to follow" }
            ]
        }
    ]);

    let app = test_router(&server.uri());
    let response = app
        .oneshot(json_request(
            "POST",
            "/evaluate",
            json!({
                "question": "What is a closure?",
                "answer": "A closure captures its environment, for example a counter function.",
                "rubrics": rubrics,
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["max_score"], 15);
    assert_eq!(body["rating"], 9);
    assert_eq!(body["is_correct"], true);
    assert_eq!(body["rubrics"].as_array().unwrap().len(), 2);
    assert!(body["rating"].as_i64().unwrap() <= body["max_score"].as_i64().unwrap());
}

#[tokio::test]
async fn omitted_rubrics_fall_back_to_default_for_max_score() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/moderations"))
        .respond_with(ResponseTemplate::new(200).set_body_json(moderation_pass_body()))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_partial_json(json!({ "model": RELEVANCE_MODEL })))
        .respond_with(ResponseTemplate::new(200).set_body_json(relevance_verdict_body(true, "On topic.")))
        .mount(&server)
        .await;

    let achieved = json!([
        {
            "criterion": "Understanding of Concepts",
            "levels": [{ "name": "Excellent", "value": 3, "description": "d", "quote": "q" }]
        },
        {
            "criterion": "Clarity of Communication",
            "levels": [{ "name": "Good", "value": 2, "description": "d", "quote": "q" }]
        }
    ]);
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_partial_json(json!({ "model": EVALUATOR_MODEL })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(chat_completion_body(&scoring_output(achieved, true))),
        )
        .mount(&server)
        .await;

    let app = test_router(&server.uri());
    let response = app
        .oneshot(json_request(
            "POST",
            "/evaluate",
            json!({
                "question": "What is recursion?",
                "answer": "A function that calls itself until a base case is reached."
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    // Default rubric in the test state: two criteria with max value 3 each
    assert_eq!(body["max_score"], 6);
    assert_eq!(body["rating"], 5);
}

#[tokio::test]
async fn malformed_scoring_output_returns_502() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/moderations"))
        .respond_with(ResponseTemplate::new(200).set_body_json(moderation_pass_body()))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_partial_json(json!({ "model": RELEVANCE_MODEL })))
        .respond_with(ResponseTemplate::new(200).set_body_json(relevance_verdict_body(true, "On topic.")))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_partial_json(json!({ "model": EVALUATOR_MODEL })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(chat_completion_body("I scored the answer 7/10, well done!")),
        )
        .mount(&server)
        .await;

    let app = test_router(&server.uri());
    let response = app
        .oneshot(json_request(
            "POST",
            "/evaluate",
            json!({ "question": "What is a closure?", "answer": "A function with captured state." }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let body = body_json(response).await;
    assert_eq!(body["error"], "Evaluation service unavailable");
}

#[tokio::test]
async fn unreachable_moderation_capability_returns_502() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/moderations"))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream exploded"))
        .mount(&server)
        .await;

    let app = test_router(&server.uri());
    let response = app
        .oneshot(json_request(
            "POST",
            "/evaluate",
            json!({ "question": "What is a closure?", "answer": "A function with captured state." }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
}
