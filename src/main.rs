use anyhow::Result;
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer,
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use evaluator_api::{ai, config, routes, rubrics, state};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing/logging
    init_tracing();

    tracing::info!("Starting Answer Evaluator API server...");

    // Load configuration
    let config = config::Config::from_env()?;
    tracing::info!(
        "Loaded configuration: server={}:{}",
        config.server.host,
        config.server.port
    );

    // Load the default rubric once; it is immutable for the process lifetime
    let rubric_store = rubrics::RubricStore::load(&config.evaluation.rubrics_path)?;
    tracing::info!(
        "Loaded default rubric with {} criteria from {}",
        rubric_store.criteria().len(),
        config.evaluation.rubrics_path
    );

    // Initialize the capability client
    let openai = ai::OpenAiClient::new(
        config.openai.api_key.clone(),
        config.openai.base_url.clone(),
        Duration::from_secs(config.openai.request_timeout_seconds),
    )?;

    // Create app state
    let state = state::AppState::new(config.clone(), openai, rubric_store);

    // Build router with middleware
    let app = routes::create_router(state).layer(
        ServiceBuilder::new()
            // Logging layer
            .layer(
                TraceLayer::new_for_http()
                    .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                    .on_response(DefaultOnResponse::new().level(Level::INFO)),
            )
            // CORS layer
            .layer(CorsLayer::permissive())
            // Compression layer
            .layer(CompressionLayer::new()),
    );

    // Start server
    let addr = config.server_address();
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Server listening on http://{}", addr);
    tracing::info!("Health check available at http://{}/health", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "evaluator_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
