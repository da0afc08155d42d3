mod config;
mod metrics;

use anyhow::Context;
use axum::{
    Json, Router,
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use config::{AppConfig, LlmConfig, LogFormat};
use metrics::{Metrics, MetricsSnapshot, Operation, TimedOperation};
use preprocess::{GeminiClient, PreprocessError, QueryPreprocessor, StructuredResult, TravelInfo};

struct AppState {
    preprocessor: QueryPreprocessor<GeminiClient>,
    metrics: Arc<Metrics>,
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    model: String,
    credential_configured: bool,
}

#[derive(Deserialize)]
struct PreprocessRequest {
    query: String,
    /// Prior conversation, if the caller has one
    context: Option<serde_json::Value>,
    /// Fail with a typed error instead of answering with a degraded record
    #[serde(default)]
    strict: bool,
}

#[derive(Deserialize)]
struct TravelInfoRequest {
    query: String,
}

#[derive(Deserialize)]
struct OptimizeRequest {
    query: String,
    tool_name: String,
}

#[derive(Serialize)]
struct OptimizeResponse {
    query: String,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    kind: String,
}

struct ApiError(PreprocessError);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.0 {
            PreprocessError::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
            PreprocessError::Extraction { .. } | PreprocessError::Transport(_) => {
                StatusCode::BAD_GATEWAY
            }
        };

        let body = ErrorResponse {
            error: self.0.to_string(),
            kind: self.0.kind().to_string(),
        };

        (status, Json(body)).into_response()
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_env();
    init_tracing(config.logging.format);

    for warning in &config.warnings {
        tracing::warn!("{}", warning);
    }

    let state = Arc::new(AppState {
        preprocessor: build_preprocessor(GeminiClient::from_env(), &config.llm),
        metrics: Metrics::new(),
    });

    let app = app(state);

    let listener = tokio::net::TcpListener::bind(&config.server.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.server.bind_addr))?;

    tracing::info!(
        addr = %config.server.bind_addr,
        model = %config.llm.model,
        "Server listening"
    );

    axum::serve(listener, app)
        .await
        .context("Server error")?;

    Ok(())
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    match format {
        LogFormat::Json => tracing_subscriber::fmt().with_env_filter(filter).json().init(),
        LogFormat::Pretty => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }
}

fn build_preprocessor(client: GeminiClient, llm: &LlmConfig) -> QueryPreprocessor<GeminiClient> {
    let client = client
        .with_base_url(llm.base_url.clone())
        .with_model(llm.model.clone())
        .with_request_timeout(Duration::from_secs(llm.request_timeout_secs));

    let preprocessor = QueryPreprocessor::new(client);
    match llm.reference_date {
        Some(date) => preprocessor.with_reference_date(date),
        None => preprocessor,
    }
}

fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/preprocess", post(preprocess_query))
        .route("/travel-info", post(travel_info))
        .route("/optimize", post(optimize_query))
        .route("/stats", get(get_stats))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                tracing::info_span!(
                    "request",
                    request_id = %Uuid::new_v4(),
                    method = %request.method(),
                    uri = %request.uri(),
                )
            }),
        )
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let client = state.preprocessor.client();

    Json(HealthResponse {
        status: "ok".to_string(),
        model: client.model().to_string(),
        credential_configured: client.has_credential(),
    })
}

/// Run one preprocessing call for `operation`, counting it and any failure.
async fn structure(
    state: &AppState,
    operation: Operation,
    query: &str,
    context: Option<&serde_json::Value>,
) -> Result<StructuredResult, PreprocessError> {
    let timer = TimedOperation::start();

    let outcome = state.preprocessor.try_preprocess(query, context).await;

    if let Err(e) = &outcome {
        state.metrics.record_error(e);
        tracing::error!(kind = e.kind(), error = ?e, "Preprocessing failed");
    }
    state.metrics.record_request(operation, outcome.is_err(), timer.elapsed());

    outcome
}

async fn preprocess_query(
    State(state): State<Arc<AppState>>,
    Json(req): Json<PreprocessRequest>,
) -> Result<Json<StructuredResult>, ApiError> {
    match structure(&state, Operation::Preprocess, &req.query, req.context.as_ref()).await {
        Ok(result) => Ok(Json(result)),
        Err(e) if req.strict => Err(ApiError(e)),
        Err(e) => Ok(Json(state.preprocessor.degrade(&req.query, &e))),
    }
}

async fn travel_info(
    State(state): State<Arc<AppState>>,
    Json(req): Json<TravelInfoRequest>,
) -> Json<TravelInfo> {
    let structured = structure(&state, Operation::TravelInfo, &req.query, None)
        .await
        .unwrap_or_else(|e| state.preprocessor.degrade(&req.query, &e));

    Json(TravelInfo::from(&structured))
}

async fn optimize_query(
    State(state): State<Arc<AppState>>,
    Json(req): Json<OptimizeRequest>,
) -> Json<OptimizeResponse> {
    tracing::debug!(tool = %req.tool_name, "Optimizing query");

    let structured = structure(&state, Operation::Optimize, &req.query, None)
        .await
        .unwrap_or_else(|e| state.preprocessor.degrade(&req.query, &e));

    Json(OptimizeResponse {
        query: structured.optimized_query().to_string(),
    })
}

async fn get_stats(State(state): State<Arc<AppState>>) -> Json<MetricsSnapshot> {
    Json(state.metrics.snapshot())
}
