use crate::backend::{Capabilities, NativeBackend};
use crate::config::Config;
use crate::error::LabError;
use crate::explain::FrameSummary;
use crate::processing::ProcessingOptions;
use crate::runtime::{self, Runtime, RuntimeStatus};
use crate::session::{ProcessOutcome, Session};
use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post, put},
    Router,
};
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard};
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

/// Room for multipart boundaries and the options field on top of the file itself
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub runtime: Arc<Runtime>,
    pub config: Arc<Config>,
    pub session: Arc<Mutex<Session>>,
}

impl AppState {
    pub fn new(runtime: Arc<Runtime>, config: Config) -> Self {
        Self {
            runtime,
            config: Arc::new(config),
            session: Arc::new(Mutex::new(Session::default())),
        }
    }

    fn session(&self) -> Result<MutexGuard<'_, Session>, LabError> {
        self.session
            .lock()
            .map_err(|_| LabError::Internal("session lock poisoned".to_string()))
    }

    fn capabilities(&self) -> Result<Capabilities, LabError> {
        self.runtime.ensure_ready()
    }
}

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Server info response
#[derive(Serialize)]
pub struct InfoResponse {
    pub version: String,
    pub backend: String,
    pub backend_description: String,
    pub runtime: RuntimeStatus,
    pub ready: bool,
    pub last_error: Option<String>,
    pub capabilities: Option<Capabilities>,
    pub max_file_size_bytes: usize,
    pub live_buffers: u64,
    pub has_image: bool,
}

/// Explain mode response
#[derive(Serialize)]
pub struct ExplainResponse {
    pub frames: Vec<FrameSummary>,
}

/// Build the HTTP routes around `state`
pub fn router(state: AppState) -> Router {
    let body_limit = state.config.max_file_size + MULTIPART_OVERHEAD;

    Router::new()
        .route("/health", get(handle_health))
        .route("/info", get(handle_info))
        .route("/image", post(handle_upload).delete(handle_clear))
        .route("/image/original", get(handle_original))
        .route("/image/processed", get(handle_processed))
        .route("/options", put(handle_options))
        .route("/explain", post(handle_explain))
        .route("/explain/:index", get(handle_explain_frame))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(body_limit))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Run the HTTP server
pub async fn run(config: Config) -> anyhow::Result<()> {
    let backend = Arc::new(NativeBackend::new(config.disable_clahe));
    let runtime = runtime::init_global(backend, config.poll_interval, config.ready_timeout);
    let addr = format!("{}:{}", config.host, config.port);

    let app = router(AppState::new(runtime, config));

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Load a new image into the session and process it
async fn handle_upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<ProcessOutcome>, LabError> {
    let mut file_data: Option<Bytes> = None;
    let mut options = ProcessingOptions::default();

    // Parse multipart form
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| LabError::InvalidRequest(format!("Failed to parse multipart: {}", e)))?
    {
        let name = field.name().unwrap_or_default().to_string();

        match name.as_str() {
            "file" => {
                file_data = Some(field.bytes().await.map_err(|e| {
                    LabError::InvalidRequest(format!("Failed to read file data: {}", e))
                })?);
            }
            "options" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| LabError::InvalidOptions(e.to_string()))?;
                options = ProcessingOptions::from_json(&text)?;
            }
            _ => {
                // Ignore unknown fields
            }
        }
    }

    let data = file_data.ok_or(LabError::MissingFile)?;
    if data.len() > state.config.max_file_size {
        return Err(LabError::ImageTooLarge {
            size: data.len(),
            max: state.config.max_file_size,
        });
    }

    let capabilities = state.capabilities()?;
    let outcome = state.session()?.load_bytes(&data, options, capabilities)?;

    tracing::info!(
        "Processed upload in {}ms ({} stages), output {}x{}",
        outcome.total_time_ms,
        outcome.steps.len(),
        outcome.width,
        outcome.height
    );

    Ok(Json(outcome))
}

/// Re-run the pipeline on the session image with new options
async fn handle_options(
    State(state): State<AppState>,
    body: String,
) -> Result<Json<ProcessOutcome>, LabError> {
    let options = ProcessingOptions::from_json(&body)?;
    let capabilities = state.capabilities()?;
    let outcome = state.session()?.apply_options(options, capabilities)?;
    Ok(Json(outcome))
}

async fn handle_original(State(state): State<AppState>) -> Result<Response, LabError> {
    state.capabilities()?;
    let png = state.session()?.original()?.encode_png()?;
    Ok(png_response(png))
}

async fn handle_processed(State(state): State<AppState>) -> Result<Response, LabError> {
    state.capabilities()?;
    let png = state.session()?.processed()?.encode_png()?;
    Ok(png_response(png))
}

async fn handle_explain(State(state): State<AppState>) -> Result<Json<ExplainResponse>, LabError> {
    let capabilities = state.capabilities()?;
    let frames = state.session()?.explain(capabilities)?;
    Ok(Json(ExplainResponse { frames }))
}

async fn handle_explain_frame(
    State(state): State<AppState>,
    Path(index): Path<usize>,
) -> Result<Response, LabError> {
    state.capabilities()?;
    let png = state.session()?.explain_frame(index)?.encode_png()?;
    Ok(png_response(png))
}

async fn handle_clear(State(state): State<AppState>) -> Result<StatusCode, LabError> {
    state.session()?.clear();
    Ok(StatusCode::NO_CONTENT)
}

/// Handle health check requests
async fn handle_health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Handle info requests
async fn handle_info(State(state): State<AppState>) -> Result<Json<InfoResponse>, LabError> {
    let session = state.session()?;
    let backend = state.runtime.backend();

    Ok(Json(InfoResponse {
        version: env!("CARGO_PKG_VERSION").to_string(),
        backend: backend.name().to_string(),
        backend_description: backend.description().to_string(),
        runtime: state.runtime.status(),
        ready: state.runtime.ready(),
        last_error: state.runtime.last_error(),
        capabilities: state.runtime.capabilities(),
        max_file_size_bytes: state.config.max_file_size,
        live_buffers: session.ledger().live(),
        has_image: session.has_image(),
    }))
}

fn png_response(png: Vec<u8>) -> Response {
    ([(header::CONTENT_TYPE, "image/png")], png).into_response()
}
