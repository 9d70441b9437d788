use std::{net::SocketAddr, sync::Arc, time::Duration};

use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, DefaultBodyLimit, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use ingest_api::{handle, initialize_headers, IngestContext};
use shared::{
    error::IngestError,
    protocol::{IngestResponse, StatusResponse},
};
use storage::Storage;
use tower_http::cors::CorsLayer;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

mod app_state;
mod config;

use app_state::AppState;
use config::{load_settings, prepare_database_url};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let settings = load_settings();
    let database_url = prepare_database_url(&settings.database_url)?;
    let storage = Storage::new(&database_url).await.map_err(|error| {
        error!(
            %database_url,
            %error,
            "failed to open sheet database; verify parent directory exists and permissions are correct"
        );
        error
    })?;

    let ingest = IngestContext::new(Arc::new(storage.clone()))
        .with_lock_timeout(Duration::from_millis(settings.lock_timeout_ms))
        .with_lock_policy(settings.lock_policy);
    if settings.init_headers_on_start {
        initialize_headers(&ingest).await?;
    }

    let state = AppState { ingest, storage };
    let app = build_router(Arc::new(state), settings.max_body_bytes);

    let addr: SocketAddr = settings.server_bind.parse()?;
    info!(%addr, lock_policy = ?settings.lock_policy, "form ingest listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn build_router(state: Arc<AppState>, max_body_bytes: usize) -> Router {
    Router::new()
        .route("/", get(status).post(submit))
        .route("/submit", post(submit))
        .route("/healthz", get(healthz))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

async fn status() -> Json<StatusResponse> {
    Json(StatusResponse {
        status: "online".to_string(),
    })
}

async fn healthz(State(state): State<Arc<AppState>>) -> (StatusCode, &'static str) {
    match state.storage.health_check().await {
        Ok(()) => (StatusCode::OK, "ok"),
        Err(error) => {
            warn!(%error, "health check failed");
            (StatusCode::SERVICE_UNAVAILABLE, "unavailable")
        }
    }
}

// Always 200: failures travel in the JSON body.
async fn submit(
    State(state): State<Arc<AppState>>,
    body: Result<Bytes, BytesRejection>,
) -> Json<IngestResponse> {
    let body = match body {
        Ok(body) => body,
        Err(rejection) => {
            warn!(%rejection, "submission body rejected");
            return Json(IngestResponse::Error {
                error: IngestError::parse(rejection.body_text()),
            });
        }
    };
    Json(handle(&state.ingest, &body).await)
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
