//! serve command: HTTP endpoint for link previews
//!
//! `GET /api/preview?url=<encoded>` returns `{title, description, image, url}`
//! or `{error}` with a 4xx/5xx status.

use crate::config::PreviewConfig;
use crate::error::PreviewError;
use crate::preview::{PreviewClient, PreviewResult};
use anyhow::{Context, Result};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use clap::Args;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;

#[derive(Args)]
pub struct ServeArgs {
    /// Address to listen on
    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,

    /// Port to listen on
    #[arg(long, short, default_value = "3001")]
    pub port: u16,
}

#[derive(Clone)]
pub struct PreviewState {
    client: Arc<PreviewClient>,
}

impl PreviewState {
    pub fn new(client: PreviewClient) -> Self {
        Self {
            client: Arc::new(client),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct PreviewQuery {
    url: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

/// Maps preview failures onto the endpoint's status codes
pub struct PreviewFailure(StatusCode, &'static str);

impl IntoResponse for PreviewFailure {
    fn into_response(self) -> Response {
        let body = Json(ErrorBody {
            error: self.1.to_string(),
        });
        (self.0, body).into_response()
    }
}

impl From<PreviewError> for PreviewFailure {
    fn from(e: PreviewError) -> Self {
        match e {
            PreviewError::InvalidUrl(_) => PreviewFailure(StatusCode::BAD_REQUEST, "Invalid URL"),
            PreviewError::FetchFailed(_) | PreviewError::PreviewUnavailable(_) => PreviewFailure(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to fetch preview data",
            ),
        }
    }
}

pub fn router(state: PreviewState) -> Router {
    Router::new()
        .route("/api/preview", get(preview))
        .method_not_allowed_fallback(method_not_allowed)
        .with_state(state)
}

async fn method_not_allowed() -> PreviewFailure {
    PreviewFailure(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed")
}

async fn preview(
    State(state): State<PreviewState>,
    Query(query): Query<PreviewQuery>,
) -> Result<Json<PreviewResult>, PreviewFailure> {
    let url = match query.url.as_deref() {
        Some(url) if !url.is_empty() => url,
        _ => return Err(PreviewFailure(StatusCode::BAD_REQUEST, "URL is required")),
    };

    match state.client.extract_preview(url).await {
        Ok(preview) => Ok(Json(preview)),
        Err(e) => {
            tracing::warn!(url, error = %e, "error fetching preview");
            Err(e.into())
        }
    }
}

/// Run the serve command
pub async fn run_serve(args: ServeArgs, config: &PreviewConfig) -> Result<()> {
    let state = PreviewState::new(PreviewClient::new(config)?);
    let app = router(state);

    let addr: SocketAddr = format!("{}:{}", args.host, args.port)
        .parse()
        .with_context(|| format!("Invalid listen address: {}:{}", args.host, args.port))?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    tracing::info!("Preview endpoint listening on {}", addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Preview server failed")?;

    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        tracing::info!("Shutting down");
    }
}
