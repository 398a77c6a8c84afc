//! HTTP route handlers.

use std::future::Future;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;
use tracing::{error, warn};

use crate::browser::Browser;
use crate::domain::{Catalog, LineId, LineRecord, LineType, StationDeparture};
use crate::scrape::ScrapeError;

use super::dto::*;
use super::state::AppState;

/// Create the application router.
pub fn create_router<B: Browser>(state: AppState<B>) -> Router {
    Router::new()
        .route("/health", get(health::<B>))
        .route("/url/:line", get(line_url::<B>))
        .route("/schedule/:line", get(line_schedule::<B>))
        .route("/line/:line", get(line_detail::<B>))
        .route("/lines", get(all_lines::<B>))
        .route("/lines/:type", get(lines_of_type::<B>))
        .route("/refresh", post(trigger_refresh::<B>))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check with snapshot and refresh state.
async fn health<B: Browser>(State(state): State<AppState<B>>) -> Json<HealthResponse> {
    let snapshot_lines = state.store.snapshot().await.map(|s| s.lines.len());

    Json(HealthResponse {
        status: "ok",
        snapshot_lines,
        refreshing: state.store.is_refreshing(),
        refresh: state.store.status().await,
    })
}

/// Detail-page URL of one line.
async fn line_url<B: Browser>(
    State(state): State<AppState<B>>,
    Path(line): Path<String>,
) -> Result<Json<String>, AppError> {
    let id = parse_line(&line)?;
    let store = state.store.clone();
    let url = detached(async move { store.get_url(&id).await }).await?;
    Ok(Json(url))
}

/// Today's departures for one line.
async fn line_schedule<B: Browser>(
    State(state): State<AppState<B>>,
    Path(line): Path<String>,
) -> Result<Json<Vec<StationDeparture>>, AppError> {
    let id = parse_line(&line)?;
    let store = state.store.clone();
    let schedule = detached(async move { store.get_schedule(&id).await }).await?;
    Ok(Json(schedule))
}

/// One line's record with its schedule.
async fn line_detail<B: Browser>(
    State(state): State<AppState<B>>,
    Path(line): Path<String>,
) -> Result<Json<LineRecord>, AppError> {
    let id = parse_line(&line)?;
    let store = state.store.clone();
    let record = detached(async move { store.get_line(&id).await }).await?;
    Ok(Json(record))
}

/// Every known line.
async fn all_lines<B: Browser>(
    State(state): State<AppState<B>>,
) -> Result<Json<Catalog>, AppError> {
    let store = state.store.clone();
    let catalog = detached(async move { store.get_catalog().await }).await?;
    Ok(Json(catalog))
}

/// Every line of one type.
async fn lines_of_type<B: Browser>(
    State(state): State<AppState<B>>,
    Path(line_type): Path<String>,
) -> Result<Json<Catalog>, AppError> {
    let line_type: LineType = line_type.parse().map_err(ScrapeError::from)?;
    let store = state.store.clone();
    let catalog = detached(async move { store.get_catalog_by_type(line_type).await }).await?;
    Ok(Json(catalog))
}

/// Start a refresh in the background.
async fn trigger_refresh<B: Browser>(State(state): State<AppState<B>>) -> impl IntoResponse {
    let queued = state.store.is_refreshing();
    let store = state.store.clone();

    tokio::spawn(async move {
        // Outcome is logged and recorded in the store's status
        let _ = store.refresh().await;
    });

    (
        StatusCode::ACCEPTED,
        Json(RefreshAccepted {
            status: "accepted",
            queued,
        }),
    )
}

fn parse_line(raw: &str) -> Result<LineId, AppError> {
    Ok(LineId::parse_normalized(raw).map_err(ScrapeError::from)?)
}

/// Run `lookup` on its own task so a dropped request doesn't abandon
/// browser work halfway.
async fn detached<T, F>(lookup: F) -> Result<T, AppError>
where
    F: Future<Output = Result<T, ScrapeError>> + Send + 'static,
    T: Send + 'static,
{
    tokio::spawn(lookup)
        .await
        .map_err(|e| AppError::Internal {
            message: format!("Lookup task failed: {e}"),
        })?
        .map_err(AppError::from)
}

/// Application error type.
#[derive(Debug)]
pub enum AppError {
    BadRequest { message: String },
    NotFound { message: String },
    Internal { message: String },
}

impl From<ScrapeError> for AppError {
    fn from(e: ScrapeError) -> Self {
        match e {
            ScrapeError::InvalidInput { message } => AppError::BadRequest { message },
            ScrapeError::NotFound { message } => AppError::NotFound { message },
            ScrapeError::Upstream { message } => AppError::Internal { message },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            AppError::BadRequest { message } => (StatusCode::BAD_REQUEST, message),
            AppError::NotFound { message } => (StatusCode::NOT_FOUND, message),
            AppError::Internal { message } => (StatusCode::INTERNAL_SERVER_ERROR, message),
        };

        if status.is_server_error() {
            error!(%status, %message, "Request failed");
        } else {
            warn!(%status, %message, "Request rejected");
        }

        (status, Json(ErrorResponse { error: message })).into_response()
    }
}
