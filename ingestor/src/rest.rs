use crate::db::Store;
use crate::errors::Error;
use crate::metrics;
use crate::model::{MessageResponse, Reading};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use tracing::error;

#[derive(Debug, Clone)]
struct AppState {
    store: Store,
}

pub fn create_router(store: Store) -> Router {
    let state = AppState { store };

    Router::new()
        .route("/api/latest", get(get_latest))
        .route("/api/history/:count", get(get_history))
        .route("/metrics", get(metrics_handler))
        .with_state(state)
}

async fn get_latest(State(state): State<AppState>) -> Result<Json<Reading>, AppError> {
    let reading = state.store.latest().await?;
    Ok(Json(reading))
}

async fn get_history(
    State(state): State<AppState>,
    Path(count): Path<i64>,
) -> Result<Json<Vec<Reading>>, AppError> {
    let readings = state.store.history(count).await?;
    Ok(Json(readings))
}

async fn metrics_handler() -> String {
    metrics::gather_metrics()
}

struct AppError(Error);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self.0 {
            Error::NotFound => (
                StatusCode::NOT_FOUND,
                Json(MessageResponse {
                    message: "No data available".to_string(),
                }),
            )
                .into_response(),
            e => {
                error!("API error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(MessageResponse {
                        message: format!("Internal server error: {}", e),
                    }),
                )
                    .into_response()
            }
        }
    }
}

impl From<Error> for AppError {
    fn from(err: Error) -> Self {
        Self(err)
    }
}
