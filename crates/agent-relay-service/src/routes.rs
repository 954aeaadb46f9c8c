//! HTTP surface for the pub/sub push delivery.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use crate::envelope::SnsEvent;
use crate::handler::{HandlerResponse, RelayService};

/// Build the relay router.
pub fn router(service: Arc<RelayService>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/notify", post(notify))
        .layer(TraceLayer::new_for_http())
        .with_state(service)
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}

async fn notify(
    State(service): State<Arc<RelayService>>,
    Json(event): Json<SnsEvent>,
) -> Response {
    into_http(service.handle_event(event).await)
}

fn into_http(response: HandlerResponse) -> Response {
    let status =
        StatusCode::from_u16(response.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    if status == StatusCode::NO_CONTENT {
        return status.into_response();
    }
    (status, Json(response.body)).into_response()
}
