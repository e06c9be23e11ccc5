use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use route_tracker_lib::{Coordinate, Route, ROUTES_PATH};
use serde::Deserialize;

use crate::{database::db::StoreError, server_state::ServerState};

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, message).into_response(),
            ApiError::Store(err) => {
                tracing::error!("Route store failed: {}", err);
                (StatusCode::INTERNAL_SERVER_ERROR, "Failed to access route store").into_response()
            },
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SaveParams {
    name: Option<String>,
}

pub fn router(state: Arc<ServerState>) -> Router {
    Router::new()
        .route(ROUTES_PATH, get(list_routes).post(save_route))
        .with_state(state)
}

async fn list_routes(State(state): State<Arc<ServerState>>) -> Result<Json<Vec<Route>>, ApiError> {
    let routes = state.database.get_routes().await?;
    tracing::debug!("Listing {} routes", routes.len());
    Ok(Json(routes))
}

async fn save_route(
    State(state): State<Arc<ServerState>>,
    Query(params): Query<SaveParams>,
    Json(coordinates): Json<Vec<Coordinate>>,
) -> Result<(StatusCode, Json<Route>), ApiError> {
    // Names are stored trimmed.
    let name = params.name.as_deref().map(str::trim).unwrap_or_default();
    if name.is_empty() {
        return Err(ApiError::BadRequest("Route name must not be blank".to_string()));
    }

    let route = state.database.insert_route(name, &coordinates).await?;
    tracing::info!("Stored route {:?} with {} points", route.name, route.len());

    Ok((StatusCode::CREATED, Json(route)))
}
