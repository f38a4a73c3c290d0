use crate::interface_adapters::http::ErrorResponse;
use crate::interface_adapters::state::AppState;
use crate::use_cases::WorldError;

use axum::{
    extract::{Json, State},
    http::StatusCode,
    response::IntoResponse,
};
use std::sync::Arc;
use tracing::error;

#[derive(Debug, serde::Deserialize)]
pub struct WorldCreateRequest {
    // Name of a registered world template.
    template: String,
}

#[derive(Debug, serde::Serialize)]
struct WorldCreateResponse {
    world_id: String,
    world_type: String,
    // Room names, in template order.
    rooms: Vec<String>,
}

pub async fn create_world_handler(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<WorldCreateRequest>,
) -> impl IntoResponse {
    let template = payload.template.trim();
    if template.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::new("template is required")),
        )
            .into_response();
    }

    match state.worlds.instantiate(template).await {
        Ok(world) => (
            StatusCode::CREATED,
            Json(WorldCreateResponse {
                world_id: world.world_id.to_string(),
                world_type: world.world_type.to_string(),
                rooms: world.room_names(),
            }),
        )
            .into_response(),
        Err(WorldError::UnknownTemplate) => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse::new("template not found")),
        )
            .into_response(),
        Err(err) => {
            error!(template, error = ?err, "failed to instantiate world");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::new("failed to create world")),
            )
                .into_response()
        }
    }
}
