use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::Serialize;
use std::sync::Arc;

use dropconvert_core::{Config, FormatDescriptor, StatusSnapshot};

use super::ErrorResponse;
use crate::metrics::{collect_dynamic_metrics, encode_metrics};
use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub engine: String,
    pub converter: String,
}

pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let orchestrator = state.orchestrator();
    Json(HealthResponse {
        status: "ok".to_string(),
        engine: orchestrator.engine_name().to_string(),
        converter: orchestrator.snapshot().status.to_string(),
    })
}

pub async fn get_config(State(state): State<Arc<AppState>>) -> Json<Config> {
    Json(state.config().clone())
}

pub async fn get_metrics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    collect_dynamic_metrics(&state);
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        encode_metrics(),
    )
}

pub async fn get_status(State(state): State<Arc<AppState>>) -> Json<StatusSnapshot> {
    Json(state.orchestrator().snapshot())
}

#[derive(Serialize)]
pub struct FormatsResponse {
    pub formats: Vec<FormatDescriptor>,
    pub demuxer_count: usize,
    pub muxer_count: usize,
}

pub async fn get_formats(
    State(state): State<Arc<AppState>>,
) -> Result<Json<FormatsResponse>, (StatusCode, Json<ErrorResponse>)> {
    let Some(catalog) = state.orchestrator().formats() else {
        return Err((
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ErrorResponse {
                error: "The engine is still loading".to_string(),
            }),
        ));
    };

    Ok(Json(FormatsResponse {
        formats: catalog.formats().to_vec(),
        demuxer_count: catalog.demuxers().count(),
        muxer_count: catalog.muxers().count(),
    }))
}
