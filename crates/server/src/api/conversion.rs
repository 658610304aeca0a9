//! Drop and download endpoints.

use axum::{
    extract::{Multipart, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};

use dropconvert_core::{
    orchestrator::ConversionJob, ConversionOutcome, DropRejection, DroppedFile,
};

use super::ErrorResponse;
use crate::state::AppState;

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, error: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: error.into(),
        }),
    )
}

/// Response for an accepted drop. The conversion continues in the background.
#[derive(Debug, Serialize)]
pub struct DropAccepted {
    pub job: ConversionJob,
}

/// HTTP status for a refused drop.
pub fn rejection_status(rejection: &DropRejection) -> StatusCode {
    match rejection {
        DropRejection::Busy => StatusCode::CONFLICT,
        DropRejection::EngineLoading => StatusCode::SERVICE_UNAVAILABLE,
        DropRejection::NoFile
        | DropRejection::TooManyFiles { .. }
        | DropRejection::MissingExtension { .. }
        | DropRejection::UnsupportedInput { .. }
        | DropRejection::UnsupportedOutput { .. } => StatusCode::BAD_REQUEST,
    }
}

/// Accept a dropped file.
///
/// Multipart fields: one or more `file` parts and an optional `format` with
/// the output format abbreviation.
pub async fn post_drop(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<DropAccepted>), ApiError> {
    let mut files = Vec::new();
    let mut format: Option<String> = None;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => return Err(api_error(e.status(), e.body_text())),
        };

        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "file" => {
                let file_name = field.file_name().unwrap_or("").to_string();
                let bytes = field.bytes().await.map_err(|e| {
                    api_error(e.status(), format!("Failed to read file: {}", e.body_text()))
                })?;
                debug!("Received '{}' ({} bytes)", file_name, bytes.len());
                files.push(DroppedFile::new(file_name, bytes.to_vec()));
            }
            "format" => {
                if let Ok(text) = field.text().await {
                    if !text.trim().is_empty() {
                        format = Some(text.trim().to_string());
                    }
                }
            }
            _ => {}
        }
    }

    let orchestrator = state.orchestrator();
    let accepted = orchestrator
        .accept_drop(files, format.as_deref())
        .await
        .map_err(|rejection| api_error(rejection_status(&rejection), rejection.to_string()))?;

    let job = accepted.job().clone();
    let runner = orchestrator.clone();
    tokio::spawn(async move {
        let job_id = accepted.job().id.clone();
        match runner.run(accepted).await {
            ConversionOutcome::Done(output) => {
                info!("Job {} ready for download as {}", job_id, output.file_name)
            }
            ConversionOutcome::Failed(error) => debug!("Job {} ended with: {}", job_id, error),
        }
    });

    Ok((StatusCode::ACCEPTED, Json(DropAccepted { job })))
}

/// Download the output of the last finished conversion.
pub async fn get_output(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let output = state
        .orchestrator()
        .output()
        .await
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, "No converted file is available"))?;

    let disposition = format!("attachment; filename=\"{}\"", output.file_name);
    Ok((
        [
            (header::CONTENT_TYPE, output.mime_type.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        output.bytes.to_vec(),
    ))
}
