use super::state::AppState;
use crate::error::UploadError;
use crate::session::{RecordingState, SessionReport};
use crate::upload::Attachment;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct StartRecordingResponse {
    pub room_id: String,
    pub status: RecordingState,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StopRecordingResponse {
    pub room_id: String,
    pub status: RecordingState,
    /// `None` when nothing was recording
    pub report: Option<SessionReport>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub room_id: String,
    pub room_name: Option<String>,
    pub state: RecordingState,
    pub uploading: bool,
    pub uploads_in_flight: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AttachmentRequest {
    /// Local path of the file to upload
    pub path: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AttachmentResponse {
    pub room_id: String,
    pub file_name: String,
    pub status: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn error_response(status: StatusCode, error: impl ToString) -> axum::response::Response {
    (
        status,
        Json(ErrorResponse {
            error: error.to_string(),
        }),
    )
        .into_response()
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /record/start
/// Start recording for the room
pub async fn start_recording(State(state): State<AppState>) -> impl IntoResponse {
    let mut controller = state.controller.lock().await;
    let room_id = controller.room_id().to_string();

    info!("Start requested for room: {}", room_id);

    match controller.start().await {
        Ok(()) => (
            StatusCode::OK,
            Json(StartRecordingResponse {
                room_id,
                status: controller.state(),
            }),
        )
            .into_response(),
        Err(e) => {
            error!("Failed to start recording: {}", e);
            error_response(StatusCode::BAD_REQUEST, e)
        }
    }
}

/// POST /record/stop
/// Stop recording; always succeeds
pub async fn stop_recording(State(state): State<AppState>) -> impl IntoResponse {
    let mut controller = state.controller.lock().await;
    let report = controller.stop().await;

    (
        StatusCode::OK,
        Json(StopRecordingResponse {
            room_id: controller.room_id().to_string(),
            status: controller.state(),
            report,
        }),
    )
}

/// GET /record/status
pub async fn get_status(State(state): State<AppState>) -> impl IntoResponse {
    let controller = state.controller.lock().await;

    Json(StatusResponse {
        room_id: controller.room_id().to_string(),
        room_name: state.room_name.clone(),
        state: controller.state(),
        uploading: controller.dispatcher().is_uploading(),
        uploads_in_flight: controller.dispatcher().in_flight(),
    })
}

/// POST /attachments
/// Read a local file and upload it in the background
pub async fn upload_attachment(
    State(state): State<AppState>,
    Json(req): Json<AttachmentRequest>,
) -> impl IntoResponse {
    let attachment = match Attachment::from_path(&req.path).await {
        Ok(a) => a,
        Err(e) => {
            error!("Failed to load attachment {}: {}", req.path, e);
            return error_response(StatusCode::BAD_REQUEST, e);
        }
    };
    let file_name = attachment.file_name.clone();

    let controller = state.controller.lock().await;

    match controller.send_attachment(attachment) {
        Ok(_) => (
            StatusCode::ACCEPTED,
            Json(AttachmentResponse {
                room_id: controller.room_id().to_string(),
                file_name,
                status: "uploading".to_string(),
            }),
        )
            .into_response(),
        Err(e @ UploadError::AttachmentInProgress) => error_response(StatusCode::CONFLICT, e),
        Err(e) => error_response(StatusCode::BAD_REQUEST, e),
    }
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
