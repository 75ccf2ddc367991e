use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LabError {
    #[error("Vision runtime is not ready: {0}")]
    RuntimeNotReady(String),

    #[error("Failed to decode image: {0}")]
    DecodeError(String),

    #[error("Error processing image: {0}")]
    ProcessingError(String),

    #[error("Pixel buffer was used after release")]
    BufferReleased,

    #[error("Invalid processing options: {0}")]
    InvalidOptions(String),

    #[error("Image too large: {size} bytes (max: {max} bytes)")]
    ImageTooLarge { size: usize, max: usize },

    #[error("Missing file in request")]
    MissingFile,

    #[error("No image loaded")]
    NoImageLoaded,

    #[error("Explain frame {0} does not exist")]
    FrameNotFound(usize),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

impl LabError {
    pub fn code(&self) -> &'static str {
        match self {
            LabError::RuntimeNotReady(_) => "RUNTIME_NOT_READY",
            LabError::DecodeError(_) => "DECODE_ERROR",
            LabError::ProcessingError(_) => "PROCESSING_ERROR",
            LabError::BufferReleased => "BUFFER_RELEASED",
            LabError::InvalidOptions(_) => "INVALID_OPTIONS",
            LabError::ImageTooLarge { .. } => "IMAGE_TOO_LARGE",
            LabError::MissingFile => "MISSING_FILE",
            LabError::NoImageLoaded => "NO_IMAGE_LOADED",
            LabError::FrameNotFound(_) => "FRAME_NOT_FOUND",
            LabError::InvalidRequest(_) => "INVALID_REQUEST",
            LabError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            LabError::RuntimeNotReady(_) => StatusCode::SERVICE_UNAVAILABLE,
            LabError::DecodeError(_)
            | LabError::InvalidOptions(_)
            | LabError::MissingFile
            | LabError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            LabError::ImageTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            LabError::NoImageLoaded => StatusCode::CONFLICT,
            LabError::FrameNotFound(_) => StatusCode::NOT_FOUND,
            LabError::ProcessingError(_) | LabError::BufferReleased | LabError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for LabError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = Json(ErrorResponse {
            error: self.to_string(),
            code: self.code().to_string(),
        });

        (status, body).into_response()
    }
}
