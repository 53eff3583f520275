use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use thiserror::Error;

use crate::models::{CaptureId, StageId, VehicleId};

#[derive(Error, Debug)]
pub enum TimingError {
    #[error(
        "vehicle {vehicle_id} already has a result for stage {stage_id}, update the existing result instead"
    )]
    DuplicateCapture {
        vehicle_id: VehicleId,
        stage_id: StageId,
    },

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    #[error("{0}")]
    Validation(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Database(#[from] postgres::Error),

    #[error(transparent)]
    Pool(#[from] r2d2::Error),

    #[error("capture store lock poisoned")]
    StorePoisoned,
}

impl TimingError {
    pub fn not_found(entity: &'static str, id: i64) -> Self {
        TimingError::NotFound { entity, id }
    }

    pub fn capture_not_found(id: CaptureId) -> Self {
        Self::not_found("stage result", id)
    }

    /// Errors caused by the request rather than by the platform.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            TimingError::DuplicateCapture { .. }
                | TimingError::NotFound { .. }
                | TimingError::Validation(_)
        )
    }
}

impl ResponseError for TimingError {
    fn status_code(&self) -> StatusCode {
        match self {
            TimingError::DuplicateCapture { .. } => StatusCode::CONFLICT,
            TimingError::NotFound { .. } => StatusCode::NOT_FOUND,
            TimingError::Validation(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        if !self.is_client_error() {
            tracing::error!(error = %self, "request failed");
        }
        HttpResponse::build(self.status_code())
            .content_type("text/plain")
            .body(self.to_string())
    }
}

pub type Result<T> = std::result::Result<T, TimingError>;
