//! Error handlers
//!
//! Maps file manager errors onto HTTP status codes and response bodies.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use log::{debug, error, warn};

use crate::error::types::FileManagerError;
use crate::protocol::ErrorResponse;

/// Log an error at a level matching who is at fault
pub fn handle_error(err: &FileManagerError) {
    match err {
        FileManagerError::StorageFailure { .. } => error!("Storage failure: {}", err),
        FileManagerError::UploadTooLarge { .. } | FileManagerError::MalformedRequest(_) => {
            warn!("Rejected request: {}", err)
        }
        _ => debug!("Rejected request: {}", err),
    }
}

/// Convert error to HTTP status code
pub fn status_code(err: &FileManagerError) -> StatusCode {
    match err {
        FileManagerError::InvalidPath(_) => StatusCode::BAD_REQUEST,
        FileManagerError::NotFound(_) => StatusCode::NOT_FOUND,
        FileManagerError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
        FileManagerError::MalformedRequest(_) => StatusCode::BAD_REQUEST,
        FileManagerError::UploadTooLarge { .. } => StatusCode::BAD_REQUEST,
        FileManagerError::StorageFailure { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Plain-text rendering used by the download endpoint
pub fn plain_response(err: FileManagerError) -> Response {
    handle_error(&err);
    (status_code(&err), err.client_message()).into_response()
}

/// JSON rendering used by every `/api` endpoint
impl IntoResponse for FileManagerError {
    fn into_response(self) -> Response {
        handle_error(&self);
        let body = ErrorResponse::new(self.client_message());
        (status_code(&self), Json(body)).into_response()
    }
}
