//! API error type and [`axum::response::IntoResponse`] implementation.
//!
//! Engine errors are typed, recoverable results; this is where each variant
//! picks up its HTTP status.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use desk_core::Error;
use serde_json::json;
use thiserror::Error as ThisError;

/// An error returned by an API handler.
#[derive(Debug, ThisError)]
pub enum ApiError {
  #[error("unauthorized: {0}")]
  Unauthorized(String),

  #[error(transparent)]
  Engine(#[from] Error),
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, message) = match &self {
      ApiError::Unauthorized(m) => (StatusCode::UNAUTHORIZED, m.clone()),
      ApiError::Engine(e) => {
        let status = match e {
          Error::Validation(_) | Error::InvalidAssignee(_) => {
            StatusCode::BAD_REQUEST
          }
          Error::TicketNotFound(_) | Error::WorkerNotFound(_) => {
            StatusCode::NOT_FOUND
          }
          Error::Forbidden(_) => StatusCode::FORBIDDEN,
          Error::Conflict(_) => StatusCode::CONFLICT,
          Error::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, e.to_string())
      }
    };
    (status, Json(json!({ "error": message }))).into_response()
  }
}
