//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use panorama_engine::Error as EngineError;
use serde_json::json;
use thiserror::Error;

/// An error returned by a handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("not found: {0}")]
  NotFound(String),

  /// The request body is not a change notification.
  #[error("unprocessable: {0}")]
  Unprocessable(String),

  #[error(transparent)]
  Engine(#[from] EngineError),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl ApiError {
  fn status(&self) -> StatusCode {
    match self {
      ApiError::NotFound(_) => StatusCode::NOT_FOUND,
      ApiError::Unprocessable(_) => StatusCode::UNPROCESSABLE_ENTITY,
      ApiError::Engine(EngineError::UnknownCollection(_)) => StatusCode::NOT_FOUND,
      ApiError::Engine(EngineError::Core(_)) => StatusCode::UNPROCESSABLE_ENTITY,
      ApiError::Engine(EngineError::Store(_) | EngineError::Join(_))
      | ApiError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = self.status();
    if status.is_server_error() {
      tracing::error!(error = %self, "request failed");
    } else {
      tracing::warn!(error = %self, %status, "request rejected");
    }
    (status, Json(json!({ "error": self.to_string() }))).into_response()
  }
}
