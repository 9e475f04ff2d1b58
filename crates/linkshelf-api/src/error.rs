//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::{HeaderValue, StatusCode, header},
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("not found: {0}")]
  NotFound(String),

  #[error("bad request: {0}")]
  BadRequest(String),

  #[error("unauthorized")]
  Unauthorized,

  #[error("conflict: {0}")]
  Conflict(String),

  #[error("precondition failed")]
  PreconditionFailed,

  #[error("payload too large: {0}")]
  PayloadTooLarge(String),

  #[error("upstream error: {0}")]
  BadGateway(String),

  #[error("service unavailable: {0}")]
  Unavailable(String),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl ApiError {
  pub fn store<E>(e: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Store(Box::new(e))
  }
}

impl From<linkshelf_core::Error> for ApiError {
  fn from(e: linkshelf_core::Error) -> Self {
    use linkshelf_core::Error as E;
    match e {
      E::Validation(v) => Self::BadRequest(v.to_string()),
      e @ E::UserNotFound(_) => Self::NotFound(e.to_string()),
      e @ (E::Conflict(_) | E::UsernameTaken(_) | E::UsernameAlreadySet) => {
        Self::Conflict(e.to_string())
      }
      E::Store(inner) => Self::Store(inner),
    }
  }
}

impl From<linkshelf_media::Error> for ApiError {
  fn from(e: linkshelf_media::Error) -> Self {
    use linkshelf_media::Error as E;
    match e {
      E::InvalidPath(_) | E::Empty | E::Image(_) | E::UnsupportedUrl(_) | E::ForbiddenHost(_) => {
        Self::BadRequest(e.to_string())
      }
      E::NotFound(_) => Self::NotFound(e.to_string()),
      E::TooLarge { .. } => Self::PayloadTooLarge(e.to_string()),
      E::Http(_)
      | E::UpstreamStatus(_)
      | E::NotAnImage(_)
      | E::Unresolvable(_)
      | E::TooManyRedirects => Self::BadGateway(e.to_string()),
      E::Io(_) => Self::store(e),
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, message) = match &self {
      ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m.clone()),
      ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m.clone()),
      ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, self.to_string()),
      ApiError::Conflict(m) => (StatusCode::CONFLICT, m.clone()),
      ApiError::PreconditionFailed => (StatusCode::PRECONDITION_FAILED, self.to_string()),
      ApiError::PayloadTooLarge(m) => (StatusCode::PAYLOAD_TOO_LARGE, m.clone()),
      ApiError::BadGateway(m) => (StatusCode::BAD_GATEWAY, m.clone()),
      ApiError::Unavailable(m) => (StatusCode::SERVICE_UNAVAILABLE, m.clone()),
      ApiError::Store(e) => {
        tracing::error!(error = %e, "store operation failed");
        (StatusCode::INTERNAL_SERVER_ERROR, "internal server error".to_string())
      }
    };

    let mut res = (status, Json(json!({ "error": message }))).into_response();
    if matches!(self, ApiError::Unauthorized) {
      res.headers_mut().insert(
        header::WWW_AUTHENTICATE,
        HeaderValue::from_static("Basic realm=\"linkshelf\""),
      );
    }
    res
  }
}
