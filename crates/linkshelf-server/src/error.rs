//! Page errors, rendered as HTML rather than JSON since these are the routes
//! a visitor's browser lands on.

use axum::{
  http::StatusCode,
  response::{Html, IntoResponse, Response},
};
use maud::html;

use crate::pages::{ERROR_CSS, document};

#[derive(Debug, thiserror::Error)]
pub enum PageError {
  /// No profile is published under this name.
  #[error("not found: {0}")]
  NotFound(String),

  /// The profile backend could not be reached.
  #[error("unavailable: {0}")]
  Unavailable(String),
}

impl IntoResponse for PageError {
  fn into_response(self) -> Response {
    let (status, title, message) = match &self {
      Self::NotFound(username) => (
        StatusCode::NOT_FOUND,
        "Not Found",
        format!("There is no page for \u{201c}{username}\u{201d}."),
      ),
      Self::Unavailable(err) => {
        tracing::error!(error = %err, "profile backend unavailable");
        (
          StatusCode::SERVICE_UNAVAILABLE,
          "Service Unavailable",
          "This page is temporarily unavailable. Please try again later.".to_string(),
        )
      }
    };

    let markup = document(title, ERROR_CSS, html! {
      meta name="robots" content="noindex";
    }, html! {
      main class="error-page" {
        h1 { (title) }
        p { (message) }
        a href="/" { "Back to the home page" }
      }
    });

    (status, Html(markup.into_string())).into_response()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn display() {
    assert_eq!(PageError::NotFound("bob".into()).to_string(), "not found: bob");
    assert_eq!(PageError::Unavailable("db down".into()).to_string(), "unavailable: db down");
  }

  #[test]
  fn status_codes() {
    assert_eq!(
      PageError::NotFound("bob".into()).into_response().status(),
      StatusCode::NOT_FOUND
    );
    assert_eq!(
      PageError::Unavailable("x".into()).into_response().status(),
      StatusCode::SERVICE_UNAVAILABLE
    );
  }
}
