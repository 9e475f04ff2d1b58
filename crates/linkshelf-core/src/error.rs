//! Error types for `linkshelf-core`.

use thiserror::Error;

use crate::user::Uid;

/// A caller-supplied value was rejected before anything was written.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
  #[error("missing required field: {0}")]
  Missing(&'static str),

  #[error("invalid link url: {0:?}")]
  InvalidUrl(String),

  #[error("invalid username {0:?}: use 3-30 letters, digits, '.', '_' or '-'")]
  InvalidUsername(String),

  #[error("field {0:?} cannot be changed")]
  ImmutableField(String),

  #[error("field {field:?} expects a {expected} value")]
  FieldType {
    field:    String,
    expected: &'static str,
  },
}

/// Failure of a profile or link-collection operation.
#[derive(Debug, Error)]
pub enum Error {
  #[error(transparent)]
  Validation(#[from] ValidationError),

  #[error("user not found: {0}")]
  UserNotFound(Uid),

  #[error("link collection of {0} was modified concurrently")]
  Conflict(Uid),

  #[error("username {0:?} is already taken")]
  UsernameTaken(String),

  #[error("username is already set and cannot be changed")]
  UsernameAlreadySet,

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  pub fn store<E>(e: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Store(Box::new(e))
  }
}

/// Outcome of resolving a public username.
///
/// Absence and backend failure are kept apart so the rendering layer can
/// answer "no such user" and "try again later" differently.
#[derive(Debug, Error)]
pub enum ResolveError {
  #[error("no user named {0:?}")]
  NotFound(String),

  #[error("profile backend unavailable: {0}")]
  Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
