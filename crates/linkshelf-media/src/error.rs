//! Error types for `linkshelf-media`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("I/O error: {0}")]
  Io(#[from] std::io::Error),

  #[error("image error: {0}")]
  Image(#[from] image::ImageError),

  #[error("http error: {0}")]
  Http(#[from] reqwest::Error),

  #[error("invalid blob path: {0}")]
  InvalidPath(String),

  #[error("blob not found: {0}")]
  NotFound(String),

  #[error("empty upload")]
  Empty,

  #[error("payload too large: {size} bytes (max {max})")]
  TooLarge { size: u64, max: u64 },

  #[error("unsupported url: {0}")]
  UnsupportedUrl(String),

  #[error("refusing to fetch from non-public host: {0}")]
  ForbiddenHost(String),

  #[error("could not resolve host: {0}")]
  Unresolvable(String),

  #[error("too many redirects")]
  TooManyRedirects,

  #[error("upstream responded with status {0}")]
  UpstreamStatus(u16),

  #[error("not an image: {0}")]
  NotAnImage(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
