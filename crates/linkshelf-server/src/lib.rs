//! HTTP front end for linkshelf.
//!
//! Serves the public profile pages and landing page as HTML, the stored media
//! blobs, and nests the JSON API under `/api`.

pub mod error;
pub mod pages;

pub use error::PageError;

use std::{path::PathBuf, sync::Arc, time::Duration};

use axum::{
  Json, Router,
  extract::{Path, State},
  http::{HeaderValue, StatusCode, header},
  response::{IntoResponse, Response},
  routing::get,
};
use linkshelf_api::{ApiSettings, ApiState, Backend, ResetNotifier, api_router};
use linkshelf_media::{BlobPath, CompressOptions, FsBlobStore, ImageFetcher, detect_image_mime};
use serde::Deserialize;
use serde_json::json;
use tower_http::trace::TraceLayer;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `LINKSHELF_*` environment variables. Every field has a default.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
  pub host:                 String,
  pub port:                 u16,
  /// Public origin; used for media URLs, canonical links and reset links.
  pub base_url:             String,
  pub store_path:           PathBuf,
  pub media_dir:            PathBuf,
  pub site_name:            String,
  pub site_description:     String,
  pub max_upload_bytes:     usize,
  pub image_max_bytes:      usize,
  pub image_max_dimension:  u32,
  pub fetch_timeout_secs:   u64,
  pub fetch_max_bytes:      u64,
  /// Let the image fetcher reach loopback and private-network hosts.
  pub fetch_allow_private:  bool,
  pub reset_token_ttl_secs: i64,
}

impl Default for ServerConfig {
  fn default() -> Self {
    let compress = CompressOptions::default();
    Self {
      host:                 "127.0.0.1".to_string(),
      port:                 8080,
      base_url:             "http://localhost:8080".to_string(),
      store_path:           PathBuf::from("~/.local/share/linkshelf/linkshelf.db"),
      media_dir:            PathBuf::from("~/.local/share/linkshelf/media"),
      site_name:            "Linkshelf".to_string(),
      site_description:     "One page for all of your links.".to_string(),
      max_upload_bytes:     10 * 1024 * 1024,
      image_max_bytes:      compress.max_bytes,
      image_max_dimension:  compress.max_dimension,
      fetch_timeout_secs:   30,
      fetch_max_bytes:      10 * 1024 * 1024,
      fetch_allow_private:  false,
      reset_token_ttl_secs: 60 * 60,
    }
  }
}

impl From<&ServerConfig> for ApiSettings {
  fn from(cfg: &ServerConfig) -> Self {
    Self {
      base_url:         cfg.base_url.trim_end_matches('/').to_string(),
      max_upload_bytes: cfg.max_upload_bytes,
      compress:         CompressOptions {
        max_bytes:     cfg.image_max_bytes,
        max_dimension: cfg.image_max_dimension,
      },
      reset_token_ttl:  chrono::Duration::seconds(cfg.reset_token_ttl_secs),
    }
  }
}

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through the page handlers.
#[derive(Clone)]
pub struct AppState<S: Backend> {
  pub api:    ApiState<S>,
  pub config: Arc<ServerConfig>,
}

impl<S: Backend> AppState<S> {
  /// Wire up the media services around `store`. `config.media_dir` is used
  /// as given, so callers expand `~` first.
  pub async fn new(
    config: ServerConfig,
    store: S,
    notifier: Arc<dyn ResetNotifier>,
  ) -> linkshelf_media::Result<Self> {
    let blobs = FsBlobStore::new(config.media_dir.clone(), config.base_url.clone()).await?;
    let fetcher = ImageFetcher::new(
      Duration::from_secs(config.fetch_timeout_secs),
      config.fetch_max_bytes,
    )?
    .allow_private_hosts(config.fetch_allow_private);

    let api = ApiState {
      store: Arc::new(store),
      blobs: Arc::new(blobs),
      fetcher: Arc::new(fetcher),
      notifier,
      settings: Arc::new(ApiSettings::from(&config)),
    };

    Ok(Self { api, config: Arc::new(config) })
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the full application router.
pub fn router<S: Backend>(state: AppState<S>) -> Router {
  let api = api_router(state.api.clone());

  Router::new()
    .route("/",                 get(pages::landing::<S>))
    .route("/user/{username}",  get(pages::profile_page::<S>))
    .route("/media/{*path}",    get(media_handler::<S>))
    .route("/health",           get(health))
    .with_state(state)
    .nest("/api", api)
    .layer(TraceLayer::new_for_http())
}

async fn health() -> Json<serde_json::Value> {
  Json(json!({ "status": "ok" }))
}

/// `GET /media/{*path}`: a stored blob with a sniffed content type.
async fn media_handler<S: Backend>(
  State(state): State<AppState<S>>,
  Path(path): Path<String>,
) -> Response {
  let Ok(blob_path) = BlobPath::parse(&path) else {
    tracing::debug!(path = %path, "rejected media path");
    return StatusCode::NOT_FOUND.into_response();
  };

  match state.api.blobs.get(&blob_path).await {
    Ok(data) => {
      let mime = detect_image_mime(&data).unwrap_or("application/octet-stream");
      let mut res = data.into_response();
      let headers = res.headers_mut();
      headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(mime));
      headers.insert(header::X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
      res
    }
    Err(linkshelf_media::Error::NotFound(_)) => StatusCode::NOT_FOUND.into_response(),
    Err(e) => {
      tracing::error!(path = %blob_path, error = %e, "failed to read blob");
      StatusCode::INTERNAL_SERVER_ERROR.into_response()
    }
  }
}

// ─── Integration tests ────────────────────────────────────────────────────────
