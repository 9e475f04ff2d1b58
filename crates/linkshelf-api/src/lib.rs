//! JSON REST API for linkshelf.
//!
//! Exposes an axum [`Router`] backed by any store implementing both
//! [`ProfileStore`] and [`AccountStore`]. TLS and transport concerns are the
//! caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", linkshelf_api::api_router(state.clone()))
//! ```

pub mod accounts;
pub mod auth;
pub mod error;
pub mod etag;
pub mod links;
pub mod media;
pub mod profile;
pub mod templates;

use std::sync::Arc;

use axum::{
  Router,
  extract::DefaultBodyLimit,
  routing::{get, patch, post, put},
};
use linkshelf_core::store::{AccountStore, ProfileStore};
use linkshelf_media::{CompressOptions, FsBlobStore, ImageFetcher};

pub use accounts::{LogNotifier, ResetNotifier};
pub use auth::AuthUser;
pub use error::ApiError;

// ─── Backend ─────────────────────────────────────────────────────────────────

/// Everything a handler may need from storage.
pub trait Backend: ProfileStore + AccountStore + Clone + Send + Sync + 'static {}

impl<T> Backend for T where T: ProfileStore + AccountStore + Clone + Send + Sync + 'static {}

// ─── Application state ───────────────────────────────────────────────────────

/// Tunables shared by the handlers.
#[derive(Debug, Clone)]
pub struct ApiSettings {
  /// Public origin used in password-reset links.
  pub base_url:         String,
  pub max_upload_bytes: usize,
  pub compress:         CompressOptions,
  pub reset_token_ttl:  chrono::Duration,
}

impl Default for ApiSettings {
  fn default() -> Self {
    Self {
      base_url:         "http://localhost:8080".to_string(),
      max_upload_bytes: 10 * 1024 * 1024,
      compress:         CompressOptions::default(),
      reset_token_ttl:  chrono::Duration::hours(1),
    }
  }
}

/// Shared state threaded through all API handlers.
#[derive(Clone)]
pub struct ApiState<S: Backend> {
  pub store:    Arc<S>,
  pub blobs:    Arc<FsBlobStore>,
  pub fetcher:  Arc<ImageFetcher>,
  pub notifier: Arc<dyn ResetNotifier>,
  pub settings: Arc<ApiSettings>,
}

// ─── Router ──────────────────────────────────────────────────────────────────

/// Build a fully-materialised API router for `state`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S: Backend>(state: ApiState<S>) -> Router<()> {
  let body_limit = state.settings.max_upload_bytes;

  Router::new()
    // Public
    .route("/get-user-data", post(profile::get_user_data::<S>))
    .route("/downloadImage", get(media::download_image::<S>))
    .route("/usernames/{username}", get(profile::username_status::<S>))
    .route("/templates", get(templates::list::<S>))
    // Accounts
    .route("/accounts", post(accounts::register::<S>))
    .route("/password-reset", post(accounts::request_reset::<S>))
    .route("/password-reset/confirm", post(accounts::confirm_reset::<S>))
    // Profile
    .route("/me", get(profile::me::<S>).patch(profile::update_theme::<S>))
    .route("/me/username", put(profile::set_username::<S>))
    .route("/me/subscription", get(profile::subscription::<S>))
    // Media
    .route("/me/photo", post(media::upload_photo::<S>))
    .route("/me/images", post(media::upload_image::<S>))
    .route("/me/images/import", post(media::import_image::<S>))
    // Links
    .route(
      "/me/links",
      get(links::list::<S>).post(links::append::<S>).put(links::replace::<S>),
    )
    .route("/me/links/{id}", patch(links::set_field::<S>).delete(links::remove::<S>))
    .route("/me/links/{id}/active", patch(links::set_active::<S>))
    .layer(DefaultBodyLimit::max(body_limit))
    .with_state(state)
}
