//! Handlers for profile lookup and the caller's own profile.
//!
//! | Method  | Path | Notes |
//! |---------|------|-------|
//! | `POST`  | `/get-user-data` | Body: `{"username":"alice"}`; `null` when unknown |
//! | `GET`   | `/usernames/{username}` | Exact-match availability |
//! | `GET`   | `/me` | Auth |
//! | `PATCH` | `/me` | Auth; body: `{"background"?, "color"?}` |
//! | `PUT`   | `/me/username` | Auth; set once |
//! | `GET`   | `/me/subscription` | Auth; `{"active": bool}` |

use axum::{
  Json,
  extract::{Path, State},
};
use linkshelf_core::{
  ResolveError,
  profile,
  store::ProfileStore,
  user::{ProfileUpdate, PublicProfile, User},
};
use serde::{Deserialize, Serialize};

use crate::{ApiState, AuthUser, Backend, error::ApiError};

// ─── Public lookup ───────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct GetUserDataBody {
  pub username: String,
}

#[derive(Debug, Serialize)]
pub struct UserData {
  pub user: PublicProfile,
}

/// `POST /get-user-data`: `{"user": …}` or `null` when no such username.
pub async fn get_user_data<S: Backend>(
  State(state): State<ApiState<S>>,
  Json(body): Json<GetUserDataBody>,
) -> Result<Json<Option<UserData>>, ApiError> {
  match profile::resolve_profile(state.store.as_ref(), &body.username).await {
    Ok(user) => Ok(Json(Some(UserData { user }))),
    Err(ResolveError::NotFound(_)) => Ok(Json(None)),
    Err(ResolveError::Backend(e)) => {
      tracing::error!(username = %body.username, error = %e, "profile lookup failed");
      Err(ApiError::Unavailable("profile backend unavailable".into()))
    }
  }
}

#[derive(Debug, Serialize)]
pub struct UsernameStatus {
  pub username: String,
  pub taken:    bool,
}

/// `GET /usernames/{username}`
pub async fn username_status<S: Backend>(
  State(state): State<ApiState<S>>,
  Path(username): Path<String>,
) -> Result<Json<UsernameStatus>, ApiError> {
  let taken = profile::is_username_taken(state.store.as_ref(), &username).await?;
  Ok(Json(UsernameStatus { username, taken }))
}

// ─── Own profile ─────────────────────────────────────────────────────────────

/// `GET /me`
pub async fn me<S: Backend>(
  State(state): State<ApiState<S>>,
  auth: AuthUser,
) -> Result<Json<User>, ApiError> {
  let user = state
    .store
    .get_user(&auth.uid)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("user {} not found", auth.uid)))?;
  Ok(Json(user))
}

#[derive(Debug, Deserialize)]
pub struct ThemeBody {
  pub background: Option<String>,
  pub color:      Option<String>,
}

/// `PATCH /me`
pub async fn update_theme<S: Backend>(
  State(state): State<ApiState<S>>,
  auth: AuthUser,
  Json(body): Json<ThemeBody>,
) -> Result<Json<User>, ApiError> {
  let update = ProfileUpdate {
    photo_url:  None,
    background: body.background,
    color:      body.color,
  };
  if update.is_empty() {
    return Err(ApiError::BadRequest("nothing to update".into()));
  }

  let user = state
    .store
    .update_profile(&auth.uid, update)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("user {} not found", auth.uid)))?;
  Ok(Json(user))
}

#[derive(Debug, Deserialize)]
pub struct UsernameBody {
  pub username: String,
}

/// `PUT /me/username`
pub async fn set_username<S: Backend>(
  State(state): State<ApiState<S>>,
  auth: AuthUser,
  Json(body): Json<UsernameBody>,
) -> Result<Json<User>, ApiError> {
  let user = profile::claim_username(state.store.as_ref(), &auth.uid, &body.username).await?;
  tracing::info!(uid = %auth.uid, username = %body.username, "username claimed");
  Ok(Json(user))
}

#[derive(Debug, Serialize)]
pub struct SubscriptionStatusBody {
  pub active: bool,
}

/// `GET /me/subscription`
pub async fn subscription<S: Backend>(
  State(state): State<ApiState<S>>,
  auth: AuthUser,
) -> Result<Json<SubscriptionStatusBody>, ApiError> {
  let active = profile::subscription_active(state.store.as_ref(), &auth.uid).await?;
  Ok(Json(SubscriptionStatusBody { active }))
}
