//! Registration and password reset.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/accounts` | Body: `{"email","password"}`; 201 or 409 |
//! | `POST` | `/password-reset` | Body: `{"email"}`; always 202 |
//! | `POST` | `/password-reset/confirm` | Body: `{"token","password"}`; 204 or 400 |

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use chrono::Utc;
use linkshelf_core::{
  account::{Account, Registration, ResetToken, normalize_email},
  store::AccountStore,
  user::Uid,
};
use rand_core::{OsRng, RngCore as _};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::{ApiState, Backend, auth::hash_password, error::ApiError};

const MIN_PASSWORD_LEN: usize = 8;

// ─── Notifier ────────────────────────────────────────────────────────────────

/// Delivers password-reset links to account holders.
pub trait ResetNotifier: Send + Sync {
  fn send_reset_link(&self, email: &str, link: &str);
}

/// Writes the reset link to the log instead of sending mail.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl ResetNotifier for LogNotifier {
  fn send_reset_link(&self, email: &str, link: &str) {
    tracing::info!(email, link, "password reset requested");
  }
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

fn check_password(password: &str) -> Result<(), ApiError> {
  if password.chars().count() < MIN_PASSWORD_LEN {
    return Err(ApiError::BadRequest(format!(
      "password must be at least {MIN_PASSWORD_LEN} characters"
    )));
  }
  Ok(())
}

fn check_email(email: &str) -> Result<(), ApiError> {
  match email.split_once('@') {
    Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(()),
    _ => Err(ApiError::BadRequest(format!("invalid email: {email:?}"))),
  }
}

fn new_token() -> String {
  let mut raw = [0u8; 32];
  OsRng.fill_bytes(&mut raw);
  hex::encode(raw)
}

fn token_hash(token: &str) -> String { hex::encode(Sha256::digest(token.as_bytes())) }

// ─── Register ────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct RegisterBody {
  pub email:    String,
  pub password: String,
}

#[derive(Debug, Serialize)]
pub struct Registered {
  pub uid:   Uid,
  pub email: String,
}

/// `POST /accounts`
pub async fn register<S: Backend>(
  State(state): State<ApiState<S>>,
  Json(body): Json<RegisterBody>,
) -> Result<impl IntoResponse, ApiError> {
  let email = normalize_email(&body.email);
  check_email(&email)?;
  check_password(&body.password)?;

  let account = Account {
    uid: Uid::generate(),
    email,
    password_hash: hash_password(&body.password)?,
    created_at: Utc::now(),
  };

  match state.store.create_account(account).await.map_err(ApiError::store)? {
    Registration::Created(account) => {
      tracing::info!(uid = %account.uid, "account created");
      Ok((StatusCode::CREATED, Json(Registered { uid: account.uid, email: account.email })))
    }
    Registration::EmailTaken => Err(ApiError::Conflict("email is already registered".into())),
  }
}

// ─── Password reset ──────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ResetRequestBody {
  pub email: String,
}

/// `POST /password-reset`. The response never reveals whether the account
/// exists.
pub async fn request_reset<S: Backend>(
  State(state): State<ApiState<S>>,
  Json(body): Json<ResetRequestBody>,
) -> Result<StatusCode, ApiError> {
  let email = normalize_email(&body.email);

  let Some(account) = state
    .store
    .find_account_by_email(&email)
    .await
    .map_err(ApiError::store)?
  else {
    tracing::debug!(email = %email, "reset requested for unknown account");
    return Ok(StatusCode::ACCEPTED);
  };

  let token = new_token();
  state
    .store
    .put_reset_token(ResetToken {
      token_hash: token_hash(&token),
      uid:        account.uid,
      expires_at: Utc::now() + state.settings.reset_token_ttl,
    })
    .await
    .map_err(ApiError::store)?;

  let link = format!(
    "{}/reset-password?token={token}",
    state.settings.base_url.trim_end_matches('/')
  );
  state.notifier.send_reset_link(&account.email, &link);

  Ok(StatusCode::ACCEPTED)
}

#[derive(Debug, Deserialize)]
pub struct ResetConfirmBody {
  pub token:    String,
  pub password: String,
}

/// `POST /password-reset/confirm`
pub async fn confirm_reset<S: Backend>(
  State(state): State<ApiState<S>>,
  Json(body): Json<ResetConfirmBody>,
) -> Result<StatusCode, ApiError> {
  check_password(&body.password)?;

  let grant = state
    .store
    .take_reset_token(&token_hash(body.token.trim()))
    .await
    .map_err(ApiError::store)?
    .filter(|t| !t.is_expired(Utc::now()))
    .ok_or_else(|| ApiError::BadRequest("invalid or expired reset token".into()))?;

  let hash = hash_password(&body.password)?;
  let updated = state
    .store
    .set_password_hash(&grant.uid, hash)
    .await
    .map_err(ApiError::store)?;
  if !updated {
    return Err(ApiError::BadRequest("invalid or expired reset token".into()));
  }

  tracing::info!(uid = %grant.uid, "password reset");
  Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn tokens_are_unique_hex() {
    let a = new_token();
    let b = new_token();
    assert_eq!(a.len(), 64);
    assert_ne!(a, b);
  }

  #[test]
  fn token_hash_is_stable_and_not_the_token() {
    let t = new_token();
    assert_eq!(token_hash(&t), token_hash(&t));
    assert_ne!(token_hash(&t), t);
  }

  #[test]
  fn email_shape() {
    assert!(check_email("a@example.com").is_ok());
    assert!(check_email("a@localhost").is_err());
    assert!(check_email("@example.com").is_err());
    assert!(check_email("example.com").is_err());
  }

  #[test]
  fn short_password_rejected() {
    assert!(check_password("short").is_err());
    assert!(check_password("long enough").is_ok());
  }
}
