//! HTTP Basic-auth extractor and password hashing.
//!
//! Credentials are `email:password`; the email is normalised before lookup
//! and the password is verified against the account's argon2 PHC string.

use argon2::{
  Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString,
};
use axum::{
  extract::FromRequestParts,
  http::{HeaderMap, header, request::Parts},
};
use base64::{Engine as _, engine::general_purpose::STANDARD as B64};
use linkshelf_core::{account::normalize_email, store::AccountStore, user::Uid};
use rand_core::OsRng;

use crate::{ApiState, Backend, error::ApiError};

/// The authenticated caller. Present in a handler means the request carried
/// valid credentials.
#[derive(Debug, Clone)]
pub struct AuthUser {
  pub uid:   Uid,
  pub email: String,
}

/// Hash `password` into an argon2 PHC string.
pub fn hash_password(password: &str) -> Result<String, ApiError> {
  let salt = SaltString::generate(&mut OsRng);
  Argon2::default()
    .hash_password(password.as_bytes(), &salt)
    .map(|h| h.to_string())
    .map_err(|e| ApiError::Store(format!("argon2 error: {e}").into()))
}

pub fn verify_password(password: &str, phc: &str) -> bool {
  PasswordHash::new(phc)
    .map(|parsed| Argon2::default().verify_password(password.as_bytes(), &parsed).is_ok())
    .unwrap_or(false)
}

/// Decode a `Basic` authorization header into `(email, password)`.
pub fn basic_credentials(headers: &HeaderMap) -> Result<(String, String), ApiError> {
  let header_val = headers
    .get(header::AUTHORIZATION)
    .and_then(|v| v.to_str().ok())
    .ok_or(ApiError::Unauthorized)?;

  let encoded = header_val
    .strip_prefix("Basic ")
    .ok_or(ApiError::Unauthorized)?;

  let decoded = B64.decode(encoded.trim()).map_err(|_| ApiError::Unauthorized)?;
  let creds   = std::str::from_utf8(&decoded).map_err(|_| ApiError::Unauthorized)?;

  let (email, password) = creds.split_once(':').ok_or(ApiError::Unauthorized)?;
  Ok((normalize_email(email), password.to_owned()))
}

impl<S: Backend> FromRequestParts<ApiState<S>> for AuthUser {
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &ApiState<S>,
  ) -> Result<Self, Self::Rejection> {
    let (email, password) = basic_credentials(&parts.headers)?;

    let account = state
      .store
      .find_account_by_email(&email)
      .await
      .map_err(ApiError::store)?
      .ok_or(ApiError::Unauthorized)?;

    if !verify_password(&password, &account.password_hash) {
      tracing::debug!(email = %email, "rejected credentials");
      return Err(ApiError::Unauthorized);
    }

    Ok(AuthUser { uid: account.uid, email })
  }
}

#[cfg(test)]
mod tests {
  use axum::http::HeaderValue;

  use super::*;

  fn basic(user: &str, pass: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    let encoded = B64.encode(format!("{user}:{pass}"));
    headers.insert(
      header::AUTHORIZATION,
      HeaderValue::from_str(&format!("Basic {encoded}")).unwrap(),
    );
    headers
  }

  #[test]
  fn hash_then_verify() {
    let phc = hash_password("secret").unwrap();
    assert!(verify_password("secret", &phc));
    assert!(!verify_password("wrong", &phc));
  }

  #[test]
  fn garbage_hash_never_verifies() {
    assert!(!verify_password("secret", "not-a-phc-string"));
  }

  #[test]
  fn credentials_are_normalised() {
    let (email, password) = basic_credentials(&basic(" Alice@Example.COM", "p:w")).unwrap();
    assert_eq!(email, "alice@example.com");
    assert_eq!(password, "p:w");
  }

  #[test]
  fn missing_header() {
    assert!(matches!(basic_credentials(&HeaderMap::new()), Err(ApiError::Unauthorized)));
  }

  #[test]
  fn invalid_base64() {
    let mut headers = HeaderMap::new();
    headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic !!!not-base64!!!"));
    assert!(matches!(basic_credentials(&headers), Err(ApiError::Unauthorized)));
  }

  #[test]
  fn wrong_scheme() {
    let mut headers = HeaderMap::new();
    headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc"));
    assert!(matches!(basic_credentials(&headers), Err(ApiError::Unauthorized)));
  }
}
