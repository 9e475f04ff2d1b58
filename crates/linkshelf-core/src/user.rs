//! User documents and the public subset visitors see.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{ValidationError, link::Link};

// ─── Uid ─────────────────────────────────────────────────────────────────────

/// Opaque, stable user identifier assigned when the account is created.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Uid(String);

impl Uid {
  pub fn new(raw: impl Into<String>) -> Self { Self(raw.into()) }

  /// A fresh identifier for a new account.
  pub fn generate() -> Self { Self(Uuid::new_v4().simple().to_string()) }

  pub fn as_str(&self) -> &str { &self.0 }

  pub fn is_empty(&self) -> bool { self.0.trim().is_empty() }
}

impl fmt::Display for Uid {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

// ─── User ────────────────────────────────────────────────────────────────────

/// One user document. The link collection lives inside it, in display order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
  pub uid:        Uid,
  /// Unset until the user claims one; exact, case-sensitive match on lookup.
  pub username:   Option<String>,
  pub photo_url:  Option<String>,
  pub background: Option<String>,
  pub color:      Option<String>,
  #[serde(default)]
  pub links:      Vec<Link>,
  pub created_at: DateTime<Utc>,
}

impl User {
  /// A freshly created user with an empty profile.
  pub fn new(uid: Uid) -> Self {
    Self {
      uid,
      username: None,
      photo_url: None,
      background: None,
      color: None,
      links: Vec::new(),
      created_at: Utc::now(),
    }
  }
}

/// Partial update of the editable profile fields. `None` leaves a field as is.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
  pub photo_url:  Option<String>,
  pub background: Option<String>,
  pub color:      Option<String>,
}

impl ProfileUpdate {
  pub fn is_empty(&self) -> bool {
    self.photo_url.is_none() && self.background.is_none() && self.color.is_none()
  }
}

// ─── Public view ─────────────────────────────────────────────────────────────

/// What the public page renders: photo, username, theme and active links.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicProfile {
  pub uid:        Uid,
  pub username:   String,
  pub photo_url:  Option<String>,
  pub background: Option<String>,
  pub color:      Option<String>,
  pub links:      Vec<Link>,
}

impl PublicProfile {
  /// Project a user document; inactive links are dropped, order is kept.
  pub fn from_user(user: User, username: String) -> Self {
    Self {
      uid: user.uid,
      username,
      photo_url: user.photo_url,
      background: user.background,
      color: user.color,
      links: user.links.into_iter().filter(|l| l.active).collect(),
    }
  }
}

// ─── Username rules ──────────────────────────────────────────────────────────

const USERNAME_MIN: usize = 3;
const USERNAME_MAX: usize = 30;

/// Check the shape of a username a user is trying to claim.
///
/// Case is preserved; uniqueness is a separate, exact-match check.
pub fn validate_username(username: &str) -> Result<(), ValidationError> {
  let len = username.chars().count();
  let charset_ok = username
    .chars()
    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'));

  if (USERNAME_MIN..=USERNAME_MAX).contains(&len) && charset_ok {
    Ok(())
  } else {
    Err(ValidationError::InvalidUsername(username.to_owned()))
  }
}
