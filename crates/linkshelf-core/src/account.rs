//! Sign-in credentials and password-reset tokens.
//!
//! Accounts are kept apart from user documents: a user document is public
//! profile data, an account is what authenticates its owner.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::user::Uid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
  pub uid:           Uid,
  /// Normalised with [`normalize_email`].
  pub email:         String,
  /// PHC string produced by argon2, e.g. `$argon2id$v=19$…`
  pub password_hash: String,
  pub created_at:    DateTime<Utc>,
}

/// A single-use password reset grant. Only the SHA-256 of the token the user
/// receives is ever stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResetToken {
  pub token_hash: String,
  pub uid:        Uid,
  pub expires_at: DateTime<Utc>,
}

impl ResetToken {
  pub fn is_expired(&self, now: DateTime<Utc>) -> bool { now >= self.expires_at }
}

/// Result of registering a new account.
#[derive(Debug, Clone)]
pub enum Registration {
  Created(Account),
  EmailTaken,
}

pub fn normalize_email(email: &str) -> String { email.trim().to_lowercase() }

#[cfg(test)]
mod tests {
  use chrono::Duration;

  use super::*;

  #[test]
  fn emails_are_trimmed_and_lowercased() {
    assert_eq!(normalize_email("  Alice@Example.COM "), "alice@example.com");
  }

  #[test]
  fn reset_tokens_expire_at_their_deadline() {
    let now = Utc::now();
    let token = ResetToken {
      token_hash: "h".into(),
      uid:        Uid::new("u1"),
      expires_at: now + Duration::minutes(5),
    };
    assert!(!token.is_expired(now));
    assert!(token.is_expired(now + Duration::minutes(5)));
  }
}
