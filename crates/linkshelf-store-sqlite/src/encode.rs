//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! All timestamps are stored as RFC 3339 strings. Link collections and
//! templates are stored as compact JSON documents.

use chrono::{DateTime, Utc};
use linkshelf_core::{
  account::{Account, ResetToken},
  link::{Link, LinkCollection, Revision},
  subscription::{Subscription, SubscriptionStatus},
  user::{Uid, User},
};

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Links ───────────────────────────────────────────────────────────────────

pub fn encode_links(links: &[Link]) -> Result<String> { Ok(serde_json::to_string(links)?) }

/// A NULL column is an uninitialised collection, read as empty.
pub fn decode_links(s: Option<&str>) -> Result<Vec<Link>> {
  match s {
    Some(json) => Ok(serde_json::from_str(json)?),
    None => Ok(Vec::new()),
  }
}

pub fn encode_revision(r: Revision) -> i64 { r.0 as i64 }

pub fn decode_revision(r: i64) -> Revision { Revision(r.max(0) as u64) }

// ─── SubscriptionStatus ──────────────────────────────────────────────────────

pub fn encode_status(s: SubscriptionStatus) -> &'static str {
  match s {
    SubscriptionStatus::Trialing => "trialing",
    SubscriptionStatus::Active => "active",
    SubscriptionStatus::Canceled => "canceled",
    SubscriptionStatus::Unknown => "unknown",
  }
}

pub fn decode_status(s: &str) -> Result<SubscriptionStatus> {
  match s {
    "trialing" => Ok(SubscriptionStatus::Trialing),
    "active" => Ok(SubscriptionStatus::Active),
    "canceled" => Ok(SubscriptionStatus::Canceled),
    "unknown" => Ok(SubscriptionStatus::Unknown),
    other => Err(Error::UnknownStatus(other.to_owned())),
  }
}

// ─── Row types ───────────────────────────────────────────────────────────────

pub const USER_COLUMNS: &str =
  "uid, username, photo_url, background, color, links_json, revision, created_at";

/// Raw values read directly from a `users` row.
pub struct RawUser {
  pub uid:        String,
  pub username:   Option<String>,
  pub photo_url:  Option<String>,
  pub background: Option<String>,
  pub color:      Option<String>,
  pub links_json: Option<String>,
  pub revision:   i64,
  pub created_at: String,
}

impl RawUser {
  /// Map a row selected with [`USER_COLUMNS`].
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      uid:        row.get(0)?,
      username:   row.get(1)?,
      photo_url:  row.get(2)?,
      background: row.get(3)?,
      color:      row.get(4)?,
      links_json: row.get(5)?,
      revision:   row.get(6)?,
      created_at: row.get(7)?,
    })
  }

  pub fn into_user(self) -> Result<User> {
    Ok(User {
      uid:        Uid::new(self.uid),
      username:   self.username,
      photo_url:  self.photo_url,
      background: self.background,
      color:      self.color,
      links:      decode_links(self.links_json.as_deref())?,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}

/// Raw values of the link-collection columns of a `users` row.
pub struct RawLinks {
  pub links_json: Option<String>,
  pub revision:   i64,
}

impl RawLinks {
  pub fn into_collection(self) -> Result<LinkCollection> {
    Ok(LinkCollection {
      links:    decode_links(self.links_json.as_deref())?,
      revision: decode_revision(self.revision),
    })
  }
}

pub struct RawSubscription {
  pub subscription_id:      String,
  pub status:               String,
  pub cancel_at_period_end: bool,
  pub current_period_end:   Option<String>,
}

impl RawSubscription {
  pub fn into_subscription(self) -> Result<Subscription> {
    Ok(Subscription {
      id:                   self.subscription_id,
      status:               decode_status(&self.status)?,
      cancel_at_period_end: self.cancel_at_period_end,
      current_period_end:   self.current_period_end.as_deref().map(decode_dt).transpose()?,
    })
  }
}

pub struct RawAccount {
  pub uid:           String,
  pub email:         String,
  pub password_hash: String,
  pub created_at:    String,
}

impl RawAccount {
  pub fn into_account(self) -> Result<Account> {
    Ok(Account {
      uid:           Uid::new(self.uid),
      email:         self.email,
      password_hash: self.password_hash,
      created_at:    decode_dt(&self.created_at)?,
    })
  }
}

pub struct RawResetToken {
  pub token_hash: String,
  pub uid:        String,
  pub expires_at: String,
}

impl RawResetToken {
  pub fn into_token(self) -> Result<ResetToken> {
    Ok(ResetToken {
      token_hash: self.token_hash,
      uid:        Uid::new(self.uid),
      expires_at: decode_dt(&self.expires_at)?,
    })
  }
}
