//! [`SqliteStore`]: the SQLite implementation of [`ProfileStore`] and
//! [`AccountStore`].

use std::path::Path;

use chrono::Utc;
use rusqlite::OptionalExtension as _;

use linkshelf_core::{
  account::{Account, Registration, ResetToken},
  link::{Link, LinkCollection, Revision},
  links,
  store::{AccountStore, ClaimOutcome, ProfileStore, WriteOutcome},
  subscription::Subscription,
  template::Template,
  user::{ProfileUpdate, Uid, User},
};

use crate::{
  Result,
  encode::{
    RawAccount, RawLinks, RawResetToken, RawSubscription, RawUser, USER_COLUMNS, decode_links,
    decode_revision, encode_dt, encode_links, encode_revision, encode_status,
  },
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A linkshelf store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

/// What the username UPDATE observed, before the user row is re-read.
enum RawClaim {
  Claimed,
  Taken,
  AlreadySet,
  UserNotFound,
}

/// What the conditional links UPDATE observed.
enum RawWrite {
  Written(i64),
  Stale(i64),
  UserNotFound,
}

fn is_unique_violation(e: &rusqlite::Error) -> bool {
  matches!(
    e,
    rusqlite::Error::SqliteFailure(err, _)
      if err.code == rusqlite::ErrorCode::ConstraintViolation
  )
}

fn other(e: impl std::error::Error + Send + Sync + 'static) -> tokio_rusqlite::Error {
  tokio_rusqlite::Error::Other(Box::new(e))
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn user_where(&self, column: &'static str, value: String) -> Result<Option<User>> {
    let raw: Option<RawUser> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {USER_COLUMNS} FROM users WHERE {column} = ?1"),
              rusqlite::params![value],
              RawUser::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawUser::into_user).transpose()
  }
}

// ─── ProfileStore impl ───────────────────────────────────────────────────────

impl ProfileStore for SqliteStore {
  type Error = crate::Error;

  // ── Users ─────────────────────────────────────────────────────────────────

  async fn create_user(&self, uid: Uid) -> Result<User> {
    let user = User::new(uid);

    let uid_str = user.uid.as_str().to_owned();
    let at_str  = encode_dt(user.created_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO users (uid, created_at) VALUES (?1, ?2)",
          rusqlite::params![uid_str, at_str],
        )?;
        Ok(())
      })
      .await?;

    Ok(user)
  }

  async fn get_user(&self, uid: &Uid) -> Result<Option<User>> {
    self.user_where("uid", uid.as_str().to_owned()).await
  }

  async fn find_user_by_username(&self, username: &str) -> Result<Option<User>> {
    self.user_where("username", username.to_owned()).await
  }

  async fn username_exists(&self, username: &str) -> Result<bool> {
    let username = username.to_owned();

    let exists = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT 1 FROM users WHERE username = ?1",
              rusqlite::params![username],
              |_| Ok(true),
            )
            .optional()?
            .unwrap_or(false),
        )
      })
      .await?;

    Ok(exists)
  }

  async fn claim_username(&self, uid: &Uid, username: &str) -> Result<ClaimOutcome> {
    let uid_str  = uid.as_str().to_owned();
    let username = username.to_owned();

    let raw = self
      .conn
      .call(move |conn| {
        let updated = conn.execute(
          "UPDATE users SET username = ?1 WHERE uid = ?2 AND username IS NULL",
          rusqlite::params![username, uid_str],
        );

        match updated {
          Ok(0) => {}
          Ok(_) => return Ok(RawClaim::Claimed),
          Err(e) if is_unique_violation(&e) => return Ok(RawClaim::Taken),
          Err(e) => return Err(e.into()),
        }

        let exists = conn
          .query_row(
            "SELECT 1 FROM users WHERE uid = ?1",
            rusqlite::params![uid_str],
            |_| Ok(true),
          )
          .optional()?
          .unwrap_or(false);

        Ok(if exists { RawClaim::AlreadySet } else { RawClaim::UserNotFound })
      })
      .await?;

    Ok(match raw {
      RawClaim::Claimed => match self.get_user(uid).await? {
        Some(user) => ClaimOutcome::Claimed(user),
        None => ClaimOutcome::UserNotFound,
      },
      RawClaim::Taken => ClaimOutcome::Taken,
      RawClaim::AlreadySet => ClaimOutcome::AlreadySet,
      RawClaim::UserNotFound => ClaimOutcome::UserNotFound,
    })
  }

  async fn update_profile(&self, uid: &Uid, update: ProfileUpdate) -> Result<Option<User>> {
    let uid_str = uid.as_str().to_owned();

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE users SET
             photo_url  = COALESCE(?1, photo_url),
             background = COALESCE(?2, background),
             color      = COALESCE(?3, color)
           WHERE uid = ?4",
          rusqlite::params![update.photo_url, update.background, update.color, uid_str],
        )?)
      })
      .await?;

    if changed == 0 {
      return Ok(None);
    }
    self.get_user(uid).await
  }

  // ── Link collection ───────────────────────────────────────────────────────

  async fn get_links(&self, uid: &Uid) -> Result<Option<LinkCollection>> {
    let uid_str = uid.as_str().to_owned();

    let raw: Option<RawLinks> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT links_json, revision FROM users WHERE uid = ?1",
              rusqlite::params![uid_str],
              |row| {
                Ok(RawLinks {
                  links_json: row.get(0)?,
                  revision:   row.get(1)?,
                })
              },
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawLinks::into_collection).transpose()
  }

  async fn union_link(&self, uid: &Uid, link: Link) -> Result<Option<LinkCollection>> {
    let uid_str = uid.as_str().to_owned();

    let raw: Option<RawLinks> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let current: Option<Option<String>> = tx
          .query_row(
            "SELECT links_json FROM users WHERE uid = ?1",
            rusqlite::params![uid_str],
            |row| row.get(0),
          )
          .optional()?;

        let Some(current) = current else {
          return Ok(None);
        };

        let mut links = decode_links(current.as_deref()).map_err(other)?;
        links::union_link(&mut links, link);
        let json = encode_links(&links).map_err(other)?;

        let revision: i64 = tx.query_row(
          "UPDATE users SET links_json = ?1, revision = revision + 1
           WHERE uid = ?2
           RETURNING revision",
          rusqlite::params![json, uid_str],
          |row| row.get(0),
        )?;

        tx.commit()?;
        Ok(Some(RawLinks { links_json: Some(json), revision }))
      })
      .await?;

    raw.map(RawLinks::into_collection).transpose()
  }

  async fn write_links(
    &self,
    uid: &Uid,
    links: Vec<Link>,
    expected: Option<Revision>,
  ) -> Result<WriteOutcome> {
    let uid_str      = uid.as_str().to_owned();
    let json         = encode_links(&links)?;
    let expected_val = expected.map(encode_revision);

    let raw = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let written: Option<i64> = tx
          .query_row(
            "UPDATE users SET links_json = ?1, revision = revision + 1
             WHERE uid = ?2 AND (?3 IS NULL OR revision = ?3)
             RETURNING revision",
            rusqlite::params![json, uid_str, expected_val],
            |row| row.get(0),
          )
          .optional()?;

        let raw = match written {
          Some(revision) => RawWrite::Written(revision),
          None => tx
            .query_row(
              "SELECT revision FROM users WHERE uid = ?1",
              rusqlite::params![uid_str],
              |row| row.get(0),
            )
            .optional()?
            .map_or(RawWrite::UserNotFound, RawWrite::Stale),
        };

        tx.commit()?;
        Ok(raw)
      })
      .await?;

    Ok(match raw {
      RawWrite::Written(revision) => WriteOutcome::Written(LinkCollection {
        links,
        revision: decode_revision(revision),
      }),
      RawWrite::Stale(current) => WriteOutcome::Stale { current: decode_revision(current) },
      RawWrite::UserNotFound => WriteOutcome::UserNotFound,
    })
  }

  // ── Subscriptions & templates ─────────────────────────────────────────────

  async fn list_subscriptions(&self, uid: &Uid) -> Result<Vec<Subscription>> {
    let uid_str = uid.as_str().to_owned();

    let raws: Vec<RawSubscription> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT subscription_id, status, cancel_at_period_end, current_period_end
           FROM subscriptions WHERE uid = ?1 ORDER BY subscription_id",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![uid_str], |row| {
            Ok(RawSubscription {
              subscription_id:      row.get(0)?,
              status:               row.get(1)?,
              cancel_at_period_end: row.get(2)?,
              current_period_end:   row.get(3)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawSubscription::into_subscription).collect()
  }

  async fn put_subscription(&self, uid: &Uid, subscription: Subscription) -> Result<()> {
    let uid_str    = uid.as_str().to_owned();
    let status_str = encode_status(subscription.status);
    let period_end = subscription.current_period_end.map(encode_dt);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO subscriptions
             (uid, subscription_id, status, cancel_at_period_end, current_period_end)
           VALUES (?1, ?2, ?3, ?4, ?5)
           ON CONFLICT (uid, subscription_id) DO UPDATE SET
             status               = excluded.status,
             cancel_at_period_end = excluded.cancel_at_period_end,
             current_period_end   = excluded.current_period_end",
          rusqlite::params![
            uid_str,
            subscription.id,
            status_str,
            subscription.cancel_at_period_end,
            period_end,
          ],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn list_templates(&self) -> Result<Vec<Template>> {
    let docs: Vec<String> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare("SELECT doc_json FROM templates ORDER BY rowid")?;
        let rows = stmt
          .query_map([], |row| row.get(0))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    docs
      .iter()
      .map(|doc| Ok(serde_json::from_str(doc)?))
      .collect()
  }

  async fn put_template(&self, template: Template) -> Result<()> {
    let id  = template.id.clone();
    let doc = serde_json::to_string(&template)?;

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO templates (template_id, doc_json) VALUES (?1, ?2)
           ON CONFLICT (template_id) DO UPDATE SET doc_json = excluded.doc_json",
          rusqlite::params![id, doc],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

// ─── AccountStore impl ───────────────────────────────────────────────────────

impl AccountStore for SqliteStore {
  type Error = crate::Error;

  async fn create_account(&self, account: Account) -> Result<Registration> {
    let uid_str   = account.uid.as_str().to_owned();
    let email     = account.email.clone();
    let hash      = account.password_hash.clone();
    let at_str    = encode_dt(account.created_at);

    let created = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let taken = tx
          .query_row(
            "SELECT 1 FROM accounts WHERE email = ?1",
            rusqlite::params![email],
            |_| Ok(true),
          )
          .optional()?
          .unwrap_or(false);
        if taken {
          return Ok(false);
        }

        tx.execute(
          "INSERT INTO users (uid, created_at) VALUES (?1, ?2)",
          rusqlite::params![uid_str, at_str],
        )?;
        tx.execute(
          "INSERT INTO accounts (uid, email, password_hash, created_at)
           VALUES (?1, ?2, ?3, ?4)",
          rusqlite::params![uid_str, email, hash, at_str],
        )?;

        tx.commit()?;
        Ok(true)
      })
      .await?;

    Ok(if created { Registration::Created(account) } else { Registration::EmailTaken })
  }

  async fn find_account_by_email(&self, email: &str) -> Result<Option<Account>> {
    let email = email.to_owned();

    let raw: Option<RawAccount> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT uid, email, password_hash, created_at FROM accounts WHERE email = ?1",
              rusqlite::params![email],
              |row| {
                Ok(RawAccount {
                  uid:           row.get(0)?,
                  email:         row.get(1)?,
                  password_hash: row.get(2)?,
                  created_at:    row.get(3)?,
                })
              },
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawAccount::into_account).transpose()
  }

  async fn set_password_hash(&self, uid: &Uid, password_hash: String) -> Result<bool> {
    let uid_str = uid.as_str().to_owned();

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE accounts SET password_hash = ?1 WHERE uid = ?2",
          rusqlite::params![password_hash, uid_str],
        )?)
      })
      .await?;

    Ok(changed > 0)
  }

  async fn put_reset_token(&self, token: ResetToken) -> Result<()> {
    let uid_str    = token.uid.as_str().to_owned();
    let expires_at = encode_dt(token.expires_at);
    let now        = encode_dt(Utc::now());

    self
      .conn
      .call(move |conn| {
        // Opportunistically drop expired grants; RFC 3339 UTC strings sort.
        conn.execute(
          "DELETE FROM reset_tokens WHERE expires_at <= ?1",
          rusqlite::params![now],
        )?;
        conn.execute(
          "INSERT INTO reset_tokens (token_hash, uid, expires_at) VALUES (?1, ?2, ?3)",
          rusqlite::params![token.token_hash, uid_str, expires_at],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn take_reset_token(&self, token_hash: &str) -> Result<Option<ResetToken>> {
    let token_hash = token_hash.to_owned();

    let raw: Option<RawResetToken> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "DELETE FROM reset_tokens WHERE token_hash = ?1
               RETURNING token_hash, uid, expires_at",
              rusqlite::params![token_hash],
              |row| {
                Ok(RawResetToken {
                  token_hash: row.get(0)?,
                  uid:        row.get(1)?,
                  expires_at: row.get(2)?,
                })
              },
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawResetToken::into_token).transpose()
  }
}
