//! The `ProfileStore` and `AccountStore` traits.
//!
//! Traits are implemented by storage backends (e.g. `linkshelf-store-sqlite`).
//! Higher layers (`linkshelf-api`, `linkshelf-server`) depend on these
//! abstractions, not on any concrete backend.
//!
//! Each user is one document; its link collection is only reachable as a
//! whole. The only per-link primitive is [`ProfileStore::union_link`].

use std::future::Future;

use crate::{
  account::{Account, Registration, ResetToken},
  link::{Link, LinkCollection, Revision},
  subscription::Subscription,
  template::Template,
  user::{ProfileUpdate, Uid, User},
};

// ─── Outcomes ────────────────────────────────────────────────────────────────

/// Result of trying to set a user's username.
#[derive(Debug, Clone)]
pub enum ClaimOutcome {
  Claimed(User),
  /// Another user already holds the name.
  Taken,
  /// This user already has a username.
  AlreadySet,
  UserNotFound,
}

/// Result of a conditional link-collection write.
#[derive(Debug, Clone)]
pub enum WriteOutcome {
  Written(LinkCollection),
  /// The collection moved on since the expected revision was read.
  Stale { current: Revision },
  UserNotFound,
}

// ─── Profiles ────────────────────────────────────────────────────────────────

/// Abstraction over the user-document store.
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes (e.g. tokio with `axum`).
pub trait ProfileStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Users ─────────────────────────────────────────────────────────────

  /// Create an empty user document. Errors if `uid` already exists.
  fn create_user(
    &self,
    uid: Uid,
  ) -> impl Future<Output = Result<User, Self::Error>> + Send + '_;

  /// Retrieve a user document by uid. Returns `None` if not found.
  fn get_user<'a>(
    &'a self,
    uid: &'a Uid,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + 'a;

  /// Exact, case-sensitive lookup by username.
  fn find_user_by_username<'a>(
    &'a self,
    username: &'a str,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + 'a;

  /// Whether any user holds exactly `username`.
  fn username_exists<'a>(
    &'a self,
    username: &'a str,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;

  /// Set the username of a user that has none yet.
  fn claim_username<'a>(
    &'a self,
    uid: &'a Uid,
    username: &'a str,
  ) -> impl Future<Output = Result<ClaimOutcome, Self::Error>> + Send + 'a;

  /// Apply the non-`None` fields of `update`. Returns `None` if the user does
  /// not exist.
  fn update_profile<'a>(
    &'a self,
    uid: &'a Uid,
    update: ProfileUpdate,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + 'a;

  // ── Link collection ───────────────────────────────────────────────────

  /// Read the whole collection with its revision. `None` if no such user.
  fn get_links<'a>(
    &'a self,
    uid: &'a Uid,
  ) -> impl Future<Output = Result<Option<LinkCollection>, Self::Error>> + Send + 'a;

  /// Atomically add `link` with array-union semantics, initialising the
  /// collection if the document has none. `None` if no such user.
  fn union_link<'a>(
    &'a self,
    uid: &'a Uid,
    link: Link,
  ) -> impl Future<Output = Result<Option<LinkCollection>, Self::Error>> + Send + 'a;

  /// Overwrite the collection. With `expected` set the write only happens if
  /// the stored revision still matches.
  fn write_links<'a>(
    &'a self,
    uid: &'a Uid,
    links: Vec<Link>,
    expected: Option<Revision>,
  ) -> impl Future<Output = Result<WriteOutcome, Self::Error>> + Send + 'a;

  // ── Subscriptions & templates ─────────────────────────────────────────

  fn list_subscriptions<'a>(
    &'a self,
    uid: &'a Uid,
  ) -> impl Future<Output = Result<Vec<Subscription>, Self::Error>> + Send + 'a;

  /// Insert or replace one subscription record (keyed by its id).
  fn put_subscription<'a>(
    &'a self,
    uid: &'a Uid,
    subscription: Subscription,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  fn list_templates(&self) -> impl Future<Output = Result<Vec<Template>, Self::Error>> + Send + '_;

  /// Insert or replace one template (keyed by its id).
  fn put_template(
    &self,
    template: Template,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;
}

// ─── Accounts ────────────────────────────────────────────────────────────────

/// Credentials and reset tokens, kept beside the profile store.
pub trait AccountStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Persist `account` together with an empty user document for its uid.
  fn create_account(
    &self,
    account: Account,
  ) -> impl Future<Output = Result<Registration, Self::Error>> + Send + '_;

  /// Look up by normalised email.
  fn find_account_by_email<'a>(
    &'a self,
    email: &'a str,
  ) -> impl Future<Output = Result<Option<Account>, Self::Error>> + Send + 'a;

  /// Replace the password hash. Returns whether the account exists.
  fn set_password_hash<'a>(
    &'a self,
    uid: &'a Uid,
    password_hash: String,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;

  fn put_reset_token(
    &self,
    token: ResetToken,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Remove and return the token with this hash, if any.
  fn take_reset_token<'a>(
    &'a self,
    token_hash: &'a str,
  ) -> impl Future<Output = Result<Option<ResetToken>, Self::Error>> + Send + 'a;
}
