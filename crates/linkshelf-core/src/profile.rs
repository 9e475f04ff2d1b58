//! Profile-level operations over any [`ProfileStore`].

use crate::{
  Error, ResolveError, Result,
  store::{ClaimOutcome, ProfileStore},
  subscription::has_active_subscription,
  user::{PublicProfile, Uid, User, validate_username},
};

/// Resolve a raw path segment to the public profile it names.
///
/// The segment is matched exactly; no trimming or case folding.
pub async fn resolve_profile<S: ProfileStore>(
  store: &S,
  username: &str,
) -> Result<PublicProfile, ResolveError> {
  let user = store
    .find_user_by_username(username)
    .await
    .map_err(|e| ResolveError::Backend(Box::new(e)))?
    .ok_or_else(|| ResolveError::NotFound(username.to_owned()))?;

  Ok(PublicProfile::from_user(user, username.to_owned()))
}

/// Whether `username` is held by anyone (exact match).
pub async fn is_username_taken<S: ProfileStore>(store: &S, username: &str) -> Result<bool> {
  store.username_exists(username).await.map_err(Error::store)
}

/// Check availability, then set the username.
///
/// The check and the write are separate steps; a concurrent claim between
/// them is reported as [`Error::UsernameTaken`] by the store's own
/// uniqueness guard.
pub async fn claim_username<S: ProfileStore>(store: &S, uid: &Uid, username: &str) -> Result<User> {
  validate_username(username)?;

  if is_username_taken(store, username).await? {
    return Err(Error::UsernameTaken(username.to_owned()));
  }

  match store.claim_username(uid, username).await.map_err(Error::store)? {
    ClaimOutcome::Claimed(user) => Ok(user),
    ClaimOutcome::Taken => Err(Error::UsernameTaken(username.to_owned())),
    ClaimOutcome::AlreadySet => Err(Error::UsernameAlreadySet),
    ClaimOutcome::UserNotFound => Err(Error::UserNotFound(uid.clone())),
  }
}

/// Derive the subscription flag from the user's subscription records.
pub async fn subscription_active<S: ProfileStore>(store: &S, uid: &Uid) -> Result<bool> {
  let subscriptions = store.list_subscriptions(uid).await.map_err(Error::store)?;
  Ok(has_active_subscription(&subscriptions))
}
