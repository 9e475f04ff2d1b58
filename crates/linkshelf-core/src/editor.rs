//! Link-collection mutations against a [`ProfileStore`].
//!
//! Append uses the store's atomic union. Every other mutation is a whole-
//! collection read-modify-write that carries the revision it read into the
//! write; if another writer got there first the write is refused with
//! [`Error::Conflict`] instead of silently losing their update. Nothing is
//! retried.

use serde_json::Value;

use crate::{
  Error, Result, ValidationError,
  link::{Link, LinkCollection, LinkId, NewLink, Revision},
  links,
  store::{ProfileStore, WriteOutcome},
  user::Uid,
};

/// What an append produced.
#[derive(Debug, Clone)]
pub struct Appended {
  pub link:         Link,
  /// The full collection after the append.
  pub collection:   LinkCollection,
  /// The count-based id was already in use before this append.
  pub id_collision: bool,
}

/// Validate `input`, assign `count + 1` as its id and union it into the
/// collection.
pub async fn append_link<S: ProfileStore>(store: &S, uid: &Uid, input: NewLink) -> Result<Appended> {
  let draft = links::validate_new_link(uid, input)?;

  let current = read(store, uid).await?;
  let id = links::next_link_id(&current.links);
  let id_collision = links::id_collides(&current.links, id);
  let link = draft.into_link(id);

  let collection = store
    .union_link(uid, link.clone())
    .await
    .map_err(Error::store)?
    .ok_or_else(|| Error::UserNotFound(uid.clone()))?;

  Ok(Appended { link, collection, id_collision })
}

/// Overwrite the whole collection, e.g. after a reorder.
///
/// With `expected` set the write is conditional on that revision; without it
/// the last writer wins.
pub async fn replace_links<S: ProfileStore>(
  store: &S,
  uid: &Uid,
  links: Vec<Link>,
  expected: Option<Revision>,
) -> Result<LinkCollection> {
  let outcome = store.write_links(uid, links, expected).await.map_err(Error::store)?;
  written(uid, outcome)
}

pub async fn set_link_active<S: ProfileStore>(
  store: &S,
  uid: &Uid,
  id: LinkId,
  active: bool,
) -> Result<LinkCollection> {
  rewrite(store, uid, |links| Ok(links::set_active(links, id, active))).await
}

pub async fn set_link_field<S: ProfileStore>(
  store: &S,
  uid: &Uid,
  id: LinkId,
  field: &str,
  value: Value,
) -> Result<LinkCollection> {
  rewrite(store, uid, |links| links::set_field(links, id, field, value)).await
}

/// Remove the link with `id`. Unknown ids leave the collection untouched.
pub async fn delete_link<S: ProfileStore>(store: &S, uid: &Uid, id: LinkId) -> Result<LinkCollection> {
  rewrite(store, uid, |links| Ok(links::delete_link(links, id))).await
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

pub async fn read<S: ProfileStore>(store: &S, uid: &Uid) -> Result<LinkCollection> {
  store
    .get_links(uid)
    .await
    .map_err(Error::store)?
    .ok_or_else(|| Error::UserNotFound(uid.clone()))
}

/// Read, transform, and write back conditionally. An unchanged collection is
/// not written at all.
async fn rewrite<S, F>(store: &S, uid: &Uid, transform: F) -> Result<LinkCollection>
where
  S: ProfileStore,
  F: FnOnce(&[Link]) -> Result<Vec<Link>, ValidationError>,
{
  let current = read(store, uid).await?;
  let next = transform(&current.links)?;

  if next == current.links {
    return Ok(current);
  }

  let outcome = store
    .write_links(uid, next, Some(current.revision))
    .await
    .map_err(Error::store)?;
  written(uid, outcome)
}

fn written(uid: &Uid, outcome: WriteOutcome) -> Result<LinkCollection> {
  match outcome {
    WriteOutcome::Written(collection) => Ok(collection),
    WriteOutcome::Stale { .. } => Err(Error::Conflict(uid.clone())),
    WriteOutcome::UserNotFound => Err(Error::UserNotFound(uid.clone())),
  }
}
