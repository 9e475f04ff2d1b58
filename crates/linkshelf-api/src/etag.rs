//! ETags for a user's link collection.
//!
//! The tag is a SHA-256 over the uid and the collection revision, so it
//! changes with every write and never collides between users.

use axum::http::{HeaderMap, header};
use linkshelf_core::{link::Revision, user::Uid};
use sha2::{Digest, Sha256};

/// Quoted ETag for `uid`'s collection at `revision`.
pub fn links_etag(uid: &Uid, revision: Revision) -> String {
  let mut hasher = Sha256::new();
  hasher.update(uid.as_str().as_bytes());
  hasher.update([0u8]);
  hasher.update(revision.0.to_le_bytes());
  format!("\"{}\"", hex::encode(hasher.finalize()))
}

/// The `If-Match` value of `headers`, if present.
pub fn if_match(headers: &HeaderMap) -> Option<&str> {
  headers
    .get(header::IF_MATCH)
    .and_then(|v| v.to_str().ok())
    .map(str::trim)
}

/// Whether an `If-Match` value names `etag`. Quotes are optional; `*` matches
/// anything.
pub fn matches(if_match: &str, etag: &str) -> bool {
  if_match == "*"
    || if_match
      .split(',')
      .map(|t| t.trim().trim_start_matches("W/").trim_matches('"'))
      .any(|t| t == etag.trim_matches('"'))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn revision_changes_etag() {
    let uid = Uid::new("u1");
    assert_ne!(links_etag(&uid, Revision(1)), links_etag(&uid, Revision(2)));
  }

  #[test]
  fn uid_changes_etag() {
    assert_ne!(
      links_etag(&Uid::new("u1"), Revision(1)),
      links_etag(&Uid::new("u2"), Revision(1))
    );
  }

  #[test]
  fn etag_is_quoted_hex() {
    let tag = links_etag(&Uid::new("u1"), Revision(0));
    assert!(tag.starts_with('"') && tag.ends_with('"'));
    assert_eq!(tag.len(), 66);
  }

  #[test]
  fn quotes_are_optional() {
    let tag = links_etag(&Uid::new("u1"), Revision(3));
    assert!(matches(&tag, &tag));
    assert!(matches(tag.trim_matches('"'), &tag));
    assert!(matches("*", &tag));
    assert!(matches(&format!("\"nope\", {tag}"), &tag));
    assert!(!matches("\"stale\"", &tag));
  }
}
