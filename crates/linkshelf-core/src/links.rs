//! Pure rules for a user's ordered link collection.
//!
//! Every function here works on an in-memory copy; persisting the result is
//! the caller's job (see [`crate::editor`]).

use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};

use crate::{
  ValidationError,
  link::{Link, LinkId, LinkMetadata, NewLink},
  user::Uid,
};

/// Deliberately permissive: scheme optional, any dotted host, optional port,
/// then anything non-blank after a path, query or fragment delimiter.
static URL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r"(?i)^(https?://)?([a-z0-9-]+\.)+[a-z0-9-]{2,}(:[0-9]+)?([/?#]\S*)?$")
    .expect("link url regex should compile")
});

pub fn is_valid_url(candidate: &str) -> bool { URL_PATTERN.is_match(candidate.trim()) }

// ─── Append ──────────────────────────────────────────────────────────────────

/// Id for the next appended link: the current count plus one.
///
/// Ids are not reclaimed on delete, so after deletions this can equal an id
/// still in use; see [`id_collides`].
pub fn next_link_id(links: &[Link]) -> LinkId { links.len() as LinkId + 1 }

/// Whether `id` is already taken in `links`.
pub fn id_collides(links: &[Link], id: LinkId) -> bool { links.iter().any(|l| l.id == id) }

/// A validated link waiting for its id.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkDraft {
  title:     String,
  link:      String,
  metadata:  LinkMetadata,
  layout:    Option<String>,
  link_type: Option<String>,
}

impl LinkDraft {
  /// The stored form; new links start inactive.
  pub fn into_link(self, id: LinkId) -> Link {
    Link {
      id,
      title: self.title,
      link: self.link,
      active: false,
      metadata: self.metadata,
      layout: self.layout,
      link_type: self.link_type,
      extra: Map::new(),
    }
  }
}

/// Check the required fields of an append request.
pub fn validate_new_link(uid: &Uid, input: NewLink) -> Result<LinkDraft, ValidationError> {
  if uid.is_empty() {
    return Err(ValidationError::Missing("uid"));
  }

  let title = input
    .title
    .filter(|t| !t.trim().is_empty())
    .ok_or(ValidationError::Missing("title"))?;

  let link = input
    .link
    .map(|l| l.trim().to_owned())
    .filter(|l| !l.is_empty())
    .ok_or(ValidationError::Missing("link"))?;

  let metadata = input
    .metadata
    .filter(|m| !m.is_null())
    .ok_or(ValidationError::Missing("metadata"))?;

  if !is_valid_url(&link) {
    return Err(ValidationError::InvalidUrl(link));
  }

  Ok(LinkDraft {
    title,
    link,
    metadata: LinkMetadata::from(metadata),
    layout: input.layout,
    link_type: input.link_type,
  })
}

/// Array-union: append `link` unless an identical element is already present.
/// Returns whether the collection grew.
pub fn union_link(links: &mut Vec<Link>, link: Link) -> bool {
  if links.contains(&link) {
    return false;
  }
  links.push(link);
  true
}

// ─── Mutations by id ─────────────────────────────────────────────────────────

/// Copy of `links` with the `active` flag of `id` replaced.
pub fn set_active(links: &[Link], id: LinkId, active: bool) -> Vec<Link> {
  links
    .iter()
    .cloned()
    .map(|mut l| {
      if l.id == id {
        l.active = active;
      }
      l
    })
    .collect()
}

/// Copy of `links` with one named field of `id` replaced.
pub fn set_field(
  links: &[Link],
  id: LinkId,
  field: &str,
  value: Value,
) -> Result<Vec<Link>, ValidationError> {
  links
    .iter()
    .cloned()
    .map(|mut l| -> Result<Link, ValidationError> {
      if l.id == id {
        l.set_field(field, value.clone())?;
      }
      Ok(l)
    })
    .collect()
}

/// Copy of `links` without any element whose id is `id`.
pub fn delete_link(links: &[Link], id: LinkId) -> Vec<Link> {
  links.iter().filter(|l| l.id != id).cloned().collect()
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;

  fn uid() -> Uid { Uid::new("u1") }

  fn new_link(title: &str, url: &str) -> NewLink {
    NewLink {
      title: Some(title.into()),
      link: Some(url.into()),
      metadata: Some(json!({ "mediaType": "website", "title": title })),
      ..NewLink::default()
    }
  }

  fn collection(n: u64) -> Vec<Link> {
    (1..=n)
      .map(|i| {
        validate_new_link(&uid(), new_link(&format!("link {i}"), "example.com"))
          .unwrap()
          .into_link(i)
      })
      .collect()
  }

  #[test]
  fn permissive_urls() {
    for ok in [
      "example.com",
      "https://example.com",
      "http://sub.example.co.uk:8080/path?q=1#frag",
      "WWW.Example.COM/a/b",
      "example.com:3000",
      "example.com:123456/any-length-port",
    ] {
      assert!(is_valid_url(ok), "{ok} should be accepted");
    }
    for bad in ["", "not a url", "localhost", "ftp://example.com", "https://exa mple.com"] {
      assert!(!is_valid_url(bad), "{bad} should be rejected");
    }
  }

  #[test]
  fn next_id_is_count_plus_one() {
    assert_eq!(next_link_id(&[]), 1);
    assert_eq!(next_link_id(&collection(3)), 4);
  }

  #[test]
  fn next_id_can_collide_after_delete() {
    let links = delete_link(&collection(3), 1);
    let id = next_link_id(&links);
    assert_eq!(id, 3);
    assert!(id_collides(&links, id));
  }

  #[test]
  fn validation_requires_every_field() {
    let full = new_link("Blog", "blog.example.com");

    let mut missing_title = full.clone();
    missing_title.title = Some("  ".into());
    assert_eq!(
      validate_new_link(&uid(), missing_title),
      Err(ValidationError::Missing("title"))
    );

    let mut missing_link = full.clone();
    missing_link.link = None;
    assert_eq!(
      validate_new_link(&uid(), missing_link),
      Err(ValidationError::Missing("link"))
    );

    let mut missing_metadata = full.clone();
    missing_metadata.metadata = Some(Value::Null);
    assert_eq!(
      validate_new_link(&uid(), missing_metadata),
      Err(ValidationError::Missing("metadata"))
    );

    assert_eq!(
      validate_new_link(&Uid::new(""), full.clone()),
      Err(ValidationError::Missing("uid"))
    );

    let mut bad_url = full;
    bad_url.link = Some("nowhere".into());
    assert_eq!(
      validate_new_link(&uid(), bad_url),
      Err(ValidationError::InvalidUrl("nowhere".into()))
    );
  }

  #[test]
  fn drafts_start_inactive_and_strip_nulls() {
    let mut input = new_link("Blog", "blog.example.com");
    input.metadata = Some(json!({ "title": "Blog", "description": null }));
    let link = validate_new_link(&uid(), input).unwrap().into_link(7);

    assert_eq!(link.id, 7);
    assert!(!link.active);
    assert_eq!(serde_json::to_value(&link.metadata).unwrap(), json!({ "title": "Blog" }));
  }

  #[test]
  fn union_skips_identical_elements() {
    let mut links = collection(2);
    let dup = links[1].clone();
    assert!(!union_link(&mut links, dup));
    assert_eq!(links.len(), 2);

    let fresh = collection(3).pop().unwrap();
    assert!(union_link(&mut links, fresh));
    assert_eq!(links.len(), 3);
  }

  #[test]
  fn set_active_is_idempotent() {
    let links = collection(3);
    let once = set_active(&links, 2, true);
    let twice = set_active(&once, 2, true);
    assert_eq!(once, twice);
    assert!(once[1].active);
    assert!(!once[0].active && !once[2].active);
  }

  #[test]
  fn set_field_preserves_order_and_other_links() {
    let links = collection(3);
    let updated = set_field(&links, 3, "title", json!("Renamed")).unwrap();
    assert_eq!(updated[2].title, "Renamed");
    assert_eq!(&updated[..2], &links[..2]);
  }

  #[test]
  fn set_field_on_missing_id_is_a_no_op() {
    let links = collection(2);
    assert_eq!(set_field(&links, 42, "title", json!("x")).unwrap(), links);
  }

  #[test]
  fn delete_is_idempotent_and_ignores_unknown_ids() {
    let links = collection(3);
    assert_eq!(delete_link(&links, 99), links);

    let once = delete_link(&links, 2);
    let twice = delete_link(&once, 2);
    assert_eq!(once, twice);
    assert_eq!(once.iter().map(|l| l.id).collect::<Vec<_>>(), vec![1, 3]);
  }
}
