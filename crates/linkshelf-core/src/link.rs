//! Link records and their preview metadata.
//!
//! A user's links are an ordered sequence stored inside the user document.
//! Ids are small integers unique within one user's collection.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::ValidationError;

pub type LinkId = u64;

// ─── Revision ────────────────────────────────────────────────────────────────

/// Write counter of a user document's link collection; bumped on every write.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Revision(pub u64);

/// A link collection as read from the store, with the revision it was read at.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkCollection {
  pub links:    Vec<Link>,
  pub revision: Revision,
}

// ─── Link ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Link {
  pub id:        LinkId,
  #[serde(default)]
  pub title:     String,
  /// Target URL.
  #[serde(default)]
  pub link:      String,
  #[serde(default)]
  pub active:    bool,
  #[serde(default)]
  pub metadata:  LinkMetadata,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub layout:    Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub link_type: Option<String>,
  /// Any other document fields, kept so arbitrary field writes round-trip.
  #[serde(flatten)]
  pub extra:     Map<String, Value>,
}

impl Link {
  /// Overwrite one field by its document name.
  ///
  /// Unknown names land in [`Link::extra`]; a `null` value removes them.
  pub fn set_field(&mut self, field: &str, value: Value) -> Result<(), ValidationError> {
    match field {
      "id" => return Err(ValidationError::ImmutableField(field.to_owned())),
      "title" => self.title = expect_string(field, value)?,
      "link" => self.link = expect_string(field, value)?,
      "active" => {
        self.active = value.as_bool().ok_or_else(|| ValidationError::FieldType {
          field:    field.to_owned(),
          expected: "boolean",
        })?
      }
      "metadata" => self.metadata = LinkMetadata::from(value),
      "layout" => self.layout = expect_optional_string(field, value)?,
      "linkType" => self.link_type = expect_optional_string(field, value)?,
      other => {
        if value.is_null() {
          self.extra.remove(other);
        } else {
          self.extra.insert(other.to_owned(), value);
        }
      }
    }
    Ok(())
  }
}

fn expect_string(field: &str, value: Value) -> Result<String, ValidationError> {
  match value {
    Value::String(s) => Ok(s),
    _ => Err(ValidationError::FieldType { field: field.to_owned(), expected: "string" }),
  }
}

fn expect_optional_string(field: &str, value: Value) -> Result<Option<String>, ValidationError> {
  match value {
    Value::Null => Ok(None),
    other => expect_string(field, other).map(Some),
  }
}

// ─── NewLink ─────────────────────────────────────────────────────────────────

/// Caller input for appending a link. Everything is optional at the type
/// level so that missing fields surface as validation errors.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewLink {
  pub title:     Option<String>,
  pub link:      Option<String>,
  pub metadata:  Option<Value>,
  pub layout:    Option<String>,
  pub link_type: Option<String>,
}

// ─── Metadata ────────────────────────────────────────────────────────────────

/// Link preview data, keyed by its declared `mediaType`.
///
/// Known media types parse into typed shapes; everything else is carried
/// through untouched. `null` members are stripped on the way in.
#[derive(Debug, Clone, PartialEq)]
pub enum LinkMetadata {
  Known(KnownMetadata),
  Opaque(Value),
}

impl Default for LinkMetadata {
  fn default() -> Self { Self::Opaque(Value::Object(Map::new())) }
}

/// Media types with a typed shape.
pub const KNOWN_MEDIA_TYPES: &[&str] = &["website", "video", "image"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mediaType", rename_all = "lowercase")]
pub enum KnownMetadata {
  Website(WebsiteMetadata),
  Video(VideoMetadata),
  Image(ImageMetadata),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebsiteMetadata {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub title:       Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub description: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub image:       Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub favicon:     Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub site_name:   Option<String>,
  #[serde(flatten)]
  pub extra:       Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoMetadata {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub title:     Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub thumbnail: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub provider:  Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub embed_url: Option<String>,
  #[serde(flatten)]
  pub extra:     Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageMetadata {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub url:    Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub width:  Option<u32>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub height: Option<u32>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub alt:    Option<String>,
  #[serde(flatten)]
  pub extra:  Map<String, Value>,
}

impl LinkMetadata {
  /// A preview image URL suitable for a thumbnail, when the shape has one.
  pub fn thumbnail(&self) -> Option<&str> {
    match self {
      Self::Known(KnownMetadata::Website(w)) => w.image.as_deref(),
      Self::Known(KnownMetadata::Video(v)) => v.thumbnail.as_deref(),
      Self::Known(KnownMetadata::Image(i)) => i.url.as_deref(),
      Self::Opaque(_) => None,
    }
  }
}

impl From<Value> for LinkMetadata {
  fn from(mut value: Value) -> Self {
    strip_nulls(&mut value);

    let declared_known = value
      .get("mediaType")
      .and_then(Value::as_str)
      .is_some_and(|t| KNOWN_MEDIA_TYPES.contains(&t));

    if declared_known && let Ok(known) = serde_json::from_value::<KnownMetadata>(value.clone()) {
      return Self::Known(known);
    }
    Self::Opaque(value)
  }
}

impl Serialize for LinkMetadata {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    match self {
      Self::Known(known) => known.serialize(serializer),
      Self::Opaque(value) => value.serialize(serializer),
    }
  }
}

impl<'de> Deserialize<'de> for LinkMetadata {
  fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
    Value::deserialize(deserializer).map(Self::from)
  }
}

/// Remove `null` object members at every depth. Array elements are kept in
/// place so positions stay meaningful.
pub fn strip_nulls(value: &mut Value) {
  match value {
    Value::Object(map) => {
      map.retain(|_, v| !v.is_null());
      map.values_mut().for_each(strip_nulls);
    }
    Value::Array(items) => items.iter_mut().for_each(strip_nulls),
    _ => {}
  }
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;

  #[test]
  fn website_metadata_parses_into_known_shape() {
    let meta = LinkMetadata::from(json!({
      "mediaType": "website",
      "title": "Rust",
      "siteName": "rust-lang.org",
      "themeColor": "#000",
    }));

    let LinkMetadata::Known(KnownMetadata::Website(w)) = &meta else {
      panic!("expected website metadata, got {meta:?}");
    };
    assert_eq!(w.title.as_deref(), Some("Rust"));
    assert_eq!(w.site_name.as_deref(), Some("rust-lang.org"));
    assert_eq!(w.extra.get("themeColor"), Some(&json!("#000")));
    assert_eq!(serde_json::to_value(&meta).unwrap()["mediaType"], "website");
  }

  #[test]
  fn unknown_media_type_is_opaque_passthrough() {
    let raw = json!({ "mediaType": "podcast", "feed": { "episodes": 3 } });
    let meta = LinkMetadata::from(raw.clone());
    assert_eq!(meta, LinkMetadata::Opaque(raw.clone()));
    assert_eq!(serde_json::to_value(&meta).unwrap(), raw);
  }

  #[test]
  fn known_tag_with_bad_payload_falls_back_to_opaque() {
    let raw = json!({ "mediaType": "image", "width": "wide" });
    assert!(matches!(LinkMetadata::from(raw), LinkMetadata::Opaque(_)));
  }

  #[test]
  fn nulls_are_stripped_recursively() {
    let meta = LinkMetadata::from(json!({
      "a": null,
      "b": { "c": null, "d": 1 },
      "e": [ { "f": null } ],
    }));
    assert_eq!(
      serde_json::to_value(&meta).unwrap(),
      json!({ "b": { "d": 1 }, "e": [ {} ] })
    );
  }

  #[test]
  fn known_metadata_serialises_with_tag() {
    let meta = LinkMetadata::from(json!({ "mediaType": "video", "embedUrl": "https://v.example/1" }));
    assert_eq!(
      serde_json::to_value(&meta).unwrap(),
      json!({ "mediaType": "video", "embedUrl": "https://v.example/1" })
    );
  }

  fn sample_link() -> Link {
    Link {
      id:        1,
      title:     "Blog".into(),
      link:      "https://blog.example.com".into(),
      active:    false,
      metadata:  LinkMetadata::default(),
      layout:    None,
      link_type: None,
      extra:     Map::new(),
    }
  }

  #[test]
  fn set_field_updates_typed_and_extra_fields() {
    let mut link = sample_link();
    link.set_field("title", json!("Notes")).unwrap();
    link.set_field("linkType", json!("social")).unwrap();
    link.set_field("clicks", json!(12)).unwrap();

    assert_eq!(link.title, "Notes");
    assert_eq!(link.link_type.as_deref(), Some("social"));
    assert_eq!(link.extra.get("clicks"), Some(&json!(12)));

    link.set_field("clicks", Value::Null).unwrap();
    assert!(link.extra.is_empty());
  }

  #[test]
  fn set_field_rejects_id_and_wrong_types() {
    let mut link = sample_link();
    assert_eq!(
      link.set_field("id", json!(9)),
      Err(ValidationError::ImmutableField("id".into()))
    );
    assert!(matches!(
      link.set_field("active", json!("yes")),
      Err(ValidationError::FieldType { .. })
    ));
    assert_eq!(link, sample_link());
  }

  #[test]
  fn link_documents_round_trip_unknown_fields() {
    let raw = json!({
      "id": 3,
      "title": "Shop",
      "link": "shop.example.com",
      "active": true,
      "metadata": {},
      "linkType": "commerce",
      "pinned": true,
    });
    let link: Link = serde_json::from_value(raw.clone()).unwrap();
    assert_eq!(link.extra.get("pinned"), Some(&json!(true)));
    assert_eq!(serde_json::to_value(&link).unwrap(), raw);
  }
}
