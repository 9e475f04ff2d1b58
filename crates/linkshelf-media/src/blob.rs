//! Filesystem blob storage addressed by slash-separated paths.
//!
//! Uploaded images live under a single media root. Every stored blob has a
//! public URL of the form `{base_url}/media/{path}`.

use std::path::{Component, Path, PathBuf};

use linkshelf_core::user::Uid;
use tokio::fs;
use tracing::{debug, info};

use crate::{Error, Result};

// ─── BlobPath ────────────────────────────────────────────────────────────────

/// A validated storage path. Only the constructors below produce one, so a
/// path can never escape the media root.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BlobPath(String);

impl BlobPath {
  /// `profilePictures/{uid}/{filename}`. Re-uploading the same filename
  /// overwrites the previous picture.
  pub fn profile_picture(uid: &Uid, filename: &str) -> Result<Self> {
    Self::from_segments(&["profilePictures", uid.as_str(), filename])
  }

  /// `users/{uid}/images/{timestamp}_{filename}`.
  pub fn user_image(uid: &Uid, timestamp_ms: i64, filename: &str) -> Result<Self> {
    let name = format!("{timestamp_ms}_{filename}");
    Self::from_segments(&["users", uid.as_str(), "images", &name])
  }

  /// Parse a path taken from a request URL.
  pub fn parse(raw: &str) -> Result<Self> {
    let segments: Vec<&str> = raw.split('/').collect();
    let path = Self::from_segments(&segments)?;
    if path.0 != raw {
      return Err(Error::InvalidPath(raw.to_owned()));
    }
    Ok(path)
  }

  pub fn as_str(&self) -> &str { &self.0 }

  fn from_segments(segments: &[&str]) -> Result<Self> {
    let cleaned = segments
      .iter()
      .map(|s| sanitize_segment(s))
      .collect::<Result<Vec<_>>>()?;
    Ok(Self(cleaned.join("/")))
  }
}

impl std::fmt::Display for BlobPath {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { f.write_str(&self.0) }
}

/// Map every character outside `[A-Za-z0-9._-]` to `_`. Empty, `.` and `..`
/// segments are rejected.
fn sanitize_segment(segment: &str) -> Result<String> {
  let cleaned: String = segment
    .trim()
    .chars()
    .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') { c } else { '_' })
    .collect();

  if cleaned.is_empty() || cleaned.chars().all(|c| c == '.') {
    return Err(Error::InvalidPath(segment.to_owned()));
  }
  Ok(cleaned)
}

/// Verify that `target` resolves inside `base`.
fn ensure_within(base: &Path, target: &Path) -> Result<PathBuf> {
  let mut resolved = base.to_path_buf();
  for component in target.strip_prefix(base).unwrap_or(target).components() {
    match component {
      Component::Normal(c) => resolved.push(c),
      Component::CurDir => {}
      _ => return Err(Error::InvalidPath(target.display().to_string())),
    }
  }
  Ok(resolved)
}

// ─── FsBlobStore ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct FsBlobStore {
  root:     PathBuf,
  base_url: String,
}

impl FsBlobStore {
  /// Create the media root if needed.
  pub async fn new(root: PathBuf, base_url: impl Into<String>) -> Result<Self> {
    fs::create_dir_all(&root).await?;
    info!(path = %root.display(), "blob store initialised");

    Ok(Self {
      root,
      base_url: base_url.into().trim_end_matches('/').to_owned(),
    })
  }

  /// Public URL of the blob at `path`.
  pub fn url(&self, path: &BlobPath) -> String { format!("{}/media/{}", self.base_url, path) }

  /// Write `data` at `path`, replacing any previous blob, and return its URL.
  pub async fn put(&self, path: &BlobPath, data: &[u8]) -> Result<String> {
    if data.is_empty() {
      return Err(Error::Empty);
    }

    let file = self.file_path(path)?;
    if let Some(parent) = file.parent() {
      fs::create_dir_all(parent).await?;
    }
    fs::write(&file, data).await?;

    debug!(path = %path, size = data.len(), "stored blob");
    Ok(self.url(path))
  }

  pub async fn get(&self, path: &BlobPath) -> Result<Vec<u8>> {
    let file = self.file_path(path)?;

    match fs::read(&file).await {
      Ok(data) => Ok(data),
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
        Err(Error::NotFound(path.to_string()))
      }
      Err(e) => Err(e.into()),
    }
  }

  fn file_path(&self, path: &BlobPath) -> Result<PathBuf> {
    ensure_within(&self.root, &self.root.join(path.as_str()))
  }
}

#[cfg(test)]
mod tests {
  use tempfile::TempDir;

  use super::*;

  async fn store() -> (FsBlobStore, TempDir) {
    let dir = TempDir::new().unwrap();
    let store = FsBlobStore::new(dir.path().join("media"), "http://localhost:8080/")
      .await
      .unwrap();
    (store, dir)
  }

  #[test]
  fn profile_picture_path() {
    let path = BlobPath::profile_picture(&Uid::new("u1"), "me.png").unwrap();
    assert_eq!(path.as_str(), "profilePictures/u1/me.png");
  }

  #[test]
  fn user_image_path_is_timestamped() {
    let path = BlobPath::user_image(&Uid::new("u1"), 1700000000000, "cat.jpg").unwrap();
    assert_eq!(path.as_str(), "users/u1/images/1700000000000_cat.jpg");
  }

  #[test]
  fn separators_are_neutralised() {
    let path = BlobPath::profile_picture(&Uid::new("u1"), "../../etc/passwd").unwrap();
    assert_eq!(path.as_str(), "profilePictures/u1/.._.._etc_passwd");

    let path = BlobPath::profile_picture(&Uid::new("u1"), "my photo.png").unwrap();
    assert_eq!(path.as_str(), "profilePictures/u1/my_photo.png");
  }

  #[test]
  fn dot_segments_are_rejected() {
    assert!(BlobPath::profile_picture(&Uid::new("u1"), "..").is_err());
    assert!(BlobPath::profile_picture(&Uid::new("u1"), "").is_err());
    assert!(BlobPath::parse("users/../secret").is_err());
    assert!(BlobPath::parse("users//x").is_err());
    assert!(BlobPath::parse("users/a b").is_err());
  }

  #[test]
  fn parse_accepts_constructed_paths() {
    let path = BlobPath::user_image(&Uid::new("u1"), 5, "cat.jpg").unwrap();
    assert_eq!(BlobPath::parse(path.as_str()).unwrap(), path);
  }

  #[tokio::test]
  async fn put_and_get() {
    let (store, _dir) = store().await;
    let path = BlobPath::profile_picture(&Uid::new("u1"), "me.png").unwrap();

    let url = store.put(&path, b"png-bytes").await.unwrap();
    assert_eq!(url, "http://localhost:8080/media/profilePictures/u1/me.png");
    assert_eq!(store.get(&path).await.unwrap(), b"png-bytes");
  }

  #[tokio::test]
  async fn put_overwrites_same_path() {
    let (store, _dir) = store().await;
    let path = BlobPath::profile_picture(&Uid::new("u1"), "me.png").unwrap();

    store.put(&path, b"first").await.unwrap();
    store.put(&path, b"second").await.unwrap();
    assert_eq!(store.get(&path).await.unwrap(), b"second");
  }

  #[tokio::test]
  async fn missing_blob_is_not_found() {
    let (store, _dir) = store().await;
    let path = BlobPath::parse("users/u1/images/nope.jpg").unwrap();
    assert!(matches!(store.get(&path).await, Err(Error::NotFound(_))));
  }

  #[tokio::test]
  async fn empty_blob_rejected() {
    let (store, _dir) = store().await;
    let path = BlobPath::profile_picture(&Uid::new("u1"), "me.png").unwrap();
    assert!(matches!(store.put(&path, b"").await, Err(Error::Empty)));
  }
}
