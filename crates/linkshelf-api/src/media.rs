//! Image proxy and uploads.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/downloadImage?url=` | Raw image bytes from a remote URL |
//! | `POST` | `/me/photo` | Auth; multipart `file`; sets `photoUrl` |
//! | `POST` | `/me/images` | Auth; multipart `file`; compressed; 201 `{"url"}` |
//! | `POST` | `/me/images/import` | Auth; body: `{"url"}`; fetched, compressed; 201 `{"url"}` |

use axum::{
  Json,
  body::Bytes,
  extract::{Multipart, Query, State},
  http::{HeaderValue, StatusCode, header},
  response::{IntoResponse, Response},
};
use chrono::Utc;
use linkshelf_core::{
  store::ProfileStore,
  user::{ProfileUpdate, Uid, User},
};
use linkshelf_media::{BlobPath, Compressed, compress_image};
use serde::{Deserialize, Serialize};

use crate::{ApiState, AuthUser, Backend, error::ApiError};

/// An uploaded multipart `file` field.
struct Upload {
  filename: String,
  data:     Bytes,
}

async fn read_file_field(mut multipart: Multipart) -> Result<Upload, ApiError> {
  while let Some(field) = multipart
    .next_field()
    .await
    .map_err(|e| ApiError::BadRequest(format!("multipart error: {e}")))?
  {
    if field.name() != Some("file") {
      continue;
    }

    let filename = field
      .file_name()
      .filter(|n| !n.trim().is_empty())
      .unwrap_or("upload")
      .to_owned();
    let data = field
      .bytes()
      .await
      .map_err(|e| ApiError::BadRequest(format!("failed to read field: {e}")))?;

    return Ok(Upload { filename, data });
  }

  Err(ApiError::BadRequest("missing 'file' field in multipart form".into()))
}

/// Run the compressor off the async runtime.
async fn compress<S: Backend>(state: &ApiState<S>, data: Bytes) -> Result<Compressed, ApiError> {
  let options = state.settings.compress;
  tokio::task::spawn_blocking(move || compress_image(&data, options))
    .await
    .map_err(ApiError::store)?
    .map_err(ApiError::from)
}

async fn store_user_image<S: Backend>(
  state: &ApiState<S>,
  uid: &Uid,
  filename: &str,
  data: Bytes,
) -> Result<String, ApiError> {
  let compressed = compress(state, data).await?;
  let filename = if compressed.reencoded {
    with_extension_for(filename, compressed.content_type)
  } else {
    filename.to_owned()
  };
  let path = BlobPath::user_image(uid, Utc::now().timestamp_millis(), &filename)?;

  let url = state
    .blobs
    .put(&path, &compressed.bytes)
    .await
    .inspect_err(|e| tracing::error!(uid = %uid, path = %path, error = %e, "image upload failed"))?;

  tracing::info!(
    uid = %uid,
    path = %path,
    size = compressed.bytes.len(),
    content_type = compressed.content_type,
    reencoded = compressed.reencoded,
    "image stored"
  );
  Ok(url)
}

/// `filename` with its extension replaced to match `content_type`.
fn with_extension_for(filename: &str, content_type: &str) -> String {
  let ext = match content_type {
    "image/jpeg" => "jpg",
    "image/png" => "png",
    "image/gif" => "gif",
    "image/webp" => "webp",
    _ => return filename.to_owned(),
  };
  let stem = filename
    .rsplit_once('.')
    .map_or(filename, |(stem, _)| stem)
    .trim_end_matches('.');
  let stem = if stem.is_empty() { "image" } else { stem };
  format!("{stem}.{ext}")
}

#[derive(Debug, Serialize)]
pub struct Uploaded {
  pub url: String,
}

// ─── Proxy ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct DownloadParams {
  pub url: String,
}

/// `GET /downloadImage?url=<encoded URL>`
pub async fn download_image<S: Backend>(
  State(state): State<ApiState<S>>,
  Query(params): Query<DownloadParams>,
) -> Result<Response, ApiError> {
  let image = state
    .fetcher
    .fetch(&params.url)
    .await
    .inspect_err(|e| tracing::warn!(url = %params.url, error = %e, "image proxy failed"))?;

  let mut res = image.bytes.into_response();
  let headers = res.headers_mut();
  headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(image.content_type));
  headers.insert(header::X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
  Ok(res)
}

// ─── Uploads ─────────────────────────────────────────────────────────────────

/// `POST /me/photo`
///
/// The picture is stored as uploaded under `profilePictures/{uid}/{filename}`;
/// re-using a filename replaces the earlier picture.
pub async fn upload_photo<S: Backend>(
  State(state): State<ApiState<S>>,
  auth: AuthUser,
  multipart: Multipart,
) -> Result<Json<User>, ApiError> {
  let upload = read_file_field(multipart).await?;
  let path = BlobPath::profile_picture(&auth.uid, &upload.filename)?;

  let url = state
    .blobs
    .put(&path, &upload.data)
    .await
    .inspect_err(|e| tracing::error!(uid = %auth.uid, error = %e, "photo upload failed"))?;

  // A failure here leaves the stored blob unreferenced.
  let user = state
    .store
    .update_profile(&auth.uid, ProfileUpdate { photo_url: Some(url), ..Default::default() })
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("user {} not found", auth.uid)))?;

  tracing::info!(uid = %auth.uid, path = %path, "profile picture updated");
  Ok(Json(user))
}

/// `POST /me/images`
pub async fn upload_image<S: Backend>(
  State(state): State<ApiState<S>>,
  auth: AuthUser,
  multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
  let upload = read_file_field(multipart).await?;
  let url = store_user_image(&state, &auth.uid, &upload.filename, upload.data).await?;
  Ok((StatusCode::CREATED, Json(Uploaded { url })))
}

#[derive(Debug, Deserialize)]
pub struct ImportBody {
  pub url: String,
}

/// Last path segment of `url`, or `image`.
fn filename_from_url(url: &str) -> String {
  let without_query = url.split(['?', '#']).next().unwrap_or(url);
  let without_scheme = without_query
    .split_once("://")
    .map_or(without_query, |(_, rest)| rest);

  without_scheme
    .split_once('/')
    .and_then(|(_, path)| path.rsplit('/').next())
    .filter(|s| !s.is_empty())
    .unwrap_or("image")
    .to_owned()
}

/// `POST /me/images/import`
pub async fn import_image<S: Backend>(
  State(state): State<ApiState<S>>,
  auth: AuthUser,
  Json(body): Json<ImportBody>,
) -> Result<impl IntoResponse, ApiError> {
  let image = state
    .fetcher
    .fetch(&body.url)
    .await
    .inspect_err(|e| tracing::warn!(url = %body.url, error = %e, "image import failed"))?;

  let filename = filename_from_url(&body.url);
  let url = store_user_image(&state, &auth.uid, &filename, image.bytes).await?;
  Ok((StatusCode::CREATED, Json(Uploaded { url })))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn filename_is_last_segment() {
    assert_eq!(filename_from_url("https://cdn.example/a/b/cat.png?x=1"), "cat.png");
    assert_eq!(filename_from_url("https://cdn.example/a/b/"), "image");
    assert_eq!(filename_from_url("https://cdn.example"), "image");
  }

  #[test]
  fn reencoded_images_get_a_matching_extension() {
    assert_eq!(with_extension_for("cat.png", "image/jpeg"), "cat.jpg");
    assert_eq!(with_extension_for("archive.tar.png", "image/jpeg"), "archive.tar.jpg");
    assert_eq!(with_extension_for("upload", "image/jpeg"), "upload.jpg");
    assert_eq!(with_extension_for(".png", "image/jpeg"), "image.jpg");
    assert_eq!(with_extension_for("cat.png", "application/octet-stream"), "cat.png");
  }
}
