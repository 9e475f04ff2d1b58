//! Handlers for the caller's link collection.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/me/links` | Collection + `ETag` |
//! | `POST`   | `/me/links` | Append; 201 |
//! | `PUT`    | `/me/links` | Replace all; honours `If-Match` |
//! | `PATCH`  | `/me/links/{id}` | Body: `{"field","value"}` |
//! | `PATCH`  | `/me/links/{id}/active` | Body: `{"active": bool}` |
//! | `DELETE` | `/me/links/{id}` | Unknown ids are a no-op |
//!
//! Every response carries the collection's `ETag`.

use axum::{
  Json,
  extract::{Path, State},
  http::{HeaderMap, HeaderValue, StatusCode, header},
  response::{IntoResponse, Response},
};
use linkshelf_core::{
  editor,
  link::{Link, LinkCollection, LinkId, NewLink},
  user::Uid,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
  ApiState, AuthUser, Backend,
  error::ApiError,
  etag::{if_match, links_etag, matches},
};

/// Backend failures are errors; rejected input is only worth a debug line.
fn log_failure<'a>(op: &'static str, uid: &'a Uid) -> impl Fn(&linkshelf_core::Error) + 'a {
  move |e| match e {
    linkshelf_core::Error::Store(_) => tracing::error!(uid = %uid, error = %e, "{op} failed"),
    _ => tracing::debug!(uid = %uid, error = %e, "{op} rejected"),
  }
}

fn with_etag(uid: &Uid, collection: &LinkCollection, mut res: Response) -> Response {
  if let Ok(v) = HeaderValue::from_str(&links_etag(uid, collection.revision)) {
    res.headers_mut().insert(header::ETAG, v);
  }
  res
}

fn collection_response(uid: &Uid, collection: LinkCollection) -> Response {
  let res = Json(&collection).into_response();
  with_etag(uid, &collection, res)
}

// ─── Read ────────────────────────────────────────────────────────────────────

/// `GET /me/links`
pub async fn list<S: Backend>(
  State(state): State<ApiState<S>>,
  auth: AuthUser,
) -> Result<Response, ApiError> {
  let collection = editor::read(state.store.as_ref(), &auth.uid).await?;
  Ok(collection_response(&auth.uid, collection))
}

// ─── Append ──────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppendedBody {
  pub link:         Link,
  pub links:        Vec<Link>,
  pub revision:     u64,
  pub id_collision: bool,
}

/// `POST /me/links`
pub async fn append<S: Backend>(
  State(state): State<ApiState<S>>,
  auth: AuthUser,
  Json(body): Json<NewLink>,
) -> Result<Response, ApiError> {
  let appended = editor::append_link(state.store.as_ref(), &auth.uid, body)
    .await
    .inspect_err(log_failure("append link", &auth.uid))?;

  if appended.id_collision {
    tracing::warn!(
      uid = %auth.uid,
      id = appended.link.id,
      "count-based link id already in use"
    );
  }

  let collection = appended.collection;
  let body = AppendedBody {
    link:         appended.link,
    links:        collection.links.clone(),
    revision:     collection.revision.0,
    id_collision: appended.id_collision,
  };
  let res = (StatusCode::CREATED, Json(body)).into_response();
  Ok(with_etag(&auth.uid, &collection, res))
}

// ─── Replace ─────────────────────────────────────────────────────────────────

/// `PUT /me/links`: body is the full ordered array.
///
/// With `If-Match` the write is conditional on the tagged revision (412 when
/// it no longer matches). Without it the last writer wins.
pub async fn replace<S: Backend>(
  State(state): State<ApiState<S>>,
  auth: AuthUser,
  headers: HeaderMap,
  Json(links): Json<Vec<Link>>,
) -> Result<Response, ApiError> {
  let expected = match if_match(&headers) {
    Some(tag) => {
      let current = editor::read(state.store.as_ref(), &auth.uid).await?;
      if !matches(tag, &links_etag(&auth.uid, current.revision)) {
        return Err(ApiError::PreconditionFailed);
      }
      Some(current.revision)
    }
    None => None,
  };

  let collection = editor::replace_links(state.store.as_ref(), &auth.uid, links, expected)
    .await
    .inspect_err(log_failure("replace links", &auth.uid))?;
  Ok(collection_response(&auth.uid, collection))
}

// ─── Per-link mutations ──────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ActiveBody {
  pub active: bool,
}

/// `PATCH /me/links/{id}/active`
pub async fn set_active<S: Backend>(
  State(state): State<ApiState<S>>,
  auth: AuthUser,
  Path(id): Path<LinkId>,
  Json(body): Json<ActiveBody>,
) -> Result<Response, ApiError> {
  let collection = editor::set_link_active(state.store.as_ref(), &auth.uid, id, body.active)
    .await
    .inspect_err(log_failure("set active", &auth.uid))?;
  Ok(collection_response(&auth.uid, collection))
}

#[derive(Debug, Deserialize)]
pub struct FieldBody {
  pub field: String,
  #[serde(default)]
  pub value: Value,
}

/// `PATCH /me/links/{id}`
pub async fn set_field<S: Backend>(
  State(state): State<ApiState<S>>,
  auth: AuthUser,
  Path(id): Path<LinkId>,
  Json(body): Json<FieldBody>,
) -> Result<Response, ApiError> {
  let collection =
    editor::set_link_field(state.store.as_ref(), &auth.uid, id, &body.field, body.value)
      .await
      .inspect_err(log_failure("set field", &auth.uid))?;
  Ok(collection_response(&auth.uid, collection))
}

/// `DELETE /me/links/{id}`
pub async fn remove<S: Backend>(
  State(state): State<ApiState<S>>,
  auth: AuthUser,
  Path(id): Path<LinkId>,
) -> Result<Response, ApiError> {
  let collection = editor::delete_link(state.store.as_ref(), &auth.uid, id)
    .await
    .inspect_err(log_failure("delete link", &auth.uid))?;
  Ok(collection_response(&auth.uid, collection))
}
