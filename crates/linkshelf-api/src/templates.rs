//! `GET /templates`: the theme templates offered in the editor.

use axum::{Json, extract::State};
use linkshelf_core::{store::ProfileStore, template::Template};

use crate::{ApiState, Backend, error::ApiError};

/// `GET /templates`
pub async fn list<S: Backend>(
  State(state): State<ApiState<S>>,
) -> Result<Json<Vec<Template>>, ApiError> {
  let templates = state.store.list_templates().await.map_err(ApiError::store)?;
  Ok(Json(templates))
}
