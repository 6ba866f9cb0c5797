//! Request body extraction for create and update.
//!
//! [`SimulationForm`] accepts the same fields as either a JSON object, a
//! URL-encoded form, or a multipart form. In a multipart form every part
//! named `files` that carries a file name is streamed into the staging
//! directory; all other parts are text fields.

use std::sync::Arc;

use axum::Form;
use axum::body::Bytes;
use axum::extract::multipart::{Field, MultipartError};
use axum::extract::{FromRequest, Multipart, Request};
use axum::http::{HeaderMap, StatusCode, header};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use simdeck_store::{FileStore, StagedUpload};
use tracing::debug;

use crate::error::ApiError;
use crate::state::AppState;

/// Multipart part name that carries uploaded files.
pub const UPLOAD_FIELD: &str = "files";

/// Parsed simulation fields plus any staged uploads.
#[derive(Debug)]
pub struct SimulationForm<T> {
    /// The text fields, deserialized.
    pub body: T,
    /// Uploaded files, staged but not yet placed in the store.
    pub uploads: Vec<StagedUpload>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BodyKind {
    Multipart,
    UrlEncoded,
    Json,
}

impl BodyKind {
    fn of(headers: &HeaderMap) -> Self {
        let content_type = headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        if content_type.starts_with("multipart/form-data") {
            Self::Multipart
        } else if content_type.starts_with("application/x-www-form-urlencoded") {
            Self::UrlEncoded
        } else {
            Self::Json
        }
    }
}

impl<T> FromRequest<Arc<AppState>> for SimulationForm<T>
where
    T: DeserializeOwned + Default + Send,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &Arc<AppState>) -> Result<Self, Self::Rejection> {
        match BodyKind::of(req.headers()) {
            BodyKind::Multipart => {
                let multipart = Multipart::from_request(req, state)
                    .await
                    .map_err(|e| ApiError::Validation(e.body_text()))?;
                read_multipart(multipart, &state.files).await
            }
            BodyKind::UrlEncoded => {
                let Form(body) = Form::<T>::from_request(req, state)
                    .await
                    .map_err(|e| ApiError::Validation(e.body_text()))?;
                Ok(Self {
                    body,
                    uploads: Vec::new(),
                })
            }
            BodyKind::Json => {
                let bytes = Bytes::from_request(req, state)
                    .await
                    .map_err(|e| body_error(e.status(), e.body_text()))?;
                let body = if bytes.is_empty() {
                    T::default()
                } else {
                    serde_json::from_slice(&bytes)
                        .map_err(|e| ApiError::Validation(format!("invalid JSON body: {e}")))?
                };
                Ok(Self {
                    body,
                    uploads: Vec::new(),
                })
            }
        }
    }
}

fn body_error(status: StatusCode, message: String) -> ApiError {
    if status == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge(message)
    } else {
        ApiError::Validation(message)
    }
}

fn multipart_error(e: &MultipartError) -> ApiError {
    body_error(e.status(), e.body_text())
}

async fn read_multipart<T: DeserializeOwned>(
    mut multipart: Multipart,
    files: &FileStore,
) -> Result<SimulationForm<T>, ApiError> {
    let mut fields = Map::new();
    let mut uploads = Vec::new();

    while let Some(field) = multipart.next_field().await.map_err(|e| multipart_error(&e))? {
        let name = field.name().unwrap_or_default().to_owned();
        match field.file_name().map(str::to_owned) {
            // A file input left empty by the browser.
            Some(file_name) if file_name.is_empty() => {}
            Some(file_name) => {
                if name != UPLOAD_FIELD {
                    return Err(ApiError::Validation(format!(
                        "unexpected file field {name:?}, uploads go in {UPLOAD_FIELD:?}"
                    )));
                }
                uploads.push(stage_upload(field, &file_name, files).await?);
            }
            None => {
                let value = field.text().await.map_err(|e| multipart_error(&e))?;
                fields.insert(name, Value::String(value));
            }
        }
    }

    let body = serde_json::from_value(Value::Object(fields))
        .map_err(|e| ApiError::Validation(format!("invalid form fields: {e}")))?;
    debug!(uploads = uploads.len(), "Multipart form read");
    Ok(SimulationForm { body, uploads })
}

async fn stage_upload(
    mut field: Field<'_>,
    file_name: &str,
    files: &FileStore,
) -> Result<StagedUpload, ApiError> {
    let mut writer = files.begin_upload(file_name).await?;
    while let Some(chunk) = field.chunk().await.map_err(|e| multipart_error(&e))? {
        writer.write(&chunk).await?;
    }
    Ok(writer.finish().await?)
}
