//! HTTP handlers for image upload, download and metadata CRUD.
//!
//! Handlers shape requests and responses and orchestrate the stores; the
//! only computation here is the retrieval URL. Blob bytes stream out of the
//! backend without being buffered.

use crate::{
    errors::AppError,
    models::image::{ImageRecord, ImageUpdate, NewImage},
    services::blob_store::BlobError,
    state::AppState,
};
use axum::{
    Json,
    body::Body,
    extract::{Multipart, Path, Query, State},
    http::{HeaderValue, header},
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use serde::Deserialize;

/// Query params for upload and listing: the owning account.
#[derive(Debug, Deserialize)]
pub struct OwnerQuery {
    pub account_id: String,
}

/// Compute the retrieval URL stored alongside the record.
fn image_url(base: &str, id: i64) -> String {
    format!("{}/images/{}/image", base, id)
}

/// Pull the uploaded file out of the multipart body. The field must be
/// named `file` and carry a filename.
async fn read_file_field(mut multipart: Multipart) -> Result<(String, Bytes), AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| AppError::bad_request(format!("malformed multipart body: {err}")))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_string();
        if filename.is_empty() {
            break;
        }
        let data = field
            .bytes()
            .await
            .map_err(|err| AppError::bad_request(format!("malformed multipart body: {err}")))?;
        return Ok((filename, data));
    }
    Err(AppError::bad_request("No file attached."))
}

/// `POST /images?account_id=...` — upload a file and create its record.
///
/// A placeholder row is created first to obtain the id the blob is keyed
/// by; the row is completed once the upload (and optional classification)
/// is done. A failure in between leaves a row with an empty url behind.
pub async fn upload_image(
    State(state): State<AppState>,
    Query(query): Query<OwnerQuery>,
    multipart: Multipart,
) -> Result<Json<ImageRecord>, AppError> {
    let (filename, data) = read_file_field(multipart).await?;

    let record = state
        .images
        .create(NewImage {
            name: filename,
            classification: String::new(),
            url: String::new(),
            owner: query.account_id,
            description: String::new(),
        })
        .await?;

    let key = record.id.to_string();
    state.blobs.put(&key, data).await.map_err(|err| {
        tracing::error!("blob upload for image {} failed: {err}", record.id);
        AppError::from(err)
    })?;

    // Classification works on the stored bytes, not the request body, so a
    // label is only ever attached to a blob that actually made it to the
    // backend. Classifier trouble downgrades to an empty label.
    let classification = match &state.classifier {
        Some(classifier) => match state.blobs.get_bytes(&key).await {
            Ok(stored) => match classifier.classify(stored).await {
                Ok(label) => label,
                Err(err) => {
                    tracing::warn!("classification for image {} failed: {err}", record.id);
                    String::new()
                }
            },
            Err(err) => {
                tracing::warn!(
                    "re-reading image {} for classification failed: {err}",
                    record.id
                );
                String::new()
            }
        },
        None => String::new(),
    };

    let url = image_url(&state.backend_url, record.id);
    let updated = state
        .images
        .update(record.id, &record.name, &classification, &url, &record.description)
        .await?;

    Ok(Json(updated))
}

/// `GET /images?account_id=...` — all records for one owner.
pub async fn list_images(
    State(state): State<AppState>,
    Query(query): Query<OwnerQuery>,
) -> Result<Json<Vec<ImageRecord>>, AppError> {
    let records = state.images.list_by_owner(&query.account_id).await?;
    Ok(Json(records))
}

/// `GET /images/{id}/image` — stream the blob back as a PNG.
pub async fn download_image(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Response, AppError> {
    let record = state
        .images
        .get(id)
        .await?
        .ok_or_else(|| AppError::not_found("Item not found"))?;

    let stream = state.blobs.get_stream(&record.id.to_string()).await?;

    let mut response = Response::new(Body::from_stream(stream));
    response
        .headers_mut()
        .insert(header::CONTENT_TYPE, HeaderValue::from_static("image/png"));
    Ok(response)
}

/// `GET /images/{id}` — metadata for one record.
pub async fn get_image(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ImageRecord>, AppError> {
    let record = state
        .images
        .get(id)
        .await?
        .ok_or_else(|| AppError::not_found("Item not found"))?;
    Ok(Json(record))
}

/// `PUT /images/{id}` — edit name/classification/description.
///
/// The url and owner columns are carried over from the stored row no matter
/// what the caller sends.
pub async fn update_image(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<ImageUpdate>,
) -> Result<Json<ImageRecord>, AppError> {
    let existing = state
        .images
        .get(id)
        .await?
        .ok_or_else(|| AppError::not_found("Item not found"))?;

    let updated = state
        .images
        .update(
            id,
            &payload.name,
            &payload.classification,
            &existing.url,
            &payload.description,
        )
        .await?;

    Ok(Json(updated))
}

/// `DELETE /images/{id}` — remove the record and its blob.
pub async fn delete_image(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let record = state
        .images
        .get(id)
        .await?
        .ok_or_else(|| AppError::not_found("Item not found"))?;

    state.images.delete(id).await?;

    // The row is gone at this point; blob cleanup is best-effort. A blob
    // that was never uploaded (empty url) reports NotFound here.
    match state.blobs.delete(&record.id.to_string()).await {
        Ok(()) | Err(BlobError::NotFound(_)) => {}
        Err(err) => {
            tracing::warn!("blob cleanup for deleted image {} failed: {err}", id);
        }
    }

    Ok(Json("item was deleted"))
}
