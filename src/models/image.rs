//! Represents one uploaded image and its metadata.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Metadata for a single uploaded image.
///
/// The record stores metadata only; the image bytes live in the blob backend
/// under key = `id`. A non-empty `url` means the blob upload has completed.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug, PartialEq, Eq)]
pub struct ImageRecord {
    /// Server-generated primary key, immutable once assigned.
    pub id: i64,

    /// Original filename of the uploaded file.
    pub name: String,

    /// Predicted label, empty until the classifier has run (or forever when
    /// no classifier is configured).
    pub classification: String,

    /// Retrieval URL, set only after the blob upload succeeds.
    pub url: String,

    /// Opaque account identifier supplied by the caller. Never mutated.
    pub owner: String,

    /// Free-text description.
    pub description: String,
}

/// Column values for a new record; the id is generated by the database.
#[derive(Debug, Clone)]
pub struct NewImage {
    pub name: String,
    pub classification: String,
    pub url: String,
    pub owner: String,
    pub description: String,
}

/// Caller-editable fields accepted by `PUT /images/{id}`.
///
/// `owner` and `id` are deliberately absent: they cannot change via update.
#[derive(Debug, Clone, Deserialize)]
pub struct ImageUpdate {
    pub name: String,
    #[serde(default)]
    pub classification: String,
    #[serde(default)]
    pub description: String,
}
