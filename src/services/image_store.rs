//! src/services/image_store.rs
//!
//! ImageStore — CRUD over the `images` metadata table. The store speaks
//! SQL through the sqlx `Any` driver so the same queries run against the
//! MySQL endpoint configured in production and against in-memory SQLite in
//! tests. It owns no blob bytes; those live in the blob backend keyed by
//! the row id.

use crate::models::image::{ImageRecord, NewImage};
use sqlx::AnyPool;
use thiserror::Error;

// Column widths, mirrored in the migration DDL.
const MAX_NAME_LEN: usize = 50;
const MAX_CLASSIFICATION_LEN: usize = 50;
const MAX_URL_LEN: usize = 100;
const MAX_OWNER_LEN: usize = 50;
const MAX_DESCRIPTION_LEN: usize = 200;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("image `{0}` not found")]
    NotFound(i64),
    #[error("field `{field}` exceeds {max} characters")]
    FieldTooLong { field: &'static str, max: usize },
    #[error("database driver reported no insert id")]
    MissingInsertId,
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// ImageStore provides the metadata half of the system:
/// - Insert a placeholder row to obtain a generated id
/// - Update the mutable columns after upload or on explicit edits
/// - Look up by id, list by owner, delete by id
///
/// Each call commits immediately; there is no multi-statement atomicity.
#[derive(Clone)]
pub struct ImageStore {
    db: AnyPool,
}

impl ImageStore {
    /// Create a new ImageStore backed by the provided pool.
    pub fn new(db: AnyPool) -> Self {
        Self { db }
    }

    fn check_len(field: &'static str, value: &str, max: usize) -> StoreResult<()> {
        if value.chars().count() > max {
            return Err(StoreError::FieldTooLong { field, max });
        }
        Ok(())
    }

    /// Validate every caller-supplied column against its width.
    fn ensure_fields_fit(
        name: &str,
        classification: &str,
        url: &str,
        owner: &str,
        description: &str,
    ) -> StoreResult<()> {
        Self::check_len("name", name, MAX_NAME_LEN)?;
        Self::check_len("classification", classification, MAX_CLASSIFICATION_LEN)?;
        Self::check_len("url", url, MAX_URL_LEN)?;
        Self::check_len("owner", owner, MAX_OWNER_LEN)?;
        Self::check_len("description", description, MAX_DESCRIPTION_LEN)?;
        Ok(())
    }

    /// Insert a row and return it with the generated id.
    pub async fn create(&self, new: NewImage) -> StoreResult<ImageRecord> {
        Self::ensure_fields_fit(
            &new.name,
            &new.classification,
            &new.url,
            &new.owner,
            &new.description,
        )?;

        let result = sqlx::query(
            "INSERT INTO images (name, classification, url, owner, description)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&new.name)
        .bind(&new.classification)
        .bind(&new.url)
        .bind(&new.owner)
        .bind(&new.description)
        .execute(&self.db)
        .await?;

        let id = result.last_insert_id().ok_or(StoreError::MissingInsertId)?;

        Ok(ImageRecord {
            id,
            name: new.name,
            classification: new.classification,
            url: new.url,
            owner: new.owner,
            description: new.description,
        })
    }

    /// Overwrite the mutable columns of a row and return the updated record.
    ///
    /// `owner` and `id` are untouched regardless of caller input. Returns
    /// NotFound when no row has the given id.
    pub async fn update(
        &self,
        id: i64,
        name: &str,
        classification: &str,
        url: &str,
        description: &str,
    ) -> StoreResult<ImageRecord> {
        Self::ensure_fields_fit(name, classification, url, "", description)?;

        let result = sqlx::query(
            "UPDATE images SET name = ?, classification = ?, url = ?, description = ?
             WHERE id = ?",
        )
        .bind(name)
        .bind(classification)
        .bind(url)
        .bind(description)
        .bind(id)
        .execute(&self.db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(id));
        }

        self.get(id).await?.ok_or(StoreError::NotFound(id))
    }

    /// Single lookup by id.
    pub async fn get(&self, id: i64) -> StoreResult<Option<ImageRecord>> {
        let record = sqlx::query_as::<_, ImageRecord>(
            "SELECT id, name, classification, url, owner, description
             FROM images WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;

        Ok(record)
    }

    /// All records whose owner column equals the given value, unordered.
    pub async fn list_by_owner(&self, owner: &str) -> StoreResult<Vec<ImageRecord>> {
        let records = sqlx::query_as::<_, ImageRecord>(
            "SELECT id, name, classification, url, owner, description
             FROM images WHERE owner = ?",
        )
        .bind(owner)
        .fetch_all(&self.db)
        .await?;

        Ok(records)
    }

    /// Remove the row. Returns NotFound when it was already gone; the delete
    /// flow converts that to a 404 instead of crashing.
    pub async fn delete(&self, id: i64) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM images WHERE id = ?")
            .bind(id)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(id));
        }

        Ok(())
    }

    /// Lightweight connectivity check used by the readiness probe.
    pub async fn ping(&self) -> StoreResult<()> {
        sqlx::query_scalar::<_, i64>("SELECT 1")
            .fetch_one(&self.db)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use sqlx::any::AnyPoolOptions;

    async fn test_store() -> ImageStore {
        sqlx::any::install_default_drivers();
        let pool = AnyPoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        sqlx::query(
            "CREATE TABLE images (
                id INTEGER PRIMARY KEY,
                name VARCHAR(50) NOT NULL,
                classification VARCHAR(50) NOT NULL DEFAULT '',
                url VARCHAR(100) NOT NULL DEFAULT '',
                owner VARCHAR(50) NOT NULL,
                description VARCHAR(200) NOT NULL DEFAULT ''
            )",
        )
        .execute(&pool)
        .await
        .unwrap();
        ImageStore::new(pool)
    }

    fn sample(owner: &str) -> NewImage {
        NewImage {
            name: "a.png".into(),
            classification: String::new(),
            url: String::new(),
            owner: owner.into(),
            description: String::new(),
        }
    }

    #[tokio::test]
    async fn create_then_get_round_trips() {
        let store = test_store().await;
        let created = store.create(sample("u1")).await.unwrap();
        let fetched = store.get(created.id).await.unwrap().unwrap();
        assert_eq!(created, fetched);
        assert_eq!(fetched.name, "a.png");
        assert_eq!(fetched.owner, "u1");
    }

    #[tokio::test]
    async fn update_never_changes_id_or_owner() {
        let store = test_store().await;
        let created = store.create(sample("u1")).await.unwrap();
        let updated = store
            .update(created.id, "b.png", "cat", "http://x/images/1/image", "desc")
            .await
            .unwrap();
        assert_eq!(updated.id, created.id);
        assert_eq!(updated.owner, "u1");
        assert_eq!(updated.name, "b.png");
        assert_eq!(updated.classification, "cat");
        assert_eq!(updated.description, "desc");
    }

    #[tokio::test]
    async fn update_missing_row_is_not_found() {
        let store = test_store().await;
        let err = store.update(42, "x", "", "", "").await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(42)));
    }

    #[tokio::test]
    async fn delete_then_get_returns_absent() {
        let store = test_store().await;
        let created = store.create(sample("u1")).await.unwrap();
        store.delete(created.id).await.unwrap();
        assert!(store.get(created.id).await.unwrap().is_none());

        let err = store.delete(created.id).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn list_by_owner_returns_exactly_that_owner() {
        let store = test_store().await;
        let a1 = store.create(sample("alice")).await.unwrap();
        let a2 = store.create(sample("alice")).await.unwrap();
        let _b = store.create(sample("bob")).await.unwrap();

        let mut listed: Vec<i64> = store
            .list_by_owner("alice")
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.id)
            .collect();
        listed.sort();
        assert_eq!(listed, vec![a1.id, a2.id]);
        assert!(store.list_by_owner("carol").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn over_limit_field_is_rejected() {
        let store = test_store().await;
        let mut new = sample("u1");
        new.name = "x".repeat(51);
        let err = store.create(new).await.unwrap_err();
        assert!(matches!(
            err,
            StoreError::FieldTooLong { field: "name", .. }
        ));
    }
}
