//! Defines routes for the image inventory API.
//!
//! ## Structure
//! - **Meta endpoints**
//!   - `GET /`         — service banner
//!   - `GET /healthz`  — liveness
//!   - `GET /readyz`   — readiness (database + blob backend)
//!
//! - **Token validation**
//!   - `GET /validate/{token}` — 200 "Authorized" or 401 fixed message
//!
//! - **Image endpoints**
//!   - `POST   /images`            — multipart upload (query `account_id`)
//!   - `GET    /images`            — list records for one owner
//!   - `GET    /images/{id}/image` — download the blob
//!   - `GET    /images/{id}`       — record metadata
//!   - `PUT    /images/{id}`       — edit name/classification/description
//!   - `DELETE /images/{id}`       — remove record and blob

use crate::{
    handlers::{
        auth_handlers::validate_token,
        health_handlers::{healthz, readyz, root},
        image_handlers::{
            delete_image, download_image, get_image, list_images, update_image, upload_image,
        },
    },
    state::AppState,
};
use axum::{
    Router,
    routing::{get, post},
};

/// Build and return the router for the whole API surface.
///
/// The router carries shared state (`AppState`) to all handlers.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(root))
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/validate/{token}", get(validate_token))
        .route("/images", post(upload_image).get(list_images))
        .route("/images/{id}/image", get(download_image))
        .route(
            "/images/{id}",
            get(get_image).put(update_image).delete(delete_image),
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        errors::UNAUTHORIZED_MESSAGE,
        models::image::{ImageRecord, NewImage},
        services::{
            blob_store::BlobStore, image_store::ImageStore, token_validator::TokenValidator,
        },
    };
    use axum::{
        body::Body,
        http::{Request, StatusCode, header},
    };
    use http_body_util::BodyExt;
    use pretty_assertions::assert_eq;
    use sqlx::any::AnyPoolOptions;
    use tower::ServiceExt;

    const BASE_URL: &str = "http://localhost:8000";

    /// Full stack over in-memory backends: SQLite metadata, InMemory blobs,
    /// no classifier, a validator whose key endpoint is never reached.
    async fn test_app() -> (axum::Router, AppState) {
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

        let state = AppState {
            images: ImageStore::new(pool),
            blobs: BlobStore::in_memory(),
            classifier: None,
            tokens: TokenValidator::new("http://127.0.0.1:1/keys".into(), None).unwrap(),
            backend_url: BASE_URL.into(),
        };
        (routes().with_state(state.clone()), state)
    }

    fn multipart_upload(account_id: &str, filename: &str, bytes: &[u8]) -> Request<Body> {
        let boundary = "inventoria-test-boundary";
        let mut body = Vec::new();
        body.extend_from_slice(
            format!(
                "--{boundary}\r\nContent-Disposition: form-data; \
                 name=\"file\"; filename=\"{filename}\"\r\n\
                 Content-Type: image/png\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

        Request::builder()
            .method("POST")
            .uri(format!("/images?account_id={account_id}"))
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={boundary}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    async fn body_bytes(response: axum::response::Response) -> Vec<u8> {
        response
            .into_body()
            .collect()
            .await
            .unwrap()
            .to_bytes()
            .to_vec()
    }

    async fn body_json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
        serde_json::from_slice(&body_bytes(response).await).unwrap()
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn upload_list_download_delete_end_to_end() {
        let (app, _) = test_app().await;
        let png = b"not-really-a-png";

        // Upload
        let response = app
            .clone()
            .oneshot(multipart_upload("u1", "a.png", png))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let record: ImageRecord = body_json(response).await;
        assert_eq!(record.name, "a.png");
        assert_eq!(record.owner, "u1");
        assert_eq!(record.classification, "");
        assert_eq!(record.description, "");
        assert_eq!(
            record.url,
            format!("{BASE_URL}/images/{}/image", record.id)
        );

        // Listing for the owner includes the record
        let response = app
            .clone()
            .oneshot(get_request("/images?account_id=u1"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let listed: Vec<ImageRecord> = body_json(response).await;
        assert_eq!(listed, vec![record.clone()]);

        // Listing for another owner does not
        let response = app
            .clone()
            .oneshot(get_request("/images?account_id=u2"))
            .await
            .unwrap();
        let listed: Vec<ImageRecord> = body_json(response).await;
        assert!(listed.is_empty());

        // Download returns the stored bytes as a PNG
        let response = app
            .clone()
            .oneshot(get_request(&format!("/images/{}/image", record.id)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "image/png"
        );
        assert_eq!(body_bytes(response).await, png);

        // Metadata lookup
        let response = app
            .clone()
            .oneshot(get_request(&format!("/images/{}", record.id)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        // Delete, then the record is gone
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("DELETE")
                    .uri(format!("/images/{}", record.id))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .clone()
            .oneshot(get_request(&format!("/images/{}", record.id)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = app
            .oneshot(get_request(&format!("/images/{}/image", record.id)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn upload_without_file_field_is_rejected() {
        let (app, _) = test_app().await;
        let boundary = "inventoria-test-boundary";
        let body = format!(
            "--{boundary}\r\nContent-Disposition: form-data; \
             name=\"other\"\r\n\r\nvalue\r\n--{boundary}--\r\n"
        );
        let request = Request::builder()
            .method("POST")
            .uri("/images?account_id=u1")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={boundary}"),
            )
            .body(Body::from(body))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn update_changes_only_the_editable_fields() {
        let (app, _) = test_app().await;
        let response = app
            .clone()
            .oneshot(multipart_upload("u1", "a.png", b"bytes"))
            .await
            .unwrap();
        let record: ImageRecord = body_json(response).await;

        let request = Request::builder()
            .method("PUT")
            .uri(format!("/images/{}", record.id))
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(
                r#"{"name":"b.png","classification":"cat","description":"edited","owner":"evil","id":999}"#,
            ))
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let updated: ImageRecord = body_json(response).await;

        assert_eq!(updated.id, record.id);
        assert_eq!(updated.owner, "u1");
        assert_eq!(updated.url, record.url);
        assert_eq!(updated.name, "b.png");
        assert_eq!(updated.classification, "cat");
        assert_eq!(updated.description, "edited");
    }

    #[tokio::test]
    async fn update_of_unknown_id_is_not_found() {
        let (app, _) = test_app().await;
        let request = Request::builder()
            .method("PUT")
            .uri("/images/424242")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"name":"x"}"#))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn download_without_stored_blob_is_not_found() {
        let (app, state) = test_app().await;

        // A row whose blob upload never happened (url stays empty).
        let orphan = state
            .images
            .create(NewImage {
                name: "a.png".into(),
                classification: String::new(),
                url: String::new(),
                owner: "u1".into(),
                description: String::new(),
            })
            .await
            .unwrap();

        let response = app
            .oneshot(get_request(&format!("/images/{}/image", orphan.id)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn invalid_tokens_yield_the_fixed_message() {
        let (app, _) = test_app().await;

        for token in ["null", "None", "Null", "definitely-not-a-jwt"] {
            let response = app
                .clone()
                .oneshot(get_request(&format!("/validate/{token}")))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{token}");
            assert_eq!(
                response.headers().get(header::WWW_AUTHENTICATE).unwrap(),
                "Bearer"
            );
            let body: serde_json::Value = body_json(response).await;
            assert_eq!(body["error"], UNAUTHORIZED_MESSAGE);
        }
    }

    #[tokio::test]
    async fn meta_endpoints_answer() {
        let (app, _) = test_app().await;

        let response = app.clone().oneshot(get_request("/")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body: serde_json::Value = body_json(response).await;
        assert!(body["message"].is_string());

        let response = app.clone().oneshot(get_request("/healthz")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app.oneshot(get_request("/readyz")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
