use crate::services::{
    blob_store::BlobStore, classifier::Classifier, image_store::ImageStore,
    token_validator::TokenValidator,
};

/// Shared handler state. Every collaborator is built once at startup and
/// cloned into request handlers; all of them are cheap handle clones over
/// pooled resources.
#[derive(Clone)]
pub struct AppState {
    pub images: ImageStore,
    pub blobs: BlobStore,
    pub classifier: Option<Classifier>,
    pub tokens: TokenValidator,
    /// Base URL retrieval links are computed from.
    pub backend_url: String,
}
