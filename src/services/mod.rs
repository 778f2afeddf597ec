//! Service layer: the collaborators the HTTP handlers orchestrate.

pub mod blob_store;
pub mod classifier;
pub mod image_store;
pub mod token_validator;
