//! Core data models for the image inventory service.
//!
//! The single persisted entity is the image metadata record. It maps to the
//! `images` table via `sqlx::FromRow` and serializes naturally as JSON via
//! `serde`.

pub mod image;
