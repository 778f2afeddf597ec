//! src/services/classifier.rs
//!
//! Classifier — optional HTTP client for the Custom Vision prediction
//! endpoint. Raw image bytes go out with a `Prediction-Key` header; the
//! top-ranked prediction's tag name comes back. Failures here never fail an
//! upload: the caller logs and leaves the classification empty.

use bytes::Bytes;
use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

const PREDICTION_KEY_HEADER: &str = "Prediction-Key";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("prediction request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("prediction response contained no predictions")]
    NoPrediction,
}

#[derive(Debug, Deserialize)]
struct PredictionResponse {
    #[serde(default)]
    predictions: Vec<Prediction>,
}

#[derive(Debug, Deserialize)]
struct Prediction {
    #[serde(rename = "tagName")]
    tag_name: String,
}

/// Client for the configured prediction endpoint. Built once at startup;
/// clones share the underlying connection pool.
#[derive(Clone)]
pub struct Classifier {
    http: reqwest::Client,
    endpoint: String,
    key: String,
}

impl Classifier {
    /// Build a classifier, or None when no endpoint is configured. An empty
    /// URL counts as unconfigured.
    pub fn from_config(url: &str, key: &str) -> Result<Option<Self>, reqwest::Error> {
        if url.is_empty() {
            return Ok(None);
        }
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Some(Self {
            http,
            endpoint: url.to_string(),
            key: key.to_string(),
        }))
    }

    /// POST the image bytes and return the top-ranked tag name.
    pub async fn classify(&self, image: Bytes) -> Result<String, ClassifierError> {
        let response = self
            .http
            .post(&self.endpoint)
            .header(PREDICTION_KEY_HEADER, &self.key)
            .header(CONTENT_TYPE, "application/octet-stream")
            .body(image)
            .send()
            .await?
            .error_for_status()?
            .json::<PredictionResponse>()
            .await?;

        top_label(response)
    }
}

/// The service ranks predictions by probability; the first entry is the one
/// we keep. An empty list is an error the caller downgrades.
fn top_label(response: PredictionResponse) -> Result<String, ClassifierError> {
    response
        .predictions
        .into_iter()
        .next()
        .map(|p| p.tag_name)
        .ok_or(ClassifierError::NoPrediction)
}
