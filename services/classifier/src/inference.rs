//! Client for the remote image classification model.
//!
//! The client re-fetches the uploaded image from its public URL, posts the
//! raw bytes to the model endpoint and folds the ranked `{label, score}`
//! predictions into a [`ClassificationResult`]. Scores are kept in whatever
//! unit the model used; see [`crate::normalizer`].

use crate::config::InferenceConfig;
use crate::normalizer;
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

const USER_AGENT: &str = concat!("waste-classifier/", env!("CARGO_PKG_VERSION"));
const MAX_ERROR_BODY_CHARS: usize = 512;

/// Errors that can occur while classifying an image
#[derive(Error, Debug)]
pub enum InferenceError {
    #[error("Network error: {0}")]
    Transport(String),

    #[error("Failed to fetch stored image: HTTP {status}")]
    ImageFetch { status: u16 },

    #[error("Model endpoint returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Malformed model response: {0}")]
    MalformedResponse(String),
}

impl InferenceError {
    /// HTTP status code behind the failure, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            InferenceError::ImageFetch { status } | InferenceError::Status { status, .. } => {
                Some(*status)
            }
            _ => None,
        }
    }
}

impl From<reqwest::Error> for InferenceError {
    fn from(err: reqwest::Error) -> Self {
        InferenceError::Transport(err.to_string())
    }
}

/// One ranked prediction from the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub label: String,
    pub score: f64,
}

/// Outcome of classifying one image.
///
/// `confidence` and `probabilities` carry the model's raw unit, either a
/// fraction or a percentage. Probabilities need not sum to one, and
/// `category` need not appear among them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    /// Winning label
    pub category: String,
    /// Score of the winning label
    pub confidence: f64,
    /// Label → score for every prediction
    pub probabilities: HashMap<String, f64>,
}

impl ClassificationResult {
    /// Degenerate result for a model that returned no predictions
    pub fn unknown() -> Self {
        Self {
            category: "Unknown".to_string(),
            confidence: 0.0,
            probabilities: HashMap::new(),
        }
    }

    /// Build a result from predictions ranked best-first.
    ///
    /// Duplicate labels keep the last score seen.
    pub fn from_predictions(predictions: &[Prediction]) -> Self {
        let Some(top) = predictions.first() else {
            return Self::unknown();
        };

        let probabilities = predictions
            .iter()
            .map(|p| (p.label.clone(), p.score))
            .collect();

        Self {
            category: top.label.clone(),
            confidence: top.score,
            probabilities,
        }
    }

    /// Confidence as a percentage in `[0, 100]`
    pub fn confidence_percent(&self) -> f64 {
        normalizer::to_percentage(self.confidence)
    }

    /// Probabilities with lowercase keys and percentage values
    pub fn normalized_probabilities(&self) -> HashMap<String, f64> {
        normalizer::normalize(&self.probabilities)
    }
}

/// Remote classification of a stored image
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ImageClassifier: Send + Sync {
    /// Classify the image published at `image_url`
    async fn classify(&self, image_url: &str) -> Result<ClassificationResult, InferenceError>;
}

/// HTTP client for a hosted classification model
pub struct InferenceClient {
    http_client: reqwest::Client,
    endpoint: String,
    api_token: Option<String>,
}

impl InferenceClient {
    /// Create a new client. No request timeout is set; the transport
    /// defaults apply.
    pub fn new(config: &InferenceConfig) -> Result<Self, InferenceError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self::with_http_client(config, http_client))
    }

    /// Create a client on top of an existing HTTP client
    pub fn with_http_client(config: &InferenceConfig, http_client: reqwest::Client) -> Self {
        if config.api_token.is_none() {
            warn!(endpoint = %config.endpoint, "No inference API token configured");
        }

        Self {
            http_client,
            endpoint: config.endpoint.clone(),
            api_token: config.api_token.clone(),
        }
    }

    /// Download the stored image, returning its bytes and content type
    async fn fetch_image(&self, image_url: &str) -> Result<(Bytes, String), InferenceError> {
        let response = self.http_client.get(image_url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(InferenceError::ImageFetch {
                status: status.as_u16(),
            });
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("application/octet-stream")
            .to_string();

        let bytes = response.bytes().await?;
        Ok((bytes, content_type))
    }

    /// Submit image bytes to the model and decode its ranked predictions
    async fn request_predictions(
        &self,
        image: Bytes,
        content_type: &str,
    ) -> Result<Vec<Prediction>, InferenceError> {
        let mut request = self
            .http_client
            .post(&self.endpoint)
            .header(CONTENT_TYPE, content_type)
            .body(image);

        if let Some(ref token) = self.api_token {
            request = request.header(AUTHORIZATION, format!("Bearer {token}"));
        }

        let response = request.send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(InferenceError::Status {
                status: status.as_u16(),
                body: body.chars().take(MAX_ERROR_BODY_CHARS).collect(),
            });
        }

        let body = response.bytes().await?;
        parse_predictions(&body)
    }
}

/// Decode a model response body: a JSON array of `{label, score}`
pub fn parse_predictions(body: &[u8]) -> Result<Vec<Prediction>, InferenceError> {
    serde_json::from_slice(body).map_err(|e| InferenceError::MalformedResponse(e.to_string()))
}

#[async_trait]
impl ImageClassifier for InferenceClient {
    #[instrument(skip(self), fields(endpoint = %self.endpoint))]
    async fn classify(&self, image_url: &str) -> Result<ClassificationResult, InferenceError> {
        let started = Instant::now();

        let outcome = async {
            let (image, content_type) = self.fetch_image(image_url).await?;

            debug!(
                size_bytes = image.len(),
                content_type = %content_type,
                "Submitting image to model"
            );

            self.request_predictions(image, &content_type).await
        }
        .await;

        let predictions = match outcome {
            Ok(predictions) => predictions,
            Err(e) => {
                warn!(error = %e, status = ?e.status(), "Classification request failed");
                metrics::counter!("classifier_inference_requests_total", "outcome" => "failure")
                    .increment(1);
                return Err(e);
            }
        };

        let result = ClassificationResult::from_predictions(&predictions);

        metrics::counter!("classifier_inference_requests_total", "outcome" => "success")
            .increment(1);
        metrics::histogram!("classifier_inference_duration_seconds")
            .record(started.elapsed().as_secs_f64());

        info!(
            category = %result.category,
            confidence = result.confidence,
            predictions = predictions.len(),
            "Image classified"
        );

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prediction(label: &str, score: f64) -> Prediction {
        Prediction {
            label: label.to_string(),
            score,
        }
    }

    #[test]
    fn test_from_predictions_takes_top_ranked() {
        let result = ClassificationResult::from_predictions(&[
            prediction("plastic", 0.92),
            prediction("glass", 0.05),
        ]);

        assert_eq!(result.category, "plastic");
        assert_eq!(result.confidence, 0.92);
        assert_eq!(result.probabilities.len(), 2);
        assert_eq!(result.probabilities["glass"], 0.05);
    }

    #[test]
    fn test_from_predictions_empty_is_unknown() {
        let result = ClassificationResult::from_predictions(&[]);

        assert_eq!(result, ClassificationResult::unknown());
        assert_eq!(result.category, "Unknown");
        assert_eq!(result.confidence, 0.0);
        assert!(result.probabilities.is_empty());
    }

    #[test]
    fn test_from_predictions_duplicate_label_last_write_wins() {
        let result = ClassificationResult::from_predictions(&[
            prediction("metal", 0.6),
            prediction("paper", 0.3),
            prediction("metal", 0.1),
        ]);

        assert_eq!(result.confidence, 0.6);
        assert_eq!(result.probabilities["metal"], 0.1);
    }

    #[test]
    fn test_parse_predictions() {
        let body = br#"[{"label":"plastic","score":0.92},{"label":"glass","score":0.05}]"#;
        let predictions = parse_predictions(body).unwrap();

        assert_eq!(predictions, vec![prediction("plastic", 0.92), prediction("glass", 0.05)]);
        assert!(parse_predictions(b"[]").unwrap().is_empty());
    }

    #[test]
    fn test_parse_predictions_rejects_malformed_body() {
        for body in [
            &br#"{"error":"Model is currently loading"}"#[..],
            &br#"[{"label":"plastic"}]"#[..],
            &b"not json"[..],
        ] {
            assert!(matches!(
                parse_predictions(body),
                Err(InferenceError::MalformedResponse(_))
            ));
        }
    }

    #[test]
    fn test_error_status() {
        assert_eq!(
            InferenceError::Status {
                status: 503,
                body: String::new()
            }
            .status(),
            Some(503)
        );
        assert_eq!(InferenceError::ImageFetch { status: 404 }.status(), Some(404));
        assert_eq!(InferenceError::Transport("reset".into()).status(), None);
    }

    #[test]
    fn test_normalized_views() {
        let result = ClassificationResult {
            category: "Plastic".to_string(),
            confidence: 0.92,
            probabilities: HashMap::from([("Plastic".to_string(), 0.92)]),
        };

        assert!((result.confidence_percent() - 92.0).abs() < 1e-9);
        assert!((result.normalized_probabilities()["plastic"] - 92.0).abs() < 1e-9);
    }
}
