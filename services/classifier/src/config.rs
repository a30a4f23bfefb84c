use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Main configuration for the classifier
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Service configuration
    #[serde(default)]
    pub service: ServiceConfig,
    /// Object store configuration
    #[serde(default)]
    pub storage: StorageConfig,
    /// Inference endpoint configuration
    #[serde(default)]
    pub inference: InferenceConfig,
    /// Limits applied to selected files
    #[serde(default)]
    pub upload: UploadConfig,
    /// Report configuration
    #[serde(default)]
    pub report: ReportConfig,
}

/// Service-level configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    /// Service name for logging
    #[serde(default = "default_service_name")]
    pub name: String,
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// Object store configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Bucket that receives uploaded images
    #[serde(default = "default_bucket")]
    pub bucket: String,
    /// AWS region
    #[serde(default = "default_region")]
    pub region: String,
    /// Custom endpoint URL (for MinIO, LocalStack, Supabase S3, etc.)
    pub endpoint_url: Option<String>,
    /// Force path-style access (required for MinIO)
    #[serde(default)]
    pub force_path_style: bool,
    /// Base URL under which objects are publicly readable.
    /// When absent a presigned GET URL is handed out instead.
    pub public_base_url: Option<String>,
    /// Presigned URL expiration in seconds
    #[serde(default = "default_presigned_url_expiry_secs")]
    pub presigned_url_expiry_secs: u64,
}

/// Remote classification model configuration
#[derive(Debug, Clone, Deserialize)]
pub struct InferenceConfig {
    /// Model endpoint receiving raw image bytes
    #[serde(default = "default_inference_endpoint")]
    pub endpoint: String,
    /// Bearer token sent in the Authorization header
    pub api_token: Option<String>,
}

/// Constraints on files accepted by a session
#[derive(Debug, Clone, Deserialize)]
pub struct UploadConfig {
    /// Maximum accepted file size in bytes (10MB default)
    #[serde(default = "default_max_file_bytes")]
    pub max_file_bytes: usize,
    /// Accepted MIME types
    #[serde(default = "default_allowed_content_types")]
    pub allowed_content_types: Vec<String>,
}

/// Report configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ReportConfig {
    /// Document title
    #[serde(default = "default_report_title")]
    pub title: String,
}

// Default value functions
fn default_service_name() -> String {
    "waste-classifier".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_bucket() -> String {
    "uploads".to_string()
}

fn default_region() -> String {
    "us-east-1".to_string()
}

fn default_presigned_url_expiry_secs() -> u64 {
    3600
}

fn default_inference_endpoint() -> String {
    "https://api-inference.huggingface.co/models/prithivMLmods/Trash-Net".to_string()
}

fn default_max_file_bytes() -> usize {
    10 * 1024 * 1024 // 10MB
}

fn default_allowed_content_types() -> Vec<String> {
    vec![
        "image/jpeg".to_string(),
        "image/png".to_string(),
        "image/gif".to_string(),
    ]
}

fn default_report_title() -> String {
    "Waste Classification Report".to_string()
}

impl Config {
    /// Load configuration from config files and environment.
    ///
    /// `explicit` is a file named on the command line; unlike the
    /// well-known locations it must exist.
    pub fn load(explicit: Option<&Path>) -> anyhow::Result<Self> {
        let mut builder = config::Config::builder()
            // Start with default values
            .set_default("service.name", default_service_name())?
            .set_default("service.log_level", default_log_level())?
            // Add config file if present
            .add_source(config::File::with_name("config/classifier").required(false))
            .add_source(
                config::File::with_name("/etc/waste-classifier/classifier").required(false),
            );

        if let Some(path) = explicit {
            builder = builder.add_source(config::File::from(path).required(true));
        }

        let config = builder
            // Override with environment variables
            // CLASSIFIER__INFERENCE__API_TOKEN -> inference.api_token
            .add_source(
                config::Environment::with_prefix("CLASSIFIER")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize().map_err(Into::into)
    }
}

impl StorageConfig {
    /// Get presigned URL expiry as Duration
    pub fn presigned_url_expiry(&self) -> Duration {
        Duration::from_secs(self.presigned_url_expiry_secs)
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: default_service_name(),
            log_level: default_log_level(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            bucket: default_bucket(),
            region: default_region(),
            endpoint_url: None,
            force_path_style: false,
            public_base_url: None,
            presigned_url_expiry_secs: default_presigned_url_expiry_secs(),
        }
    }
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            endpoint: default_inference_endpoint(),
            api_token: None,
        }
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_file_bytes: default_max_file_bytes(),
            allowed_content_types: default_allowed_content_types(),
        }
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            title: default_report_title(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_values() {
        assert_eq!(default_max_file_bytes(), 10 * 1024 * 1024);
        assert_eq!(default_presigned_url_expiry_secs(), 3600);
        assert_eq!(default_bucket(), "uploads");
        assert_eq!(
            default_allowed_content_types(),
            vec!["image/jpeg", "image/png", "image/gif"]
        );
    }

    #[test]
    fn test_load_from_explicit_file() {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .unwrap();
        writeln!(
            file,
            r#"
[storage]
bucket = "waste-images"
endpoint_url = "http://localhost:9000"
force_path_style = true
public_base_url = "http://localhost:9000/waste-images"

[inference]
endpoint = "http://localhost:8081/models/trash-net"
api_token = "hf_test"

[upload]
max_file_bytes = 2048
"#
        )
        .unwrap();

        let config = Config::load(Some(file.path())).unwrap();

        assert_eq!(config.storage.bucket, "waste-images");
        assert!(config.storage.force_path_style);
        assert_eq!(
            config.storage.public_base_url.as_deref(),
            Some("http://localhost:9000/waste-images")
        );
        assert_eq!(config.inference.api_token.as_deref(), Some("hf_test"));
        assert_eq!(config.upload.max_file_bytes, 2048);
        // Untouched sections fall back to defaults
        assert_eq!(config.upload.allowed_content_types.len(), 3);
        assert_eq!(config.report.title, "Waste Classification Report");
        assert_eq!(config.storage.presigned_url_expiry(), Duration::from_secs(3600));
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let result = Config::load(Some(Path::new("/nonexistent/classifier.toml")));
        assert!(result.is_err());
    }
}
