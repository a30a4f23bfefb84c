//! Waste Classifier
//!
//! Classification pipeline for photos of waste items. A user picks an
//! image, the pipeline stores it in an object store, asks a hosted
//! material-recognition model what it is, and turns the answer into a
//! recyclability report.
//!
//! ## Features
//!
//! - **Explicit Session State Machine**: one [`ClassificationSession`] per
//!   attempt, `Empty → Uploading → Staged → Classifying → Done`, with
//!   `reset` from anywhere and late completions discarded
//! - **S3-Compatible Storage**: uploads under collision-resistant keys and
//!   hands out public or presigned URLs
//! - **Remote Inference**: re-fetches the stored object and posts it to the
//!   model endpoint with a bearer token
//! - **Unit Normalization**: fractional and percentage scores end up on a
//!   single 0–100 scale
//! - **Reports**: plain-text or JSON documents with recyclability guidance
//!
//! ## Architecture
//!
//! ```text
//!    SourceFile             Object Store              Model Endpoint
//!  ┌────────────────┐     ┌────────────────┐        ┌────────────────┐
//!  │ selected image │     │ uploads/{key}  │◀───────│ POST bytes     │
//!  └───────┬────────┘     └───────▲────────┘  GET   │ → [{label,     │
//!          │                      │ PUT             │     score}]    │
//!          ▼                      │                 └───────▲────────┘
//!  ┌────────────────┐     ┌───────┴────────┐        ┌───────┴────────┐
//!  │ Classification │────▶│ Storage        │        │ Inference      │
//!  │ Session        │     │ Uploader       │        │ Client         │
//!  └───────┬────────┘     └────────────────┘        └───────▲────────┘
//!          ├────────────────────────────────────────────────┘
//!          ▼
//!  ┌────────────────┐     ┌────────────────┐
//!  │ Report         │◀────│ Normalizer +   │
//!  │ Generator      │     │ Materials      │
//!  └────────────────┘     └────────────────┘
//! ```

pub mod config;
pub mod inference;
pub mod materials;
pub mod normalizer;
pub mod preview;
pub mod report;
pub mod session;
pub mod source;
pub mod storage;

pub use config::Config;
pub use inference::{ClassificationResult, ImageClassifier, InferenceClient, InferenceError, Prediction};
pub use materials::{lookup, Material, MaterialInfo};
pub use normalizer::normalize;
pub use preview::{LocalPreview, PreviewRegistry, PreviewUrl};
pub use report::{ClassificationReport, ReportError, ReportFormat};
pub use session::{ClassificationSession, SessionError, SessionSnapshot, SessionState, ValidationError};
pub use source::SourceFile;
pub use storage::{ObjectStore, S3ObjectStore, StorageUploader, StoredObject, UploadError};
