//! Classification session state machine.
//!
//! A session tracks one attempt end to end:
//!
//! ```text
//!            select_file             upload ok            classify            inference ok
//! ┌───────┐ ───────────▶ ┌───────────┐ ────────▶ ┌────────┐ ────────▶ ┌─────────────┐ ────────▶ ┌──────┐
//! │ Empty │              │ Uploading │           │ Staged │           │ Classifying │           │ Done │
//! └───────┘ ◀─────────── └───────────┘           └────────┘ ◀──────── └─────────────┘           └──────┘
//!     ▲      upload err                               inference err
//!     └──────────────────────── reset (from any state) ─────────────────────────────────────────────┘
//! ```
//!
//! Operations take `&self` so that [`ClassificationSession::reset`] can run
//! while an upload or inference is suspended. Each attempt carries a
//! cancellation token and a generation number; `reset` cancels the token
//! and bumps the generation, and a completion whose generation is stale is
//! dropped without touching the session.

use crate::config::UploadConfig;
use crate::inference::{ClassificationResult, ImageClassifier, InferenceError};
use crate::preview::{PreviewRegistry, PreviewUrl};
use crate::source::SourceFile;
use crate::storage::{StorageUploader, StoredObject, UploadError};
use parking_lot::Mutex;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// Lifecycle state of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Empty,
    Uploading,
    Staged,
    Classifying,
    Done,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Empty => "empty",
            SessionState::Uploading => "uploading",
            SessionState::Staged => "staged",
            SessionState::Classifying => "classifying",
            SessionState::Done => "done",
        };
        f.write_str(name)
    }
}

/// Rejected operation or file
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Cannot {operation} while session is {state}")]
    InvalidState {
        operation: &'static str,
        state: SessionState,
    },

    #[error("Selected file is empty")]
    EmptyFile,

    #[error("File is {size} bytes, limit is {limit}")]
    FileTooLarge { size: usize, limit: usize },

    #[error("Unsupported content type: {0}")]
    UnsupportedContentType(String),
}

/// Errors surfaced by session operations
#[derive(Error, Debug)]
pub enum SessionError {
    #[error(transparent)]
    Upload(#[from] UploadError),

    #[error(transparent)]
    Inference(#[from] InferenceError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Session was reset before the operation completed")]
    Superseded,
}

/// Point-in-time view of a session
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub state: SessionState,
    pub file_name: Option<String>,
    pub preview_url: Option<String>,
    pub storage_key: Option<String>,
    pub result: Option<ClassificationResult>,
    pub busy: bool,
}

struct Inner {
    state: SessionState,
    source_file: Option<SourceFile>,
    preview: Option<PreviewUrl>,
    storage_key: Option<String>,
    result: Option<ClassificationResult>,
    generation: u64,
    cancel: CancellationToken,
}

impl Inner {
    fn new() -> Self {
        Self {
            state: SessionState::Empty,
            source_file: None,
            preview: None,
            storage_key: None,
            result: None,
            generation: 0,
            cancel: CancellationToken::new(),
        }
    }

    fn clear(&mut self) {
        self.state = SessionState::Empty;
        self.source_file = None;
        // Dropping a local preview releases it
        self.preview = None;
        self.storage_key = None;
        self.result = None;
    }
}

/// What to undo when an in-flight operation is dropped before it finishes
#[derive(Debug, Clone, Copy)]
enum Rollback {
    /// Abandoned upload: forget the file
    Upload,
    /// Abandoned inference: back to `Staged`
    Classify,
}

/// Restores the session if the operation future is dropped mid-flight.
///
/// Disarm it before re-locking `inner` on the normal completion path.
struct InFlight<'a> {
    inner: &'a Mutex<Inner>,
    generation: u64,
    rollback: Rollback,
    armed: bool,
}

impl<'a> InFlight<'a> {
    fn new(inner: &'a Mutex<Inner>, generation: u64, rollback: Rollback) -> Self {
        Self {
            inner,
            generation,
            rollback,
            armed: true,
        }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }

        let mut inner = self.inner.lock();
        if inner.generation != self.generation {
            return;
        }

        match self.rollback {
            Rollback::Upload => inner.clear(),
            Rollback::Classify => inner.state = SessionState::Staged,
        }
        debug!(generation = self.generation, rollback = ?self.rollback, "Operation dropped before completion");
    }
}

/// State container for one classification attempt
pub struct ClassificationSession {
    inner: Mutex<Inner>,
    uploader: StorageUploader,
    classifier: Arc<dyn ImageClassifier>,
    previews: PreviewRegistry,
    limits: UploadConfig,
}

impl ClassificationSession {
    pub fn new(uploader: StorageUploader, classifier: Arc<dyn ImageClassifier>) -> Self {
        Self {
            inner: Mutex::new(Inner::new()),
            uploader,
            classifier,
            previews: PreviewRegistry::new(),
            limits: UploadConfig::default(),
        }
    }

    /// Apply file size and type limits
    pub fn with_limits(mut self, limits: UploadConfig) -> Self {
        self.limits = limits;
        self
    }

    /// Registry backing local previews
    pub fn previews(&self) -> &PreviewRegistry {
        &self.previews
    }

    pub fn state(&self) -> SessionState {
        self.inner.lock().state
    }

    /// True while an upload or inference call is outstanding
    pub fn is_busy(&self) -> bool {
        matches!(
            self.state(),
            SessionState::Uploading | SessionState::Classifying
        )
    }

    pub fn result(&self) -> Option<ClassificationResult> {
        self.inner.lock().result.clone()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let inner = self.inner.lock();
        SessionSnapshot {
            state: inner.state,
            file_name: inner.source_file.as_ref().map(|f| f.name.clone()),
            preview_url: inner.preview.as_ref().map(|p| p.as_str().to_string()),
            storage_key: inner.storage_key.clone(),
            result: inner.result.clone(),
            busy: matches!(
                inner.state,
                SessionState::Uploading | SessionState::Classifying
            ),
        }
    }

    /// Select a file and upload it.
    ///
    /// Valid only from `Empty`. A local preview is available as soon as
    /// the upload starts; on success the session is `Staged` and the
    /// preview points at the stored object. On failure, or if this future
    /// is dropped before it resolves, the file is dropped and the session
    /// returns to `Empty`.
    #[instrument(skip(self, file), fields(file_name = %file.name))]
    pub async fn select_file(&self, file: SourceFile) -> Result<StoredObject, SessionError> {
        file.validate(&self.limits)?;

        let (generation, cancel) = {
            let mut inner = self.inner.lock();
            if inner.state != SessionState::Empty {
                warn!(state = %inner.state, "File selected while session is not empty");
                return Err(ValidationError::InvalidState {
                    operation: "select a file",
                    state: inner.state,
                }
                .into());
            }

            inner.preview = Some(PreviewUrl::Local(self.previews.create(file.bytes.clone())));
            inner.source_file = Some(file.clone());
            inner.state = SessionState::Uploading;
            (inner.generation, inner.cancel.clone())
        };

        let mut in_flight = InFlight::new(&self.inner, generation, Rollback::Upload);
        debug!(generation, "Upload started");

        let outcome = tokio::select! {
            outcome = self.uploader.upload(&file) => outcome,
            _ = cancel.cancelled() => {
                debug!(generation, "Upload abandoned after reset");
                return Err(SessionError::Superseded);
            }
        };

        in_flight.disarm();
        let mut inner = self.inner.lock();
        if inner.generation != generation {
            debug!(generation, current = inner.generation, "Discarding stale upload");
            return Err(SessionError::Superseded);
        }

        match outcome {
            Ok(stored) => {
                inner.storage_key = Some(stored.key.clone());
                inner.preview = Some(PreviewUrl::Remote(stored.public_url.clone()));
                inner.state = SessionState::Staged;
                info!(storage_key = %stored.key, "Session staged");
                Ok(stored)
            }
            Err(e) => {
                inner.clear();
                warn!(error = %e, "Upload failed, session returned to empty");
                Err(e.into())
            }
        }
    }

    /// Classify the staged image.
    ///
    /// Valid only from `Staged`. On success the result is stored and the
    /// session is `Done`; on failure, or if this future is dropped before
    /// it resolves, it stays `Staged` so the caller can retry.
    #[instrument(skip(self))]
    pub async fn classify(&self) -> Result<ClassificationResult, SessionError> {
        let (generation, cancel, image_url) = {
            let mut inner = self.inner.lock();

            let image_url = match (inner.state, &inner.storage_key, &inner.preview) {
                (SessionState::Staged, Some(_), Some(PreviewUrl::Remote(url))) => url.clone(),
                (state, _, _) => {
                    warn!(%state, "Classification requested without a staged upload");
                    return Err(ValidationError::InvalidState {
                        operation: "classify",
                        state,
                    }
                    .into());
                }
            };

            inner.state = SessionState::Classifying;
            (inner.generation, inner.cancel.clone(), image_url)
        };

        let mut in_flight = InFlight::new(&self.inner, generation, Rollback::Classify);
        debug!(generation, image_url = %image_url, "Classification started");

        let outcome = tokio::select! {
            outcome = self.classifier.classify(&image_url) => outcome,
            _ = cancel.cancelled() => {
                debug!(generation, "Classification abandoned after reset");
                return Err(SessionError::Superseded);
            }
        };

        in_flight.disarm();
        let mut inner = self.inner.lock();
        if inner.generation != generation {
            debug!(generation, current = inner.generation, "Discarding stale classification");
            return Err(SessionError::Superseded);
        }

        match outcome {
            Ok(result) => {
                inner.result = Some(result.clone());
                inner.state = SessionState::Done;
                info!(
                    category = %result.category,
                    confidence = result.confidence,
                    "Session classified"
                );
                Ok(result)
            }
            Err(e) => {
                inner.state = SessionState::Staged;
                warn!(error = %e, status = ?e.status(), "Classification failed, session still staged");
                Err(e.into())
            }
        }
    }

    /// Clear the session from any state.
    ///
    /// Releases the local preview and abandons any in-flight operation;
    /// late completions of that operation are ignored.
    pub fn reset(&self) {
        let mut inner = self.inner.lock();
        inner.cancel.cancel();
        inner.cancel = CancellationToken::new();
        inner.generation += 1;
        inner.clear();
        debug!(generation = inner.generation, "Session reset");
    }
}
