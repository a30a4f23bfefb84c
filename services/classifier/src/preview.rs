//! Ephemeral local preview references.
//!
//! A [`LocalPreview`] is a `blob:` URL that resolves to the in-memory
//! contents of a selected file for as long as the handle is alive.
//! Dropping the handle releases it.

use bytes::Bytes;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Weak};
use tracing::trace;
use uuid::Uuid;

const SCHEME: &str = "blob:";

type Entries = Mutex<HashMap<Uuid, Bytes>>;

/// Allocates and resolves local preview references
#[derive(Clone, Default)]
pub struct PreviewRegistry {
    entries: Arc<Entries>,
}

impl PreviewRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a preview for `bytes`
    pub fn create(&self, bytes: Bytes) -> LocalPreview {
        let id = Uuid::new_v4();
        self.entries.lock().insert(id, bytes);
        trace!(%id, "Local preview allocated");

        LocalPreview {
            id,
            url: format!("{SCHEME}{id}"),
            entries: Arc::downgrade(&self.entries),
        }
    }

    /// Contents behind a live preview URL
    pub fn resolve(&self, url: &str) -> Option<Bytes> {
        let id = url.strip_prefix(SCHEME)?.parse::<Uuid>().ok()?;
        self.entries.lock().get(&id).cloned()
    }

    /// Number of previews not yet released
    pub fn live_count(&self) -> usize {
        self.entries.lock().len()
    }
}

/// Handle to a local preview; released on drop
pub struct LocalPreview {
    id: Uuid,
    url: String,
    entries: Weak<Entries>,
}

impl LocalPreview {
    pub fn url(&self) -> &str {
        &self.url
    }
}

impl fmt::Debug for LocalPreview {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("LocalPreview").field(&self.url).finish()
    }
}

impl Drop for LocalPreview {
    fn drop(&mut self) {
        if let Some(entries) = self.entries.upgrade() {
            entries.lock().remove(&self.id);
            trace!(id = %self.id, "Local preview released");
        }
    }
}

/// Where a session's preview image currently lives
#[derive(Debug)]
pub enum PreviewUrl {
    /// In-memory copy of the selected file
    Local(LocalPreview),
    /// Public URL of the uploaded object
    Remote(String),
}

impl PreviewUrl {
    pub fn as_str(&self) -> &str {
        match self {
            PreviewUrl::Local(preview) => preview.url(),
            PreviewUrl::Remote(url) => url,
        }
    }
}
