//! Code Store: the single "current code" buffer shared by the gateway handlers.
//!
//! No history, no versioning. Writers are serialized by the lock and the last
//! one to finish wins.

use crate::error::StoreError;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Buffer contents at startup, before any update or relay.
pub const DEFAULT_CODE: &str = "// Welcome to Strudel AI Live Coding
// Waiting for AI to generate code...

s(\"bd sd\").fast(2)";

/// Cheaply clonable handle to the current code buffer.
#[derive(Clone, Debug)]
pub struct CodeStore {
    code: Arc<RwLock<String>>,
}

impl Default for CodeStore {
    fn default() -> Self {
        Self::new(DEFAULT_CODE)
    }
}

impl CodeStore {
    pub fn new(initial: impl Into<String>) -> Self {
        Self {
            code: Arc::new(RwLock::new(initial.into())),
        }
    }

    /// Current buffer contents.
    pub async fn get(&self) -> String {
        self.code.read().await.clone()
    }

    /// Overwrite the buffer. Empty text is refused; anything else is accepted as-is.
    pub async fn set(&self, text: impl Into<String>) -> Result<String, StoreError> {
        let text = text.into();
        if text.is_empty() {
            return Err(StoreError::EmptyCode);
        }
        *self.code.write().await = text.clone();
        tracing::debug!(target: "strudel::store", bytes = text.len(), "code buffer replaced");
        Ok(text)
    }
}
