//! Prompt Queue for the polling deployment: the web page submits prompts, an
//! external agent pops them one at a time. Unbounded FIFO, no priority.

use crate::error::QueueError;
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::Mutex;

/// A pending prompt with its arrival time (RFC 3339, UTC, millisecond precision).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueEntry {
    pub prompt: String,
    pub timestamp: String,
}

#[derive(Clone, Debug, Default)]
pub struct PromptQueue {
    entries: Arc<Mutex<VecDeque<QueueEntry>>>,
}

impl PromptQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a prompt and return the queue length after the append.
    /// Whitespace-only prompts are refused; stored prompts are trimmed.
    pub async fn submit(&self, prompt: &str) -> Result<usize, QueueError> {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Err(QueueError::EmptyPrompt);
        }
        let entry = QueueEntry {
            prompt: prompt.to_string(),
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        };
        let mut entries = self.entries.lock().await;
        entries.push_back(entry);
        let len = entries.len();
        tracing::info!(target: "strudel::queue", queue_length = len, "prompt queued: {:?}", prompt);
        Ok(len)
    }

    /// Pop the oldest entry. Returns immediately whether or not one exists.
    pub async fn poll(&self) -> Option<QueueEntry> {
        let entry = self.entries.lock().await.pop_front();
        if let Some(e) = &entry {
            tracing::info!(target: "strudel::queue", "handing prompt to agent: {:?}", e.prompt);
        }
        entry
    }
}
