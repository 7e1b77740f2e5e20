//! Prompt Relay: compose, forward to the completion provider, validate, then
//! overwrite the code store.

use crate::code_store::CodeStore;
use crate::error::{RelayError, RelayResult, UpstreamError};
use crate::prompts::{compose_prompt, Preamble};
use crate::provider::CompletionProvider;
use crate::validate::{AcceptAll, CodeValidator, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Body of `POST /api/prompt`. Fields are optional so a missing field is a
/// 400 from the relay rather than a deserialization failure.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PromptRequest {
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
}

/// JSON answer of `POST /api/prompt`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl RelayResponse {
    pub fn ok(code: String) -> Self {
        Self {
            success: true,
            message: Some("Prompt processed successfully".to_string()),
            response: Some(code),
            error: None,
            details: None,
        }
    }

    pub fn failed(error: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            success: false,
            message: None,
            response: None,
            error: Some(error.into()),
            details: Some(details.into()),
        }
    }
}

#[derive(Clone)]
pub struct PromptRelay {
    store: CodeStore,
    provider: Arc<dyn CompletionProvider>,
    validator: Arc<dyn CodeValidator>,
    preamble: Preamble,
}

impl PromptRelay {
    /// Relay with the default accept-all validator.
    pub fn new(store: CodeStore, provider: Arc<dyn CompletionProvider>, preamble: Preamble) -> Self {
        Self {
            store,
            provider,
            validator: Arc::new(AcceptAll),
            preamble,
        }
    }

    pub fn with_validator(mut self, validator: Arc<dyn CodeValidator>) -> Self {
        self.validator = validator;
        self
    }

    pub fn store(&self) -> &CodeStore {
        &self.store
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// One relay round trip. On any error the code store is left as it was.
    pub async fn relay(&self, prompt: &str, code: &str) -> RelayResult<String> {
        if prompt.is_empty() {
            return Err(RelayError::InvalidInput("Prompt is required"));
        }
        if code.is_empty() {
            return Err(RelayError::InvalidInput("Code is required"));
        }

        let preamble = self.preamble.load().await?;
        let full_prompt = compose_prompt(&preamble, code, prompt);

        tracing::info!(
            target: "strudel::relay",
            provider = self.provider.name(),
            prompt_chars = full_prompt.len(),
            "relaying prompt: {:?}",
            prompt
        );
        let text = self.provider.generate(&full_prompt).await?;
        if text.is_empty() {
            return Err(UpstreamError::EmptyCompletion.into());
        }
        tracing::debug!(target: "strudel::relay", "generated code:\n{}", text);

        match self.validator.validate(&text) {
            Validation::Accepted => {}
            Validation::Rejected(reason) => {
                tracing::warn!(target: "strudel::relay", "generated code rejected: {}", reason);
                return Err(RelayError::Rejected(reason));
            }
        }

        self.store.set(text.clone()).await?;
        tracing::info!(target: "strudel::relay", chars = text.len(), "code buffer updated from relay");
        Ok(text)
    }
}
