//! strudel-core: the relay between the Strudel live-coding page and a
//! generative-AI endpoint.
//!
//! Holds the current code buffer, the optional prompt queue, prompt
//! composition, and the completion providers the relay forwards to.

mod code_store;
mod config;
mod error;
mod prompt_queue;
mod relay;
mod validate;
pub mod prompts;
pub mod provider;

pub use code_store::{CodeStore, DEFAULT_CODE};
pub use self::config::{ProviderKind, RelayConfig, DEFAULT_AGENT_ENDPOINT};
pub use error::{ConfigError, QueueError, RelayError, RelayResult, StoreError, UpstreamError};
pub use prompt_queue::{PromptQueue, QueueEntry};
pub use prompts::{clean_code_response, compose_prompt, Preamble, DEFAULT_PREAMBLE, NO_CODE_SENTINEL};
pub use provider::{build_provider, AgentEndpoint, CompletionProvider, MockProvider, VertexStream};
pub use relay::{PromptRelay, PromptRequest, RelayResponse};
pub use validate::{AcceptAll, CodeValidator, Validation};
