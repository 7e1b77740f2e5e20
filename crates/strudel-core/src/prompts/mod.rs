//! Prompt templates for the relay and cleanup of model replies.

pub mod clean;
pub mod compose;

pub use clean::clean_code_response;
pub use compose::{compose_prompt, Preamble, DEFAULT_PREAMBLE, NO_CODE_SENTINEL, RELAY_TEMPLATE};
