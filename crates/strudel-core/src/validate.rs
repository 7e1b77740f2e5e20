//! Validation hook run on generated code before it replaces the buffer.
//!
//! The deployed relay accepts everything; stricter validators are injected by
//! callers that need them.

/// Verdict of a [`CodeValidator`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Validation {
    Accepted,
    Rejected(String),
}

pub trait CodeValidator: Send + Sync {
    fn validate(&self, code: &str) -> Validation;
}

/// Default validator: every generated snippet is accepted.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAll;

impl CodeValidator for AcceptAll {
    fn validate(&self, _code: &str) -> Validation {
        Validation::Accepted
    }
}

impl<F> CodeValidator for F
where
    F: Fn(&str) -> Validation + Send + Sync,
{
    fn validate(&self, code: &str) -> Validation {
        self(code)
    }
}
