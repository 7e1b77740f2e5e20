//! Composite prompt sent upstream: preamble, current code fenced as JavaScript,
//! then the user's request.

use crate::error::RelayError;
use std::path::PathBuf;

/// Substituted for the code when the editor buffer is blank.
pub const NO_CODE_SENTINEL: &str = "There is no code yet. Please start a new piece of music.";

/// Used by the queue agent when no preamble file is readable.
pub const DEFAULT_PREAMBLE: &str = "You are an expert electronic music producer and Strudel live coder.
Strudel is a pattern-based live coding environment for making music in the browser.

Key Strudel concepts:
- Use s(), sound() and note() for samples and synths
- Chain methods with .method() syntax
- Mini-notation: \"bd sd hh sd\" plays kick, snare, hi-hat, snare
- .fast(n) and .slow(n) change tempo, .gain(n) sets volume (0-1)
- .room(n), .delay(n) and .lpf(freq) add effects
- stack() layers patterns
- Samples: bd, sd, hh, cp. Synths: sawtooth, square, triangle

Only output valid Strudel code. No explanations, no markdown.
When updating existing code, return the complete updated version.";

/// Placeholders are replaced by [`compose_prompt`].
pub const RELAY_TEMPLATE: &str = "{preamble}\n\n---\n\nHere is the current code:\n\n```javascript\n{code}\n```\n\n---\n\nUser Prompt: {prompt}";

/// Build the single payload for the completion provider.
///
/// Placeholders are filled in one pass over the template, so braces inside
/// the preamble or the code are never re-interpreted.
pub fn compose_prompt(preamble: &str, code: &str, prompt: &str) -> String {
    let mut out = String::with_capacity(RELAY_TEMPLATE.len() + preamble.len() + code.len() + prompt.len());
    let mut rest = RELAY_TEMPLATE;
    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let tail = &rest[start..];
        let (value, consumed) = if tail.starts_with("{preamble}") {
            (preamble, "{preamble}".len())
        } else if tail.starts_with("{code}") {
            (code, "{code}".len())
        } else if tail.starts_with("{prompt}") {
            (prompt, "{prompt}".len())
        } else {
            ("{", 1)
        };
        out.push_str(value);
        rest = &tail[consumed..];
    }
    out.push_str(rest);
    out
}

/// Where the instructional preamble comes from.
#[derive(Debug, Clone)]
pub enum Preamble {
    /// Re-read on every relay call so edits to the file apply without a restart.
    File(PathBuf),
    Inline(String),
}

impl Preamble {
    pub async fn load(&self) -> Result<String, RelayError> {
        match self {
            Preamble::Inline(text) => Ok(text.clone()),
            Preamble::File(path) => tokio::fs::read_to_string(path)
                .await
                .map_err(|source| RelayError::Preamble {
                    path: path.display().to_string(),
                    source,
                }),
        }
    }
}
