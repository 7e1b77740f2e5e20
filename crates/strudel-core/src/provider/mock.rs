//! Offline provider: picks a canned Strudel pattern from keywords in the
//! prompt. Lets the gateway and the queue agent run without credentials.

use super::CompletionProvider;
use crate::error::UpstreamError;
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};

const INITIAL: &[&str] = &[
    "s(\"bd sd bd sd\").gain(0.8)",
    "stack(\n  s(\"bd bd bd bd\").gain(0.8),\n  s(\"~ cp ~ cp\").room(0.3)\n)",
    "s(\"bd ~ bd ~, ~ ~ cp ~, hh*8\").room(0.4)",
];

const WITH_BASS: &[&str] = &[
    "stack(\n  s(\"bd sd bd sd\").gain(0.8),\n  note(\"c2 ~ e2 ~\").s(\"sawtooth\").lpf(400)\n)",
    "stack(\n  s(\"bd bd bd bd\"),\n  s(\"~ cp ~ cp\"),\n  note(\"c2 c2 e2 f2\").s(\"sawtooth\").slow(2).lpf(300)\n)",
];

const FASTER: &[&str] = &[
    "s(\"bd sd bd sd\").fast(2).gain(0.8)",
    "stack(\n  s(\"bd bd bd bd\").fast(1.5),\n  s(\"~ cp ~ cp\").fast(1.5),\n  s(\"hh*16\").gain(0.3)\n)",
];

const ATMOSPHERIC: &[&str] = &[
    "stack(\n  s(\"bd sd bd sd\"),\n  note(\"c3 e3 g3 a3\").s(\"sawtooth\").slow(4).room(0.8).lpf(600)\n)",
    "stack(\n  s(\"bd ~ bd ~\"),\n  note(\"c3 e3 g3\").s(\"triangle\").slow(8).room(0.9).delay(0.5)\n)",
];

const MINIMAL_TECHNO: &[&str] = &[
    "stack(\n  s(\"bd ~ ~ ~ bd ~ ~ ~\").gain(0.9),\n  s(\"~ ~ ~ ~ ~ ~ cp ~\").room(0.3),\n  s(\"hh*8\").gain(0.4)\n).fast(2)",
];

const HOUSE: &[&str] = &[
    "stack(\n  s(\"bd bd bd bd\").gain(0.8),\n  s(\"~ cp ~ cp\").room(0.4),\n  note(\"c3 e3 g3 b3\").s(\"piano\").slow(2),\n  s(\"shaker*8\").gain(0.3)\n)",
];

#[derive(Debug, Default)]
pub struct MockProvider {
    calls: AtomicUsize,
}

impl MockProvider {
    pub fn new() -> Self {
        Self::default()
    }

    fn pick(&self, prompt: &str) -> &'static str {
        let n = self.calls.fetch_add(1, Ordering::Relaxed);
        // The composed prompt embeds the preamble and current code; only the
        // user's request decides the pattern.
        let request = prompt
            .rsplit_once("User Prompt:")
            .map(|(_, p)| p)
            .unwrap_or(prompt)
            .to_lowercase();
        let family = if mentions(&request, &["bass"]) {
            WITH_BASS
        } else if mentions(&request, &["faster", "speed"]) {
            FASTER
        } else if mentions(&request, &["atmospheric", "pad", "ambient"]) {
            ATMOSPHERIC
        } else if mentions(&request, &["techno"]) {
            MINIMAL_TECHNO
        } else if mentions(&request, &["house"]) {
            HOUSE
        } else {
            INITIAL
        };
        family[n % family.len()]
    }
}

fn mentions(request: &str, words: &[&str]) -> bool {
    words.iter().any(|w| request.contains(w))
}

#[async_trait]
impl CompletionProvider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    async fn generate(&self, prompt: &str) -> Result<String, UpstreamError> {
        let code = self.pick(prompt);
        tracing::info!(target: "strudel::provider", "[mock] generated {} chars", code.len());
        Ok(code.to_string())
    }
}
