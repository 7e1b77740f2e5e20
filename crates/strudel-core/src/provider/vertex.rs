//! Vertex AI Gemini over `streamGenerateContent?alt=sse`.
//!
//! The reply arrives as SSE `data:` chunks, each carrying a slice of every
//! candidate's text. Only candidate 0 is kept; its text parts are concatenated
//! in arrival order.

use super::CompletionProvider;
use crate::error::UpstreamError;
use async_trait::async_trait;
use futures_util::TryStreamExt;
use serde::{Deserialize, Serialize};

/// Sampling parameters forwarded as `generationConfig`.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub temperature: f32,
    pub top_p: f32,
    pub top_k: u32,
    pub max_output_tokens: u32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            top_p: 0.95,
            top_k: 40,
            max_output_tokens: 2048,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Deserialize, Debug)]
struct StreamChunk {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize, Debug)]
struct Candidate {
    #[serde(default)]
    index: Option<u32>,
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Deserialize, Debug)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize, Debug)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}

/// Accumulates candidate-0 text from SSE bytes. Lines (and the UTF-8
/// sequences inside them) may be split across network chunks, so raw bytes
/// are buffered and only complete lines are decoded.
#[derive(Default)]
pub(crate) struct SseAggregator {
    buffer: Vec<u8>,
    text: String,
    saw_event: bool,
}

impl SseAggregator {
    pub(crate) fn push(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
        while let Some(newline_pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=newline_pos).collect();
            let line = String::from_utf8_lossy(&line);
            self.process_line(line.trim());
        }
    }

    fn process_line(&mut self, line: &str) {
        let Some(data) = line.strip_prefix("data:") else {
            return;
        };
        let data = data.trim();
        self.saw_event = true;
        if data.is_empty() || data == "[DONE]" {
            return;
        }
        match serde_json::from_str::<StreamChunk>(data) {
            Ok(chunk) => self.absorb(chunk),
            Err(e) => {
                tracing::debug!(target: "strudel::provider", "skipping unparseable SSE chunk: {} - data: {}", e, data);
            }
        }
    }

    fn absorb(&mut self, chunk: StreamChunk) {
        let first = chunk
            .candidates
            .into_iter()
            .find(|c| c.index.unwrap_or(0) == 0);
        if let Some(content) = first.and_then(|c| c.content) {
            for part in content.parts {
                if let Some(t) = part.text {
                    self.text.push_str(&t);
                }
            }
        }
    }

    /// Flush the trailing line and return the aggregated text.
    /// A body with no SSE events is read as a plain JSON array of chunks.
    pub(crate) fn finish(mut self) -> Result<String, UpstreamError> {
        let rest = std::mem::take(&mut self.buffer);
        let rest = String::from_utf8_lossy(&rest);
        let rest = rest.trim();
        if !rest.is_empty() {
            if rest.starts_with("data:") {
                self.process_line(rest);
            } else if !self.saw_event {
                let chunks: Vec<StreamChunk> = serde_json::from_str(rest)?;
                for chunk in chunks {
                    self.absorb(chunk);
                }
            }
        }
        if self.text.is_empty() {
            return Err(UpstreamError::EmptyCompletion);
        }
        Ok(self.text)
    }
}

pub struct VertexStream {
    url: String,
    bearer_token: Option<String>,
    generation: GenerationConfig,
    client: reqwest::Client,
}

impl VertexStream {
    /// Regional Vertex AI endpoint for a Google publisher model.
    pub fn new(project: &str, region: &str, model: &str) -> Self {
        Self::with_url(format!(
            "https://{region}-aiplatform.googleapis.com/v1/projects/{project}/locations/{region}/publishers/google/models/{model}:streamGenerateContent?alt=sse"
        ))
    }

    /// Explicit URL (proxies, emulators, tests).
    pub fn with_url(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            bearer_token: None,
            generation: GenerationConfig::default(),
            client: reqwest::Client::new(),
        }
    }

    pub fn with_bearer_token(mut self, token: &str) -> Self {
        self.bearer_token = Some(token.trim().to_string());
        self
    }

    pub fn with_generation_config(mut self, generation: GenerationConfig) -> Self {
        self.generation = generation;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl CompletionProvider for VertexStream {
    fn name(&self) -> &str {
        "vertex"
    }

    async fn generate(&self, prompt: &str) -> Result<String, UpstreamError> {
        tracing::info!(target: "strudel::provider", url = %self.url, "streaming Gemini completion");

        let body = GenerateRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![Part { text: prompt }],
            }],
            generation_config: self.generation,
        };

        let mut request = self.client.post(&self.url).json(&body);
        if let Some(token) = &self.bearer_token {
            request = request.bearer_auth(token);
        }
        let response = request.send().await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
            tracing::error!(target: "strudel::provider", status = %status, "Gemini error: {}", error_text);
            return Err(UpstreamError::Status {
                status: status.as_u16(),
                body: error_text,
            });
        }

        let mut stream = response.bytes_stream();
        let mut aggregator = SseAggregator::default();
        while let Some(bytes) = stream.try_next().await? {
            aggregator.push(&bytes);
        }
        let text = aggregator.finish()?;
        tracing::info!(target: "strudel::provider", chars = text.len(), "Gemini stream completed");
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::testing::spawn_stub;
    use axum::{http::StatusCode, routing::post, Json, Router};

    fn chunk(text: &str) -> String {
        format!(
            "data: {}\n\n",
            serde_json::json!({
                "candidates": [{ "index": 0, "content": { "role": "model", "parts": [{ "text": text }] } }]
            })
        )
    }

    #[test]
    fn aggregates_candidate_zero_across_split_chunks() {
        let mut agg = SseAggregator::default();
        let body = format!("{}{}", chunk("s(\"bd sd\")"), chunk(".fast(2)"));
        let (a, b) = body.split_at(17);
        agg.push(a.as_bytes());
        agg.push(b.as_bytes());
        assert_eq!(agg.finish().unwrap(), "s(\"bd sd\").fast(2)");
    }

    #[test]
    fn multibyte_character_split_across_chunks_survives() {
        let mut agg = SseAggregator::default();
        let body = format!("{}{}", chunk("// café\n"), chunk("s(\"bd\")"));
        let bytes = body.as_bytes();
        let split = body.find('é').unwrap() + 1;
        assert!(!body.is_char_boundary(split));
        agg.push(&bytes[..split]);
        agg.push(&bytes[split..]);
        assert_eq!(agg.finish().unwrap(), "// café\ns(\"bd\")");
    }

    #[test]
    fn ignores_other_candidates() {
        let mut agg = SseAggregator::default();
        let line = serde_json::json!({
            "candidates": [
                { "index": 1, "content": { "parts": [{ "text": "WRONG" }] } },
                { "index": 0, "content": { "parts": [{ "text": "note(" }, { "text": "\"c3\")" }] } }
            ]
        });
        agg.push(format!("data: {}\n", line).as_bytes());
        assert_eq!(agg.finish().unwrap(), "note(\"c3\")");
    }

    #[test]
    fn final_line_without_newline_is_flushed() {
        let mut agg = SseAggregator::default();
        agg.push(chunk("s(\"hh*8\")").trim_end().as_bytes());
        assert_eq!(agg.finish().unwrap(), "s(\"hh*8\")");
    }

    #[test]
    fn plain_json_array_body_is_accepted() {
        let mut agg = SseAggregator::default();
        let body = serde_json::json!([
            { "candidates": [{ "content": { "parts": [{ "text": "s(\"bd\")" }] } }] },
            { "candidates": [{ "content": { "parts": [{ "text": ".slow(2)" }] } }] }
        ]);
        agg.push(body.to_string().as_bytes());
        assert_eq!(agg.finish().unwrap(), "s(\"bd\").slow(2)");
    }

    #[test]
    fn stream_without_text_is_empty_completion() {
        let mut agg = SseAggregator::default();
        agg.push(b"data: {\"candidates\":[]}\n\n");
        assert!(matches!(agg.finish(), Err(UpstreamError::EmptyCompletion)));
    }

    #[test]
    fn regional_url_is_built_from_project_and_model() {
        let v = VertexStream::new("proj-1", "europe-west4", "gemini-2.5-flash");
        assert_eq!(
            v.url(),
            "https://europe-west4-aiplatform.googleapis.com/v1/projects/proj-1/locations/europe-west4/publishers/google/models/gemini-2.5-flash:streamGenerateContent?alt=sse"
        );
    }

    #[tokio::test]
    async fn streams_from_stub_server() {
        let app = Router::new().route(
            "/stream",
            post(|Json(body): Json<serde_json::Value>| async move {
                assert_eq!(body["contents"][0]["parts"][0]["text"], "compose me");
                assert_eq!(body["generationConfig"]["topK"], 40);
                format!("{}{}", chunk("stack(s(\"bd*4\"),"), chunk(" s(\"~ cp\"))"))
            }),
        );
        let base = spawn_stub(app).await;
        let text = VertexStream::with_url(format!("{}/stream", base))
            .generate("compose me")
            .await
            .unwrap();
        assert_eq!(text, "stack(s(\"bd*4\"), s(\"~ cp\"))");
    }

    #[tokio::test]
    async fn upstream_failure_is_reported_with_status() {
        let app = Router::new().route(
            "/stream",
            post(|| async { (StatusCode::FORBIDDEN, "permission denied") }),
        );
        let base = spawn_stub(app).await;
        let err = VertexStream::with_url(format!("{}/stream", base))
            .with_bearer_token("token")
            .generate("x")
            .await
            .unwrap_err();
        assert!(matches!(err, UpstreamError::Status { status: 403, .. }));
    }
}
