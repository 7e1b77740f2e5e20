//! Agent endpoint: a small REST wrapper around a hosted agent.
//! Request `{"input": prompt}`, reply `{"result": "..."}`.

use super::CompletionProvider;
use crate::error::UpstreamError;
use async_trait::async_trait;
use serde::Serialize;

#[derive(Serialize)]
struct AgentRequest<'a> {
    input: &'a str,
}

pub struct AgentEndpoint {
    url: String,
    client: reqwest::Client,
}

impl AgentEndpoint {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            client: reqwest::Client::new(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl CompletionProvider for AgentEndpoint {
    fn name(&self) -> &str {
        "agent"
    }

    async fn generate(&self, prompt: &str) -> Result<String, UpstreamError> {
        tracing::info!(target: "strudel::provider", url = %self.url, "calling agent endpoint");

        let res = self
            .client
            .post(&self.url)
            .json(&AgentRequest { input: prompt })
            .send()
            .await?;

        let status = res.status();
        let text = res.text().await?;
        if !status.is_success() {
            tracing::error!(target: "strudel::provider", status = %status, "agent endpoint error: {}", text);
            return Err(UpstreamError::Status {
                status: status.as_u16(),
                body: text,
            });
        }

        let parsed: serde_json::Value = serde_json::from_str(&text)?;
        match parsed.get("result") {
            Some(serde_json::Value::String(s)) if !s.is_empty() => Ok(s.clone()),
            _ => Err(UpstreamError::MissingField("result")),
        }
    }
}
