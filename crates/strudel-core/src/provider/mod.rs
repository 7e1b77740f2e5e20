//! Completion providers: one implementation per upstream response shape,
//! selected by [`RelayConfig::provider`](crate::RelayConfig).

mod agent;
mod mock;
mod vertex;

pub use agent::AgentEndpoint;
pub use mock::MockProvider;
pub use vertex::{GenerationConfig, VertexStream};

use crate::config::{ProviderKind, RelayConfig, DEFAULT_AGENT_ENDPOINT};
use crate::error::{ConfigError, UpstreamError};
use async_trait::async_trait;
use std::sync::Arc;

/// Turns one composed prompt into generated code text. Single attempt, no retry.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &str;

    async fn generate(&self, prompt: &str) -> Result<String, UpstreamError>;
}

/// Build the provider named by the config.
pub fn build_provider(config: &RelayConfig) -> Result<Arc<dyn CompletionProvider>, ConfigError> {
    let provider: Arc<dyn CompletionProvider> = match config.provider_kind()? {
        ProviderKind::Agent => {
            let agent = AgentEndpoint::new(config.endpoint.as_deref().unwrap_or(DEFAULT_AGENT_ENDPOINT));
            tracing::info!(target: "strudel::provider", url = agent.url(), "agent endpoint");
            Arc::new(agent)
        }
        ProviderKind::Vertex => {
            let generation = GenerationConfig {
                temperature: config.temperature,
                top_p: config.top_p,
                top_k: config.top_k,
                max_output_tokens: config.max_output_tokens,
            };
            let stream = match config.endpoint.as_deref() {
                Some(url) => VertexStream::with_url(url),
                None => {
                    let project = config.project.as_deref().ok_or(ConfigError::InvalidValue {
                        key: "project",
                        value: "<unset> (required by the vertex provider)".to_string(),
                    })?;
                    VertexStream::new(project, &config.region, &config.model)
                }
            };
            let stream = stream.with_generation_config(generation);
            tracing::info!(target: "strudel::provider", url = stream.url(), model = %config.model, "vertex endpoint");
            Arc::new(match config.api_key() {
                Some(key) => stream.with_bearer_token(key),
                None => stream,
            })
        }
        ProviderKind::Mock => Arc::new(MockProvider::new()),
    };
    tracing::info!(target: "strudel::provider", provider = provider.name(), "completion provider ready");
    Ok(provider)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_each_kind() {
        let agent = build_provider(&RelayConfig::default()).unwrap();
        assert_eq!(agent.name(), "agent");

        let mock = build_provider(&RelayConfig {
            provider: "mock".into(),
            ..RelayConfig::default()
        })
        .unwrap();
        assert_eq!(mock.name(), "mock");

        let vertex = build_provider(&RelayConfig {
            provider: "vertex".into(),
            project: Some("demo".into()),
            ..RelayConfig::default()
        })
        .unwrap();
        assert_eq!(vertex.name(), "vertex");
    }

    #[test]
    fn vertex_without_project_or_endpoint_is_a_config_error() {
        let err = build_provider(&RelayConfig {
            provider: "vertex".into(),
            ..RelayConfig::default()
        })
        .err()
        .unwrap();
        assert!(matches!(err, ConfigError::InvalidValue { key: "project", .. }));
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use axum::Router;

    /// Serve `app` on an ephemeral local port and return its base URL.
    pub(crate) async fn spawn_stub(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }
}
