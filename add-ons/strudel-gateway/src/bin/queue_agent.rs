//! Queue Agent: drives the gateway's code buffer from a completion provider.
//!
//! Modes:
//!   queue_agent                  poll `/get-prompt` and answer each queued prompt
//!   queue_agent --interactive    read prompts from the terminal (`code`, `quit`)
//!   queue_agent <prompt words>   generate one piece from the given prompt and exit
//!
//! Run with the gateway up: cargo run --bin queue_agent

use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use strudel_core::{
    build_provider, clean_code_response, compose_prompt, CompletionProvider, Preamble, RelayConfig,
    UpstreamError, DEFAULT_PREAMBLE, NO_CODE_SENTINEL,
};
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Error, Debug)]
enum AgentError {
    #[error("gateway request failed: {0}")]
    Gateway(#[from] reqwest::Error),

    #[error("gateway answered {status} to {path}")]
    GatewayStatus { path: &'static str, status: StatusCode },

    #[error(transparent)]
    Upstream(#[from] UpstreamError),

    #[error("provider returned no usable code")]
    NoCode,
}

#[derive(Debug, PartialEq, Eq)]
enum Mode {
    Poll,
    Interactive,
    Once(String),
}

fn parse_mode(args: impl IntoIterator<Item = String>) -> Mode {
    let args: Vec<String> = args.into_iter().collect();
    match args.first().map(String::as_str) {
        None => Mode::Poll,
        Some("--interactive") | Some("-i") => Mode::Interactive,
        Some(_) => Mode::Once(args.join(" ")),
    }
}

/// One line typed in interactive mode.
#[derive(Debug, PartialEq, Eq)]
enum Command<'a> {
    Quit,
    ShowCode,
    Skip,
    Prompt(&'a str),
}

fn parse_command(line: &str) -> Command<'_> {
    let line = line.trim();
    match line.to_ascii_lowercase().as_str() {
        "" => Command::Skip,
        "quit" | "exit" | "q" => Command::Quit,
        "code" => Command::ShowCode,
        _ => Command::Prompt(line),
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct NextPrompt {
    has_prompt: bool,
    #[serde(default)]
    prompt: Option<String>,
}

#[derive(Deserialize)]
struct CurrentCode {
    #[serde(default)]
    code: String,
}

struct QueueAgent {
    client: Client,
    server_url: String,
    provider: Arc<dyn CompletionProvider>,
    preamble: Preamble,
}

impl QueueAgent {
    fn new(server_url: &str, provider: Arc<dyn CompletionProvider>, preamble: Preamble) -> Self {
        Self {
            client: Client::new(),
            server_url: server_url.trim_end_matches('/').to_string(),
            provider,
            preamble,
        }
    }

    async fn check_server(&self) -> bool {
        match self.client.get(format!("{}/health", self.server_url)).send().await {
            Ok(res) => res.status().is_success(),
            Err(_) => false,
        }
    }

    async fn next_prompt(&self) -> Result<Option<String>, AgentError> {
        let next: NextPrompt = self
            .client
            .get(format!("{}/get-prompt", self.server_url))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        let has_prompt = next.has_prompt;
        Ok(next.prompt.filter(|p| has_prompt && !p.trim().is_empty()))
    }

    async fn current_code(&self) -> Result<String, AgentError> {
        let current: CurrentCode = self
            .client
            .get(format!("{}/code", self.server_url))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(current.code)
    }

    async fn preamble(&self) -> String {
        match self.preamble.load().await {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(target: "strudel::queue", "{}; using built-in preamble", e);
                DEFAULT_PREAMBLE.to_string()
            }
        }
    }

    /// Compose, call the provider and clean the reply. A blank `code` is
    /// replaced by the no-code sentinel.
    async fn generate(&self, prompt: &str, code: &str) -> Result<String, AgentError> {
        let code = if code.trim().is_empty() { NO_CODE_SENTINEL } else { code };
        let full_prompt = compose_prompt(&self.preamble().await, code, prompt);
        let generated = self.provider.generate(&full_prompt).await?;
        let cleaned = clean_code_response(&generated);
        if cleaned.is_empty() {
            return Err(AgentError::NoCode);
        }
        Ok(cleaned)
    }

    async fn push(&self, code: &str) -> Result<(), AgentError> {
        let res = self
            .client
            .post(format!("{}/update", self.server_url))
            .json(&json!({ "code": code }))
            .send()
            .await?;
        if !res.status().is_success() {
            return Err(AgentError::GatewayStatus {
                path: "/update",
                status: res.status(),
            });
        }
        tracing::info!(target: "strudel::queue", chars = code.len(), "code pushed to gateway");
        Ok(())
    }

    /// Answer one queued prompt against the gateway's current code.
    async fn process(&self, prompt: &str) -> Result<String, AgentError> {
        let code = self.current_code().await?;
        let cleaned = self.generate(prompt, &code).await?;
        self.push(&cleaned).await?;
        Ok(cleaned)
    }

    /// One terminal turn. The session keeps its own copy of the code, so a
    /// gateway that is down only costs the push.
    async fn session_turn(&self, current: &mut Option<String>, prompt: &str) -> Result<String, AgentError> {
        let cleaned = self.generate(prompt, current.as_deref().unwrap_or("")).await?;
        if let Err(e) = self.push(&cleaned).await {
            tracing::warn!(target: "strudel::queue", "{} (code kept locally)", e);
        }
        *current = Some(cleaned.clone());
        Ok(cleaned)
    }

    async fn run(&self, poll_interval: Duration) {
        loop {
            match self.next_prompt().await {
                Ok(Some(prompt)) => {
                    tracing::info!(target: "strudel::queue", "processing prompt: {:?}", prompt);
                    if let Err(e) = self.process(&prompt).await {
                        tracing::error!(target: "strudel::queue", "prompt failed: {}", e);
                    }
                }
                Ok(None) => {}
                Err(e) => tracing::warn!(target: "strudel::queue", "poll failed: {}", e),
            }
            tokio::time::sleep(poll_interval).await;
        }
    }

    async fn run_interactive(&self) {
        println!("Strudel AI live coding agent (interactive)");
        println!("  type a music description to start or update the piece");
        println!("  'code' shows the current code, 'quit' exits");

        let mut current = None;
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            let line = match lines.next_line().await {
                Ok(Some(line)) => line,
                Ok(None) => break,
                Err(e) => {
                    tracing::error!(target: "strudel::queue", "stdin read failed: {}", e);
                    break;
                }
            };
            match parse_command(&line) {
                Command::Skip => {}
                Command::Quit => break,
                Command::ShowCode => match &current {
                    Some(code) => println!("{}\n{}\n{}", "-".repeat(50), code, "-".repeat(50)),
                    None => println!("No code generated yet"),
                },
                Command::Prompt(prompt) => match self.session_turn(&mut current, prompt).await {
                    Ok(code) => println!("{}", code),
                    Err(e) => tracing::error!(target: "strudel::queue", "prompt failed: {}", e),
                },
            }
        }
    }
}

#[tokio::main]
async fn main() {
    if let Err(e) = dotenvy::dotenv() {
        eprintln!("[queue_agent] .env not loaded: {} (using system environment)", e);
    }

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = match RelayConfig::load() {
        Ok(c) => c,
        Err(e) => {
            tracing::error!("configuration error: {}", e);
            std::process::exit(1);
        }
    };
    let provider = match build_provider(&config) {
        Ok(p) => p,
        Err(e) => {
            tracing::error!("provider setup failed: {}", e);
            std::process::exit(1);
        }
    };

    let poll_interval = Duration::from_millis(config.poll_interval_ms.max(1));
    let agent = QueueAgent::new(&config.server_url, provider, config.preamble());

    if !agent.check_server().await {
        tracing::warn!(target: "strudel::queue", "gateway at {} is not answering /health", agent.server_url);
    }

    match parse_mode(std::env::args().skip(1)) {
        Mode::Poll => {
            tracing::info!(
                target: "strudel::queue",
                "queue agent polling {} every {:?} with provider {}",
                agent.server_url,
                poll_interval,
                agent.provider.name()
            );
            tokio::select! {
                _ = agent.run(poll_interval) => {}
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!(target: "strudel::queue", "Shutdown requested (Ctrl+C received)");
                }
            }
        }
        Mode::Interactive => {
            tokio::select! {
                _ = agent.run_interactive() => {}
                _ = tokio::signal::ctrl_c() => {}
            }
            // The stdin reader sits on a blocking thread the runtime would wait for.
            std::process::exit(0);
        }
        Mode::Once(prompt) => {
            let mut current = None;
            match agent.session_turn(&mut current, &prompt).await {
                Ok(code) => println!("{}", code),
                Err(e) => {
                    tracing::error!(target: "strudel::queue", "prompt failed: {}", e);
                    std::process::exit(1);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::extract::State;
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use serde_json::Value;
    use std::sync::Mutex;
    use strudel_core::MockProvider;

    /// Answers with a fixed reply and records every composed prompt.
    struct Recording {
        reply: &'static str,
        seen: Mutex<Vec<String>>,
    }

    impl Recording {
        fn new(reply: &'static str) -> Arc<Self> {
            Arc::new(Self { reply, seen: Mutex::new(Vec::new()) })
        }
    }

    #[async_trait]
    impl CompletionProvider for Recording {
        fn name(&self) -> &str {
            "recording"
        }

        async fn generate(&self, prompt: &str) -> Result<String, UpstreamError> {
            self.seen.lock().unwrap().push(prompt.to_string());
            Ok(self.reply.to_string())
        }
    }

    /// Minimal stand-in for the gateway's `/code` and `/update`.
    #[derive(Clone)]
    struct StubGateway {
        code: &'static str,
        update_status: axum::http::StatusCode,
        posted: Arc<Mutex<Vec<String>>>,
    }

    impl StubGateway {
        fn new(code: &'static str) -> Self {
            Self {
                code,
                update_status: axum::http::StatusCode::OK,
                posted: Arc::new(Mutex::new(Vec::new())),
            }
        }

        async fn spawn(&self) -> String {
            let app = Router::new()
                .route(
                    "/code",
                    get(|State(gw): State<StubGateway>| async move { Json(json!({ "code": gw.code })) }),
                )
                .route(
                    "/update",
                    post(|State(gw): State<StubGateway>, Json(body): Json<Value>| async move {
                        let code = body["code"].as_str().unwrap_or_default().to_string();
                        gw.posted.lock().unwrap().push(code);
                        (gw.update_status, Json(json!({ "success": gw.update_status.is_success() })))
                    }),
                )
                .with_state(self.clone());
            let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
            let addr = listener.local_addr().unwrap();
            tokio::spawn(async move {
                axum::serve(listener, app).await.unwrap();
            });
            format!("http://{}", addr)
        }

        fn posted(&self) -> Vec<String> {
            self.posted.lock().unwrap().clone()
        }
    }

    fn agent(base: &str, provider: Arc<dyn CompletionProvider>) -> QueueAgent {
        QueueAgent::new(base, provider, Preamble::Inline("Write Strudel.".to_string()))
    }

    #[tokio::test]
    async fn cleaned_code_is_pushed_to_update() {
        let gateway = StubGateway::new("s(\"bd\")");
        let base = gateway.spawn().await;
        let provider = Recording::new("```javascript\n// layered groove\nstack(s(\"bd*4\"), s(\"~ cp\"))\n```");
        let agent = agent(&base, provider.clone());

        let pushed = agent.process("add claps").await.unwrap();
        assert_eq!(pushed, "stack(s(\"bd*4\"), s(\"~ cp\"))");
        assert_eq!(gateway.posted(), vec![pushed]);

        let seen = provider.seen.lock().unwrap();
        assert_eq!(seen[0], compose_prompt("Write Strudel.", "s(\"bd\")", "add claps"));
    }

    #[tokio::test]
    async fn blank_gateway_code_becomes_sentinel() {
        let gateway = StubGateway::new("   ");
        let base = gateway.spawn().await;
        let provider = Recording::new("s(\"hh*8\")");
        agent(&base, provider.clone()).process("start something").await.unwrap();

        let seen = provider.seen.lock().unwrap();
        assert!(seen[0].contains(&format!("```javascript\n{}\n```", NO_CODE_SENTINEL)));
    }

    #[tokio::test]
    async fn rejected_update_is_an_error() {
        let mut gateway = StubGateway::new("s(\"bd\")");
        gateway.update_status = axum::http::StatusCode::INTERNAL_SERVER_ERROR;
        let base = gateway.spawn().await;

        let err = agent(&base, Recording::new("s(\"cp\")")).process("x").await.unwrap_err();
        assert!(matches!(
            err,
            AgentError::GatewayStatus { path: "/update", status } if status == StatusCode::INTERNAL_SERVER_ERROR
        ));
    }

    #[tokio::test]
    async fn mock_provider_round_trip() {
        let gateway = StubGateway::new("s(\"bd sd\")");
        let base = gateway.spawn().await;
        let pushed = agent(&base, Arc::new(MockProvider::new()))
            .process("make it faster")
            .await
            .unwrap();
        assert!(pushed.contains(".fast("));
        assert_eq!(gateway.posted(), vec![pushed]);
    }

    #[tokio::test]
    async fn comment_only_reply_is_no_code() {
        let gateway = StubGateway::new("s(\"bd\")");
        let base = gateway.spawn().await;
        let err = agent(&base, Recording::new("```js\n// nothing to play\n```"))
            .process("x")
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::NoCode));
        assert!(gateway.posted().is_empty());
    }

    #[tokio::test]
    async fn session_carries_code_between_turns() {
        let gateway = StubGateway::new("ignored by sessions");
        let base = gateway.spawn().await;
        let provider = Recording::new("s(\"bd*2\")");
        let agent = agent(&base, provider.clone());

        let mut current = None;
        agent.session_turn(&mut current, "start").await.unwrap();
        agent.session_turn(&mut current, "more").await.unwrap();
        assert_eq!(current.as_deref(), Some("s(\"bd*2\")"));

        let seen = provider.seen.lock().unwrap();
        assert!(seen[0].contains(NO_CODE_SENTINEL));
        assert!(seen[1].contains("```javascript\ns(\"bd*2\")\n```"));
        assert_eq!(gateway.posted().len(), 2);
    }

    #[tokio::test]
    async fn session_keeps_code_when_gateway_is_down() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let agent = agent(&format!("http://{}", addr), Recording::new("note(\"c3\")"));
        let mut current = None;
        let code = agent.session_turn(&mut current, "melody").await.unwrap();
        assert_eq!(code, "note(\"c3\")");
        assert_eq!(current.as_deref(), Some("note(\"c3\")"));
    }

    #[test]
    fn mode_from_arguments() {
        let args = |a: &[&str]| a.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        assert_eq!(parse_mode(args(&[])), Mode::Poll);
        assert_eq!(parse_mode(args(&["--interactive"])), Mode::Interactive);
        assert_eq!(parse_mode(args(&["-i"])), Mode::Interactive);
        assert_eq!(
            parse_mode(args(&["dark", "minimal", "techno"])),
            Mode::Once("dark minimal techno".to_string())
        );
    }

    #[test]
    fn interactive_commands() {
        assert_eq!(parse_command("  "), Command::Skip);
        assert_eq!(parse_command("QUIT"), Command::Quit);
        assert_eq!(parse_command("exit"), Command::Quit);
        assert_eq!(parse_command("code"), Command::ShowCode);
        assert_eq!(parse_command("  add a bassline "), Command::Prompt("add a bassline"));
    }
}
