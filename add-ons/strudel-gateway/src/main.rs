//! Strudel Gateway: serves the live-coding page and relays prompts to the
//! configured completion provider. Config-driven via `RelayConfig`.

mod handlers;

use axum::{
    body::Body,
    extract::ConnectInfo,
    http::{Method, Request},
    middleware::Next,
    response::Response,
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use strudel_core::{build_provider, CodeStore, CompletionProvider, PromptQueue, PromptRelay, RelayConfig};
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) config: Arc<RelayConfig>,
    /// Current code buffer. Shared with the relay, which writes it on success.
    pub(crate) store: CodeStore,
    pub(crate) relay: Arc<PromptRelay>,
    /// Pending prompts for the polling agent (queue variant).
    pub(crate) queue: PromptQueue,
}

impl AppState {
    pub(crate) fn new(config: RelayConfig, provider: Arc<dyn CompletionProvider>) -> Self {
        let store = CodeStore::default();
        let relay = PromptRelay::new(store.clone(), provider, config.preamble());
        Self::with_relay(config, relay)
    }

    /// State around a prebuilt relay (custom validator, inline preamble).
    pub(crate) fn with_relay(config: RelayConfig, relay: PromptRelay) -> Self {
        Self {
            config: Arc::new(config),
            store: relay.store().clone(),
            relay: Arc::new(relay),
            queue: PromptQueue::new(),
        }
    }
}

/// Directory holding `index.html` and its assets.
fn frontend_root_dir(config: &RelayConfig) -> PathBuf {
    match config.static_dir.as_deref() {
        Some(dir) => PathBuf::from(dir),
        None => PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("static"),
    }
}

fn build_app(state: AppState) -> Router {
    let queue_enabled = state.config.queue_enabled;
    let frontend_dir = frontend_root_dir(&state.config);

    // The page may be opened from another origin (e.g. a local dev server).
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    let mut app = Router::new()
        .route("/health", get(handlers::health))
        .route("/code", get(handlers::code::get_code))
        .route("/update", post(handlers::code::update_code))
        .route("/api/prompt", post(handlers::relay::api_prompt));

    if queue_enabled {
        app = app
            .route("/prompt", post(handlers::queue::submit_prompt))
            .route("/get-prompt", get(handlers::queue::next_prompt));
    }

    app.with_state(state)
        .route_service("/", ServeFile::new(frontend_dir.join("index.html")))
        .fallback_service(ServeDir::new(frontend_dir))
        .layer(axum::middleware::from_fn(log_request))
        .layer(cors)
}

async fn log_request(request: Request<Body>, next: Next) -> Response {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.to_string())
        .unwrap_or_else(|| "-".to_string());
    tracing::info!(
        target: "strudel::gateway",
        method = %request.method(),
        path = %request.uri().path(),
        peer = %peer,
        "request"
    );
    next.run(request).await
}

#[tokio::main]
async fn main() {
    // Load .env first; the upstream credentials live only on the server.
    if let Err(e) = dotenvy::dotenv() {
        eprintln!("[strudel-gateway] .env not loaded: {} (using system environment)", e);
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
    let addr = match config.listen_addr() {
        Ok(a) => a,
        Err(e) => {
            tracing::error!("{}", e);
            std::process::exit(1);
        }
    };
    if !std::path::Path::new(&config.preamble_path).exists() {
        tracing::warn!(
            "preamble file {} not found; /api/prompt will fail until it exists",
            config.preamble_path
        );
    }
    let queue_enabled = config.queue_enabled;

    let app = build_app(AppState::new(config, provider));

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(l) => l,
        Err(e) => {
            tracing::error!("failed to bind {}: {}", addr, e);
            std::process::exit(1);
        }
    };
    tracing::info!("Strudel server running on http://{}", addr);
    tracing::info!("endpoints: GET /health, GET /code, POST /update, POST /api/prompt, GET /");
    if queue_enabled {
        tracing::info!("queue endpoints: POST /prompt, GET /get-prompt");
    }

    let server = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    );

    tokio::select! {
        result = server => {
            if let Err(e) = result {
                tracing::error!("Server error: {}", e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown requested (Ctrl+C received)");
        }
    }
}
