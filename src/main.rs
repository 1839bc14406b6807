//! PageLens Web server
//!
//! Serves page metadata extraction and FAQ search over HTTP.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use pagelens_web::browser::{DEFAULT_IDLE_MS, DEFAULT_TIMEOUT_MS};
use pagelens_web::cors::OriginPolicy;
use pagelens_web::{app_router, AppState, BrowserConfig, Extractor, SearchIndex};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

/// PageLens Web server
#[derive(Parser, Debug)]
#[command(name = "pl-web")]
#[command(version)]
#[command(about = "Headless-browser page metadata extraction over HTTP")]
struct Args {
    /// Port to listen on
    #[arg(short, long, default_value = "3001")]
    port: u16,

    /// Host to bind to
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    /// Enable verbose logging (RUST_LOG takes precedence)
    #[arg(short, long)]
    verbose: bool,

    /// Path to Chrome/Chromium executable
    #[arg(long)]
    chrome_path: Option<String>,

    /// Run in headless mode
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    headless: bool,

    /// Budget for each navigation and field read, in milliseconds
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_MS)]
    timeout_ms: u64,

    /// Quiet period counted as network idle, in milliseconds
    #[arg(long, default_value_t = DEFAULT_IDLE_MS)]
    idle_ms: u64,

    /// JSON file with FAQ documents (defaults to the built-in set)
    #[arg(long)]
    faqs: Option<PathBuf>,

    /// Extra CORS origin to allow besides loopback (repeatable)
    #[arg(long = "allow-origin")]
    allow_origin: Vec<String>,
}

impl Args {
    fn browser_config(&self) -> BrowserConfig {
        let mut builder = BrowserConfig::builder()
            .headless(self.headless)
            .timeout_ms(self.timeout_ms)
            .idle_ms(self.idle_ms);
        if let Some(path) = &self.chrome_path {
            builder = builder.chrome_path(path.clone());
        }
        builder.build()
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let search = match &args.faqs {
        Some(path) => SearchIndex::from_path(path)
            .with_context(|| format!("Failed to load FAQs from {}", path.display()))?,
        None => SearchIndex::builtin().context("Failed to load built-in FAQs")?,
    };

    let config = args.browser_config();
    tracing::debug!(?config, "Browser configuration");

    let state = AppState::new(Extractor::chromium(config), search);
    let app = app_router(state, OriginPolicy::new(&args.allow_origin));

    let listener = bind_listener(&args.host, args.port).await?;
    let addr = listener.local_addr().context("Listener has no local address")?;

    tracing::info!(
        "PageLens Web v{} listening on {}",
        pagelens_web::VERSION,
        addr
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("Server stopped");
    Ok(())
}

/// Bind `host` (name, IPv4 or bare IPv6 literal) and `port`
async fn bind_listener(host: &str, port: u16) -> anyhow::Result<TcpListener> {
    TcpListener::bind((host, port))
        .await
        .with_context(|| format!("Failed to bind {host} port {port}"))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown requested");
}
