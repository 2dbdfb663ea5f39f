use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use storehand::{
    Config, FileStore, Host, MessageRouter, OpenAiClient, Orchestrator, PageBridge, StateStore,
    SystemPrompt,
};

/// Storehand - agent host speaking JSON lines on stdin/stdout
#[derive(Parser, Debug)]
#[command(name = "storehand")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Config file (default: ~/.config/storehand/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Where agent configs and states are persisted
    #[arg(long)]
    state_file: Option<PathBuf>,

    /// Log file; stdout carries the protocol
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// OpenAI-compatible API base URL
    #[arg(long, env = "OPENAI_BASE_URL")]
    base_url: Option<String>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Load .env files (local first, then home directory)
    // Errors are ignored - files are optional
    let _ = dotenvy::from_filename(".env");
    if let Some(home) = dirs::home_dir() {
        let _ = dotenvy::from_path(home.join(".env"));
    }

    let args = Args::parse();

    let mut config = Config::load(args.config.as_deref())?;
    if let Some(state_file) = args.state_file {
        config.general.state_file = Some(state_file);
    }
    if let Some(log_file) = args.log_file {
        config.logging.file = log_file;
    }
    if let Some(base_url) = args.base_url {
        config.provider.base_url = base_url;
    }

    // Set up file-based logging
    let log_file = std::fs::File::create(&config.logging.file).with_context(|| {
        format!("Failed to create log file: {}", config.logging.file.display())
    })?;
    tracing_subscriber::registry()
        .with(EnvFilter::new(&config.logging.filter))
        .with(fmt::layer().with_writer(log_file).with_ansi(false))
        .init();

    let client = OpenAiClient::new(&config.provider.base_url);
    let store = FileStore::new(config.state_file());
    tracing::info!(
        "Starting storehand against {} (state: {})",
        client.base_url(),
        store.path().display()
    );

    let bridge = Arc::new(PageBridge::new());
    let orchestrator = Arc::new(Orchestrator::with_settings(
        Arc::new(client),
        bridge.clone(),
        StateStore::new(Arc::new(store)),
        config.defaults.clone(),
        SystemPrompt::new(),
    ));

    orchestrator.restore().await;

    let host = Host::new(MessageRouter::new(orchestrator.clone()), bridge);
    let result = host.run(tokio::io::stdin(), tokio::io::stdout()).await;

    orchestrator.teardown().await;
    result
}
