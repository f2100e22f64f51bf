use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;
use tracing::{info, warn};

use prompt_relay::config::{Cli, Config};
use prompt_relay::server::api::{build_router, AppState};
use prompt_relay::upstream::Assistant;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments.
    let cli = Cli::parse();

    // Initialize tracing/logging.
    let filter = if cli.verbose {
        "prompt_relay=debug,tower_http=debug"
    } else {
        "prompt_relay=info,tower_http=info"
    };

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| filter.into());
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true);
    if cli.log_json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    info!("prompt-relay v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration.
    let config = Config::from_cli(&cli)?;

    info!(
        model = %config.upstream.model,
        api_base = %config.upstream.api_base,
        temperature = config.upstream.temperature,
        max_tokens = config.upstream.max_tokens,
        static_dir = %config.server.static_dir.display(),
        "Configuration loaded"
    );

    // A missing key leaves the server running; asks are answered with an error text.
    let assistant = Assistant::from_config(&config.upstream);

    let state = Arc::new(AppState::new(assistant, &config.server));
    let app = build_router(state);

    // Start the server.
    let listen_addr = config.server.listen;
    let listener = TcpListener::bind(&listen_addr).await?;
    info!("Listening on {listen_addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
}
