use applauncher::config::Config;
use applauncher::hub::HubClient;
use applauncher::server::{DashboardServer, DashboardSettings, PKG_NAME, VERSION};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{error, info, warn};

const DEFAULT_CONFIG_PATH: &str = "applauncher.toml";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("applauncher=debug".parse().expect("valid log directive")),
        )
        .init();

    let explicit_path = std::env::args().nth(1).map(PathBuf::from);
    let config = match &explicit_path {
        Some(path) => {
            let config = Config::load(path).map_err(|e| {
                error!(path = %path.display(), error = %e, "Failed to load configuration");
                e
            })?;
            info!(path = %path.display(), "Configuration loaded");
            config
        }
        None if PathBuf::from(DEFAULT_CONFIG_PATH).exists() => {
            let config = Config::load(DEFAULT_CONFIG_PATH)?;
            info!(path = DEFAULT_CONFIG_PATH, "Configuration loaded");
            config
        }
        None => {
            info!("No configuration file, using defaults");
            let config = Config::default();
            config.validate()?;
            config
        }
    };

    print_startup_banner(&config);

    let hub_client = HubClient::new(&config.hub)?;
    if config.hub.resolve_token().is_none() {
        warn!("No hub API token configured; the catalog will be empty and creates will fail");
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let bind_addr = config.server.bind_addr()?;
    let settings = DashboardSettings {
        route: config.server.route.clone(),
        base_url: config.hub.base_url().to_string(),
        allowed_origins: config.server.allowed_origins.clone(),
    };
    let server = DashboardServer::new(bind_addr, Arc::new(hub_client), settings, shutdown_rx);

    let server_handle = tokio::spawn(async move {
        if let Err(e) = server.run().await {
            error!(error = %e, "Dashboard server error");
        }
    });

    if config.server.show_browser {
        let url = config.server.page_url();
        if let Err(e) = webbrowser::open(&url) {
            warn!(%url, error = %e, "Failed to open browser");
        }
    }

    shutdown_signal().await;

    let _ = shutdown_tx.send(true);
    let _ = tokio::time::timeout(Duration::from_secs(5), server_handle).await;

    info!("Shutdown complete");
    Ok(())
}

/// Wait for Ctrl+C, or SIGTERM on Unix
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => info!("Received SIGINT (Ctrl+C), shutting down..."),
                    _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
                }
                return;
            }
            Err(e) => warn!(error = %e, "Failed to install SIGTERM handler"),
        }
    }

    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for Ctrl+C");
        return;
    }
    info!("Received Ctrl+C, shutting down...");
}

fn print_startup_banner(config: &Config) {
    info!(name = PKG_NAME, version = VERSION, "Starting app launcher");
    info!(
        bind = %config.server.bind,
        port = config.server.port,
        route = %config.server.route,
        allowed_origins = ?config.server.allowed_origins,
        show_browser = config.server.show_browser,
        "Server configuration"
    );
    info!(
        base_url = %config.hub.base_url(),
        api_url = %config.hub.api_url(),
        token = config.hub.resolve_token().is_some(),
        request_timeout_secs = config.hub.request_timeout_secs,
        "Hub configuration"
    );
}
