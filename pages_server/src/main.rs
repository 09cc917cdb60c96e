//! Pages server: rebuilds static sites when their publishing branch is pushed.
//!
//! Listens for GitHub push webhooks. A push to a branch with a builder
//! profile clones or syncs the repository, runs Jekyll (or rsync for plain
//! sites), and publishes the result with its `build.log` under the
//! profile's output directory.

mod config;
mod metrics;
mod routes;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use pages_builder::ProcessRunner;

#[derive(Parser)]
#[command(name = "pages", about = "Static site publishing webhook server")]
struct Cli {
    /// Server port
    #[arg(short, long, env = "PAGES_PORT", default_value = "5000")]
    port: u16,

    /// Home directory holding the repository and generated-site roots
    #[arg(long, env = "PAGES_HOME")]
    home: PathBuf,

    /// rbenv root providing the `bundle` and `jekyll` shims
    #[arg(long, env = "PAGES_RBENV")]
    rbenv: PathBuf,

    /// git executable
    #[arg(long, default_value = "/usr/bin/git")]
    git: String,

    /// rsync executable
    #[arg(long, default_value = "rsync")]
    rsync: String,

    /// JSON file overriding builder profiles and clone settings
    #[arg(long, env = "PAGES_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_default();
    if log_format == "json" {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "info".into()),
            )
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "info".into()),
            )
            .init();
    }

    let cli = Cli::parse();

    let mut pages_config = config::PagesConfig::new(&cli.home, &cli.rbenv, &cli.git, &cli.rsync);
    if let Some(path) = &cli.config {
        pages_config = pages_config.with_file(path)?;
    }
    pages_config.ensure_directories()?;

    for profile in &pages_config.profiles {
        tracing::info!(
            branch = %profile.branch,
            repos = %profile.repository_dir.display(),
            sites = %profile.generated_site_dir.display(),
            "Builder profile"
        );
    }

    let state = routes::AppState {
        config: Arc::new(pages_config),
        runner: Arc::new(ProcessRunner),
    };
    let app = routes::router(state);

    // Initialize metrics
    metrics::init_metrics();

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], cli.port));
    tracing::info!("Pages server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Shutdown complete");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received SIGINT, shutting down..."),
        _ = terminate => tracing::info!("Received SIGTERM, shutting down..."),
    }
}
