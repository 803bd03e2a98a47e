// crates/server/src/main.rs
//! Triage-console server binary.
//!
//! Resolves the transcript store once, wires the tracker (real or demo),
//! binds on localhost, and best-effort opens the browser.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;
use triage_console_core::{resolve_store_dir, SessionStore};
use triage_console_server::tracker::{AdoTracker, AzCliTokenSource, DemoTracker, Tracker};
use triage_console_server::{create_app, AppState, DashboardSettings};

#[derive(Debug, Parser)]
#[command(
    name = "triage-console",
    version,
    about = "Defect triage dashboard with live agent transcript streaming"
)]
struct Cli {
    /// Port to bind on 127.0.0.1.
    #[arg(long, default_value_t = 5200)]
    port: u16,

    /// Serve canned tracker data; no tracker connection or auth required.
    #[arg(long)]
    demo: bool,

    /// Settings file path (defaults to the user config directory).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Do not open the browser on startup.
    #[arg(long)]
    no_open: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .compact()
        .init();

    let cli = Cli::parse();

    let settings_path = cli
        .config
        .clone()
        .unwrap_or_else(DashboardSettings::default_path);
    let settings = DashboardSettings::load(&settings_path);

    // Resolved once; configuration changes take effect on restart.
    let store_dir = resolve_store_dir(&settings.claude_projects_path);
    let store = SessionStore::new(store_dir);

    let tracker: Arc<dyn Tracker> = if cli.demo {
        Arc::new(DemoTracker::new())
    } else {
        Arc::new(AdoTracker::new(
            settings.clone(),
            Arc::new(AzCliTokenSource::new()),
        ))
    };

    let state = AppState::new(settings, settings_path, store, tracker, cli.demo);
    let app = create_app(state);

    let addr = SocketAddr::from(([127, 0, 0, 1], cli.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;

    let url = format!("http://localhost:{}", cli.port);
    eprintln!("\ntriage-console v{} running at {url}\n", env!("CARGO_PKG_VERSION"));
    if cli.demo {
        eprintln!("  [demo] canned tracker data; no tracker connection required\n");
    }

    if !cli.no_open {
        if let Err(error) = open::that_detached(&url) {
            tracing::debug!(%error, "could not open browser");
        }
    }

    axum::serve(listener, app).await?;
    Ok(())
}
