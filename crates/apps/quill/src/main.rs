//! Quill - A small blog publishing backend
//!
//! This is the main entry point for the Quill server.

use anyhow::{Context, Result};
use blog::{SessionEvent, Site, SiteConfig};
use log::{error, info, warn};
use tokio::net::TcpListener;

use quill::{AppState, app, shutdown_signal};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    // Bootstrap config directory
    if let Err(e) = config::init() {
        error!("Failed to initialize config directory: {}", e);
    }

    // Leave a template behind on first run
    if !SiteConfig::file_configured() {
        match SiteConfig::default().save() {
            Ok(path) => info!("Wrote default config to {}", path.display()),
            Err(e) => warn!("Could not write default config: {:#}", e),
        }
    }

    let config = SiteConfig::load()?;

    let site = tokio::task::spawn_blocking({
        let config = config.clone();
        move || -> Result<Site> {
            let site = Site::open(&config)?;
            // Initial connection check; every request probes again
            info!("Blog store: {:?}", site.blogs.probe());
            info!("Email store: {:?}", site.emails.probe());
            Ok(site)
        }
    })
    .await
    .context("Site initialization panicked")??;

    if let Some(auth) = &site.auth {
        auth.observe(|event| match event {
            SessionEvent::SignedIn(session) => info!("Admin session started for {}", session.email),
            SessionEvent::SignedOut(session) => info!("Admin session ended for {}", session.email),
        });
    }

    let app = app(AppState::new(site), &config.assets);

    let address = config.server.address();
    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {}", address))?;
    info!("Server running on {}", address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shut down");
    Ok(())
}
