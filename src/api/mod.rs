pub mod routes;

use crate::config::Config;
use anyhow::{Context, Result};
use axum::Router;
use rust_embed::RustEmbed;
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::Notify;
use tracing::{info, warn};

#[derive(RustEmbed)]
#[folder = "frontend/dist"]
struct FrontendAssets;

/// Serves the API and page until `shutdown` is notified (also wired to
/// `POST /api/v1/shutdown`).
pub async fn run_server(config: Arc<Config>, shutdown: Arc<Notify>) -> Result<()> {
    let port = config.api_port;
    let open_browser = config.open_browser;
    let state = routes::ApiState {
        config,
        shutdown: Arc::clone(&shutdown),
    };
    let app: Router = routes::router(state);

    let addr = SocketAddr::from((Ipv4Addr::LOCALHOST, port));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind API server: {addr}"))?;

    info!(address = %addr, "Film Tracker server started");

    if open_browser {
        open_dashboard(&format!("http://{addr}"));
    }

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.notified().await })
        .await
        .context("API server failed")?;

    info!("Film Tracker server stopped");
    Ok(())
}

pub fn open_dashboard(url: &str) {
    if let Err(error) = open::that(url) {
        warn!(error = %error, url, "failed to open browser");
    }
}

pub fn get_embedded_asset(path: &str) -> Option<(Vec<u8>, String)> {
    let normalized = path.trim_start_matches('/');
    let requested = if normalized.is_empty() {
        "index.html"
    } else {
        normalized
    };

    FrontendAssets::get(requested).map(|content| {
        let mime = mime_guess::from_path(requested)
            .first_or_octet_stream()
            .to_string();
        (content.data.into_owned(), mime)
    })
}
