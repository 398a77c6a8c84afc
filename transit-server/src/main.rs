use std::sync::Arc;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use transit_server::browser::{Browser, WebDriverBrowser};
use transit_server::config::AppConfig;
use transit_server::scrape::Scraper;
use transit_server::store::{LineStore, spawn_refresh_loop};
use transit_server::web::{AppState, create_router};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,transit_server=debug")),
        )
        .init();

    let config = AppConfig::from_env()?;

    // The driver is probed lazily, so startup doesn't wait on chromedriver
    let browser = Arc::new(WebDriverBrowser::new(config.webdriver.clone())?);
    let scraper = Scraper::new(browser.clone(), config.scraper.clone());
    let store = Arc::new(LineStore::new(scraper, &config.cache));

    // Refresh now, then daily
    let refresh_task = spawn_refresh_loop(store.clone(), config.refresh);

    let app = create_router(AppState::new(store));

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    info!(addr = %config.bind_addr, "Transit timetable server listening");
    info!("  GET  /health          - Health and refresh status");
    info!("  GET  /url/:line       - Detail-page URL of a line");
    info!("  GET  /schedule/:line  - Today's departures for a line");
    info!("  GET  /line/:line      - Line record with schedule");
    info!("  GET  /lines           - Every line");
    info!("  GET  /lines/:type     - Lines of one type");
    info!("  POST /refresh         - Start a full refresh");

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    refresh_task.abort();
    browser.shutdown().await;
    info!("Server stopped");

    served?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
