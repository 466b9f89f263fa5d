use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use medscan::api::{create_router, AppState};
use medscan::config::Config;

#[derive(Parser)]
#[command(name = "medscan")]
#[command(about = "Reads medication labels from photos and enriches what it finds")]
struct Args {
    /// Bind address, overrides MEDSCAN_HOST
    #[arg(long)]
    host: Option<String>,

    /// Port, overrides MEDSCAN_PORT
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    dotenvy::dotenv().ok();

    let json_logs = std::env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json"));
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "medscan=info,tower_http=debug".into()),
        )
        .with(json_logs.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json_logs).then(|| tracing_subscriber::fmt::layer()))
        .init();

    let mut config = Config::from_env();
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }

    tracing::info!(
        "Initializing OCR: languages={}, variants per scan={}",
        config.ocr.languages,
        medscan::ocr::RECIPES.len()
    );
    tracing::info!(
        "Enrichment sources: {} (cache ttl={}s, size={})",
        config.enrichment.sources.join(", "),
        config.enrichment.cache_ttl_secs,
        config.enrichment.cache_size
    );

    let state = AppState::from_config(config.clone())?;
    if !state.pipeline.ocr_available() {
        tracing::warn!("OCR unavailable - every scan will fail until Tesseract is installed");
    }

    let app = create_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    tracing::info!("medscan starting on http://{}", addr);
    tracing::info!("  Health check: http://{}/health", addr);
    tracing::info!("  Scan:         POST http://{}/scan-medication", addr);
    tracing::info!("  OpenAPI doc:  http://{}/openapi.json", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

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
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, draining in-flight scans...");
}
