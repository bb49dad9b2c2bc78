mod cleanup;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use jaunt_api::uploads::MAX_UPLOAD_BYTES;
use jaunt_api::{AppStateInner, router};
use jaunt_db::Database;
use jaunt_store::DiskStore;

/// Placeholder signing secrets that MUST NOT be used.
const PLACEHOLDER_SECRETS: &[&str] = &[
    "change-me-to-a-random-string",
    "dev-secret-change-me",
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "jaunt=debug,tower_http=debug".into()),
        )
        .init();

    // Config
    let signing_secret = std::env::var("JAUNT_SIGNING_SECRET").unwrap_or_default();
    if signing_secret.is_empty() || PLACEHOLDER_SECRETS.contains(&signing_secret.as_str()) {
        eprintln!("FATAL: JAUNT_SIGNING_SECRET is unset or still a placeholder.");
        eprintln!("       Upload URLs are signed with it.");
        eprintln!("       Set it in your .env file and restart.");
        std::process::exit(1);
    }

    let host = std::env::var("JAUNT_HOST").unwrap_or_else(|_| "0.0.0.0".into());
    let port: u16 = std::env::var("JAUNT_PORT")
        .unwrap_or_else(|_| "3000".into())
        .parse()?;
    let db_path: PathBuf = std::env::var("JAUNT_DB_PATH")
        .unwrap_or_else(|_| "jaunt.db".into())
        .into();
    let storage_dir: PathBuf = std::env::var("JAUNT_STORAGE_DIR")
        .unwrap_or_else(|_| "./object-storage".into())
        .into();
    let public_base = std::env::var("JAUNT_PUBLIC_BASE")
        .unwrap_or_else(|_| format!("http://localhost:{}/storage", port));
    let upload_base =
        std::env::var("JAUNT_UPLOAD_BASE").unwrap_or_else(|_| public_base.clone());
    let orphan_grace_hours: u64 = std::env::var("JAUNT_ORPHAN_GRACE_HOURS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(24);

    // Init database and object storage
    let db = Database::open(&db_path)?;
    let store = Arc::new(
        DiskStore::new(storage_dir, upload_base, public_base, signing_secret).await?,
    );

    let state = Arc::new(AppStateInner {
        db,
        store: store.clone(),
    });

    // Background orphan sweep (runs every hour)
    tokio::spawn(cleanup::run_cleanup_loop(
        state.clone(),
        store,
        3600,
        orphan_grace_hours,
    ));

    let app = router(state)
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES + 1024 * 1024))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Jaunt server listening on {}", addr);
    info!("Orphan grace period: {} hours", orphan_grace_hours);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        let mut sigterm =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                .expect("failed to install SIGTERM handler");
        tokio::select! {
            _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
            _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
}
