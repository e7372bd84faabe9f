//! intake-api - Franchise application intake service
//!
//! Accepts multipart franchise applications, uploads their documents to
//! Cloudinary and stores the structured record in SQLite.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use intake_api::config::{Args, ServiceConfig};
use intake_api::upload::{CloudinaryCredentials, CloudinarySink, UploadPolicy, UploadSink};
use intake_api::{server, AppState};

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "intake_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(e) = run(Args::parse()).await {
        error!("Startup failed: {:#}", e);
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    let config = ServiceConfig::resolve(args).context("Failed to resolve configuration")?;

    info!("Starting intake-api (Franchise Intake) service");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));
    info!("Port: {}", config.port);
    info!("Database: {}", config.database_url);

    let credentials = CloudinaryCredentials::from_parts(
        config.cloudinary_cloud_name.clone(),
        config.cloudinary_api_key.clone(),
        config.cloudinary_api_secret.clone(),
    );
    if let Err(e) = &credentials {
        warn!("{} - document uploads will fail until credentials are provided", e);
    }
    let sink = CloudinarySink::new(credentials);
    info!("Upload sink: {}", sink.describe());

    let db_pool = intake_api::db::init_database_pool(&config.database_url).await?;
    info!("Database connection established");

    let state = AppState::new(
        db_pool,
        Arc::new(sink),
        UploadPolicy::with_folder(config.upload_folder.clone()),
    );
    let cors = server::cors_layer(&config.cors_origin).context("Invalid CORS configuration")?;
    let app = server::with_middleware(intake_api::build_router(state), cors);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {addr}"))?;
    info!("Listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    server::serve(listener, app).await.context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}
