use anyhow::Result;
use axum::{Router, extract::DefaultBodyLimit};
use sqlx::any::AnyPoolOptions;
use std::{fs, io::ErrorKind, path::Path};
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::EnvFilter;

mod config;
mod errors;
mod handlers;
mod models;
mod routes;
mod services;
mod state;

use services::{
    blob_store::BlobStore, classifier::Classifier, image_store::ImageStore,
    token_validator::TokenValidator,
};
use state::AppState;

/// Multipart uploads are capped at 50 MiB.
const MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

#[tokio::main]
async fn main() -> Result<()> {
    // --- Logging setup ---
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // --- Parse config + migrate flag (fails fast on missing variables) ---
    let (cfg, migrate) = config::AppConfig::from_env_and_args()?;

    tracing::info!(
        "Starting inventoria on {} (storage provider {:?}, container {})",
        cfg.addr(),
        cfg.blob.provider,
        cfg.blob.container
    );

    // --- Initialize the metadata database ---
    sqlx::any::install_default_drivers();
    let db = AnyPoolOptions::new()
        .max_connections(5)
        .connect(&cfg.database_url)
        .await?;

    // --- Handle migration mode ---
    if migrate {
        run_migrations(&db, &cfg.database_url).await?;
        tracing::info!("Database migration complete.");
        return Ok(()); // exit after migration
    }

    // --- Initialize collaborators ---
    let images = ImageStore::new(db);
    let blobs = BlobStore::from_config(&cfg.blob)?;
    let classifier = match &cfg.custom_vision {
        Some(vision) => {
            let classifier = Classifier::from_config(&vision.url, &vision.key)?;
            tracing::info!("Classification enabled against {}", vision.url);
            classifier
        }
        None => {
            tracing::info!("No classifier endpoint configured; uploads keep an empty label");
            None
        }
    };
    let tokens = TokenValidator::new(cfg.jwks_url.clone(), cfg.token_audience.clone())?;

    let app_state = AppState {
        images,
        blobs,
        classifier,
        tokens,
        backend_url: cfg.backend_url.clone(),
    };

    // --- Build router ---
    let app: Router = routes::routes::routes()
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(app_state);

    // --- Start server ---
    let addr = cfg.addr();
    let listener = match TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(err)
            if err.kind() == ErrorKind::PermissionDenied
                && matches!(cfg.host.as_str(), "0.0.0.0" | "::") =>
        {
            let fallback_addr = format!("127.0.0.1:{}", cfg.port);
            tracing::warn!(
                "Permission denied binding to {} ({}). Falling back to {}",
                addr,
                err,
                fallback_addr
            );
            TcpListener::bind(&fallback_addr).await?
        }
        Err(err) => return Err(err.into()),
    };

    tracing::info!("Server listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}

/// Run migrations manually from the dialect-specific SQL file.
async fn run_migrations(db: &sqlx::AnyPool, database_url: &str) -> Result<()> {
    let dialect = if database_url.starts_with("sqlite") {
        "sqlite"
    } else {
        "mysql"
    };
    let path = format!("migrations/{dialect}/0001_init.sql");

    if !Path::new(&path).exists() {
        anyhow::bail!("Migration file not found: {}", path);
    }

    let sql = fs::read_to_string(&path)?;
    let statements = sql
        .split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>();

    tracing::info!("Running {} migration statements...", statements.len());

    for stmt in statements {
        tracing::debug!("Executing migration SQL: {}", stmt);
        sqlx::query(stmt).execute(db).await?;
    }

    Ok(())
}
