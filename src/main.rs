// ABOUTME: Main entry point for the media library service with reference-integrity tracking
// ABOUTME: Sets up configuration, logging, storage, routes, and the HTTP listener

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use clap::Parser;
use std::path::Path;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};
use tracing_subscriber::EnvFilter;

mod blob_store;
mod config;
mod content;
mod entities;
mod error;
mod media;
mod migration;
mod references;
mod registry;
mod storage;
mod types;


use blob_store::LocalBlobStore;
use config::Args;
use registry::MediaRegistry;
use storage::Storage;

// Multipart framing on top of the largest accepted file
const MULTIPART_OVERHEAD_BYTES: u64 = 1024 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub storage: Arc<Storage>,
    pub registry: Arc<MediaRegistry>,
}

pub fn build_router(state: AppState, uploads_dir: &Path) -> Router {
    let body_limit = state
        .registry
        .config()
        .max_upload_bytes
        .saturating_add(MULTIPART_OVERHEAD_BYTES);
    let body_limit = usize::try_from(body_limit).unwrap_or(usize::MAX);

    let admin = Router::new()
        .route("/media", get(media::list_media).post(media::upload_media))
        .route("/media/upload", post(media::upload_single))
        .route("/media/folders", get(media::list_folders))
        .route("/media/batch-update", post(media::batch_update))
        .route("/media/scan", get(media::scan_preview).post(media::scan_import))
        .route(
            "/media/:id",
            get(media::get_media)
                .put(media::update_media)
                .delete(media::delete_media),
        )
        .route("/media/:id/references", get(media::media_references))
        .route("/content/:collection", get(content::list_documents))
        .route(
            "/content/:collection/:id",
            get(content::get_document)
                .put(content::put_document)
                .delete(content::delete_document),
        );

    Router::new()
        .nest("/api/admin", admin)
        .route("/api/gallery", get(media::gallery))
        .route("/api/media/:id", get(media::resolve_permalink))
        .route("/media/:id", get(media::resolve_permalink))
        .nest_service("/uploads", ServeDir::new(uploads_dir))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    // Initialize storage
    let storage = Arc::new(Storage::new(&args.database_url).await?);
    let blobs = Arc::new(LocalBlobStore::new(&args.uploads_dir));
    let registry = Arc::new(MediaRegistry::new(
        storage.clone(),
        blobs.clone(),
        args.registry_config(),
    ));

    let app = build_router(AppState { storage, registry }, blobs.root());

    let addr = format!("{}:{}", args.host, args.port);
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!(
        %addr,
        uploads_dir = %args.uploads_dir.display(),
        cdn = args.public_base_url.as_deref().unwrap_or("-"),
        "Media library listening"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
