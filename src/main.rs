//! Image drive API server.
//!
//! Serves the drive's REST API, storing images on ImageKit and checking
//! sessions against Clerk.

use clap::Parser;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use imagedrive::api::{create_router, AppState};
use imagedrive::config::Config;
use imagedrive::drive::FileTree;
use imagedrive::identity::ClerkClient;
use imagedrive::imagekit::{Credentials, ImageKitClient};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse configuration
    let config = Config::parse();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log_level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting imagedrive");
    tracing::info!("ImageKit folder: {}", config.imagekit_folder);
    tracing::info!(
        "Upload limit: {} bytes, provider retries: {}",
        config.max_upload_bytes,
        config.provider_retries
    );

    // Storage and identity providers
    let credentials = Credentials::new(
        config.imagekit_public_key.clone(),
        config.imagekit_private_key.clone(),
    )?;
    let public_key = credentials.public_key().to_string();
    let store = ImageKitClient::new(
        credentials,
        config.imagekit_folder.clone(),
        config.provider_retries,
    );
    let identity = ClerkClient::new(config.clerk_secret_key.clone())?
        .with_password_sign_in(config.clerk_password_sign_in);
    if config.clerk_password_sign_in {
        tracing::warn!("Password sign-in enabled; Clerk serves it on development instances only");
    }

    // File tree database
    let tree = FileTree::connect(&config.database_url, Arc::new(store)).await?;

    // Create router
    let app = create_router(AppState {
        tree,
        identity: Arc::new(identity),
        max_upload_bytes: config.max_upload_bytes,
        imagekit_public_key: public_key,
        imagekit_url_endpoint: config.imagekit_url_endpoint.clone(),
    });

    // With no origin configured the CORS layer allows nothing cross-origin.
    let mut cors = CorsLayer::new();
    if let Some(origin) = &config.cors_origin {
        tracing::info!("Allowing cross-origin requests from {}", origin);
        cors = cors
            .allow_origin(origin.parse::<axum::http::HeaderValue>()?)
            .allow_methods(Any)
            .allow_headers(Any);
    }
    let app = app.layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(cors),
    );

    let addr = config.listen_on();
    tracing::info!("Server listening on http://{}", addr);

    // Start server
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
