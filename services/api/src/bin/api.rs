//! services/api/src/bin/api.rs

use api_lib::{
    adapters::{FileBlobStore, AccountVerifier},
    config::Config,
    error::ApiError,
    web::{self, rest::ApiDoc, state::AppState},
};
use appointment_core::{BlobStore, MemoryBlobStore, SystemClock};
use axum::http::{
    header::{ACCEPT, CONTENT_TYPE},
    HeaderValue, Method,
};
use axum::Router;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Open the Blob Store ---
    let store: Arc<dyn BlobStore> = match &config.data_dir {
        Some(dir) => {
            let files = FileBlobStore::open(dir).await?;
            info!("Using file blob store at {}", files.root().display());
            Arc::new(files)
        }
        None => {
            warn!("DATA_DIR not set; appointments will be kept in memory only");
            Arc::new(MemoryBlobStore::new())
        }
    };

    // --- 3. Initialize Identity Verification ---
    if config.admin.is_none() {
        warn!("ADMIN_USERNAME/ADMIN_PASSWORD_HASH not set; admin console login is disabled");
    }
    let accounts = Arc::new(AccountVerifier::new(store.clone(), config.admin.clone()));

    // --- 4. Build the Shared AppState ---
    let app_state = Arc::new(AppState::new(
        store,
        Arc::new(SystemClock),
        accounts.clone(),
        accounts,
        config.clone(),
    ));

    let origin = config.allowed_origin.parse::<HeaderValue>().map_err(|e| {
        ApiError::Internal(format!(
            "Invalid ALLOWED_ORIGIN '{}': {}",
            config.allowed_origin, e
        ))
    })?;
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, ACCEPT]);

    // --- 5. Create the Web Router ---
    // Merge the API router with the Swagger UI router for a complete application.
    let app = Router::new()
        .merge(web::router(app_state).layer(cors))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    // --- 6. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
