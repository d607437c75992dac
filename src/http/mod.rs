//! REST API surface.
//!
//! The router is separated from `serve` so tests can drive it directly.
//! All application state hangs off [`AppState`]; handlers stay thin and
//! delegate to the services.

mod auth;
mod orders;
mod products;

use std::sync::Arc;

use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::auth::TokenIssuer;
use crate::config::ServerConfig;
use crate::services::{CatalogService, IdentityService, OrderService};
use crate::uploads::ImageStore;

/// Shared state for the handlers.
#[derive(Clone)]
pub struct AppState {
    pub identity: Arc<IdentityService>,
    pub catalog: Arc<CatalogService>,
    pub orders: Arc<OrderService>,
    pub images: Arc<ImageStore>,
    pub tokens: Arc<TokenIssuer>,
}

/// Start the REST server on the configured address.
pub async fn serve(
    state: AppState,
    config: &ServerConfig,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let app = router(state);
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    let actual_port = listener.local_addr()?.port();
    info!(port = actual_port, "REST API listening");
    axum::serve(listener, app).await?;
    Ok(())
}

/// Build the axum router (separated for testing).
pub fn router(state: AppState) -> Router {
    // The browser storefront is served from a different origin.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let uploads_dir = state.images.dir().to_path_buf();

    Router::new()
        .route("/api/health", get(health))
        .route("/api/register", post(auth::register))
        .route("/api/login", post(auth::login))
        .route("/api/products", get(products::list).post(products::create))
        .route(
            "/api/products/{id}",
            get(products::get_one)
                .put(products::update)
                .delete(products::remove),
        )
        .route("/api/orders", post(orders::place).get(orders::mine))
        .route("/api/orders/my-orders", get(orders::mine))
        .route("/api/orders/{id}", get(orders::get_one))
        .route("/api/admin/orders", get(orders::admin_list))
        .route("/api/admin/orders/{id}/status", put(orders::set_status))
        .nest_service("/uploads", ServeDir::new(uploads_dir))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn health() -> StatusCode {
    StatusCode::OK
}
