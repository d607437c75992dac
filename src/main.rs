//! storefront: REST backend for the storefront.
//!
//! ## Configuration
//!
//! `config.yaml` in the working directory, a file named by
//! `STOREFRONT_CONFIG`, or `STOREFRONT`-prefixed environment variables
//! (e.g. `STOREFRONT__AUTH__SECRET`). The legacy `PORT`, `MONGO_URI`, and
//! `JWT_SECRET` variables are still honored.

use std::sync::Arc;

use tracing::{error, info};

use storefront::auth::TokenIssuer;
use storefront::config::{Config, LOG_ENV_VAR};
use storefront::http::{self, AppState};
use storefront::services::{CatalogService, IdentityService, OrderService};
use storefront::storage;
use storefront::uploads::ImageStore;

/// Initialize tracing with the STOREFRONT_LOG environment variable.
///
/// Defaults to "info" level if STOREFRONT_LOG is not set.
fn init_tracing() {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_env(LOG_ENV_VAR)
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    info!("Starting storefront service");

    let config = Config::load(None).map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;

    if config.auth.secret.is_empty() {
        return Err("auth.secret must be configured (or set JWT_SECRET)".into());
    }

    let stores = storage::init_storage(&config.storage).await?;

    let tokens = Arc::new(TokenIssuer::new(&config.auth));
    let identity = Arc::new(IdentityService::new(stores.users.clone(), tokens.clone()));

    if let Some(operator) = &config.auth.bootstrap_operator {
        identity.bootstrap_operator(operator).await?;
    }

    let state = AppState {
        catalog: Arc::new(CatalogService::new(stores.products.clone())),
        orders: Arc::new(OrderService::new(
            stores.orders,
            stores.products,
            stores.users,
            config.pricing.clone(),
            config.orders.clone(),
        )),
        images: Arc::new(ImageStore::new(&config.uploads.dir).await?),
        identity,
        tokens,
    };

    http::serve(state, &config.server)
        .await
        .map_err(|e| -> Box<dyn std::error::Error> { e })?;
    Ok(())
}
