//! MongoDB storage backend.
//!
//! Documents keep ids as strings and camelCase field names, matching what
//! earlier deployments of this system stored, so existing databases read
//! back unchanged. Uniqueness and stock invariants are enforced by the
//! database (unique index, conditional updates), not by read-modify-write.

mod orders;
mod products;
mod users;

pub use orders::MongoOrderStore;
pub use products::MongoProductStore;
pub use users::MongoUserStore;

use mongodb::{Client, Database};
use tracing::info;

use crate::config::StorageConfig;

use super::Result;

pub const USERS_COLLECTION: &str = "users";
pub const PRODUCTS_COLLECTION: &str = "products";
pub const ORDERS_COLLECTION: &str = "orders";

/// Connect to the configured database.
pub async fn connect(config: &StorageConfig) -> Result<Database> {
    let client = Client::with_uri_str(&config.uri).await?;
    info!(database = %config.database, "connected to MongoDB");
    Ok(client.database(&config.database))
}

/// Map a duplicate-key write (code 11000) to the typed conflict; pass
/// everything else through.
fn map_duplicate_key(
    err: mongodb::error::Error,
    field: &'static str,
) -> super::StorageError {
    if let mongodb::error::ErrorKind::Write(mongodb::error::WriteFailure::WriteError(
        ref write_err,
    )) = *err.kind
    {
        if write_err.code == 11000 {
            return super::StorageError::Duplicate { field };
        }
    }
    super::StorageError::from(err)
}
