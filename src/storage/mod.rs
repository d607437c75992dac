//! Storage implementations.
//!
//! Three collections — users, products, orders — behind trait objects so
//! services stay backend-agnostic. The MongoDB backend is the production
//! store; the in-memory backend serves tests and local demos.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use crate::config::StorageConfig;
use crate::domain::order::{Order, OrderStatus};
use crate::domain::product::Product;
use crate::domain::user::User;

pub mod memory;
pub mod mongodb;

pub use self::memory::{MemoryOrderStore, MemoryProductStore, MemoryUserStore};
pub use self::mongodb::{MongoOrderStore, MongoProductStore, MongoUserStore};

/// Storage-layer error.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("duplicate value for unique field: {field}")]
    Duplicate { field: &'static str },

    #[error("database error: {0}")]
    Database(#[from] ::mongodb::error::Error),

    #[error("invalid id in stored document: {0}")]
    InvalidId(#[from] uuid::Error),
}

pub type Result<T> = std::result::Result<T, StorageError>;

/// User collection.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert a new user. Fails with [`StorageError::Duplicate`] when the
    /// email is already registered.
    async fn insert(&self, user: &User) -> Result<()>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>>;

    async fn find_by_email(&self, email: &str) -> Result<Option<User>>;
}

/// Product collection.
#[async_trait]
pub trait ProductStore: Send + Sync {
    async fn insert(&self, product: &Product) -> Result<()>;

    async fn list(&self) -> Result<Vec<Product>>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Product>>;

    /// Fetch several products at once for read-side enrichment.
    async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Product>>;

    /// Replace the stored product. Fails with NotFound for an unknown id.
    async fn update(&self, product: &Product) -> Result<()>;

    /// Remove and return the product, for image cleanup by the caller.
    async fn delete(&self, id: Uuid) -> Result<Product>;

    /// Adjust stock by `delta`. A negative delta only applies when the
    /// current stock covers it — a single conditional update, so concurrent
    /// checkouts cannot drive stock negative. Returns false when the
    /// condition fails (or the product is gone).
    async fn adjust_stock(&self, id: Uuid, delta: i64) -> Result<bool>;
}

/// Order collection.
#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn insert(&self, order: &Order) -> Result<()>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Order>>;

    /// Orders owned by the user, newest first.
    async fn list_by_user(&self, user: Uuid) -> Result<Vec<Order>>;

    /// Every order, newest first.
    async fn list_all(&self) -> Result<Vec<Order>>;

    /// Overwrite the status and return the updated order. Last write wins;
    /// the workflow's transition checks happen above this layer.
    async fn update_status(&self, id: Uuid, status: OrderStatus) -> Result<Order>;
}

/// The three stores behind one handle.
#[derive(Clone)]
pub struct Stores {
    pub users: Arc<dyn UserStore>,
    pub products: Arc<dyn ProductStore>,
    pub orders: Arc<dyn OrderStore>,
}

/// Initialize storage based on configuration.
pub async fn init_storage(config: &StorageConfig) -> Result<Stores> {
    info!(backend = %config.storage_type, "initializing storage");

    match config.storage_type.as_str() {
        "mongodb" => {
            let db = self::mongodb::connect(config).await?;
            Ok(Stores {
                users: Arc::new(MongoUserStore::new(&db).await?),
                products: Arc::new(MongoProductStore::new(&db)),
                orders: Arc::new(MongoOrderStore::new(&db).await?),
            })
        }
        "memory" => Ok(Stores {
            users: Arc::new(MemoryUserStore::new()),
            products: Arc::new(MemoryProductStore::new()),
            orders: Arc::new(MemoryOrderStore::new()),
        }),
        other => Err(StorageError::NotFound {
            entity: "storage backend",
            id: other.to_string(),
        }),
    }
}
