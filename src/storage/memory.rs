//! In-memory storage for tests and local demos.
//!
//! Mirrors the MongoDB backend's semantics: unique emails, conditional
//! stock adjustment, newest-first order listings.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::order::{Order, OrderStatus};
use crate::domain::product::Product;
use crate::domain::user::User;

use super::{OrderStore, ProductStore, Result, StorageError, UserStore};

/// In-memory user collection.
#[derive(Default)]
pub struct MemoryUserStore {
    users: RwLock<Vec<User>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn insert(&self, user: &User) -> Result<()> {
        let mut users = self.users.write().await;
        if users.iter().any(|u| u.email == user.email) {
            return Err(StorageError::Duplicate { field: "email" });
        }
        users.push(user.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>> {
        Ok(self.users.read().await.iter().find(|u| u.id == id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        Ok(self
            .users
            .read()
            .await
            .iter()
            .find(|u| u.email == email)
            .cloned())
    }
}

/// In-memory product collection.
#[derive(Default)]
pub struct MemoryProductStore {
    products: RwLock<HashMap<Uuid, Product>>,
}

impl MemoryProductStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProductStore for MemoryProductStore {
    async fn insert(&self, product: &Product) -> Result<()> {
        self.products
            .write()
            .await
            .insert(product.id, product.clone());
        Ok(())
    }

    async fn list(&self) -> Result<Vec<Product>> {
        Ok(self.products.read().await.values().cloned().collect())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Product>> {
        Ok(self.products.read().await.get(&id).cloned())
    }

    async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Product>> {
        let products = self.products.read().await;
        Ok(ids.iter().filter_map(|id| products.get(id).cloned()).collect())
    }

    async fn update(&self, product: &Product) -> Result<()> {
        let mut products = self.products.write().await;
        match products.get_mut(&product.id) {
            Some(existing) => {
                *existing = product.clone();
                Ok(())
            }
            None => Err(StorageError::NotFound {
                entity: "product",
                id: product.id.to_string(),
            }),
        }
    }

    async fn delete(&self, id: Uuid) -> Result<Product> {
        self.products
            .write()
            .await
            .remove(&id)
            .ok_or(StorageError::NotFound {
                entity: "product",
                id: id.to_string(),
            })
    }

    async fn adjust_stock(&self, id: Uuid, delta: i64) -> Result<bool> {
        let mut products = self.products.write().await;
        let Some(product) = products.get_mut(&id) else {
            return Ok(false);
        };
        if delta < 0 && product.stock < -delta {
            return Ok(false);
        }
        product.stock += delta;
        Ok(true)
    }
}

/// In-memory order collection. Insertion order doubles as creation order,
/// so listings just read the vector backwards.
#[derive(Default)]
pub struct MemoryOrderStore {
    orders: RwLock<Vec<Order>>,
}

impl MemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OrderStore for MemoryOrderStore {
    async fn insert(&self, order: &Order) -> Result<()> {
        self.orders.write().await.push(order.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Order>> {
        Ok(self
            .orders
            .read()
            .await
            .iter()
            .find(|o| o.id == id)
            .cloned())
    }

    async fn list_by_user(&self, user: Uuid) -> Result<Vec<Order>> {
        Ok(self
            .orders
            .read()
            .await
            .iter()
            .rev()
            .filter(|o| o.user == user)
            .cloned()
            .collect())
    }

    async fn list_all(&self) -> Result<Vec<Order>> {
        Ok(self.orders.read().await.iter().rev().cloned().collect())
    }

    async fn update_status(&self, id: Uuid, status: OrderStatus) -> Result<Order> {
        let mut orders = self.orders.write().await;
        match orders.iter_mut().find(|o| o.id == id) {
            Some(order) => {
                order.status = status;
                Ok(order.clone())
            }
            None => Err(StorageError::NotFound {
                entity: "order",
                id: id.to_string(),
            }),
        }
    }
}
