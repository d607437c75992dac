//! Catalog product records.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A catalog product.
///
/// Price and stock are never negative; placement decrements stock through a
/// conditional update so the invariant holds under concurrent checkouts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub category: String,
    pub price: Decimal,
    pub stock: i64,
    /// Stored file name of the product image, served under `/uploads`.
    pub image: String,
}

impl Product {
    pub fn new(name: String, category: String, price: Decimal, stock: i64, image: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            category,
            price,
            stock,
            image,
        }
    }

    pub fn summary(&self) -> ProductSummary {
        ProductSummary {
            id: self.id,
            name: self.name.clone(),
            price: self.price,
            category: self.category.clone(),
            image: self.image.clone(),
        }
    }
}

/// Product projection embedded in enriched order listings.
#[derive(Debug, Clone, Serialize)]
pub struct ProductSummary {
    pub id: Uuid,
    pub name: String,
    pub price: Decimal,
    pub category: String,
    pub image: String,
}
