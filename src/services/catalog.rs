//! Catalog management.

use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::info;
use uuid::Uuid;

use crate::domain::product::Product;
use crate::error::{errmsg, Error, Result};
use crate::storage::ProductStore;

/// Validated fields for creating or replacing a product. The image travels
/// separately because it arrives as a file.
#[derive(Debug, Clone)]
pub struct ProductInput {
    pub name: String,
    pub category: String,
    pub price: Decimal,
    pub stock: i64,
}

impl ProductInput {
    fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() || self.category.trim().is_empty() {
            return Err(Error::Validation(errmsg::FIELDS_REQUIRED.to_string()));
        }
        if self.price < Decimal::ZERO {
            return Err(Error::Validation(errmsg::NEGATIVE_PRICE.to_string()));
        }
        if self.stock < 0 {
            return Err(Error::Validation(errmsg::NEGATIVE_STOCK.to_string()));
        }
        Ok(())
    }
}

/// Product CRUD over the catalog collection. Mutations are operator-only;
/// the route layer enforces that before calls land here.
pub struct CatalogService {
    products: Arc<dyn ProductStore>,
}

impl CatalogService {
    pub fn new(products: Arc<dyn ProductStore>) -> Self {
        Self { products }
    }

    pub async fn list(&self) -> Result<Vec<Product>> {
        Ok(self.products.list().await?)
    }

    pub async fn get(&self, id: Uuid) -> Result<Product> {
        self.products
            .find_by_id(id)
            .await?
            .ok_or_else(|| Error::NotFound(errmsg::PRODUCT_NOT_FOUND.to_string()))
    }

    pub async fn create(&self, input: ProductInput, image: String) -> Result<Product> {
        input.validate()?;
        if image.is_empty() {
            return Err(Error::Validation(errmsg::FIELDS_REQUIRED.to_string()));
        }

        let product = Product::new(input.name, input.category, input.price, input.stock, image);
        self.products.insert(&product).await?;
        info!(product = %product.id, name = %product.name, "product created");
        Ok(product)
    }

    /// Replace the stored fields. Returns the updated product plus the name
    /// of the displaced image file, if any, so the caller can remove it.
    pub async fn update(
        &self,
        id: Uuid,
        input: ProductInput,
        new_image: Option<String>,
    ) -> Result<(Product, Option<String>)> {
        input.validate()?;

        let existing = self.get(id).await?;
        let displaced = match &new_image {
            Some(image) if *image != existing.image => Some(existing.image.clone()),
            _ => None,
        };

        let product = Product {
            id,
            name: input.name,
            category: input.category,
            price: input.price,
            stock: input.stock,
            image: new_image.unwrap_or(existing.image),
        };
        self.products.update(&product).await?;
        info!(product = %product.id, "product updated");
        Ok((product, displaced))
    }

    /// Remove the product, returning it so the caller can clean up its
    /// image file.
    pub async fn delete(&self, id: Uuid) -> Result<Product> {
        let product = self.products.delete(id).await?;
        info!(product = %product.id, "product deleted");
        Ok(product)
    }
}
