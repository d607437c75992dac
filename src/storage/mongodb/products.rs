//! MongoDB ProductStore implementation.

use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::bson::doc;
use mongodb::{Collection, Database};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::product::Product;
use crate::storage::{ProductStore, Result, StorageError};

use super::PRODUCTS_COLLECTION;

/// Stored shape of a product. Price serializes as a plain double.
#[derive(Debug, Serialize, Deserialize)]
struct ProductDoc {
    #[serde(rename = "_id")]
    id: String,
    name: String,
    category: String,
    price: Decimal,
    stock: i64,
    image: String,
}

impl From<&Product> for ProductDoc {
    fn from(product: &Product) -> Self {
        Self {
            id: product.id.to_string(),
            name: product.name.clone(),
            category: product.category.clone(),
            price: product.price,
            stock: product.stock,
            image: product.image.clone(),
        }
    }
}

impl TryFrom<ProductDoc> for Product {
    type Error = StorageError;

    fn try_from(doc: ProductDoc) -> Result<Self> {
        Ok(Product {
            id: Uuid::parse_str(&doc.id)?,
            name: doc.name,
            category: doc.category,
            price: doc.price,
            stock: doc.stock,
            image: doc.image,
        })
    }
}

/// MongoDB implementation of ProductStore.
pub struct MongoProductStore {
    products: Collection<ProductDoc>,
}

impl MongoProductStore {
    pub fn new(database: &Database) -> Self {
        Self {
            products: database.collection(PRODUCTS_COLLECTION),
        }
    }
}

#[async_trait]
impl ProductStore for MongoProductStore {
    async fn insert(&self, product: &Product) -> Result<()> {
        self.products.insert_one(ProductDoc::from(product)).await?;
        Ok(())
    }

    async fn list(&self) -> Result<Vec<Product>> {
        let docs: Vec<ProductDoc> = self.products.find(doc! {}).await?.try_collect().await?;
        docs.into_iter().map(Product::try_from).collect()
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Product>> {
        let doc = self
            .products
            .find_one(doc! { "_id": id.to_string() })
            .await?;
        doc.map(Product::try_from).transpose()
    }

    async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Product>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let id_strings: Vec<String> = ids.iter().map(Uuid::to_string).collect();
        let docs: Vec<ProductDoc> = self
            .products
            .find(doc! { "_id": { "$in": id_strings } })
            .await?
            .try_collect()
            .await?;
        docs.into_iter().map(Product::try_from).collect()
    }

    async fn update(&self, product: &Product) -> Result<()> {
        let result = self
            .products
            .replace_one(
                doc! { "_id": product.id.to_string() },
                ProductDoc::from(product),
            )
            .await?;
        if result.matched_count == 0 {
            return Err(StorageError::NotFound {
                entity: "product",
                id: product.id.to_string(),
            });
        }
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<Product> {
        let doc = self
            .products
            .find_one_and_delete(doc! { "_id": id.to_string() })
            .await?;
        match doc {
            Some(doc) => Product::try_from(doc),
            None => Err(StorageError::NotFound {
                entity: "product",
                id: id.to_string(),
            }),
        }
    }

    async fn adjust_stock(&self, id: Uuid, delta: i64) -> Result<bool> {
        // A negative delta is conditional on sufficient stock; the filter
        // and the $inc run as one atomic document update.
        let filter = if delta < 0 {
            doc! { "_id": id.to_string(), "stock": { "$gte": -delta } }
        } else {
            doc! { "_id": id.to_string() }
        };
        let result = self
            .products
            .update_one(filter, doc! { "$inc": { "stock": delta } })
            .await?;
        Ok(result.matched_count == 1)
    }
}
