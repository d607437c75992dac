//! MongoDB OrderStore implementation.

use async_trait::async_trait;
use bson::serde_helpers::chrono_datetime_as_bson_datetime;
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use mongodb::bson::doc;
use mongodb::options::{FindOneAndUpdateOptions, FindOptions, ReturnDocument};
use mongodb::{Collection, Database, IndexModel};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::order::{Order, OrderLine, OrderStatus, PaymentDetails, ShippingDetails};
use crate::storage::{OrderStore, Result, StorageError};

use super::ORDERS_COLLECTION;

/// Stored shape of an order line.
#[derive(Debug, Serialize, Deserialize)]
struct OrderLineDoc {
    product: String,
    quantity: u32,
}

/// Stored shape of an order.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OrderDoc {
    #[serde(rename = "_id")]
    id: String,
    user: String,
    products: Vec<OrderLineDoc>,
    total_amount: Decimal,
    shipping_details: ShippingDetails,
    #[serde(skip_serializing_if = "Option::is_none")]
    payment_details: Option<PaymentDetails>,
    status: OrderStatus,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    created_at: DateTime<Utc>,
}

impl From<&Order> for OrderDoc {
    fn from(order: &Order) -> Self {
        Self {
            id: order.id.to_string(),
            user: order.user.to_string(),
            products: order
                .products
                .iter()
                .map(|line| OrderLineDoc {
                    product: line.product.to_string(),
                    quantity: line.quantity,
                })
                .collect(),
            total_amount: order.total_amount,
            shipping_details: order.shipping_details.clone(),
            payment_details: order.payment_details.clone(),
            status: order.status,
            created_at: order.created_at,
        }
    }
}

impl TryFrom<OrderDoc> for Order {
    type Error = StorageError;

    fn try_from(doc: OrderDoc) -> Result<Self> {
        let products = doc
            .products
            .into_iter()
            .map(|line| {
                Ok(OrderLine {
                    product: Uuid::parse_str(&line.product)?,
                    quantity: line.quantity,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Order {
            id: Uuid::parse_str(&doc.id)?,
            user: Uuid::parse_str(&doc.user)?,
            products,
            total_amount: doc.total_amount,
            shipping_details: doc.shipping_details,
            payment_details: doc.payment_details,
            status: doc.status,
            created_at: doc.created_at,
        })
    }
}

/// MongoDB implementation of OrderStore.
pub struct MongoOrderStore {
    orders: Collection<OrderDoc>,
}

impl MongoOrderStore {
    /// Create the store and ensure the owner listing index exists.
    pub async fn new(database: &Database) -> Result<Self> {
        let orders = database.collection(ORDERS_COLLECTION);

        let owner_index = IndexModel::builder()
            .keys(doc! { "user": 1, "createdAt": -1 })
            .build();
        orders.create_index(owner_index).await?;

        Ok(Self { orders })
    }

    async fn collect_sorted(&self, filter: bson::Document) -> Result<Vec<Order>> {
        let options = FindOptions::builder()
            .sort(doc! { "createdAt": -1 })
            .build();
        let docs: Vec<OrderDoc> = self
            .orders
            .find(filter)
            .with_options(options)
            .await?
            .try_collect()
            .await?;
        docs.into_iter().map(Order::try_from).collect()
    }
}

#[async_trait]
impl OrderStore for MongoOrderStore {
    async fn insert(&self, order: &Order) -> Result<()> {
        self.orders.insert_one(OrderDoc::from(order)).await?;
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Order>> {
        let doc = self
            .orders
            .find_one(doc! { "_id": id.to_string() })
            .await?;
        doc.map(Order::try_from).transpose()
    }

    async fn list_by_user(&self, user: Uuid) -> Result<Vec<Order>> {
        self.collect_sorted(doc! { "user": user.to_string() }).await
    }

    async fn list_all(&self) -> Result<Vec<Order>> {
        self.collect_sorted(doc! {}).await
    }

    async fn update_status(&self, id: Uuid, status: OrderStatus) -> Result<Order> {
        let options = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .build();
        let doc = self
            .orders
            .find_one_and_update(
                doc! { "_id": id.to_string() },
                doc! { "$set": { "status": status.as_str() } },
            )
            .with_options(options)
            .await?;
        match doc {
            Some(doc) => Order::try_from(doc),
            None => Err(StorageError::NotFound {
                entity: "order",
                id: id.to_string(),
            }),
        }
    }
}
