//! Order placement, listing, and the operator status workflow.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::{Identity, Operator};
use crate::domain::order::{Order, OrderLine, PaymentDetails, ShippingDetails};
use crate::error::{errmsg, Error, Result};
use crate::services::{OrderView, PlaceOrder};

use super::AppState;

/// One requested line. `productId` is the spelling some older clients
/// send; both land in the same place.
#[derive(Debug, Deserialize)]
pub struct OrderLineRequest {
    #[serde(alias = "productId")]
    product: Uuid,
    quantity: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceOrderRequest {
    /// `items` is the spelling some older clients send.
    #[serde(alias = "items")]
    products: Option<Vec<OrderLineRequest>>,
    total_amount: Option<Decimal>,
    coupon_code: Option<String>,
    shipping_details: Option<ShippingDetails>,
    payment_details: Option<PaymentDetails>,
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    status: String,
}

#[derive(Debug, Serialize)]
pub struct OrderResponse {
    message: String,
    order: Order,
}

pub async fn place(
    identity: Identity,
    State(state): State<AppState>,
    Json(req): Json<PlaceOrderRequest>,
) -> Result<(StatusCode, Json<OrderResponse>)> {
    let lines = req
        .products
        .unwrap_or_default()
        .into_iter()
        .map(|line| OrderLine {
            product: line.product,
            quantity: line.quantity,
        })
        .collect();
    let shipping = req
        .shipping_details
        .ok_or_else(|| Error::Validation(errmsg::FIELDS_REQUIRED.to_string()))?;

    let order = state
        .orders
        .place(
            &identity,
            PlaceOrder {
                lines,
                shipping,
                payment: req.payment_details,
                coupon_code: req.coupon_code,
                client_total: req.total_amount,
            },
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(OrderResponse {
            message: "Order placed.".to_string(),
            order,
        }),
    ))
}

pub async fn mine(
    identity: Identity,
    State(state): State<AppState>,
) -> Result<Json<Vec<OrderView>>> {
    Ok(Json(state.orders.list_mine(&identity).await?))
}

pub async fn get_one(
    identity: Identity,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Order>> {
    let id = parse_order_id(&id)?;
    Ok(Json(state.orders.get(&identity, id).await?))
}

pub async fn admin_list(
    Operator(identity): Operator,
    State(state): State<AppState>,
) -> Result<Json<Vec<OrderView>>> {
    Ok(Json(state.orders.list_all(&identity).await?))
}

pub async fn set_status(
    Operator(identity): Operator,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<StatusRequest>,
) -> Result<Json<OrderResponse>> {
    let id = parse_order_id(&id)?;
    let order = state.orders.transition(&identity, id, &req.status).await?;

    Ok(Json(OrderResponse {
        message: format!("Order status updated to {}.", order.status),
        order,
    }))
}

fn parse_order_id(raw: &str) -> Result<Uuid> {
    Uuid::parse_str(raw).map_err(|_| Error::NotFound(errmsg::ORDER_NOT_FOUND.to_string()))
}
