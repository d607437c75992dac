//! Order workflow engine and read-side projections.
//!
//! Placement validates the draft against the current catalog, recomputes
//! the quote server-side, decrements stock product by product through
//! conditional updates, and persists the order as `pending`. Thereafter the
//! status is the only mutable field, and only operators may move it.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::Identity;
use crate::config::{OrdersConfig, PricingConfig};
use crate::domain::cart::Cart;
use crate::domain::order::{Order, OrderLine, OrderStatus, PaymentDetails, ShippingDetails};
use crate::domain::product::{Product, ProductSummary};
use crate::domain::user::UserSummary;
use crate::error::{errmsg, Error, Result};
use crate::storage::{OrderStore, ProductStore, UserStore};

/// Largest tolerated difference between a client-supplied total and the
/// server-side quote.
const TOTAL_EPSILON: Decimal = dec!(0.01);

/// A normalized order draft, ready for validation and pricing.
#[derive(Debug, Clone)]
pub struct PlaceOrder {
    pub lines: Vec<OrderLine>,
    pub shipping: ShippingDetails,
    pub payment: Option<PaymentDetails>,
    /// Coupon applied in the client's cart, if any, so the server-side
    /// quote reproduces the discount.
    pub coupon_code: Option<String>,
    /// Total the client computed. Checked against the server-side quote,
    /// never trusted.
    pub client_total: Option<Decimal>,
}

/// Owner field of an enriched order: a summary when the read side could
/// resolve the account, the bare reference otherwise.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum OwnerRef {
    Summary(UserSummary),
    Id(Uuid),
}

/// An order line with its product summary joined in. `None` when the
/// product has since been deleted; historical orders keep the reference.
#[derive(Debug, Serialize)]
pub struct OrderLineView {
    pub product: Option<ProductSummary>,
    pub quantity: u32,
}

/// An order enriched for listings.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderView {
    pub id: Uuid,
    pub user: OwnerRef,
    pub products: Vec<OrderLineView>,
    pub total_amount: Decimal,
    pub shipping_details: ShippingDetails,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_details: Option<PaymentDetails>,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
}

/// The order workflow engine plus its query side.
pub struct OrderService {
    orders: Arc<dyn OrderStore>,
    products: Arc<dyn ProductStore>,
    users: Arc<dyn UserStore>,
    pricing: PricingConfig,
    config: OrdersConfig,
}

impl OrderService {
    pub fn new(
        orders: Arc<dyn OrderStore>,
        products: Arc<dyn ProductStore>,
        users: Arc<dyn UserStore>,
        pricing: PricingConfig,
        config: OrdersConfig,
    ) -> Self {
        Self {
            orders,
            products,
            users,
            pricing,
            config,
        }
    }

    /// Validate and persist an order draft. Any authenticated identity may
    /// place an order for itself.
    pub async fn place(&self, identity: &Identity, draft: PlaceOrder) -> Result<Order> {
        if draft.lines.is_empty() {
            return Err(Error::Validation(errmsg::EMPTY_ORDER.to_string()));
        }
        if draft.lines.iter().any(|line| line.quantity == 0) {
            return Err(Error::Validation(errmsg::INVALID_QUANTITY.to_string()));
        }
        if !draft.shipping.is_complete() {
            return Err(Error::Validation(errmsg::FIELDS_REQUIRED.to_string()));
        }

        let resolved = self.resolve_products(&draft.lines).await?;

        // Rebuild the cart server-side against current catalog prices.
        let mut cart = Cart::new();
        for line in &draft.lines {
            let product = &resolved[&line.product];
            cart.add_line(product, line.quantity);
        }
        if let Some(code) = &draft.coupon_code {
            cart.apply_coupon(code)?;
        }
        let quote = cart.quote(&self.pricing);

        if let Some(client_total) = draft.client_total {
            if (client_total - quote.total).abs() > TOTAL_EPSILON {
                warn!(
                    client = %client_total,
                    server = %quote.total,
                    "rejecting order with stale total"
                );
                return Err(Error::Validation(errmsg::TOTAL_MISMATCH.to_string()));
            }
        }

        self.claim_stock(&draft.lines, &resolved).await?;

        let order = Order::place(
            identity.id,
            draft.lines,
            quote.total,
            draft.shipping,
            draft.payment,
        );

        if let Err(err) = self.orders.insert(&order).await {
            self.release_stock(&order.products).await;
            return Err(err.into());
        }

        info!(order = %order.id, user = %identity.id, total = %order.total_amount, "order placed");
        Ok(order)
    }

    /// Move an order to a new status. Operator-only.
    ///
    /// The status string is first gated on enum membership (400 for
    /// anything outside it), then on the transition table — unless the
    /// permissive compatibility mode is on, in which case any member is
    /// settable, as older deployments allowed.
    pub async fn transition(
        &self,
        identity: &Identity,
        order_id: Uuid,
        status: &str,
    ) -> Result<Order> {
        if !identity.is_operator() {
            return Err(Error::Authorization(errmsg::ADMIN_ONLY.to_string()));
        }

        let next = OrderStatus::from_str(status)
            .map_err(|_| Error::Validation(errmsg::INVALID_STATUS.to_string()))?;

        let order = self
            .orders
            .find_by_id(order_id)
            .await?
            .ok_or_else(|| Error::NotFound(errmsg::ORDER_NOT_FOUND.to_string()))?;

        if !self.config.permissive_transitions && !order.status.can_transition_to(next) {
            return Err(Error::Conflict(format!(
                "Cannot change status from {} to {}.",
                order.status, next
            )));
        }

        let updated = self.orders.update_status(order_id, next).await?;
        info!(order = %order_id, from = %order.status, to = %next, "order status changed");
        Ok(updated)
    }

    /// Fetch one order. Owners see their own; operators see any.
    pub async fn get(&self, identity: &Identity, order_id: Uuid) -> Result<Order> {
        let order = self
            .orders
            .find_by_id(order_id)
            .await?
            .ok_or_else(|| Error::NotFound(errmsg::ORDER_NOT_FOUND.to_string()))?;

        if order.user != identity.id && !identity.is_operator() {
            return Err(Error::Authorization(errmsg::FORBIDDEN.to_string()));
        }
        Ok(order)
    }

    /// The caller's orders, newest first, with product summaries joined in.
    pub async fn list_mine(&self, identity: &Identity) -> Result<Vec<OrderView>> {
        let orders = self.orders.list_by_user(identity.id).await?;
        let products = self.product_summaries(&orders).await?;

        Ok(orders
            .into_iter()
            .map(|order| build_view(order, OwnerRef::Id(identity.id), &products))
            .collect())
    }

    /// Every order, newest first, with owner and product summaries joined
    /// in. Operator-only.
    pub async fn list_all(&self, identity: &Identity) -> Result<Vec<OrderView>> {
        if !identity.is_operator() {
            return Err(Error::Authorization(errmsg::ADMIN_ONLY.to_string()));
        }

        let orders = self.orders.list_all().await?;
        let products = self.product_summaries(&orders).await?;

        let mut owners: HashMap<Uuid, UserSummary> = HashMap::new();
        for order in &orders {
            if let std::collections::hash_map::Entry::Vacant(entry) = owners.entry(order.user) {
                if let Some(user) = self.users.find_by_id(order.user).await? {
                    entry.insert(user.summary());
                }
            }
        }

        Ok(orders
            .into_iter()
            .map(|order| {
                let owner = match owners.get(&order.user) {
                    Some(summary) => OwnerRef::Summary(summary.clone()),
                    None => OwnerRef::Id(order.user),
                };
                build_view(order, owner, &products)
            })
            .collect())
    }

    /// Look up every referenced product, failing if any line points at a
    /// product that does not exist.
    async fn resolve_products(&self, lines: &[OrderLine]) -> Result<HashMap<Uuid, Product>> {
        let ids: Vec<Uuid> = lines.iter().map(|line| line.product).collect();
        let found = self.products.find_by_ids(&ids).await?;
        let resolved: HashMap<Uuid, Product> = found.into_iter().map(|p| (p.id, p)).collect();

        for line in lines {
            if !resolved.contains_key(&line.product) {
                return Err(Error::NotFound(errmsg::PRODUCT_NOT_FOUND.to_string()));
            }
        }
        Ok(resolved)
    }

    /// Decrement stock for every line, rolling back the decrements already
    /// applied if any product cannot cover its quantity.
    async fn claim_stock(
        &self,
        lines: &[OrderLine],
        resolved: &HashMap<Uuid, Product>,
    ) -> Result<()> {
        let mut claimed: Vec<&OrderLine> = Vec::with_capacity(lines.len());
        for line in lines {
            let available = self
                .products
                .adjust_stock(line.product, -i64::from(line.quantity))
                .await?;
            if !available {
                self.release_stock(&claimed.into_iter().cloned().collect::<Vec<_>>())
                    .await;
                return Err(Error::OutOfStock {
                    product: resolved[&line.product].name.clone(),
                });
            }
            claimed.push(line);
        }
        Ok(())
    }

    /// Return previously claimed stock. Best effort: a failure here is
    /// logged, not propagated, because the order itself already failed.
    async fn release_stock(&self, lines: &[OrderLine]) {
        for line in lines {
            if let Err(err) = self
                .products
                .adjust_stock(line.product, i64::from(line.quantity))
                .await
            {
                warn!(product = %line.product, error = %err, "failed to release stock");
            }
        }
    }

    async fn product_summaries(&self, orders: &[Order]) -> Result<HashMap<Uuid, ProductSummary>> {
        let mut ids: Vec<Uuid> = orders
            .iter()
            .flat_map(|order| order.products.iter().map(|line| line.product))
            .collect();
        ids.sort_unstable();
        ids.dedup();

        let products = self.products.find_by_ids(&ids).await?;
        Ok(products.into_iter().map(|p| (p.id, p.summary())).collect())
    }
}

fn build_view(
    order: Order,
    owner: OwnerRef,
    products: &HashMap<Uuid, ProductSummary>,
) -> OrderView {
    OrderView {
        id: order.id,
        user: owner,
        products: order
            .products
            .iter()
            .map(|line| OrderLineView {
                product: products.get(&line.product).cloned(),
                quantity: line.quantity,
            })
            .collect(),
        total_amount: order.total_amount,
        shipping_details: order.shipping_details,
        payment_details: order.payment_details,
        status: order.status,
        created_at: order.created_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::user::Role;
    use crate::storage::{MemoryOrderStore, MemoryProductStore, MemoryUserStore};

    fn service(permissive: bool) -> (OrderService, Arc<MemoryProductStore>) {
        let products = Arc::new(MemoryProductStore::new());
        let service = OrderService::new(
            Arc::new(MemoryOrderStore::new()),
            products.clone(),
            Arc::new(MemoryUserStore::new()),
            PricingConfig::default(),
            OrdersConfig {
                permissive_transitions: permissive,
            },
        );
        (service, products)
    }

    fn customer() -> Identity {
        Identity {
            id: Uuid::new_v4(),
            email: "customer@example.com".into(),
            role: Role::Customer,
        }
    }

    fn operator() -> Identity {
        Identity {
            id: Uuid::new_v4(),
            email: "ops@example.com".into(),
            role: Role::Operator,
        }
    }

    fn shipping() -> ShippingDetails {
        ShippingDetails {
            full_name: "Ada Lovelace".into(),
            address: "1 Analytical Way".into(),
            city: "London".into(),
            zip: "EC1".into(),
        }
    }

    async fn seed_product(store: &MemoryProductStore, price: Decimal, stock: i64) -> Product {
        let product = Product::new("Widget".into(), "tools".into(), price, stock, "w.png".into());
        store.insert(&product).await.unwrap();
        product
    }

    fn draft(lines: Vec<OrderLine>) -> PlaceOrder {
        PlaceOrder {
            lines,
            shipping: shipping(),
            payment: None,
            coupon_code: None,
            client_total: None,
        }
    }

    #[tokio::test]
    async fn test_place_computes_total_and_decrements_stock() {
        let (service, products) = service(false);
        let product = seed_product(&products, dec!(10.00), 5).await;

        let order = service
            .place(
                &customer(),
                draft(vec![OrderLine {
                    product: product.id,
                    quantity: 2,
                }]),
            )
            .await
            .unwrap();

        // 20.00 + 5.99 shipping + 1.40 tax
        assert_eq!(order.total_amount, dec!(27.39));
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(
            products.find_by_id(product.id).await.unwrap().unwrap().stock,
            3
        );
    }

    #[tokio::test]
    async fn test_place_unknown_product_not_found() {
        let (service, _) = service(false);
        let err = service
            .place(
                &customer(),
                draft(vec![OrderLine {
                    product: Uuid::new_v4(),
                    quantity: 1,
                }]),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn test_place_out_of_stock_rolls_back_earlier_lines() {
        let (service, products) = service(false);
        let plenty = seed_product(&products, dec!(10.00), 10).await;
        let scarce = seed_product(&products, dec!(5.00), 1).await;

        let err = service
            .place(
                &customer(),
                draft(vec![
                    OrderLine {
                        product: plenty.id,
                        quantity: 4,
                    },
                    OrderLine {
                        product: scarce.id,
                        quantity: 2,
                    },
                ]),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::OutOfStock { .. }));

        // the first line's decrement was undone
        assert_eq!(
            products.find_by_id(plenty.id).await.unwrap().unwrap().stock,
            10
        );
        assert_eq!(
            products.find_by_id(scarce.id).await.unwrap().unwrap().stock,
            1
        );
    }

    #[tokio::test]
    async fn test_place_rejects_stale_client_total() {
        let (service, products) = service(false);
        let product = seed_product(&products, dec!(10.00), 5).await;

        let mut order = draft(vec![OrderLine {
            product: product.id,
            quantity: 2,
        }]);
        order.client_total = Some(dec!(19.99));

        let err = service.place(&customer(), order).await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        // nothing was claimed
        assert_eq!(
            products.find_by_id(product.id).await.unwrap().unwrap().stock,
            5
        );
    }

    #[tokio::test]
    async fn test_place_accepts_matching_client_total_with_coupon() {
        let (service, products) = service(false);
        let product = seed_product(&products, dec!(10.00), 5).await;

        let mut order = draft(vec![OrderLine {
            product: product.id,
            quantity: 2,
        }]);
        order.coupon_code = Some("DISCOUNT10".into());
        // 20.00 + 5.99 + 1.40 - 2.00
        order.client_total = Some(dec!(25.39));

        let placed = service.place(&customer(), order).await.unwrap();
        assert_eq!(placed.total_amount, dec!(25.39));
    }

    #[tokio::test]
    async fn test_place_rejects_unknown_coupon() {
        let (service, products) = service(false);
        let product = seed_product(&products, dec!(10.00), 5).await;

        let mut order = draft(vec![OrderLine {
            product: product.id,
            quantity: 1,
        }]);
        order.coupon_code = Some("BOGUS".into());

        let err = service.place(&customer(), order).await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[tokio::test]
    async fn test_transition_requires_operator() {
        let (service, products) = service(false);
        let product = seed_product(&products, dec!(10.00), 5).await;
        let owner = customer();
        let order = service
            .place(
                &owner,
                draft(vec![OrderLine {
                    product: product.id,
                    quantity: 1,
                }]),
            )
            .await
            .unwrap();

        for status in OrderStatus::ALL {
            let err = service
                .transition(&owner, order.id, status.as_str())
                .await
                .unwrap_err();
            assert!(matches!(err, Error::Authorization(_)));
        }
    }

    #[tokio::test]
    async fn test_transition_table_enforced_by_default() {
        let (service, products) = service(false);
        let product = seed_product(&products, dec!(10.00), 5).await;
        let order = service
            .place(
                &customer(),
                draft(vec![OrderLine {
                    product: product.id,
                    quantity: 1,
                }]),
            )
            .await
            .unwrap();
        let ops = operator();

        // pending cannot jump straight to delivered
        let err = service
            .transition(&ops, order.id, "delivered")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));

        // but the documented path works end to end
        service.transition(&ops, order.id, "processing").await.unwrap();
        service.transition(&ops, order.id, "shipped").await.unwrap();
        let done = service.transition(&ops, order.id, "delivered").await.unwrap();
        assert_eq!(done.status, OrderStatus::Delivered);

        // terminal: nothing more is allowed
        let err = service
            .transition(&ops, order.id, "pending")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));
    }

    #[tokio::test]
    async fn test_permissive_mode_allows_any_member() {
        let (service, products) = service(true);
        let product = seed_product(&products, dec!(10.00), 5).await;
        let order = service
            .place(
                &customer(),
                draft(vec![OrderLine {
                    product: product.id,
                    quantity: 1,
                }]),
            )
            .await
            .unwrap();
        let ops = operator();

        let updated = service.transition(&ops, order.id, "delivered").await.unwrap();
        assert_eq!(updated.status, OrderStatus::Delivered);
        let updated = service.transition(&ops, order.id, "pending").await.unwrap();
        assert_eq!(updated.status, OrderStatus::Pending);

        // non-members are still rejected
        let err = service
            .transition(&ops, order.id, "refunded")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[tokio::test]
    async fn test_transition_unknown_order() {
        let (service, _) = service(false);
        let err = service
            .transition(&operator(), Uuid::new_v4(), "processing")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn test_get_owner_operator_and_stranger() {
        let (service, products) = service(false);
        let product = seed_product(&products, dec!(10.00), 5).await;
        let owner = customer();
        let order = service
            .place(
                &owner,
                draft(vec![OrderLine {
                    product: product.id,
                    quantity: 1,
                }]),
            )
            .await
            .unwrap();

        assert!(service.get(&owner, order.id).await.is_ok());
        assert!(service.get(&operator(), order.id).await.is_ok());

        let stranger = customer();
        let err = service.get(&stranger, order.id).await.unwrap_err();
        assert!(matches!(err, Error::Authorization(_)));
    }

    #[tokio::test]
    async fn test_list_mine_scoped_to_owner() {
        let (service, products) = service(false);
        let product = seed_product(&products, dec!(10.00), 50).await;
        let alice = customer();
        let bob = customer();

        for identity in [&alice, &bob, &alice] {
            service
                .place(
                    identity,
                    draft(vec![OrderLine {
                        product: product.id,
                        quantity: 1,
                    }]),
                )
                .await
                .unwrap();
        }

        let mine = service.list_mine(&alice).await.unwrap();
        assert_eq!(mine.len(), 2);

        let all = service.list_all(&operator()).await.unwrap();
        assert_eq!(all.len(), 3);

        let err = service.list_all(&alice).await.unwrap_err();
        assert!(matches!(err, Error::Authorization(_)));
    }

    #[tokio::test]
    async fn test_list_mine_enriches_and_survives_deleted_product() {
        let (service, products) = service(false);
        let product = seed_product(&products, dec!(10.00), 5).await;
        let owner = customer();
        service
            .place(
                &owner,
                draft(vec![OrderLine {
                    product: product.id,
                    quantity: 2,
                }]),
            )
            .await
            .unwrap();

        let mine = service.list_mine(&owner).await.unwrap();
        let summary = mine[0].products[0].product.as_ref().unwrap();
        assert_eq!(summary.name, "Widget");
        assert_eq!(summary.price, dec!(10.00));

        products.delete(product.id).await.unwrap();
        let mine = service.list_mine(&owner).await.unwrap();
        assert!(mine[0].products[0].product.is_none());
        // the frozen total is untouched
        assert_eq!(mine[0].total_amount, dec!(27.39));
    }
}
