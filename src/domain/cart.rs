//! Cart aggregate and the pricing pipeline.
//!
//! The cart is an explicit, serializable aggregate rather than ambient
//! session state: clients persist it between visits, and checkout rebuilds
//! one server-side from the submitted lines to recompute the quote against
//! current catalog prices.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::PricingConfig;
use crate::domain::product::Product;
use crate::error::{errmsg, Error};

/// One (product, quantity) pair in the cart. The unit price is captured
/// from the product when the line is added so the quote is a pure function
/// of the cart alone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartLine {
    pub product_id: Uuid,
    pub unit_price: Decimal,
    pub quantity: u32,
}

/// Coupon table entry. Codes match case-insensitively.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Coupon {
    /// Fraction of the subtotal taken off the total.
    PercentOff(Decimal),
    /// Discount equal to whatever the shipping fee currently is.
    FreeShipping,
}

impl Coupon {
    /// Look up a code in the static coupon table.
    pub fn lookup(code: &str) -> Option<Coupon> {
        match code.to_lowercase().as_str() {
            "discount10" => Some(Coupon::PercentOff(Decimal::new(10, 2))),
            "freeship" => Some(Coupon::FreeShipping),
            _ => None,
        }
    }
}

/// Pricing breakdown for a cart at a point in time.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    pub subtotal: Decimal,
    pub shipping: Decimal,
    pub tax: Decimal,
    pub discount: Decimal,
    pub total: Decimal,
}

/// Pre-checkout line list plus an optionally applied coupon.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Cart {
    lines: Vec<CartLine>,
    coupon: Option<Coupon>,
}

impl Cart {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Add a product to the cart. If the product is already present the
    /// quantity increases by the given amount; otherwise a new line is
    /// appended. Stock is not checked here; placement is where availability
    /// is enforced.
    pub fn add_line(&mut self, product: &Product, quantity: u32) {
        if let Some(line) = self.lines.iter_mut().find(|l| l.product_id == product.id) {
            line.quantity += quantity;
        } else {
            self.lines.push(CartLine {
                product_id: product.id,
                unit_price: product.price,
                quantity,
            });
        }
    }

    /// Replace a line's quantity. Zero removes the line.
    pub fn set_quantity(&mut self, product_id: Uuid, quantity: u32) {
        if quantity == 0 {
            self.remove_line(product_id);
        } else if let Some(line) = self.lines.iter_mut().find(|l| l.product_id == product_id) {
            line.quantity = quantity;
        }
    }

    pub fn remove_line(&mut self, product_id: Uuid) {
        self.lines.retain(|l| l.product_id != product_id);
    }

    /// Empty the cart. Invoked after successful order placement.
    pub fn clear(&mut self) {
        self.lines.clear();
        self.coupon = None;
    }

    /// Apply a coupon code. An unknown code reports an error AND clears any
    /// previously applied coupon; reapplying an invalid code after a valid
    /// one removes the prior discount. Existing clients depend on this.
    pub fn apply_coupon(&mut self, code: &str) -> Result<Coupon, Error> {
        match Coupon::lookup(code) {
            Some(coupon) => {
                self.coupon = Some(coupon);
                Ok(coupon)
            }
            None => {
                self.coupon = None;
                Err(Error::Validation(errmsg::INVALID_COUPON.to_string()))
            }
        }
    }

    pub fn coupon(&self) -> Option<Coupon> {
        self.coupon
    }

    /// Compute the pricing breakdown. Every monetary component is rounded
    /// to 2 decimal places before the total is summed, so the total is
    /// exact over the displayed components.
    pub fn quote(&self, pricing: &PricingConfig) -> Quote {
        let subtotal = round2(
            self.lines
                .iter()
                .map(|l| l.unit_price * Decimal::from(l.quantity))
                .sum(),
        );

        let shipping = if subtotal > pricing.free_shipping_threshold {
            Decimal::ZERO
        } else {
            pricing.flat_shipping_fee
        };

        let tax = round2(subtotal * pricing.tax_rate);

        let discount = match self.coupon {
            Some(Coupon::PercentOff(fraction)) => round2(subtotal * fraction),
            Some(Coupon::FreeShipping) => shipping,
            None => Decimal::ZERO,
        };

        Quote {
            subtotal,
            shipping,
            tax,
            discount,
            total: subtotal + shipping + tax - discount,
        }
    }
}

/// Round to 2 decimal places, midpoint away from zero.
fn round2(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn product(name: &str, price: Decimal) -> Product {
        Product::new(name.into(), "test".into(), price, 100, "img.png".into())
    }

    fn pricing() -> PricingConfig {
        PricingConfig::default()
    }

    #[test]
    fn test_quote_components_sum_to_total() {
        let mut cart = Cart::new();
        cart.add_line(&product("a", dec!(13.37)), 3);
        cart.add_line(&product("b", dec!(0.99)), 7);
        let q = cart.quote(&pricing());
        assert_eq!(q.total, q.subtotal + q.shipping + q.tax - q.discount);
    }

    #[test]
    fn test_flat_fee_at_threshold_free_above() {
        let mut cart = Cart::new();
        cart.add_line(&product("a", dec!(50.00)), 1);
        // exactly at the threshold still pays the flat fee
        assert_eq!(cart.quote(&pricing()).shipping, dec!(5.99));

        cart.add_line(&product("b", dec!(0.01)), 1);
        assert_eq!(cart.quote(&pricing()).shipping, dec!(0));
    }

    #[test]
    fn test_reference_quote() {
        // 2 x 10.00 -> subtotal 20.00, shipping 5.99, tax 1.40, total 27.39
        let mut cart = Cart::new();
        cart.add_line(&product("a", dec!(10.00)), 2);
        let q = cart.quote(&pricing());
        assert_eq!(q.subtotal, dec!(20.00));
        assert_eq!(q.shipping, dec!(5.99));
        assert_eq!(q.tax, dec!(1.40));
        assert_eq!(q.discount, dec!(0));
        assert_eq!(q.total, dec!(27.39));
    }

    #[test]
    fn test_discount10_is_ten_percent_of_subtotal() {
        let mut cart = Cart::new();
        cart.add_line(&product("a", dec!(30.00)), 1);
        cart.apply_coupon("DISCOUNT10").unwrap();
        let q = cart.quote(&pricing());
        assert_eq!(q.discount, dec!(3.00));
        assert_eq!(q.total, dec!(30.00) + dec!(5.99) + dec!(2.10) - dec!(3.00));
    }

    #[test]
    fn test_coupon_codes_match_case_insensitively() {
        let mut cart = Cart::new();
        cart.add_line(&product("a", dec!(10.00)), 1);
        assert!(cart.apply_coupon("discount10").is_ok());
        assert!(cart.apply_coupon("FreeShip").is_ok());
    }

    #[test]
    fn test_freeship_discount_equals_shipping_fee() {
        let mut cart = Cart::new();
        cart.add_line(&product("a", dec!(10.00)), 1);
        cart.apply_coupon("FREESHIP").unwrap();
        let q = cart.quote(&pricing());
        assert_eq!(q.discount, dec!(5.99));

        // above the free-shipping threshold the coupon is worth nothing
        cart.add_line(&product("b", dec!(100.00)), 1);
        let q = cart.quote(&pricing());
        assert_eq!(q.shipping, dec!(0));
        assert_eq!(q.discount, dec!(0));
    }

    #[test]
    fn test_invalid_coupon_reports_error_and_resets_discount() {
        let mut cart = Cart::new();
        cart.add_line(&product("a", dec!(10.00)), 1);
        cart.apply_coupon("DISCOUNT10").unwrap();
        assert_eq!(cart.quote(&pricing()).discount, dec!(1.00));

        let err = cart.apply_coupon("BOGUS").unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert_eq!(cart.quote(&pricing()).discount, dec!(0));
    }

    #[test]
    fn test_add_line_merges_quantities() {
        let p = product("a", dec!(10.00));
        let mut twice = Cart::new();
        twice.add_line(&p, 2);
        twice.add_line(&p, 3);

        let mut once = Cart::new();
        once.add_line(&p, 5);

        assert_eq!(twice.lines(), once.lines());
    }

    #[test]
    fn test_set_quantity_zero_removes_line() {
        let p = product("a", dec!(10.00));
        let mut cart = Cart::new();
        cart.add_line(&p, 2);
        cart.set_quantity(p.id, 0);
        assert!(cart.is_empty());
    }

    #[test]
    fn test_set_quantity_replaces() {
        let p = product("a", dec!(10.00));
        let mut cart = Cart::new();
        cart.add_line(&p, 2);
        cart.set_quantity(p.id, 9);
        assert_eq!(cart.lines()[0].quantity, 9);
    }

    #[test]
    fn test_clear_empties_lines_and_coupon() {
        let p = product("a", dec!(10.00));
        let mut cart = Cart::new();
        cart.add_line(&p, 1);
        cart.apply_coupon("FREESHIP").unwrap();
        cart.clear();
        assert!(cart.is_empty());
        assert!(cart.coupon().is_none());
    }

    #[test]
    fn test_cart_round_trips_through_serde() {
        let p = product("a", dec!(19.99));
        let mut cart = Cart::new();
        cart.add_line(&p, 4);
        cart.apply_coupon("DISCOUNT10").unwrap();

        let json = serde_json::to_string(&cart).unwrap();
        let restored: Cart = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.lines(), cart.lines());
        assert_eq!(restored.quote(&pricing()), cart.quote(&pricing()));
    }
}
