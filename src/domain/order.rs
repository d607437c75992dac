//! Order records and the status workflow.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Order status. A closed set: anything else is rejected at the schema
/// level before it reaches storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Processing,
    Accepted,
    Rejected,
    Shipped,
    Delivered,
    Cancelled,
}

/// Error for a status string outside the enum.
#[derive(Debug, Error)]
#[error("unknown order status: {0}")]
pub struct ParseStatusError(pub String);

impl OrderStatus {
    pub const ALL: [OrderStatus; 7] = [
        OrderStatus::Pending,
        OrderStatus::Processing,
        OrderStatus::Accepted,
        OrderStatus::Rejected,
        OrderStatus::Shipped,
        OrderStatus::Delivered,
        OrderStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Processing => "processing",
            OrderStatus::Accepted => "accepted",
            OrderStatus::Rejected => "rejected",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    /// Terminal states admit no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderStatus::Delivered | OrderStatus::Cancelled | OrderStatus::Rejected
        )
    }

    /// Allowed-transitions table.
    ///
    /// pending -> {processing, accepted, rejected, cancelled}
    /// processing | accepted -> {shipped}
    /// shipped -> {delivered}
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        match self {
            OrderStatus::Pending => matches!(
                next,
                OrderStatus::Processing
                    | OrderStatus::Accepted
                    | OrderStatus::Rejected
                    | OrderStatus::Cancelled
            ),
            OrderStatus::Processing | OrderStatus::Accepted => {
                matches!(next, OrderStatus::Shipped)
            }
            OrderStatus::Shipped => matches!(next, OrderStatus::Delivered),
            OrderStatus::Delivered | OrderStatus::Cancelled | OrderStatus::Rejected => false,
        }
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OrderStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| ParseStatusError(s.to_string()))
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One (product reference, quantity) pair on a placed order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderLine {
    pub product: Uuid,
    pub quantity: u32,
}

/// Where the order ships. All fields required.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingDetails {
    pub full_name: String,
    pub address: String,
    pub city: String,
    pub zip: String,
}

impl ShippingDetails {
    pub fn is_complete(&self) -> bool {
        ![&self.full_name, &self.address, &self.city, &self.zip]
            .iter()
            .any(|field| field.trim().is_empty())
    }
}

/// Optional payment capture. Stored as submitted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentDetails {
    pub card_number: Option<String>,
    pub expiry: Option<String>,
    pub cvv: Option<String>,
}

/// A placed order. The owner and the total are immutable; status is the
/// only field mutated after placement, and only by an operator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: Uuid,
    /// Owning identity. Orders outlive their owner; nothing cascades.
    pub user: Uuid,
    pub products: Vec<OrderLine>,
    /// Computed at placement from the server-side quote, never recomputed.
    pub total_amount: Decimal,
    pub shipping_details: ShippingDetails,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_details: Option<PaymentDetails>,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
}

impl Order {
    pub fn place(
        user: Uuid,
        products: Vec<OrderLine>,
        total_amount: Decimal,
        shipping_details: ShippingDetails,
        payment_details: Option<PaymentDetails>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user,
            products,
            total_amount,
            shipping_details,
            payment_details,
            status: OrderStatus::Pending,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_status_parse_and_display() {
        for status in OrderStatus::ALL {
            assert_eq!(OrderStatus::from_str(status.as_str()).unwrap(), status);
        }
        assert!(OrderStatus::from_str("refunded").is_err());
        assert_eq!(OrderStatus::Shipped.to_string(), "shipped");
    }

    #[test]
    fn test_wire_values_are_lowercase() {
        assert_eq!(
            serde_json::to_string(&OrderStatus::Pending).unwrap(),
            "\"pending\""
        );
        let status: OrderStatus = serde_json::from_str("\"cancelled\"").unwrap();
        assert_eq!(status, OrderStatus::Cancelled);
    }

    #[test]
    fn test_pending_fans_out() {
        for next in [
            OrderStatus::Processing,
            OrderStatus::Accepted,
            OrderStatus::Rejected,
            OrderStatus::Cancelled,
        ] {
            assert!(OrderStatus::Pending.can_transition_to(next));
        }
        assert!(!OrderStatus::Pending.can_transition_to(OrderStatus::Shipped));
        assert!(!OrderStatus::Pending.can_transition_to(OrderStatus::Delivered));
    }

    #[test]
    fn test_shipping_path() {
        assert!(OrderStatus::Processing.can_transition_to(OrderStatus::Shipped));
        assert!(OrderStatus::Accepted.can_transition_to(OrderStatus::Shipped));
        assert!(OrderStatus::Shipped.can_transition_to(OrderStatus::Delivered));
        assert!(!OrderStatus::Shipped.can_transition_to(OrderStatus::Pending));
    }

    #[test]
    fn test_terminal_states_admit_nothing() {
        for terminal in [
            OrderStatus::Delivered,
            OrderStatus::Cancelled,
            OrderStatus::Rejected,
        ] {
            assert!(terminal.is_terminal());
            for next in OrderStatus::ALL {
                assert!(!terminal.can_transition_to(next));
            }
        }
    }

    #[test]
    fn test_shipping_details_completeness() {
        let complete = ShippingDetails {
            full_name: "Ada Lovelace".into(),
            address: "1 Analytical Way".into(),
            city: "London".into(),
            zip: "EC1".into(),
        };
        assert!(complete.is_complete());

        let incomplete = ShippingDetails {
            city: "  ".into(),
            ..complete
        };
        assert!(!incomplete.is_complete());
    }
}
