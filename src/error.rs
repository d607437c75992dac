//! Request-level error taxonomy.
//!
//! Every fallible operation below the HTTP boundary returns [`Error`]; the
//! boundary converts it into a JSON `{"message": ...}` body with the
//! matching status code. Nothing is retried.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::storage::StorageError;

/// Error message constants surfaced to clients.
pub mod errmsg {
    pub const NO_TOKEN: &str = "Access denied. No token.";
    pub const INVALID_TOKEN: &str = "Invalid or expired token.";
    pub const ADMIN_ONLY: &str = "Admin access only.";
    pub const FORBIDDEN: &str = "Access denied.";
    pub const INVALID_CREDENTIALS: &str = "Invalid credentials.";
    pub const USER_EXISTS: &str = "User already exists.";
    pub const FIELDS_REQUIRED: &str = "All fields are required.";
    pub const INVALID_EMAIL: &str = "A valid email address is required.";
    pub const INVALID_FORM: &str = "Invalid form data.";
    pub const PRODUCT_NOT_FOUND: &str = "Product not found.";
    pub const ORDER_NOT_FOUND: &str = "Order not found.";
    pub const INVALID_STATUS: &str = "Invalid status value.";
    pub const INVALID_COUPON: &str = "Invalid coupon code";
    pub const EMPTY_ORDER: &str = "Order must contain at least one product.";
    pub const INVALID_QUANTITY: &str = "Quantity must be at least 1.";
    pub const TOTAL_MISMATCH: &str = "Order total does not match current pricing.";
    pub const NEGATIVE_PRICE: &str = "Price cannot be negative.";
    pub const NEGATIVE_STOCK: &str = "Stock cannot be negative.";
    pub const INVALID_PRICE: &str = "Invalid price value.";
    pub const INVALID_STOCK: &str = "Invalid stock value.";
    pub const INTERNAL: &str = "Internal server error.";
}

/// Request-level error.
///
/// Variants map one-to-one onto HTTP status codes at the boundary.
#[derive(Debug, Error)]
pub enum Error {
    /// Missing or malformed fields (400).
    #[error("{0}")]
    Validation(String),

    /// Missing, invalid, or expired credential (401).
    #[error("{0}")]
    Authentication(String),

    /// Authenticated but role is insufficient (403).
    #[error("{0}")]
    Authorization(String),

    /// Unknown id (404).
    #[error("{0}")]
    NotFound(String),

    /// Duplicate unique value or a rejected state change (409).
    #[error("{0}")]
    Conflict(String),

    /// Requested quantity exceeds available stock (409).
    #[error("Insufficient stock for {product}.")]
    OutOfStock { product: String },

    /// Unexpected store or provider failure (500). The cause is logged,
    /// never surfaced.
    #[error("{0}")]
    Internal(String),
}

impl Error {
    fn status(&self) -> StatusCode {
        match self {
            Error::Validation(_) => StatusCode::BAD_REQUEST,
            Error::Authentication(_) => StatusCode::UNAUTHORIZED,
            Error::Authorization(_) => StatusCode::FORBIDDEN,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::Conflict(_) | Error::OutOfStock { .. } => StatusCode::CONFLICT,
            Error::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<StorageError> for Error {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound { entity, .. } => Error::NotFound(format!(
                "{} not found.",
                capitalize(entity)
            )),
            StorageError::Duplicate { .. } => Error::Conflict(errmsg::USER_EXISTS.to_string()),
            other => Error::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            Error::Internal(cause) => {
                error!(error = %cause, "request failed");
                errmsg::INTERNAL.to_string()
            }
            other => other.to_string(),
        };
        (status, Json(json!({ "message": message }))).into_response()
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

/// Convenience alias used across services and handlers.
pub type Result<T> = std::result::Result<T, Error>;
