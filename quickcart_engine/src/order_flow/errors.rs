use thiserror::Error;

use crate::traits::{AuthError, GatewayError, OrderDatabaseError};

#[derive(Debug, Error)]
pub enum OrderFlowError {
    /// Client input failed validation. Never retried.
    #[error("Invalid order request. {0}")]
    InvalidRequest(String),
    /// The caller token was missing, invalid or expired.
    #[error("Caller could not be authenticated. {0}")]
    Unauthenticated(String),
    #[error("Order not found. {0}")]
    OrderNotFound(String),
    /// The status registry has not been seeded. The operator must fix this; it is not a per-request retry case.
    #[error("Order status registry is not configured correctly. {0}")]
    ConfigurationError(String),
    /// A provider call failed. This is not a payment outcome: the caller decides whether to retry with backoff.
    #[error("Payment gateway error. {0}")]
    GatewayError(#[from] GatewayError),
    #[error("Database error. {0}")]
    DatabaseError(String),
}

impl From<OrderDatabaseError> for OrderFlowError {
    fn from(e: OrderDatabaseError) -> Self {
        match e {
            OrderDatabaseError::OrderNotFound(id) => OrderFlowError::OrderNotFound(id.to_string()),
            OrderDatabaseError::StatusNotFound(name) => OrderFlowError::ConfigurationError(format!(
                "Order status {name} is missing from the registry. Seed the statuses before accepting traffic."
            )),
            other => OrderFlowError::DatabaseError(other.to_string()),
        }
    }
}

impl From<AuthError> for OrderFlowError {
    fn from(e: AuthError) -> Self {
        OrderFlowError::Unauthenticated(e.to_string())
    }
}
