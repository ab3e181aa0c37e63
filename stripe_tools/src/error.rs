use thiserror::Error;

#[derive(Debug, Error)]
pub enum StripeApiError {
    #[error("Could not initialize client: {0}")]
    Initialization(String),
    #[error("Invalid REST request: {0}")]
    RestRequestError(String),
    #[error("Invalid REST response: {0}")]
    RestResponseError(String),
    #[error("Could not deserialize JSON: {0}")]
    JsonError(String),
    #[error("Query failed. Error {status}. {message}")]
    QueryError { status: u16, message: String },
    #[error("Malformed Stripe-Signature header: {0}")]
    SignatureFormat(String),
    #[error("Webhook signature does not match the payload")]
    SignatureVerification,
    #[error("Webhook timestamp {0} is outside the accepted tolerance window")]
    StaleTimestamp(i64),
}
