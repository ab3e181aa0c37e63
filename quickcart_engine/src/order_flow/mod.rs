mod api;
mod errors;

#[cfg(test)]
mod tests;

pub use api::{OrderFlowApi, WebhookOutcome};
pub use errors::OrderFlowError;
