//! Trait seams for the order engine.
//!
//! Backends implement [`OrderManagement`] and [`StatusManagement`]; payment providers implement [`PaymentGateway`];
//! token verifiers implement [`IdentityResolver`]. The orchestrator is generic over all of these, so the core flow
//! can be exercised against mocks in tests and against SQLite + a real provider in production.
mod identity;
mod order_management;
mod payment_gateway;

pub use identity::{AuthError, IdentityResolver};
pub use order_management::{OrderDatabaseError, OrderManagement, OrderStore, StatusManagement, StatusTransition};
pub use payment_gateway::{
    GatewayError,
    NewCharge,
    PaymentAuthorization,
    PaymentEvent,
    PaymentEventType,
    PaymentGateway,
    ProviderStatus,
};
