//! QuickCart Order Engine
//!
//! The order engine contains the core logic for placing customer orders and reconciling each order's lifecycle with
//! the outcome of an external payment transaction. It is provider- and transport-agnostic.
//!
//! The library is divided into three main sections:
//! 1. The domain types ([`mod@db_types`]) and read views ([`mod@order_objects`]).
//! 2. The trait seams ([`mod@traits`]): the order/status repositories, the payment gateway capability set, and the
//!    caller identity resolver. Specific backends and providers implement these traits in order to drive the engine.
//! 3. The orchestrator ([`OrderFlowApi`]), which validates requests, computes authoritative totals, and drives each
//!    order through its status transitions in response to synchronous calls and asynchronous webhook events.
//!
//! A SQLite backend ([`SqliteDatabase`]) is provided behind the `sqlite` feature (enabled by default).
pub mod db_types;
pub mod helpers;
pub mod order_objects;
pub mod traits;

mod order_flow;

#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDatabase;

pub use order_flow::{OrderFlowApi, OrderFlowError, WebhookOutcome};
