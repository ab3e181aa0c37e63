use qc_common::Money;
use thiserror::Error;

use crate::{
    db_types::{NewLineItem, NewOrder, Order, OrderId, OrderLineItem, OrderStatusType, StatusRecord},
    order_objects::{OrderQueryFilter, Pagination},
};

#[derive(Debug, Clone, Error)]
pub enum OrderDatabaseError {
    #[error("We have an internal database error (configuration/uptime etc.): {0}")]
    DatabaseError(String),
    #[error("Cannot insert order, since an order already exists for payment authorization {0}")]
    DuplicateAuthorization(String),
    #[error("More than one order references payment authorization {0}. The store is in a corrupted state.")]
    AmbiguousAuthorization(String),
    #[error("The requested order {0} does not exist")]
    OrderNotFound(OrderId),
    #[error("The order status {0} is not present in the status registry")]
    StatusNotFound(String),
}

impl From<sqlx::Error> for OrderDatabaseError {
    fn from(e: sqlx::Error) -> Self {
        OrderDatabaseError::DatabaseError(e.to_string())
    }
}

/// Outcome of a guarded status transition.
#[derive(Debug, Clone)]
pub enum StatusTransition {
    /// The order moved to the requested status.
    Applied(Order),
    /// The guard rejected the order's current status; nothing was written. Carries the untouched order.
    Refused(Order),
}

/// Persistence contract for orders and their line items.
///
/// Every status-mutating method executes as a single atomic read-modify-write transaction scoped to one order row,
/// so that a webhook-driven transition and a client-driven confirmation racing on the same order cannot interleave
/// into an inconsistent state.
#[allow(async_fn_in_trait)]
pub trait OrderManagement {
    /// Stores the order and all of its line items in a single atomic transaction.
    ///
    /// Fails with [`OrderDatabaseError::DuplicateAuthorization`] if an order already references the same payment
    /// authorization.
    async fn insert_order(&self, order: NewOrder, items: Vec<NewLineItem>) -> Result<Order, OrderDatabaseError>;

    async fn fetch_order_by_id(&self, order_id: &OrderId) -> Result<Option<Order>, OrderDatabaseError>;

    /// Resolves the order referencing the given payment authorization. At most one order may reference a given
    /// authorization id; more than one match is reported as [`OrderDatabaseError::AmbiguousAuthorization`].
    async fn fetch_order_by_auth_id(&self, auth_id: &str) -> Result<Option<Order>, OrderDatabaseError>;

    async fn fetch_line_items_for_order(&self, order_id: &OrderId) -> Result<Vec<OrderLineItem>, OrderDatabaseError>;

    /// Moves the order to `new_status`, optionally appending an entry to the remark trail, as one atomic
    /// read-modify-write transaction. Returns the updated order.
    async fn transition_status(
        &self,
        order_id: &OrderId,
        new_status: OrderStatusType,
        remark: Option<String>,
    ) -> Result<Order, OrderDatabaseError>;

    /// As [`OrderManagement::transition_status`], but the write only happens when the order's current status
    /// satisfies `accept_from`. The status is re-read inside the write transaction itself, so a transition that
    /// commits between the caller's last read and this call cannot slip past the guard.
    async fn transition_status_checked(
        &self,
        order_id: &OrderId,
        new_status: OrderStatusType,
        remark: Option<String>,
        accept_from: fn(OrderStatusType) -> bool,
    ) -> Result<StatusTransition, OrderDatabaseError>;

    /// Appends an entry to the order's `|`-delimited remark trail.
    async fn append_remark(&self, order_id: &OrderId, remark: &str) -> Result<Order, OrderDatabaseError>;

    /// Re-dates the order and replaces its total with a freshly recomputed value.
    async fn refresh_order(&self, order_id: &OrderId, new_total: Money) -> Result<Order, OrderDatabaseError>;

    async fn delete_order(&self, order_id: &OrderId) -> Result<(), OrderDatabaseError>;

    async fn search_orders(
        &self,
        query: OrderQueryFilter,
        pagination: Pagination,
    ) -> Result<Vec<Order>, OrderDatabaseError>;

    async fn search_count(&self, query: OrderQueryFilter) -> Result<i64, OrderDatabaseError>;
}

/// A backend that provides both order persistence and the status registry. Implemented automatically; useful as a
/// single bound where both capabilities are needed.
pub trait OrderStore: OrderManagement + StatusManagement {}

impl<T: OrderManagement + StatusManagement> OrderStore for T {}

/// Persistence contract for the status registry.
#[allow(async_fn_in_trait)]
pub trait StatusManagement {
    /// Idempotently seeds the registry with the given statuses. Guarded by the uniqueness constraint on status
    /// names; seeding an already-seeded registry changes nothing and reports no error. Returns the number of rows
    /// inserted.
    async fn seed_statuses_if_empty(&self, names: &[OrderStatusType]) -> Result<u64, OrderDatabaseError>;

    async fn find_status_by_name(&self, name: &str) -> Result<Option<StatusRecord>, OrderDatabaseError>;
}
