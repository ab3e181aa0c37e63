//! Request and read-view objects for the order flow.
use chrono::{DateTime, Utc};
use qc_common::Money;
use serde::{Deserialize, Serialize};

use crate::db_types::{NewLineItem, Order, OrderId, OrderLineItem, OrderStatusType};

//--------------------------------------   NewOrderRequest     -------------------------------------------------------
/// A client's request to place an order.
///
/// The caller may send a `total_amount`, but it is never used for charging: the engine recomputes the total from the
/// line items and only the computed value reaches the payment provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewOrderRequest {
    pub items: Vec<NewLineItem>,
    #[serde(default)]
    pub total_amount: Option<Money>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub payment_method_id: Option<String>,
    #[serde(default)]
    pub receipt_email: Option<String>,
    /// When true and a payment method is supplied, the authorization is confirmed immediately.
    #[serde(default)]
    pub auto_confirm: bool,
}

//--------------------------------------   PaymentInitResult   -------------------------------------------------------
/// What the caller needs to complete any client-side confirmation step after an order has been placed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentInitResult {
    pub order_id: OrderId,
    pub authorization_id: String,
    pub client_secret: Option<String>,
    /// The provider's status for the fresh authorization, verbatim.
    pub status: String,
    pub amount_minor: i64,
    pub currency: String,
}

//--------------------------------------   OrderQueryFilter    -------------------------------------------------------
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OrderQueryFilter {
    /// Free-text match against order id, customer id and remark.
    pub search_text: Option<String>,
    pub customer_id: Option<String>,
    pub status: Option<OrderStatusType>,
}

impl OrderQueryFilter {
    pub fn with_search_text(mut self, text: String) -> Self {
        self.search_text = Some(text);
        self
    }

    pub fn with_customer_id(mut self, customer_id: String) -> Self {
        self.customer_id = Some(customer_id);
        self
    }

    pub fn with_status(mut self, status: OrderStatusType) -> Self {
        self.status = Some(status);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.search_text.is_none() && self.customer_id.is_none() && self.status.is_none()
    }
}

//--------------------------------------      Pagination       -------------------------------------------------------
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Pagination {
    pub page: u64,
    pub size: u64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self { page: 0, size: 25 }
    }
}

impl Pagination {
    pub fn new(page: u64, size: u64) -> Self {
        Self { page, size }
    }

    pub fn offset(&self) -> u64 {
        self.page * self.size
    }
}

//--------------------------------------      Read views       -------------------------------------------------------
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineItemView {
    pub item_id: String,
    pub product_id: String,
    pub qty: i64,
    pub unit_price: Money,
    pub discount: Money,
}

impl From<OrderLineItem> for LineItemView {
    fn from(item: OrderLineItem) -> Self {
        Self {
            item_id: item.item_id,
            product_id: item.product_id,
            qty: item.qty,
            unit_price: item.unit_price,
            discount: item.discount,
        }
    }
}

/// An order materialized together with its line items and current status name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderView {
    pub order_id: OrderId,
    pub customer_id: String,
    pub total_amount: Money,
    pub currency: String,
    pub remark: String,
    pub status: OrderStatusType,
    pub payment_auth_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub items: Vec<LineItemView>,
}

impl OrderView {
    pub fn new(order: Order, items: Vec<OrderLineItem>) -> Self {
        Self {
            order_id: order.order_id,
            customer_id: order.customer_id,
            total_amount: order.total_amount,
            currency: order.currency,
            remark: order.remark,
            status: order.status,
            payment_auth_id: order.payment_auth_id,
            created_at: order.created_at,
            updated_at: order.updated_at,
            items: items.into_iter().map(LineItemView::from).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderSearchResult {
    pub count: i64,
    pub orders: Vec<OrderView>,
}
