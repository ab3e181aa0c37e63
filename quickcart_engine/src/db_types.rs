use std::{
    borrow::Cow,
    fmt::Display,
    str::FromStr,
};

use chrono::{DateTime, Utc};
use qc_common::Money;
use serde::{Deserialize, Serialize};
use sqlx::{
    encode::IsNull,
    error::BoxDynError,
    sqlite::{SqliteArgumentValue, SqliteTypeInfo, SqliteValueRef},
    Decode,
    Encode,
    FromRow,
    Sqlite,
    Type,
};
use thiserror::Error;

use crate::traits::ProviderStatus;

//--------------------------------------   OrderStatusType     -------------------------------------------------------
/// The closed set of states an order can be in.
///
/// The set of valid names is known at build time; there is no dynamic status creation path. The canonical
/// SCREAMING_SNAKE_CASE names are what get seeded into the status registry and stored against each order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatusType {
    /// The order has been created and a payment authorization exists, but no payment outcome is known yet.
    Pending,
    /// The payment provider is still processing the charge.
    PaymentProcessing,
    /// The provider requires a further client-side action (e.g. 3DS) before the charge can complete.
    PaymentActionRequired,
    /// The payment succeeded and the order is confirmed.
    Confirmed,
    /// The payment failed, was canceled, or landed in an unrecognised provider state.
    PaymentFailed,
    /// The order was rejected by the customer.
    RejectedByUser,
    /// The order was rejected by an administrator.
    RejectedByAdmin,
    /// The order has been fulfilled. Reached only by an explicit downstream fulfillment action.
    Completed,
}

impl OrderStatusType {
    /// Every status in the registry, in seeding order.
    pub const ALL: [OrderStatusType; 8] = [
        OrderStatusType::Pending,
        OrderStatusType::PaymentProcessing,
        OrderStatusType::PaymentActionRequired,
        OrderStatusType::Confirmed,
        OrderStatusType::PaymentFailed,
        OrderStatusType::RejectedByUser,
        OrderStatusType::RejectedByAdmin,
        OrderStatusType::Completed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatusType::Pending => "PENDING",
            OrderStatusType::PaymentProcessing => "PAYMENT_PROCESSING",
            OrderStatusType::PaymentActionRequired => "PAYMENT_ACTION_REQUIRED",
            OrderStatusType::Confirmed => "CONFIRMED",
            OrderStatusType::PaymentFailed => "PAYMENT_FAILED",
            OrderStatusType::RejectedByUser => "REJECTED_BY_USER",
            OrderStatusType::RejectedByAdmin => "REJECTED_BY_ADMIN",
            OrderStatusType::Completed => "COMPLETED",
        }
    }

    /// The total mapping from a provider payment status onto an order status. Adding a provider status forces a
    /// compile-time-visible decision here.
    pub fn from_provider(status: &ProviderStatus) -> Self {
        match status {
            ProviderStatus::Succeeded => OrderStatusType::Confirmed,
            ProviderStatus::RequiresAction => OrderStatusType::PaymentActionRequired,
            ProviderStatus::Processing => OrderStatusType::PaymentProcessing,
            ProviderStatus::RequiresPaymentMethod |
            ProviderStatus::Canceled |
            ProviderStatus::Failed |
            ProviderStatus::Other(_) => OrderStatusType::PaymentFailed,
        }
    }

    /// Terminal states admit no further payment-driven transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderStatusType::Confirmed |
                OrderStatusType::PaymentFailed |
                OrderStatusType::RejectedByUser |
                OrderStatusType::RejectedByAdmin |
                OrderStatusType::Completed
        )
    }

    /// True for states in which the payment has been captured or committed.
    pub fn is_financially_committed(&self) -> bool {
        matches!(self, OrderStatusType::Confirmed | OrderStatusType::Completed)
    }
}

impl Display for OrderStatusType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Error)]
#[error("Invalid order status: {0}")]
pub struct ConversionError(String);

impl FromStr for OrderStatusType {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(Self::Pending),
            "PAYMENT_PROCESSING" => Ok(Self::PaymentProcessing),
            "PAYMENT_ACTION_REQUIRED" => Ok(Self::PaymentActionRequired),
            "CONFIRMED" => Ok(Self::Confirmed),
            "PAYMENT_FAILED" => Ok(Self::PaymentFailed),
            "REJECTED_BY_USER" => Ok(Self::RejectedByUser),
            "REJECTED_BY_ADMIN" => Ok(Self::RejectedByAdmin),
            "COMPLETED" => Ok(Self::Completed),
            s => Err(ConversionError(s.to_string())),
        }
    }
}

// Statuses are stored by their canonical registry name.
impl Type<Sqlite> for OrderStatusType {
    fn type_info() -> SqliteTypeInfo {
        <&str as Type<Sqlite>>::type_info()
    }
}

impl<'q> Encode<'q, Sqlite> for OrderStatusType {
    fn encode_by_ref(&self, buf: &mut Vec<SqliteArgumentValue<'q>>) -> IsNull {
        buf.push(SqliteArgumentValue::Text(Cow::Borrowed(self.as_str())));
        IsNull::No
    }
}

impl<'r> Decode<'r, Sqlite> for OrderStatusType {
    fn decode(value: SqliteValueRef<'r>) -> Result<Self, BoxDynError> {
        let s = <&str as Decode<Sqlite>>::decode(value)?;
        Ok(s.parse()?)
    }
}

//--------------------------------------     StatusRecord      -------------------------------------------------------
/// A row in the status registry. The registry is seeded exactly once; status names carry a uniqueness constraint.
#[derive(Debug, Clone, FromRow)]
pub struct StatusRecord {
    pub id: i64,
    pub name: OrderStatusType,
}

//--------------------------------------        OrderId        -------------------------------------------------------
/// An opaque, globally unique order identifier, generated at creation and never reused.
#[derive(Debug, Clone, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct OrderId(pub String);

impl FromStr for OrderId {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_string()))
    }
}

impl From<String> for OrderId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl OrderId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

//--------------------------------------        Order          -------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,
    pub order_id: OrderId,
    pub customer_id: String,
    /// Append-only audit trail, `|`-delimited.
    pub remark: String,
    /// The authoritative total. Always server-recomputed; never taken from the caller.
    pub total_amount: Money,
    pub currency: String,
    /// The external payment-authorization identifier. Set once at creation, immutable thereafter.
    pub payment_auth_id: String,
    pub status: OrderStatusType,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

//--------------------------------------       NewOrder        -------------------------------------------------------
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub order_id: OrderId,
    pub customer_id: String,
    /// The server-recomputed total for the order.
    pub total_amount: Money,
    pub currency: String,
    /// The payment authorization created for this order before it was persisted.
    pub payment_auth_id: String,
    pub created_at: DateTime<Utc>,
}

impl NewOrder {
    pub fn new(order_id: OrderId, customer_id: String, total_amount: Money, payment_auth_id: String) -> Self {
        Self {
            order_id,
            customer_id,
            total_amount,
            currency: qc_common::DEFAULT_CURRENCY_CODE.to_string(),
            payment_auth_id,
            created_at: Utc::now(),
        }
    }

    pub fn with_currency(mut self, currency: String) -> Self {
        self.currency = currency;
        self
    }
}

//--------------------------------------     OrderLineItem     -------------------------------------------------------
/// A line item, owned exclusively by its order. Created together with the order and immutable afterwards.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct OrderLineItem {
    pub id: i64,
    pub item_id: String,
    pub order_id: OrderId,
    pub product_id: String,
    pub qty: i64,
    pub unit_price: Money,
    pub discount: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewLineItem {
    pub product_id: String,
    pub qty: i64,
    pub unit_price: Money,
    #[serde(default)]
    pub discount: Money,
}
