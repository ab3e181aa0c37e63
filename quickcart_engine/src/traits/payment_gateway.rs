use std::{fmt::Display, str::FromStr};

use qc_common::{Money, MoneyConversionError};
use thiserror::Error;

//--------------------------------------    ProviderStatus     -------------------------------------------------------
/// The payment provider's view of an authorization's state.
///
/// The set is closed with an explicit catch-all, so a provider status the engine has never seen still parses and
/// still maps onto an order status (see [`crate::db_types::OrderStatusType::from_provider`]).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderStatus {
    RequiresPaymentMethod,
    RequiresAction,
    Processing,
    Succeeded,
    Canceled,
    Failed,
    Other(String),
}

impl FromStr for ProviderStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let status = match s {
            "requires_payment_method" => Self::RequiresPaymentMethod,
            "requires_action" => Self::RequiresAction,
            "processing" => Self::Processing,
            "succeeded" => Self::Succeeded,
            "canceled" => Self::Canceled,
            "failed" => Self::Failed,
            other => Self::Other(other.to_string()),
        };
        Ok(status)
    }
}

impl Display for ProviderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RequiresPaymentMethod => write!(f, "requires_payment_method"),
            Self::RequiresAction => write!(f, "requires_action"),
            Self::Processing => write!(f, "processing"),
            Self::Succeeded => write!(f, "succeeded"),
            Self::Canceled => write!(f, "canceled"),
            Self::Failed => write!(f, "failed"),
            Self::Other(s) => write!(f, "{s}"),
        }
    }
}

//--------------------------------------      NewCharge        -------------------------------------------------------
/// The parameters for a new payment authorization.
#[derive(Debug, Clone)]
pub struct NewCharge {
    /// The amount in major units. Converted to the provider's minor-unit representation at the gateway boundary.
    pub amount: Money,
    pub currency: String,
    pub payment_method_id: Option<String>,
    pub receipt_email: Option<String>,
    /// If true and a payment method is attached, the authorization is created already confirmed.
    pub auto_confirm: bool,
}

impl NewCharge {
    pub fn new(amount: Money, currency: String) -> Self {
        Self { amount, currency, payment_method_id: None, receipt_email: None, auto_confirm: false }
    }

    pub fn with_payment_method(mut self, payment_method_id: String, auto_confirm: bool) -> Self {
        self.payment_method_id = Some(payment_method_id);
        self.auto_confirm = auto_confirm;
        self
    }

    pub fn with_receipt_email(mut self, email: String) -> Self {
        self.receipt_email = Some(email);
        self
    }
}

//--------------------------------------  PaymentAuthorization -------------------------------------------------------
/// The engine's projection of the provider's record of an attempted charge.
///
/// The provider is the source of truth for payment state; the order's status is a projection of this plus local
/// business rules.
#[derive(Debug, Clone)]
pub struct PaymentAuthorization {
    pub id: String,
    pub client_secret: Option<String>,
    pub status: ProviderStatus,
    /// Amount in the provider's minor-unit representation (e.g. cents).
    pub amount_minor: i64,
    pub currency: String,
    pub payment_method_id: Option<String>,
}

//--------------------------------------     PaymentEvent      -------------------------------------------------------
/// A verified, parsed webhook event from the payment provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentEventType {
    PaymentSucceeded,
    PaymentFailed,
    PaymentCanceled,
    /// An event type the engine does not act on. Accepted and ignored for forward compatibility.
    Other(String),
}

#[derive(Debug, Clone)]
pub struct PaymentEvent {
    pub event_type: PaymentEventType,
    /// The authorization the event refers to.
    pub authorization_id: String,
    /// The provider's failure message, where one was supplied.
    pub reason: Option<String>,
}

//--------------------------------------     GatewayError      -------------------------------------------------------
/// Failure of a gateway call. A `GatewayError` is never a payment outcome: when in doubt (timeouts in particular)
/// the true state of the authorization must be re-queried, never assumed.
#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    #[error("Payment provider call failed. {0}")]
    ProviderError(String),
    #[error("Payment provider call timed out. The outcome is unknown and must be re-queried. {0}")]
    Timeout(String),
    #[error("Webhook signature verification failed")]
    SignatureInvalid,
    #[error("Webhook payload could not be parsed. {0}")]
    MalformedPayload(String),
    #[error("{0}")]
    AmountConversion(#[from] MoneyConversionError),
}

//--------------------------------------     PaymentGateway    -------------------------------------------------------
/// The capability set the orchestrator needs from a payment provider.
///
/// Implementations must never retry failed calls internally; retry policy belongs to the caller. Signature
/// verification in [`PaymentGateway::verify_and_parse_event`] is mandatory before any field of the payload is
/// trusted.
#[allow(async_fn_in_trait)]
pub trait PaymentGateway: Send + Sync {
    /// Creates a payment authorization for the given charge. The amount is converted to the provider's minor-unit
    /// integer representation using banker's rounding to the nearest cent.
    async fn create_authorization(&self, charge: NewCharge) -> Result<PaymentAuthorization, GatewayError>;

    /// Confirms the authorization. Idempotent from the caller's perspective: confirming an already-confirmed
    /// authorization returns its current state rather than erroring, where the provider allows it.
    async fn confirm(&self, authorization_id: &str) -> Result<PaymentAuthorization, GatewayError>;

    async fn cancel(&self, authorization_id: &str) -> Result<PaymentAuthorization, GatewayError>;

    async fn get_status(&self, authorization_id: &str) -> Result<PaymentAuthorization, GatewayError>;

    /// Verifies the webhook signature and parses the payload. A failed verification is a terminal rejection.
    async fn verify_and_parse_event(&self, payload: &[u8], signature_header: &str)
        -> Result<PaymentEvent, GatewayError>;
}
