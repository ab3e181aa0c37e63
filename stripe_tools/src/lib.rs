//! A thin client for the parts of the Stripe API that the QuickCart order service uses: payment intents and webhook
//! signature verification. It knows nothing about orders; the engine drives it through its payment gateway seam.
mod api;
mod config;
mod error;
mod webhook;

mod data_objects;

pub use api::StripeApi;
pub use config::StripeConfig;
pub use data_objects::{EventData, IntentStatus, LastPaymentError, PaymentIntent, PaymentIntentRequest, WebhookEvent};
pub use error::StripeApiError;
pub use webhook::verify_and_parse_webhook;
