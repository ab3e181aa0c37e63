//! Adapts the Stripe client to the engine's payment gateway seam.
//!
//! The engine speaks in provider-agnostic terms (authorizations, provider statuses, payment events); this module
//! translates those to and from Stripe's payment-intent vocabulary.
use log::*;
use quickcart_engine::traits::{
    GatewayError,
    NewCharge,
    PaymentAuthorization,
    PaymentEvent,
    PaymentEventType,
    PaymentGateway,
    ProviderStatus,
};
use stripe_tools::{verify_and_parse_webhook, IntentStatus, PaymentIntent, PaymentIntentRequest, StripeApi, StripeApiError, WebhookEvent};

#[derive(Clone)]
pub struct StripeGateway {
    api: StripeApi,
}

impl StripeGateway {
    pub fn new(api: StripeApi) -> Self {
        Self { api }
    }
}

fn provider_status(status: IntentStatus) -> ProviderStatus {
    match status {
        IntentStatus::RequiresPaymentMethod => ProviderStatus::RequiresPaymentMethod,
        IntentStatus::RequiresAction => ProviderStatus::RequiresAction,
        IntentStatus::Processing => ProviderStatus::Processing,
        IntentStatus::Succeeded => ProviderStatus::Succeeded,
        IntentStatus::Canceled => ProviderStatus::Canceled,
        other => ProviderStatus::Other(other.as_str().to_string()),
    }
}

fn authorization_from(intent: PaymentIntent) -> PaymentAuthorization {
    PaymentAuthorization {
        id: intent.id,
        client_secret: intent.client_secret,
        status: provider_status(intent.status),
        amount_minor: intent.amount,
        currency: intent.currency,
        payment_method_id: intent.payment_method,
    }
}

fn event_from(event: WebhookEvent) -> PaymentEvent {
    let event_type = match event.event_type.as_str() {
        "payment_intent.succeeded" => PaymentEventType::PaymentSucceeded,
        "payment_intent.payment_failed" => PaymentEventType::PaymentFailed,
        "payment_intent.canceled" => PaymentEventType::PaymentCanceled,
        other => PaymentEventType::Other(other.to_string()),
    };
    let intent = event.data.object;
    let reason = intent.last_payment_error.and_then(|e| e.message.or(e.code));
    PaymentEvent { event_type, authorization_id: intent.id, reason }
}

/// API-call failures. A transport-level failure leaves the outcome unknown, so it maps to `Timeout` rather than a
/// definitive provider error.
fn map_call_error(e: StripeApiError) -> GatewayError {
    match e {
        StripeApiError::RestResponseError(msg) => GatewayError::Timeout(msg),
        StripeApiError::QueryError { status, message } => {
            GatewayError::ProviderError(format!("Stripe returned {status}. {message}"))
        },
        other => GatewayError::ProviderError(other.to_string()),
    }
}

fn map_webhook_error(e: StripeApiError) -> GatewayError {
    match e {
        StripeApiError::SignatureVerification | StripeApiError::StaleTimestamp(_) => GatewayError::SignatureInvalid,
        StripeApiError::SignatureFormat(msg) => GatewayError::MalformedPayload(msg),
        StripeApiError::JsonError(msg) => GatewayError::MalformedPayload(msg),
        other => GatewayError::ProviderError(other.to_string()),
    }
}

impl PaymentGateway for StripeGateway {
    async fn create_authorization(&self, charge: NewCharge) -> Result<PaymentAuthorization, GatewayError> {
        let amount = charge.amount.to_minor_units()?;
        let request = PaymentIntentRequest {
            amount,
            currency: charge.currency,
            payment_method: charge.payment_method_id,
            receipt_email: charge.receipt_email,
            confirm: charge.auto_confirm,
        };
        let intent = self.api.create_payment_intent(request).await.map_err(map_call_error)?;
        debug!("🛍️️ Payment intent [{}] created", intent.id);
        Ok(authorization_from(intent))
    }

    async fn confirm(&self, authorization_id: &str) -> Result<PaymentAuthorization, GatewayError> {
        let intent = self.api.confirm_payment_intent(authorization_id).await.map_err(map_call_error)?;
        Ok(authorization_from(intent))
    }

    async fn cancel(&self, authorization_id: &str) -> Result<PaymentAuthorization, GatewayError> {
        let intent = self.api.cancel_payment_intent(authorization_id).await.map_err(map_call_error)?;
        Ok(authorization_from(intent))
    }

    async fn get_status(&self, authorization_id: &str) -> Result<PaymentAuthorization, GatewayError> {
        let intent = self.api.get_payment_intent(authorization_id).await.map_err(map_call_error)?;
        Ok(authorization_from(intent))
    }

    async fn verify_and_parse_event(
        &self,
        payload: &[u8],
        signature_header: &str,
    ) -> Result<PaymentEvent, GatewayError> {
        let event = verify_and_parse_webhook(payload, signature_header, self.api.webhook_secret())
            .map_err(map_webhook_error)?;
        trace!("🛍️️ Verified webhook event [{}] of type {}", event.id, event.event_type);
        Ok(event_from(event))
    }
}

#[cfg(test)]
mod test {
    use quickcart_engine::traits::{PaymentEventType, ProviderStatus};
    use stripe_tools::{IntentStatus, WebhookEvent};

    use super::{event_from, provider_status};

    #[test]
    fn intent_statuses_map_onto_provider_statuses() {
        assert_eq!(provider_status(IntentStatus::Succeeded), ProviderStatus::Succeeded);
        assert_eq!(provider_status(IntentStatus::RequiresAction), ProviderStatus::RequiresAction);
        assert_eq!(provider_status(IntentStatus::Processing), ProviderStatus::Processing);
        assert_eq!(provider_status(IntentStatus::Canceled), ProviderStatus::Canceled);
        assert_eq!(
            provider_status(IntentStatus::RequiresConfirmation),
            ProviderStatus::Other("requires_confirmation".to_string())
        );
    }

    #[test]
    fn webhook_events_carry_the_intent_id_and_failure_reason() {
        let json = r#"{
            "id": "evt_1",
            "type": "payment_intent.payment_failed",
            "data": {
                "object": {
                    "id": "pi_1",
                    "amount": 1300,
                    "currency": "usd",
                    "status": "requires_payment_method",
                    "last_payment_error": { "code": "card_declined", "message": "Your card was declined." }
                }
            }
        }"#;
        let event: WebhookEvent = serde_json::from_str(json).unwrap();
        let event = event_from(event);
        assert_eq!(event.event_type, PaymentEventType::PaymentFailed);
        assert_eq!(event.authorization_id, "pi_1");
        assert_eq!(event.reason.as_deref(), Some("Your card was declined."));
    }

    #[test]
    fn unknown_event_types_pass_through() {
        let json = r#"{
            "id": "evt_2",
            "type": "payment_intent.created",
            "data": { "object": { "id": "pi_2", "amount": 100, "currency": "usd", "status": "processing" } }
        }"#;
        let event: WebhookEvent = serde_json::from_str(json).unwrap();
        let event = event_from(event);
        assert_eq!(event.event_type, PaymentEventType::Other("payment_intent.created".to_string()));
    }
}
