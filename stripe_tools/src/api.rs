use std::{sync::Arc, time::Duration};

use log::*;
use reqwest::{
    header::{HeaderMap, HeaderValue},
    Client,
    Method,
};
use serde::de::DeserializeOwned;

use crate::{
    config::StripeConfig,
    data_objects::{PaymentIntent, PaymentIntentRequest},
    StripeApiError,
};

/// A minimal Stripe client. Calls are never retried internally; retry policy belongs to the caller, since a repeated
/// POST against `/v1/payment_intents` creates a second intent.
#[derive(Clone)]
pub struct StripeApi {
    config: StripeConfig,
    client: Arc<Client>,
}

impl StripeApi {
    pub fn new(config: StripeConfig) -> Result<Self, StripeApiError> {
        let mut headers = HeaderMap::with_capacity(2);
        let bearer = format!("Bearer {}", config.secret_key.reveal());
        let mut val = HeaderValue::from_str(&bearer).map_err(|e| StripeApiError::Initialization(e.to_string()))?;
        val.set_sensitive(true);
        headers.insert("Authorization", val);
        let version =
            HeaderValue::from_str(&config.api_version).map_err(|e| StripeApiError::Initialization(e.to_string()))?;
        headers.insert("Stripe-Version", version);
        // A hung call must not tie up a worker. A timed-out call has an unknown outcome and gets re-queried.
        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| StripeApiError::Initialization(e.to_string()))?;
        Ok(Self { config, client: Arc::new(client) })
    }

    pub fn webhook_secret(&self) -> &str {
        self.config.webhook_secret.reveal()
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}/v1{path}", self.config.api_base)
    }

    /// Stripe's API is form-encoded on the way in and JSON on the way out.
    async fn form_query<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        form: &[(&str, String)],
    ) -> Result<T, StripeApiError> {
        let url = self.url(path);
        trace!("Sending Stripe query: {method} {url}");
        let mut req = self.client.request(method, url);
        if !form.is_empty() {
            req = req.form(form);
        }
        let response = req.send().await.map_err(|e| StripeApiError::RestResponseError(e.to_string()))?;
        if response.status().is_success() {
            trace!("Stripe query successful. {}", response.status());
            response.json::<T>().await.map_err(|e| StripeApiError::JsonError(e.to_string()))
        } else {
            let status = response.status().as_u16();
            let message = response.text().await.map_err(|e| StripeApiError::RestResponseError(e.to_string()))?;
            Err(StripeApiError::QueryError { status, message })
        }
    }

    pub async fn create_payment_intent(&self, request: PaymentIntentRequest) -> Result<PaymentIntent, StripeApiError> {
        let mut form: Vec<(&str, String)> =
            vec![("amount", request.amount.to_string()), ("currency", request.currency.clone())];
        if let Some(pm) = request.payment_method.as_ref() {
            form.push(("payment_method", pm.clone()));
            if request.confirm {
                form.push(("confirm", "true".to_string()));
            }
        }
        if let Some(email) = request.receipt_email.as_ref() {
            form.push(("receipt_email", email.clone()));
        }
        debug!("Creating payment intent for {} {}", request.amount, request.currency);
        let intent = self.form_query::<PaymentIntent>(Method::POST, "/payment_intents", &form).await?;
        info!("Created payment intent [{}] with status {}", intent.id, intent.status.as_str());
        Ok(intent)
    }

    pub async fn confirm_payment_intent(&self, id: &str) -> Result<PaymentIntent, StripeApiError> {
        debug!("Confirming payment intent [{id}]");
        let path = format!("/payment_intents/{id}/confirm");
        let intent = self.form_query::<PaymentIntent>(Method::POST, &path, &[]).await?;
        info!("Payment intent [{id}] is now {}", intent.status.as_str());
        Ok(intent)
    }

    pub async fn cancel_payment_intent(&self, id: &str) -> Result<PaymentIntent, StripeApiError> {
        debug!("Cancelling payment intent [{id}]");
        let path = format!("/payment_intents/{id}/cancel");
        let intent = self.form_query::<PaymentIntent>(Method::POST, &path, &[]).await?;
        info!("Payment intent [{id}] cancelled");
        Ok(intent)
    }

    pub async fn get_payment_intent(&self, id: &str) -> Result<PaymentIntent, StripeApiError> {
        let path = format!("/payment_intents/{id}");
        self.form_query::<PaymentIntent>(Method::GET, &path, &[]).await
    }
}

#[cfg(test)]
mod test {
    use crate::data_objects::{IntentStatus, PaymentIntent};

    #[test]
    fn deserialize_payment_intent() {
        let json = r#"{
            "id": "pi_3MtwBwLkdIwHu7ix28a3tqPa",
            "object": "payment_intent",
            "amount": 1300,
            "client_secret": "pi_3MtwBwLkdIwHu7ix28a3tqPa_secret_YrKJUKribcBjcG8HVhfZluoGH",
            "currency": "usd",
            "status": "requires_payment_method"
        }"#;
        let intent: PaymentIntent = serde_json::from_str(json).unwrap();
        assert_eq!(intent.id, "pi_3MtwBwLkdIwHu7ix28a3tqPa");
        assert_eq!(intent.amount, 1300);
        assert_eq!(intent.status, IntentStatus::RequiresPaymentMethod);
        assert!(intent.client_secret.is_some());
        assert!(intent.payment_method.is_none());
    }

    #[test]
    fn unrecognised_status_does_not_fail_deserialization() {
        let json = r#"{"id": "pi_1", "amount": 100, "currency": "usd", "status": "some_future_state"}"#;
        let intent: PaymentIntent = serde_json::from_str(json).unwrap();
        assert_eq!(intent.status, IntentStatus::Unknown);
    }
}
