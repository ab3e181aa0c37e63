//! Stripe webhook signature verification.
//!
//! The `Stripe-Signature` header carries a unix timestamp and one or more HMAC-SHA256 signatures over
//! `"{timestamp}.{payload}"`. The signature must be checked before any field of the payload is trusted, and the
//! timestamp is bounded to reject replayed deliveries.
use chrono::Utc;
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::{data_objects::WebhookEvent, StripeApiError};

type HmacSha256 = Hmac<Sha256>;

/// Stripe's recommended replay tolerance.
const TOLERANCE_SECONDS: i64 = 300;

struct SignatureHeader {
    timestamp: i64,
    signatures: Vec<Vec<u8>>,
}

fn parse_signature_header(header: &str) -> Result<SignatureHeader, StripeApiError> {
    let mut timestamp = None;
    let mut signatures = Vec::new();
    for part in header.split(',') {
        let Some((key, value)) = part.trim().split_once('=') else {
            return Err(StripeApiError::SignatureFormat(format!("missing '=' in element {part:?}")));
        };
        match key {
            "t" => {
                let t = value
                    .parse::<i64>()
                    .map_err(|_| StripeApiError::SignatureFormat(format!("invalid timestamp {value:?}")))?;
                timestamp = Some(t);
            },
            "v1" => {
                let sig = hex::decode(value)
                    .map_err(|_| StripeApiError::SignatureFormat("signature is not valid hex".to_string()))?;
                signatures.push(sig);
            },
            // v0 is Stripe's test-mode scheme and anything else is a future addition.
            _ => {},
        }
    }
    let timestamp = timestamp.ok_or_else(|| StripeApiError::SignatureFormat("no timestamp element".to_string()))?;
    if signatures.is_empty() {
        return Err(StripeApiError::SignatureFormat("no v1 signature element".to_string()));
    }
    Ok(SignatureHeader { timestamp, signatures })
}

fn verify_at(payload: &[u8], header: &str, secret: &str, now: i64) -> Result<(), StripeApiError> {
    let header = parse_signature_header(header)?;
    if (now - header.timestamp).abs() > TOLERANCE_SECONDS {
        return Err(StripeApiError::StaleTimestamp(header.timestamp));
    }
    let signed_payload = [format!("{}.", header.timestamp).as_bytes(), payload].concat();
    // Any one matching signature is sufficient; Stripe sends several during secret rotation.
    let verified = header.signatures.iter().any(|sig| {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts keys of any length");
        mac.update(&signed_payload);
        mac.verify_slice(sig).is_ok()
    });
    if verified {
        Ok(())
    } else {
        Err(StripeApiError::SignatureVerification)
    }
}

/// Verifies the `Stripe-Signature` header against the raw payload and, only then, parses the event.
pub fn verify_and_parse_webhook(
    payload: &[u8],
    signature_header: &str,
    secret: &str,
) -> Result<WebhookEvent, StripeApiError> {
    verify_at(payload, signature_header, secret, Utc::now().timestamp())?;
    serde_json::from_slice(payload).map_err(|e| StripeApiError::JsonError(e.to_string()))
}
