use log::*;
use qc_common::Secret;

#[derive(Debug, Clone, Default)]
pub struct StripeConfig {
    pub api_base: String,
    pub api_version: String,
    pub secret_key: Secret<String>,
    pub webhook_secret: Secret<String>,
}

impl StripeConfig {
    pub fn new_from_env_or_default() -> Self {
        let api_base = std::env::var("QC_STRIPE_API_BASE").unwrap_or_else(|_| {
            debug!("QC_STRIPE_API_BASE not set, using https://api.stripe.com");
            "https://api.stripe.com".to_string()
        });
        let api_version = std::env::var("QC_STRIPE_API_VERSION").unwrap_or_else(|_| {
            warn!("QC_STRIPE_API_VERSION not set, using 2024-06-20 as default");
            "2024-06-20".to_string()
        });
        let secret_key = Secret::new(std::env::var("QC_STRIPE_SECRET_KEY").unwrap_or_else(|_| {
            warn!("QC_STRIPE_SECRET_KEY not set, using (probably useless) default");
            "sk_test_00000000000000".to_string()
        }));
        let webhook_secret = Secret::new(std::env::var("QC_STRIPE_WEBHOOK_SECRET").unwrap_or_else(|_| {
            warn!("QC_STRIPE_WEBHOOK_SECRET not set, using (probably useless) default");
            "whsec_00000000000000".to_string()
        }));
        Self { api_base, api_version, secret_key, webhook_secret }
    }
}
