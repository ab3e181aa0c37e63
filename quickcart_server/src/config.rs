use std::env;

use log::*;
use qc_common::Secret;
use stripe_tools::StripeConfig;

const DEFAULT_QC_HOST: &str = "127.0.0.1";
const DEFAULT_QC_PORT: u16 = 8360;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub auth: AuthConfig,
    /// Stripe API configuration.
    pub stripe: StripeConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_QC_HOST.to_string(),
            port: DEFAULT_QC_PORT,
            database_url: String::default(),
            auth: AuthConfig::default(),
            stripe: StripeConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("QC_HOST").ok().unwrap_or_else(|| DEFAULT_QC_HOST.into());
        let port = env::var("QC_PORT")
            .map(|s| {
                s.parse::<u16>().unwrap_or_else(|e| {
                    error!("🪛️ {s} is not a valid port for QC_PORT. {e} Using the default, {DEFAULT_QC_PORT}, instead.");
                    DEFAULT_QC_PORT
                })
            })
            .ok()
            .unwrap_or(DEFAULT_QC_PORT);
        let database_url = env::var("QC_DATABASE_URL").unwrap_or_else(|_| {
            warn!("🪛️ QC_DATABASE_URL is not set. Using the default, sqlite://data/quickcart.db, instead.");
            "sqlite://data/quickcart.db".to_string()
        });
        let auth = AuthConfig::from_env_or_default();
        let stripe = StripeConfig::new_from_env_or_default();
        Self { host, port, database_url, auth, stripe }
    }
}

/// Configuration for issuing and verifying customer access tokens.
#[derive(Clone, Debug)]
pub struct AuthConfig {
    pub jwt_secret: Secret<String>,
    /// Lifetime of issued tokens, in seconds.
    pub token_expiry_secs: i64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self { jwt_secret: Secret::new(String::default()), token_expiry_secs: 3600 }
    }
}

impl AuthConfig {
    pub fn from_env_or_default() -> Self {
        let jwt_secret = match env::var("QC_JWT_SECRET") {
            Ok(s) => Secret::new(s),
            Err(_) => {
                warn!(
                    "🪛️ QC_JWT_SECRET is not set. A random secret will be generated for this run, so all tokens \
                     become invalid when the server restarts."
                );
                let secret = (0..4).map(|_| format!("{:016x}", rand::random::<u64>())).collect::<String>();
                Secret::new(secret)
            },
        };
        let token_expiry_secs = env::var("QC_JWT_EXPIRY_SECS").ok().and_then(|s| s.parse::<i64>().ok()).unwrap_or(3600);
        Self { jwt_secret, token_expiry_secs }
    }
}
