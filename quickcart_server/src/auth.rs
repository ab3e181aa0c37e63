//! Customer access tokens.
//!
//! Tokens are HS256 JWTs carrying the customer id in `sub`. The server both issues them (so a storefront can obtain
//! a session) and verifies them when orders are placed; the engine consumes the verified identity through its
//! [`IdentityResolver`] seam.
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use quickcart_engine::traits::{AuthError, IdentityResolver};
use serde::{Deserialize, Serialize};

use crate::{config::AuthConfig, errors::ServerError};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtClaims {
    /// The customer id.
    pub sub: String,
    pub exp: usize,
}

#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    token_expiry: Duration,
}

impl JwtService {
    pub fn new(config: &AuthConfig) -> Self {
        let secret = config.jwt_secret.reveal().as_bytes();
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            token_expiry: Duration::seconds(config.token_expiry_secs),
        }
    }

    pub fn issue_token(&self, customer_id: &str) -> Result<String, ServerError> {
        let claims = JwtClaims {
            sub: customer_id.to_string(),
            exp: (Utc::now() + self.token_expiry).timestamp() as usize,
        };
        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| ServerError::CouldNotSerializeAccessToken(e.to_string()))
    }

    pub fn decode_token(&self, token: &str) -> Result<JwtClaims, AuthError> {
        let data = decode::<JwtClaims>(token, &self.decoding_key, &Validation::default())
            .map_err(|e| AuthError::InvalidToken(e.to_string()))?;
        Ok(data.claims)
    }
}

impl IdentityResolver for JwtService {
    async fn resolve_token(&self, token: &str) -> Result<String, AuthError> {
        if token.trim().is_empty() {
            return Err(AuthError::MissingToken);
        }
        let claims = self.decode_token(token)?;
        Ok(claims.sub)
    }
}

#[cfg(test)]
mod test {
    use qc_common::Secret;
    use quickcart_engine::traits::{AuthError, IdentityResolver};

    use super::JwtService;
    use crate::config::AuthConfig;

    fn service(secret: &str) -> JwtService {
        JwtService::new(&AuthConfig { jwt_secret: Secret::new(secret.to_string()), token_expiry_secs: 3600 })
    }

    #[tokio::test]
    async fn issued_tokens_resolve_to_the_customer() {
        let svc = service("quickcart-test-secret");
        let token = svc.issue_token("cus_42").unwrap();
        let customer = svc.resolve_token(&token).await.unwrap();
        assert_eq!(customer, "cus_42");
    }

    #[tokio::test]
    async fn tokens_signed_with_another_secret_are_rejected() {
        let svc = service("quickcart-test-secret");
        let other = service("a-different-secret");
        let token = other.issue_token("cus_42").unwrap();
        let err = svc.resolve_token(&token).await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidToken(_)), "got {err}");
    }

    #[tokio::test]
    async fn empty_tokens_are_rejected() {
        let svc = service("quickcart-test-secret");
        let err = svc.resolve_token("  ").await.unwrap_err();
        assert!(matches!(err, AuthError::MissingToken), "got {err}");
    }
}
