use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum AuthError {
    #[error("Caller token is missing or empty")]
    MissingToken,
    #[error("Caller token is invalid or expired. {0}")]
    InvalidToken(String),
}

/// Resolves an opaque caller token into a customer identity.
///
/// Token parsing and verification are delegated entirely to the implementation; the engine only consumes the
/// resolved identity.
#[allow(async_fn_in_trait)]
pub trait IdentityResolver: Send + Sync {
    async fn resolve_token(&self, token: &str) -> Result<String, AuthError>;
}
