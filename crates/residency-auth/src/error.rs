//! Error types for identity verification and sessions.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    /// The token could not be parsed, was signed by an unknown key, or
    /// failed a claim check.
    #[error("invalid token: {0}")]
    InvalidToken(String),

    #[error("token has expired")]
    Expired,

    /// Fetching or decoding the identity provider's public keys failed.
    #[error("failed to load signing keys: {0}")]
    KeyFetch(String),

    #[error("failed to parse private key: {0}")]
    InvalidPrivateKey(String),

    #[error("failed to generate keypair: {0}")]
    KeyGenerationFailed(String),

    #[error("failed to create session: {0}")]
    SessionCreationFailed(String),

    #[error("missing claim: {claim}")]
    MissingClaim { claim: String },

    #[error("identity verification is not configured: {0}")]
    NotConfigured(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl AuthError {
    /// Whether the caller should be told to authenticate again.
    pub fn is_credential_error(&self) -> bool {
        matches!(
            self,
            AuthError::InvalidToken(_) | AuthError::Expired | AuthError::MissingClaim { .. }
        )
    }
}
