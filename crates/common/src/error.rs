//! Common error types shared across crates.

use thiserror::Error;

/// Errors returned at the `seal` / `open` boundary.
///
/// Only [`EnvelopeError::KeyProviderUnavailable`] is worth retrying; every
/// other variant is a local, permanent failure for the given input:
/// - [`EnvelopeError::MalformedEnvelope`] → `malformed_envelope`
/// - [`EnvelopeError::KeyNotFound`] → `key_not_found`
/// - [`EnvelopeError::IntegrityError`] → `integrity_error`
/// - [`EnvelopeError::EncryptionError`] → `encryption_error`
/// - [`EnvelopeError::KeyProviderUnavailable`] → `key_provider_unavailable`
#[derive(Debug, Error)]
pub enum EnvelopeError {
    /// Wrong field count, invalid base64, or a component of the wrong length.
    #[error("malformed envelope: {0}")]
    MalformedEnvelope(String),

    /// The key id is unknown to the provider or has been revoked.
    #[error("key not found: {0}")]
    KeyNotFound(String),

    /// The authentication tag did not verify. Possible tampering.
    #[error("integrity check failed")]
    IntegrityError,

    /// The cipher rejected its inputs.
    #[error("encryption error: {0}")]
    EncryptionError(String),

    /// The key provider timed out or could not be reached.
    #[error("key provider unavailable: {0}")]
    KeyProviderUnavailable(String),
}

impl EnvelopeError {
    /// Short machine-readable error code.
    pub fn code(&self) -> &'static str {
        match self {
            EnvelopeError::MalformedEnvelope(_) => "malformed_envelope",
            EnvelopeError::KeyNotFound(_) => "key_not_found",
            EnvelopeError::IntegrityError => "integrity_error",
            EnvelopeError::EncryptionError(_) => "encryption_error",
            EnvelopeError::KeyProviderUnavailable(_) => "key_provider_unavailable",
        }
    }

    /// Returns `true` if a caller-driven retry (with backoff) may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, EnvelopeError::KeyProviderUnavailable(_))
    }
}

/// Errors produced by a key provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The key id is unknown or revoked. Carries the base64 key id.
    #[error("key not found: {0}")]
    KeyNotFound(String),

    /// The provider could not serve the request (transport, backend outage).
    #[error("provider unavailable: {0}")]
    Unavailable(String),
}

impl From<ProviderError> for EnvelopeError {
    fn from(e: ProviderError) -> Self {
        match e {
            ProviderError::KeyNotFound(id) => EnvelopeError::KeyNotFound(id),
            ProviderError::Unavailable(msg) => EnvelopeError::KeyProviderUnavailable(msg),
        }
    }
}
