//! HMAC-SHA256 tags keyed by a context's MAC secret.
//!
//! For integrity over data that is not itself sealed, e.g. several envelope
//! fields of one record bound together. Tags render as standard base64.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use common::EnvelopeError;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use tracing::warn;

use crate::codec::EnvelopeCodec;
use crate::provider::HmacSecret;

type HmacSha256 = Hmac<Sha256>;

/// Computes and verifies MAC tags keyed by
/// [`KeyProvider::hmac_secret`](crate::provider::KeyProvider::hmac_secret).
#[derive(Debug, Clone)]
pub struct FieldMac {
    codec: EnvelopeCodec,
}

impl FieldMac {
    /// Share the codec's provider and timeout.
    pub fn new(codec: &EnvelopeCodec) -> Self {
        Self {
            codec: codec.clone(),
        }
    }

    /// Compute the base64 tag of `data` under `context`'s MAC secret.
    ///
    /// # Errors
    ///
    /// Returns [`EnvelopeError::KeyProviderUnavailable`] if the secret cannot be fetched.
    pub async fn sign(&self, context: &str, data: &[u8]) -> Result<String, EnvelopeError> {
        let mac = self.keyed(context).await?.chain_update(data);
        Ok(STANDARD.encode(mac.finalize().into_bytes()))
    }

    /// Verify a base64 tag in constant time.
    ///
    /// # Errors
    ///
    /// - [`EnvelopeError::MalformedEnvelope`] if `tag` is not base64.
    /// - [`EnvelopeError::IntegrityError`] if the tag does not match.
    /// - [`EnvelopeError::KeyProviderUnavailable`] if the secret cannot be fetched.
    pub async fn verify(&self, context: &str, data: &[u8], tag: &str) -> Result<(), EnvelopeError> {
        let expected = STANDARD
            .decode(tag)
            .map_err(|_| EnvelopeError::MalformedEnvelope("mac tag is not valid base64".into()))?;
        let mac = self.keyed(context).await?.chain_update(data);
        mac.verify_slice(&expected).map_err(|_| {
            warn!(context, "mac verification failed");
            EnvelopeError::IntegrityError
        })
    }

    async fn keyed(&self, context: &str) -> Result<HmacSha256, EnvelopeError> {
        let secret: HmacSecret = self
            .codec
            .call_provider("hmac_secret", self.codec.provider().hmac_secret(context))
            .await?;
        HmacSha256::new_from_slice(secret.as_bytes())
            .map_err(|e| EnvelopeError::EncryptionError(e.to_string()))
    }
}
