//! [`EnvelopeCodec`]: seal plaintext into envelope strings and open them again.
//!
//! Each call is self-contained: the only shared state is the injected
//! [`KeyProvider`]. Provider calls run under a timeout and surface as
//! [`EnvelopeError::KeyProviderUnavailable`] when it elapses. The codec never
//! retries; retry policy belongs to the caller.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use common::{EnvelopeError, ProviderError};
use tokio::time;
use tracing::{debug, warn};

use crate::config::Config;
use crate::crypto::cipher::{self, CipherError};
use crate::crypto::Envelope;
use crate::provider::{IssuedKey, KeyProvider};

/// Default per-call key provider timeout.
pub const DEFAULT_PROVIDER_TIMEOUT: Duration = Duration::from_secs(5);

/// Envelope encoder/decoder bound to a key provider.
#[derive(Clone)]
pub struct EnvelopeCodec {
    provider: Arc<dyn KeyProvider>,
    provider_timeout: Duration,
}

impl EnvelopeCodec {
    /// Create a codec using [`DEFAULT_PROVIDER_TIMEOUT`].
    pub fn new(provider: Arc<dyn KeyProvider>) -> Self {
        Self {
            provider,
            provider_timeout: DEFAULT_PROVIDER_TIMEOUT,
        }
    }

    /// Create a codec with the timeout from `cfg`.
    pub fn from_config(provider: Arc<dyn KeyProvider>, cfg: &Config) -> Self {
        Self::new(provider).with_timeout(cfg.provider_timeout())
    }

    /// Override the per-call key provider timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.provider_timeout = timeout;
        self
    }

    /// The injected key provider.
    pub fn provider(&self) -> &Arc<dyn KeyProvider> {
        &self.provider
    }

    /// Encrypt `plaintext` under a key issued for `context`.
    ///
    /// Returns `nonce:ciphertext:key_id:tag`, each field standard base64.
    ///
    /// # Errors
    ///
    /// - [`EnvelopeError::KeyProviderUnavailable`] if `issue` fails or times out.
    /// - [`EnvelopeError::KeyNotFound`] if the provider has no usable key.
    /// - [`EnvelopeError::EncryptionError`] if the cipher rejects the input.
    pub async fn seal(&self, plaintext: &[u8], context: &str) -> Result<String, EnvelopeError> {
        let IssuedKey { key_id, material } = self
            .call_provider("issue", self.provider.issue(context))
            .await?;

        let nonce = cipher::generate_nonce();
        let sealed =
            cipher::seal_detached(material.as_bytes(), &nonce, key_id.as_bytes(), plaintext);
        drop(material);
        let sealed = sealed.map_err(|e| EnvelopeError::EncryptionError(e.to_string()))?;

        debug!(key_id = %key_id, context, "sealed value");
        Ok(Envelope {
            nonce,
            ciphertext: sealed.ciphertext,
            key_id,
            tag: sealed.tag,
        }
        .to_string())
    }

    /// Verify and decrypt an envelope string.
    ///
    /// # Errors
    ///
    /// - [`EnvelopeError::MalformedEnvelope`] if the string does not parse.
    /// - [`EnvelopeError::KeyNotFound`] if the key id is unknown or revoked.
    /// - [`EnvelopeError::KeyProviderUnavailable`] if `lookup` fails or times out.
    /// - [`EnvelopeError::IntegrityError`] if the tag does not verify.
    pub async fn open(&self, envelope: &str) -> Result<Vec<u8>, EnvelopeError> {
        let env: Envelope = envelope.parse()?;

        let material = self
            .call_provider("lookup", self.provider.lookup(&env.key_id))
            .await?;

        let opened = cipher::open_detached(
            material.as_bytes(),
            &env.nonce,
            env.key_id.as_bytes(),
            &env.ciphertext,
            &env.tag,
        );
        drop(material);

        match opened {
            Ok(plaintext) => {
                debug!(key_id = %env.key_id, "opened value");
                Ok(plaintext)
            }
            Err(CipherError::AuthenticationFailed) => {
                warn!(key_id = %env.key_id, "envelope failed integrity check");
                Err(EnvelopeError::IntegrityError)
            }
            Err(e) => Err(EnvelopeError::EncryptionError(e.to_string())),
        }
    }

    /// [`open`](Self::open), then interpret the plaintext as UTF-8.
    ///
    /// # Errors
    ///
    /// As [`open`](Self::open), plus [`EnvelopeError::MalformedEnvelope`] if the
    /// verified plaintext is not valid UTF-8.
    pub async fn open_utf8(&self, envelope: &str) -> Result<String, EnvelopeError> {
        let plaintext = self.open(envelope).await?;
        String::from_utf8(plaintext).map_err(|_| {
            EnvelopeError::MalformedEnvelope("plaintext is not valid UTF-8".into())
        })
    }

    pub(crate) async fn call_provider<T, F>(
        &self,
        op: &'static str,
        fut: F,
    ) -> Result<T, EnvelopeError>
    where
        F: Future<Output = Result<T, ProviderError>>,
    {
        match time::timeout(self.provider_timeout, fut).await {
            Ok(res) => res.map_err(EnvelopeError::from),
            Err(_) => {
                let timeout_ms = self.provider_timeout.as_millis();
                warn!(op, timeout_ms, "key provider call timed out");
                Err(EnvelopeError::KeyProviderUnavailable(format!(
                    "{op} timed out after {timeout_ms}ms"
                )))
            }
        }
    }
}

impl fmt::Debug for EnvelopeCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnvelopeCodec")
            .field("provider_timeout", &self.provider_timeout)
            .finish_non_exhaustive()
    }
}
