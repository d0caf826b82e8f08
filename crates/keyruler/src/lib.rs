//! `keyruler`: field-level envelope encryption for messaging pipelines.
//!
//! A value is sealed with AES-256-GCM under a key issued for its *context*,
//! and rendered as a single self-describing string:
//!
//! ```text
//! <base64(nonce)>:<base64(ciphertext)>:<base64(key_id)>:<base64(tag)>
//! ```
//!
//! The key id travels in the clear and is authenticated as AAD, so the
//! receiver can resolve the key through the same [`KeyProvider`] before
//! verifying and decrypting.
//!
//! ```no_run
//! # async fn demo() -> Result<(), keyruler::EnvelopeError> {
//! use std::sync::Arc;
//! use keyruler::{EnvelopeCodec, InMemoryKeyProvider};
//!
//! let codec = EnvelopeCodec::new(Arc::new(InMemoryKeyProvider::default()));
//! let sealed = codec.seal(b"Once upon a time...", "acontext").await?;
//! assert_eq!(codec.open(&sealed).await?, b"Once upon a time...");
//! # Ok(())
//! # }
//! ```

pub mod codec;
pub mod config;
pub mod crypto;
pub mod mac;
pub mod provider;
pub mod record;
pub mod telemetry;

pub use codec::EnvelopeCodec;
pub use common::{EnvelopeError, FieldPolicy, ProviderError};
pub use config::Config;
pub use crypto::Envelope;
pub use mac::FieldMac;
pub use provider::{
    FixedKeyProvider, HmacSecret, InMemoryKeyProvider, IssuePolicy, IssuedKey, KeyId, KeyMaterial,
    KeyProvider,
};
pub use record::{PolicyCache, ProtectedString, RecordError, RecordProtector};
