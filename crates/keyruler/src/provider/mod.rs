//! Key provider capability: per-context key issuance and key id resolution.
//!
//! # Lifecycle
//!
//! 1. [`KeyProvider::issue`] returns a `(key_id, key_material)` pair for a context.
//! 2. [`KeyProvider::lookup`] resolves the id back to the same material, any number of times.
//! 3. [`KeyProvider::revoke`] makes the id permanently unresolvable.
//!
//! # Security invariants
//!
//! - A key id identifies exactly one key for as long as it resolves, across all
//!   contexts, and is never reissued after revocation.
//! - Key material and HMAC secrets are zeroized on drop and never printed,
//!   not even through `Debug`.

pub mod fixed;
pub mod memory;

pub use fixed::FixedKeyProvider;
pub use memory::{InMemoryKeyProvider, IssuePolicy};

use std::fmt;

use aes_gcm::aead::{rand_core::RngCore, OsRng};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use common::ProviderError;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::crypto::KEY_LEN;

/// Byte length of key ids minted by the bundled providers (40 bits).
pub const KEY_ID_LEN: usize = 5;

/// Public identifier of a key. Not secret; travels in the clear.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct KeyId(Vec<u8>);

impl KeyId {
    /// Generate a random [`KEY_ID_LEN`]-byte id.
    pub fn generate() -> Self {
        let mut bytes = vec![0u8; KEY_ID_LEN];
        OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Raw id bytes, as used for AAD.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl From<Vec<u8>> for KeyId {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl fmt::Display for KeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&STANDARD.encode(&self.0))
    }
}

impl fmt::Debug for KeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KeyId({self})")
    }
}

/// 256-bit symmetric key. Zeroized on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct KeyMaterial {
    bytes: [u8; KEY_LEN],
}

impl KeyMaterial {
    /// Wrap existing key bytes.
    pub fn new(bytes: [u8; KEY_LEN]) -> Self {
        Self { bytes }
    }

    /// Generate a random key from the OS CSPRNG.
    pub fn generate() -> Self {
        let mut bytes = [0u8; KEY_LEN];
        OsRng.fill_bytes(&mut bytes);
        Self { bytes }
    }

    /// Borrow the key bytes for a single cipher call.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("KeyMaterial([REDACTED])")
    }
}

/// Secret for HMAC-SHA256, distinct from every AEAD key. Zeroized on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct HmacSecret {
    bytes: Vec<u8>,
}

impl HmacSecret {
    /// Wrap existing secret bytes.
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    /// Borrow the secret bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl fmt::Debug for HmacSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("HmacSecret([REDACTED])")
    }
}

/// A key handed out by [`KeyProvider::issue`].
#[derive(Debug, Clone)]
pub struct IssuedKey {
    pub key_id: KeyId,
    pub material: KeyMaterial,
}

/// Source of encryption keys, injected into [`crate::codec::EnvelopeCodec`].
///
/// Implementations may be local or remote; each operation must be safe to call
/// concurrently. Remote implementations surface transport failures as
/// [`ProviderError::Unavailable`].
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait KeyProvider: Send + Sync {
    /// Return a key usable for sealing values under `context`.
    async fn issue(&self, context: &str) -> Result<IssuedKey, ProviderError>;

    /// Resolve a previously issued key id.
    ///
    /// Fails with [`ProviderError::KeyNotFound`] if the id is unknown or revoked.
    async fn lookup(&self, key_id: &KeyId) -> Result<KeyMaterial, ProviderError>;

    /// Make `key_id` permanently unresolvable. Idempotent.
    async fn revoke(&self, key_id: &KeyId) -> Result<(), ProviderError>;

    /// Return the MAC secret for `context`.
    async fn hmac_secret(&self, context: &str) -> Result<HmacSecret, ProviderError>;
}
