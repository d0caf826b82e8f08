//! [`FixedKeyProvider`]: one key for every context.
//!
//! Useful for tests and local wiring where a deterministic key is wanted.
//! Revocation is enforced: once the single id is revoked, nothing resolves.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use common::ProviderError;
use tracing::info;

use super::{HmacSecret, IssuedKey, KeyId, KeyMaterial, KeyProvider};

/// Provider that always issues the same key id and key material.
#[derive(Debug, Clone)]
pub struct FixedKeyProvider {
    key_id: KeyId,
    material: KeyMaterial,
    hmac: HmacSecret,
    revoked: Arc<AtomicBool>,
}

impl FixedKeyProvider {
    /// Build a provider around an explicit key id, key and HMAC secret.
    pub fn new(key_id: KeyId, material: KeyMaterial, hmac: HmacSecret) -> Self {
        Self {
            key_id,
            material,
            hmac,
            revoked: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Build a provider with a random 40-bit id, random key and random HMAC secret.
    pub fn random() -> Self {
        let hmac = HmacSecret::new(KeyMaterial::generate().as_bytes().to_vec());
        Self::new(KeyId::generate(), KeyMaterial::generate(), hmac)
    }

    /// The single key id this provider serves.
    pub fn key_id(&self) -> &KeyId {
        &self.key_id
    }

    fn ensure_live(&self, key_id: &KeyId) -> Result<(), ProviderError> {
        if key_id != &self.key_id || self.revoked.load(Ordering::Acquire) {
            return Err(ProviderError::KeyNotFound(key_id.to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl KeyProvider for FixedKeyProvider {
    async fn issue(&self, _context: &str) -> Result<IssuedKey, ProviderError> {
        self.ensure_live(&self.key_id)?;
        Ok(IssuedKey {
            key_id: self.key_id.clone(),
            material: self.material.clone(),
        })
    }

    async fn lookup(&self, key_id: &KeyId) -> Result<KeyMaterial, ProviderError> {
        self.ensure_live(key_id)?;
        Ok(self.material.clone())
    }

    async fn revoke(&self, key_id: &KeyId) -> Result<(), ProviderError> {
        if key_id == &self.key_id && !self.revoked.swap(true, Ordering::AcqRel) {
            info!(key_id = %key_id, "revoked fixed key");
        }
        Ok(())
    }

    async fn hmac_secret(&self, _context: &str) -> Result<HmacSecret, ProviderError> {
        Ok(self.hmac.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn every_context_gets_the_same_key() {
        let provider = FixedKeyProvider::random();
        let a = provider.issue("a").await.unwrap();
        let b = provider.issue("b").await.unwrap();
        assert_eq!(a.key_id, b.key_id);
        assert_eq!(a.material.as_bytes(), b.material.as_bytes());
    }

    #[tokio::test]
    async fn foreign_key_id_not_found() {
        let provider = FixedKeyProvider::random();
        let other = KeyId::from(vec![0xAA; 7]);
        assert!(matches!(
            provider.lookup(&other).await,
            Err(ProviderError::KeyNotFound(_))
        ));
    }

    #[tokio::test]
    async fn revoked_key_no_longer_issued_or_resolved() {
        let provider = FixedKeyProvider::random();
        let id = provider.key_id().clone();
        provider.revoke(&id).await.unwrap();
        provider.revoke(&id).await.unwrap();
        assert!(provider.lookup(&id).await.is_err());
        assert!(provider.issue("ctx").await.is_err());
    }
}
