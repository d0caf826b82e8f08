//! [`InMemoryKeyProvider`]: process-local key provider with enforced revocation.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use common::ProviderError;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use tokio::sync::RwLock;
use tracing::{debug, info};

use super::{HmacSecret, IssuedKey, KeyId, KeyMaterial, KeyProvider};

type HmacSha256 = Hmac<Sha256>;

/// Default bound on how many seals a single key may serve (2^24).
///
/// Random 96+ bit nonces stay safe up to 2^32 encryptions per key; this
/// keeps every key far below that.
pub const DEFAULT_MAX_USES: u64 = 1 << 24;

/// Domain separation label for derived HMAC secrets.
const HMAC_LABEL: &[u8] = b"hmac:";

/// How [`InMemoryKeyProvider::issue`] picks a key for a context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssuePolicy {
    /// Mint a new key on every call.
    FreshPerCall,
    /// Reuse one active key per context until it has been issued `max_uses`
    /// times, then mint a replacement.
    ReusePerContext { max_uses: u64 },
}

impl Default for IssuePolicy {
    fn default() -> Self {
        IssuePolicy::ReusePerContext {
            max_uses: DEFAULT_MAX_USES,
        }
    }
}

struct ActiveKey {
    key_id: KeyId,
    uses: u64,
}

#[derive(Default)]
struct State {
    /// Resolvable keys.
    keys: HashMap<KeyId, KeyMaterial>,
    /// Ids that must never resolve or be minted again.
    revoked: HashSet<KeyId>,
    /// Current key per context under [`IssuePolicy::ReusePerContext`].
    active: HashMap<String, ActiveKey>,
}

impl State {
    /// Mint a key whose id collides with no live or revoked id.
    fn mint(&mut self) -> IssuedKey {
        let key_id = loop {
            let candidate = KeyId::generate();
            if !self.keys.contains_key(&candidate) && !self.revoked.contains(&candidate) {
                break candidate;
            }
        };
        let material = KeyMaterial::generate();
        self.keys.insert(key_id.clone(), material.clone());
        IssuedKey { key_id, material }
    }
}

/// Thread-safe in-memory key provider.
///
/// Key ids are globally unique across contexts, so an id can never be
/// resolved to a key minted for a different purpose. Revoked ids are kept as
/// tombstones and are never minted again.
///
/// HMAC secrets are derived as `HMAC-SHA256(master, "hmac:" || context)` from
/// a random per-instance master secret, so they are stable for the lifetime of
/// the provider and unrelated to any AEAD key.
#[derive(Clone)]
pub struct InMemoryKeyProvider {
    policy: IssuePolicy,
    master: Arc<KeyMaterial>,
    state: Arc<RwLock<State>>,
}

impl InMemoryKeyProvider {
    /// Create an empty provider using `policy`.
    pub fn new(policy: IssuePolicy) -> Self {
        Self {
            policy,
            master: Arc::new(KeyMaterial::generate()),
            state: Arc::new(RwLock::new(State::default())),
        }
    }

    /// The issue policy this provider was built with.
    pub fn policy(&self) -> IssuePolicy {
        self.policy
    }

    /// Number of currently resolvable keys.
    pub async fn live_keys(&self) -> usize {
        self.state.read().await.keys.len()
    }
}

impl Default for InMemoryKeyProvider {
    fn default() -> Self {
        Self::new(IssuePolicy::default())
    }
}

impl std::fmt::Debug for InMemoryKeyProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryKeyProvider")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl KeyProvider for InMemoryKeyProvider {
    async fn issue(&self, context: &str) -> Result<IssuedKey, ProviderError> {
        let mut state = self.state.write().await;

        let max_uses = match self.policy {
            IssuePolicy::FreshPerCall => {
                let issued = state.mint();
                info!(key_id = %issued.key_id, context, "minted key");
                return Ok(issued);
            }
            IssuePolicy::ReusePerContext { max_uses } => max_uses,
        };

        let reusable = state
            .active
            .get(context)
            .filter(|active| active.uses < max_uses)
            .map(|active| active.key_id.clone())
            .and_then(|key_id| state.keys.get(&key_id).cloned().map(|m| (key_id, m)));

        if let Some((key_id, material)) = reusable {
            if let Some(active) = state.active.get_mut(context) {
                active.uses += 1;
            }
            return Ok(IssuedKey { key_id, material });
        }

        let issued = state.mint();
        state.active.insert(
            context.to_owned(),
            ActiveKey {
                key_id: issued.key_id.clone(),
                uses: 1,
            },
        );
        info!(key_id = %issued.key_id, context, "minted key");
        Ok(issued)
    }

    async fn lookup(&self, key_id: &KeyId) -> Result<KeyMaterial, ProviderError> {
        self.state
            .read()
            .await
            .keys
            .get(key_id)
            .cloned()
            .ok_or_else(|| ProviderError::KeyNotFound(key_id.to_string()))
    }

    async fn revoke(&self, key_id: &KeyId) -> Result<(), ProviderError> {
        let mut state = self.state.write().await;
        if state.keys.remove(key_id).is_some() {
            state.active.retain(|_, active| &active.key_id != key_id);
            info!(key_id = %key_id, "revoked key");
        } else {
            debug!(key_id = %key_id, "revoke of unknown or already revoked key");
        }
        state.revoked.insert(key_id.clone());
        Ok(())
    }

    async fn hmac_secret(&self, context: &str) -> Result<HmacSecret, ProviderError> {
        let mut mac = HmacSha256::new_from_slice(self.master.as_bytes())
            .map_err(|e| ProviderError::Unavailable(format!("hmac derivation failed: {e}")))?;
        mac.update(HMAC_LABEL);
        mac.update(context.as_bytes());
        Ok(HmacSecret::new(mac.finalize().into_bytes().to_vec()))
    }
}
