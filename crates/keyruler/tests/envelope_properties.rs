//! End-to-end properties of the envelope format against real providers.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use keyruler::{
    EnvelopeCodec, EnvelopeError, HmacSecret, InMemoryKeyProvider, IssuePolicy, IssuedKey, KeyId,
    KeyMaterial, KeyProvider, ProviderError,
};

fn codec_with(provider: Arc<InMemoryKeyProvider>) -> EnvelopeCodec {
    EnvelopeCodec::new(provider)
}

fn fields(envelope: &str) -> Vec<Vec<u8>> {
    envelope
        .split(':')
        .map(|f| STANDARD.decode(f).unwrap())
        .collect()
}

fn join(parts: &[Vec<u8>]) -> String {
    parts
        .iter()
        .map(|p| STANDARD.encode(p))
        .collect::<Vec<_>>()
        .join(":")
}

#[tokio::test]
async fn once_upon_a_time() {
    let codec = codec_with(Arc::new(InMemoryKeyProvider::default()));
    let sealed = codec.seal(b"Once upon a time...", "acontext").await.unwrap();

    let parts: Vec<&str> = sealed.split(':').collect();
    assert_eq!(parts.len(), 4);
    for part in &parts {
        assert!(STANDARD.decode(part).is_ok(), "field {part} is not base64");
    }
    assert_eq!(codec.open_utf8(&sealed).await.unwrap(), "Once upon a time...");
}

#[tokio::test]
async fn round_trip_various_plaintexts() {
    let codec = codec_with(Arc::new(InMemoryKeyProvider::default()));
    let long = vec![0xA5u8; 64 * 1024];
    let samples: [&[u8]; 5] = [
        b"",
        b"a",
        b"123-45-6789",
        "h\u{e9}llo w\u{f6}rld".as_bytes(),
        &long,
    ];
    for (i, plaintext) in samples.iter().enumerate() {
        let context = format!("ctx-{i}");
        let sealed = codec.seal(plaintext, &context).await.unwrap();
        assert_eq!(sealed.split(':').count(), 4);
        assert_eq!(codec.open(&sealed).await.unwrap(), *plaintext);
    }
}

#[tokio::test]
async fn single_byte_tampering_is_detected() {
    let codec = codec_with(Arc::new(InMemoryKeyProvider::default()));
    let sealed = codec.seal(b"Once upon a time...", "acontext").await.unwrap();
    let original = fields(&sealed);

    for field in 0..4 {
        for byte in 0..original[field].len() {
            let mut parts = original.clone();
            parts[field][byte] ^= 0x01;
            let res = codec.open(&join(&parts)).await;
            match (field, res) {
                (_, Err(EnvelopeError::IntegrityError)) => {}
                (2, Err(EnvelopeError::KeyNotFound(_))) => {}
                (f, other) => panic!("field {f} byte {byte}: unexpected {other:?}"),
            }
        }
    }
}

#[tokio::test]
async fn malformed_inputs_rejected() {
    let codec = codec_with(Arc::new(InMemoryKeyProvider::default()));
    let sealed = codec.seal(b"x", "ctx").await.unwrap();
    let parts: Vec<&str> = sealed.split(':').collect();

    let cases = [
        String::new(),
        parts[..3].join(":"),
        format!("{sealed}:{}", parts[3]),
        format!("{}:%%%:{}:{}", parts[0], parts[2], parts[3]),
        format!("{}:{}:{}:not base64!", parts[0], parts[1], parts[2]),
    ];
    for case in &cases {
        assert!(
            matches!(codec.open(case).await, Err(EnvelopeError::MalformedEnvelope(_))),
            "expected malformed for {case:?}"
        );
    }
}

#[tokio::test]
async fn ten_thousand_nonces_are_distinct() {
    let codec = codec_with(Arc::new(InMemoryKeyProvider::default()));
    let mut nonces = HashSet::new();
    for _ in 0..10_000 {
        let sealed = codec.seal(b"same", "same-context").await.unwrap();
        let nonce = sealed.split(':').next().unwrap().to_owned();
        nonces.insert(nonce);
    }
    assert_eq!(nonces.len(), 10_000);
}

#[tokio::test]
async fn revocation_blocks_lookup_and_open() {
    let provider = Arc::new(InMemoryKeyProvider::default());
    let codec = codec_with(provider.clone());
    let sealed = codec.seal(b"old data", "ctx").await.unwrap();
    let key_id = KeyId::from(fields(&sealed)[2].clone());

    provider.revoke(&key_id).await.unwrap();

    assert!(matches!(
        provider.lookup(&key_id).await,
        Err(ProviderError::KeyNotFound(_))
    ));
    assert!(matches!(
        codec.open(&sealed).await,
        Err(EnvelopeError::KeyNotFound(_))
    ));

    // Sealing under the same context moves on to a fresh key.
    let resealed = codec.seal(b"new data", "ctx").await.unwrap();
    assert_ne!(fields(&resealed)[2], key_id.as_bytes());
    assert_eq!(codec.open(&resealed).await.unwrap(), b"new data");
}

/// Two key ids that resolve to the same key material.
struct AliasedProvider {
    keys: HashMap<KeyId, KeyMaterial>,
    issue_as: KeyId,
}

#[async_trait]
impl KeyProvider for AliasedProvider {
    async fn issue(&self, _context: &str) -> Result<IssuedKey, ProviderError> {
        Ok(IssuedKey {
            key_id: self.issue_as.clone(),
            material: self.keys[&self.issue_as].clone(),
        })
    }

    async fn lookup(&self, key_id: &KeyId) -> Result<KeyMaterial, ProviderError> {
        self.keys
            .get(key_id)
            .cloned()
            .ok_or_else(|| ProviderError::KeyNotFound(key_id.to_string()))
    }

    async fn revoke(&self, _key_id: &KeyId) -> Result<(), ProviderError> {
        Ok(())
    }

    async fn hmac_secret(&self, _context: &str) -> Result<HmacSecret, ProviderError> {
        Err(ProviderError::Unavailable("not supported".into()))
    }
}

#[tokio::test]
async fn swapped_key_id_fails_integrity_even_with_same_key() {
    let material = KeyMaterial::generate();
    let id_a = KeyId::from(vec![1, 1, 1, 1, 1]);
    let id_b = KeyId::from(vec![2, 2, 2, 2, 2]);
    let mut keys = HashMap::new();
    keys.insert(id_a.clone(), material.clone());
    keys.insert(id_b.clone(), material);

    let codec = EnvelopeCodec::new(Arc::new(AliasedProvider {
        keys,
        issue_as: id_a,
    }));
    let sealed = codec.seal(b"bound to id a", "ctx").await.unwrap();

    let mut parts = fields(&sealed);
    parts[2] = id_b.as_bytes().to_vec();
    assert!(matches!(
        codec.open(&join(&parts)).await,
        Err(EnvelopeError::IntegrityError)
    ));
}

#[tokio::test]
async fn envelopes_survive_key_rotation() {
    let provider = Arc::new(InMemoryKeyProvider::new(IssuePolicy::ReusePerContext {
        max_uses: 3,
    }));
    let codec = codec_with(provider.clone());

    let mut sealed = Vec::new();
    for i in 0..10u8 {
        sealed.push((i, codec.seal(&[i], "rotating").await.unwrap()));
    }
    let ids: HashSet<Vec<u8>> = sealed.iter().map(|(_, s)| fields(s)[2].clone()).collect();
    assert_eq!(ids.len(), 4);

    for (i, envelope) in &sealed {
        assert_eq!(codec.open(envelope).await.unwrap(), vec![*i]);
    }
}

#[tokio::test]
async fn concurrent_seal_and_open() {
    let codec = codec_with(Arc::new(InMemoryKeyProvider::default()));
    let mut handles = Vec::new();
    for task in 0..32 {
        let codec = codec.clone();
        handles.push(tokio::spawn(async move {
            let context = format!("ctx-{}", task % 4);
            let plaintext = format!("value-{task}");
            let sealed = codec.seal(plaintext.as_bytes(), &context).await?;
            let opened = codec.open_utf8(&sealed).await?;
            assert_eq!(opened, plaintext);
            Ok::<_, EnvelopeError>(())
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }
}
