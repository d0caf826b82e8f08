//! AES-256-GCM with a 128-bit nonce and a detached 128-bit tag.
//!
//! **Nonce discipline:** GCM nonce reuse under one key is catastrophic, it
//! breaks both confidentiality and authentication. Every seal draws a fresh
//! 128-bit nonce from the OS CSPRNG via [`generate_nonce`].
//!
//! The tag is kept detached so that the envelope can carry it as its own field.

use aes_gcm::{
    aead::{consts::U16, rand_core::RngCore, AeadInPlace, KeyInit, OsRng},
    aes::Aes256,
    AesGcm, Nonce, Tag,
};
use thiserror::Error;
use zeroize::Zeroize;

/// Byte length of an AES-256 key (32 bytes = 256 bits).
pub const KEY_LEN: usize = 32;

/// Byte length of the GCM nonce (16 bytes = 128 bits).
pub const NONCE_LEN: usize = 16;

/// Byte length of the GCM authentication tag (16 bytes = 128 bits).
pub const TAG_LEN: usize = 16;

/// AES-256-GCM instantiated with a 16-byte nonce.
type Aes256Gcm16 = AesGcm<Aes256, U16>;

/// Errors produced by the cipher layer.
#[derive(Debug, Error)]
pub enum CipherError {
    /// The key is the wrong length (must be [`KEY_LEN`] bytes).
    #[error("invalid key length: expected {KEY_LEN} bytes, got {0}")]
    InvalidKeyLength(usize),

    /// The cipher refused to encrypt (plaintext or AAD exceeds GCM limits).
    #[error("cipher rejected input")]
    Rejected,

    /// The tag did not verify for this key, nonce, AAD and ciphertext.
    #[error("authentication failed")]
    AuthenticationFailed,
}

/// Output of [`seal_detached`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sealed {
    /// Ciphertext, same length as the plaintext.
    pub ciphertext: Vec<u8>,
    /// Detached authentication tag.
    pub tag: [u8; TAG_LEN],
}

/// Draw a fresh random nonce from the OS CSPRNG.
pub fn generate_nonce() -> [u8; NONCE_LEN] {
    let mut nonce = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut nonce);
    nonce
}

/// Encrypt `plaintext` under `key` and `nonce`, authenticating `aad`.
///
/// # Errors
///
/// Returns [`CipherError::InvalidKeyLength`] if `key` is not [`KEY_LEN`] bytes.
/// Returns [`CipherError::Rejected`] if the cipher refuses the input sizes.
pub fn seal_detached(
    key: &[u8],
    nonce: &[u8; NONCE_LEN],
    aad: &[u8],
    plaintext: &[u8],
) -> Result<Sealed, CipherError> {
    let cipher = build_cipher(key)?;
    let mut buffer = plaintext.to_vec();
    let tag = match cipher.encrypt_in_place_detached(Nonce::from_slice(nonce), aad, &mut buffer) {
        Ok(tag) => tag,
        Err(_) => {
            buffer.zeroize();
            return Err(CipherError::Rejected);
        }
    };

    let mut tag_bytes = [0u8; TAG_LEN];
    tag_bytes.copy_from_slice(tag.as_slice());
    Ok(Sealed {
        ciphertext: buffer,
        tag: tag_bytes,
    })
}

/// Verify and decrypt `ciphertext` in a single operation.
///
/// Plaintext is only returned once the tag has verified; on failure the
/// working buffer is wiped and dropped.
///
/// # Errors
///
/// Returns [`CipherError::InvalidKeyLength`] if `key` is not [`KEY_LEN`] bytes.
/// Returns [`CipherError::AuthenticationFailed`] on a wrong key, AAD, nonce,
/// tag, or tampered ciphertext.
pub fn open_detached(
    key: &[u8],
    nonce: &[u8; NONCE_LEN],
    aad: &[u8],
    ciphertext: &[u8],
    tag: &[u8; TAG_LEN],
) -> Result<Vec<u8>, CipherError> {
    let cipher = build_cipher(key)?;
    let mut buffer = ciphertext.to_vec();
    match cipher.decrypt_in_place_detached(
        Nonce::from_slice(nonce),
        aad,
        &mut buffer,
        Tag::from_slice(tag),
    ) {
        Ok(()) => Ok(buffer),
        Err(_) => {
            buffer.zeroize();
            Err(CipherError::AuthenticationFailed)
        }
    }
}

fn build_cipher(key: &[u8]) -> Result<Aes256Gcm16, CipherError> {
    if key.len() != KEY_LEN {
        return Err(CipherError::InvalidKeyLength(key.len()));
    }
    Aes256Gcm16::new_from_slice(key).map_err(|_| CipherError::InvalidKeyLength(key.len()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn random_key() -> Vec<u8> {
        let mut key = vec![0u8; KEY_LEN];
        OsRng.fill_bytes(&mut key);
        key
    }

    #[test]
    fn seal_open_round_trip() {
        let key = random_key();
        let nonce = generate_nonce();
        let sealed = seal_detached(&key, &nonce, b"kid01", b"123-45-6789").unwrap();
        assert_eq!(sealed.ciphertext.len(), b"123-45-6789".len());
        let opened =
            open_detached(&key, &nonce, b"kid01", &sealed.ciphertext, &sealed.tag).unwrap();
        assert_eq!(opened, b"123-45-6789");
    }

    #[test]
    fn empty_plaintext_still_authenticated() {
        let key = random_key();
        let nonce = generate_nonce();
        let sealed = seal_detached(&key, &nonce, b"kid01", b"").unwrap();
        assert!(sealed.ciphertext.is_empty());
        assert!(open_detached(&key, &nonce, b"kid01", b"", &sealed.tag).unwrap().is_empty());
        assert!(open_detached(&key, &nonce, b"kid02", b"", &sealed.tag).is_err());
    }

    #[test]
    fn wrong_key_fails() {
        let nonce = generate_nonce();
        let sealed = seal_detached(&random_key(), &nonce, b"", b"secret").unwrap();
        let res = open_detached(&random_key(), &nonce, b"", &sealed.ciphertext, &sealed.tag);
        assert!(matches!(res, Err(CipherError::AuthenticationFailed)));
    }

    #[test]
    fn aad_mismatch_fails() {
        let key = random_key();
        let nonce = generate_nonce();
        let sealed = seal_detached(&key, &nonce, b"kid-a", b"secret").unwrap();
        let res = open_detached(&key, &nonce, b"kid-b", &sealed.ciphertext, &sealed.tag);
        assert!(matches!(res, Err(CipherError::AuthenticationFailed)));
    }

    #[test]
    fn tampered_tag_fails() {
        let key = random_key();
        let nonce = generate_nonce();
        let mut sealed = seal_detached(&key, &nonce, b"aad", b"tamper me").unwrap();
        sealed.tag[TAG_LEN - 1] ^= 0x01;
        assert!(open_detached(&key, &nonce, b"aad", &sealed.ciphertext, &sealed.tag).is_err());
    }

    #[test]
    fn invalid_key_length_rejected() {
        let nonce = generate_nonce();
        let res = seal_detached(&[0u8; 16], &nonce, b"", b"x");
        assert!(matches!(res, Err(CipherError::InvalidKeyLength(16))));
    }

    #[test]
    fn nonces_differ() {
        assert_ne!(generate_nonce(), generate_nonce());
    }
}
