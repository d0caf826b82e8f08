//! The envelope wire format.
//!
//! ```text
//! <base64(nonce)>:<base64(ciphertext)>:<base64(key_id)>:<base64(tag)>
//! ```
//!
//! Standard padded base64 never contains `:`, so the delimiter is unambiguous.
//! All four fields are always present; an empty ciphertext is an empty field.

use std::fmt;
use std::str::FromStr;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use common::EnvelopeError;

use super::cipher::{NONCE_LEN, TAG_LEN};
use crate::provider::KeyId;

/// Field delimiter.
pub const DELIMITER: char = ':';

/// Number of delimited fields in an envelope.
pub const FIELD_COUNT: usize = 4;

/// A parsed envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    /// Per-seal random nonce.
    pub nonce: [u8; NONCE_LEN],
    /// Encrypted plaintext.
    pub ciphertext: Vec<u8>,
    /// Identifier of the sealing key; authenticated as AAD, never encrypted.
    pub key_id: KeyId,
    /// Detached authentication tag.
    pub tag: [u8; TAG_LEN],
}

impl fmt::Display for Envelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{DELIMITER}{}{DELIMITER}{}{DELIMITER}{}",
            STANDARD.encode(self.nonce),
            STANDARD.encode(&self.ciphertext),
            STANDARD.encode(self.key_id.as_bytes()),
            STANDARD.encode(self.tag),
        )
    }
}

impl FromStr for Envelope {
    type Err = EnvelopeError;

    /// Parse an envelope string.
    ///
    /// # Errors
    ///
    /// Returns [`EnvelopeError::MalformedEnvelope`] if the field count is not
    /// [`FIELD_COUNT`], a field is not valid base64, or the nonce or tag has
    /// the wrong length.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(DELIMITER).collect();
        if parts.len() != FIELD_COUNT {
            return Err(EnvelopeError::MalformedEnvelope(format!(
                "expected {FIELD_COUNT} fields, found {}",
                parts.len()
            )));
        }

        let nonce = fixed::<NONCE_LEN>(&decode(parts[0], "nonce")?, "nonce")?;
        let ciphertext = decode(parts[1], "ciphertext")?;
        let key_id = KeyId::from(decode(parts[2], "key id")?);
        let tag = fixed::<TAG_LEN>(&decode(parts[3], "tag")?, "tag")?;

        Ok(Self {
            nonce,
            ciphertext,
            key_id,
            tag,
        })
    }
}

fn decode(field: &str, name: &str) -> Result<Vec<u8>, EnvelopeError> {
    STANDARD
        .decode(field)
        .map_err(|_| EnvelopeError::MalformedEnvelope(format!("{name} is not valid base64")))
}

fn fixed<const N: usize>(bytes: &[u8], name: &str) -> Result<[u8; N], EnvelopeError> {
    bytes.try_into().map_err(|_| {
        EnvelopeError::MalformedEnvelope(format!(
            "{name} must be {N} bytes, got {}",
            bytes.len()
        ))
    })
}
