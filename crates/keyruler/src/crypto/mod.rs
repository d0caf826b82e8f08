//! AES-256-GCM field encryption primitives and the envelope wire format.
//!
//! This module is intentionally free of key-provider logic. It provides the
//! low-level seal/open operations used by [`crate::codec`].
//!
//! # Envelope format
//!
//! ```text
//! <base64(nonce)>:<base64(ciphertext)>:<base64(key_id)>:<base64(tag)>
//! ```
//!
//! The format is versionless; the key id is bound to the ciphertext as AAD.

pub mod cipher;
pub mod envelope;

pub use cipher::{KEY_LEN, NONCE_LEN, TAG_LEN};
pub use envelope::Envelope;
