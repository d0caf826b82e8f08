//! Common types and errors shared across `keyruler` crates.

pub mod error;
pub mod policy;

pub use error::{EnvelopeError, ProviderError};
pub use policy::FieldPolicy;
