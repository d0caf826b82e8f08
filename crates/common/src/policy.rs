//! Field protection policy carried by schema annotations.
//!
//! A protected string field is declared in an Avro record schema as:
//!
//! ```json
//! { "type": "string", "logicalType": "keyruler-string", "context": "customer-email", "isPII": true }
//! ```
//!
//! The `context` and `isPII` attributes deserialise into a [`FieldPolicy`].

use serde::{Deserialize, Serialize};

/// Logical type name that marks a string field as protected.
pub const LOGICAL_TYPE: &str = "keyruler-string";

/// How a single protected field is handled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldPolicy {
    /// Key context used to seal the field value.
    pub context: String,
    /// Whether the value is personally identifiable and must be sealed.
    #[serde(rename = "isPII", default)]
    pub is_pii: bool,
}

impl FieldPolicy {
    /// Construct a [`FieldPolicy`] from a context and PII flag.
    pub fn new(context: impl Into<String>, is_pii: bool) -> Self {
        Self {
            context: context.into(),
            is_pii,
        }
    }
}
