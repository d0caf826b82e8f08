//! Field-level protection for records travelling through a message pipeline.
//!
//! # Responsibilities
//!
//! - Resolve which record fields are `keyruler-string` typed from an Avro
//!   record schema, and with which context and PII flag.
//! - Cache the resolved policies per schema name.
//! - Seal those fields before a record is handed to transport, and open them
//!   after it is received.
//!
//! Fetching schemas from a registry and talking to the message bus are left
//! to the caller.

pub mod cache;
pub mod schema;
pub mod transform;

pub use cache::PolicyCache;
pub use schema::{resolve_protected_fields, FieldPolicies};
pub use transform::{open_fields, seal_fields, ProtectedString};

use common::EnvelopeError;
use serde_json::Value;
use thiserror::Error;

use crate::codec::EnvelopeCodec;

/// Errors from the record layer.
#[derive(Debug, Error)]
pub enum RecordError {
    /// The schema name has no entry in the [`PolicyCache`].
    #[error("unknown schema: {0}")]
    UnknownSchema(String),

    /// The schema is structurally invalid or a protected field is misdeclared.
    #[error("invalid schema: {0}")]
    InvalidSchema(String),

    /// Sealing or opening the field at `path` failed.
    #[error("field '{path}': {source}")]
    Field {
        path: String,
        #[source]
        source: EnvelopeError,
    },
}

/// Seals and opens whole records by schema name.
#[derive(Debug, Clone)]
pub struct RecordProtector {
    codec: EnvelopeCodec,
    policies: PolicyCache,
}

impl RecordProtector {
    pub fn new(codec: EnvelopeCodec, policies: PolicyCache) -> Self {
        Self { codec, policies }
    }

    /// The policy cache, for refreshing schemas.
    pub fn policies(&self) -> &PolicyCache {
        &self.policies
    }

    /// Seal the protected fields of `record` as declared by `schema_name`.
    ///
    /// # Errors
    ///
    /// [`RecordError::UnknownSchema`] or the first field failure.
    pub async fn seal_record(
        &self,
        schema_name: &str,
        record: &mut Value,
    ) -> Result<(), RecordError> {
        let policies = self.policies.get(schema_name)?;
        seal_fields(&self.codec, record, &policies).await
    }

    /// Open the protected fields of `record` as declared by `schema_name`.
    ///
    /// # Errors
    ///
    /// [`RecordError::UnknownSchema`] or the first field failure.
    pub async fn open_record(
        &self,
        schema_name: &str,
        record: &mut Value,
    ) -> Result<(), RecordError> {
        let policies = self.policies.get(schema_name)?;
        open_fields(&self.codec, record, &policies).await
    }
}
