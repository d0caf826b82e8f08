//! Seal and open protected string fields inside JSON records.

use common::{EnvelopeError, FieldPolicy};
use serde_json::Value;

use super::schema::FieldPolicies;
use super::RecordError;
use crate::codec::EnvelopeCodec;

/// Value hook for one `keyruler-string` field.
///
/// `to_wire` runs before a record is serialised for transport and `from_wire`
/// after it is deserialised. Fields not flagged as PII pass through unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtectedString {
    policy: FieldPolicy,
}

impl ProtectedString {
    pub fn new(policy: FieldPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &FieldPolicy {
        &self.policy
    }

    /// Seal `value` under the field's context.
    ///
    /// # Errors
    ///
    /// Any [`EnvelopeCodec::seal`] error.
    pub async fn to_wire(
        &self,
        codec: &EnvelopeCodec,
        value: &str,
    ) -> Result<String, EnvelopeError> {
        if !self.policy.is_pii {
            return Ok(value.to_owned());
        }
        codec.seal(value.as_bytes(), &self.policy.context).await
    }

    /// Open a sealed wire value back to the original string.
    ///
    /// # Errors
    ///
    /// Any [`EnvelopeCodec::open_utf8`] error.
    pub async fn from_wire(
        &self,
        codec: &EnvelopeCodec,
        wire: &str,
    ) -> Result<String, EnvelopeError> {
        if !self.policy.is_pii {
            return Ok(wire.to_owned());
        }
        codec.open_utf8(wire).await
    }
}

#[derive(Clone, Copy)]
enum Direction {
    Seal,
    Open,
}

/// Seal every protected string leaf of `record` in place.
///
/// Missing fields and non-string leaves (such as the `null` branch of a
/// union) are left alone.
///
/// # Errors
///
/// Returns [`RecordError::Field`] naming the first path that failed; fields
/// processed before it remain sealed.
pub async fn seal_fields(
    codec: &EnvelopeCodec,
    record: &mut Value,
    policies: &FieldPolicies,
) -> Result<(), RecordError> {
    transform_fields(codec, record, policies, Direction::Seal).await
}

/// Open every protected string leaf of `record` in place.
///
/// # Errors
///
/// Returns [`RecordError::Field`] naming the first path that failed.
pub async fn open_fields(
    codec: &EnvelopeCodec,
    record: &mut Value,
    policies: &FieldPolicies,
) -> Result<(), RecordError> {
    transform_fields(codec, record, policies, Direction::Open).await
}

async fn transform_fields(
    codec: &EnvelopeCodec,
    record: &mut Value,
    policies: &FieldPolicies,
    direction: Direction,
) -> Result<(), RecordError> {
    for (path, policy) in policies {
        if !policy.is_pii {
            continue;
        }
        let field = ProtectedString::new(policy.clone());

        let segments = parse_path(path);
        let mut leaves = Vec::new();
        collect_leaves(record, &segments, &mut leaves);

        for leaf in leaves {
            let res = match direction {
                Direction::Seal => field.to_wire(codec, leaf.as_str()).await,
                Direction::Open => field.from_wire(codec, leaf.as_str()).await,
            };
            *leaf = res.map_err(|source| RecordError::Field {
                path: path.clone(),
                source,
            })?;
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Path traversal helpers
// ---------------------------------------------------------------------------

/// Segments of a dot-notation field path.
#[derive(Debug)]
enum PathSegment {
    /// Navigate into an object property by name.
    Key(String),
    /// Expand into every element of a JSON array.
    ArrayItem,
}

/// Parse a dot-notation path into [`PathSegment`]s.
///
/// `"orders[].card_number"` → `[Key("orders"), ArrayItem, Key("card_number")]`.
fn parse_path(path: &str) -> Vec<PathSegment> {
    let mut segments = Vec::new();
    for part in path.split('.') {
        let mut key = part;
        let mut arrays = 0;
        while let Some(stripped) = key.strip_suffix("[]") {
            key = stripped;
            arrays += 1;
        }
        if !key.is_empty() {
            segments.push(PathSegment::Key(key.to_owned()));
        }
        segments.extend((0..arrays).map(|_| PathSegment::ArrayItem));
    }
    segments
}

/// Collect mutable references to every string found at the end of `segments`.
fn collect_leaves<'a>(
    value: &'a mut Value,
    segments: &[PathSegment],
    out: &mut Vec<&'a mut String>,
) {
    match segments.split_first() {
        None => {
            if let Value::String(s) = value {
                out.push(s);
            }
        }
        Some((PathSegment::Key(key), rest)) => {
            if let Value::Object(map) = value {
                if let Some(child) = map.get_mut(key) {
                    collect_leaves(child, rest, out);
                }
            }
        }
        Some((PathSegment::ArrayItem, rest)) => {
            if let Value::Array(items) = value {
                for item in items.iter_mut() {
                    collect_leaves(item, rest, out);
                }
            }
        }
    }
}
