//! Protected field resolution from Avro record schemas.
//!
//! Given a record schema as JSON, this module produces the dot-notation paths
//! of every field whose type is the `keyruler-string` logical type, together
//! with the [`FieldPolicy`] declared on it.

use std::collections::BTreeMap;

use common::policy::{FieldPolicy, LOGICAL_TYPE};
use serde_json::Value;

use super::RecordError;

/// Dot-notation field path → policy.
///
/// Example paths: `"email"`, `"customer.address.zip"`, `"orders[].card_number"`.
pub type FieldPolicies = BTreeMap<String, FieldPolicy>;

/// Walk an Avro schema and collect every protected field.
///
/// Nested records extend the path with `.`, array items with a `[]` suffix on
/// the array field name, and union branches are walked with the field's own
/// path (so `["null", {keyruler-string}]` protects the field when non-null).
///
/// # Errors
///
/// Returns [`RecordError::InvalidSchema`] if a record lacks `fields`, a field
/// lacks `name` or `type`, or a protected type has no `context`.
pub fn resolve_protected_fields(schema: &Value) -> Result<FieldPolicies, RecordError> {
    let mut out = FieldPolicies::new();
    walk_type(schema, "", &mut out)?;
    Ok(out)
}

fn walk_type(ty: &Value, prefix: &str, out: &mut FieldPolicies) -> Result<(), RecordError> {
    match ty {
        // Union.
        Value::Array(branches) => {
            for branch in branches {
                walk_type(branch, prefix, out)?;
            }
        }
        Value::Object(obj) => {
            if obj.get("logicalType").and_then(Value::as_str) == Some(LOGICAL_TYPE) {
                if prefix.is_empty() {
                    return Err(RecordError::InvalidSchema(format!(
                        "{LOGICAL_TYPE} must be the type of a record field"
                    )));
                }
                let policy: FieldPolicy = serde_json::from_value(ty.clone())
                    .map_err(|e| RecordError::InvalidSchema(format!("{prefix}: {e}")))?;
                out.insert(prefix.to_owned(), policy);
                return Ok(());
            }

            match obj.get("type").and_then(Value::as_str) {
                Some("record") => {
                    let fields = obj.get("fields").and_then(Value::as_array).ok_or_else(|| {
                        RecordError::InvalidSchema(format!("record at '{prefix}' has no fields"))
                    })?;
                    for field in fields {
                        let name = field.get("name").and_then(Value::as_str).ok_or_else(|| {
                            RecordError::InvalidSchema(format!(
                                "field without name under '{prefix}'"
                            ))
                        })?;
                        let path = if prefix.is_empty() {
                            name.to_owned()
                        } else {
                            format!("{prefix}.{name}")
                        };
                        let field_type = field.get("type").ok_or_else(|| {
                            RecordError::InvalidSchema(format!("field '{path}' has no type"))
                        })?;
                        walk_type(field_type, &path, out)?;
                    }
                }
                Some("array") => {
                    if let Some(items) = obj.get("items") {
                        walk_type(items, &format!("{prefix}[]"), out)?;
                    }
                }
                _ => {}
            }
        }
        // Primitive names and named-type references carry no annotations.
        _ => {}
    }
    Ok(())
}
