//! Applies schema deltas to a concrete document.

use jsonshift_core::{Delta, SchemaInfo, diff, get_field_mut, parent_and_field};
use serde_json::Value;
use tracing::debug;

use crate::error::{MigrationError, Result};
use crate::rules::{UpdateContext, UpdateRule, UpdateRules};

/// Migrates a document from its source schema to the target schema.
///
/// The source document is never mutated: all changes are applied to a deep
/// copy, which becomes the result. Deltas are computed with
/// [`diff`](jsonshift_core::diff) and replayed in order; before anything is
/// applied, every delta that requires customization must have a rule, or
/// the call fails with [`MigrationError::MissingRule`].
///
/// # Examples
///
/// ```
/// use jsonshift_core::parse;
/// use jsonshift_migrate::{UpdateRules, migrate};
/// use serde_json::json;
///
/// let dialect = "https://json-schema.org/draft/2020-12/schema";
/// let v1 = format!(
///     r#"{{"$schema":"{dialect}","type":"object",
///         "properties":{{"s":{{"type":"string"}},"i":{{"type":"integer"}}}}}}"#
/// );
/// let v2 = format!(
///     r#"{{"$schema":"{dialect}","type":"object",
///         "properties":{{"i":{{"type":"integer"}},
///             "extra":{{"type":"string","x-declaredType":"string"}}}}}}"#
/// );
/// let source = parse(&v1).unwrap();
/// let target = parse(&v2).unwrap();
///
/// let document = json!({"s": "abc", "i": 23});
/// let migrated = migrate(&source, &target, &document, &UpdateRules::new()).unwrap();
/// assert_eq!(migrated, json!({"i": 23, "extra": ""}));
/// ```
pub fn migrate(
    source_schema: &SchemaInfo,
    target_schema: &SchemaInfo,
    source_document: &Value,
    rules: &UpdateRules,
) -> Result<Value> {
    let mut destination = source_document.clone();
    let context = UpdateContext::new(source_schema, target_schema, source_document);
    let deltas = diff(source_schema, target_schema);

    for delta in deltas.iter() {
        let rule = rules.get(delta.field_path());
        if delta.requires_customization() && rule.is_none() {
            return Err(MigrationError::MissingRule {
                field_path: delta.field_path().to_string(),
            });
        }
        debug!("applying delta at '{}'", delta.field_path());
        let segments: Vec<&str> = delta.field_path().split("[]").collect();
        apply_across_arrays(&context, delta, rule, &mut destination, &segments)?;
    }
    Ok(destination)
}

/// Recursively processes the segments of a delta path split on `[]`. A
/// single remaining segment is the leaf case; otherwise the first segment
/// names an array, and the rest of the path is applied to each of its
/// elements.
fn apply_across_arrays(
    context: &UpdateContext<'_>,
    delta: &Delta,
    rule: Option<&dyn UpdateRule>,
    node: &mut Value,
    segments: &[&str],
) -> Result<()> {
    match segments {
        [] => Ok(()),
        [leaf] => apply_leaf(context, delta, rule, node, leaf),
        [array_path, rest @ ..] => {
            let array_node = get_field_mut(array_path, node).ok_or_else(|| {
                MigrationError::ArrayNotFound {
                    path: (*array_path).to_string(),
                }
            })?;
            let Value::Array(elements) = array_node else {
                return Err(MigrationError::NotAnArray {
                    path: (*array_path).to_string(),
                });
            };
            debug!(
                elements = elements.len(),
                "fanning out '{}' across '{array_path}'",
                delta.field_path()
            );
            for element in elements.iter_mut() {
                apply_across_arrays(context, delta, rule, element, rest)?;
            }
            Ok(())
        }
    }
}

/// Applies one delta at a leaf location: `relative_path` is a `/`-separated
/// path (no `[]`) from `base` to the field to modify.
fn apply_leaf(
    context: &UpdateContext<'_>,
    delta: &Delta,
    rule: Option<&dyn UpdateRule>,
    base: &mut Value,
    relative_path: &str,
) -> Result<()> {
    let location =
        parent_and_field(relative_path, base).ok_or_else(|| MigrationError::FieldNotFound {
            path: relative_path.to_string(),
        })?;

    match delta {
        Delta::Drop { .. } => {
            location.remove();
        }
        Delta::DefaultingAdd { default_value, .. } => {
            let value = match rule {
                Some(rule) => rule.map_field(context, delta.field_path()),
                None => default_value.clone(),
            };
            location.set(value);
        }
        Delta::CustomAdd { .. } | Delta::Change { .. } => {
            // Guaranteed present by the up-front check in `migrate`.
            let Some(rule) = rule else {
                return Err(MigrationError::MissingRule {
                    field_path: delta.field_path().to_string(),
                });
            };
            location.set(rule.map_field(context, delta.field_path()));
        }
    }
    Ok(())
}
