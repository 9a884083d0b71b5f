//! Recursive structural comparison of two resolved schemas.
//!
//! The differ walks both property trees together and emits a minimal,
//! path-addressed [`SchemaDeltas`] list. Wherever both sides of a changed
//! field can be narrowed (both object-shaped, or both array-shaped with
//! object-shaped elements) it recurses instead of reporting a coarse
//! change at the outer field. This is what lets the migrator apply most
//! schema evolutions with zero caller-supplied code: "add field `t` inside
//! every element of `widgets`" instead of "the whole `widgets` list
//! changed".
//!
//! `anyOf` and self-reference nodes are compared by structural equality
//! only; narrowing into alternatives and rename detection are out of scope,
//! so a rename surfaces as an independent drop plus add.

use tracing::debug;

use crate::defaults::DefaultValueRegistry;
use crate::delta::{Delta, SchemaDeltas};
use crate::types::{Properties, SchemaInfo, Subschema};

/// Compares two schemas and reports the differences, classifying additions
/// through the standard [`DefaultValueRegistry`].
///
/// Output order is deterministic: the union of field names in declaration
/// order (source fields first, then target-only fields in the target's
/// order), applied recursively.
///
/// # Examples
///
/// ```
/// use jsonshift_core::{diff, parse};
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
/// let deltas = diff(&source, &target);
/// assert_eq!(deltas.len(), 2);
/// assert_eq!(deltas.drops().count(), 1);
/// assert_eq!(deltas.adds().count(), 1);
/// assert!(diff(&source, &source).is_empty());
/// ```
pub fn diff(source: &SchemaInfo, target: &SchemaInfo) -> SchemaDeltas {
    diff_with_registry(source, target, &DefaultValueRegistry::new())
}

/// [`diff`] with a caller-configured registry (extra defaultable subtypes).
pub fn diff_with_registry(
    source: &SchemaInfo,
    target: &SchemaInfo,
    registry: &DefaultValueRegistry,
) -> SchemaDeltas {
    let mut deltas = SchemaDeltas::new();
    diff_properties(registry, &mut deltas, "", source.root(), target.root());
    debug!(deltas = deltas.len(), "schema diff complete");
    deltas
}

/// Compares two property sets at one level, appending deltas for the
/// differences. `prefix` is the already-composed path to this level.
fn diff_properties(
    registry: &DefaultValueRegistry,
    deltas: &mut SchemaDeltas,
    prefix: &str,
    source: &Properties,
    target: &Properties,
) {
    let mut field_names: Vec<&str> = source.names().collect();
    for name in target.names() {
        if !field_names.contains(&name) {
            field_names.push(name);
        }
    }

    for name in field_names {
        match (source.get(name), target.get(name)) {
            (Some(source_schema), None) => {
                deltas.push(Delta::Drop {
                    field_path: format!("{prefix}{name}"),
                    schema: source_schema.clone(),
                });
            }
            (None, Some(target_schema)) => {
                deltas.push(classify_add(registry, format!("{prefix}{name}"), target_schema));
            }
            (Some(source_schema), Some(target_schema)) => {
                if source_schema == target_schema {
                    continue;
                }
                diff_changed_field(registry, deltas, prefix, name, source_schema, target_schema);
            }
            (None, None) => unreachable!("field name came from one of the two sides"),
        }
    }
}

/// An added field defaults automatically only when its declared type has a
/// registered default; otherwise the caller must supply a rule.
fn classify_add(
    registry: &DefaultValueRegistry,
    field_path: String,
    target_schema: &Subschema,
) -> Delta {
    let default_value = target_schema
        .declared_type()
        .and_then(|tag| registry.default_for(tag));
    match default_value {
        Some(default_value) => Delta::DefaultingAdd {
            field_path,
            schema: target_schema.clone(),
            default_value,
        },
        None => Delta::CustomAdd {
            field_path,
            schema: target_schema.clone(),
        },
    }
}

/// Narrows a changed field before reporting a leaf change: recurse into
/// matching object shapes, then into matching array-of-object shapes, and
/// only then give up and report the change at this level.
fn diff_changed_field(
    registry: &DefaultValueRegistry,
    deltas: &mut SchemaDeltas,
    prefix: &str,
    name: &str,
    source_schema: &Subschema,
    target_schema: &Subschema,
) {
    if let (Some(source_normal), Some(target_normal)) =
        (source_schema.as_normal(), target_schema.as_normal())
    {
        if let (Some(source_props), Some(target_props)) =
            (source_normal.properties(), target_normal.properties())
        {
            let inner_prefix = format!("{prefix}{name}/");
            diff_properties(registry, deltas, &inner_prefix, source_props, target_props);
            return;
        }

        if let (Some(source_items), Some(target_items)) =
            (source_normal.items(), target_normal.items())
        {
            if let (Some(source_item_normal), Some(target_item_normal)) =
                (source_items.as_normal(), target_items.as_normal())
            {
                if let (Some(source_item_props), Some(target_item_props)) = (
                    source_item_normal.properties(),
                    target_item_normal.properties(),
                ) {
                    let inner_prefix = format!("{prefix}{name}[]");
                    diff_properties(
                        registry,
                        deltas,
                        &inner_prefix,
                        source_item_props,
                        target_item_props,
                    );
                    return;
                }
            }
        }
    }

    debug!("reporting leaf change at '{prefix}{name}'");
    deltas.push(Delta::Change {
        field_path: format!("{prefix}{name}"),
        from: source_schema.clone(),
        to: target_schema.clone(),
    });
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::parse;

    use super::*;

    const DIALECT: &str = "https://json-schema.org/draft/2020-12/schema";

    fn schema_of(properties: serde_json::Value) -> SchemaInfo {
        let text = json!({
            "$schema": DIALECT,
            "type": "object",
            "properties": properties,
        })
        .to_string();
        parse(&text).expect("test schema must parse")
    }

    fn paths(deltas: &SchemaDeltas) -> Vec<&str> {
        deltas.iter().map(Delta::field_path).collect()
    }

    #[test]
    fn test_identical_schemas_produce_no_deltas() {
        let schema = schema_of(json!({
            "s": {"type": "string"},
            "i": {"type": "integer"},
        }));
        assert!(diff(&schema, &schema).is_empty());
    }

    #[test]
    fn test_structurally_equal_schemas_produce_no_deltas() {
        // Same shape parsed twice; only structure matters.
        let a = schema_of(json!({"s": {"type": "string"}}));
        let b = schema_of(json!({"s": {"type": "string"}}));
        assert!(diff(&a, &b).is_empty());
    }

    #[test]
    fn test_removed_field_is_a_drop() {
        let v1 = schema_of(json!({"s": {"type": "string"}, "i": {"type": "integer"}}));
        let v2 = schema_of(json!({"i": {"type": "integer"}}));
        let deltas = diff(&v1, &v2);
        assert_eq!(paths(&deltas), vec!["s"]);
        assert!(deltas.iter().all(Delta::is_drop));
    }

    #[test]
    fn test_added_field_with_default_is_a_defaulting_add() {
        let v1 = schema_of(json!({"i": {"type": "integer"}}));
        let v2 = schema_of(json!({
            "i": {"type": "integer"},
            "extra": {"type": "string", "x-declaredType": "string"},
        }));
        let deltas = diff(&v1, &v2);
        assert_eq!(deltas.len(), 1);
        match deltas.iter().next().unwrap() {
            Delta::DefaultingAdd {
                field_path,
                default_value,
                ..
            } => {
                assert_eq!(field_path, "extra");
                assert_eq!(default_value, &json!(""));
            }
            other => panic!("expected a defaulting add, got {other:?}"),
        }
    }

    #[test]
    fn test_added_field_without_default_is_a_custom_add() {
        let v1 = schema_of(json!({"i": {"type": "integer"}}));
        let v2 = schema_of(json!({
            "i": {"type": "integer"},
            "extra": {"type": "object", "x-declaredType": "Customer"},
        }));
        let deltas = diff(&v1, &v2);
        assert_eq!(deltas.len(), 1);
        let delta = deltas.iter().next().unwrap();
        assert!(matches!(delta, Delta::CustomAdd { .. }));
        assert!(delta.requires_customization());
    }

    #[test]
    fn test_added_field_without_annotation_is_a_custom_add() {
        let v1 = schema_of(json!({"i": {"type": "integer"}}));
        let v2 = schema_of(json!({
            "i": {"type": "integer"},
            "extra": {"type": "string"},
        }));
        let deltas = diff(&v1, &v2);
        assert!(matches!(
            deltas.iter().next().unwrap(),
            Delta::CustomAdd { .. }
        ));
    }

    #[test]
    fn test_drop_add_symmetry() {
        let a = schema_of(json!({"shared": {"type": "integer"}, "only": {"type": "string"}}));
        let b = schema_of(json!({"shared": {"type": "integer"}}));
        let forward = diff(&a, &b);
        assert_eq!(forward.drops().count(), 1);
        assert_eq!(forward.iter().next().unwrap().field_path(), "only");

        let backward = diff(&b, &a);
        assert_eq!(backward.adds().count(), 1);
        assert_eq!(backward.iter().next().unwrap().field_path(), "only");
    }

    #[test]
    fn test_scalar_type_change_is_a_leaf_change() {
        let v1 = schema_of(json!({"count": {"type": "integer"}}));
        let v2 = schema_of(json!({"count": {"type": "string"}}));
        let deltas = diff(&v1, &v2);
        assert_eq!(deltas.changes().count(), 1);
        assert_eq!(deltas.iter().next().unwrap().field_path(), "count");
    }

    #[test]
    fn test_nested_object_change_recurses_instead_of_leaf_change() {
        let v1 = schema_of(json!({
            "shelfNumber": {"type": "integer"},
            "widget": {"type": "object", "properties": {
                "name": {"type": "string"},
                "shoeSize": {"type": "integer"},
            }},
        }));
        let v2 = schema_of(json!({
            "shelfNumber": {"type": "integer"},
            "widget": {"type": "object", "properties": {
                "name": {"type": "string"},
                "soleShape": {"type": "string", "x-declaredType": "string"},
            }},
        }));
        let deltas = diff(&v1, &v2);
        assert_eq!(paths(&deltas), vec!["widget/shoeSize", "widget/soleShape"]);
        assert_eq!(deltas.drops().count(), 1);
        assert_eq!(deltas.adds().count(), 1);
    }

    #[test]
    fn test_array_item_change_recurses_with_fan_out_path() {
        let v1 = schema_of(json!({
            "widgets": {"type": "array", "items": {"type": "object", "properties": {
                "s": {"type": "string"},
            }}},
        }));
        let v2 = schema_of(json!({
            "widgets": {"type": "array", "items": {"type": "object", "properties": {
                "s": {"type": "string"},
                "t": {"type": "string", "x-declaredType": "string"},
            }}},
        }));
        let deltas = diff(&v1, &v2);
        assert_eq!(paths(&deltas), vec!["widgets[]t"]);
    }

    #[test]
    fn test_doubly_nested_arrays_compose_fan_out_paths() {
        let item = |extra: bool| {
            let mut properties = json!({"color": {"type": "string"}});
            if extra {
                properties["size"] = json!({"type": "string", "x-declaredType": "string"});
            }
            json!({"type": "object", "properties": properties})
        };
        let v1 = schema_of(json!({
            "boxes": {"type": "array", "items": {"type": "object", "properties": {
                "label": {"type": "string"},
                "items": {"type": "array", "items": item(false)},
            }}},
        }));
        let v2 = schema_of(json!({
            "boxes": {"type": "array", "items": {"type": "object", "properties": {
                "label": {"type": "string"},
                "items": {"type": "array", "items": item(true)},
            }}},
        }));
        let deltas = diff(&v1, &v2);
        assert_eq!(paths(&deltas), vec!["boxes[]items[]size"]);
    }

    #[test]
    fn test_array_of_scalars_change_is_a_leaf_change() {
        let v1 = schema_of(json!({
            "tags": {"type": "array", "items": {"type": "string"}},
        }));
        let v2 = schema_of(json!({
            "tags": {"type": "array", "items": {"type": "integer"}},
        }));
        let deltas = diff(&v1, &v2);
        assert_eq!(deltas.changes().count(), 1);
        assert_eq!(deltas.iter().next().unwrap().field_path(), "tags");
    }

    #[test]
    fn test_map_value_type_change_is_a_leaf_change() {
        // Map value types are opaque to the schema model; only the declared
        // type annotation distinguishes them.
        let v1 = schema_of(json!({
            "metadata": {"type": "object", "x-declaredType": "map<string,string>"},
        }));
        let v2 = schema_of(json!({
            "metadata": {"type": "object", "x-declaredType": "map<string,int64>"},
        }));
        let deltas = diff(&v1, &v2);
        assert_eq!(deltas.changes().count(), 1);
        assert_eq!(deltas.iter().next().unwrap().field_path(), "metadata");
    }

    #[test]
    fn test_rename_reports_independent_drop_and_add() {
        // Rename detection is intentionally absent: the caller gets two
        // deltas and wires them together with a rule.
        let v1 = schema_of(json!({"name": {"type": "string"}, "value": {"type": "integer"}}));
        let v2 = schema_of(json!({
            "fullName": {"type": "string"},
            "value": {"type": "integer"},
        }));
        let deltas = diff(&v1, &v2);
        assert_eq!(paths(&deltas), vec!["name", "fullName"]);
        assert_eq!(deltas.drops().count(), 1);
        assert_eq!(deltas.adds().count(), 1);
    }

    #[test]
    fn test_equal_any_of_produces_no_delta() {
        let any_of = json!({"anyOf": [
            {"type": "object", "properties": {"radius": {"type": "number"}}},
            {"type": "object", "properties": {"width": {"type": "number"}}},
        ]});
        let v1 = schema_of(json!({"shape": any_of.clone()}));
        let v2 = schema_of(json!({"shape": any_of}));
        assert!(diff(&v1, &v2).is_empty());
    }

    #[test]
    fn test_changed_any_of_is_a_leaf_change() {
        // No narrowing into alternatives: the whole anyOf reports as one
        // change.
        let v1 = schema_of(json!({"shape": {"anyOf": [
            {"type": "object", "properties": {"radius": {"type": "number"}}},
        ]}}));
        let v2 = schema_of(json!({"shape": {"anyOf": [
            {"type": "object", "properties": {"radius": {"type": "number"}}},
            {"type": "object", "properties": {"width": {"type": "number"}}},
        ]}}));
        let deltas = diff(&v1, &v2);
        assert_eq!(deltas.changes().count(), 1);
        assert_eq!(deltas.iter().next().unwrap().field_path(), "shape");
    }

    #[test]
    fn test_registry_subtype_changes_add_classification() {
        let v1 = schema_of(json!({"i": {"type": "integer"}}));
        let v2 = schema_of(json!({
            "i": {"type": "integer"},
            "history": {"type": "array", "x-declaredType": "ring_buffer<int64>"},
        }));

        let plain = diff(&v1, &v2);
        assert!(matches!(
            plain.iter().next().unwrap(),
            Delta::CustomAdd { .. }
        ));

        let mut registry = DefaultValueRegistry::new();
        registry.register_subtype("ring_buffer", crate::TypeKind::List);
        let informed = diff_with_registry(&v1, &v2, &registry);
        match informed.iter().next().unwrap() {
            Delta::DefaultingAdd { default_value, .. } => {
                assert_eq!(default_value, &json!([]));
            }
            other => panic!("expected a defaulting add, got {other:?}"),
        }
    }

    #[test]
    fn test_output_order_is_source_then_target_only() {
        let v1 = schema_of(json!({
            "a": {"type": "string"},
            "b": {"type": "string"},
        }));
        let v2 = schema_of(json!({
            "c": {"type": "string", "x-declaredType": "string"},
            "b": {"type": "integer"},
            "d": {"type": "string", "x-declaredType": "string"},
        }));
        let deltas = diff(&v1, &v2);
        assert_eq!(paths(&deltas), vec!["a", "b", "c", "d"]);
    }
}
