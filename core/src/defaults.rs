//! Default values for added fields, keyed by declared type.
//!
//! When the differ sees a field that exists only in the target schema, it
//! asks this registry whether the field's declared type has a sensible
//! context-free default. Types with one become
//! [`DefaultingAdd`](crate::Delta::DefaultingAdd) deltas; types without one
//! become [`CustomAdd`](crate::Delta::CustomAdd) and force the caller to
//! supply a rule.
//!
//! Declared types are logical tags carried on the `x-declaredType`
//! annotation: `bool`, `int32`, `string`, `optional<T>`, `list<T>`,
//! `set<T>`, `map<K,V>`, or any user-defined name. Generic parameters are
//! stripped before matching, so `list<string>` defaults the same way `list`
//! does.

use std::collections::HashMap;

use serde_json::{Value, json};

/// A kind of declared type with a known canonical default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeKind {
    Boolean,
    SignedInteger,
    UnsignedInteger,
    Float,
    String,
    Optional,
    List,
    Set,
}

fn builtin_tags(kind: TypeKind) -> &'static [&'static str] {
    match kind {
        TypeKind::Boolean => &["bool", "boolean"],
        TypeKind::SignedInteger => &["int8", "int16", "int32", "int64"],
        TypeKind::UnsignedInteger => &["uint8", "uint16", "uint32", "uint64"],
        TypeKind::Float => &["float32", "float64"],
        TypeKind::String => &["string"],
        TypeKind::Optional => &["optional"],
        TypeKind::List => &["list"],
        TypeKind::Set => &["set"],
    }
}

/// Strips generic parameters from a declared-type tag: `list<string>` →
/// `list`.
fn base_tag(declared_type: &str) -> &str {
    match declared_type.find('<') {
        Some(index) => declared_type[..index].trim(),
        None => declared_type.trim(),
    }
}

/// Maps declared types to canonical "empty" JSON values.
///
/// Entries are tried in a fixed priority order. Matching is a subtype
/// relation rather than string equality: each [`TypeKind`] owns a set of tag
/// names, and [`register_subtype`](Self::register_subtype) attaches further
/// names, so a user-defined refinement of a defaultable kind still resolves.
///
/// # Examples
///
/// ```
/// use jsonshift_core::{DefaultValueRegistry, TypeKind};
/// use serde_json::json;
///
/// let mut registry = DefaultValueRegistry::new();
/// assert_eq!(registry.default_for("string"), Some(json!("")));
/// assert_eq!(registry.default_for("list<int32>"), Some(json!([])));
/// assert_eq!(registry.default_for("Customer"), None);
///
/// registry.register_subtype("ring_buffer", TypeKind::List);
/// assert_eq!(registry.default_for("ring_buffer<f64>"), Some(json!([])));
/// ```
#[derive(Debug, Clone)]
pub struct DefaultValueRegistry {
    entries: Vec<(TypeKind, Value)>,
    subtypes: HashMap<String, TypeKind>,
}

impl Default for DefaultValueRegistry {
    fn default() -> Self {
        Self {
            entries: vec![
                (TypeKind::Boolean, json!(false)),
                (TypeKind::SignedInteger, json!(0)),
                (TypeKind::UnsignedInteger, json!(0)),
                (TypeKind::Float, json!(0.0)),
                (TypeKind::String, json!("")),
                (TypeKind::Optional, json!(null)),
                (TypeKind::List, json!([])),
                (TypeKind::Set, json!([])),
            ],
            subtypes: HashMap::new(),
        }
    }
}

impl DefaultValueRegistry {
    /// Creates a registry with the standard defaultable kinds.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an additional tag name as a subtype of a known kind, so
    /// that declared types using it resolve to that kind's default.
    pub fn register_subtype(&mut self, tag: impl Into<String>, kind: TypeKind) {
        self.subtypes.insert(tag.into(), kind);
    }

    /// Finds the canonical default for a declared type, if one applies.
    ///
    /// Returns `None` for unknown tags, which makes the corresponding
    /// addition require caller customization.
    pub fn default_for(&self, declared_type: &str) -> Option<Value> {
        let base = base_tag(declared_type);
        self.entries
            .iter()
            .find(|(kind, _)| self.matches(*kind, base))
            .map(|(_, value)| value.clone())
    }

    fn matches(&self, kind: TypeKind, base: &str) -> bool {
        builtin_tags(kind).contains(&base) || self.subtypes.get(base) == Some(&kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_defaults_to_empty() {
        let registry = DefaultValueRegistry::new();
        assert_eq!(registry.default_for("string"), Some(json!("")));
    }

    #[test]
    fn test_integer_defaults_to_zero() {
        let registry = DefaultValueRegistry::new();
        assert_eq!(registry.default_for("int32"), Some(json!(0)));
        assert_eq!(registry.default_for("int64"), Some(json!(0)));
        assert_eq!(registry.default_for("uint8"), Some(json!(0)));
    }

    #[test]
    fn test_float_defaults_to_zero_point_zero() {
        let registry = DefaultValueRegistry::new();
        assert_eq!(registry.default_for("float64"), Some(json!(0.0)));
    }

    #[test]
    fn test_boolean_defaults_to_false() {
        let registry = DefaultValueRegistry::new();
        assert_eq!(registry.default_for("bool"), Some(json!(false)));
    }

    #[test]
    fn test_optional_defaults_to_null() {
        let registry = DefaultValueRegistry::new();
        assert_eq!(registry.default_for("optional<string>"), Some(json!(null)));
        assert_eq!(
            registry.default_for("optional<list<int32>>"),
            Some(json!(null))
        );
    }

    #[test]
    fn test_collections_default_to_empty_array() {
        let registry = DefaultValueRegistry::new();
        assert_eq!(registry.default_for("list<string>"), Some(json!([])));
        assert_eq!(registry.default_for("set<int32>"), Some(json!([])));
    }

    #[test]
    fn test_unknown_type_has_no_default() {
        let registry = DefaultValueRegistry::new();
        assert_eq!(registry.default_for("Customer"), None);
        assert_eq!(registry.default_for("map<string,string>"), None);
    }

    #[test]
    fn test_registered_subtype_resolves() {
        let mut registry = DefaultValueRegistry::new();
        assert_eq!(registry.default_for("deque<string>"), None);
        registry.register_subtype("deque", TypeKind::List);
        assert_eq!(registry.default_for("deque<string>"), Some(json!([])));
    }

    #[test]
    fn test_generic_parameters_are_stripped() {
        let registry = DefaultValueRegistry::new();
        assert_eq!(registry.default_for("list < string >"), Some(json!([])));
    }
}
