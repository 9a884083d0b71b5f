//! Schema model type definitions.
//!
//! This module defines the data model for a parsed schema: the
//! [`Subschema`] tree with its four shapes (normal, reference,
//! self-reference, any-of), the [`Properties`] map that preserves source
//! declaration order, and [`SchemaInfo`] as the root of a parsed schema.
//!
//! A fully parsed [`SchemaInfo`] never contains a [`Subschema::Reference`]:
//! the parser replaces every reference with its resolved definition, or with
//! a [`Subschema::SelfReference`] marker when the reference points back into
//! a definition that is still being resolved (a cyclic type).

use serde::Serialize;

/// One of the primitive type keywords a schema node may declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PrimitiveType {
    Object,
    Array,
    String,
    Number,
    Integer,
    Boolean,
    Null,
}

impl PrimitiveType {
    /// Maps a JSON Schema `type` keyword to a primitive type.
    ///
    /// Returns `None` for keywords outside the supported set.
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "object" => Some(Self::Object),
            "array" => Some(Self::Array),
            "string" => Some(Self::String),
            "number" => Some(Self::Number),
            "integer" => Some(Self::Integer),
            "boolean" => Some(Self::Boolean),
            "null" => Some(Self::Null),
            _ => None,
        }
    }

    /// The JSON Schema keyword for this primitive type.
    pub fn keyword(&self) -> &'static str {
        match self {
            Self::Object => "object",
            Self::Array => "array",
            Self::String => "string",
            Self::Number => "number",
            Self::Integer => "integer",
            Self::Boolean => "boolean",
            Self::Null => "null",
        }
    }
}

/// The set of primitive types a subschema accepts.
///
/// Source order is preserved for display, but equality is set equality:
/// `["string","null"]` and `["null","string"]` describe the same types.
///
/// # Examples
///
/// ```
/// use jsonshift_core::{PrimitiveType, Types};
///
/// let a = Types::new(vec![PrimitiveType::String, PrimitiveType::Null]);
/// let b = Types::new(vec![PrimitiveType::Null, PrimitiveType::String]);
/// assert_eq!(a, b);
/// ```
#[derive(Debug, Clone, Eq, Serialize)]
pub struct Types {
    types: Vec<PrimitiveType>,
}

impl Types {
    /// Creates a type set, deduplicating while preserving first-seen order.
    pub fn new(types: Vec<PrimitiveType>) -> Self {
        let mut deduped = Vec::with_capacity(types.len());
        for t in types {
            if !deduped.contains(&t) {
                deduped.push(t);
            }
        }
        Self { types: deduped }
    }

    /// Creates a type set holding a single primitive type.
    pub fn single(primitive: PrimitiveType) -> Self {
        Self {
            types: vec![primitive],
        }
    }

    pub fn contains(&self, primitive: PrimitiveType) -> bool {
        self.types.contains(&primitive)
    }

    pub fn iter(&self) -> impl Iterator<Item = PrimitiveType> + '_ {
        self.types.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

impl PartialEq for Types {
    fn eq(&self, other: &Self) -> bool {
        self.types.len() == other.types.len()
            && self.types.iter().all(|t| other.types.contains(t))
    }
}

/// The allowed values of a string enum.
///
/// Only string-valued enums are supported; the parser rejects anything else.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnumValues {
    values: Vec<String>,
}

impl EnumValues {
    pub fn new(values: Vec<String>) -> Self {
        Self { values }
    }

    pub fn values(&self) -> &[String] {
        &self.values
    }
}

/// An ordered map from field name to [`Subschema`].
///
/// Declaration order from the source schema is preserved; the differ's
/// output order depends on it. Equality is structural (deep) equality over
/// all fields, independent of declaration order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Properties {
    entries: Vec<(String, Subschema)>,
}

impl Properties {
    pub fn new(entries: Vec<(String, Subschema)>) -> Self {
        Self { entries }
    }

    /// Looks up a field's subschema by name.
    pub fn get(&self, name: &str) -> Option<&Subschema> {
        self.entries
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, subschema)| subschema)
    }

    /// Inserts a field, replacing in place on name collision (preserving the
    /// original position) and appending otherwise.
    pub fn insert(&mut self, name: String, subschema: Subschema) {
        match self.entries.iter_mut().find(|(key, _)| *key == name) {
            Some(entry) => entry.1 = subschema,
            None => self.entries.push((name, subschema)),
        }
    }

    /// Iterates fields in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Subschema)> {
        self.entries
            .iter()
            .map(|(name, subschema)| (name.as_str(), subschema))
    }

    /// Iterates field names in declaration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns true if every child subschema is resolved.
    pub fn all_resolved(&self) -> bool {
        self.entries
            .iter()
            .all(|(_, subschema)| subschema.is_resolved())
    }
}

impl PartialEq for Properties {
    fn eq(&self, other: &Self) -> bool {
        self.entries.len() == other.entries.len()
            && self
                .entries
                .iter()
                .all(|(name, subschema)| other.get(name) == Some(subschema))
    }
}

/// An ordinary schema node: the description of one specific shape.
#[derive(Debug, Clone, Serialize)]
pub struct NormalSubschema {
    types: Option<Types>,
    properties: Option<Properties>,
    items: Option<Box<Subschema>>,
    enum_values: Option<EnumValues>,
    declared_type: Option<String>,
    const_value: Option<String>,
    #[serde(skip)]
    resolved: bool,
    in_cycle: bool,
}

impl NormalSubschema {
    /// Builds a node from its parts, computing resolvedness from the
    /// children: a node is resolved once its `items` and all of its
    /// `properties` are.
    pub fn from_fields(
        in_cycle: bool,
        types: Option<Types>,
        properties: Option<Properties>,
        items: Option<Box<Subschema>>,
        enum_values: Option<EnumValues>,
        declared_type: Option<String>,
        const_value: Option<String>,
    ) -> Self {
        let resolved = items.as_deref().is_none_or(Subschema::is_resolved)
            && properties.as_ref().is_none_or(Properties::all_resolved);
        Self {
            types,
            properties,
            items,
            enum_values,
            declared_type,
            const_value,
            resolved,
            in_cycle,
        }
    }

    pub fn types(&self) -> Option<&Types> {
        self.types.as_ref()
    }

    pub fn properties(&self) -> Option<&Properties> {
        self.properties.as_ref()
    }

    pub fn items(&self) -> Option<&Subschema> {
        self.items.as_deref()
    }

    pub fn enum_values(&self) -> Option<&EnumValues> {
        self.enum_values.as_ref()
    }

    pub fn declared_type(&self) -> Option<&str> {
        self.declared_type.as_deref()
    }

    pub fn const_value(&self) -> Option<&str> {
        self.const_value.as_deref()
    }

    pub fn is_resolved(&self) -> bool {
        self.resolved
    }

    pub fn in_cycle(&self) -> bool {
        self.in_cycle
    }

    /// Returns a copy with the given declared-type annotation, if one is
    /// supplied. Used when a `$ref` node carries its own annotation, which
    /// overrides the target's.
    pub fn with_declared_type(&self, declared_type: Option<String>) -> Self {
        let mut copy = self.clone();
        if declared_type.is_some() {
            copy.declared_type = declared_type;
        }
        copy
    }

    /// Merges the sibling keywords carried by a reference into this node.
    ///
    /// Sibling `properties` win over inherited ones on key collision; a
    /// sibling `type` replaces the inherited one; a sibling declared-type
    /// annotation overrides the target's.
    pub fn merged_with_overrides(
        &self,
        override_types: Option<&Types>,
        override_properties: Option<&Properties>,
        override_declared_type: Option<&str>,
    ) -> Self {
        let types = override_types.cloned().or_else(|| self.types.clone());
        let properties = match override_properties {
            Some(overrides) => {
                let mut merged = self.properties.clone().unwrap_or_default();
                for (name, subschema) in overrides.iter() {
                    merged.insert(name.to_string(), subschema.clone());
                }
                Some(merged)
            }
            None => self.properties.clone(),
        };
        let declared_type = override_declared_type
            .map(str::to_string)
            .or_else(|| self.declared_type.clone());
        Self::from_fields(
            self.in_cycle,
            types,
            properties,
            self.items.clone(),
            self.enum_values.clone(),
            declared_type,
            self.const_value.clone(),
        )
    }
}

// Resolvedness and cycle markers are parse-time bookkeeping; two nodes are
// equal when they describe the same shape.
impl PartialEq for NormalSubschema {
    fn eq(&self, other: &Self) -> bool {
        self.types == other.types
            && self.properties == other.properties
            && self.items == other.items
            && self.enum_values == other.enum_values
            && self.declared_type == other.declared_type
            && self.const_value == other.const_value
    }
}

/// An unresolved pointer to a named definition in `$defs`.
///
/// Only exists transiently during parsing; a fully parsed schema contains no
/// references. Sibling keywords that accompany the `$ref` are captured here
/// and merged into the target when the reference resolves.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reference {
    name: String,
    declared_type: Option<String>,
    override_types: Option<Types>,
    override_properties: Option<Properties>,
}

impl Reference {
    /// Creates a bare reference with no sibling overrides.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            declared_type: None,
            override_types: None,
            override_properties: None,
        }
    }

    /// Creates a reference carrying sibling keywords for a later merge.
    pub fn with_overrides(
        name: impl Into<String>,
        declared_type: Option<String>,
        override_types: Option<Types>,
        override_properties: Option<Properties>,
    ) -> Self {
        Self {
            name: name.into(),
            declared_type,
            override_types,
            override_properties,
        }
    }

    /// The definition name: just the part after `#/$defs/`.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn declared_type(&self) -> Option<&str> {
        self.declared_type.as_deref()
    }

    pub fn override_types(&self) -> Option<&Types> {
        self.override_types.as_ref()
    }

    pub fn override_properties(&self) -> Option<&Properties> {
        self.override_properties.as_ref()
    }

    /// Returns true if sibling `type` or `properties` keywords were captured.
    pub fn has_overrides(&self) -> bool {
        self.override_types.is_some() || self.override_properties.is_some()
    }
}

/// A set of alternative shapes, exactly one of which applies.
///
/// Used for polymorphic variants, where each option typically carries a
/// `const` discriminator field.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnyOfSubschema {
    options: Vec<Subschema>,
    declared_type: Option<String>,
}

impl AnyOfSubschema {
    pub fn new(options: Vec<Subschema>, declared_type: Option<String>) -> Self {
        Self {
            options,
            declared_type,
        }
    }

    pub fn options(&self) -> &[Subschema] {
        &self.options
    }

    pub fn declared_type(&self) -> Option<&str> {
        self.declared_type.as_deref()
    }

    pub fn is_resolved(&self) -> bool {
        self.options.iter().all(Subschema::is_resolved)
    }

    pub fn in_cycle(&self) -> bool {
        self.options.iter().any(Subschema::in_cycle)
    }
}

/// One node of a parsed schema tree.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum Subschema {
    /// An ordinary schema node.
    Normal(NormalSubschema),
    /// An unresolved pointer to a named definition (never survives parsing).
    Reference(Reference),
    /// A terminal marker: this subtree equals the named definition, which is
    /// currently being constructed higher up the resolution chain. Never
    /// expanded further.
    SelfReference { name: String },
    /// A set of alternative shapes, exactly one of which applies.
    AnyOf(AnyOfSubschema),
}

impl Subschema {
    pub fn is_resolved(&self) -> bool {
        match self {
            Self::Normal(normal) => normal.is_resolved(),
            Self::Reference(_) => false,
            Self::SelfReference { .. } => true,
            Self::AnyOf(any_of) => any_of.is_resolved(),
        }
    }

    pub fn in_cycle(&self) -> bool {
        match self {
            Self::Normal(normal) => normal.in_cycle(),
            Self::Reference(_) => false,
            Self::SelfReference { .. } => true,
            Self::AnyOf(any_of) => any_of.in_cycle(),
        }
    }

    /// The declared-type annotation carried by this node, if any.
    pub fn declared_type(&self) -> Option<&str> {
        match self {
            Self::Normal(normal) => normal.declared_type(),
            Self::Reference(reference) => reference.declared_type(),
            Self::SelfReference { .. } => None,
            Self::AnyOf(any_of) => any_of.declared_type(),
        }
    }

    pub fn as_normal(&self) -> Option<&NormalSubschema> {
        match self {
            Self::Normal(normal) => Some(normal),
            _ => None,
        }
    }
}

/// An ordered map from definition name to [`Subschema`].
///
/// This is the `$defs` table. During parsing it doubles as the memoization
/// table for reference resolution: each definition is resolved at most once
/// and written back in place.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Definitions {
    entries: Vec<(String, Subschema)>,
}

impl Definitions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&Subschema> {
        self.entries
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, subschema)| subschema)
    }

    /// Inserts a definition, replacing in place on name collision.
    pub fn insert(&mut self, name: String, subschema: Subschema) {
        match self.entries.iter_mut().find(|(key, _)| *key == name) {
            Some(entry) => entry.1 = subschema,
            None => self.entries.push((name, subschema)),
        }
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Subschema)> {
        self.entries
            .iter()
            .map(|(name, subschema)| (name.as_str(), subschema))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A fully parsed schema: the dialect marker, the resolved definitions
/// table, and the top-level property set.
///
/// Immutable once parsing completes; safe to share read-only across
/// concurrent diff/migrate calls.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SchemaInfo {
    version: String,
    defs: Definitions,
    root: Properties,
}

impl SchemaInfo {
    pub fn new(version: String, defs: Definitions, root: Properties) -> Self {
        Self {
            version,
            defs,
            root,
        }
    }

    /// The `$schema` dialect string, copied verbatim from the source.
    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn defs(&self) -> &Definitions {
        &self.defs
    }

    /// The top-level property set.
    pub fn root(&self) -> &Properties {
        &self.root
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn string_node() -> Subschema {
        Subschema::Normal(NormalSubschema::from_fields(
            false,
            Some(Types::single(PrimitiveType::String)),
            None,
            None,
            None,
            None,
            None,
        ))
    }

    fn integer_node() -> Subschema {
        Subschema::Normal(NormalSubschema::from_fields(
            false,
            Some(Types::single(PrimitiveType::Integer)),
            None,
            None,
            None,
            None,
            None,
        ))
    }

    #[test]
    fn test_types_equality_ignores_order() {
        let a = Types::new(vec![PrimitiveType::String, PrimitiveType::Null]);
        let b = Types::new(vec![PrimitiveType::Null, PrimitiveType::String]);
        assert_eq!(a, b);
        assert_ne!(a, Types::single(PrimitiveType::String));
    }

    #[test]
    fn test_types_deduplicates() {
        let t = Types::new(vec![
            PrimitiveType::String,
            PrimitiveType::String,
            PrimitiveType::Null,
        ]);
        assert_eq!(t.len(), 2);
    }

    #[test]
    fn test_properties_preserve_declaration_order() {
        let mut props = Properties::default();
        props.insert("zebra".into(), string_node());
        props.insert("apple".into(), string_node());
        let names: Vec<&str> = props.names().collect();
        assert_eq!(names, vec!["zebra", "apple"]);
    }

    #[test]
    fn test_properties_insert_replaces_in_place() {
        let mut props = Properties::default();
        props.insert("a".into(), string_node());
        props.insert("b".into(), string_node());
        props.insert("a".into(), integer_node());
        let names: Vec<&str> = props.names().collect();
        assert_eq!(names, vec!["a", "b"]);
        let a = props.get("a").unwrap().as_normal().unwrap();
        assert!(a.types().unwrap().contains(PrimitiveType::Integer));
    }

    #[test]
    fn test_properties_equality_ignores_declaration_order() {
        let forward = Properties::new(vec![
            ("a".to_string(), string_node()),
            ("b".to_string(), integer_node()),
        ]);
        let reversed = Properties::new(vec![
            ("b".to_string(), integer_node()),
            ("a".to_string(), string_node()),
        ]);
        assert_eq!(forward, reversed);
        assert_ne!(forward, Properties::new(vec![("a".to_string(), string_node())]));
    }

    #[test]
    fn test_equality_ignores_cycle_markers() {
        let plain = NormalSubschema::from_fields(
            false,
            Some(Types::single(PrimitiveType::String)),
            None,
            None,
            None,
            None,
            None,
        );
        let marked = NormalSubschema::from_fields(
            true,
            Some(Types::single(PrimitiveType::String)),
            None,
            None,
            None,
            None,
            None,
        );
        assert_eq!(plain, marked);
    }

    #[test]
    fn test_reference_is_never_resolved() {
        let reference = Subschema::Reference(Reference::new("Widget"));
        assert!(!reference.is_resolved());
        let self_reference = Subschema::SelfReference {
            name: "Widget".into(),
        };
        assert!(self_reference.is_resolved());
        assert!(self_reference.in_cycle());
    }

    #[test]
    fn test_merged_overrides_prefer_sibling_properties() {
        let base_props = Properties::new(vec![
            ("color".to_string(), string_node()),
            ("size".to_string(), string_node()),
        ]);
        let base = NormalSubschema::from_fields(
            false,
            Some(Types::single(PrimitiveType::Object)),
            Some(base_props),
            None,
            None,
            Some("widget".to_string()),
            None,
        );

        let override_props = Properties::new(vec![("size".to_string(), integer_node())]);
        let merged = base.merged_with_overrides(None, Some(&override_props), Some("gadget"));

        let names: Vec<&str> = merged.properties().unwrap().names().collect();
        assert_eq!(names, vec!["color", "size"]);
        let size = merged
            .properties()
            .unwrap()
            .get("size")
            .unwrap()
            .as_normal()
            .unwrap();
        assert!(size.types().unwrap().contains(PrimitiveType::Integer));
        assert_eq!(merged.declared_type(), Some("gadget"));
    }
}
