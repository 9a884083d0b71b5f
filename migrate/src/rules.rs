//! Caller-supplied update rules and the context they run against.
//!
//! The differ marks some deltas as requiring customization: a new field
//! with no known default, or a field whose shape changed. For each such
//! field path the caller registers an [`UpdateRule`] that produces the new
//! value. Rules receive an [`UpdateContext`] exposing the original source
//! document and both schemas, so a rule can compute a new field from an old
//! one (a rename, a type conversion, a merge of several old fields).

use std::collections::HashMap;
use std::fmt;

use jsonshift_core::{SchemaInfo, UnsupportedSchemaFeature, diff, get_field, parse};
use serde_json::Value;

/// Produces the JSON value for one field path that cannot be resolved
/// automatically.
///
/// Implemented for any `Fn(&UpdateContext, &str) -> Value` closure, which is
/// the usual way to supply one.
pub trait UpdateRule {
    /// Computes the value for `field_path` in the destination document.
    fn map_field(&self, context: &UpdateContext<'_>, field_path: &str) -> Value;
}

impl<F> UpdateRule for F
where
    F: Fn(&UpdateContext<'_>, &str) -> Value,
{
    fn map_field(&self, context: &UpdateContext<'_>, field_path: &str) -> Value {
        self(context, field_path)
    }
}

/// What an update rule gets to look at: the unmodified source document and
/// the two schemas being migrated between.
#[derive(Clone, Copy)]
pub struct UpdateContext<'a> {
    source_schema: &'a SchemaInfo,
    target_schema: &'a SchemaInfo,
    source_document: &'a Value,
}

impl<'a> UpdateContext<'a> {
    pub fn new(
        source_schema: &'a SchemaInfo,
        target_schema: &'a SchemaInfo,
        source_document: &'a Value,
    ) -> Self {
        Self {
            source_schema,
            target_schema,
            source_document,
        }
    }

    /// The source document, exactly as passed to `migrate`.
    pub fn source_document(&self) -> &'a Value {
        self.source_document
    }

    pub fn source_schema(&self) -> &'a SchemaInfo {
        self.source_schema
    }

    pub fn target_schema(&self) -> &'a SchemaInfo {
        self.target_schema
    }

    /// Fetches a value from the source document by `/`-separated field
    /// path. The usual building block for rename rules.
    pub fn source_value(&self, field_path: &str) -> Option<&'a Value> {
        get_field(field_path, self.source_document)
    }
}

impl fmt::Debug for UpdateContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpdateContext")
            .field("source_document", self.source_document)
            .finish_non_exhaustive()
    }
}

/// The full set of rules for one migration, keyed by field path.
///
/// # Examples
///
/// ```
/// use jsonshift_migrate::UpdateRules;
/// use serde_json::json;
///
/// let rules = UpdateRules::new()
///     .with_rule("fullName", |ctx: &jsonshift_migrate::UpdateContext<'_>, _path: &str| {
///         ctx.source_value("name").cloned().unwrap_or_else(|| json!(""))
///     });
/// assert!(rules.get("fullName").is_some());
/// assert!(rules.get("other").is_none());
/// ```
#[derive(Default)]
pub struct UpdateRules {
    rules: HashMap<String, Box<dyn UpdateRule>>,
}

impl UpdateRules {
    /// Creates an empty rule set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a rule for a field path, builder style.
    pub fn with_rule(
        mut self,
        field_path: impl Into<String>,
        rule: impl UpdateRule + 'static,
    ) -> Self {
        self.insert(field_path, rule);
        self
    }

    /// Registers a rule for a field path.
    pub fn insert(&mut self, field_path: impl Into<String>, rule: impl UpdateRule + 'static) {
        self.rules.insert(field_path.into(), Box::new(rule));
    }

    /// Looks up the rule for a field path.
    pub fn get(&self, field_path: &str) -> Option<&dyn UpdateRule> {
        self.rules.get(field_path).map(|rule| &**rule)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Checks this rule set against a migration: parses both schema texts,
    /// diffs them, and returns the field paths of every delta that has no
    /// rule entry. Every delta is listed, not just those that require
    /// customization, so the caller sees the full migration surface; an
    /// empty result means every delta is explicitly covered.
    pub fn missing_rules(
        &self,
        source_schema: &str,
        target_schema: &str,
    ) -> Result<Vec<String>, UnsupportedSchemaFeature> {
        let source = parse(source_schema)?;
        let target = parse(target_schema)?;
        Ok(diff(&source, &target)
            .iter()
            .map(|delta| delta.field_path())
            .filter(|field_path| !self.rules.contains_key(*field_path))
            .map(str::to_string)
            .collect())
    }
}

impl fmt::Debug for UpdateRules {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut paths: Vec<&str> = self.rules.keys().map(String::as_str).collect();
        paths.sort_unstable();
        f.debug_struct("UpdateRules").field("paths", &paths).finish()
    }
}
