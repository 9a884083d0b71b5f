//! Structural deltas between two schemas.
//!
//! A [`Delta`] is one atomic difference the migrator must replay against a
//! document, addressed by a field path. Paths use `/` to descend into nested
//! object fields and a literal `[]` suffix on a segment to mean "this
//! segment names an array; apply everything after it to each element", e.g.
//! `boxes[]items[]color`.

use serde::Serialize;
use serde_json::Value;

use crate::types::Subschema;

/// One atomic structural difference between a source and a target schema.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Delta {
    /// The field exists in the source and is absent in the target.
    Drop {
        field_path: String,
        schema: Subschema,
    },
    /// The field is new and its declared type has a known context-free
    /// default. A caller rule for the path, if present, overrides the
    /// default.
    DefaultingAdd {
        field_path: String,
        schema: Subschema,
        default_value: Value,
    },
    /// The field is new and no default is known; the caller must supply a
    /// rule.
    CustomAdd {
        field_path: String,
        schema: Subschema,
    },
    /// The field exists on both sides with shapes too different to narrow;
    /// the caller must supply a rule.
    Change {
        field_path: String,
        from: Subschema,
        to: Subschema,
    },
}

impl Delta {
    /// The path of the field this delta applies to.
    pub fn field_path(&self) -> &str {
        match self {
            Self::Drop { field_path, .. }
            | Self::DefaultingAdd { field_path, .. }
            | Self::CustomAdd { field_path, .. }
            | Self::Change { field_path, .. } => field_path,
        }
    }

    /// Returns true if the caller must provide a rule to handle this delta,
    /// false if it can be applied automatically.
    pub fn requires_customization(&self) -> bool {
        match self {
            Self::Drop { .. } | Self::DefaultingAdd { .. } => false,
            Self::CustomAdd { .. } | Self::Change { .. } => true,
        }
    }

    /// Returns true for either add flavor.
    pub fn is_add(&self) -> bool {
        matches!(self, Self::DefaultingAdd { .. } | Self::CustomAdd { .. })
    }

    pub fn is_drop(&self) -> bool {
        matches!(self, Self::Drop { .. })
    }

    pub fn is_change(&self) -> bool {
        matches!(self, Self::Change { .. })
    }
}

/// The ordered list of differences between two schemas.
///
/// Order follows the union of field names in declaration order (source
/// fields first, then target-only fields in the target's order), applied
/// recursively, and is the order the migrator replays deltas in.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SchemaDeltas {
    deltas: Vec<Delta>,
}

impl SchemaDeltas {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, delta: Delta) {
        self.deltas.push(delta);
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Delta> {
        self.deltas.iter()
    }

    pub fn len(&self) -> usize {
        self.deltas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.deltas.is_empty()
    }

    /// The add-family deltas, in emission order.
    pub fn adds(&self) -> impl Iterator<Item = &Delta> {
        self.deltas.iter().filter(|delta| delta.is_add())
    }

    /// The drop deltas, in emission order.
    pub fn drops(&self) -> impl Iterator<Item = &Delta> {
        self.deltas.iter().filter(|delta| delta.is_drop())
    }

    /// The change deltas, in emission order.
    pub fn changes(&self) -> impl Iterator<Item = &Delta> {
        self.deltas.iter().filter(|delta| delta.is_change())
    }
}

impl IntoIterator for SchemaDeltas {
    type Item = Delta;
    type IntoIter = std::vec::IntoIter<Delta>;

    fn into_iter(self) -> Self::IntoIter {
        self.deltas.into_iter()
    }
}

impl<'a> IntoIterator for &'a SchemaDeltas {
    type Item = &'a Delta;
    type IntoIter = std::slice::Iter<'a, Delta>;

    fn into_iter(self) -> Self::IntoIter {
        self.deltas.iter()
    }
}
