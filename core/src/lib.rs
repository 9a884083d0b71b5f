//! Core schema model, parser, and differ for JSON document migration.
//!
//! This crate turns JSON-Schema-like documents (draft 2020-12 dialect,
//! restricted subset) into resolved schema trees and compares them:
//!
//! - [`parse`] — builds a [`SchemaInfo`] from schema text, resolving
//!   forward references and breaking self-referential cycles with
//!   [`Subschema::SelfReference`] markers.
//! - [`diff`] — recursively compares two resolved schemas into an ordered,
//!   path-addressed [`SchemaDeltas`] list, descending into nested objects
//!   and array element types rather than reporting coarse changes.
//! - [`DefaultValueRegistry`] — classifies added fields by declared type:
//!   additions with a known canonical default apply automatically,
//!   everything else requires a caller-supplied rule.
//! - [`parent_and_field`] — field-path navigation over a JSON value tree,
//!   used by the migration layer to edit documents in place.
//!
//! The companion `jsonshift-migrate` crate replays the deltas against a
//! concrete document.
//!
//! # Example
//!
//! ```
//! use jsonshift_core::{Delta, diff, parse};
//!
//! let dialect = "https://json-schema.org/draft/2020-12/schema";
//! let v1 = format!(
//!     r#"{{"$schema":"{dialect}","type":"object",
//!         "properties":{{"name":{{"type":"string"}}}}}}"#
//! );
//! let v2 = format!(
//!     r#"{{"$schema":"{dialect}","type":"object",
//!         "properties":{{
//!             "name":{{"type":"string"}},
//!             "active":{{"type":"boolean","x-declaredType":"bool"}}}}}}"#
//! );
//!
//! let source = parse(&v1).unwrap();
//! let target = parse(&v2).unwrap();
//! let deltas = diff(&source, &target);
//!
//! assert_eq!(deltas.len(), 1);
//! assert!(matches!(
//!     deltas.iter().next().unwrap(),
//!     Delta::DefaultingAdd { field_path, .. } if field_path == "active"
//! ));
//! ```

mod defaults;
mod delta;
mod diff;
mod parser;
mod path;
mod types;

pub use defaults::{DefaultValueRegistry, TypeKind};
pub use delta::{Delta, SchemaDeltas};
pub use diff::{diff, diff_with_registry};
pub use parser::{DECLARED_TYPE_KEY, UnsupportedSchemaFeature, parse};
pub use path::{ParentAndField, get_field, get_field_mut, parent_and_field};
pub use types::*;
