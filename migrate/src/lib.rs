//! Replays schema deltas against JSON documents.
//!
//! Given two schemas parsed by `jsonshift-core` and a document conforming
//! to the first, [`migrate`] produces a deep copy of the document
//! conforming to the second. The differ's deltas drive the rewrite:
//!
//! - drops remove fields, adds with a known default fill them in;
//! - deltas the differ marked as requiring customization (a new field with
//!   no default, a changed shape) consult the caller's [`UpdateRules`];
//! - `[]` markers in a delta's field path fan the edit out across every
//!   element of the named array, at any nesting depth.
//!
//! A rule is a closure from [`UpdateContext`] (the original source
//! document plus both schemas) to the new field value, which is how
//! renames and type conversions are expressed:
//!
//! ```
//! use jsonshift_migrate::{UpdateContext, UpdateRules};
//! use serde_json::json;
//!
//! let rules = UpdateRules::new().with_rule(
//!     "fullName",
//!     |ctx: &UpdateContext<'_>, _path: &str| {
//!         ctx.source_value("name").cloned().unwrap_or_else(|| json!(""))
//!     },
//! );
//! assert!(rules.get("fullName").is_some());
//! ```
//!
//! Migration is all-or-nothing: a missing rule or an unnavigable path
//! fails the whole call with a [`MigrationError`] and the partial copy is
//! discarded.

mod error;
mod migrator;
mod rules;

pub use error::{MigrationError, Result};
pub use migrator::migrate;
pub use rules::{UpdateContext, UpdateRule, UpdateRules};
