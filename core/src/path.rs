//! Field-path navigation over a JSON value tree.
//!
//! Paths here are `/`-delimited object descents with no `[]` segments:
//! array fan-out is resolved by the migrator before it asks this module for
//! a location, so a path containing `[]` never resolves. The main entry
//! point, [`parent_and_field`], lands on the *parent* of the addressed
//! field and hands back a mutable handle, which is what lets the migrator
//! insert, replace, or remove the field in place, including fields that do
//! not exist yet.

use serde_json::{Map, Value};

/// The result of navigating to a field's parent: a mutable handle on the
/// parent object plus the field's name within it.
///
/// The addressed field itself need not exist: that is the "about to be
/// added" case, where [`current`](Self::current) returns `None`.
#[derive(Debug)]
pub struct ParentAndField<'a> {
    parent: &'a mut Map<String, Value>,
    field: String,
}

impl<'a> ParentAndField<'a> {
    /// The final path segment: the field's name within its parent.
    pub fn field(&self) -> &str {
        &self.field
    }

    /// The field's current value, if it exists in the parent.
    pub fn current(&self) -> Option<&Value> {
        self.parent.get(&self.field)
    }

    /// Sets the field, inserting or replacing.
    pub fn set(self, value: Value) {
        self.parent.insert(self.field, value);
    }

    /// Removes the field, preserving the order of the remaining fields.
    pub fn remove(self) -> Option<Value> {
        self.parent.shift_remove(&self.field)
    }
}

/// Navigates to the parent of the field addressed by `path`.
///
/// Every segment but the last must name an existing object-valued field;
/// the last segment may be absent from its parent. Returns `None` when the
/// path cannot be navigated (missing intermediate field, a non-object along
/// the way, or a `[]` marker, which this module does not handle).
pub fn parent_and_field<'a>(path: &str, document: &'a mut Value) -> Option<ParentAndField<'a>> {
    if path.contains("[]") {
        return None;
    }
    let segments: Vec<&str> = path.split('/').collect();
    let (last, intermediate) = segments.split_last()?;
    let mut current = document;
    for segment in intermediate {
        current = current.as_object_mut()?.get_mut(*segment)?;
    }
    let parent = current.as_object_mut()?;
    Some(ParentAndField {
        parent,
        field: (*last).to_string(),
    })
}

/// Fetches the value at `path`, or `None` if it does not exist.
pub fn get_field<'a>(path: &str, document: &'a Value) -> Option<&'a Value> {
    if path.contains("[]") {
        return None;
    }
    let mut current = document;
    for segment in path.split('/') {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

/// Mutable variant of [`get_field`].
pub fn get_field_mut<'a>(path: &str, document: &'a mut Value) -> Option<&'a mut Value> {
    if path.contains("[]") {
        return None;
    }
    let mut current = document;
    for segment in path.split('/') {
        current = current.as_object_mut()?.get_mut(segment)?;
    }
    Some(current)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_top_level_field() {
        let mut doc = json!({"s": "abc", "i": 23});
        let location = parent_and_field("s", &mut doc).unwrap();
        assert_eq!(location.field(), "s");
        assert_eq!(location.current(), Some(&json!("abc")));
    }

    #[test]
    fn test_nested_field() {
        let mut doc = json!({"outer": {"inner": {"value": 7}}});
        let location = parent_and_field("outer/inner/value", &mut doc).unwrap();
        assert_eq!(location.current(), Some(&json!(7)));
    }

    #[test]
    fn test_missing_final_segment_is_the_add_case() {
        let mut doc = json!({"outer": {"present": 1}});
        let location = parent_and_field("outer/absent", &mut doc).unwrap();
        assert_eq!(location.current(), None);
        location.set(json!("new"));
        assert_eq!(doc, json!({"outer": {"present": 1, "absent": "new"}}));
    }

    #[test]
    fn test_missing_intermediate_fails() {
        let mut doc = json!({"outer": {}});
        assert!(parent_and_field("outer/missing/value", &mut doc).is_none());
    }

    #[test]
    fn test_scalar_intermediate_fails() {
        let mut doc = json!({"outer": "not an object"});
        assert!(parent_and_field("outer/value", &mut doc).is_none());
    }

    #[test]
    fn test_array_marker_is_not_handled_here() {
        let mut doc = json!({"widgets": [{"name": "a"}]});
        assert!(parent_and_field("widgets[]name", &mut doc).is_none());
        assert!(get_field("widgets[]name", &doc).is_none());
    }

    #[test]
    fn test_remove_preserves_remaining_order() {
        let mut doc = json!({"a": 1, "b": 2, "c": 3});
        parent_and_field("b", &mut doc).unwrap().remove();
        let keys: Vec<&String> = doc.as_object().unwrap().keys().collect();
        assert_eq!(keys, vec!["a", "c"]);
    }

    #[test]
    fn test_get_field_reads_through_nesting() {
        let doc = json!({"outer": {"inner": 5}});
        assert_eq!(get_field("outer/inner", &doc), Some(&json!(5)));
        assert_eq!(get_field("outer/other", &doc), None);
        assert_eq!(get_field("outer", &doc), Some(&json!({"inner": 5})));
    }
}
