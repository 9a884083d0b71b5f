//! Schema text parser with reference and cycle resolution.
//!
//! [`parse`] turns a JSON-Schema-like document (draft 2020-12 dialect,
//! restricted subset) into a resolved [`SchemaInfo`]. Parsing is two passes:
//!
//! 1. A syntactic walk over the JSON tree. Back-references to definitions
//!    that are already parsed resolve eagerly; forward references are left
//!    as [`Subschema::Reference`] placeholders, capturing any sibling
//!    keywords for a later merge.
//! 2. A worklist pass over `$defs` that resolves the remaining references.
//!    Resolution carries an explicit name stack: encountering a `$ref` to a
//!    name already on the stack replaces that position with a
//!    [`Subschema::SelfReference`] instead of expanding it, which is what
//!    keeps mutually and directly recursive definitions finite. Every
//!    normal node constructed while such a loop is open is marked as being
//!    in a cycle so that consumers can avoid unbounded structural
//!    comparison. Resolved definitions are written back into the table, so
//!    each definition is resolved at most once.
//!
//! Anything outside the supported subset fails with
//! [`UnsupportedSchemaFeature`] naming the offending keyword; callers never
//! receive partially resolved state.

use std::collections::HashSet;

use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::types::{
    AnyOfSubschema, Definitions, EnumValues, NormalSubschema, PrimitiveType, Properties,
    Reference, SchemaInfo, Subschema, Types,
};

/// The extension keyword carrying the declared-type annotation: an opaque
/// logical type tag used for default classification (see
/// [`DefaultValueRegistry`](crate::DefaultValueRegistry)).
pub const DECLARED_TYPE_KEY: &str = "x-declaredType";

const REF_PREFIX: &str = "#/$defs/";

/// The schema uses a construct outside the supported subset.
///
/// This is the single parse-time error channel. The message names the
/// offending keyword or path so support can be extended deliberately.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unsupported schema feature: {message}")]
pub struct UnsupportedSchemaFeature {
    message: String,
}

impl UnsupportedSchemaFeature {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// The description of the offending construct.
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Parses a schema document into a resolved [`SchemaInfo`].
///
/// # Examples
///
/// ```
/// use jsonshift_core::parse;
///
/// let schema = r##"{
///     "$schema": "https://json-schema.org/draft/2020-12/schema",
///     "type": "object",
///     "properties": {
///         "name": {"type": "string"},
///         "count": {"type": "integer"}
///     }
/// }"##;
/// let info = parse(schema).unwrap();
/// assert_eq!(info.root().len(), 2);
/// ```
pub fn parse(schema_text: &str) -> Result<SchemaInfo, UnsupportedSchemaFeature> {
    let document: Value = serde_json::from_str(schema_text)
        .map_err(|err| UnsupportedSchemaFeature::new(format!("schema is not valid JSON: {err}")))?;
    let Some(top) = document.as_object() else {
        return Err(UnsupportedSchemaFeature::new("schema root must be an object"));
    };

    let version = match top.get("$schema") {
        Some(Value::String(version)) => version.clone(),
        Some(_) => return Err(UnsupportedSchemaFeature::new("$schema must be a string")),
        None => {
            return Err(UnsupportedSchemaFeature::new(
                "schema must declare $schema at the top level",
            ));
        }
    };
    if let Some(root_type) = top.get("type") {
        if root_type.as_str() != Some("object") {
            return Err(UnsupportedSchemaFeature::new(
                "root schema must have type \"object\"",
            ));
        }
    }

    // Definitions come first so that properties can resolve against them.
    let mut defs = parse_defs(top.get("$defs"))?;
    resolve_defs(&mut defs)?;

    let properties_node = top.get("properties").ok_or_else(|| {
        UnsupportedSchemaFeature::new("schema must declare properties at the top level")
    })?;
    let parsed_root = parse_properties(&defs, properties_node)?;
    let mut state = ResolutionState::empty();
    let root = resolve_properties(&mut defs, &mut state, &parsed_root)?;

    debug!(
        defs = defs.len(),
        fields = root.len(),
        "parsed schema {version}"
    );
    Ok(SchemaInfo::new(version, defs, root))
}

/// State threaded through reference resolution: the stack of definition
/// names currently being resolved, and the set of loops that have been
/// broken with a self-reference but whose definition is not yet recorded.
#[derive(Debug)]
struct ResolutionState {
    name_stack: Vec<String>,
    open_loops: HashSet<String>,
}

impl ResolutionState {
    fn empty() -> Self {
        Self {
            name_stack: Vec::new(),
            open_loops: HashSet::new(),
        }
    }

    fn rooted_at(name: &str) -> Self {
        Self {
            name_stack: vec![name.to_string()],
            open_loops: HashSet::new(),
        }
    }

    fn on_stack(&self, name: &str) -> bool {
        self.name_stack.iter().any(|entry| entry == name)
    }

    fn push(&mut self, name: String) {
        self.name_stack.push(name);
    }

    fn pop(&mut self) {
        self.name_stack.pop();
    }

    fn open_loop(&mut self, name: String) {
        self.open_loops.insert(name);
    }

    fn close_loop(&mut self, name: &str) {
        self.open_loops.remove(name);
    }

    fn has_open_loops(&self) -> bool {
        !self.open_loops.is_empty()
    }
}

/// Parses the `$defs` table. The result may still contain forward
/// references.
fn parse_defs(node: Option<&Value>) -> Result<Definitions, UnsupportedSchemaFeature> {
    let Some(node) = node else {
        return Ok(Definitions::new());
    };
    let Some(map) = node.as_object() else {
        return Err(UnsupportedSchemaFeature::new("$defs must be an object"));
    };
    let mut defs = Definitions::new();
    for (name, def_node) in map {
        let subschema = parse_subschema(&defs, def_node)?;
        defs.insert(name.clone(), subschema);
    }
    Ok(defs)
}

/// Resolves every remaining reference in the definitions table, replacing
/// each definition with its resolved form (or failing; never leaving a
/// partial mix).
fn resolve_defs(defs: &mut Definitions) -> Result<(), UnsupportedSchemaFeature> {
    let names: Vec<String> = defs.names().map(str::to_string).collect();
    for name in names {
        let Some(current) = defs.get(&name).cloned() else {
            continue;
        };
        if current.is_resolved() {
            continue;
        }
        debug!("resolving definition '{name}'");
        let mut state = ResolutionState::rooted_at(&name);
        let resolved = resolve_subschema(defs, &mut state, current)?;
        defs.insert(name, resolved);
    }
    Ok(())
}

fn resolve_properties(
    defs: &mut Definitions,
    state: &mut ResolutionState,
    properties: &Properties,
) -> Result<Properties, UnsupportedSchemaFeature> {
    if properties.all_resolved() {
        return Ok(properties.clone());
    }
    let mut resolved = Vec::with_capacity(properties.len());
    for (name, subschema) in properties.iter() {
        resolved.push((
            name.to_string(),
            resolve_subschema(defs, state, subschema.clone())?,
        ));
    }
    Ok(Properties::new(resolved))
}

fn resolve_subschema(
    defs: &mut Definitions,
    state: &mut ResolutionState,
    subschema: Subschema,
) -> Result<Subschema, UnsupportedSchemaFeature> {
    if subschema.is_resolved() {
        return Ok(subschema);
    }
    match subschema {
        // Always resolved, so unreachable past the early return; kept for
        // exhaustiveness.
        done @ Subschema::SelfReference { .. } => Ok(done),
        Subschema::Normal(normal) => {
            let properties = match normal.properties() {
                Some(props) => Some(resolve_properties(defs, state, props)?),
                None => None,
            };
            let items = match normal.items() {
                Some(item) => Some(Box::new(resolve_subschema(defs, state, item.clone())?)),
                None => None,
            };
            // The cycle marker is decided after the children: a loop opened
            // anywhere below (and not yet recorded) puts this node in it.
            Ok(Subschema::Normal(NormalSubschema::from_fields(
                state.has_open_loops(),
                normal.types().cloned(),
                properties,
                items,
                normal.enum_values().cloned(),
                normal.declared_type().map(str::to_string),
                normal.const_value().map(str::to_string),
            )))
        }
        Subschema::AnyOf(any_of) => {
            let mut options = Vec::with_capacity(any_of.options().len());
            for option in any_of.options() {
                options.push(resolve_subschema(defs, state, option.clone())?);
            }
            Ok(Subschema::AnyOf(AnyOfSubschema::new(
                options,
                any_of.declared_type().map(str::to_string),
            )))
        }
        Subschema::Reference(reference) => {
            let name = reference.name().to_string();
            if state.on_stack(&name) {
                debug!("breaking reference cycle at '{name}' with a self-reference");
                state.open_loop(name.clone());
                return Ok(Subschema::SelfReference { name });
            }
            let Some(defined) = defs.get(&name).cloned() else {
                return Err(UnsupportedSchemaFeature::new(format!(
                    "reference {REF_PREFIX}{name} not found"
                )));
            };
            let resolved = if defined.is_resolved() {
                // Memoized: this definition was already resolved in full.
                defined
            } else {
                state.push(name.clone());
                let resolved = resolve_subschema(defs, state, defined)?;
                state.pop();
                defs.insert(name.clone(), resolved.clone());
                state.close_loop(&name);
                resolved
            };
            let merged = apply_reference_overrides(&reference, resolved);
            if merged.is_resolved() {
                Ok(merged)
            } else {
                // Sibling overrides can themselves carry references.
                resolve_subschema(defs, state, merged)
            }
        }
    }
}

/// Applies the overrides carried by a reference (declared type, sibling
/// `type`/`properties`) to the resolved target.
fn apply_reference_overrides(reference: &Reference, resolved: Subschema) -> Subschema {
    if let Subschema::Normal(normal) = &resolved {
        if reference.has_overrides() {
            return Subschema::Normal(normal.merged_with_overrides(
                reference.override_types(),
                reference.override_properties(),
                reference.declared_type(),
            ));
        }
        if reference.declared_type().is_some() {
            return Subschema::Normal(
                normal.with_declared_type(reference.declared_type().map(str::to_string)),
            );
        }
    }
    resolved
}

fn parse_properties(
    defs: &Definitions,
    node: &Value,
) -> Result<Properties, UnsupportedSchemaFeature> {
    let Some(map) = node.as_object() else {
        return Err(UnsupportedSchemaFeature::new("properties must be an object"));
    };
    let mut entries = Vec::with_capacity(map.len());
    for (name, prop_node) in map {
        entries.push((name.clone(), parse_subschema(defs, prop_node)?));
    }
    Ok(Properties::new(entries))
}

fn parse_subschema(defs: &Definitions, node: &Value) -> Result<Subschema, UnsupportedSchemaFeature> {
    let Some(map) = node.as_object() else {
        return Err(UnsupportedSchemaFeature::new("subschema must be an object"));
    };

    let mut types = None;
    let mut properties = None;
    let mut items = None;
    let mut enum_values = None;
    let mut const_value = None;
    let mut reference_name = None;
    let mut declared_type = None;
    let mut any_of_options = None;

    for (key, value) in map {
        match key.as_str() {
            "type" => types = Some(parse_types(value)?),
            "properties" => properties = Some(parse_properties(defs, value)?),
            "items" => items = Some(Box::new(parse_subschema(defs, value)?)),
            "enum" => enum_values = Some(parse_enum_values(value)?),
            "const" => {
                const_value = Some(match value {
                    Value::String(text) => text.clone(),
                    other => other.to_string(),
                })
            }
            "$ref" => reference_name = Some(parse_reference(value)?),
            "anyOf" => any_of_options = Some(parse_any_of(defs, value)?),
            DECLARED_TYPE_KEY => {
                let tag = value.as_str().ok_or_else(|| {
                    UnsupportedSchemaFeature::new(format!("{DECLARED_TYPE_KEY} must be a string"))
                })?;
                declared_type = Some(tag.to_string());
            }
            // Accepted but carry no structural information here.
            "required" | "format" => {}
            // Unknown extension keywords are ignored by convention.
            other if other.starts_with("x-") => {}
            other => {
                return Err(UnsupportedSchemaFeature::new(format!(
                    "unsupported subschema keyword: {other}"
                )));
            }
        }
    }

    if let Some(options) = any_of_options {
        let has_structural_siblings = types.is_some()
            || properties.is_some()
            || items.is_some()
            || enum_values.is_some()
            || reference_name.is_some();
        if has_structural_siblings {
            return Err(UnsupportedSchemaFeature::new(
                "anyOf combined with other structural keywords is not supported",
            ));
        }
        return Ok(Subschema::AnyOf(AnyOfSubschema::new(options, declared_type)));
    }

    let Some(name) = reference_name else {
        return Ok(Subschema::Normal(NormalSubschema::from_fields(
            false,
            types,
            properties,
            items,
            enum_values,
            declared_type,
            const_value,
        )));
    };

    // A $ref node. Sibling keywords (JSON Schema 2020-12) are merged into
    // the target: immediately for a back-reference to a normal definition,
    // or carried on the Reference placeholder for the resolution pass.
    let has_siblings =
        types.is_some() || properties.is_some() || items.is_some() || enum_values.is_some();
    if has_siblings {
        if let Some(Subschema::Normal(known)) = defs.get(&name) {
            return Ok(Subschema::Normal(known.merged_with_overrides(
                types.as_ref(),
                properties.as_ref(),
                declared_type.as_deref(),
            )));
        }
        return Ok(Subschema::Reference(Reference::with_overrides(
            name,
            declared_type,
            types,
            properties,
        )));
    }

    match defs.get(&name) {
        // Back-reference: inline the definition as parsed so far; the
        // resolution pass finishes whatever is still unresolved inside it.
        Some(known) => {
            if declared_type.is_some() {
                if let Subschema::Normal(known_normal) = known {
                    return Ok(Subschema::Normal(
                        known_normal.with_declared_type(declared_type),
                    ));
                }
            }
            Ok(known.clone())
        }
        // Forward reference: resolved by the second pass.
        None => Ok(Subschema::Reference(Reference::with_overrides(
            name,
            declared_type,
            None,
            None,
        ))),
    }
}

fn parse_any_of(
    defs: &Definitions,
    node: &Value,
) -> Result<Vec<Subschema>, UnsupportedSchemaFeature> {
    let Some(entries) = node.as_array() else {
        return Err(UnsupportedSchemaFeature::new("anyOf must be an array"));
    };
    let mut options = Vec::with_capacity(entries.len());
    for entry in entries {
        options.push(parse_subschema(defs, entry)?);
    }
    Ok(options)
}

fn parse_types(node: &Value) -> Result<Types, UnsupportedSchemaFeature> {
    match node {
        Value::String(keyword) => Ok(Types::single(parse_primitive_type(keyword)?)),
        Value::Array(entries) => {
            let mut primitives = Vec::with_capacity(entries.len());
            for entry in entries {
                let Some(keyword) = entry.as_str() else {
                    return Err(UnsupportedSchemaFeature::new("single type must be a string"));
                };
                primitives.push(parse_primitive_type(keyword)?);
            }
            Ok(Types::new(primitives))
        }
        _ => Err(UnsupportedSchemaFeature::new(
            "type must be a string or a list of strings",
        )),
    }
}

fn parse_primitive_type(keyword: &str) -> Result<PrimitiveType, UnsupportedSchemaFeature> {
    PrimitiveType::from_keyword(keyword).ok_or_else(|| {
        UnsupportedSchemaFeature::new(format!("unsupported primitive type: {keyword}"))
    })
}

fn parse_enum_values(node: &Value) -> Result<EnumValues, UnsupportedSchemaFeature> {
    let Some(entries) = node.as_array() else {
        return Err(UnsupportedSchemaFeature::new("enum must be an array"));
    };
    let mut values = Vec::with_capacity(entries.len());
    for entry in entries {
        let Some(text) = entry.as_str() else {
            return Err(UnsupportedSchemaFeature::new("enum values must be strings"));
        };
        values.push(text.to_string());
    }
    Ok(EnumValues::new(values))
}

fn parse_reference(node: &Value) -> Result<String, UnsupportedSchemaFeature> {
    let Some(target) = node.as_str() else {
        return Err(UnsupportedSchemaFeature::new(
            "reference must be defined with a string",
        ));
    };
    let Some(name) = target.strip_prefix(REF_PREFIX) else {
        return Err(UnsupportedSchemaFeature::new(format!(
            "reference must start with \"{REF_PREFIX}\""
        )));
    };
    if name.is_empty() {
        return Err(UnsupportedSchemaFeature::new("reference must have a name"));
    }
    Ok(name.to_string())
}
