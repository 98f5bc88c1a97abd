//! # Document Difference
//!
//! Compares two JSON views of TOML documents field by field, following the
//! fields the schema declares. Nested models are recursed into; every other
//! field (scalars, arrays, maps) is compared as a whole.

use serde_json::Value as Json;
use tomlbind_schema::SchemaNode;

use crate::convert::json_eq;
use crate::path::FieldPath;

/// Declared fields that differ between the bound model's document
/// (outgoing) and another document (incoming).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Difference {
    /// Fields where the incoming document would change the model: present
    /// only in incoming, or present in both with different values.
    pub incoming_changed: Vec<FieldPath>,
    /// Fields present in the model's document but absent from incoming.
    pub outgoing_changed: Vec<FieldPath>,
}

impl Difference {
    /// Whether the documents agree on every declared field.
    pub fn is_empty(&self) -> bool {
        self.incoming_changed.is_empty() && self.outgoing_changed.is_empty()
    }
}

/// Difference between `outgoing` and `incoming` over the fields `schema`
/// declares, in declaration order.
pub fn difference(schema: SchemaNode<'_>, outgoing: &Json, incoming: &Json) -> Difference {
    let mut diff = Difference::default();
    walk(schema, &FieldPath::root(), outgoing, incoming, &mut diff);
    diff
}

fn walk(
    node: SchemaNode<'_>,
    prefix: &FieldPath,
    outgoing: &Json,
    incoming: &Json,
    diff: &mut Difference,
) {
    for (key, child) in node.properties() {
        let path = prefix.join(key);
        match (outgoing.get(key), incoming.get(key)) {
            (None, None) => {}
            (Some(_), None) => diff.outgoing_changed.push(path),
            (None, Some(_)) => diff.incoming_changed.push(path),
            (Some(out), Some(inc)) if child.is_model() && out.is_object() && inc.is_object() => {
                walk(child, &path, out, inc, diff)
            }
            (Some(out), Some(inc)) => {
                if !json_eq(out, inc) {
                    diff.incoming_changed.push(path);
                }
            }
        }
    }
}
