//! # Declared-Field Navigation
//!
//! Walks a JSON Schema by property name so callers can ask which fields a
//! model declares, whether a node is a nested model or a leaf, and whether a
//! field is immutable (`readOnly`).
//!
//! Local `$ref`s (`#/$defs/...`, `#/definitions/...`, `#`) are followed, and
//! the `anyOf`/`oneOf` wrapper that optional fields get (`[X, {"type":
//! "null"}]`) is unwrapped to `X`. Remote references are not resolved.

use serde_json::Value;

/// Bound on `$ref` hops and on recursion through self-referencing schemas.
const MAX_DEPTH: usize = 32;

/// A resolved position inside a schema document.
#[derive(Debug, Clone, Copy)]
pub struct SchemaNode<'a> {
    root: &'a Value,
    node: &'a Value,
    read_only: bool,
}

impl<'a> SchemaNode<'a> {
    /// Navigation handle on the root of `root`.
    pub fn new(root: &'a Value) -> Self {
        Self {
            root,
            node: root,
            read_only: false,
        }
        .resolved()
    }

    /// The schema object at this position, after reference resolution.
    pub fn value(&self) -> &'a Value {
        self.node
    }

    /// Whether this node declares named properties (a nested model).
    pub fn is_model(&self) -> bool {
        self.node.get("properties").is_some_and(Value::is_object)
    }

    /// Whether this node, or a reference hop leading to it, is marked
    /// `readOnly: true`.
    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// Declared properties in schema order.
    pub fn properties(&self) -> Vec<(&'a str, SchemaNode<'a>)> {
        self.node
            .get("properties")
            .and_then(Value::as_object)
            .map(|props| {
                props
                    .iter()
                    .map(|(key, schema)| (key.as_str(), self.child(schema)))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// The schema for `key`: a declared property, or the value schema of a
    /// map (`additionalProperties: {...}`).
    pub fn property(&self, key: &str) -> Option<SchemaNode<'a>> {
        if let Some(schema) = self.node.get("properties").and_then(|p| p.get(key)) {
            return Some(self.child(schema));
        }
        match self.node.get("additionalProperties") {
            Some(schema @ Value::Object(_)) => Some(self.child(schema)),
            _ => None,
        }
    }

    /// Follow `path` from this node.
    pub fn descend<S: AsRef<str>>(&self, path: &[S]) -> Option<SchemaNode<'a>> {
        path.iter()
            .try_fold(*self, |node, key| node.property(key.as_ref()))
    }

    /// Whether this node or any node along `path` is `readOnly`.
    pub fn frozen_along<S: AsRef<str>>(&self, path: &[S]) -> bool {
        let mut node = *self;
        if node.is_read_only() {
            return true;
        }
        for key in path {
            match node.property(key.as_ref()) {
                Some(next) if next.is_read_only() => return true,
                Some(next) => node = next,
                None => return false,
            }
        }
        false
    }

    /// Paths of every `readOnly` property reachable through nested models.
    pub fn frozen_fields(&self) -> Vec<Vec<String>> {
        let mut out = Vec::new();
        self.collect_frozen(&mut Vec::new(), &mut out, 0);
        out
    }

    fn collect_frozen(&self, prefix: &mut Vec<String>, out: &mut Vec<Vec<String>>, depth: usize) {
        if depth >= MAX_DEPTH {
            return;
        }
        for (key, node) in self.properties() {
            prefix.push(key.to_string());
            if node.is_read_only() {
                out.push(prefix.clone());
            } else if node.is_model() {
                node.collect_frozen(prefix, out, depth + 1);
            }
            prefix.pop();
        }
    }

    fn child(&self, schema: &'a Value) -> SchemaNode<'a> {
        SchemaNode {
            root: self.root,
            node: schema,
            read_only: false,
        }
        .resolved()
    }

    fn resolved(self) -> Self {
        let mut node = self.node;
        let mut read_only = self.read_only;
        for _ in 0..MAX_DEPTH {
            read_only |= marked_read_only(node);
            if node.get("properties").is_none() {
                if let Some(target) = node
                    .get("$ref")
                    .and_then(Value::as_str)
                    .and_then(|reference| self.lookup(reference))
                {
                    node = target;
                    continue;
                }
            }
            match optional_branch(node) {
                Some(branch) => node = branch,
                None => break,
            }
        }
        read_only |= marked_read_only(node);
        Self {
            root: self.root,
            node,
            read_only,
        }
    }

    fn lookup(&self, reference: &str) -> Option<&'a Value> {
        let pointer = reference.strip_prefix('#')?;
        if pointer.is_empty() {
            Some(self.root)
        } else {
            self.root.pointer(pointer)
        }
    }
}

/// The single non-null branch of an `anyOf`/`oneOf` that also admits null.
fn optional_branch(node: &Value) -> Option<&Value> {
    let branches = node
        .get("anyOf")
        .or_else(|| node.get("oneOf"))
        .and_then(Value::as_array)?;
    let (nulls, others): (Vec<&Value>, Vec<&Value>) =
        branches.iter().partition(|branch| is_null_schema(branch));
    if !nulls.is_empty() && others.len() == 1 {
        Some(others[0])
    } else {
        None
    }
}

fn marked_read_only(schema: &Value) -> bool {
    schema
        .get("readOnly")
        .and_then(Value::as_bool)
        .unwrap_or(false)
}

fn is_null_schema(schema: &Value) -> bool {
    schema.get("type").and_then(Value::as_str) == Some("null")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "meta": { "$ref": "#/$defs/Meta" },
                "version": { "type": "string", "readOnly": true },
                "plugins": {
                    "type": "object",
                    "additionalProperties": { "$ref": "#/$defs/Plugin" }
                },
                "owner": {
                    "anyOf": [{ "$ref": "#/$defs/Owner" }, { "type": "null" }]
                }
            },
            "$defs": {
                "Meta": {
                    "type": "object",
                    "properties": {
                        "name": { "type": "string" },
                        "id": { "type": "integer", "readOnly": true }
                    }
                },
                "Plugin": {
                    "type": "object",
                    "properties": { "enabled": { "type": "boolean" } }
                },
                "Owner": {
                    "type": "object",
                    "properties": { "email": { "type": "string" } }
                }
            }
        })
    }

    #[test]
    fn test_properties_in_declared_order() {
        let schema = schema();
        let root = SchemaNode::new(&schema);
        let keys: Vec<&str> = root.properties().iter().map(|(k, _)| *k).collect();
        assert_eq!(keys, vec!["meta", "version", "plugins", "owner"]);
    }

    #[test]
    fn test_ref_resolution() {
        let schema = schema();
        let root = SchemaNode::new(&schema);
        let meta = root.property("meta").unwrap();
        assert!(meta.is_model());
        assert!(meta.property("name").is_some());
        assert!(meta.property("nope").is_none());
    }

    #[test]
    fn test_map_values_resolve_through_additional_properties() {
        let schema = schema();
        let root = SchemaNode::new(&schema);
        let plugins = root.property("plugins").unwrap();
        assert!(!plugins.is_model());
        let plugin = root.descend(&["plugins", "anything", "enabled"]);
        assert!(plugin.is_some());
    }

    #[test]
    fn test_optional_wrapper_unwrapped() {
        let schema = schema();
        let root = SchemaNode::new(&schema);
        let owner = root.property("owner").unwrap();
        assert!(owner.is_model());
        assert!(root.descend(&["owner", "email"]).is_some());
    }

    #[test]
    fn test_frozen_along_and_frozen_fields() {
        let schema = schema();
        let root = SchemaNode::new(&schema);
        assert!(root.frozen_along(&["version"]));
        assert!(root.frozen_along(&["meta", "id"]));
        assert!(!root.frozen_along(&["meta", "name"]));
        assert!(!root.frozen_along(&["missing"]));
        assert_eq!(
            root.frozen_fields(),
            vec![
                vec!["meta".to_string(), "id".to_string()],
                vec!["version".to_string()],
            ]
        );
    }

    #[test]
    fn test_read_only_next_to_ref_survives_resolution() {
        let schema = json!({
            "type": "object",
            "properties": {
                "meta": { "$ref": "#/$defs/Meta", "readOnly": true }
            },
            "$defs": {
                "Meta": { "type": "object", "properties": { "name": {} } }
            }
        });
        let root = SchemaNode::new(&schema);
        assert!(root.frozen_along(&["meta", "name"]));
    }

    #[test]
    fn test_frozen_root() {
        let schema = json!({"type": "object", "readOnly": true, "properties": {"a": {}}});
        let root = SchemaNode::new(&schema);
        assert!(root.frozen_along(&["a"]));
        assert!(root.frozen_along::<&str>(&[]));
    }

    #[test]
    fn test_self_referencing_schema_terminates() {
        let schema = json!({
            "$ref": "#/$defs/Node",
            "$defs": {
                "Node": {
                    "type": "object",
                    "properties": {
                        "children": {
                            "type": "object",
                            "additionalProperties": { "$ref": "#/$defs/Node" }
                        },
                        "locked": { "type": "boolean", "readOnly": true }
                    }
                }
            }
        });
        let root = SchemaNode::new(&schema);
        assert!(root.is_model());
        assert_eq!(root.frozen_fields(), vec![vec!["locked".to_string()]]);
        assert!(root.descend(&["children", "a", "children", "b", "locked"]).is_some());
    }
}
