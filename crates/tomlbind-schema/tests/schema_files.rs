//! Integration test: schemas loaded from `*.schema.json` files, validated
//! against realistic instances, and navigated by declared field.

use serde_json::json;
use std::io::Write;
use tomlbind_schema::{keyword, Draft, SchemaValidationError, SchemaValidator};

const MANIFEST_SCHEMA: &str = r##"{
  "$id": "https://example.com/manifest.schema.json",
  "type": "object",
  "required": ["package"],
  "additionalProperties": false,
  "properties": {
    "package": { "$ref": "#/$defs/Package" },
    "dependencies": {
      "type": "object",
      "additionalProperties": {
        "anyOf": [{ "type": "string" }, { "$ref": "#/$defs/Dependency" }]
      }
    }
  },
  "$defs": {
    "Package": {
      "type": "object",
      "required": ["name", "version"],
      "properties": {
        "name": { "type": "string", "pattern": "^[a-z][a-z0-9-]*$" },
        "version": { "type": "string", "readOnly": true },
        "edition": { "enum": ["2018", "2021"] }
      }
    },
    "Dependency": {
      "type": "object",
      "properties": {
        "version": { "type": "string" },
        "optional": { "type": "boolean" }
      }
    }
  }
}"##;

fn write_schema(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(".schema.json")
        .tempfile()
        .expect("create temp schema");
    file.write_all(contents.as_bytes()).expect("write temp schema");
    file
}

#[test]
fn test_loaded_schema_validates_instances() {
    let file = write_schema(MANIFEST_SCHEMA);
    let validator = SchemaValidator::from_path(file.path()).unwrap();
    assert_eq!(validator.schema_id(), "https://example.com/manifest.schema.json");

    let valid = json!({
        "package": { "name": "tomlbind", "version": "0.1.0", "edition": "2021" },
        "dependencies": { "serde": "1", "toml_edit": { "version": "0.22" } }
    });
    assert!(validator.validate(&valid).is_ok());
}

#[test]
fn test_violations_cover_every_failure_in_order() {
    let file = write_schema(MANIFEST_SCHEMA);
    let validator = SchemaValidator::from_path(file.path()).unwrap();

    let invalid = json!({
        "package": { "name": "Bad Name", "edition": "2015" },
        "workspace": {}
    });
    let violations = validator.violations(&invalid);

    let required = violations
        .iter()
        .find(|v| v.keyword == keyword::REQUIRED)
        .expect("missing version reported");
    assert_eq!(required.location, vec!["package", "version"]);

    let extra = violations
        .iter()
        .find(|v| v.keyword == keyword::ADDITIONAL_PROPERTIES)
        .expect("unexpected key reported");
    assert_eq!(extra.location, vec!["workspace"]);

    assert!(violations
        .iter()
        .any(|v| v.keyword == "pattern" && v.location == vec!["package", "name"]));
    assert!(violations
        .iter()
        .any(|v| v.keyword == "enum" && v.location == vec!["package", "edition"]));

    match validator.validate(&invalid) {
        Err(SchemaValidationError::ValidationFailed { violations: reported, .. }) => {
            assert_eq!(reported.violations(), violations.as_slice());
        }
        other => panic!("expected ValidationFailed, got {other:?}"),
    }
}

#[test]
fn test_navigation_over_loaded_schema() {
    let file = write_schema(MANIFEST_SCHEMA);
    let validator = SchemaValidator::from_path(file.path()).unwrap();
    let root = validator.root();

    assert!(root.property("package").unwrap().is_model());
    assert!(root.descend(&["package", "edition"]).is_some());
    assert!(root.descend(&["dependencies", "serde"]).is_some());
    assert!(root.descend(&["package", "authors"]).is_none());
    assert_eq!(
        root.frozen_fields(),
        vec![vec!["package".to_string(), "version".to_string()]]
    );
}

#[test]
fn test_explicit_draft() {
    let schema = json!({
        "title": "Legacy",
        "type": "object",
        "properties": { "port": { "type": "integer", "exclusiveMinimum": 0 } }
    });
    let validator = SchemaValidator::with_draft(schema, Draft::Draft7).unwrap();
    assert!(validator.is_valid(&json!({ "port": 8080 })));
    assert!(!validator.is_valid(&json!({ "port": 0 })));
}
