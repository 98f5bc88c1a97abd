//! # tomlbind-schema — Schema Validation Capability
//!
//! The validation engine that `tomlbind` binds documents against. Wraps the
//! `jsonschema` crate behind a small surface that the binding layer needs:
//!
//! - [`SchemaValidator`] compiles a JSON Schema once and validates JSON
//!   instances, reporting every failure as an ordered [`Violation`] record
//!   (`location`, `keyword`, `schema_path`, `message`).
//! - [`SchemaNode`] navigates the schema by declared field name, resolving
//!   local `$ref`s and optional wrappers, so callers can tell nested models
//!   from leaves and find `readOnly` (frozen) fields.
//!
//! ## Crate Policy
//!
//! - No dependency on TOML; instances are `serde_json::Value`.
//! - Violations are never reordered or merged. Consumers rely on the
//!   validator's order.

pub mod validate;
pub mod walk;

pub use jsonschema::Draft;
pub use validate::{
    keyword, SchemaValidationError, SchemaValidator, ValidationViolations, Violation,
};
pub use walk::SchemaNode;
