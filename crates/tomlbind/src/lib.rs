//! # tomlbind — Schema-Validated Models over Style-Preserving TOML
//!
//! Binds a serde model, validated by JSON Schema, to the `toml_edit`
//! document it was read from, so edits to the model can be written back
//! without disturbing the file's comments, whitespace, key order, or inline
//! tables.
//!
//! ## Key Design Principles
//!
//! 1. **The schema decides validity.** Documents, assignments and merges are
//!    validated by [`tomlbind_schema::SchemaValidator`] before serde ever
//!    sees them. Failures are reported per document field
//!    ([`FieldError`]), or untranslated on request ([`ErrorMode::Native`]).
//!
//! 2. **All-or-nothing mutation.** Every operation on [`ModelBoundToml`]
//!    works on a copy and commits only after validation succeeds.
//!
//! 3. **Minimal writes.** [`ModelBoundToml::dump`] rewrites only the values
//!    that changed, and never adds defaults the document did not have.
//!
//! 4. **Declared fields only.** Reflective access by [`FieldPath`] is
//!    limited to fields the schema declares; `readOnly` fields are frozen.
//!
//! ## Example
//!
//! ```
//! use serde::{Deserialize, Serialize};
//! use serde_json::json;
//! use tomlbind::{ErrorMode, ModelBoundToml, TomlModel};
//!
//! #[derive(Debug, Clone, Serialize, Deserialize)]
//! struct Manifest {
//!     project: Project,
//! }
//!
//! #[derive(Debug, Clone, Serialize, Deserialize)]
//! struct Project {
//!     typechecked: bool,
//! }
//!
//! impl TomlModel for Manifest {
//!     fn schema() -> serde_json::Value {
//!         json!({
//!             "type": "object",
//!             "required": ["project"],
//!             "properties": {
//!                 "project": {
//!                     "type": "object",
//!                     "required": ["typechecked"],
//!                     "properties": { "typechecked": { "type": "boolean" } }
//!                 }
//!             }
//!         })
//!     }
//! }
//!
//! let document = "[project]\ntypechecked = false\n".parse().unwrap();
//! let mut bound = ModelBoundToml::<Manifest>::new(document, ErrorMode::Human).unwrap();
//! bound.model_mut().project.typechecked = true;
//! assert_eq!(bound.dump_to_string().unwrap(), "[project]\ntypechecked = true\n");
//! ```
//!
//! ## Crate Policy
//!
//! - No I/O. Callers parse and write documents themselves.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod binding;
pub mod convert;
pub mod diff;
mod dump;
pub mod error;
pub mod path;
pub mod translate;
pub mod validators;

// Re-export primary types for ergonomic imports.
pub use binding::{MergeMode, ModelBoundToml, TomlModel};
pub use convert::ConversionError;
pub use diff::Difference;
pub use error::BindError;
pub use path::{assign, resolve, resolve_or, FieldPath, Node, NodeMut, PathError};
pub use translate::{translate_violations, ErrorMode, FieldError, FieldErrorKind, TomlValidationError};
pub use validators::{
    validate_heterogeneous_collection, validate_homogeneous_collection,
    validate_to_multiple_types, validate_to_specific_type, Typed, ValueError, ValueType,
};
