//! # Error Types
//!
//! The binding's top-level error. Every fallible [`ModelBoundToml`]
//! operation returns [`BindError`]; the focused error types of the other
//! modules convert into it with `?`.
//!
//! ## Design
//!
//! - Validation failures come in two shapes, chosen per call by
//!   [`ErrorMode`]: a translated [`TomlValidationError`] addressed by
//!   document path, or the validator's own [`SchemaValidationError`].
//! - Reflective access to a field the schema does not declare is
//!   [`BindError::AttributeNotFound`], never a validation error.
//!
//! [`ModelBoundToml`]: crate::ModelBoundToml
//! [`ErrorMode`]: crate::ErrorMode

use thiserror::Error;
use tomlbind_schema::SchemaValidationError;

use crate::convert::ConversionError;
use crate::path::FieldPath;
use crate::translate::TomlValidationError;

/// Top-level error type for binding operations.
#[derive(Error, Debug)]
pub enum BindError {
    /// The document or assignment failed validation (translated).
    #[error(transparent)]
    Validation(#[from] TomlValidationError),

    /// The validator's untranslated failure, or a schema that could not be
    /// loaded or compiled.
    #[error(transparent)]
    Schema(#[from] SchemaValidationError),

    /// The path does not name a declared field of the model.
    #[error("model has no field \"{0}\"")]
    AttributeNotFound(FieldPath),

    /// A value cannot be represented on the other side of the TOML/JSON
    /// bridge.
    #[error("conversion error: {0}")]
    Conversion(#[from] ConversionError),

    /// The validated value could not be (de)serialized as the model type.
    #[error("model serialization error: {0}")]
    Model(#[from] serde_json::Error),
}

impl BindError {
    /// The translated field errors, if this is a [`BindError::Validation`].
    pub fn validation(&self) -> Option<&TomlValidationError> {
        match self {
            Self::Validation(errors) => Some(errors),
            _ => None,
        }
    }
}
