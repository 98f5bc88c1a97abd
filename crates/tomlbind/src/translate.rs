//! # Error Translation
//!
//! Turns the validator's ordered [`Violation`] records into field errors
//! addressed by document path, so a failure reads as "the TOML field
//! `project.name` is missing" rather than a JSON Pointer into a schema.
//!
//! ## Classification
//!
//! Evaluated per violation, first match wins:
//!
//! 1. `required` is [`FieldErrorKind::Missing`].
//! 2. `additionalProperties` / `unevaluatedProperties` is
//!    [`FieldErrorKind::Attribute`].
//! 3. `readOnly` is [`FieldErrorKind::Frozen`].
//! 4. Anything else is [`FieldErrorKind::Value`].
//!
//! The order of the violations is kept.

use std::fmt;

use thiserror::Error;
use tomlbind_schema::{keyword, SchemaValidationError, Violation};

use crate::error::BindError;
use crate::path::FieldPath;

/// How validation failures are reported.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ErrorMode {
    /// Translate into a [`TomlValidationError`].
    #[default]
    Human,
    /// Return the validator's [`SchemaValidationError`] untouched.
    Native,
}

/// Category of a translated field error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldErrorKind {
    /// A required field is absent from the document.
    Missing,
    /// The document carries a field the model does not declare.
    Attribute,
    /// An immutable field was assigned.
    Frozen,
    /// A field holds a value the model rejects.
    Value,
}

impl FieldErrorKind {
    /// Classify a schema keyword.
    pub fn from_keyword(keyword: &str) -> Self {
        match keyword {
            keyword::REQUIRED => Self::Missing,
            keyword::ADDITIONAL_PROPERTIES | keyword::UNEVALUATED_PROPERTIES => Self::Attribute,
            keyword::READ_ONLY => Self::Frozen,
            _ => Self::Value,
        }
    }

    /// Lowercase name of the kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Missing => "missing",
            Self::Attribute => "attribute",
            Self::Frozen => "frozen",
            Self::Value => "value",
        }
    }
}

impl fmt::Display for FieldErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One translated validation failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    kind: FieldErrorKind,
    loc: FieldPath,
    message: String,
    violation: Violation,
}

impl FieldError {
    /// Translate one violation, optionally pointing it at `location` instead
    /// of where the validator found it.
    pub fn from_violation(violation: &Violation, location: Option<&FieldPath>) -> Self {
        let loc = location
            .cloned()
            .unwrap_or_else(|| FieldPath::new(violation.location.iter().cloned()));
        Self {
            kind: FieldErrorKind::from_keyword(&violation.keyword),
            loc,
            message: violation.message.clone(),
            violation: violation.clone(),
        }
    }

    /// Category of the failure.
    pub fn kind(&self) -> FieldErrorKind {
        self.kind
    }

    /// Document path of the failing field.
    pub fn loc(&self) -> &FieldPath {
        &self.loc
    }

    /// The validator's message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The untranslated violation.
    pub fn violation(&self) -> &Violation {
        &self.violation
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Field \"{}\": {} ({})",
            self.loc, self.message, self.violation.keyword
        )
    }
}

impl std::error::Error for FieldError {}

/// Every field error from one validation, in validator order.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{}", render(.errors))]
pub struct TomlValidationError {
    errors: Vec<FieldError>,
}

impl TomlValidationError {
    /// The field errors.
    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }

    /// Number of field errors.
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Whether there are no field errors.
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Field errors of one kind.
    pub fn of_kind(&self, kind: FieldErrorKind) -> impl Iterator<Item = &FieldError> {
        self.errors.iter().filter(move |error| error.kind == kind)
    }

    /// Consumes self and returns the field errors.
    pub fn into_errors(self) -> Vec<FieldError> {
        self.errors
    }
}

impl<'a> IntoIterator for &'a TomlValidationError {
    type Item = &'a FieldError;
    type IntoIter = std::slice::Iter<'a, FieldError>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.iter()
    }
}

fn render(errors: &[FieldError]) -> String {
    let noun = if errors.len() == 1 { "error" } else { "errors" };
    let mut out = format!(
        "{} {noun} occurred while validating the TOML document:",
        errors.len()
    );
    for error in errors {
        out.push_str("\n  ");
        out.push_str(&error.to_string());
    }
    out
}

/// Translate `violations` in order. With `location`, every error points at
/// that path.
pub fn translate_violations(
    violations: &[Violation],
    location: Option<&FieldPath>,
) -> TomlValidationError {
    TomlValidationError {
        errors: violations
            .iter()
            .map(|violation| FieldError::from_violation(violation, location))
            .collect(),
    }
}

/// Report a validator failure the way `mode` asks for.
///
/// Only `ValidationFailed` is translated; load and compile failures always
/// surface as [`BindError::Schema`].
pub(crate) fn reject(
    err: SchemaValidationError,
    mode: ErrorMode,
    location: Option<&FieldPath>,
) -> BindError {
    match (mode, err.violations()) {
        (ErrorMode::Human, Some(violations)) => {
            translate_violations(violations.violations(), location).into()
        }
        _ => err.into(),
    }
}
