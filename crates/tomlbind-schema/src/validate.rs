//! # Schema Validation
//!
//! Compiles a JSON Schema (Draft 2020-12 unless configured otherwise) and
//! validates JSON instances against it. Failures are reported as an ordered
//! list of [`Violation`] records, one per failed keyword, each carrying the
//! instance location as a key sequence, the keyword that failed, the schema
//! path, and a human-readable message.
//!
//! ## Location rules
//!
//! - `required` failures point at the missing property, not at its parent.
//! - `additionalProperties` / `unevaluatedProperties` failures are split into
//!   one violation per unexpected key, each pointing at that key.
//! - Everything else points at the offending value.
//!
//! The order of violations is the order the underlying validator reports
//! them in. Nothing is sorted or deduplicated.

use std::fmt;
use std::path::Path;

use jsonschema::error::ValidationErrorKind;
use jsonschema::{Draft, ValidationError, Validator};
use serde_json::Value;
use thiserror::Error;

use crate::walk::SchemaNode;

/// Schema keywords the translation layer distinguishes.
pub mod keyword {
    /// A required property is absent.
    pub const REQUIRED: &str = "required";
    /// An undeclared property was rejected.
    pub const ADDITIONAL_PROPERTIES: &str = "additionalProperties";
    /// An undeclared property was rejected by `unevaluatedProperties`.
    pub const UNEVALUATED_PROPERTIES: &str = "unevaluatedProperties";
    /// An immutable field was assigned.
    pub const READ_ONLY: &str = "readOnly";
}

/// Used when a failing schema path carries no recognizable keyword.
const UNKNOWN_KEYWORD: &str = "unknown";

/// Identity used in messages when the schema has neither `$id` nor `title`.
const ANONYMOUS_SCHEMA: &str = "<anonymous>";

/// Error during schema loading, compilation, or validation.
#[derive(Error, Debug)]
pub enum SchemaValidationError {
    /// The instance did not conform to the schema.
    #[error("validation failed against schema '{schema_id}':\n{violations}")]
    ValidationFailed {
        /// `$id` or `title` of the schema that was validated against.
        schema_id: String,
        /// Ordered list of individual violations.
        violations: ValidationViolations,
    },

    /// The schema file could not be read or parsed.
    #[error("schema load error for '{path}': {reason}")]
    SchemaLoadError {
        /// Path of the schema file.
        path: String,
        /// Reason the schema could not be loaded.
        reason: String,
    },

    /// The schema could not be compiled into a validator.
    #[error("failed to compile schema {schema_id}: {reason}")]
    SchemaCompileError {
        /// `$id` or `title` of the schema.
        schema_id: String,
        /// Reason the validator could not be built.
        reason: String,
    },

    /// IO error reading a schema file.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl SchemaValidationError {
    /// The violations carried by a `ValidationFailed` error.
    pub fn violations(&self) -> Option<&ValidationViolations> {
        match self {
            Self::ValidationFailed { violations, .. } => Some(violations),
            _ => None,
        }
    }
}

/// One failed validation at one instance location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// Key sequence to the violating node. Array indices appear as decimal
    /// strings.
    pub location: Vec<String>,
    /// The schema keyword that failed (`required`, `type`, `minimum`, ...).
    pub keyword: String,
    /// JSON Pointer into the schema that triggered the failure.
    pub schema_path: String,
    /// Human-readable description from the validator.
    pub message: String,
}

impl Violation {
    /// A violation for an assignment to a `readOnly` field at `location`.
    pub fn frozen(location: Vec<String>) -> Self {
        Self {
            location,
            keyword: keyword::READ_ONLY.to_string(),
            schema_path: format!("/{}", keyword::READ_ONLY),
            message: "field is frozen".to_string(),
        }
    }

    /// The location rendered as a JSON Pointer (`""` for the root).
    pub fn instance_pointer(&self) -> String {
        self.location
            .iter()
            .map(|segment| format!("/{}", escape_segment(segment)))
            .collect()
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.location.is_empty() {
            write!(f, "  (root): {}", self.message)
        } else {
            write!(f, "  {}: {}", self.instance_pointer(), self.message)
        }
    }
}

/// Ordered collection of validation violations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationViolations {
    violations: Vec<Violation>,
}

impl ValidationViolations {
    /// Returns the number of violations.
    pub fn len(&self) -> usize {
        self.violations.len()
    }

    /// Returns true if there are no violations.
    pub fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }

    /// Returns a slice of all violations.
    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    /// Iterates the violations in reported order.
    pub fn iter(&self) -> std::slice::Iter<'_, Violation> {
        self.violations.iter()
    }

    /// Consumes self and returns the inner Vec.
    pub fn into_inner(self) -> Vec<Violation> {
        self.violations
    }
}

impl From<Vec<Violation>> for ValidationViolations {
    fn from(violations: Vec<Violation>) -> Self {
        Self { violations }
    }
}

impl<'a> IntoIterator for &'a ValidationViolations {
    type Item = &'a Violation;
    type IntoIter = std::slice::Iter<'a, Violation>;

    fn into_iter(self) -> Self::IntoIter {
        self.violations.iter()
    }
}

impl fmt::Display for ValidationViolations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, v) in self.violations.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{v}")?;
        }
        Ok(())
    }
}

/// A compiled JSON Schema validator.
///
/// Compilation happens once at construction. The compiled validator is
/// `Send + Sync` and can be shared behind an `Arc` by every binding of the
/// same model type.
pub struct SchemaValidator {
    schema_id: String,
    schema: Value,
    validator: Validator,
}

impl fmt::Debug for SchemaValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaValidator")
            .field("schema_id", &self.schema_id)
            .finish_non_exhaustive()
    }
}

impl SchemaValidator {
    /// Compile `schema` under Draft 2020-12.
    ///
    /// # Errors
    ///
    /// Returns `SchemaValidationError::SchemaCompileError` if the schema is
    /// not a valid JSON Schema.
    pub fn new(schema: Value) -> Result<Self, SchemaValidationError> {
        Self::with_draft(schema, Draft::Draft202012)
    }

    /// Compile `schema` under an explicit draft.
    pub fn with_draft(schema: Value, draft: Draft) -> Result<Self, SchemaValidationError> {
        let schema_id = schema_identity(&schema);

        let mut opts = jsonschema::options();
        opts.with_draft(draft);
        let validator = opts.build(&schema).map_err(|e| {
            SchemaValidationError::SchemaCompileError {
                schema_id: schema_id.clone(),
                reason: e.to_string(),
            }
        })?;

        tracing::debug!(schema_id = %schema_id, ?draft, "compiled schema validator");
        Ok(Self {
            schema_id,
            schema,
            validator,
        })
    }

    /// Load and compile a `*.schema.json` file.
    ///
    /// # Errors
    ///
    /// Returns `SchemaValidationError::Io` if the file cannot be read,
    /// `SchemaLoadError` if it is not JSON, and `SchemaCompileError` if it
    /// is not a valid schema.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, SchemaValidationError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let schema: Value = serde_json::from_str(&content).map_err(|e| {
            SchemaValidationError::SchemaLoadError {
                path: path.display().to_string(),
                reason: format!("invalid JSON: {e}"),
            }
        })?;
        Self::new(schema)
    }

    /// The schema's `$id` or `title`, or `<anonymous>`.
    pub fn schema_id(&self) -> &str {
        &self.schema_id
    }

    /// The raw schema document.
    pub fn schema(&self) -> &Value {
        &self.schema
    }

    /// Navigation handle on the schema root.
    pub fn root(&self) -> SchemaNode<'_> {
        SchemaNode::new(&self.schema)
    }

    /// Fast check without collecting violations.
    pub fn is_valid(&self, instance: &Value) -> bool {
        self.validator.is_valid(instance)
    }

    /// Every violation of `instance`, in reported order.
    pub fn violations(&self, instance: &Value) -> Vec<Violation> {
        self.validator
            .iter_errors(instance)
            .flat_map(|error| violations_from_error(&error))
            .collect()
    }

    /// Validate `instance`.
    ///
    /// # Errors
    ///
    /// Returns `SchemaValidationError::ValidationFailed` with every violation
    /// if the instance is invalid.
    pub fn validate(&self, instance: &Value) -> Result<(), SchemaValidationError> {
        let violations = self.violations(instance);
        if violations.is_empty() {
            Ok(())
        } else {
            Err(self.failure(violations))
        }
    }

    /// Wrap `violations` as a `ValidationFailed` error for this schema.
    pub fn failure(&self, violations: Vec<Violation>) -> SchemaValidationError {
        SchemaValidationError::ValidationFailed {
            schema_id: self.schema_id.clone(),
            violations: violations.into(),
        }
    }
}

fn schema_identity(schema: &Value) -> String {
    schema
        .get("$id")
        .or_else(|| schema.get("title"))
        .and_then(Value::as_str)
        .unwrap_or(ANONYMOUS_SCHEMA)
        .to_string()
}

/// Expand one validator error into violation records.
fn violations_from_error(error: &ValidationError<'_>) -> Vec<Violation> {
    let location = parse_pointer(&error.instance_path.to_string());
    let schema_path = error.schema_path.to_string();

    match &error.kind {
        ValidationErrorKind::Required { property } => {
            let name = match property {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            vec![Violation {
                location: with_segment(&location, name),
                keyword: keyword::REQUIRED.to_string(),
                schema_path,
                message: error.to_string(),
            }]
        }
        ValidationErrorKind::AdditionalProperties { unexpected } => {
            unexpected_keys(&location, unexpected, keyword::ADDITIONAL_PROPERTIES, &schema_path)
        }
        ValidationErrorKind::UnevaluatedProperties { unexpected } => {
            unexpected_keys(&location, unexpected, keyword::UNEVALUATED_PROPERTIES, &schema_path)
        }
        _ => vec![Violation {
            location,
            keyword: keyword_from_schema_path(&schema_path),
            schema_path,
            message: error.to_string(),
        }],
    }
}

fn unexpected_keys(
    location: &[String],
    unexpected: &[String],
    keyword: &str,
    schema_path: &str,
) -> Vec<Violation> {
    unexpected
        .iter()
        .map(|key| Violation {
            location: with_segment(location, key.clone()),
            keyword: keyword.to_string(),
            schema_path: schema_path.to_string(),
            message: format!("Additional properties are not allowed ('{key}' was unexpected)"),
        })
        .collect()
}

fn with_segment(location: &[String], segment: String) -> Vec<String> {
    let mut out = location.to_vec();
    out.push(segment);
    out
}

/// The last schema path segment that names a keyword.
fn keyword_from_schema_path(schema_path: &str) -> String {
    schema_path
        .rsplit('/')
        .find(|segment| !segment.is_empty() && !segment.bytes().all(|b| b.is_ascii_digit()))
        .unwrap_or(UNKNOWN_KEYWORD)
        .to_string()
}

/// Split a JSON Pointer into unescaped segments.
fn parse_pointer(pointer: &str) -> Vec<String> {
    if pointer.is_empty() {
        return Vec::new();
    }
    pointer
        .split('/')
        .skip(1)
        .map(|segment| segment.replace("~1", "/").replace("~0", "~"))
        .collect()
}

fn escape_segment(segment: &str) -> String {
    segment.replace('~', "~0").replace('/', "~1")
}
