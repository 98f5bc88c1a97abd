//! # Model Binding
//!
//! [`ModelBoundToml`] pairs a validated model instance with the TOML
//! document it was read from. The model is the source of truth; the
//! document is only ever touched by [`ModelBoundToml::dump`], which writes
//! changed values back in place, or replaced wholesale by a successful
//! [`ModelBoundToml::load_from_document`].
//!
//! ## Access surfaces
//!
//! - Typed: [`model`](ModelBoundToml::model),
//!   [`model_mut`](ModelBoundToml::model_mut) (checked when dumped) and
//!   [`update`](ModelBoundToml::update) (re-validated, `readOnly` enforced).
//! - Reflective: [`get_field`](ModelBoundToml::get_field) and
//!   [`set_field`](ModelBoundToml::set_field) by [`FieldPath`], restricted to
//!   fields the schema declares.
//!
//! Every mutating operation works on a copy and commits only after the new
//! state validates, so a failed call leaves the binding unchanged.
//!
//! ## Baseline
//!
//! The binding remembers the model's JSON view as of the last successful
//! bind or merge. Dump uses it to avoid writing defaults the document never
//! had; selective merges use it to tell caller edits from untouched fields.

use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value as Json};
use toml_edit::DocumentMut;
use tomlbind_schema::{SchemaNode, SchemaValidator, Violation};

use crate::convert::{document_to_json, json_eq, json_type_name, without_nulls, ConversionError};
use crate::diff::{difference, Difference};
use crate::dump::write_fields;
use crate::error::BindError;
use crate::path::{assign, resolve, FieldPath};
use crate::translate::{reject, ErrorMode};

/// A serde model with a JSON Schema describing its TOML form.
///
/// The schema decides what a valid document is; serde only materializes the
/// validated value. Fields marked `readOnly` in the schema are frozen: they
/// can be read from the document but not changed through the binding.
pub trait TomlModel: Serialize + DeserializeOwned + Clone {
    /// JSON Schema of the model's document form.
    fn schema() -> Json;
}

/// How [`ModelBoundToml::load_from_document`] combines the current model
/// with an incoming document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum MergeMode {
    /// Take incoming values only for fields the caller has not changed
    /// since the last bind or merge.
    #[default]
    Selective,
    /// Take every field from the incoming document.
    Full,
}

/// A validated model bound to a style-preserving TOML document.
pub struct ModelBoundToml<M: TomlModel> {
    model: M,
    baseline: Json,
    document: DocumentMut,
    validator: Arc<SchemaValidator>,
}

impl<M: TomlModel> ModelBoundToml<M> {
    /// Validate `document` against `M::schema()` and bind it.
    ///
    /// # Errors
    ///
    /// [`BindError::Validation`] (or [`BindError::Schema`] with
    /// [`ErrorMode::Native`]) if the document does not validate;
    /// [`BindError::Schema`] if the schema does not compile.
    pub fn new(document: DocumentMut, mode: ErrorMode) -> Result<Self, BindError> {
        let validator = SchemaValidator::new(M::schema())?;
        Self::with_validator(Arc::new(validator), document, mode)
    }

    /// Bind with an already compiled validator, e.g. one shared between
    /// bindings of the same model.
    pub fn with_validator(
        validator: Arc<SchemaValidator>,
        document: DocumentMut,
        mode: ErrorMode,
    ) -> Result<Self, BindError> {
        let view = document_to_json(&document)?;
        check(&validator, &view, mode, None)?;
        let model: M = serde_json::from_value(view)?;
        let baseline = serde_json::to_value(&model)?;
        tracing::debug!(schema = validator.schema_id(), "bound document");
        Ok(Self {
            model,
            baseline,
            document,
            validator,
        })
    }

    /// The model.
    pub fn model(&self) -> &M {
        &self.model
    }

    /// The model, mutably. Changes are validated only when the model is
    /// dumped; use [`update`](Self::update) to reject them immediately.
    pub fn model_mut(&mut self) -> &mut M {
        &mut self.model
    }

    /// Consumes self and returns the model.
    pub fn into_model(self) -> M {
        self.model
    }

    /// The bound document as of the last dump or merge.
    pub fn document(&self) -> &DocumentMut {
        &self.document
    }

    /// The validator the binding checks against.
    pub fn validator(&self) -> &SchemaValidator {
        &self.validator
    }

    /// Apply `edit` to a copy of the model and commit it if it validates and
    /// leaves every `readOnly` field unchanged.
    pub fn update<F>(&mut self, edit: F, mode: ErrorMode) -> Result<(), BindError>
    where
        F: FnOnce(&mut M),
    {
        let before = serde_json::to_value(&self.model)?;
        let mut candidate = self.model.clone();
        edit(&mut candidate);
        let after = serde_json::to_value(&candidate)?;
        guard(&self.validator, &before, &after, mode)?;

        self.model = candidate;
        tracing::debug!("model updated");
        Ok(())
    }

    /// Write the model into the bound document in place and return it.
    ///
    /// Only values that differ from the document are rewritten, so
    /// formatting and comments elsewhere survive.
    ///
    /// # Errors
    ///
    /// Edits made through [`model_mut`](Self::model_mut) are checked here:
    /// a changed `readOnly` field or a value the schema rejects fails the
    /// dump and leaves the document untouched.
    pub fn dump(&mut self) -> Result<&DocumentMut, BindError> {
        let current = self.outgoing()?;
        write_view(&current, &self.baseline, &mut self.document)?;
        tracing::debug!("dumped model into document");
        Ok(&self.document)
    }

    /// [`dump`](Self::dump), rendered as TOML text.
    pub fn dump_to_string(&mut self) -> Result<String, BindError> {
        Ok(self.dump()?.to_string())
    }

    /// The model's value at `path`, or `None` if the schema does not declare
    /// the field or the model has no value there.
    pub fn get_field(&self, path: impl Into<FieldPath>) -> Option<Json> {
        let path: FieldPath = path.into();
        self.validator.root().descend(path.keys())?;
        let view = serde_json::to_value(&self.model).ok()?;
        resolve(&view, &path).filter(|value| !value.is_null()).cloned()
    }

    /// [`get_field`](Self::get_field) with a fallback.
    pub fn get_field_or(&self, path: impl Into<FieldPath>, default: Json) -> Json {
        self.get_field(path).unwrap_or(default)
    }

    /// Set the field at `path` to `value`.
    ///
    /// # Errors
    ///
    /// - [`BindError::AttributeNotFound`] if `path` is empty, not declared
    ///   by the schema, or cannot be reached in the model.
    /// - A frozen-field error if the field, or a model containing it, is
    ///   `readOnly`.
    /// - A validation error located at `path` if the new value is rejected.
    pub fn set_field<T: Serialize>(
        &mut self,
        path: impl Into<FieldPath>,
        value: T,
        mode: ErrorMode,
    ) -> Result<(), BindError> {
        let path: FieldPath = path.into();
        let root = self.validator.root();
        if path.is_empty() || root.descend(path.keys()).is_none() {
            return Err(BindError::AttributeNotFound(path));
        }
        if root.frozen_along(path.keys()) {
            tracing::warn!(field = %path, "assignment to frozen field");
            let frozen = vec![Violation::frozen(path.keys().to_vec())];
            return Err(reject(self.validator.failure(frozen), mode, Some(&path)));
        }

        let value = serde_json::to_value(value)?;
        let mut view = serde_json::to_value(&self.model)?;
        if assign(&mut view, &path, value).is_err() {
            return Err(BindError::AttributeNotFound(path));
        }
        check(&self.validator, &without_nulls(&view), mode, Some(&path))?;

        self.model = serde_json::from_value(view)?;
        tracing::debug!(field = %path, "field set");
        Ok(())
    }

    /// Declared fields that differ between the dumped model and `incoming`.
    /// Neither the binding nor its document is modified. Fails the way
    /// [`dump`](Self::dump) does if the model cannot be dumped.
    pub fn difference_between_document(
        &self,
        incoming: &DocumentMut,
    ) -> Result<Difference, BindError> {
        let current = self.outgoing()?;
        let mut outgoing = self.document.clone();
        write_view(&current, &self.baseline, &mut outgoing)?;
        let outgoing = document_to_json(&outgoing)?;
        let incoming = document_to_json(incoming)?;
        Ok(difference(self.validator.root(), &outgoing, &incoming))
    }

    /// Replace the model's fields with those of `incoming`.
    ///
    /// `incoming` is validated in full before anything changes. With
    /// [`MergeMode::Selective`], fields the caller changed since the last
    /// bind or merge keep their current value. On success `incoming` becomes
    /// the bound document and the new baseline.
    pub fn load_from_document(
        &mut self,
        incoming: &DocumentMut,
        merge: MergeMode,
        mode: ErrorMode,
    ) -> Result<(), BindError> {
        let view = document_to_json(incoming)?;
        check(&self.validator, &view, mode, None)?;
        let incoming_model: M = serde_json::from_value(view)?;
        let incoming_view = serde_json::to_value(&incoming_model)?;

        let merged = match merge {
            MergeMode::Full => incoming_model,
            MergeMode::Selective => {
                let current = serde_json::to_value(&self.model)?;
                let merged = merge_selective(
                    self.validator.root(),
                    &current,
                    Some(&self.baseline),
                    &incoming_view,
                );
                check(&self.validator, &without_nulls(&merged), mode, None)?;
                serde_json::from_value(merged)?
            }
        };

        self.model = merged;
        self.baseline = incoming_view;
        self.document = incoming.clone();
        tracing::debug!(mode = ?merge, "loaded model from document");
        Ok(())
    }

    /// The model's JSON view, checked against the baseline and the schema.
    fn outgoing(&self) -> Result<Json, BindError> {
        let current = serde_json::to_value(&self.model)?;
        guard(&self.validator, &self.baseline, &current, ErrorMode::Human)?;
        Ok(current)
    }
}

impl<M: TomlModel + fmt::Debug> fmt::Debug for ModelBoundToml<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelBoundToml")
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

fn check(
    validator: &SchemaValidator,
    view: &Json,
    mode: ErrorMode,
    location: Option<&FieldPath>,
) -> Result<(), BindError> {
    validator.validate(view).map_err(|err| {
        tracing::warn!(
            schema = validator.schema_id(),
            violations = err.violations().map_or(0, |v| v.len()),
            "validation rejected"
        );
        reject(err, mode, location)
    })
}

/// Reject `after` if it changes a frozen field of `before` or does not
/// validate.
fn guard(
    validator: &SchemaValidator,
    before: &Json,
    after: &Json,
    mode: ErrorMode,
) -> Result<(), BindError> {
    let frozen = frozen_changes(validator.root(), before, after);
    if !frozen.is_empty() {
        tracing::warn!(fields = frozen.len(), "model changes frozen fields");
        return Err(reject(validator.failure(frozen), mode, None));
    }
    check(validator, &without_nulls(after), mode, None)
}

fn write_view(current: &Json, baseline: &Json, document: &mut DocumentMut) -> Result<(), BindError> {
    let Json::Object(fields) = current else {
        return Err(ConversionError::NotATable {
            found: json_type_name(current),
        }
        .into());
    };
    write_fields(fields, Some(baseline), document.as_table_mut(), false)?;
    Ok(())
}

/// Frozen-field violations for every `readOnly` field whose value differs
/// between `before` and `after`.
fn frozen_changes(root: SchemaNode<'_>, before: &Json, after: &Json) -> Vec<Violation> {
    if root.is_read_only() && !json_eq(before, after) {
        return vec![Violation::frozen(Vec::new())];
    }
    root.frozen_fields()
        .into_iter()
        .filter(|path| {
            let old = resolve(before, path.as_slice());
            let new = resolve(after, path.as_slice());
            match (old, new) {
                (Some(old), Some(new)) => !json_eq(old, new),
                (old, new) => old.is_some_and(|v| !v.is_null()) || new.is_some_and(|v| !v.is_null()),
            }
        })
        .map(Violation::frozen)
        .collect()
}

/// Incoming values, except for declared fields where `current` differs from
/// `baseline`.
fn merge_selective(
    node: SchemaNode<'_>,
    current: &Json,
    baseline: Option<&Json>,
    incoming: &Json,
) -> Json {
    let mut merged: Map<String, Json> = incoming.as_object().cloned().unwrap_or_default();
    for (key, child) in node.properties() {
        let cur = current.get(key);
        let base = baseline.and_then(|b| b.get(key));
        let inc = incoming.get(key);

        if let (Some(cur), Some(inc)) = (cur, inc) {
            if child.is_model() && cur.is_object() && inc.is_object() {
                merged.insert(key.to_string(), merge_selective(child, cur, base, inc));
                continue;
            }
        }

        let edited = match (cur, base) {
            (Some(cur), Some(base)) => !json_eq(cur, base),
            (None, None) => false,
            _ => true,
        };
        if edited {
            tracing::trace!(field = key, "keeping edited field");
            match cur {
                Some(cur) => merged.insert(key.to_string(), cur.clone()),
                None => merged.remove(key),
            };
        }
    }
    Json::Object(merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::translate::FieldErrorKind;
    use serde::Deserialize;
    use serde_json::json;
    use tomlbind_schema::SchemaValidationError;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Manifest {
        project: Project,
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Project {
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        description: Option<String>,
        #[serde(default)]
        typechecked: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<i64>,
    }

    impl TomlModel for Manifest {
        fn schema() -> Json {
            json!({
                "title": "Manifest",
                "type": "object",
                "required": ["project"],
                "properties": {
                    "project": { "$ref": "#/$defs/Project" }
                },
                "$defs": {
                    "Project": {
                        "type": "object",
                        "required": ["name"],
                        "additionalProperties": false,
                        "properties": {
                            "name": { "type": "string", "minLength": 1 },
                            "description": { "type": "string" },
                            "typechecked": { "type": "boolean", "default": false },
                            "id": { "type": "integer", "readOnly": true }
                        }
                    }
                }
            })
        }
    }

    const DOC: &str = "# manifest\n[project]\nname = \"demo\" # the name\ntypechecked = false\nid = 7\n";

    fn bind(text: &str) -> Result<ModelBoundToml<Manifest>, BindError> {
        ModelBoundToml::new(text.parse().unwrap(), ErrorMode::Human)
    }

    #[test]
    fn test_construct_valid() {
        let bound = bind(DOC).unwrap();
        assert_eq!(bound.model().project.name, "demo");
        assert_eq!(bound.model().project.id, Some(7));
    }

    #[test]
    fn test_construct_missing_field() {
        let err = bind("[project]\ndescription = \"x\"\n").unwrap_err();
        let errors = err.validation().unwrap();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors.errors()[0].kind(), FieldErrorKind::Missing);
        assert_eq!(errors.errors()[0].loc(), &FieldPath::from(["project", "name"]));
    }

    #[test]
    fn test_construct_native_errors() {
        let doc: DocumentMut = "[project]\nname = 1\n".parse().unwrap();
        let err = ModelBoundToml::<Manifest>::new(doc, ErrorMode::Native).unwrap_err();
        assert!(matches!(
            err,
            BindError::Schema(SchemaValidationError::ValidationFailed { .. })
        ));
    }

    #[test]
    fn test_extra_field_is_attribute_error() {
        let err = bind("[project]\nname = \"a\"\nbogus = 1\n").unwrap_err();
        let errors = err.validation().unwrap();
        assert_eq!(errors.errors()[0].kind(), FieldErrorKind::Attribute);
        assert_eq!(errors.errors()[0].loc(), &FieldPath::from(["project", "bogus"]));
    }

    #[test]
    fn test_get_field() {
        let bound = bind(DOC).unwrap();
        assert_eq!(bound.get_field(["project", "name"]), Some(json!("demo")));
        assert_eq!(bound.get_field(FieldPath::dotted("project.typechecked")), Some(json!(false)));
        assert_eq!(bound.get_field(["project", "description"]), None);
        assert_eq!(bound.get_field(["project", "undeclared"]), None);
        assert_eq!(bound.get_field_or("nothing", json!(3)), json!(3));
    }

    #[test]
    fn test_set_field() {
        let mut bound = bind(DOC).unwrap();
        bound
            .set_field(["project", "description"], "words", ErrorMode::Human)
            .unwrap();
        assert_eq!(bound.model().project.description.as_deref(), Some("words"));
    }

    #[test]
    fn test_set_field_undeclared() {
        let mut bound = bind(DOC).unwrap();
        let err = bound
            .set_field(["project", "nope"], 1, ErrorMode::Human)
            .unwrap_err();
        assert!(matches!(err, BindError::AttributeNotFound(_)));
        let err = bound
            .set_field(FieldPath::root(), 1, ErrorMode::Human)
            .unwrap_err();
        assert!(matches!(err, BindError::AttributeNotFound(_)));
    }

    #[test]
    fn test_set_field_invalid_value_is_located_at_path() {
        let mut bound = bind(DOC).unwrap();
        let err = bound
            .set_field(["project", "name"], "", ErrorMode::Human)
            .unwrap_err();
        let errors = err.validation().unwrap();
        assert_eq!(errors.errors()[0].kind(), FieldErrorKind::Value);
        assert_eq!(errors.errors()[0].loc(), &FieldPath::from(["project", "name"]));
        assert_eq!(bound.model().project.name, "demo");
    }

    #[test]
    fn test_set_field_frozen() {
        let mut bound = bind(DOC).unwrap();
        let err = bound
            .set_field(["project", "id"], 8, ErrorMode::Human)
            .unwrap_err();
        let errors = err.validation().unwrap();
        assert_eq!(errors.errors()[0].kind(), FieldErrorKind::Frozen);
        assert_eq!(bound.model().project.id, Some(7));
    }

    #[test]
    fn test_update_rejects_frozen_and_invalid() {
        let mut bound = bind(DOC).unwrap();
        let err = bound
            .update(|m| m.project.id = Some(9), ErrorMode::Human)
            .unwrap_err();
        assert_eq!(
            err.validation().unwrap().errors()[0].kind(),
            FieldErrorKind::Frozen
        );
        assert!(bound
            .update(|m| m.project.name.clear(), ErrorMode::Human)
            .is_err());
        assert_eq!(bound.model().project.name, "demo");

        bound
            .update(|m| m.project.typechecked = true, ErrorMode::Human)
            .unwrap();
        assert!(bound.model().project.typechecked);
    }

    #[test]
    fn test_dump_preserves_formatting() {
        let mut bound = bind(DOC).unwrap();
        bound.model_mut().project.typechecked = true;
        assert_eq!(
            bound.dump_to_string().unwrap(),
            "# manifest\n[project]\nname = \"demo\" # the name\ntypechecked = true\nid = 7\n"
        );
    }

    #[test]
    fn test_dump_rejects_unchecked_edits() {
        let text = "[project]\nname   = \"demo\"   # c\nid = 7\n";
        let mut bound = bind(text).unwrap();
        bound.model_mut().project.id = Some(99);
        let err = bound.dump_to_string().unwrap_err();
        let errors = err.validation().unwrap();
        assert_eq!(errors.errors()[0].kind(), FieldErrorKind::Frozen);
        assert_eq!(errors.errors()[0].loc(), &FieldPath::from(["project", "id"]));
        assert_eq!(bound.document().to_string(), text);

        bound.model_mut().project.id = Some(7);
        bound.model_mut().project.name = String::new();
        let err = bound.dump().unwrap_err();
        assert_eq!(
            err.validation().unwrap().errors()[0].loc(),
            &FieldPath::from(["project", "name"])
        );
        assert_eq!(bound.document().to_string(), text);

        let incoming: DocumentMut = text.parse().unwrap();
        assert!(bound.difference_between_document(&incoming).is_err());

        bound.model_mut().project.name = "fixed".to_string();
        assert_eq!(
            bound.dump_to_string().unwrap(),
            "[project]\nname   = \"fixed\"   # c\nid = 7\n"
        );
    }

    #[test]
    fn test_difference_does_not_touch_document() {
        let mut bound = bind(DOC).unwrap();
        bound.model_mut().project.name = "changed".to_string();
        let incoming: DocumentMut = DOC.parse().unwrap();
        let diff = bound.difference_between_document(&incoming).unwrap();
        assert_eq!(diff.incoming_changed, vec![FieldPath::from(["project", "name"])]);
        assert_eq!(bound.document().to_string(), DOC);
    }

    #[test]
    fn test_selective_merge_keeps_edits() {
        let mut bound = bind(DOC).unwrap();
        bound.model_mut().project.typechecked = true;
        let incoming: DocumentMut =
            "[project]\nname = \"renamed\"\ntypechecked = false\nid = 7\n".parse().unwrap();
        bound
            .load_from_document(&incoming, MergeMode::Selective, ErrorMode::Human)
            .unwrap();
        assert_eq!(bound.model().project.name, "renamed");
        assert!(bound.model().project.typechecked);
    }

    #[test]
    fn test_full_merge_overwrites_edits() {
        let mut bound = bind(DOC).unwrap();
        bound.model_mut().project.typechecked = true;
        let incoming: DocumentMut =
            "[project]\nname = \"renamed\"\n".parse().unwrap();
        bound
            .load_from_document(&incoming, MergeMode::Full, ErrorMode::Human)
            .unwrap();
        assert_eq!(bound.model().project.name, "renamed");
        assert!(!bound.model().project.typechecked);
        assert_eq!(bound.model().project.id, None);
    }

    #[test]
    fn test_invalid_merge_changes_nothing() {
        let mut bound = bind(DOC).unwrap();
        let incoming: DocumentMut = "[project]\nname = 3\n".parse().unwrap();
        assert!(bound
            .load_from_document(&incoming, MergeMode::Full, ErrorMode::Human)
            .is_err());
        assert_eq!(bound.model().project.name, "demo");
        assert_eq!(bound.document().to_string(), DOC);
    }

    #[test]
    fn test_shared_validator() {
        let validator = Arc::new(SchemaValidator::new(Manifest::schema()).unwrap());
        let a = ModelBoundToml::<Manifest>::with_validator(
            Arc::clone(&validator),
            DOC.parse().unwrap(),
            ErrorMode::Human,
        )
        .unwrap();
        let b = ModelBoundToml::<Manifest>::with_validator(
            validator,
            "[project]\nname = \"other\"\n".parse().unwrap(),
            ErrorMode::Human,
        )
        .unwrap();
        assert_ne!(a.model(), b.model());
        assert_eq!(a.validator().schema_id(), "Manifest");
    }

    #[test]
    fn test_debug_shows_model() {
        let bound = bind(DOC).unwrap();
        assert!(format!("{bound:?}").starts_with("ModelBoundToml { model: Manifest"));
    }
}
