//! # Value Conversion
//!
//! Bridges TOML document items and the JSON data model the schema validator
//! and serde work on.
//!
//! TOML -> JSON is lossless except for datetimes, which become their RFC 3339
//! string form. JSON -> TOML fails for values TOML cannot hold: `null`
//! inside arrays and integers beyond `i64`. A `null` field is "absent" and
//! produces no item at all.

use serde_json::{Map, Number, Value as Json};
use thiserror::Error;
use toml_edit::{Array, ArrayOfTables, Datetime, DocumentMut, InlineTable, Item, Table, Value};

/// A value that cannot cross between TOML and JSON.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConversionError {
    /// `nan` and `inf` have no JSON representation.
    #[error("float {value} has no JSON representation")]
    NonFiniteFloat {
        /// The offending float.
        value: f64,
    },

    /// TOML integers are signed 64-bit.
    #[error("integer {0} does not fit in a TOML integer")]
    IntegerOutOfRange(String),

    /// TOML arrays cannot contain absent values.
    #[error("arrays cannot hold null values")]
    NullInArray,

    /// A document root must be a table.
    #[error("expected a table at the document root, found {found}")]
    NotATable {
        /// JSON type of the value found instead.
        found: &'static str,
    },
}

/// JSON type name, for messages.
pub(crate) fn json_type_name(value: &Json) -> &'static str {
    match value {
        Json::Null => "null",
        Json::Bool(_) => "boolean",
        Json::Number(_) => "number",
        Json::String(_) => "string",
        Json::Array(_) => "array",
        Json::Object(_) => "object",
    }
}

/// JSON view of a whole document. An empty document is an empty object.
pub fn document_to_json(document: &DocumentMut) -> Result<Json, ConversionError> {
    Ok(item_to_json(document.as_item())?.unwrap_or_else(|| Json::Object(Map::new())))
}

/// JSON view of an item; `Item::None` is `None`.
pub fn item_to_json(item: &Item) -> Result<Option<Json>, ConversionError> {
    match item {
        Item::None => Ok(None),
        Item::Value(value) => value_to_json(value).map(Some),
        Item::Table(table) => table_to_json(table).map(Some),
        Item::ArrayOfTables(tables) => tables
            .iter()
            .map(table_to_json)
            .collect::<Result<Vec<_>, _>>()
            .map(|tables| Some(Json::Array(tables))),
    }
}

/// JSON view of a value.
pub fn value_to_json(value: &Value) -> Result<Json, ConversionError> {
    Ok(match value {
        Value::String(s) => Json::String(s.value().clone()),
        Value::Integer(i) => Json::from(*i.value()),
        Value::Float(f) => {
            let value = *f.value();
            Number::from_f64(value)
                .map(Json::Number)
                .ok_or(ConversionError::NonFiniteFloat { value })?
        }
        Value::Boolean(b) => Json::Bool(*b.value()),
        Value::Datetime(dt) => Json::String(dt.value().to_string()),
        Value::Array(array) => Json::Array(
            array
                .iter()
                .map(value_to_json)
                .collect::<Result<Vec<_>, _>>()?,
        ),
        Value::InlineTable(table) => {
            let mut map = Map::new();
            for (key, value) in table.iter() {
                map.insert(key.to_string(), value_to_json(value)?);
            }
            Json::Object(map)
        }
    })
}

fn table_to_json(table: &Table) -> Result<Json, ConversionError> {
    let mut map = Map::new();
    for (key, item) in table.iter() {
        if let Some(value) = item_to_json(item)? {
            map.insert(key.to_string(), value);
        }
    }
    Ok(Json::Object(map))
}

/// TOML value for `json`; `None` for `null`. Objects become inline tables.
pub fn json_to_value(json: &Json) -> Result<Option<Value>, ConversionError> {
    Ok(match json {
        Json::Null => None,
        Json::Bool(b) => Some(Value::from(*b)),
        Json::Number(n) => Some(number_to_value(n)?),
        Json::String(s) => Some(Value::from(s.as_str())),
        Json::Array(items) => {
            let mut array = Array::new();
            for item in items {
                array.push(json_to_value(item)?.ok_or(ConversionError::NullInArray)?);
            }
            Some(Value::Array(array))
        }
        Json::Object(map) => {
            let mut table = InlineTable::new();
            for (key, value) in map {
                if let Some(value) = json_to_value(value)? {
                    table.insert(key.as_str(), value);
                }
            }
            Some(Value::InlineTable(table))
        }
    })
}

/// TOML item for `json`. Unless `inline`, objects become standard tables and
/// non-empty arrays of objects become arrays of tables.
pub fn json_to_item(json: &Json, inline: bool) -> Result<Option<Item>, ConversionError> {
    match json {
        Json::Object(map) if !inline => json_to_table(map).map(|table| Some(Item::Table(table))),
        Json::Array(items) if !inline && !items.is_empty() && items.iter().all(Json::is_object) => {
            let mut tables = ArrayOfTables::new();
            for item in items {
                if let Json::Object(map) = item {
                    tables.push(json_to_table(map)?);
                }
            }
            Ok(Some(Item::ArrayOfTables(tables)))
        }
        other => Ok(json_to_value(other)?.map(Item::Value)),
    }
}

/// A standard table holding every non-null entry of `map`.
pub fn json_to_table(map: &Map<String, Json>) -> Result<Table, ConversionError> {
    let mut table = Table::new();
    for (key, value) in map {
        if let Some(item) = json_to_item(value, false)? {
            table.insert(key, item);
        }
    }
    Ok(table)
}

fn number_to_value(n: &Number) -> Result<Value, ConversionError> {
    if let Some(i) = n.as_i64() {
        return Ok(Value::from(i));
    }
    if n.is_u64() {
        return Err(ConversionError::IntegerOutOfRange(n.to_string()));
    }
    n.as_f64()
        .map(Value::from)
        .ok_or_else(|| ConversionError::IntegerOutOfRange(n.to_string()))
}

/// `value` as a document would show it: `null` object members are absent.
pub(crate) fn without_nulls(value: &Json) -> Json {
    match value {
        Json::Object(map) => Json::Object(
            map.iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| (k.clone(), without_nulls(v)))
                .collect(),
        ),
        Json::Array(items) => Json::Array(items.iter().map(without_nulls).collect()),
        other => other.clone(),
    }
}

/// Keep a datetime a datetime when its replacement is its string form.
pub(crate) fn coerce_like(existing: &Value, replacement: Value) -> Value {
    if let (Value::Datetime(_), Value::String(s)) = (existing, &replacement) {
        if let Ok(dt) = s.value().parse::<Datetime>() {
            return Value::from(dt);
        }
    }
    replacement
}

/// Structural equality where numbers compare by numeric value, so `1` and
/// `1.0` are equal.
pub fn json_eq(a: &Json, b: &Json) -> bool {
    match (a, b) {
        (Json::Number(x), Json::Number(y)) => {
            if let (Some(x), Some(y)) = (x.as_i64(), y.as_i64()) {
                return x == y;
            }
            if let (Some(x), Some(y)) = (x.as_u64(), y.as_u64()) {
                return x == y;
            }
            x.as_f64() == y.as_f64()
        }
        (Json::Array(x), Json::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(x, y)| json_eq(x, y))
        }
        (Json::Object(x), Json::Object(y)) => {
            x.len() == y.len()
                && x.iter()
                    .all(|(key, v)| y.get(key).is_some_and(|w| json_eq(v, w)))
        }
        _ => a == b,
    }
}
