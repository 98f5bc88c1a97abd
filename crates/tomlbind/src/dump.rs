//! # In-Place Dump
//!
//! Writes a model's JSON view into an existing TOML table one value at a
//! time, leaving everything that did not change byte-for-byte intact:
//! comments, whitespace, key order, inline-vs-standard table choice, and
//! keys the model does not know about.
//!
//! A value is only written when it differs from what the document holds.
//! Keys the document lacks are only added when the model value differs from
//! the baseline, so defaults the model filled in at bind time stay out of
//! the file.

use serde_json::{Map, Value as Json};
use toml_edit::{ArrayOfTables, InlineTable, Item, Table, TableLike, Value};

use crate::convert::{coerce_like, item_to_json, json_eq, json_to_item, json_to_table, ConversionError};
use crate::path::replace_item;

/// Sync `target` with `current`.
///
/// `baseline` is the JSON view the model had when the document was last
/// bound; `inline` is set inside inline tables, where only inline values may
/// be inserted.
pub(crate) fn write_fields(
    current: &Map<String, Json>,
    baseline: Option<&Json>,
    target: &mut dyn TableLike,
    inline: bool,
) -> Result<(), ConversionError> {
    for (key, value) in current {
        let base = baseline.and_then(|b| b.get(key));
        let present = target.get(key).is_some_and(|item| !item.is_none());

        if value.is_null() {
            if present {
                tracing::trace!(key = %key, "removing unset field");
                target.remove(key);
            }
            continue;
        }

        if present {
            if let Some(slot) = target.get_mut(key) {
                write_item(slot, value, base, inline)?;
            }
            continue;
        }

        if base.is_some_and(|base| json_eq(base, value)) {
            continue;
        }
        if let (Json::Object(map), Some(base)) = (value, base) {
            if base.is_object() {
                if let Some(item) = new_table(map, base, inline)? {
                    tracing::trace!(key = %key, "adding changed fields of defaulted table");
                    target.insert(key, item);
                }
                continue;
            }
        }
        if let Some(item) = json_to_item(value, inline)? {
            tracing::trace!(key = %key, "adding field");
            target.insert(key, item);
        }
    }

    if let Some(Json::Object(base)) = baseline {
        for key in base.keys() {
            if !current.contains_key(key) && target.contains_key(key) {
                tracing::trace!(key = %key, "removing vanished field");
                target.remove(key);
            }
        }
    }
    Ok(())
}

/// A table holding only the fields of `current` that differ from `baseline`,
/// or `None` if there are none.
fn new_table(
    current: &Map<String, Json>,
    baseline: &Json,
    inline: bool,
) -> Result<Option<Item>, ConversionError> {
    if inline {
        let mut table = InlineTable::new();
        write_fields(current, Some(baseline), &mut table, true)?;
        return Ok((!table.is_empty()).then(|| Item::Value(Value::InlineTable(table))));
    }
    let mut table = Table::new();
    write_fields(current, Some(baseline), &mut table, false)?;
    Ok((!table.is_empty()).then(|| Item::Table(table)))
}

fn write_item(
    slot: &mut Item,
    value: &Json,
    base: Option<&Json>,
    inline: bool,
) -> Result<(), ConversionError> {
    if let Json::Object(map) = value {
        let nested_inline = inline || slot.is_inline_table();
        if let Some(table) = slot.as_table_like_mut() {
            return write_fields(map, base, table, nested_inline);
        }
    }

    if let (Item::ArrayOfTables(tables), Json::Array(items)) = (&mut *slot, value) {
        if items.iter().all(Json::is_object) {
            return sync_tables(tables, items, base.and_then(Json::as_array));
        }
    }

    if item_to_json(slot)?.is_some_and(|existing| json_eq(&existing, value)) {
        return Ok(());
    }

    let Some(mut replacement) = json_to_item(value, inline || slot.is_value())? else {
        return Ok(());
    };
    if let (Item::Value(old), Item::Value(new)) = (&*slot, &mut replacement) {
        *new = coerce_like(old, new.clone());
    }
    replace_item(slot, replacement);
    Ok(())
}

/// Edit existing tables in place, append new ones, drop the surplus.
fn sync_tables(
    tables: &mut ArrayOfTables,
    items: &[Json],
    baseline: Option<&Vec<Json>>,
) -> Result<(), ConversionError> {
    for (index, item) in items.iter().enumerate() {
        let Json::Object(map) = item else {
            continue;
        };
        let base = baseline.and_then(|base| base.get(index));
        match tables.get_mut(index) {
            Some(table) => write_fields(map, base, table, false)?,
            None => tables.push(json_to_table(map)?),
        }
    }
    while tables.len() > items.len() {
        tables.remove(tables.len() - 1);
    }
    Ok(())
}
