// src/process/load.rs
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use tracing::{debug, instrument};

use crate::error::{ConvertError, Result};
use crate::process::date_parser::parse_timestamp;
use crate::process::table::{ColumnData, Table, Value};

/// Parse raw JSON bytes into a [`Table`].
///
/// Accepted shapes:
/// - an array of objects, one per row; columns are the union of keys in
///   first-seen order and a key missing from a row yields a null cell
/// - an object of columns, each either `{"<row label>": value}` or an array
///
/// Columns whose source name looks like a timestamp field are converted to
/// UTC timestamps when every non-null cell parses (see
/// [`is_default_timestamp_column`]).
#[instrument(level = "debug", skip(bytes), fields(bytes = bytes.len()))]
pub fn parse_records(bytes: &[u8]) -> Result<Table> {
    let text = std::str::from_utf8(bytes)
        .map_err(|e| ConvertError::MalformedInput(format!("input is not UTF-8: {e}")))?;
    let doc: JsonValue = serde_json::from_str(text)
        .map_err(|e| ConvertError::MalformedInput(format!("invalid JSON: {e}")))?;

    let mut table = match doc {
        JsonValue::Array(rows) => from_records(rows)?,
        JsonValue::Object(cols) => from_columns(cols)?,
        other => {
            return Err(ConvertError::MalformedInput(format!(
                "expected an array of records or an object of columns, got {}",
                json_kind(&other)
            )))
        }
    };

    detect_timestamps(&mut table);
    debug!(
        rows = table.num_rows(),
        columns = table.num_columns(),
        "parsed records"
    );
    Ok(table)
}

fn from_records(rows: Vec<JsonValue>) -> Result<Table> {
    let num_rows = rows.len();
    let mut names: Vec<String> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut cells: Vec<Vec<Value>> = Vec::new();

    for (row, record) in rows.into_iter().enumerate() {
        let kind = json_kind(&record);
        let JsonValue::Object(fields) = record else {
            return Err(ConvertError::MalformedInput(format!(
                "record {row} is {kind}, expected an object"
            )));
        };
        for (key, v) in fields {
            let col = *index.entry(key.clone()).or_insert_with(|| {
                names.push(key);
                // back-fill rows seen before this key appeared
                cells.push(vec![Value::Null; row]);
                cells.len() - 1
            });
            cells[col].push(Value::from(v));
        }
        // pad columns this record did not mention
        for col in cells.iter_mut() {
            if col.len() == row {
                col.push(Value::Null);
            }
        }
    }

    let mut table = Table::new(num_rows);
    for (name, col) in names.into_iter().zip(cells) {
        table.push_column(name, ColumnData::Raw(col));
    }
    Ok(table)
}

fn from_columns(cols: serde_json::Map<String, JsonValue>) -> Result<Table> {
    if cols.values().all(JsonValue::is_array) {
        let mut num_rows = None;
        let mut built = Vec::with_capacity(cols.len());
        for (name, v) in cols {
            let JsonValue::Array(items) = v else {
                continue;
            };
            match num_rows {
                None => num_rows = Some(items.len()),
                Some(n) if n != items.len() => {
                    return Err(ConvertError::MalformedInput(format!(
                        "column {name:?} has {} values, expected {n}",
                        items.len()
                    )))
                }
                Some(_) => {}
            }
            built.push((name, items.into_iter().map(Value::from).collect()));
        }
        let mut table = Table::new(num_rows.unwrap_or(0));
        for (name, col) in built {
            table.push_column(name, ColumnData::Raw(col));
        }
        return Ok(table);
    }

    // {"col": {"row label": value}}: rows are the union of labels
    let mut labels: Vec<String> = Vec::new();
    let mut label_index: HashMap<String, usize> = HashMap::new();
    let mut sparse: Vec<(String, Vec<(usize, Value)>)> = Vec::with_capacity(cols.len());
    for (name, v) in cols {
        let kind = json_kind(&v);
        let JsonValue::Object(by_label) = v else {
            return Err(ConvertError::MalformedInput(format!(
                "column {name:?} is {kind}, expected an object or array"
            )));
        };
        let mut entries = Vec::with_capacity(by_label.len());
        for (label, cell) in by_label {
            let row = *label_index.entry(label.clone()).or_insert_with(|| {
                labels.push(label);
                labels.len() - 1
            });
            entries.push((row, Value::from(cell)));
        }
        sparse.push((name, entries));
    }

    let mut table = Table::new(labels.len());
    for (name, entries) in sparse {
        let mut col = vec![Value::Null; labels.len()];
        for (row, cell) in entries {
            col[row] = cell;
        }
        table.push_column(name, ColumnData::Raw(col));
    }
    Ok(table)
}

/// Source column names that are treated as timestamp fields.
pub fn is_default_timestamp_column(name: &str) -> bool {
    let lower = name.to_lowercase();
    lower.ends_with("_at")
        || lower.ends_with("_time")
        || lower.starts_with("timestamp")
        || matches!(lower.as_str(), "modified" | "date" | "datetime")
}

fn detect_timestamps(table: &mut Table) {
    for idx in 0..table.num_columns() {
        let col = &table.columns()[idx];
        if !is_default_timestamp_column(&col.name) {
            continue;
        }
        let ColumnData::Raw(cells) = &col.data else {
            continue;
        };
        if let Some(parsed) = all_timestamps(cells) {
            debug!(column = %col.name, "detected timestamp column");
            table.replace_data(idx, ColumnData::Timestamp(parsed));
        }
    }
}

/// Converts only if there is at least one value and every non-null is a
/// timestamp string.
fn all_timestamps(cells: &[Value]) -> Option<Vec<Option<chrono::DateTime<chrono::Utc>>>> {
    let mut seen = false;
    let mut out = Vec::with_capacity(cells.len());
    for cell in cells {
        match cell {
            Value::Null => out.push(None),
            Value::Str(s) => {
                out.push(Some(parse_timestamp(s)?));
                seen = true;
            }
            Value::Bool(_) | Value::Int(_) | Value::Float(_) | Value::Nested(_) => return None,
        }
    }
    seen.then_some(out)
}

fn json_kind(v: &JsonValue) -> &'static str {
    match v {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "a boolean",
        JsonValue::Number(_) => "a number",
        JsonValue::String(_) => "a string",
        JsonValue::Array(_) => "an array",
        JsonValue::Object(_) => "an object",
    }
}
