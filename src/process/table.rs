use chrono::{DateTime, NaiveDate, Utc};

/// One untyped input cell, as the JSON parser handed it over.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    /// Objects and arrays, kept verbatim.
    Nested(serde_json::Value),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                // u64 above i64::MAX and all non-integers
                None => n.as_f64().map(Value::Float).unwrap_or(Value::Null),
            },
            serde_json::Value::String(s) => Value::Str(s),
            nested @ (serde_json::Value::Array(_) | serde_json::Value::Object(_)) => {
                Value::Nested(nested)
            }
        }
    }
}

/// Cells of one column. `Raw` is whatever the loader inferred; the other
/// variants are produced by timestamp detection or the coercer.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData {
    Raw(Vec<Value>),
    Timestamp(Vec<Option<DateTime<Utc>>>),
    Date(Vec<Option<NaiveDate>>),
    Int64(Vec<Option<i64>>),
    Utf8(Vec<Option<String>>),
}

impl ColumnData {
    pub fn len(&self) -> usize {
        match self {
            ColumnData::Raw(v) => v.len(),
            ColumnData::Timestamp(v) => v.len(),
            ColumnData::Date(v) => v.len(),
            ColumnData::Int64(v) => v.len(),
            ColumnData::Utf8(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn null_count(&self) -> usize {
        match self {
            ColumnData::Raw(v) => v.iter().filter(|c| c.is_null()).count(),
            ColumnData::Timestamp(v) => v.iter().filter(|c| c.is_none()).count(),
            ColumnData::Date(v) => v.iter().filter(|c| c.is_none()).count(),
            ColumnData::Int64(v) => v.iter().filter(|c| c.is_none()).count(),
            ColumnData::Utf8(v) => v.iter().filter(|c| c.is_none()).count(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub data: ColumnData,
}

/// Row-aligned columns. Every column always holds exactly `num_rows` cells.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    columns: Vec<Column>,
    num_rows: usize,
}

impl Table {
    pub fn new(num_rows: usize) -> Self {
        Self {
            columns: Vec::new(),
            num_rows,
        }
    }

    /// Append a column. Panics if its length breaks the row-count invariant;
    /// every caller builds columns from the same row set.
    pub fn push_column(&mut self, name: impl Into<String>, data: ColumnData) {
        assert_eq!(data.len(), self.num_rows, "column length must match table");
        self.columns.push(Column {
            name: name.into(),
            data,
        });
    }

    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Relabel column `idx`. Values are left alone.
    pub(crate) fn rename(&mut self, idx: usize, name: String) {
        self.columns[idx].name = name;
    }

    /// Swap the cells of column `idx` for a same-length replacement.
    pub(crate) fn replace_data(&mut self, idx: usize, data: ColumnData) {
        assert_eq!(data.len(), self.num_rows, "coercion must not change row count");
        self.columns[idx].data = data;
    }
}
