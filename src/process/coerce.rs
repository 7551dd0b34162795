// src/process/coerce.rs

//! Column-specific type coercion.
//!
//! A [`ColumnTypeSpec`] maps canonical column names to a [`CoercionRule`].
//! Columns without a rule are left exactly as the loader produced them.
//! Every rule is total: a cell that cannot be converted becomes null and is
//! counted in the [`CoercionSummary`], it never fails the column or the row.

use chrono::{NaiveDate, SecondsFormat};
use std::collections::BTreeMap;
use tracing::{debug, info};

use crate::error::{ConvertError, Result};
use crate::process::date_parser::parse_strict_date;
use crate::process::table::{ColumnData, Table, Value};

pub const DEFAULT_DATE_COLUMNS: &[&str] = &["order_date", "ship_date"];
pub const DEFAULT_TEXT_COLUMNS: &[&str] = &["returns"];
pub const DEFAULT_NULLABLE_INT_COLUMNS: &[&str] = &["ind1", "ind2"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CoercionRule {
    /// Strict `YYYY-MM-DD` into a day-precision date.
    Date,
    /// Textual representation of every non-null cell.
    Text,
    /// Numeric parse into a nullable 64-bit integer.
    NullableInt,
}

/// Static column name → rule table. A name maps to exactly one rule; this is
/// checked when the table is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnTypeSpec {
    rules: BTreeMap<String, CoercionRule>,
}

impl Default for ColumnTypeSpec {
    fn default() -> Self {
        let mut rules = BTreeMap::new();
        let sets = [
            (DEFAULT_DATE_COLUMNS, CoercionRule::Date),
            (DEFAULT_TEXT_COLUMNS, CoercionRule::Text),
            (DEFAULT_NULLABLE_INT_COLUMNS, CoercionRule::NullableInt),
        ];
        for (names, rule) in sets {
            for name in names {
                rules.insert(name.to_string(), rule);
            }
        }
        Self { rules }
    }
}

impl ColumnTypeSpec {
    /// Build from the three column sets, failing with
    /// [`ConvertError::ConflictingRule`] if a name appears under two rules.
    pub fn from_sets<S: AsRef<str>>(date: &[S], text: &[S], nullable_int: &[S]) -> Result<Self> {
        let mut rules = BTreeMap::new();
        let sets = [
            (date, CoercionRule::Date),
            (text, CoercionRule::Text),
            (nullable_int, CoercionRule::NullableInt),
        ];
        for (names, rule) in sets {
            for name in names {
                let name = name.as_ref();
                match rules.insert(name.to_string(), rule) {
                    Some(prev) if prev != rule => {
                        return Err(ConvertError::ConflictingRule {
                            column: name.to_string(),
                        })
                    }
                    _ => {}
                }
            }
        }
        Ok(Self { rules })
    }

    pub fn rule_for(&self, column: &str) -> Option<CoercionRule> {
        self.rules.get(column).copied()
    }

    pub fn rules(&self) -> impl Iterator<Item = (&str, CoercionRule)> {
        self.rules.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Convert every column of `table` that has a rule. Row count is
    /// unchanged whatever happens to individual cells.
    pub fn apply(&self, table: &mut Table) -> CoercionSummary {
        let mut summary = CoercionSummary::default();
        for idx in 0..table.num_columns() {
            let column = &table.columns()[idx];
            let Some(rule) = self.rule_for(&column.name) else {
                continue;
            };
            let name = column.name.clone();
            let (data, degraded) = coerce_column(rule, &column.data);
            table.replace_data(idx, data);

            if degraded > 0 {
                info!(column = %name, ?rule, degraded, "cells set to null");
            } else {
                debug!(column = %name, ?rule, "column coerced");
            }
            summary.converted.push((name.clone(), rule));
            summary.degraded.insert(name, degraded);
        }
        summary
    }
}

/// What [`ColumnTypeSpec::apply`] did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CoercionSummary {
    /// Columns converted, in table order.
    pub converted: Vec<(String, CoercionRule)>,
    /// Non-null cells per converted column that ended up null.
    pub degraded: BTreeMap<String, usize>,
}

impl CoercionSummary {
    pub fn degraded(&self, column: &str) -> usize {
        self.degraded.get(column).copied().unwrap_or(0)
    }

    pub fn total_degraded(&self) -> usize {
        self.degraded.values().sum()
    }
}

/// Apply one rule to a whole column, returning the new cells and how many
/// non-null inputs were nulled.
pub fn coerce_column(rule: CoercionRule, data: &ColumnData) -> (ColumnData, usize) {
    let before = data.null_count();
    let out = match rule {
        CoercionRule::Date => ColumnData::Date(map_cells(data, date_cell)),
        CoercionRule::Text => ColumnData::Utf8(map_cells(data, text_cell)),
        CoercionRule::NullableInt => ColumnData::Int64(map_cells(data, int_cell)),
    };
    let degraded = out.null_count().saturating_sub(before);
    (out, degraded)
}

/// Feed each cell of any column variant through `f` as a [`Cell`].
fn map_cells<T>(data: &ColumnData, f: impl Fn(Cell<'_>) -> Option<T>) -> Vec<Option<T>> {
    match data {
        ColumnData::Raw(v) => v.iter().map(|c| f(Cell::Raw(c))).collect(),
        ColumnData::Timestamp(v) => v
            .iter()
            .map(|c| c.as_ref().and_then(|ts| f(Cell::Timestamp(ts))))
            .collect(),
        ColumnData::Date(v) => v.iter().map(|c| c.and_then(|d| f(Cell::Date(d)))).collect(),
        ColumnData::Int64(v) => v
            .iter()
            .map(|c| c.and_then(|i| f(Cell::Raw(&Value::Int(i)))))
            .collect(),
        ColumnData::Utf8(v) => v
            .iter()
            .map(|c| c.as_deref().and_then(|s| f(Cell::Text(s))))
            .collect(),
    }
}

/// A borrowed cell of any column variant.
#[derive(Debug, Clone, Copy)]
pub enum Cell<'a> {
    Raw(&'a Value),
    Text(&'a str),
    Timestamp(&'a chrono::DateTime<chrono::Utc>),
    Date(NaiveDate),
}

pub fn date_cell(cell: Cell<'_>) -> Option<NaiveDate> {
    match cell {
        Cell::Raw(Value::Str(s)) => parse_strict_date(s),
        Cell::Text(s) => parse_strict_date(s),
        Cell::Date(d) => Some(d),
        Cell::Timestamp(ts) => Some(ts.date_naive()),
        Cell::Raw(
            Value::Null | Value::Bool(_) | Value::Int(_) | Value::Float(_) | Value::Nested(_),
        ) => None,
    }
}

pub fn text_cell(cell: Cell<'_>) -> Option<String> {
    match cell {
        Cell::Raw(Value::Null) => None,
        Cell::Raw(Value::Str(s)) => Some(s.clone()),
        Cell::Text(s) => Some(s.to_string()),
        Cell::Raw(Value::Bool(true)) => Some("True".to_string()),
        Cell::Raw(Value::Bool(false)) => Some("False".to_string()),
        Cell::Raw(Value::Int(i)) => Some(i.to_string()),
        // serde_json keeps the trailing `.0` that f64 Display drops
        Cell::Raw(Value::Float(f)) => {
            Some(serde_json::Number::from_f64(*f).map_or_else(|| f.to_string(), |n| n.to_string()))
        }
        Cell::Raw(Value::Nested(v)) => Some(v.to_string()),
        Cell::Timestamp(ts) => Some(ts.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
        Cell::Date(d) => Some(d.format("%Y-%m-%d").to_string()),
    }
}

pub fn int_cell(cell: Cell<'_>) -> Option<i64> {
    match cell {
        Cell::Raw(Value::Int(i)) => Some(*i),
        Cell::Raw(Value::Float(f)) => integral(*f),
        Cell::Raw(Value::Str(s)) => parse_int_text(s),
        Cell::Text(s) => parse_int_text(s),
        Cell::Raw(Value::Null | Value::Bool(_) | Value::Nested(_))
        | Cell::Timestamp(_)
        | Cell::Date(_) => None,
    }
}

/// Decimal or float text with an integral value, e.g. `"42"`, `" 7 "`, `"4.0"`,
/// `"1e3"`.
fn parse_int_text(s: &str) -> Option<i64> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    s.parse::<i64>()
        .ok()
        .or_else(|| s.parse::<f64>().ok().and_then(integral))
}

/// `f` as i64 when it is finite, whole, and in range.
fn integral(f: f64) -> Option<i64> {
    const LIMIT: f64 = 9_223_372_036_854_775_808.0; // 2^63
    (f.is_finite() && f.fract() == 0.0 && (-LIMIT..LIMIT).contains(&f)).then(|| f as i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    fn raw(values: Vec<Value>) -> ColumnData {
        ColumnData::Raw(values)
    }

    fn s(v: &str) -> Value {
        Value::Str(v.to_string())
    }

    #[test]
    fn test_default_spec_has_fixed_sets() {
        let spec = ColumnTypeSpec::default();
        assert_eq!(spec.rule_for("order_date"), Some(CoercionRule::Date));
        assert_eq!(spec.rule_for("ship_date"), Some(CoercionRule::Date));
        assert_eq!(spec.rule_for("returns"), Some(CoercionRule::Text));
        assert_eq!(spec.rule_for("ind1"), Some(CoercionRule::NullableInt));
        assert_eq!(spec.rule_for("ind2"), Some(CoercionRule::NullableInt));
        assert_eq!(spec.rule_for("sales"), None);
        assert_eq!(spec.rules().count(), 5);
        assert_eq!(
            spec,
            ColumnTypeSpec::from_sets(
                DEFAULT_DATE_COLUMNS,
                DEFAULT_TEXT_COLUMNS,
                DEFAULT_NULLABLE_INT_COLUMNS
            )
            .unwrap()
        );
    }

    #[test]
    fn test_overlapping_sets_are_rejected() {
        let err = ColumnTypeSpec::from_sets(&["a", "b"], &["c"], &["b"]).unwrap_err();
        assert!(matches!(err, ConvertError::ConflictingRule { column } if column == "b"));
        // listing a name twice under the same rule is harmless
        assert!(ColumnTypeSpec::from_sets(&["a", "a"], &[], &[]).is_ok());
    }

    #[test]
    fn test_date_cells() {
        let d = |v| date_cell(Cell::Raw(&v));
        assert_eq!(d(s("2023-01-15")), NaiveDate::from_ymd_opt(2023, 1, 15));
        assert_eq!(d(s("01/15/2023")), None);
        assert_eq!(d(s("not-a-date")), None);
        assert_eq!(d(s("2023-02-30")), None);
        assert_eq!(d(Value::Int(20230115)), None);
        assert_eq!(d(Value::Null), None);
        let ts = Utc.with_ymd_and_hms(2024, 3, 1, 23, 59, 0).unwrap();
        assert_eq!(
            date_cell(Cell::Timestamp(&ts)),
            NaiveDate::from_ymd_opt(2024, 3, 1)
        );
    }

    #[test]
    fn test_int_cells() {
        let i = |v| int_cell(Cell::Raw(&v));
        assert_eq!(i(s("42")), Some(42));
        assert_eq!(i(s("abc")), None);
        assert_eq!(i(s("")), None);
        assert_eq!(i(Value::Int(7)), Some(7));
        assert_eq!(i(s(" -3 ")), Some(-3));
        assert_eq!(i(s("4.0")), Some(4));
        assert_eq!(i(s("1e3")), Some(1000));
        assert_eq!(i(Value::Float(2.0)), Some(2));
        assert_eq!(i(Value::Float(2.5)), None);
        assert_eq!(i(s("NaN")), None);
        assert_eq!(i(s("inf")), None);
        assert_eq!(i(Value::Float(1e19)), None);
        assert_eq!(i(Value::Bool(true)), None);
        assert_eq!(i(Value::Nested(json!([1]))), None);
    }

    #[test]
    fn test_text_cells() {
        let t = |v| text_cell(Cell::Raw(&v));
        assert_eq!(t(Value::Int(5)), Some("5".to_string()));
        assert_eq!(t(Value::Null), None);
        assert_eq!(t(Value::Float(5.0)), Some("5.0".to_string()));
        assert_eq!(t(Value::Float(0.25)), Some("0.25".to_string()));
        assert_eq!(t(Value::Bool(true)), Some("True".to_string()));
        assert_eq!(t(Value::Bool(false)), Some("False".to_string()));
        assert_eq!(t(s("Yes")), Some("Yes".to_string()));
        assert_eq!(
            t(Value::Nested(json!({"k": [1, 2]}))),
            Some(r#"{"k":[1,2]}"#.to_string())
        );
    }

    #[test]
    fn test_coerce_column_counts_degraded_cells() {
        let (data, degraded) = coerce_column(
            CoercionRule::NullableInt,
            &raw(vec![s("1"), Value::Null, s("x"), Value::Int(3), s("")]),
        );
        assert_eq!(
            data,
            ColumnData::Int64(vec![Some(1), None, None, Some(3), None])
        );
        assert_eq!(degraded, 2);
    }

    #[test]
    fn test_apply_touches_only_ruled_columns() {
        let mut table = Table::new(3);
        table.push_column(
            "order_date",
            raw(vec![s("2023-01-15"), s("2023-02-30"), Value::Null]),
        );
        table.push_column("returns", raw(vec![Value::Int(5), Value::Null, s("No")]));
        table.push_column("ind1", raw(vec![s("42"), s("x"), Value::Int(7)]));
        table.push_column("sales", raw(vec![Value::Float(1.5), s("n/a"), Value::Null]));

        let summary = ColumnTypeSpec::default().apply(&mut table);

        assert_eq!(table.num_rows(), 3);
        assert_eq!(
            table.column("order_date").unwrap().data,
            ColumnData::Date(vec![NaiveDate::from_ymd_opt(2023, 1, 15), None, None])
        );
        assert_eq!(
            table.column("returns").unwrap().data,
            ColumnData::Utf8(vec![Some("5".into()), None, Some("No".into())])
        );
        assert_eq!(
            table.column("ind1").unwrap().data,
            ColumnData::Int64(vec![Some(42), None, Some(7)])
        );
        assert_eq!(
            table.column("sales").unwrap().data,
            raw(vec![Value::Float(1.5), s("n/a"), Value::Null])
        );

        assert_eq!(summary.degraded("order_date"), 1);
        assert_eq!(summary.degraded("returns"), 0);
        assert_eq!(summary.degraded("ind1"), 1);
        assert_eq!(summary.degraded("sales"), 0);
        assert_eq!(summary.total_degraded(), 2);
        assert_eq!(summary.converted.len(), 3);
    }

    #[test]
    fn test_apply_is_noop_without_matching_columns() {
        let mut table = Table::new(1);
        table.push_column("city", raw(vec![s("Paris")]));
        let before = table.clone();
        let summary = ColumnTypeSpec::default().apply(&mut table);
        assert_eq!(table, before);
        assert!(summary.converted.is_empty());
    }

    #[test]
    fn test_recoercing_typed_columns() {
        let (dates, _) = coerce_column(
            CoercionRule::Date,
            &ColumnData::Utf8(vec![Some("2024-01-02".into()), None]),
        );
        assert_eq!(
            dates,
            ColumnData::Date(vec![NaiveDate::from_ymd_opt(2024, 1, 2), None])
        );
        let (text, _) = coerce_column(CoercionRule::Text, &dates);
        assert_eq!(text, ColumnData::Utf8(vec![Some("2024-01-02".into()), None]));
        let (ints, degraded) =
            coerce_column(CoercionRule::NullableInt, &ColumnData::Int64(vec![Some(9)]));
        assert_eq!(ints, ColumnData::Int64(vec![Some(9)]));
        assert_eq!(degraded, 0);
    }
}
