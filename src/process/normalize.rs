use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use tracing::debug;

use crate::error::{ConvertError, Result};
use crate::process::table::Table;

static SEPARATOR_RUN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\s\-]+").expect("separator regex is valid"));

/// Canonical column name: trimmed, lowercased, and with every run of
/// whitespace or hyphens collapsed to a single `_`.
///
/// ```
/// use parquetize::process::normalize::normalize_name;
/// assert_eq!(normalize_name(" Order-Date "), "order_date");
/// ```
pub fn normalize_name(raw: &str) -> String {
    let lowered = raw.trim().to_lowercase();
    SEPARATOR_RUN.replace_all(&lowered, "_").into_owned()
}

/// Relabel every column of `table` with its canonical name.
///
/// Two source columns that land on the same canonical name fail with
/// [`ConvertError::SchemaConflict`]; no column is renamed in that case.
pub fn normalize_columns(table: &mut Table) -> Result<()> {
    let renamed: Vec<String> = table
        .columns()
        .iter()
        .map(|c| normalize_name(&c.name))
        .collect();

    let mut seen: HashMap<&str, usize> = HashMap::with_capacity(renamed.len());
    for (idx, name) in renamed.iter().enumerate() {
        if let Some(&first) = seen.get(name.as_str()) {
            return Err(ConvertError::SchemaConflict {
                name: name.clone(),
                first: table.columns()[first].name.clone(),
                second: table.columns()[idx].name.clone(),
            });
        }
        seen.insert(name, idx);
    }

    for (idx, name) in renamed.into_iter().enumerate() {
        if table.columns()[idx].name != name {
            debug!(from = %table.columns()[idx].name, to = %name, "renamed column");
        }
        table.rename(idx, name);
    }
    Ok(())
}
