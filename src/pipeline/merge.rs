// Left-outer join chain over record tables. All rows of the accumulating
// base survive every join; unmatched right-hand columns are null-filled.
// A right-hand key matching multiple rows is a data-quality issue: the
// first match wins and the duplication is surfaced as a warning, so the
// merge never multiplies the base row count.

use crate::constants::MAX_WARNING_EXAMPLES;
use crate::error::Result;
use crate::pipeline::quality::{QualityWarning, WarningKind};
use crate::table::{Table, Value};
use std::collections::HashMap;
use tracing::debug;

/// Declared key relationship for one join. The left and right key columns
/// may be named differently; `suffix` tags incoming columns whose names
/// collide with the accumulated table.
#[derive(Debug, Clone)]
pub struct JoinSpec {
    pub left_key: String,
    pub right_key: String,
    pub suffix: String,
}

impl JoinSpec {
    pub fn new(left_key: &str, right_key: &str, suffix: &str) -> Self {
        Self {
            left_key: left_key.to_string(),
            right_key: right_key.to_string(),
            suffix: suffix.to_string(),
        }
    }
}

/// Join `right` onto `base` left-outer. Key columns are first coerced to a
/// shared comparable representation: numeric when both sides coerce fully,
/// otherwise the string fallback.
pub fn left_join(
    base: &Table,
    right: &Table,
    spec: &JoinSpec,
    base_name: &str,
    right_name: &str,
) -> Result<(Table, Vec<QualityWarning>)> {
    let left_col = base.require_column(&spec.left_key, base_name)?;
    let right_col = right.require_column(&spec.right_key, right_name)?;

    let numeric = column_is_numeric_coercible(base, left_col)
        && column_is_numeric_coercible(right, right_col);
    debug!(
        "Joining {} onto {} via {}<->{} ({} keys)",
        right_name,
        base_name,
        spec.left_key,
        spec.right_key,
        if numeric { "numeric" } else { "string" }
    );

    // Index the right side; remember every key that matches multiple rows.
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut duplicates: HashMap<String, usize> = HashMap::new();
    for (i, row) in right.rows().iter().enumerate() {
        let Some(key) = key_repr(&row[right_col], numeric) else {
            continue;
        };
        match index.entry(key.clone()) {
            std::collections::hash_map::Entry::Vacant(e) => {
                e.insert(i);
            }
            std::collections::hash_map::Entry::Occupied(_) => {
                *duplicates.entry(key).or_insert(1) += 1;
            }
        }
    }

    let mut warnings = Vec::new();
    if !duplicates.is_empty() {
        let mut examples: Vec<String> = duplicates.keys().cloned().collect();
        examples.sort();
        examples.truncate(MAX_WARNING_EXAMPLES);
        warnings.push(QualityWarning::new(
            WarningKind::DuplicateJoinKey,
            Some(&spec.right_key),
            duplicates.len(),
            examples,
            format!(
                "{} join keys in {} matched multiple rows; kept first match",
                duplicates.len(),
                right_name
            ),
        ));
    }

    // Column set: base columns untouched, right columns suffixed on
    // collision. When both sides join on the same column name the right
    // key is redundant and collapses into the base key.
    let same_key_name = spec.left_key == spec.right_key;
    let carried: Vec<usize> = (0..right.n_cols())
        .filter(|&i| !(same_key_name && i == right_col))
        .collect();
    let mut columns: Vec<String> = base.columns().to_vec();
    for &i in &carried {
        let name = &right.columns()[i];
        if base.has_column(name) {
            columns.push(format!("{}{}", name, spec.suffix));
        } else {
            columns.push(name.clone());
        }
    }

    let mut joined = Table::new(columns);
    for row in base.rows() {
        let mut out = row.clone();
        let matched = key_repr(&row[left_col], numeric).and_then(|k| index.get(&k).copied());
        match matched {
            Some(r) => out.extend(carried.iter().map(|&i| right.rows()[r][i].clone())),
            None => out.extend(std::iter::repeat(Value::Null).take(carried.len())),
        }
        joined.push_row(out)?;
    }

    Ok((joined, warnings))
}

/// True when every non-null cell of the column has a numeric reading.
fn column_is_numeric_coercible(table: &Table, col: usize) -> bool {
    table.column_values(col).all(|v| match v {
        Value::Null => true,
        Value::Int(_) | Value::Float(_) => true,
        Value::Str(s) => s.trim().parse::<f64>().map(|f| f.is_finite()).unwrap_or(false),
        _ => false,
    })
}

/// Comparable key encoding. Null keys never match anything. Numeric keys
/// are normalized so `100`, `100.0` and `"100"` align.
fn key_repr(value: &Value, numeric: bool) -> Option<String> {
    if value.is_null() {
        return None;
    }
    if numeric {
        let f = match value {
            Value::Int(i) => *i as f64,
            Value::Float(f) => *f,
            Value::Str(s) => s.trim().parse::<f64>().ok()?,
            _ => return None,
        };
        if f.fract() == 0.0 && f.abs() < 9e15 {
            Some(format!("{}", f as i64))
        } else {
            Some(format!("{}", f))
        }
    } else {
        Some(value.to_field().trim().to_string())
    }
}
