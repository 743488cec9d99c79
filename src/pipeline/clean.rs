// Cleaning stage: duplicate removal, type coercion, categorical
// standardization, two-phase missing-value handling, drop-first one-hot
// encoding, sensitive-column removal and derived temporal features. The
// step order is fixed; later steps depend on earlier normalization.

use crate::config::PipelineConfig;
use crate::constants::{
    AMOUNT_COLUMN, BOOLEAN_COLUMNS, DATE_COLUMN, MAX_WARNING_EXAMPLES, NUMERIC_COLUMNS,
    ONE_HOT_COLUMNS, SENSITIVE_COLUMNS,
};
use crate::error::{PipelineError, Result};
use crate::pipeline::quality::{QualityWarning, WarningKind};
use crate::table::{Table, Value};
use regex::Regex;
use std::collections::HashMap;
use tracing::info;

/// Outcome report for one cleaning pass.
#[derive(Debug, Default)]
pub struct CleanReport {
    pub duplicates_removed: usize,
    /// Columns dropped for exceeding the missing threshold, with their
    /// pre-imputation missing fraction.
    pub dropped_columns: Vec<(String, f64)>,
    pub sensitive_removed: Vec<String>,
    pub imputed_cells: usize,
    pub warnings: Vec<QualityWarning>,
}

pub fn clean(mut table: Table, config: &PipelineConfig) -> Result<(Table, CleanReport)> {
    let mut report = CleanReport::default();

    // 1. Exact duplicate rows
    report.duplicates_removed = table.dedup_rows();
    if report.duplicates_removed > 0 {
        info!("Removed {} duplicate rows", report.duplicates_removed);
    }

    // 2. Type coercion
    coerce_timestamp_column(&mut table, &mut report);
    coerce_amount_column(&mut table);
    coerce_numeric_columns(&mut table, &mut report);

    // 3. Boolean-like standardization
    standardize_boolean_columns(&mut table, &mut report);

    // 4. Missing values: drop heavy columns first, then impute the rest
    drop_high_missing_columns(&mut table, config.missing_threshold, &mut report);
    impute_missing(&mut table, &mut report)?;

    // 5. Drop-first one-hot encoding
    encode_categoricals(&mut table, &mut report)?;

    // 6. Sensitive identifier columns
    report.sensitive_removed = table.drop_columns(SENSITIVE_COLUMNS);

    // 7. Derived temporal features
    derive_temporal_features(&mut table)?;

    for warning in &report.warnings {
        warning.log();
    }
    Ok((table, report))
}

fn missing_column_warning(report: &mut CleanReport, step: &str, missing: Vec<String>) {
    if missing.is_empty() {
        return;
    }
    report.warnings.push(QualityWarning::new(
        WarningKind::MissingDeclaredColumn,
        None,
        missing.len(),
        missing.clone(),
        format!("{} skipped {} declared columns not present", step, missing.len()),
    ));
}

/// Parse the designated timestamp column from free-form text; unparseable
/// cells become null instead of failing the run.
fn coerce_timestamp_column(table: &mut Table, report: &mut CleanReport) {
    let Some(col) = table.column_index(DATE_COLUMN) else {
        missing_column_warning(report, "timestamp coercion", vec![DATE_COLUMN.to_string()]);
        return;
    };
    table.map_column(col, |v| match v {
        Value::Timestamp(ts) => Value::Timestamp(*ts),
        Value::Str(s) => Value::parse_timestamp(s)
            .map(Value::Timestamp)
            .unwrap_or(Value::Null),
        _ => Value::Null,
    });
}

/// Strip currency symbols and thousands separators, then parse as float.
fn coerce_amount_column(table: &mut Table) {
    let Some(col) = table.column_index(AMOUNT_COLUMN) else {
        return;
    };
    let currency = Regex::new(r"[$,]").unwrap();
    table.map_column(col, |v| match v {
        Value::Float(f) => Value::Float(*f),
        Value::Int(i) => Value::Float(*i as f64),
        Value::Str(s) => {
            let stripped = currency.replace_all(s.trim(), "");
            stripped
                .parse::<f64>()
                .ok()
                .filter(|f| f.is_finite())
                .map(Value::Float)
                .unwrap_or(Value::Null)
        }
        _ => Value::Null,
    });
}

fn coerce_numeric_columns(table: &mut Table, report: &mut CleanReport) {
    let mut missing = Vec::new();
    for name in NUMERIC_COLUMNS {
        let Some(col) = table.column_index(name) else {
            missing.push(name.to_string());
            continue;
        };
        table.map_column(col, |v| match v {
            Value::Int(i) => Value::Int(*i),
            Value::Float(f) => Value::Float(*f),
            Value::Str(s) => {
                let trimmed = s.trim();
                if let Ok(i) = trimmed.parse::<i64>() {
                    Value::Int(i)
                } else {
                    trimmed
                        .parse::<f64>()
                        .ok()
                        .filter(|f| f.is_finite())
                        .map(Value::Float)
                        .unwrap_or(Value::Null)
                }
            }
            _ => Value::Null,
        });
    }
    missing_column_warning(report, "numeric coercion", missing);
}

/// Map textual boolean variants to 1/0. Unrecognized values become null and
/// flow into imputation rather than a silent default.
fn standardize_boolean_columns(table: &mut Table, report: &mut CleanReport) {
    let mut missing = Vec::new();
    for name in BOOLEAN_COLUMNS {
        let Some(col) = table.column_index(name) else {
            missing.push(name.to_string());
            continue;
        };
        table.map_column(col, |v| match v {
            Value::Str(s) => match s.trim().to_ascii_lowercase().as_str() {
                "yes" => Value::Int(1),
                "no" => Value::Int(0),
                _ => Value::Null,
            },
            Value::Bool(b) => Value::Int(*b as i64),
            Value::Int(i) => Value::Int(*i),
            Value::Float(f) => Value::Float(*f),
            _ => Value::Null,
        });
    }
    missing_column_warning(report, "boolean standardization", missing);
}

/// Phase one of missing-value handling: compute missing fractions over the
/// full table and drop columns above the threshold before any imputation.
fn drop_high_missing_columns(table: &mut Table, threshold: f64, report: &mut CleanReport) {
    let mut to_drop: Vec<(String, f64)> = Vec::new();
    for (col, name) in table.columns().to_vec().iter().enumerate() {
        let fraction = table.missing_fraction(col);
        if fraction > threshold {
            to_drop.push((name.clone(), fraction));
        }
    }
    if to_drop.is_empty() {
        return;
    }
    let names: Vec<&str> = to_drop.iter().map(|(n, _)| n.as_str()).collect();
    table.drop_columns(&names);
    info!("Dropped columns over missing threshold: {:?}", names);
    report.warnings.push(QualityWarning::new(
        WarningKind::HighMissingColumn,
        None,
        to_drop.len(),
        names
            .iter()
            .take(MAX_WARNING_EXAMPLES)
            .map(|n| n.to_string())
            .collect(),
        format!("{} columns exceeded the missing-value threshold", to_drop.len()),
    ));
    report.dropped_columns = to_drop;
}

/// Phase two: median-impute numeric columns, mode-impute everything else.
/// A column with no non-null values has no mode; that is a hard error.
fn impute_missing(table: &mut Table, report: &mut CleanReport) -> Result<()> {
    for col in 0..table.n_cols() {
        let nulls = table.column_values(col).filter(|v| v.is_null()).count();
        if nulls == 0 {
            continue;
        }
        let name = table.columns()[col].clone();
        let fill = if column_is_numeric(table, col) {
            median_value(table, col)
        } else {
            mode_value(table, col).ok_or(PipelineError::EmptyColumnImputation {
                column: name.clone(),
            })?
        };
        table.map_column(col, |v| {
            if v.is_null() {
                fill.clone()
            } else {
                v.clone()
            }
        });
        report.imputed_cells += nulls;
    }
    Ok(())
}

/// A column is numeric when it has at least one non-null value and every
/// non-null value is an integer or float.
fn column_is_numeric(table: &Table, col: usize) -> bool {
    let mut any = false;
    for v in table.column_values(col) {
        match v {
            Value::Null => {}
            Value::Int(_) | Value::Float(_) => any = true,
            _ => return false,
        }
    }
    any
}

/// Median of the non-null values, averaging the two middles for even
/// counts. Integer columns with an integral median stay integer.
fn median_value(table: &Table, col: usize) -> Value {
    let mut values: Vec<f64> = table.column_values(col).filter_map(|v| v.as_f64()).collect();
    values.sort_by(f64::total_cmp);
    let n = values.len();
    let median = if n % 2 == 1 {
        values[n / 2]
    } else {
        (values[n / 2 - 1] + values[n / 2]) / 2.0
    };
    let all_int = table
        .column_values(col)
        .all(|v| matches!(v, Value::Int(_) | Value::Null));
    if all_int && median.fract() == 0.0 {
        Value::Int(median as i64)
    } else {
        Value::Float(median)
    }
}

/// Most frequent non-null value; ties break toward the smallest canonical
/// encoding so imputation stays deterministic. None when every value is null.
fn mode_value(table: &Table, col: usize) -> Option<Value> {
    let mut counts: HashMap<String, (usize, Value)> = HashMap::new();
    for v in table.column_values(col) {
        if v.is_null() {
            continue;
        }
        let entry = counts.entry(v.canonical()).or_insert((0, v.clone()));
        entry.0 += 1;
    }
    counts
        .into_iter()
        .max_by(|(ka, (ca, _)), (kb, (cb, _))| ca.cmp(cb).then(kb.cmp(ka)))
        .map(|(_, (_, v))| v)
}

/// Expand designated categorical columns into indicator columns, omitting
/// the lexicographically first category as the reference.
fn encode_categoricals(table: &mut Table, report: &mut CleanReport) -> Result<()> {
    let mut missing = Vec::new();
    for name in ONE_HOT_COLUMNS {
        let Some(col) = table.column_index(name) else {
            missing.push(name.to_string());
            continue;
        };
        let mut categories: Vec<String> = Vec::new();
        for v in table.column_values(col) {
            if v.is_null() {
                continue;
            }
            let label = v.to_field();
            if !categories.contains(&label) {
                categories.push(label);
            }
        }
        categories.sort();

        // Reference category is the first; its rows read 0 in every indicator.
        for category in categories.iter().skip(1) {
            let indicator: Vec<Value> = table
                .column_values(col)
                .map(|v| Value::Int((!v.is_null() && &v.to_field() == category) as i64))
                .collect();
            table.add_column(&format!("{}_{}", name, category), indicator)?;
        }
        table.drop_columns(&[*name]);
    }
    missing_column_warning(report, "one-hot encoding", missing);
    Ok(())
}

/// Hour-of-day and day-of-week (0 = Monday) from the structured timestamp.
fn derive_temporal_features(table: &mut Table) -> Result<()> {
    use chrono::{Datelike, Timelike};
    let Some(col) = table.column_index(DATE_COLUMN) else {
        return Ok(());
    };
    let hours: Vec<Value> = table
        .column_values(col)
        .map(|v| match v {
            Value::Timestamp(ts) => Value::Int(ts.hour() as i64),
            _ => Value::Null,
        })
        .collect();
    let days: Vec<Value> = table
        .column_values(col)
        .map(|v| match v {
            Value::Timestamp(ts) => Value::Int(ts.weekday().num_days_from_monday() as i64),
            _ => Value::Null,
        })
        .collect();
    table.set_column("hour", hours)?;
    table.set_column("day_of_week", days)?;
    Ok(())
}
