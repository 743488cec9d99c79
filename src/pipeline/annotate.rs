// Anomaly and fraud annotation over the cleaned table: a pure statistical
// IQR rule for amount outliers, fraud-flag normalization, and grouped
// aggregate views.

use crate::config::PipelineConfig;
use crate::constants::{AMOUNT_COLUMN, DATE_COLUMN, FRAUD_COLUMN, MAX_WARNING_EXAMPLES};
use crate::error::Result;
use crate::pipeline::quality::{QualityWarning, WarningKind};
use crate::table::{Table, Value};
use std::collections::BTreeMap;
use tracing::info;

/// Name of the indicator column the annotator adds.
pub const ANOMALY_COLUMN: &str = "amount_anomaly";

/// Outcome report for one annotation pass.
#[derive(Debug, Default)]
pub struct AnnotateReport {
    pub anomaly_count: usize,
    pub warnings: Vec<QualityWarning>,
}

/// Flag amount outliers via Tukey fences and normalize the fraud flag.
/// The amount column is required; the fraud column is annotated only when
/// present.
pub fn annotate(mut table: Table, config: &PipelineConfig) -> Result<(Table, AnnotateReport)> {
    let mut report = AnnotateReport::default();

    let amount_col = table.require_column(AMOUNT_COLUMN, "cleaned dataset")?;

    // Timestamp cells come back as text after a CSV round trip
    if let Some(date_col) = table.column_index(DATE_COLUMN) {
        table.map_column(date_col, |v| match v {
            Value::Timestamp(ts) => Value::Timestamp(*ts),
            Value::Str(s) => Value::parse_timestamp(s)
                .map(Value::Timestamp)
                .unwrap_or(Value::Null),
            _ => Value::Null,
        });
    }

    let mut amounts: Vec<f64> = table
        .column_values(amount_col)
        .filter_map(|v| v.as_f64())
        .collect();
    amounts.sort_by(f64::total_cmp);

    let flags: Vec<Value> = if amounts.is_empty() {
        vec![Value::Int(0); table.n_rows()]
    } else {
        let q1 = quantile(&amounts, 0.25);
        let q3 = quantile(&amounts, 0.75);
        let iqr = q3 - q1;
        let lo = q1 - config.iqr_multiplier * iqr;
        let hi = q3 + config.iqr_multiplier * iqr;
        info!("Amount anomaly bounds: [{:.4}, {:.4}]", lo, hi);
        table
            .column_values(amount_col)
            .map(|v| match v.as_f64() {
                Some(f) if f < lo || f > hi => Value::Int(1),
                _ => Value::Int(0),
            })
            .collect()
    };
    report.anomaly_count = flags.iter().filter(|v| **v == Value::Int(1)).count();
    table.set_column(ANOMALY_COLUMN, flags)?;

    normalize_fraud_flags(&mut table, &mut report)?;

    for warning in &report.warnings {
        warning.log();
    }
    Ok((table, report))
}

/// Quantile by linear interpolation between closest ranks. `sorted` must be
/// non-empty and ascending.
pub fn quantile(sorted: &[f64], q: f64) -> f64 {
    let n = sorted.len();
    if n == 1 {
        return sorted[0];
    }
    let pos = q * (n - 1) as f64;
    let lower = pos.floor() as usize;
    let upper = pos.ceil() as usize;
    if lower == upper {
        sorted[lower]
    } else {
        sorted[lower] + (pos - lower as f64) * (sorted[upper] - sorted[lower])
    }
}

/// Normalize the fraud indicator to 0/1, accepting Yes/No/Y/N/1/0 in any
/// case. Values outside the set are left untouched and reported; the
/// caller decides whether that is an error.
fn normalize_fraud_flags(table: &mut Table, report: &mut AnnotateReport) -> Result<()> {
    let Some(col) = table.column_index(FRAUD_COLUMN) else {
        return Ok(());
    };
    let mut unrecognized: Vec<String> = Vec::new();
    let mut count = 0usize;
    let normalized: Vec<Value> = table
        .column_values(col)
        .map(|v| match v {
            Value::Str(s) => match s.trim().to_ascii_lowercase().as_str() {
                "yes" | "y" | "1" => Value::Int(1),
                "no" | "n" | "0" => Value::Int(0),
                _ => {
                    count += 1;
                    if unrecognized.len() < MAX_WARNING_EXAMPLES
                        && !unrecognized.contains(s)
                    {
                        unrecognized.push(s.clone());
                    }
                    v.clone()
                }
            },
            Value::Int(0) | Value::Int(1) => v.clone(),
            Value::Bool(b) => Value::Int(*b as i64),
            Value::Float(f) if *f == 0.0 || *f == 1.0 => Value::Int(*f as i64),
            Value::Null => Value::Null,
            other => {
                count += 1;
                if unrecognized.len() < MAX_WARNING_EXAMPLES {
                    unrecognized.push(other.to_field());
                }
                other.clone()
            }
        })
        .collect();
    table.set_column(FRAUD_COLUMN, normalized)?;

    if count > 0 {
        report.warnings.push(QualityWarning::new(
            WarningKind::UnrecognizedFlagValue,
            Some(FRAUD_COLUMN),
            count,
            unrecognized,
            format!("{} fraud-flag values outside the recognized set were left as-is", count),
        ));
    }
    Ok(())
}

/// Fraud rate and anomaly count per calendar day of the timestamp column.
pub fn aggregate_by_day(table: &Table) -> Result<Table> {
    grouped_aggregates(table, DATE_COLUMN, "day", |v| match v {
        Value::Timestamp(ts) => Some(ts.format("%Y-%m-%d").to_string()),
        _ => None,
    })
}

/// Fraud rate and anomaly count per category of a designated dimension.
pub fn aggregate_by_dimension(table: &Table, dimension: &str) -> Result<Table> {
    grouped_aggregates(table, dimension, dimension, |v| {
        let label = v.to_field();
        let trimmed = label.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

/// Shared grouping core. Rows whose key is null or empty land in a single
/// "unknown" bucket rather than being dropped.
fn grouped_aggregates<F>(
    table: &Table,
    key_column: &str,
    out_key_name: &str,
    key_of: F,
) -> Result<Table>
where
    F: Fn(&Value) -> Option<String>,
{
    let key_col = table.require_column(key_column, "annotated dataset")?;
    let fraud_col = table.column_index(FRAUD_COLUMN);
    let anomaly_col = table.column_index(ANOMALY_COLUMN);

    #[derive(Default)]
    struct Bucket {
        rows: usize,
        fraud_values: usize,
        fraud_sum: f64,
        anomalies: i64,
    }

    let mut buckets: BTreeMap<String, Bucket> = BTreeMap::new();
    for row in table.rows() {
        let key = key_of(&row[key_col]).unwrap_or_else(|| "unknown".to_string());
        let bucket = buckets.entry(key).or_default();
        bucket.rows += 1;
        if let Some(c) = fraud_col {
            if let Some(f) = row[c].as_f64() {
                bucket.fraud_values += 1;
                bucket.fraud_sum += f;
            }
        }
        if let Some(c) = anomaly_col {
            if let Some(f) = row[c].as_f64() {
                bucket.anomalies += f as i64;
            }
        }
    }

    let mut out = Table::new(vec![
        out_key_name.to_string(),
        "tx_count".to_string(),
        "fraud_rate".to_string(),
        "anomaly_count".to_string(),
    ]);
    for (key, bucket) in buckets {
        let fraud_rate = if bucket.fraud_values > 0 {
            Value::Float(bucket.fraud_sum / bucket.fraud_values as f64)
        } else {
            Value::Null
        };
        out.push_row(vec![
            Value::Str(key),
            Value::Int(bucket.rows as i64),
            fraud_rate,
            Value::Int(bucket.anomalies),
        ])?;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> PipelineConfig {
        PipelineConfig::default()
    }

    fn s(v: &str) -> Value {
        Value::Str(v.to_string())
    }

    fn amount_table(values: &[f64]) -> Table {
        let mut table = Table::new(vec!["amount".to_string()]);
        for v in values {
            table.push_row(vec![Value::Float(*v)]).unwrap();
        }
        table
    }

    #[test]
    fn test_iqr_worked_example() {
        // [1,2,3,4,5,100]: Q1=2.25, Q3=4.75, IQR=2.5, bounds [-1.5, 8.5]
        let sorted = [1.0, 2.0, 3.0, 4.0, 5.0, 100.0];
        assert!((quantile(&sorted, 0.25) - 2.25).abs() < 1e-9);
        assert!((quantile(&sorted, 0.75) - 4.75).abs() < 1e-9);

        let table = amount_table(&sorted);
        let (annotated, report) = annotate(table, &config()).unwrap();
        let flag_col = annotated.column_index(ANOMALY_COLUMN).unwrap();
        let flags: Vec<&Value> = annotated.column_values(flag_col).collect();
        assert_eq!(
            flags,
            vec![
                &Value::Int(0),
                &Value::Int(0),
                &Value::Int(0),
                &Value::Int(0),
                &Value::Int(0),
                &Value::Int(1)
            ]
        );
        assert_eq!(report.anomaly_count, 1);
    }

    #[test]
    fn test_null_amounts_never_flagged() {
        let mut table = Table::new(vec!["amount".to_string()]);
        table.push_row(vec![Value::Null]).unwrap();
        table.push_row(vec![Value::Float(3.0)]).unwrap();
        let (annotated, report) = annotate(table, &config()).unwrap();
        let flag_col = annotated.column_index(ANOMALY_COLUMN).unwrap();
        assert_eq!(annotated.cell(0, flag_col), &Value::Int(0));
        assert_eq!(report.anomaly_count, 0);
    }

    #[test]
    fn test_missing_amount_column_is_fatal() {
        let table = Table::new(vec!["other".to_string()]);
        assert!(annotate(table, &config()).is_err());
    }

    #[test]
    fn test_fraud_flag_normalization() {
        let mut table = Table::new(vec!["amount".to_string(), "is_fraud".to_string()]);
        for (a, f) in [
            (1.0, s("Yes")),
            (2.0, s("N")),
            (3.0, s("fraudulent")),
            (4.0, Value::Int(1)),
        ] {
            table.push_row(vec![Value::Float(a), f]).unwrap();
        }
        let (annotated, report) = annotate(table, &config()).unwrap();
        let col = annotated.column_index(FRAUD_COLUMN).unwrap();
        assert_eq!(annotated.cell(0, col), &Value::Int(1));
        assert_eq!(annotated.cell(1, col), &Value::Int(0));
        // Out-of-set value left as-is and reported
        assert_eq!(annotated.cell(2, col), &s("fraudulent"));
        assert_eq!(annotated.cell(3, col), &Value::Int(1));
        assert_eq!(report.warnings.len(), 1);
        assert_eq!(report.warnings[0].kind, WarningKind::UnrecognizedFlagValue);
        assert_eq!(report.warnings[0].count, 1);
        assert_eq!(report.warnings[0].examples, vec!["fraudulent".to_string()]);
    }

    #[test]
    fn test_aggregate_by_day() {
        let mut table = Table::new(vec![
            "date".to_string(),
            "amount".to_string(),
            "is_fraud".to_string(),
        ]);
        let rows = vec![
            vec![s("2019-10-07 08:00:00"), Value::Float(10.0), s("Yes")],
            vec![s("2019-10-07 09:00:00"), Value::Float(20.0), s("No")],
            vec![s("2019-10-08 10:00:00"), Value::Float(30.0), s("No")],
        ];
        for row in rows {
            table.push_row(row).unwrap();
        }
        let (annotated, _) = annotate(table, &config()).unwrap();
        let by_day = aggregate_by_day(&annotated).unwrap();
        assert_eq!(by_day.columns(), &["day", "tx_count", "fraud_rate", "anomaly_count"]);
        assert_eq!(by_day.n_rows(), 2);
        assert_eq!(by_day.cell(0, 0), &s("2019-10-07"));
        assert_eq!(by_day.cell(0, 1), &Value::Int(2));
        assert_eq!(by_day.cell(0, 2), &Value::Float(0.5));
        assert_eq!(by_day.cell(1, 2), &Value::Float(0.0));
    }

    #[test]
    fn test_fully_null_key_yields_unknown_bucket() {
        let mut table = Table::new(vec!["amount".to_string(), "merchant_state".to_string()]);
        table.push_row(vec![Value::Float(1.0), Value::Null]).unwrap();
        table.push_row(vec![Value::Float(2.0), Value::Null]).unwrap();
        let (annotated, _) = annotate(table, &config()).unwrap();
        let by_state = aggregate_by_dimension(&annotated, "merchant_state").unwrap();
        assert_eq!(by_state.n_rows(), 1);
        assert_eq!(by_state.cell(0, 0), &s("unknown"));
        assert_eq!(by_state.cell(0, 1), &Value::Int(2));
    }
}
