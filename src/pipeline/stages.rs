// Stage runners: one per sequential script of the pipeline, plus a full
// run. Every runner loads from the object store, transforms in memory and
// persists its artifact before returning a summary.

use crate::config::PipelineConfig;
use crate::constants::{REGION_COLUMN, RUNS_PREFIX};
use crate::error::{PipelineError, Result};
use crate::gateway::ObjectStore;
use crate::pipeline::annotate::{aggregate_by_day, aggregate_by_dimension, annotate};
use crate::pipeline::clean::clean;
use crate::pipeline::merge::{left_join, JoinSpec};
use crate::pipeline::sample::{sample_rows, truncate_label_map};
use crate::table::Table;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

/// Result of one pipeline stage.
#[derive(Debug, Clone, Serialize)]
pub struct StageSummary {
    pub stage: &'static str,
    pub rows_in: usize,
    pub rows_out: usize,
    pub outputs: Vec<String>,
    pub warning_count: usize,
}

/// Record of a full pipeline run.
#[derive(Debug, Serialize)]
pub struct PipelineRun {
    pub id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub stages: Vec<StageSummary>,
}

/// Sample the raw transactions table down to the configured size and
/// head-truncate the fraud-label map to match.
pub fn run_sample(store: &dyn ObjectStore, config: &PipelineConfig) -> Result<StageSummary> {
    let paths = &config.paths;

    let raw = store.get(&config.bucket, &paths.raw_transactions)?;
    let transactions = Table::from_csv(&raw)?;
    let sampled = sample_rows(&transactions, config.sample_size, config.sample_seed);
    store.put(&config.bucket, &paths.sampled_transactions, &sampled.to_csv()?)?;
    info!(
        "Sampled transactions: {} -> {} rows",
        transactions.n_rows(),
        sampled.n_rows()
    );

    let labels = store.get(&config.bucket, &paths.raw_fraud_labels)?;
    let truncated = truncate_label_map(&labels, config.sample_size, &paths.raw_fraud_labels)?;
    store.put(&config.bucket, &paths.sampled_fraud_labels, &truncated)?;

    Ok(StageSummary {
        stage: "sample",
        rows_in: transactions.n_rows(),
        rows_out: sampled.n_rows(),
        outputs: vec![
            paths.sampled_transactions.clone(),
            paths.sampled_fraud_labels.clone(),
        ],
        warning_count: 0,
    })
}

/// Join the sampled transactions against cards, users, the merchant-code
/// dictionary and the fraud labels, in that declared order.
pub fn run_merge(store: &dyn ObjectStore, config: &PipelineConfig) -> Result<StageSummary> {
    let paths = &config.paths;

    let transactions = Table::from_csv(&store.get(&config.bucket, &paths.sampled_transactions)?)?;
    let cards = Table::from_csv(&store.get(&config.bucket, &paths.raw_cards)?)?;
    let users = Table::from_csv(&store.get(&config.bucket, &paths.raw_users)?)?;
    let mcc_codes = Table::from_json_code_map(
        &store.get(&config.bucket, &paths.raw_mcc_codes)?,
        &paths.raw_mcc_codes,
        "mcc",
        "mcc_description",
    )?;
    let fraud_labels = Table::from_json_label_map(
        &store.get(&config.bucket, &paths.sampled_fraud_labels)?,
        &paths.sampled_fraud_labels,
        "transaction_id",
        "is_fraud",
    )?;

    let rows_in = transactions.n_rows();
    let mut warnings = Vec::new();

    let (merged, w) = left_join(
        &transactions,
        &cards,
        &JoinSpec::new("card_id", "id", "_card"),
        "transactions",
        "cards",
    )?;
    warnings.extend(w);
    let (merged, w) = left_join(
        &merged,
        &users,
        &JoinSpec::new("client_id", "id", "_user"),
        "merged",
        "users",
    )?;
    warnings.extend(w);
    let (merged, w) = left_join(
        &merged,
        &mcc_codes,
        &JoinSpec::new("mcc", "mcc", "_mcc"),
        "merged",
        "mcc_codes",
    )?;
    warnings.extend(w);
    let (merged, w) = left_join(
        &merged,
        &fraud_labels,
        &JoinSpec::new("id", "transaction_id", "_label"),
        "merged",
        "fraud_labels",
    )?;
    warnings.extend(w);

    for warning in &warnings {
        warning.log();
    }

    store.put(&config.bucket, &paths.merged, &merged.to_csv()?)?;
    info!(
        "Merged dataset: {} rows, {} columns",
        merged.n_rows(),
        merged.n_cols()
    );

    Ok(StageSummary {
        stage: "merge",
        rows_in,
        rows_out: merged.n_rows(),
        outputs: vec![paths.merged.clone()],
        warning_count: warnings.len(),
    })
}

/// Clean the merged dataset and persist the result.
pub fn run_clean(store: &dyn ObjectStore, config: &PipelineConfig) -> Result<StageSummary> {
    let paths = &config.paths;

    let merged = Table::from_csv(&store.get(&config.bucket, &paths.merged)?)?;
    let rows_in = merged.n_rows();
    let (cleaned, report) = clean(merged, config)?;
    store.put(&config.bucket, &paths.cleaned, &cleaned.to_csv()?)?;
    info!(
        "Cleaned dataset: {} rows, {} duplicates removed, {} cells imputed, {} columns dropped",
        cleaned.n_rows(),
        report.duplicates_removed,
        report.imputed_cells,
        report.dropped_columns.len()
    );

    Ok(StageSummary {
        stage: "clean",
        rows_in,
        rows_out: cleaned.n_rows(),
        outputs: vec![paths.cleaned.clone()],
        warning_count: report.warnings.len(),
    })
}

/// Annotate the cleaned dataset with anomaly flags and write the grouped
/// aggregate views next to it.
pub fn run_annotate(store: &dyn ObjectStore, config: &PipelineConfig) -> Result<StageSummary> {
    let paths = &config.paths;

    let cleaned = Table::from_csv(&store.get(&config.bucket, &paths.cleaned)?)?;
    let rows_in = cleaned.n_rows();
    let (annotated, report) = annotate(cleaned, config)?;
    store.put(&config.bucket, &paths.annotated, &annotated.to_csv()?)?;
    info!(
        "Annotated dataset: {} rows, {} amount anomalies",
        annotated.n_rows(),
        report.anomaly_count
    );

    let mut outputs = vec![paths.annotated.clone()];

    let by_day = aggregate_by_day(&annotated)?;
    store.put(&config.bucket, &paths.fraud_by_day, &by_day.to_csv()?)?;
    outputs.push(paths.fraud_by_day.clone());

    if annotated.has_column(REGION_COLUMN) {
        let by_region = aggregate_by_dimension(&annotated, REGION_COLUMN)?;
        store.put(&config.bucket, &paths.fraud_by_region, &by_region.to_csv()?)?;
        outputs.push(paths.fraud_by_region.clone());
    } else {
        warn!(
            "Column '{}' not present; skipping regional aggregate",
            REGION_COLUMN
        );
    }

    Ok(StageSummary {
        stage: "annotate",
        rows_in,
        rows_out: annotated.n_rows(),
        outputs,
        warning_count: report.warnings.len(),
    })
}

/// Log the schema and first rows of every configured source. A missing
/// source is reported per-source, not fatal.
pub fn run_inspect(store: &dyn ObjectStore, config: &PipelineConfig) -> Result<StageSummary> {
    let paths = &config.paths;
    let sources: [(&str, &str, SourceKind); 5] = [
        ("transactions (sampled)", &paths.sampled_transactions, SourceKind::Csv),
        ("fraud labels (sampled)", &paths.sampled_fraud_labels, SourceKind::LabelMap),
        ("cards (raw)", &paths.raw_cards, SourceKind::Csv),
        ("users (raw)", &paths.raw_users, SourceKind::Csv),
        ("mcc codes (raw)", &paths.raw_mcc_codes, SourceKind::CodeMap),
    ];

    let mut rows_seen = 0usize;
    for (name, key, kind) in sources {
        let bytes = match store.get(&config.bucket, key) {
            Ok(bytes) => bytes,
            Err(PipelineError::ObjectNotFound { .. }) => {
                info!("{}: not found at {}", name, key);
                continue;
            }
            Err(e) => return Err(e),
        };
        let table = match kind {
            SourceKind::Csv => Table::from_csv(&bytes)?,
            SourceKind::LabelMap => {
                Table::from_json_label_map(&bytes, key, "transaction_id", "is_fraud")?
            }
            SourceKind::CodeMap => Table::from_json_code_map(&bytes, key, "mcc", "mcc_description")?,
        };
        rows_seen += table.n_rows();
        info!("{}: columns {:?}", name, table.columns());
        for row in table.rows().iter().take(5) {
            let rendered: Vec<String> = row.iter().map(|v| v.to_field()).collect();
            info!("{}: {}", name, rendered.join(", "));
        }
    }

    Ok(StageSummary {
        stage: "inspect",
        rows_in: rows_seen,
        rows_out: rows_seen,
        outputs: Vec::new(),
        warning_count: 0,
    })
}

#[derive(Clone, Copy)]
enum SourceKind {
    Csv,
    LabelMap,
    CodeMap,
}

/// Run every stage in order and persist a run record.
pub fn run_all(store: &dyn ObjectStore, config: &PipelineConfig) -> Result<PipelineRun> {
    let id = Uuid::new_v4();
    let started_at = Utc::now();
    info!("Starting pipeline run {}", id);

    let stages = vec![
        run_sample(store, config)?,
        run_merge(store, config)?,
        run_clean(store, config)?,
        run_annotate(store, config)?,
    ];

    let run = PipelineRun {
        id,
        started_at,
        finished_at: Utc::now(),
        stages,
    };
    let record = serde_json::to_vec_pretty(&run)?;
    store.put(&config.bucket, &format!("{}{}.json", RUNS_PREFIX, id), &record)?;
    info!("Pipeline run {} complete", id);
    Ok(run)
}
