use anyhow::Result;
use fintx_pipeline::config::PipelineConfig;
use fintx_pipeline::gateway::{FsStore, InMemoryStore, ObjectStore};
use fintx_pipeline::pipeline::stages;
use fintx_pipeline::table::{Table, Value};
use tempfile::tempdir;

const TRANSACTIONS_CSV: &str = "\
id,date,client_id,card_id,amount,use_chip,merchant_city,merchant_state,zip,mcc,errors
1,2019-10-07 08:21:00,100,10,$25.50,Swipe Transaction,Seattle,WA,98101,5812,
2,2019-10-07 11:05:00,101,11,$4.75,Chip Transaction,Portland,OR,97201,5411,
3,2019-10-08 09:30:00,100,10,$1250.00,Online Transaction,Seattle,WA,98101,5812,
4,2019-10-08 17:45:00,102,12,$18.20,Swipe Transaction,Tacoma,WA,98402,5411,
5,2019-10-09 07:10:00,101,11,$3.99,Chip Transaction,Portland,OR,97201,5812,
6,2019-10-09 12:00:00,103,13,$22.00,Swipe Transaction,,,98101,5999,
7,2019-10-10 19:25:00,100,10,$15.75,Online Transaction,Seattle,WA,98101,5812,
8,2019-10-10 20:40:00,102,12,$9.10,Chip Transaction,Tacoma,WA,98402,5411,
";

const CARDS_CSV: &str = "\
id,client_id,card_brand,card_type,card_number,cvv,has_chip,credit_limit
10,100,Visa,Debit,4111111111111111,123,YES,12000
11,101,Mastercard,Credit,5500005555555559,456,YES,8000
12,102,Visa,Credit,4222222222222,789,NO,15000
13,103,Amex,Debit,340000000000009,321,YES,6000
";

const USERS_CSV: &str = "\
id,current_age,retirement_age,gender,address,yearly_income,total_debt,credit_score
100,33,66,F,123 Pine St,59000,12000,720
101,45,67,M,456 Oak Ave,81000,30500,680
102,28,65,F,789 Elm Rd,43000,8000,650
103,52,68,M,12 Cedar Ct,102000,0,790
";

const MCC_CODES_JSON: &str =
    r#"{"5812": "Eating Places", "5411": "Grocery Stores", "5999": "Misc Retail"}"#;

// Transaction 6 carries no label; the "header" entry is not a numeric id
const FRAUD_LABELS_JSON: &str = r#"{"1": "No", "2": "No", "3": "Yes", "4": "No", "5": "No", "7": "No", "8": "Yes", "header": "No"}"#;

fn seeded_store() -> InMemoryStore {
    let store = InMemoryStore::new();
    let config = PipelineConfig::default();
    let paths = &config.paths;
    store
        .put(&config.bucket, &paths.raw_transactions, TRANSACTIONS_CSV.as_bytes())
        .unwrap();
    store
        .put(&config.bucket, &paths.raw_fraud_labels, FRAUD_LABELS_JSON.as_bytes())
        .unwrap();
    store
        .put(&config.bucket, &paths.raw_cards, CARDS_CSV.as_bytes())
        .unwrap();
    store
        .put(&config.bucket, &paths.raw_users, USERS_CSV.as_bytes())
        .unwrap();
    store
        .put(&config.bucket, &paths.raw_mcc_codes, MCC_CODES_JSON.as_bytes())
        .unwrap();
    store
}

#[test]
fn test_full_pipeline_run() -> Result<()> {
    let store = seeded_store();
    let config = PipelineConfig::default();
    let paths = &config.paths;

    let run = stages::run_all(&store, &config)?;
    assert_eq!(run.stages.len(), 4);

    // Sampling is a passthrough below the target size
    let sampled = Table::from_csv(&store.get(&config.bucket, &paths.sampled_transactions)?)?;
    assert_eq!(sampled.n_rows(), 8);

    // Left-outer joins preserve the base row count
    let merged = Table::from_csv(&store.get(&config.bucket, &paths.merged)?)?;
    assert_eq!(merged.n_rows(), 8);
    assert!(merged.has_column("card_brand"));
    assert!(merged.has_column("mcc_description"));
    assert!(merged.has_column("is_fraud"));
    // Collision suffixes: cards and users both carry an `id` column
    assert!(merged.has_column("id_card"));
    assert!(merged.has_column("id_user"));

    // Cleaning drops the all-null errors column and the sensitive columns
    let cleaned = Table::from_csv(&store.get(&config.bucket, &paths.cleaned)?)?;
    assert_eq!(cleaned.n_rows(), 8);
    assert!(!cleaned.has_column("errors"));
    assert!(!cleaned.has_column("card_number"));
    assert!(!cleaned.has_column("cvv"));
    assert!(!cleaned.has_column("address"));
    // One-hot encoding replaced the categorical columns
    assert!(!cleaned.has_column("use_chip"));
    assert!(cleaned.has_column("use_chip_Online Transaction"));
    assert!(cleaned.has_column("use_chip_Swipe Transaction"));
    assert!(cleaned.has_column("card_type_Debit"));
    // Temporal features derived from the timestamp
    assert!(cleaned.has_column("hour"));
    assert!(cleaned.has_column("day_of_week"));
    // No nulls survive imputation
    for col in 0..cleaned.n_cols() {
        assert!(
            cleaned.column_values(col).all(|v| !v.is_null()),
            "column {} still has nulls",
            cleaned.columns()[col]
        );
    }

    // The $1250.00 transaction is the only amount anomaly
    let annotated = Table::from_csv(&store.get(&config.bucket, &paths.annotated)?)?;
    let flag_col = annotated.column_index("amount_anomaly").unwrap();
    let flagged: i64 = annotated
        .column_values(flag_col)
        .filter_map(|v| v.as_f64())
        .sum::<f64>() as i64;
    assert_eq!(flagged, 1);

    // Aggregates: one bucket per calendar day
    let by_day = Table::from_csv(&store.get(&config.bucket, &paths.fraud_by_day)?)?;
    assert_eq!(by_day.n_rows(), 4);
    assert_eq!(
        by_day.columns(),
        &["day", "tx_count", "fraud_rate", "anomaly_count"]
    );
    let by_region = Table::from_csv(&store.get(&config.bucket, &paths.fraud_by_region)?)?;
    assert!(by_region.n_rows() >= 2);

    // The run record is persisted
    let record = store.get(&config.bucket, &format!("data/runs/{}.json", run.id))?;
    let parsed: serde_json::Value = serde_json::from_slice(&record)?;
    assert_eq!(parsed["stages"].as_array().unwrap().len(), 4);
    Ok(())
}

#[test]
fn test_sampling_is_reproducible() -> Result<()> {
    let store = seeded_store();
    let config = PipelineConfig {
        sample_size: 4,
        ..PipelineConfig::default()
    };
    let paths = config.paths.clone();

    stages::run_sample(&store, &config)?;
    let first = store.get(&config.bucket, &paths.sampled_transactions)?;
    stages::run_sample(&store, &config)?;
    let second = store.get(&config.bucket, &paths.sampled_transactions)?;
    assert_eq!(first, second);

    let sampled = Table::from_csv(&first)?;
    assert_eq!(sampled.n_rows(), 4);
    Ok(())
}

#[test]
fn test_label_map_is_head_truncated() -> Result<()> {
    let store = seeded_store();
    let config = PipelineConfig {
        sample_size: 3,
        ..PipelineConfig::default()
    };
    stages::run_sample(&store, &config)?;
    let labels = store.get(&config.bucket, &config.paths.sampled_fraud_labels)?;
    let parsed: serde_json::Value = serde_json::from_slice(&labels)?;
    assert_eq!(parsed.as_object().unwrap().len(), 3);
    Ok(())
}

#[test]
fn test_clean_stage_is_idempotent_over_the_store() -> Result<()> {
    let store = seeded_store();
    let config = PipelineConfig::default();
    let paths = &config.paths;

    stages::run_sample(&store, &config)?;
    stages::run_merge(&store, &config)?;
    stages::run_clean(&store, &config)?;
    let first = store.get(&config.bucket, &paths.cleaned)?;

    // Feed the cleaned output back through the cleaner
    store.put(&config.bucket, &paths.merged, &first)?;
    stages::run_clean(&store, &config)?;
    let second = store.get(&config.bucket, &paths.cleaned)?;

    let a = Table::from_csv(&first)?;
    let b = Table::from_csv(&second)?;
    assert_eq!(a.columns(), b.columns());
    assert_eq!(a.n_rows(), b.n_rows());
    Ok(())
}

#[test]
fn test_missing_raw_input_fails_the_run() {
    let store = InMemoryStore::new();
    let config = PipelineConfig::default();
    assert!(stages::run_sample(&store, &config).is_err());
}

#[test]
fn test_pipeline_over_filesystem_store() -> Result<()> {
    let dir = tempdir()?;
    let store = FsStore::new(dir.path());
    let config = PipelineConfig::default();
    let paths = &config.paths;
    store.put(&config.bucket, &paths.raw_transactions, TRANSACTIONS_CSV.as_bytes())?;
    store.put(&config.bucket, &paths.raw_fraud_labels, FRAUD_LABELS_JSON.as_bytes())?;
    store.put(&config.bucket, &paths.raw_cards, CARDS_CSV.as_bytes())?;
    store.put(&config.bucket, &paths.raw_users, USERS_CSV.as_bytes())?;
    store.put(&config.bucket, &paths.raw_mcc_codes, MCC_CODES_JSON.as_bytes())?;

    stages::run_all(&store, &config)?;
    assert!(dir
        .path()
        .join(&config.bucket)
        .join("data/processed/cleaned_dataset_final.csv")
        .exists());

    // Values survive the filesystem round trip intact
    let cleaned = Table::from_csv(&store.get(&config.bucket, &paths.cleaned)?)?;
    let amount_col = cleaned.column_index("amount").unwrap();
    assert_eq!(cleaned.cell(0, amount_col), &Value::Float(25.5));
    Ok(())
}
