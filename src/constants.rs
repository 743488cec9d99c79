/// Fixed column designations and default storage paths for the
/// financial-transactions dataset. Column lists drive the cleaning and
/// annotation stages; absence of a listed column is reported, not fatal.

// Object-store defaults
pub const DEFAULT_BUCKET: &str = "financial-analysis-project";
pub const RAW_PREFIX: &str = "data/raw/";
pub const SAMPLED_PREFIX: &str = "data/sampled/";
pub const PROCESSED_PREFIX: &str = "data/processed/";
pub const AGGREGATES_PREFIX: &str = "data/aggregates/";

// Sampling defaults
pub const DEFAULT_SAMPLE_SIZE: usize = 10_000;
pub const DEFAULT_SAMPLE_SEED: u64 = 42;

// Cleaning defaults
pub const DEFAULT_MISSING_THRESHOLD: f64 = 0.7;
pub const DEFAULT_IQR_MULTIPLIER: f64 = 1.5;

/// Timestamp column parsed to a structured date/time during cleaning.
pub const DATE_COLUMN: &str = "date";

/// Amount column stripped of currency formatting and parsed as float.
pub const AMOUNT_COLUMN: &str = "amount";

/// Fraud indicator column normalized to 0/1.
pub const FRAUD_COLUMN: &str = "is_fraud";

/// Columns coerced cell-wise to numeric; unparseable cells become null.
pub const NUMERIC_COLUMNS: &[&str] = &[
    "zip",
    "mcc",
    "cvv",
    "credit_limit",
    "year_pin_last_changed",
    "num_cards_issued",
    "current_age",
    "retirement_age",
    "birth_year",
    "birth_month",
    "latitude",
    "longitude",
    "per_capita_income",
    "yearly_income",
    "total_debt",
    "credit_score",
    "num_credit_cards",
];

/// Boolean-like columns standardized to 1/0; unrecognized values become null.
pub const BOOLEAN_COLUMNS: &[&str] = &["has_chip", "card_on_dark_web", "is_fraud"];

/// Multi-valued categorical columns expanded with drop-first one-hot encoding.
pub const ONE_HOT_COLUMNS: &[&str] = &["use_chip", "card_type"];

/// Identifier columns dropped after merging; not needed for analysis.
pub const SENSITIVE_COLUMNS: &[&str] = &["card_number", "cvv", "address"];

/// Categorical dimension used for grouped fraud/anomaly aggregates.
pub const REGION_COLUMN: &str = "merchant_state";

/// Cap on example values carried in a data-quality warning.
pub const MAX_WARNING_EXAMPLES: usize = 5;

/// Key prefix for persisted run summaries.
pub const RUNS_PREFIX: &str = "data/runs/";
