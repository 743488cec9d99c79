use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON deserialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unsupported JSON shape in {resource}: expected an object or an array at top level")]
    UnsupportedJsonShape { resource: String },

    #[error("Missing required column '{column}' in {table}")]
    MissingColumn { column: String, table: String },

    #[error("Object not found: {bucket}/{key}")]
    ObjectNotFound { bucket: String, key: String },

    #[error("Cannot impute column '{column}': every value is null, no mode exists")]
    EmptyColumnImputation { column: String },
}

pub type Result<T> = std::result::Result<T, PipelineError>;
