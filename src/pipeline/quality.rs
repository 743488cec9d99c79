use serde::Serialize;
use tracing::warn;

/// Classes of data-quality findings surfaced to the caller. None of these
/// abort the run; the entirely-null imputation case is a hard error instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum WarningKind {
    /// A join key matched more than one right-hand row.
    DuplicateJoinKey,
    /// A column exceeded the missing-value threshold and was dropped.
    HighMissingColumn,
    /// A fraud-indicator value outside the recognized set was left as-is.
    UnrecognizedFlagValue,
    /// A column a declared operation expected was not present.
    MissingDeclaredColumn,
}

/// A data-quality warning with a count and a bounded set of examples.
#[derive(Debug, Clone, Serialize)]
pub struct QualityWarning {
    pub kind: WarningKind,
    pub column: Option<String>,
    pub count: usize,
    pub examples: Vec<String>,
    pub description: String,
}

impl QualityWarning {
    pub fn new(
        kind: WarningKind,
        column: Option<&str>,
        count: usize,
        examples: Vec<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            column: column.map(str::to_string),
            count,
            examples,
            description: description.into(),
        }
    }

    /// Emit the warning through the logging system.
    pub fn log(&self) {
        warn!(
            kind = ?self.kind,
            column = self.column.as_deref().unwrap_or("-"),
            count = self.count,
            examples = ?self.examples,
            "{}",
            self.description
        );
    }
}
