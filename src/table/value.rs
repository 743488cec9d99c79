use chrono::NaiveDateTime;

/// A single typed cell in a record table.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    Float(f64),
    Str(String),
    Bool(bool),
    Timestamp(NaiveDateTime),
    Null,
}

/// Timestamp layouts accepted by the cleaning stage, tried in order.
const TIMESTAMP_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%m/%d/%Y %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y"];

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Infer a typed value from raw text: integer-looking text becomes an
    /// integer, float-looking text a float, booleans are recognized, empty
    /// text is null, everything else stays a string.
    pub fn infer(raw: &str) -> Value {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Value::Null;
        }
        if let Ok(i) = trimmed.parse::<i64>() {
            return Value::Int(i);
        }
        if looks_numeric(trimmed) {
            if let Ok(f) = trimmed.parse::<f64>() {
                if f.is_finite() {
                    return Value::Float(f);
                }
            }
        }
        if trimmed.eq_ignore_ascii_case("true") {
            return Value::Bool(true);
        }
        if trimmed.eq_ignore_ascii_case("false") {
            return Value::Bool(false);
        }
        Value::Str(raw.to_string())
    }

    /// Numeric view of the value, if it has one.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Render the value as a CSV field. Null becomes the empty field.
    pub fn to_field(&self) -> String {
        match self {
            Value::Int(i) => i.to_string(),
            Value::Float(f) => f.to_string(),
            Value::Str(s) => s.clone(),
            Value::Bool(b) => b.to_string(),
            Value::Timestamp(ts) => ts.format("%Y-%m-%d %H:%M:%S").to_string(),
            Value::Null => String::new(),
        }
    }

    /// Canonical type-tagged encoding used for duplicate detection, mode
    /// counting and grouping keys. Distinct from `to_field` so that null,
    /// the empty string and the text "null" never collide.
    pub fn canonical(&self) -> String {
        match self {
            Value::Int(i) => format!("i:{}", i),
            Value::Float(f) => format!("f:{}", f),
            Value::Str(s) => format!("s:{}", s),
            Value::Bool(b) => format!("b:{}", b),
            Value::Timestamp(ts) => format!("t:{}", ts.format("%Y-%m-%d %H:%M:%S")),
            Value::Null => "\u{0}".to_string(),
        }
    }

    /// Parse free-form timestamp text; date-only inputs land at midnight.
    pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
        let trimmed = raw.trim();
        for fmt in TIMESTAMP_FORMATS {
            if let Ok(ts) = NaiveDateTime::parse_from_str(trimmed, fmt) {
                return Some(ts);
            }
        }
        for fmt in DATE_FORMATS {
            if let Ok(d) = chrono::NaiveDate::parse_from_str(trimmed, fmt) {
                return d.and_hms_opt(0, 0, 0);
            }
        }
        None
    }
}

// Reject words like "nan"/"inf" that f64::from_str would happily accept.
fn looks_numeric(s: &str) -> bool {
    let body = s.strip_prefix(['+', '-']).unwrap_or(s);
    !body.is_empty() && body.chars().all(|c| c.is_ascii_digit() || c == '.' || c == 'e' || c == 'E' || c == '+' || c == '-')
        && body.chars().next().is_some_and(|c| c.is_ascii_digit() || c == '.')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inference_ladder() {
        assert_eq!(Value::infer("42"), Value::Int(42));
        assert_eq!(Value::infer("-3.5"), Value::Float(-3.5));
        assert_eq!(Value::infer(""), Value::Null);
        assert_eq!(Value::infer("   "), Value::Null);
        assert_eq!(Value::infer("true"), Value::Bool(true));
        assert_eq!(Value::infer("Swipe Transaction"), Value::Str("Swipe Transaction".to_string()));
    }

    #[test]
    fn test_nan_and_inf_stay_strings() {
        assert_eq!(Value::infer("NaN"), Value::Str("NaN".to_string()));
        assert_eq!(Value::infer("inf"), Value::Str("inf".to_string()));
    }

    #[test]
    fn test_timestamp_parsing() {
        let ts = Value::parse_timestamp("2019-10-05 14:23:00").unwrap();
        assert_eq!(ts.format("%H:%M").to_string(), "14:23");
        let midnight = Value::parse_timestamp("2019-10-05").unwrap();
        assert_eq!(midnight.format("%H:%M:%S").to_string(), "00:00:00");
        assert!(Value::parse_timestamp("not a date").is_none());
    }

    #[test]
    fn test_canonical_distinguishes_null_from_empty() {
        assert_ne!(Value::Null.canonical(), Value::Str(String::new()).canonical());
        assert_ne!(Value::Int(1).canonical(), Value::Str("1".to_string()).canonical());
    }
}
