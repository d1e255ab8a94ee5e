//! Custom property values: type inference on read, coercion on write.
//!
//! Inference is an ordered list of predicates (boolean, numeric, native
//! date, date-pattern string, text); the first one that accepts the value
//! decides its type.  Coercion never fails: an unparseable value falls back
//! to `false`, `0.0` or the raw string depending on the declared type.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::variant::Variant;

/// Accepted date layouts, tried in order.  Ambiguous day/month strings
/// therefore read as month-first.
pub const DATE_PATTERNS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y", "%d/%m/%Y"];

/// Canonical serialised date layout.
pub const CANONICAL_DATE: &str = "%Y-%m-%d";

const TRUTHY: &[&str] = &["1", "true", "yes", "y", "on"];

// ---------------------------------------------------------------------------
// Data types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PropertyType {
    Boolean,
    Number,
    Date,
    Text,
}

/// A property value as exchanged with callers.
///
/// Dates serialise as `YYYY-MM-DD`; on the way back in they arrive as
/// `Text` and are re-parsed by [`coerce`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Boolean(bool),
    Number(f64),
    Text(String),
    Date(NaiveDate),
    #[default]
    Empty,
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::Boolean(b) => write!(f, "{b}"),
            PropertyValue::Number(n) => write!(f, "{n}"),
            PropertyValue::Text(s) => f.write_str(s),
            PropertyValue::Date(d) => write!(f, "{}", d.format(CANONICAL_DATE)),
            PropertyValue::Empty => Ok(()),
        }
    }
}

/// One user-defined property of a draft.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomProperty {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: PropertyType,
    #[serde(default)]
    pub value: PropertyValue,
}

impl CustomProperty {
    pub fn new(name: impl Into<String>, kind: PropertyType, value: PropertyValue) -> Self {
        Self {
            name: name.into(),
            kind,
            value,
        }
    }
}

// ---------------------------------------------------------------------------
// Dates
// ---------------------------------------------------------------------------

/// Drop a trailing time-of-day / timezone part (`T08:30:00Z`, ` 14:00`).
fn strip_time_suffix(s: &str) -> &str {
    let bytes = s.as_bytes();
    for (i, &b) in bytes.iter().enumerate() {
        if (b == b'T' || b == b' ') && bytes.get(i + 1).is_some_and(u8::is_ascii_digit) {
            return &s[..i];
        }
    }
    s
}

/// Parse a date string against [`DATE_PATTERNS`].
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let date = strip_time_suffix(s.trim());
    DATE_PATTERNS
        .iter()
        .find_map(|pattern| NaiveDate::parse_from_str(date, pattern).ok())
}

// ---------------------------------------------------------------------------
// Inference (host -> caller)
// ---------------------------------------------------------------------------

/// Classify a raw host value.  `None` for values that are not scalars.
pub fn infer(value: Variant) -> Option<(PropertyType, PropertyValue)> {
    match value {
        Variant::Bool(b) => Some((PropertyType::Boolean, PropertyValue::Boolean(b))),
        Variant::Int(n) => Some((PropertyType::Number, PropertyValue::Number(n as f64))),
        Variant::Float(x) => Some((PropertyType::Number, PropertyValue::Number(x))),
        Variant::Date(dt) => Some((PropertyType::Date, PropertyValue::Date(dt.date()))),
        Variant::Text(s) => Some(match parse_date(&s) {
            Some(d) => (PropertyType::Date, PropertyValue::Date(d)),
            None => (PropertyType::Text, PropertyValue::Text(s)),
        }),
        Variant::Empty => Some((PropertyType::Text, PropertyValue::Text(String::new()))),
        Variant::Object(_) => None,
    }
}

// ---------------------------------------------------------------------------
// Coercion (caller -> host)
// ---------------------------------------------------------------------------

fn is_truthy(token: &str) -> bool {
    let token = token.trim().to_lowercase();
    TRUTHY.contains(&token.as_str())
}

/// Convert `value` into the host primitive for the declared `kind`.
pub fn coerce(kind: PropertyType, value: &PropertyValue) -> Variant {
    match kind {
        PropertyType::Boolean => Variant::Bool(match value {
            PropertyValue::Boolean(b) => *b,
            other => is_truthy(&other.to_string()),
        }),
        PropertyType::Number => Variant::Float(match value {
            PropertyValue::Number(n) => *n,
            PropertyValue::Boolean(b) => f64::from(u8::from(*b)),
            PropertyValue::Text(s) => s.trim().parse().unwrap_or(0.0),
            PropertyValue::Date(_) | PropertyValue::Empty => 0.0,
        }),
        PropertyType::Date => match value {
            PropertyValue::Date(d) => Variant::Date(d.and_time(chrono::NaiveTime::MIN)),
            other => {
                let raw = other.to_string();
                match parse_date(&raw) {
                    Some(d) => Variant::Date(d.and_time(chrono::NaiveTime::MIN)),
                    None => Variant::Text(raw),
                }
            }
        },
        PropertyType::Text => Variant::Text(value.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
