//! Late-bound automation object model.
//!
//! The host application exposes its documents through `IDispatch`-style
//! objects whose members are looked up by name at call time.  The engine
//! talks to that object model exclusively through [`AutomationObject`], so
//! the same discovery and property logic runs against the live COM host
//! (see `com`) and against the in-memory host used by the tests.
//!
//! # Ownership
//!
//! Every object reference is a uniquely owned [`Handle`].  Dropping the
//! handle releases the underlying native reference; nothing is reference
//! counted on the Rust side, so a handle cannot outlive the session scope
//! that produced it without the borrow checker noticing.

use std::fmt;

use chrono::{NaiveDate, NaiveDateTime, TimeDelta};

use crate::errors::SolidEdgeError;

/// Owned reference to one automation object.
pub type Handle = Box<dyn AutomationObject>;

/// Iterator produced by native (`_NewEnum`) enumeration.
pub type NativeItems<'a> = Box<dyn Iterator<Item = Result<Variant, SolidEdgeError>> + 'a>;

// ---------------------------------------------------------------------------
// Variant
// ---------------------------------------------------------------------------

/// A loosely typed value read from (or written to) the host.
pub enum Variant {
    Empty,
    Bool(bool),
    Int(i64),
    Float(f64),
    Date(NaiveDateTime),
    Text(String),
    Object(Handle),
}

impl Variant {
    /// Short type tag used in diagnostics and error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Variant::Empty => "empty",
            Variant::Bool(_) => "bool",
            Variant::Int(_) => "int",
            Variant::Float(_) => "float",
            Variant::Date(_) => "date",
            Variant::Text(_) => "text",
            Variant::Object(_) => "object",
        }
    }

    pub fn into_object(self) -> Option<Handle> {
        match self {
            Variant::Object(handle) => Some(handle),
            _ => None,
        }
    }

    /// String form of a scalar value.  `Empty` and objects have none.
    pub fn into_text(self) -> Option<String> {
        match self {
            Variant::Text(s) => Some(s),
            Variant::Bool(b) => Some(b.to_string()),
            Variant::Int(n) => Some(n.to_string()),
            Variant::Float(f) => Some(f.to_string()),
            Variant::Date(d) => Some(d.to_string()),
            Variant::Empty | Variant::Object(_) => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Variant::Int(n) => Some(*n),
            Variant::Float(f) if f.fract() == 0.0 => Some(*f as i64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Variant::Bool(b) => Some(*b),
            Variant::Int(n) => Some(*n != 0),
            _ => None,
        }
    }
}

impl fmt::Debug for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Variant::Empty => f.write_str("Empty"),
            Variant::Bool(b) => f.debug_tuple("Bool").field(b).finish(),
            Variant::Int(n) => f.debug_tuple("Int").field(n).finish(),
            Variant::Float(x) => f.debug_tuple("Float").field(x).finish(),
            Variant::Date(d) => f.debug_tuple("Date").field(d).finish(),
            Variant::Text(s) => f.debug_tuple("Text").field(s).finish(),
            Variant::Object(_) => f.write_str("Object(..)"),
        }
    }
}

impl From<&str> for Variant {
    fn from(value: &str) -> Self {
        Variant::Text(value.to_owned())
    }
}

impl From<i64> for Variant {
    fn from(value: i64) -> Self {
        Variant::Int(value)
    }
}

// ---------------------------------------------------------------------------
// AutomationObject
// ---------------------------------------------------------------------------

/// One late-bound object of the host's automation interface.
///
/// Implementations must not cache anything across calls: every member
/// access goes to the host.
pub trait AutomationObject {
    /// Read a property (`DISPATCH_PROPERTYGET`).
    fn get(&self, member: &str) -> Result<Variant, SolidEdgeError>;

    /// Read a parameterized property or call an accessor method, e.g.
    /// `Item(1)` or `Item("Custom")`.
    fn get_with(&self, member: &str, args: &[Variant]) -> Result<Variant, SolidEdgeError>;

    /// Assign a property (`DISPATCH_PROPERTYPUT`).
    fn put(&self, member: &str, value: Variant) -> Result<(), SolidEdgeError>;

    /// Call a method (`DISPATCH_METHOD`).
    fn call(&self, member: &str, args: &[Variant]) -> Result<Variant, SolidEdgeError>;

    /// Native iteration (`_NewEnum`).  `Ok(None)` when the object does not
    /// support it; callers then fall back to `Count` / `Item(i)`.
    fn new_enum(&self) -> Result<Option<NativeItems<'_>>, SolidEdgeError>;

    /// Read a property expected to hold an object.
    fn get_object(&self, member: &str) -> Result<Option<Handle>, SolidEdgeError> {
        Ok(self.get(member)?.into_object())
    }

    /// Read a property as trimmed text; `None` when empty or non-scalar.
    fn get_text(&self, member: &str) -> Result<Option<String>, SolidEdgeError> {
        Ok(self
            .get(member)?
            .into_text()
            .map(|s| s.trim().to_owned())
            .filter(|s| !s.is_empty()))
    }
}

// ---------------------------------------------------------------------------
// OLE automation dates
// ---------------------------------------------------------------------------

const MILLIS_PER_DAY: f64 = 86_400_000.0;

fn oa_epoch() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(1899, 12, 30)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .unwrap_or_default()
}

/// Convert an OLE automation date (days since 1899-12-30, fractional part
/// is the time of day) into a calendar date-time.
pub fn oa_date_to_naive(value: f64) -> Option<NaiveDateTime> {
    if !value.is_finite() {
        return None;
    }
    let millis = (value * MILLIS_PER_DAY).round() as i64;
    oa_epoch().checked_add_signed(TimeDelta::try_milliseconds(millis)?)
}

/// Inverse of [`oa_date_to_naive`].
pub fn naive_to_oa_date(value: NaiveDateTime) -> f64 {
    let delta = value - oa_epoch();
    delta.num_milliseconds() as f64 / MILLIS_PER_DAY
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
