//! Column values and their canonical JSON form.
//!
//! Every logical type has one canonical serialized shape:
//!
//! | Type       | JSON                                   |
//! |------------|----------------------------------------|
//! | `STR`      | string                                 |
//! | `INT`      | number                                 |
//! | `FLOAT`    | number                                 |
//! | `DATE`     | ISO-8601 string                        |
//! | `BYTEA`    | base64 string without padding          |
//!
//! NULL is always JSON `null`.

use base64::Engine as _;
use base64::alphabet;
use base64::engine::DecodePaddingMode;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig, STANDARD_NO_PAD};
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, SecondsFormat};
use serde_json::Value as Json;

use crate::error::{ReconcileError, Result};
use crate::types::{ColumnDefinition, LogicalType};

/// Accepts base64 with or without trailing padding.
const LENIENT_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// `2^63`: the smallest float above every `i64`. `i64::MAX as f64` rounds up
/// to this value, so it cannot serve as an inclusive bound.
const I64_UPPER: f64 = 9_223_372_036_854_775_808.0;

/// Naive layouts accepted by [`parse_datetime`], tried in order.
const NAIVE_LAYOUTS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

/// A single column value as read from or written to a database.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// SQL NULL.
    Null,
    /// Character data.
    String(String),
    /// Integer.
    Integer(i64),
    /// Floating point.
    Float(f64),
    /// Date and time without offset.
    DateTime(NaiveDateTime),
    /// Date and time with a fixed offset.
    DateTimeTz(DateTime<FixedOffset>),
    /// Raw bytes.
    Binary(Vec<u8>),
}

impl Value {
    /// Short name of the value's kind, used in coercion errors.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::String(_) => "string",
            Self::Integer(_) => "integer",
            Self::Float(_) => "float",
            Self::DateTime(_) => "datetime",
            Self::DateTimeTz(_) => "datetime with offset",
            Self::Binary(_) => "binary",
        }
    }

    /// Returns the string payload.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the value as an integer.
    ///
    /// Integral floats and numeric strings are accepted, since catalog
    /// drivers disagree on how they report counts and lengths. Floats
    /// outside the `i64` range give `None`.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(i) => Some(*i),
            Self::Float(f) => float_to_i64(*f),
            Self::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Drops the offset of a zoned timestamp, keeping its wall-clock time.
    #[must_use]
    pub fn without_offset(self) -> Self {
        match self {
            Self::DateTimeTz(dt) => Self::DateTime(dt.naive_local()),
            other => other,
        }
    }
}

/// Converts an integral float that fits in an `i64`.
#[allow(clippy::cast_possible_truncation)]
fn float_to_i64(f: f64) -> Option<i64> {
    let in_range = (-I64_UPPER..I64_UPPER).contains(&f);
    (in_range && f.fract() == 0.0).then_some(f as i64)
}

fn json_kind(value: &Json) -> &'static str {
    match value {
        Json::Null => "null",
        Json::Bool(_) => "boolean",
        Json::Number(_) => "number",
        Json::String(_) => "string",
        Json::Array(_) => "array",
        Json::Object(_) => "object",
    }
}

/// Parses a timestamp in any of the accepted layouts.
///
/// RFC 3339 values keep their offset; the other layouts produce naive
/// timestamps, and a bare `YYYY-MM-DD` means midnight.
#[must_use]
pub fn parse_datetime(text: &str) -> Option<Value> {
    let text = text.trim();
    for layout in NAIVE_LAYOUTS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, layout) {
            return Some(Value::DateTime(dt));
        }
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(Value::DateTimeTz(dt));
    }
    if let Ok(dt) = DateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f %z") {
        return Some(Value::DateTimeTz(dt));
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(Value::DateTime)
}

/// Converts a value to its canonical JSON form for a column of type `ty`.
///
/// # Errors
///
/// Returns [`ReconcileError::TypeCoercion`] when the value's kind does not
/// fit the column type, or when a float is not finite.
pub fn encode(column: &str, ty: LogicalType, value: &Value) -> Result<Json> {
    let mismatch = || ReconcileError::coercion(column, ty, value.kind());
    match (ty, value) {
        (_, Value::Null) => Ok(Json::Null),
        (LogicalType::String, Value::String(s)) => Ok(Json::String(s.clone())),
        (LogicalType::Integer, Value::Integer(i)) => Ok(Json::from(*i)),
        (LogicalType::Float, Value::Float(f)) => serde_json::Number::from_f64(*f)
            .map(Json::Number)
            .ok_or_else(mismatch),
        #[allow(clippy::cast_precision_loss)]
        (LogicalType::Float, Value::Integer(i)) => Ok(Json::from(*i as f64)),
        (LogicalType::DateTime, Value::DateTime(dt)) => {
            Ok(Json::String(dt.format("%Y-%m-%dT%H:%M:%S%.f").to_string()))
        }
        (LogicalType::DateTime, Value::DateTimeTz(dt)) => {
            Ok(Json::String(dt.to_rfc3339_opts(SecondsFormat::AutoSi, true)))
        }
        (LogicalType::Binary, Value::Binary(bytes)) => {
            Ok(Json::String(STANDARD_NO_PAD.encode(bytes)))
        }
        _ => Err(mismatch()),
    }
}

/// Converts a canonical JSON value back into a [`Value`].
///
/// # Errors
///
/// Returns [`ReconcileError::TypeCoercion`] naming the column and the JSON
/// kind received when the shape does not match `ty`.
pub fn decode(column: &str, ty: LogicalType, json: &Json) -> Result<Value> {
    let mismatch = || ReconcileError::coercion(column, ty, json_kind(json));
    match (ty, json) {
        (_, Json::Null) => Ok(Value::Null),
        (LogicalType::String, Json::String(s)) => Ok(Value::String(s.clone())),
        (LogicalType::Integer, Json::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().and_then(float_to_i64))
            .map(Value::Integer)
            .ok_or_else(mismatch),
        (LogicalType::Integer, Json::String(s)) => {
            s.trim().parse().map(Value::Integer).map_err(|_| mismatch())
        }
        (LogicalType::Float, Json::Number(n)) => {
            n.as_f64().map(Value::Float).ok_or_else(mismatch)
        }
        (LogicalType::DateTime, Json::String(s)) => parse_datetime(s).ok_or_else(mismatch),
        (LogicalType::Binary, Json::String(s)) => LENIENT_BASE64
            .decode(s)
            .map(Value::Binary)
            .map_err(|_| mismatch()),
        _ => Err(mismatch()),
    }
}

/// Parses a textual value for a column of type `ty`. Empty text is NULL.
///
/// # Errors
///
/// Returns [`ReconcileError::TypeCoercion`] when the text is not a valid
/// representation of `ty`.
pub fn parse_text(column: &str, ty: LogicalType, text: &str) -> Result<Value> {
    if text.is_empty() {
        return Ok(Value::Null);
    }
    let mismatch = || ReconcileError::coercion(column, ty, format!("text '{text}'"));
    match ty {
        LogicalType::String => Ok(Value::String(text.to_string())),
        LogicalType::Integer => text.trim().parse().map(Value::Integer).map_err(|_| mismatch()),
        LogicalType::Float => text.trim().parse().map(Value::Float).map_err(|_| mismatch()),
        LogicalType::DateTime => parse_datetime(text).ok_or_else(mismatch),
        LogicalType::Binary => Ok(Value::Binary(text.as_bytes().to_vec())),
    }
}

/// Compares two values of a column of type `ty`.
///
/// Timestamps compare by instant when both carry an offset and by wall-clock
/// time otherwise. Integers and floats compare numerically in float columns.
#[must_use]
#[allow(clippy::float_cmp)]
pub fn values_equal(ty: LogicalType, a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Null, _) | (_, Value::Null) => false,
        (Value::DateTimeTz(x), Value::DateTimeTz(y)) => x == y,
        (Value::DateTime(x), Value::DateTimeTz(y)) | (Value::DateTimeTz(y), Value::DateTime(x)) => {
            *x == y.naive_local()
        }
        (Value::Float(x), Value::Float(y)) => x == y || (x.is_nan() && y.is_nan()),
        #[allow(clippy::cast_precision_loss)]
        (Value::Integer(i), Value::Float(f)) | (Value::Float(f), Value::Integer(i))
            if ty == LogicalType::Float =>
        {
            *i as f64 == *f
        }
        _ => a == b,
    }
}

impl ColumnDefinition {
    /// Encodes a value for this column. See [`encode`].
    ///
    /// # Errors
    ///
    /// Returns [`ReconcileError::TypeCoercion`] on a kind mismatch.
    pub fn encode(&self, value: &Value) -> Result<Json> {
        encode(&self.name, self.logical_type, value)
    }

    /// Decodes a canonical JSON value for this column. See [`decode`].
    ///
    /// # Errors
    ///
    /// Returns [`ReconcileError::TypeCoercion`] on a shape mismatch.
    pub fn decode(&self, json: &Json) -> Result<Value> {
        decode(&self.name, self.logical_type, json)
    }

    /// Parses text for this column. See [`parse_text`].
    ///
    /// # Errors
    ///
    /// Returns [`ReconcileError::TypeCoercion`] on malformed text.
    pub fn parse_text(&self, text: &str) -> Result<Value> {
        parse_text(&self.name, self.logical_type, text)
    }
}
