//! Session export decoders
//!
//! This module provides decoders that parse per-session JSON exports and map
//! them to typed sample records. Every source field is optional: a field that
//! is absent or not coercible to the expected type decodes as missing instead
//! of failing the whole file.
//!
//! Timestamps and beat intervals are whole milliseconds. A fractional value
//! such as `812.7` is truncated toward zero (`812`), so sub-millisecond parts
//! of the source are not kept.

mod green_ppg;
mod heart_rate;

pub use green_ppg::GreenPpgDecoder;
pub use heart_rate::HeartRateDecoder;

use crate::error::StitchError;
use crate::timestamp::TimestampConverter;
use crate::types::Timestamped;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Raw epoch-millisecond timestamps of the first and last sample in a file
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Boundary {
    pub first_ms: Option<i64>,
    pub last_ms: Option<i64>,
}

impl Boundary {
    fn from_timestamps(first: Option<&TimestampProbe>, last: Option<&TimestampProbe>) -> Self {
        Self {
            first_ms: first.and_then(|p| p.unix_timestamp_in_ms),
            last_ms: last.and_then(|p| p.unix_timestamp_in_ms),
        }
    }
}

/// Trait for session export decoders
pub trait SessionDecoder {
    type Sample: Timestamped;

    /// Decode every sample of one session export
    fn decode(
        &self,
        raw_json: &str,
        converter: &TimestampConverter,
    ) -> Result<Vec<Self::Sample>, StitchError>;

    /// Read only the first and last sample timestamps
    fn probe_boundary(&self, raw_json: &str) -> Result<Boundary, StitchError>;
}

/// A sample stripped down to its timestamp field
#[derive(Debug, Deserialize)]
pub(crate) struct TimestampProbe {
    #[serde(default, deserialize_with = "lenient_i64")]
    unix_timestamp_in_ms: Option<i64>,
}

/// Deserialize a number or numeric string into `i64`, anything else into `None`
pub(crate) fn lenient_i64<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(coerce_i64))
}

/// Deserialize a number or numeric string into `f64`, anything else into `None`
pub(crate) fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(coerce_f64))
}

/// Coerce to whole milliseconds, truncating any fractional part
pub(crate) fn coerce_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().and_then(finite_to_i64)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().and_then(finite_to_i64))
        }
        _ => None,
    }
}

pub(crate) fn coerce_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
        _ => None,
    }
}

fn finite_to_i64(f: f64) -> Option<i64> {
    if f.is_finite() && f.abs() < i64::MAX as f64 {
        Some(f.trunc() as i64)
    } else {
        None
    }
}

/// Coerce every element of a list; a single bad element invalidates the list
pub(crate) fn coerce_i64_list(values: &[Value]) -> Option<Vec<i64>> {
    values.iter().map(coerce_i64).collect()
}

/// Render an opaque JSON value as a string, keeping JSON strings verbatim
pub(crate) fn opaque_string(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}
