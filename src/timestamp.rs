//! Timestamp conversion
//!
//! Maps integer epoch milliseconds to timezone-qualified instants. The civil
//! timezone is a configuration value; gap arithmetic elsewhere stays on raw
//! epoch milliseconds and only converts at the boundary.

use crate::error::StitchError;
use chrono::{DateTime, FixedOffset, Offset, TimeZone};
use chrono_tz::Tz;

/// A timezone-qualified instant. The offset is the one in effect in the
/// configured zone at that instant, so it survives serialization.
pub type Timestamp = DateTime<FixedOffset>;

/// Zone used when no timezone is configured
pub const DEFAULT_TIMEZONE: &str = "US/Pacific";

/// Converts epoch milliseconds into instants in a fixed civil timezone
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimestampConverter {
    tz: Tz,
}

impl Default for TimestampConverter {
    fn default() -> Self {
        Self {
            tz: chrono_tz::US::Pacific,
        }
    }
}

impl TimestampConverter {
    /// Create a converter for an IANA timezone name (e.g. "Europe/Berlin")
    pub fn new(timezone: &str) -> Result<Self, StitchError> {
        let tz: Tz = timezone
            .parse()
            .map_err(|_| StitchError::InvalidTimezone(timezone.to_string()))?;
        Ok(Self { tz })
    }

    /// Convert an optional epoch-millisecond value.
    ///
    /// Missing input, or a value outside the representable range, yields
    /// `None` so the caller can keep the row as "timestamp unknown".
    pub fn convert(&self, epoch_ms: Option<i64>) -> Option<Timestamp> {
        epoch_ms.and_then(|ms| self.instant(ms))
    }

    /// Convert a present epoch-millisecond value
    pub fn instant(&self, epoch_ms: i64) -> Option<Timestamp> {
        self.tz
            .timestamp_millis_opt(epoch_ms)
            .single()
            .map(|dt| dt.with_timezone(&dt.offset().fix()))
    }

    /// Re-express an instant with the offset the configured zone uses at
    /// that instant. Arithmetic on a `Timestamp` keeps the original offset,
    /// which goes stale when the result crosses a DST transition.
    pub fn normalize(&self, ts: Timestamp) -> Timestamp {
        let local = ts.with_timezone(&self.tz);
        local.with_timezone(&local.offset().fix())
    }
}
