//! Core types for the Pulse Stitch pipeline
//!
//! This module defines the records that flow through each stage: decoded
//! samples, reconstructed beat events, per-file boundary descriptors and the
//! assembled day series.

use crate::timestamp::Timestamp;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Sort key used for files whose boundary timestamps cannot be read
pub const UNREADABLE_SORT_KEY_MS: i64 = 0;

/// Kind of session export a file holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeriesKind {
    GreenPpg,
    HeartRate,
}

impl SeriesKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SeriesKind::GreenPpg => "green_ppg",
            SeriesKind::HeartRate => "heart_rate",
        }
    }

    /// Human-readable name used in status messages
    pub fn label(&self) -> &'static str {
        match self {
            SeriesKind::GreenPpg => "green PPG",
            SeriesKind::HeartRate => "heart rate",
        }
    }
}

/// Anything with a (possibly unknown) position in time
pub trait Timestamped {
    fn instant(&self) -> Option<Timestamp>;
}

/// One green PPG reading
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PpgSample {
    /// Raw green channel value
    pub value: Option<f64>,
    /// Sample instant (None when the source timestamp is absent or non-numeric)
    pub instant: Option<Timestamp>,
}

impl Timestamped for PpgSample {
    fn instant(&self) -> Option<Timestamp> {
        self.instant
    }
}

/// One heart-rate reading with the beat intervals reported alongside it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeartRateSample {
    /// Heart rate (bpm)
    pub hr: Option<f64>,
    /// Device-side inter-beat interval summary (ms)
    pub hr_ibi_summary: Option<f64>,
    /// Device status code
    pub status: Option<i64>,
    pub instant: Option<Timestamp>,
    /// Opaque effective time frame carried through from the export
    pub effective_time_frame: Option<String>,
    /// Beat interval durations (ms), in beat order
    pub ibi_durations: Vec<i64>,
    /// Per-beat status codes aligned with `ibi_durations`
    pub ibi_statuses: Vec<i64>,
}

impl HeartRateSample {
    /// Whether this sample carries a usable beat list
    pub fn has_beats(&self) -> bool {
        !self.ibi_durations.is_empty() && self.ibi_durations.len() == self.ibi_statuses.len()
    }
}

impl Timestamped for HeartRateSample {
    fn instant(&self) -> Option<Timestamp> {
        self.instant
    }
}

/// A single reconstructed heartbeat
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BeatEvent {
    pub instant: Timestamp,
    /// Interval preceding the next beat (ms)
    pub ibi_ms: i64,
    pub status: i64,
}

impl Timestamped for BeatEvent {
    fn instant(&self) -> Option<Timestamp> {
        Some(self.instant)
    }
}

/// Boundary timestamps of one session file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileDescriptor {
    pub path: PathBuf,
    pub first_instant: Option<Timestamp>,
    pub last_instant: Option<Timestamp>,
}

impl FileDescriptor {
    pub fn new(
        path: impl Into<PathBuf>,
        first_instant: Option<Timestamp>,
        last_instant: Option<Timestamp>,
    ) -> Self {
        Self {
            path: path.into(),
            first_instant,
            last_instant,
        }
    }

    /// Base file name, used to identify files in reports
    pub fn file_name(&self) -> String {
        file_name_of(&self.path)
    }

    /// Key used to order files chronologically
    pub fn sort_key_ms(&self) -> i64 {
        self.first_instant
            .map(|t| t.timestamp_millis())
            .unwrap_or(UNREADABLE_SORT_KEY_MS)
    }

    pub fn is_readable(&self) -> bool {
        self.first_instant.is_some() && self.last_instant.is_some()
    }
}

pub(crate) fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Chronologically ordered records covering one calendar day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DaySeries<T> {
    records: Vec<T>,
}

impl<T> Default for DaySeries<T> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
        }
    }
}

impl<T: Timestamped> DaySeries<T> {
    /// Build a series from records in any order
    pub fn from_records(records: Vec<T>) -> Self {
        let mut series = Self { records };
        series.sort_chronologically();
        series
    }

    /// Append records without reordering; call `sort_chronologically` after
    /// the last append
    pub fn append(&mut self, records: Vec<T>) {
        self.records.extend(records);
    }

    /// Stable sort by instant. Rows without an instant go last, keeping their
    /// relative order.
    pub fn sort_chronologically(&mut self) {
        self.records.sort_by_key(|r| {
            let instant = r.instant();
            (instant.is_none(), instant)
        });
    }

    /// Whether timestamped rows are non-decreasing and precede unknown rows
    pub fn is_chronological(&self) -> bool {
        self.records.windows(2).all(|pair| {
            match (pair[0].instant(), pair[1].instant()) {
                (Some(a), Some(b)) => a <= b,
                (None, Some(_)) => false,
                _ => true,
            }
        })
    }

    pub fn first_instant(&self) -> Option<Timestamp> {
        self.records.iter().filter_map(|r| r.instant()).next()
    }

    pub fn last_instant(&self) -> Option<Timestamp> {
        self.records.iter().rev().filter_map(|r| r.instant()).next()
    }

    /// Rows whose instant is unknown
    pub fn unknown_instant_count(&self) -> usize {
        self.records.iter().filter(|r| r.instant().is_none()).count()
    }
}

impl<T> DaySeries<T> {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[T] {
        &self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.records.iter()
    }

    pub fn into_records(self) -> Vec<T> {
        self.records
    }
}

impl DaySeries<PpgSample> {
    /// Minimum and maximum PPG value present in the series
    pub fn value_range(&self) -> Option<(f64, f64)> {
        self.records
            .iter()
            .filter_map(|s| s.value)
            .fold(None, |acc, v| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timestamp::TimestampConverter;

    fn ppg(value: f64, ms: Option<i64>) -> PpgSample {
        PpgSample {
            value: Some(value),
            instant: TimestampConverter::default().convert(ms),
        }
    }

    #[test]
    fn test_sort_puts_unknown_instants_last() {
        let series = DaySeries::from_records(vec![
            ppg(1.0, Some(300)),
            ppg(2.0, None),
            ppg(3.0, Some(100)),
            ppg(4.0, None),
            ppg(5.0, Some(200)),
        ]);

        let values: Vec<f64> = series.iter().filter_map(|s| s.value).collect();
        assert_eq!(values, vec![3.0, 5.0, 1.0, 2.0, 4.0]);
        assert!(series.is_chronological());
        assert_eq!(series.unknown_instant_count(), 2);
    }

    #[test]
    fn test_sort_is_stable_for_equal_instants() {
        let series = DaySeries::from_records(vec![
            ppg(1.0, Some(100)),
            ppg(2.0, Some(50)),
            ppg(3.0, Some(100)),
        ]);
        let values: Vec<f64> = series.iter().filter_map(|s| s.value).collect();
        assert_eq!(values, vec![2.0, 1.0, 3.0]);
    }

    #[test]
    fn test_resort_of_sorted_series_is_noop() {
        let records = vec![ppg(1.0, Some(0)), ppg(2.0, Some(40)), ppg(3.0, Some(80))];
        let mut series = DaySeries::from_records(records.clone());
        series.sort_chronologically();
        assert_eq!(series.into_records(), records);
    }

    #[test]
    fn test_value_range_and_bounds() {
        let series = DaySeries::from_records(vec![
            ppg(12.0, Some(0)),
            ppg(-3.0, Some(40)),
            ppg(7.5, None),
        ]);
        assert_eq!(series.value_range(), Some((-3.0, 12.0)));
        assert_eq!(series.first_instant().unwrap().timestamp_millis(), 0);
        assert_eq!(series.last_instant().unwrap().timestamp_millis(), 40);
    }

    #[test]
    fn test_file_descriptor_sort_key_fallback() {
        let converter = TimestampConverter::default();
        let readable = FileDescriptor::new(
            "/data/green_ppg_data_06.08.25_a.json",
            converter.instant(5_000),
            converter.instant(6_000),
        );
        let unreadable = FileDescriptor::new("/data/green_ppg_data_06.08.25_b.json", None, None);

        assert_eq!(readable.sort_key_ms(), 5_000);
        assert_eq!(unreadable.sort_key_ms(), UNREADABLE_SORT_KEY_MS);
        assert!(!unreadable.is_readable());
        assert_eq!(readable.file_name(), "green_ppg_data_06.08.25_a.json");
    }
}
