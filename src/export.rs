//! Day export
//!
//! Each assembled table is written twice:
//! - a CSV table (header row, one row per record). Portable but lossy: the
//!   instant is rendered as text and loses its native type.
//! - a bincode snapshot of the whole series that reads back with every
//!   instant and its UTC offset intact.

use crate::error::StitchError;
use crate::timestamp::Timestamp;
use crate::types::{BeatEvent, DaySeries, HeartRateSample, PpgSample, Timestamped};
use crate::{PRODUCER_NAME, STITCH_VERSION};
use chrono::{DateTime, Utc};
use log::info;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Snapshot layout version, bumped on incompatible changes
pub const SNAPSHOT_FORMAT_VERSION: u32 = 1;

/// Text layout of instants in CSV output
pub const CSV_INSTANT_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f%:z";

/// Which table an artifact holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportTable {
    GreenPpg,
    HeartRate,
    HeartRateIbi,
}

impl ExportTable {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExportTable::GreenPpg => "green_ppg",
            ExportTable::HeartRate => "heart_rate",
            ExportTable::HeartRateIbi => "heart_rate_ibi",
        }
    }

    /// File stem shared by both artifacts of a day
    pub fn base_name(&self, date: &str) -> String {
        format!("concatenated_{}_{}", self.as_str(), date)
    }
}

/// A record that can be written as one CSV row
pub trait TableRow {
    fn header() -> &'static [&'static str];
    fn record(&self) -> Vec<String>;
}

fn instant_field(instant: Option<Timestamp>) -> String {
    instant
        .map(|t| t.format(CSV_INSTANT_FORMAT).to_string())
        .unwrap_or_default()
}

fn optional_field<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

impl TableRow for PpgSample {
    fn header() -> &'static [&'static str] {
        &["ppg_green_value", "datetime"]
    }

    fn record(&self) -> Vec<String> {
        vec![optional_field(self.value), instant_field(self.instant)]
    }
}

impl TableRow for HeartRateSample {
    fn header() -> &'static [&'static str] {
        &[
            "hr",
            "hrInterBeatInterval",
            "status",
            "effective_time_frame",
            "datetime",
        ]
    }

    fn record(&self) -> Vec<String> {
        vec![
            optional_field(self.hr),
            optional_field(self.hr_ibi_summary),
            optional_field(self.status),
            self.effective_time_frame.clone().unwrap_or_default(),
            instant_field(self.instant),
        ]
    }
}

impl TableRow for BeatEvent {
    fn header() -> &'static [&'static str] {
        &["datetime", "ibi", "ibi_status"]
    }

    fn record(&self) -> Vec<String> {
        vec![
            instant_field(Some(self.instant)),
            self.ibi_ms.to_string(),
            self.status.to_string(),
        ]
    }
}

/// Write records as CSV to any writer
pub fn write_csv_to<W: Write, T: TableRow>(writer: W, records: &[T]) -> Result<(), StitchError> {
    let mut writer = csv::Writer::from_writer(writer);
    writer.write_record(T::header())?;
    for record in records {
        writer.write_record(record.record())?;
    }
    writer.flush()?;
    Ok(())
}

/// Write records as a CSV file, returning the number of bytes written
pub fn write_csv<T: TableRow>(path: &Path, records: &[T]) -> Result<u64, StitchError> {
    write_csv_to(BufWriter::new(File::create(path)?), records)?;
    Ok(fs::metadata(path)?.len())
}

/// Provenance stored at the front of every snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotHeader {
    pub format_version: u32,
    pub producer: String,
    pub producer_version: String,
    pub run_id: String,
    pub created_at_utc: DateTime<Utc>,
    pub table: ExportTable,
    pub date: String,
    pub timezone: String,
}

impl SnapshotHeader {
    pub fn new(table: ExportTable, date: &str, timezone: &str) -> Self {
        Self {
            format_version: SNAPSHOT_FORMAT_VERSION,
            producer: PRODUCER_NAME.to_string(),
            producer_version: STITCH_VERSION.to_string(),
            run_id: Uuid::new_v4().to_string(),
            created_at_utc: Utc::now(),
            table,
            date: date.to_string(),
            timezone: timezone.to_string(),
        }
    }
}

/// A typed, lossless copy of one day table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot<T> {
    pub header: SnapshotHeader,
    pub series: DaySeries<T>,
}

/// Write a snapshot, returning the number of bytes written
pub fn write_snapshot<T: Serialize>(path: &Path, snapshot: &Snapshot<T>) -> Result<u64, StitchError> {
    let mut writer = BufWriter::new(File::create(path)?);
    bincode::serialize_into(&mut writer, snapshot)?;
    writer.flush()?;
    Ok(fs::metadata(path)?.len())
}

/// Read a snapshot written by `write_snapshot`
pub fn read_snapshot<T: DeserializeOwned>(path: &Path) -> Result<Snapshot<T>, StitchError> {
    let reader = BufReader::new(File::open(path)?);
    let snapshot: Snapshot<T> = bincode::deserialize_from(reader)?;
    if snapshot.header.format_version != SNAPSHOT_FORMAT_VERSION {
        return Err(StitchError::Snapshot(format!(
            "unsupported snapshot format version {} (expected {})",
            snapshot.header.format_version, SNAPSHOT_FORMAT_VERSION
        )));
    }
    Ok(snapshot)
}

/// Descriptive statistics of an exported table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DaySummary {
    pub rows: usize,
    pub first_instant: Option<Timestamp>,
    pub last_instant: Option<Timestamp>,
    pub duration_seconds: Option<f64>,
    pub unknown_instants: usize,
    /// Minimum and maximum value (green PPG only)
    pub value_range: Option<(f64, f64)>,
}

impl DaySummary {
    pub fn of<T: Timestamped>(series: &DaySeries<T>) -> Self {
        let first_instant = series.first_instant();
        let last_instant = series.last_instant();
        let duration_seconds = first_instant
            .zip(last_instant)
            .map(|(first, last)| (last - first).num_milliseconds() as f64 / 1000.0);

        Self {
            rows: series.len(),
            first_instant,
            last_instant,
            duration_seconds,
            unknown_instants: series.unknown_instant_count(),
            value_range: None,
        }
    }

    pub fn with_value_range(mut self, value_range: Option<(f64, f64)>) -> Self {
        self.value_range = value_range;
        self
    }
}

/// Paths and sizes of the two artifacts written for one table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportArtifacts {
    pub table: ExportTable,
    pub csv_path: PathBuf,
    pub csv_bytes: u64,
    pub snapshot_path: PathBuf,
    pub snapshot_bytes: u64,
    pub summary: DaySummary,
}

/// Writes day tables into an output directory
#[derive(Debug, Clone)]
pub struct DayExporter {
    output_dir: PathBuf,
    timezone: String,
}

impl DayExporter {
    pub fn new(output_dir: impl Into<PathBuf>, timezone: impl Into<String>) -> Self {
        Self {
            output_dir: output_dir.into(),
            timezone: timezone.into(),
        }
    }

    /// Write the CSV and snapshot artifacts of one table.
    ///
    /// An empty table is not exported and yields `None`.
    pub fn export<T>(
        &self,
        table: ExportTable,
        date: &str,
        series: &DaySeries<T>,
    ) -> Result<Option<ExportArtifacts>, StitchError>
    where
        T: TableRow + Timestamped + Serialize + Clone,
    {
        if series.is_empty() {
            info!("No {} data to export for {}", table.as_str(), date);
            return Ok(None);
        }

        fs::create_dir_all(&self.output_dir)?;
        let base_name = table.base_name(date);
        let csv_path = self.output_dir.join(format!("{}.csv", base_name));
        let snapshot_path = self.output_dir.join(format!("{}.bin", base_name));

        let snapshot = Snapshot {
            header: SnapshotHeader::new(table, date, &self.timezone),
            series: series.clone(),
        };
        let snapshot_bytes = write_snapshot(&snapshot_path, &snapshot)?;
        info!("Exported snapshot: {}", snapshot_path.display());

        let csv_bytes = write_csv(&csv_path, series.records())?;
        info!("Exported CSV file: {}", csv_path.display());

        Ok(Some(ExportArtifacts {
            table,
            csv_path,
            csv_bytes,
            snapshot_path,
            snapshot_bytes,
            summary: DaySummary::of(series),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timestamp::TimestampConverter;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn ppg_series() -> DaySeries<PpgSample> {
        let converter = TimestampConverter::default();
        DaySeries::from_records(vec![
            PpgSample {
                value: Some(2048.0),
                instant: converter.instant(1_754_496_000_000),
            },
            PpgSample {
                value: Some(2051.5),
                instant: converter.instant(1_754_496_000_040),
            },
            PpgSample {
                value: None,
                instant: None,
            },
        ])
    }

    #[test]
    fn test_csv_layout() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.csv");
        write_csv(&path, ppg_series().records()).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(
            lines,
            vec![
                "ppg_green_value,datetime",
                "2048,2025-08-06 09:00:00.000000-07:00",
                "2051.5,2025-08-06 09:00:00.040000-07:00",
                ",",
            ]
        );
    }

    #[test]
    fn test_beat_csv_layout() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("beats.csv");
        let beats = vec![BeatEvent {
            instant: TimestampConverter::new("UTC").unwrap().instant(1_500).unwrap(),
            ibi_ms: 812,
            status: 0,
        }];
        write_csv(&path, &beats).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(
            content,
            "datetime,ibi,ibi_status\n1970-01-01 00:00:01.500000+00:00,812,0\n"
        );
    }

    #[test]
    fn test_snapshot_is_lossless() {
        let dir = TempDir::new().unwrap();
        let converter = TimestampConverter::default();
        // Same day, both sides of the fall-back transition
        let series = DaySeries::from_records(vec![
            BeatEvent {
                instant: converter.instant(1_762_073_970_000).unwrap(),
                ibi_ms: 800,
                status: 0,
            },
            BeatEvent {
                instant: converter.instant(1_762_074_030_000).unwrap(),
                ibi_ms: 805,
                status: 1,
            },
        ]);

        let exporter = DayExporter::new(dir.path(), "US/Pacific");
        let artifacts = exporter
            .export(ExportTable::HeartRateIbi, "02.11.25", &series)
            .unwrap()
            .unwrap();

        let loaded: Snapshot<BeatEvent> = read_snapshot(&artifacts.snapshot_path).unwrap();
        assert_eq!(loaded.series, series);
        assert_eq!(loaded.header.table, ExportTable::HeartRateIbi);
        assert_eq!(loaded.header.timezone, "US/Pacific");

        let offsets: Vec<i32> = loaded
            .series
            .iter()
            .map(|b| b.instant.offset().local_minus_utc())
            .collect();
        assert_eq!(offsets, vec![-7 * 3600, -8 * 3600]);
    }

    #[test]
    fn test_export_names_and_summary() {
        let dir = TempDir::new().unwrap();
        let exporter = DayExporter::new(dir.path().join("data"), "US/Pacific");
        let series = ppg_series();

        let artifacts = exporter
            .export(ExportTable::GreenPpg, "06.08.25", &series)
            .unwrap()
            .unwrap();

        assert!(artifacts
            .csv_path
            .ends_with("data/concatenated_green_ppg_06.08.25.csv"));
        assert!(artifacts
            .snapshot_path
            .ends_with("data/concatenated_green_ppg_06.08.25.bin"));
        assert!(artifacts.csv_bytes > 0);
        assert!(artifacts.snapshot_bytes > 0);

        let summary = DaySummary::of(&series).with_value_range(series.value_range());
        assert_eq!(summary.rows, 3);
        assert_eq!(summary.unknown_instants, 1);
        assert_eq!(summary.duration_seconds, Some(0.04));
        assert_eq!(summary.value_range, Some((2048.0, 2051.5)));
    }

    #[test]
    fn test_empty_series_not_exported() {
        let dir = TempDir::new().unwrap();
        let exporter = DayExporter::new(dir.path().join("data"), "US/Pacific");
        let result = exporter
            .export(ExportTable::GreenPpg, "06.08.25", &DaySeries::<PpgSample>::default())
            .unwrap();

        assert!(result.is_none());
        assert!(!dir.path().join("data").exists());
    }

    #[test]
    fn test_corrupt_snapshot_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.bin");
        fs::write(&path, [0u8, 1, 2]).unwrap();

        let result = read_snapshot::<PpgSample>(&path);
        assert!(matches!(result, Err(StitchError::Snapshot(_))));
    }
}
