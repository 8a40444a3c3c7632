//! Per-file session reading
//!
//! A session reader turns one export file into its tables: the samples table
//! and, for heart rate, the beat-events table produced by running the IBI
//! reconstructor over every sample of the file.

use crate::adapters::{Boundary, GreenPpgDecoder, HeartRateDecoder, SessionDecoder};
use crate::error::StitchError;
use crate::ibi::{IbiPolicy, IbiReconstructor};
use crate::timestamp::TimestampConverter;
use crate::types::{file_name_of, BeatEvent, DaySeries, HeartRateSample, PpgSample, SeriesKind};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Tables produced by one file that can be merged into a day
pub trait SessionTables: Default {
    /// Append another file's tables, keeping their internal order
    fn absorb(&mut self, other: Self);

    /// Restore global chronological order after the last `absorb`
    fn sort_chronologically(&mut self);

    /// Rows in the primary samples table
    fn row_count(&self) -> usize;
}

impl SessionTables for DaySeries<PpgSample> {
    fn absorb(&mut self, other: Self) {
        self.append(other.into_records());
    }

    fn sort_chronologically(&mut self) {
        DaySeries::sort_chronologically(self);
    }

    fn row_count(&self) -> usize {
        self.len()
    }
}

/// Heart-rate samples with the beats reconstructed from them
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HeartRateTables {
    pub samples: DaySeries<HeartRateSample>,
    pub beats: DaySeries<BeatEvent>,
}

impl SessionTables for HeartRateTables {
    fn absorb(&mut self, other: Self) {
        self.samples.append(other.samples.into_records());
        self.beats.append(other.beats.into_records());
    }

    fn sort_chronologically(&mut self) {
        self.samples.sort_chronologically();
        self.beats.sort_chronologically();
    }

    fn row_count(&self) -> usize {
        self.samples.len()
    }
}

/// Expand the beats of every sample in one file.
///
/// The next-sample anchor comes from the following sample in the same file.
/// Samples without a timestamp stay in the samples table but contribute no
/// beats.
pub fn merge_heart_rate(
    samples: Vec<HeartRateSample>,
    reconstructor: &IbiReconstructor,
) -> HeartRateTables {
    let mut beats = Vec::new();

    for (i, sample) in samples.iter().enumerate() {
        let Some(anchor) = sample.instant else {
            continue;
        };
        let next = samples.get(i + 1).and_then(|s| s.instant);
        beats.extend(reconstructor.reconstruct(
            anchor,
            next,
            &sample.ibi_durations,
            &sample.ibi_statuses,
        ));
    }

    let mut tables = HeartRateTables::default();
    tables.samples.append(samples);
    tables.beats.append(beats);
    tables
}

/// Trait for reading one session file into tables
pub trait SessionReader {
    type Tables: SessionTables;

    fn kind(&self) -> SeriesKind;

    /// Read only the boundary timestamps of a file's content
    fn probe_boundary(&self, raw_json: &str) -> Result<Boundary, StitchError>;

    /// Decode a file's content into its tables
    fn read(&self, raw_json: &str) -> Result<Self::Tables, StitchError>;

    fn converter(&self) -> &TimestampConverter;

    /// Read and decode a file from disk
    fn read_file(&self, path: &Path) -> Result<Self::Tables, StitchError> {
        let decode_error = |reason: String| StitchError::Decode {
            file: file_name_of(path),
            reason,
        };
        let raw_json = fs::read_to_string(path).map_err(|e| decode_error(e.to_string()))?;
        self.read(&raw_json).map_err(|e| decode_error(e.to_string()))
    }
}

/// Reads green PPG session files
#[derive(Debug, Clone, Copy, Default)]
pub struct GreenPpgReader {
    converter: TimestampConverter,
}

impl GreenPpgReader {
    pub fn new(converter: TimestampConverter) -> Self {
        Self { converter }
    }
}

impl SessionReader for GreenPpgReader {
    type Tables = DaySeries<PpgSample>;

    fn kind(&self) -> SeriesKind {
        SeriesKind::GreenPpg
    }

    fn probe_boundary(&self, raw_json: &str) -> Result<Boundary, StitchError> {
        GreenPpgDecoder.probe_boundary(raw_json)
    }

    fn read(&self, raw_json: &str) -> Result<Self::Tables, StitchError> {
        let samples = GreenPpgDecoder.decode(raw_json, &self.converter)?;
        let mut series = DaySeries::default();
        series.append(samples);
        Ok(series)
    }

    fn converter(&self) -> &TimestampConverter {
        &self.converter
    }
}

/// Reads heart-rate session files and reconstructs their beats
#[derive(Debug, Clone, Copy, Default)]
pub struct HeartRateReader {
    converter: TimestampConverter,
    reconstructor: IbiReconstructor,
}

impl HeartRateReader {
    pub fn new(converter: TimestampConverter, policy: IbiPolicy) -> Self {
        Self {
            converter,
            reconstructor: IbiReconstructor::new(policy, converter),
        }
    }
}

impl SessionReader for HeartRateReader {
    type Tables = HeartRateTables;

    fn kind(&self) -> SeriesKind {
        SeriesKind::HeartRate
    }

    fn probe_boundary(&self, raw_json: &str) -> Result<Boundary, StitchError> {
        HeartRateDecoder.probe_boundary(raw_json)
    }

    fn read(&self, raw_json: &str) -> Result<Self::Tables, StitchError> {
        let samples = HeartRateDecoder.decode(raw_json, &self.converter)?;
        Ok(merge_heart_rate(samples, &self.reconstructor))
    }

    fn converter(&self) -> &TimestampConverter {
        &self.converter
    }
}
