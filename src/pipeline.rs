//! Pipeline orchestration
//!
//! This module provides the public API for Pulse Stitch. It runs one day of
//! session exports through the full pipeline:
//! 1. discovery - find the day's files and order them by first timestamp
//! 2. continuity audit - flag gaps between consecutive files
//! 3. assembly - decode, reconstruct beats, concatenate and sort
//! 4. export - CSV table and binary snapshot per table

use crate::assembler::{AssemblyStatus, DayAssembler, DayAssembly, FileFailure};
use crate::config::{GapThresholds, StitchConfig};
use crate::continuity::{audit, ContinuityReport};
use crate::error::StitchError;
use crate::export::{DayExporter, DaySummary, ExportArtifacts, ExportTable};
use crate::session::{GreenPpgReader, HeartRateReader, HeartRateTables, SessionReader};
use crate::timestamp::TimestampConverter;
use crate::types::{DaySeries, FileDescriptor, PpgSample, SeriesKind};
use log::info;
use serde::Serialize;
use std::path::Path;

/// Counts and outcome of one day's assembly
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssemblySummary {
    pub status: AssemblyStatus,
    pub message: String,
    pub files_found: usize,
    pub files_read: usize,
    pub total_rows: usize,
    /// Reconstructed beats (heart rate only)
    pub beat_rows: Option<usize>,
    pub failures: Vec<FileFailure>,
}

impl AssemblySummary {
    pub fn from_assembly<T>(assembly: &DayAssembly<T>, beat_rows: Option<usize>) -> Self {
        Self {
            status: assembly.status,
            message: assembly.message(),
            files_found: assembly.files_found(),
            files_read: assembly.files_read,
            total_rows: assembly.total_rows,
            beat_rows,
            failures: assembly.failures.clone(),
        }
    }
}

/// Everything produced for one (directory, date, kind) request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DayReport {
    pub date: String,
    pub kind: SeriesKind,
    pub continuity: ContinuityReport,
    pub assembly: AssemblySummary,
    pub exports: Vec<ExportArtifacts>,
}

/// Processor holding validated configuration for repeated day runs
#[derive(Debug, Clone)]
pub struct DayProcessor {
    config: StitchConfig,
    converter: TimestampConverter,
    thresholds: GapThresholds,
}

impl Default for DayProcessor {
    fn default() -> Self {
        Self {
            config: StitchConfig::default(),
            converter: TimestampConverter::default(),
            thresholds: GapThresholds::default(),
        }
    }
}

impl DayProcessor {
    /// Create a processor, validating timezone and thresholds
    pub fn new(config: StitchConfig) -> Result<Self, StitchError> {
        let converter = config.converter()?;
        let thresholds = config.thresholds()?;
        Ok(Self {
            config,
            converter,
            thresholds,
        })
    }

    pub fn config(&self) -> &StitchConfig {
        &self.config
    }

    pub fn green_ppg_assembler(&self) -> DayAssembler<GreenPpgReader> {
        DayAssembler::new(
            GreenPpgReader::new(self.converter),
            self.config.prefix_for(SeriesKind::GreenPpg),
        )
    }

    pub fn heart_rate_assembler(&self) -> DayAssembler<HeartRateReader> {
        DayAssembler::new(
            HeartRateReader::new(self.converter, self.config.ibi_policy),
            self.config.prefix_for(SeriesKind::HeartRate),
        )
    }

    /// Find and order the files of one day
    pub fn discover(
        &self,
        dir: &Path,
        date: &str,
        kind: SeriesKind,
    ) -> Result<Vec<FileDescriptor>, StitchError> {
        match kind {
            SeriesKind::GreenPpg => self.green_ppg_assembler().discover(dir, date),
            SeriesKind::HeartRate => self.heart_rate_assembler().discover(dir, date),
        }
    }

    /// Audit the gaps between one day's files
    pub fn check_continuity(
        &self,
        dir: &Path,
        date: &str,
        kind: SeriesKind,
    ) -> Result<ContinuityReport, StitchError> {
        let files = self.discover(dir, date, kind)?;
        Ok(self.audit_files(&files, date, kind))
    }

    fn audit_files(&self, files: &[FileDescriptor], date: &str, kind: SeriesKind) -> ContinuityReport {
        let mut report = audit(files, self.thresholds);
        if files.is_empty() {
            report.summary = format!("No {} files found for date {}", kind.label(), date);
        }
        info!("{}", report.summary);
        report
    }

    /// Concatenate one day of green PPG files
    pub fn concatenate_green_ppg(
        &self,
        dir: &Path,
        date: &str,
    ) -> Result<DayAssembly<DaySeries<PpgSample>>, StitchError> {
        self.green_ppg_assembler().concatenate(dir, date)
    }

    /// Concatenate one day of heart-rate files with their reconstructed beats
    pub fn concatenate_heart_rate(
        &self,
        dir: &Path,
        date: &str,
    ) -> Result<DayAssembly<HeartRateTables>, StitchError> {
        self.heart_rate_assembler().concatenate(dir, date)
    }

    /// Read a single heart-rate file and reconstruct its beats
    pub fn read_heart_rate_file(&self, path: &Path) -> Result<HeartRateTables, StitchError> {
        HeartRateReader::new(self.converter, self.config.ibi_policy).read_file(path)
    }

    fn exporter(&self) -> DayExporter {
        DayExporter::new(&self.config.output_dir, &self.config.timezone)
    }

    /// Export an assembled green PPG day
    pub fn export_green_ppg(
        &self,
        assembly: &DayAssembly<DaySeries<PpgSample>>,
    ) -> Result<Vec<ExportArtifacts>, StitchError> {
        let exported = self
            .exporter()
            .export(ExportTable::GreenPpg, &assembly.date, &assembly.tables)?;

        Ok(exported
            .map(|mut artifacts| {
                artifacts.summary = DaySummary::of(&assembly.tables)
                    .with_value_range(assembly.tables.value_range());
                artifacts
            })
            .into_iter()
            .collect())
    }

    /// Export an assembled heart-rate day: samples table and beat table
    pub fn export_heart_rate(
        &self,
        assembly: &DayAssembly<HeartRateTables>,
    ) -> Result<Vec<ExportArtifacts>, StitchError> {
        let exporter = self.exporter();
        let samples =
            exporter.export(ExportTable::HeartRate, &assembly.date, &assembly.tables.samples)?;
        let beats =
            exporter.export(ExportTable::HeartRateIbi, &assembly.date, &assembly.tables.beats)?;
        Ok(samples.into_iter().chain(beats).collect())
    }

    /// Run audit, assembly and export for one day.
    ///
    /// The file list is discovered once and shared by the audit and the
    /// assembly.
    pub fn process_day(
        &self,
        dir: &Path,
        date: &str,
        kind: SeriesKind,
    ) -> Result<DayReport, StitchError> {
        info!("Step 1: checking {} continuity for {}", kind.label(), date);
        let files = self.discover(dir, date, kind)?;
        let continuity = self.audit_files(&files, date, kind);

        info!("Step 2: concatenating {} files", files.len());
        let (assembly, exports) = match kind {
            SeriesKind::GreenPpg => {
                let day = self.green_ppg_assembler().concatenate_files(date, files);
                info!("{}", day.message());
                info!("Step 3: exporting");
                let exports = self.export_green_ppg(&day)?;
                (AssemblySummary::from_assembly(&day, None), exports)
            }
            SeriesKind::HeartRate => {
                let day = self.heart_rate_assembler().concatenate_files(date, files);
                info!("{}", day.message());
                info!("Step 3: exporting");
                let exports = self.export_heart_rate(&day)?;
                (
                    AssemblySummary::from_assembly(&day, Some(day.tables.beats.len())),
                    exports,
                )
            }
        };

        Ok(DayReport {
            date: date.to_string(),
            kind,
            continuity,
            assembly,
            exports,
        })
    }
}
