//! Day assembly
//!
//! Finds every session file of one calendar day, orders the files by their
//! first on-disk timestamp (not by filename), concatenates their tables and
//! re-sorts the result so rows from overlapping files interleave correctly.
//!
//! Day files are named `<prefix>_<DD.MM.YY>_<suffix>.json`; matching is on
//! the literal date substring.

use crate::error::StitchError;
use crate::session::{SessionReader, SessionTables};
use crate::types::{file_name_of, FileDescriptor, SeriesKind};
use chrono::NaiveDate;
use log::{debug, info, warn};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Check that a date string has the `DD.MM.YY` form and names a real day
pub fn parse_day(date: &str) -> Result<NaiveDate, StitchError> {
    let well_formed = date.len() == 8
        && date
            .bytes()
            .enumerate()
            .all(|(i, b)| if i == 2 || i == 5 { b == b'.' } else { b.is_ascii_digit() });
    if !well_formed {
        return Err(StitchError::InvalidDate(date.to_string()));
    }
    NaiveDate::parse_from_str(date, "%d.%m.%y")
        .map_err(|_| StitchError::InvalidDate(date.to_string()))
}

/// Whether a file name is `<prefix>_<date>_<anything>.json`
pub fn matches_day_file(file_name: &str, prefix: &str, date: &str) -> bool {
    file_name
        .strip_prefix(prefix)
        .and_then(|rest| rest.strip_prefix('_'))
        .and_then(|rest| rest.strip_prefix(date))
        .and_then(|rest| rest.strip_prefix('_'))
        .map(|rest| rest.ends_with(".json"))
        .unwrap_or(false)
}

/// List the files of one day in a directory, in lexical order
pub fn list_day_files(dir: &Path, prefix: &str, date: &str) -> Result<Vec<PathBuf>, StitchError> {
    parse_day(date)?;

    let unavailable = |e: std::io::Error| StitchError::DirectoryUnavailable {
        path: dir.display().to_string(),
        reason: e.to_string(),
    };

    let mut files = Vec::new();
    for entry in fs::read_dir(dir).map_err(unavailable)? {
        let entry = entry.map_err(unavailable)?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        if !matches_day_file(name, prefix, date) {
            continue;
        }
        // Follows symlinks, so a linked session file is listed like a plain one
        let path = entry.path();
        if path.is_file() {
            files.push(path);
        }
    }

    files.sort();
    Ok(files)
}

/// Outcome of assembling one day
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AssemblyStatus {
    /// At least one row was assembled
    Assembled,
    /// No file matched the day
    NoFiles,
    /// Files matched but none contributed rows
    NoData,
}

/// A file that could not be decoded and was left out of the day
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileFailure {
    pub file: String,
    pub reason: String,
}

/// Tables of one day together with assembly counts
#[derive(Debug, Clone)]
pub struct DayAssembly<T> {
    pub date: String,
    pub kind: SeriesKind,
    pub status: AssemblyStatus,
    /// Files in discovery order
    pub files: Vec<FileDescriptor>,
    /// Files decoded without error
    pub files_read: usize,
    pub total_rows: usize,
    pub failures: Vec<FileFailure>,
    pub tables: T,
}

impl<T> DayAssembly<T> {
    pub fn files_found(&self) -> usize {
        self.files.len()
    }

    /// One-line description of the outcome
    pub fn message(&self) -> String {
        match self.status {
            AssemblyStatus::NoFiles => format!(
                "No {} files found for date {}",
                self.kind.label(),
                self.date
            ),
            AssemblyStatus::NoData => format!(
                "No valid data found in any of {} {} files",
                self.files_found(),
                self.kind.label()
            ),
            AssemblyStatus::Assembled => format!(
                "Concatenated {} total samples from {} of {} files",
                self.total_rows,
                self.files_read,
                self.files_found()
            ),
        }
    }
}

/// Discovers and concatenates the session files of a day
#[derive(Debug, Clone)]
pub struct DayAssembler<R> {
    reader: R,
    prefix: String,
}

impl<R: SessionReader> DayAssembler<R> {
    pub fn new(reader: R, prefix: impl Into<String>) -> Self {
        Self {
            reader,
            prefix: prefix.into(),
        }
    }

    /// Find a day's files and order them by first sample timestamp.
    ///
    /// Files whose boundary cannot be read sort with a sentinel key instead
    /// of failing discovery. Only an inaccessible directory is an error.
    pub fn discover(&self, dir: &Path, date: &str) -> Result<Vec<FileDescriptor>, StitchError> {
        let paths = list_day_files(dir, &self.prefix, date)?;
        let mut files: Vec<FileDescriptor> = paths.iter().map(|p| self.describe(p)).collect();
        files.sort_by_key(|f| f.sort_key_ms());

        info!(
            "Found {} {} files for date {}",
            files.len(),
            self.reader.kind().label(),
            date
        );
        Ok(files)
    }

    /// Read the boundary timestamps of one file
    pub fn describe(&self, path: &Path) -> FileDescriptor {
        let converter = self.reader.converter();
        let boundary = fs::read_to_string(path)
            .map_err(StitchError::from)
            .and_then(|raw| self.reader.probe_boundary(&raw));

        match boundary {
            Ok(boundary) => {
                debug!(
                    "{}: first={:?} last={:?}",
                    file_name_of(path),
                    boundary.first_ms,
                    boundary.last_ms
                );
                FileDescriptor::new(
                    path,
                    converter.convert(boundary.first_ms),
                    converter.convert(boundary.last_ms),
                )
            }
            Err(e) => {
                warn!("Error reading file {}: {}", file_name_of(path), e);
                FileDescriptor::new(path, None, None)
            }
        }
    }

    /// Discover a day's files and concatenate them into one sorted table set
    pub fn concatenate(&self, dir: &Path, date: &str) -> Result<DayAssembly<R::Tables>, StitchError> {
        let files = self.discover(dir, date)?;
        Ok(self.concatenate_files(date, files))
    }

    /// Concatenate already-discovered files in the given order, then sort.
    ///
    /// A file that fails to decode contributes no rows and is recorded in
    /// `failures`; the remaining files are still assembled.
    pub fn concatenate_files(&self, date: &str, files: Vec<FileDescriptor>) -> DayAssembly<R::Tables> {
        let kind = self.reader.kind();
        let mut tables = R::Tables::default();
        let mut failures = Vec::new();
        let mut files_read = 0;
        let mut total_rows = 0;

        if files.is_empty() {
            warn!("No {} files found for date {}", kind.label(), date);
        } else {
            info!(
                "Concatenating {} {} files for date {}...",
                files.len(),
                kind.label(),
                date
            );
        }

        for (i, file) in files.iter().enumerate() {
            let name = file.file_name();
            info!("Reading file {}/{}: {}", i + 1, files.len(), name);

            match self.reader.read_file(&file.path) {
                Ok(file_tables) => {
                    files_read += 1;
                    let rows = file_tables.row_count();
                    if rows == 0 {
                        warn!("No data found in {}", name);
                    } else {
                        total_rows += rows;
                        info!("  Added {} samples (total: {})", rows, total_rows);
                    }
                    tables.absorb(file_tables);
                }
                Err(e) => {
                    warn!("Skipping {}: {}", name, e);
                    failures.push(FileFailure {
                        file: name,
                        reason: e.to_string(),
                    });
                }
            }
        }

        // Discovery order does not rule out interleaving between overlapping files
        tables.sort_chronologically();

        let status = if files.is_empty() {
            AssemblyStatus::NoFiles
        } else if total_rows == 0 {
            AssemblyStatus::NoData
        } else {
            AssemblyStatus::Assembled
        };

        DayAssembly {
            date: date.to_string(),
            kind,
            status,
            files,
            files_read,
            total_rows,
            failures,
            tables,
        }
    }
}
