//! Stitch CLI - Command-line interface for Pulse Stitch
//!
//! Commands:
//! - audit: Check continuity between a day's session files
//! - concat: Concatenate a day's session files and export them
//! - process: Audit, concatenate and export in one run
//! - beats: Reconstruct beat timestamps from one heart-rate file

use clap::{Parser, Subcommand, ValueEnum};
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use pulse_stitch::continuity::{ContinuityReport, GapSeverity};
use pulse_stitch::export::{write_csv, write_csv_to, ExportArtifacts};
use pulse_stitch::pipeline::{AssemblySummary, DayProcessor, DayReport};
use pulse_stitch::types::SeriesKind;
use pulse_stitch::{IbiPolicy, StitchConfig, StitchError, STITCH_VERSION};

/// Stitch - day-level assembly of wearable PPG and heart-rate exports
#[derive(Parser)]
#[command(name = "stitch")]
#[command(author = "Synheart AI Inc")]
#[command(version = STITCH_VERSION)]
#[command(about = "Assemble and audit a day of wearable session exports", long_about = None)]
struct Cli {
    /// Configuration file (TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Display timezone (IANA format, e.g. "US/Pacific")
    #[arg(long, global = true)]
    timezone: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check continuity between a day's session files
    Audit {
        /// Directory containing the session files
        #[arg(short, long)]
        dir: PathBuf,

        /// Day to audit (DD.MM.YY)
        #[arg(long)]
        date: String,

        /// Session kind
        #[arg(long, default_value = "green-ppg")]
        kind: KindArg,

        /// Gaps above this are reported as warnings (ms)
        #[arg(long)]
        warn_gap_ms: Option<i64>,

        /// Gaps above this are reported as errors (ms)
        #[arg(long)]
        error_gap_ms: Option<i64>,

        /// Exit with failure when an error-level gap is found
        #[arg(long)]
        strict: bool,

        /// Output report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Concatenate a day's session files and export them
    Concat {
        #[arg(short, long)]
        dir: PathBuf,

        #[arg(long)]
        date: String,

        #[arg(long, default_value = "green-ppg")]
        kind: KindArg,

        /// Export directory
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Beat timestamp policy (heart rate only)
        #[arg(long)]
        ibi_policy: Option<PolicyArg>,

        #[arg(long)]
        json: bool,
    },

    /// Audit, concatenate and export in one run
    Process {
        #[arg(short, long)]
        dir: PathBuf,

        #[arg(long)]
        date: String,

        #[arg(long, default_value = "green-ppg")]
        kind: KindArg,

        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        #[arg(long)]
        ibi_policy: Option<PolicyArg>,

        #[arg(long)]
        warn_gap_ms: Option<i64>,

        #[arg(long)]
        error_gap_ms: Option<i64>,

        #[arg(long)]
        json: bool,
    },

    /// Reconstruct beat timestamps from one heart-rate file
    Beats {
        /// Heart-rate session file
        #[arg(short, long)]
        input: PathBuf,

        /// Output CSV path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,

        #[arg(long)]
        ibi_policy: Option<PolicyArg>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum KindArg {
    /// Green PPG sessions
    GreenPpg,
    /// Heart-rate sessions with beat intervals
    HeartRate,
}

impl From<KindArg> for SeriesKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::GreenPpg => SeriesKind::GreenPpg,
            KindArg::HeartRate => SeriesKind::HeartRate,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum PolicyArg {
    /// First beat on the sample timestamp, later beats accumulate forward
    Forward,
    /// Last beat anchored to the next sample's timestamp
    Backward,
    /// Midpoint of forward and backward
    Average,
}

impl From<PolicyArg> for IbiPolicy {
    fn from(policy: PolicyArg) -> Self {
        match policy {
            PolicyArg::Forward => IbiPolicy::Forward,
            PolicyArg::Backward => IbiPolicy::Backward,
            PolicyArg::Average => IbiPolicy::Average,
        }
    }
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e))
                    .unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), StitchCliError> {
    let mut config = match cli.config.as_deref() {
        Some(path) => StitchConfig::load(path)?,
        None => StitchConfig::default(),
    };
    if let Some(timezone) = cli.timezone {
        config.timezone = timezone;
    }

    match cli.command {
        Commands::Audit {
            dir,
            date,
            kind,
            warn_gap_ms,
            error_gap_ms,
            strict,
            json,
        } => {
            apply_thresholds(&mut config, warn_gap_ms, error_gap_ms);
            cmd_audit(config, &dir, &date, kind.into(), strict, json)
        }

        Commands::Concat {
            dir,
            date,
            kind,
            output_dir,
            ibi_policy,
            json,
        } => {
            apply_output(&mut config, output_dir, ibi_policy);
            cmd_concat(config, &dir, &date, kind.into(), json)
        }

        Commands::Process {
            dir,
            date,
            kind,
            output_dir,
            ibi_policy,
            warn_gap_ms,
            error_gap_ms,
            json,
        } => {
            apply_output(&mut config, output_dir, ibi_policy);
            apply_thresholds(&mut config, warn_gap_ms, error_gap_ms);
            cmd_process(config, &dir, &date, kind.into(), json)
        }

        Commands::Beats {
            input,
            output,
            ibi_policy,
        } => {
            if let Some(policy) = ibi_policy {
                config.ibi_policy = policy.into();
            }
            cmd_beats(config, &input, &output)
        }
    }
}

fn apply_thresholds(config: &mut StitchConfig, warn_gap_ms: Option<i64>, error_gap_ms: Option<i64>) {
    if let Some(warn) = warn_gap_ms {
        config.warn_gap_ms = warn;
    }
    if let Some(error) = error_gap_ms {
        config.error_gap_ms = error;
    }
}

fn apply_output(config: &mut StitchConfig, output_dir: Option<PathBuf>, ibi_policy: Option<PolicyArg>) {
    if let Some(dir) = output_dir {
        config.output_dir = dir.display().to_string();
    }
    if let Some(policy) = ibi_policy {
        config.ibi_policy = policy.into();
    }
}

fn cmd_audit(
    config: StitchConfig,
    dir: &Path,
    date: &str,
    kind: SeriesKind,
    strict: bool,
    json: bool,
) -> Result<(), StitchCliError> {
    let processor = DayProcessor::new(config)?;
    let report = processor.check_continuity(dir, date, kind)?;

    if wants_json(json) {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_continuity(date, &report);
    }

    let errors = report.error_count();
    if strict && errors > 0 {
        Err(StitchCliError::GapsFound(errors))
    } else {
        Ok(())
    }
}

fn cmd_concat(
    config: StitchConfig,
    dir: &Path,
    date: &str,
    kind: SeriesKind,
    json: bool,
) -> Result<(), StitchCliError> {
    let processor = DayProcessor::new(config)?;

    let (summary, exports) = match kind {
        SeriesKind::GreenPpg => {
            let day = processor.concatenate_green_ppg(dir, date)?;
            let exports = processor.export_green_ppg(&day)?;
            (AssemblySummary::from_assembly(&day, None), exports)
        }
        SeriesKind::HeartRate => {
            let day = processor.concatenate_heart_rate(dir, date)?;
            let exports = processor.export_heart_rate(&day)?;
            (
                AssemblySummary::from_assembly(&day, Some(day.tables.beats.len())),
                exports,
            )
        }
    };

    if wants_json(json) {
        let output = serde_json::json!({ "assembly": summary, "exports": exports });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        print_assembly(&summary);
        print_exports(&exports);
    }

    if summary.total_rows == 0 {
        return Err(StitchCliError::NoData(summary.message));
    }
    Ok(())
}

fn cmd_process(
    config: StitchConfig,
    dir: &Path,
    date: &str,
    kind: SeriesKind,
    json: bool,
) -> Result<(), StitchCliError> {
    let processor = DayProcessor::new(config)?;
    let report = processor.process_day(dir, date, kind)?;

    if wants_json(json) {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    if report.assembly.total_rows == 0 {
        return Err(StitchCliError::NoData(report.assembly.message));
    }
    Ok(())
}

fn cmd_beats(config: StitchConfig, input: &Path, output: &Path) -> Result<(), StitchCliError> {
    let processor = DayProcessor::new(config)?;
    let tables = processor.read_heart_rate_file(input)?;

    if output.to_string_lossy() == "-" {
        let stdout = io::stdout();
        write_csv_to(stdout.lock(), tables.beats.records())?;
    } else {
        write_csv(output, tables.beats.records())?;
    }

    log::info!(
        "Reconstructed {} beats from {} samples ({} policy)",
        tables.beats.len(),
        tables.samples.len(),
        processor.config().ibi_policy
    );
    Ok(())
}

// Helper functions

fn wants_json(flag: bool) -> bool {
    flag || !atty::is(atty::Stream::Stdout)
}

fn print_continuity(date: &str, report: &ContinuityReport) {
    println!("Continuity Report");
    println!("=================");
    println!("Date:        {}", date);
    println!("Files:       {}", report.total_files);
    println!(
        "Transitions: {} ({} evaluable)",
        report.transitions_checked, report.evaluable_transitions
    );
    println!(
        "Thresholds:  warning > {}ms, error > {}ms",
        report.warn_gap_ms, report.error_gap_ms
    );

    if !report.gaps.is_empty() {
        println!("\nGaps:");
        for gap in &report.gaps {
            let icon = match gap.severity {
                GapSeverity::Error => "[ERR] ",
                GapSeverity::Warning => "[WARN]",
            };
            println!(
                "  {} {} -> {}: {} ms ({:.3} seconds)",
                icon, gap.from_file, gap.to_file, gap.gap_ms, gap.gap_seconds
            );
        }
    }

    if !report.unevaluable.is_empty() {
        println!("\nNot evaluated:");
        for issue in &report.unevaluable {
            println!("  - {} -> {}: {}", issue.from_file, issue.to_file, issue.reason);
        }
    }

    println!("\n{}", report.summary);
}

fn print_assembly(summary: &AssemblySummary) {
    println!("Assembly");
    println!("========");
    println!("Files found: {}", summary.files_found);
    println!("Files read:  {}", summary.files_read);
    println!("Rows:        {}", summary.total_rows);
    if let Some(beats) = summary.beat_rows {
        println!("Beats:       {}", beats);
    }
    for failure in &summary.failures {
        println!("  [SKIP] {}: {}", failure.file, failure.reason);
    }
    println!("\n{}", summary.message);
}

fn print_exports(exports: &[ExportArtifacts]) {
    if exports.is_empty() {
        println!("\nNo data to export");
        return;
    }

    println!("\nExports:");
    for artifacts in exports {
        let summary = &artifacts.summary;
        println!("  {}", artifacts.table.as_str());
        println!("    CSV:      {} ({} bytes)", artifacts.csv_path.display(), artifacts.csv_bytes);
        println!(
            "    Snapshot: {} ({} bytes)",
            artifacts.snapshot_path.display(),
            artifacts.snapshot_bytes
        );
        println!("    Rows:     {}", summary.rows);
        if let (Some(first), Some(last)) = (summary.first_instant, summary.last_instant) {
            println!("    Range:    {} to {}", first, last);
        }
        if let Some(seconds) = summary.duration_seconds {
            println!("    Duration: {:.3} seconds", seconds);
        }
        if let Some((min, max)) = summary.value_range {
            println!("    Values:   {} to {}", min, max);
        }
    }
}

fn print_report(report: &DayReport) {
    print_continuity(&report.date, &report.continuity);
    println!();
    print_assembly(&report.assembly);
    print_exports(&report.exports);
}

// Error types

#[derive(Debug)]
enum StitchCliError {
    Stitch(StitchError),
    Json(serde_json::Error),
    GapsFound(usize),
    NoData(String),
}

impl From<StitchError> for StitchCliError {
    fn from(e: StitchError) -> Self {
        StitchCliError::Stitch(e)
    }
}

impl From<serde_json::Error> for StitchCliError {
    fn from(e: serde_json::Error) -> Self {
        StitchCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<StitchCliError> for CliError {
    fn from(e: StitchCliError) -> Self {
        match e {
            StitchCliError::Stitch(e) => {
                let (code, hint) = match &e {
                    StitchError::DirectoryUnavailable { .. } => (
                        "DIRECTORY_UNAVAILABLE",
                        "Check that --dir points to an existing, readable directory",
                    ),
                    StitchError::InvalidDate(_) => {
                        ("INVALID_DATE", "Pass --date as DD.MM.YY, e.g. 06.08.25")
                    }
                    StitchError::InvalidTimezone(_) => (
                        "INVALID_TIMEZONE",
                        "Use an IANA timezone name such as US/Pacific or Europe/Berlin",
                    ),
                    StitchError::InvalidThresholds { .. } => (
                        "INVALID_THRESHOLDS",
                        "The error gap threshold must be at least the warning threshold",
                    ),
                    StitchError::Config(_) => ("CONFIG_ERROR", "Check the configuration file"),
                    StitchError::Decode { .. } | StitchError::JsonError(_) => {
                        ("DECODE_ERROR", "Check that the input is a valid session export")
                    }
                    _ => ("EXPORT_ERROR", "Check the output directory and free space"),
                };
                CliError {
                    code: code.to_string(),
                    message: e.to_string(),
                    hint: Some(hint.to_string()),
                }
            }
            StitchCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: None,
            },
            StitchCliError::GapsFound(count) => CliError {
                code: "GAPS_FOUND".to_string(),
                message: format!("{} gaps exceed the error threshold", count),
                hint: Some("Review the continuity report for details".to_string()),
            },
            StitchCliError::NoData(message) => CliError {
                code: "NO_DATA".to_string(),
                message,
                hint: Some("Check --dir, --date and --kind".to_string()),
            },
        }
    }
}
