//! Continuity auditing
//!
//! Walks a chronologically ordered file list and flags the time between the
//! last sample of one file and the first sample of the next when it exceeds
//! the configured thresholds. Only boundary timestamps are consulted.
//!
//! Gaps are computed on absolute epoch milliseconds, so a DST transition
//! inside the day does not change their size.

use crate::config::GapThresholds;
use crate::timestamp::Timestamp;
use crate::types::FileDescriptor;
use log::warn;
use serde::Serialize;

/// Reason recorded when a transition cannot be evaluated
pub const UNREADABLE_BOUNDARY: &str = "Could not read timestamps from one or both files";

/// Severity of a flagged gap
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GapSeverity {
    Warning,
    Error,
}

/// A gap between two consecutive files that exceeds the warning threshold
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContinuityGap {
    pub from_file: String,
    pub to_file: String,
    /// Last sample of `from_file`
    pub from_instant: Timestamp,
    /// First sample of `to_file`
    pub to_instant: Timestamp,
    pub gap_ms: i64,
    pub gap_seconds: f64,
    pub severity: GapSeverity,
}

/// A transition whose gap could not be computed
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnevaluableTransition {
    pub from_file: String,
    pub to_file: String,
    pub reason: String,
}

/// Result of auditing one ordered file list
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContinuityReport {
    pub total_files: usize,
    /// Adjacent pairs examined (`total_files - 1`)
    pub transitions_checked: usize,
    /// Pairs whose gap could be computed
    pub evaluable_transitions: usize,
    pub warn_gap_ms: i64,
    pub error_gap_ms: i64,
    pub gaps: Vec<ContinuityGap>,
    pub unevaluable: Vec<UnevaluableTransition>,
    pub summary: String,
}

impl ContinuityReport {
    pub fn warning_count(&self) -> usize {
        self.count(GapSeverity::Warning)
    }

    pub fn error_count(&self) -> usize {
        self.count(GapSeverity::Error)
    }

    /// No flagged gaps and nothing left unevaluated
    pub fn is_continuous(&self) -> bool {
        self.gaps.is_empty() && self.unevaluable.is_empty()
    }

    fn count(&self, severity: GapSeverity) -> usize {
        self.gaps.iter().filter(|g| g.severity == severity).count()
    }
}

/// Audit the transitions of an ordered file list
pub fn audit(files: &[FileDescriptor], thresholds: GapThresholds) -> ContinuityReport {
    let mut gaps = Vec::new();
    let mut unevaluable = Vec::new();
    let mut evaluable_transitions = 0;

    for (i, pair) in files.windows(2).enumerate() {
        let (current, next) = (&pair[0], &pair[1]);

        let (Some(from_instant), Some(to_instant)) = (current.last_instant, next.first_instant)
        else {
            unevaluable.push(UnevaluableTransition {
                from_file: current.file_name(),
                to_file: next.file_name(),
                reason: UNREADABLE_BOUNDARY.to_string(),
            });
            continue;
        };

        evaluable_transitions += 1;
        let gap_ms = to_instant.timestamp_millis() - from_instant.timestamp_millis();

        // Overlaps (negative gaps) and gaps at the threshold are not flagged
        if gap_ms <= thresholds.warn_gap_ms {
            continue;
        }

        let severity = if gap_ms > thresholds.error_gap_ms {
            GapSeverity::Error
        } else {
            GapSeverity::Warning
        };
        let gap_seconds = gap_ms as f64 / 1000.0;

        warn!(
            "File {}/{}: {} -> {}: gap {} ms ({:.3} seconds) exceeds {}ms {} threshold",
            i + 1,
            files.len() - 1,
            current.file_name(),
            next.file_name(),
            gap_ms,
            gap_seconds,
            match severity {
                GapSeverity::Error => thresholds.error_gap_ms,
                GapSeverity::Warning => thresholds.warn_gap_ms,
            },
            match severity {
                GapSeverity::Error => "error",
                GapSeverity::Warning => "warning",
            }
        );

        gaps.push(ContinuityGap {
            from_file: current.file_name(),
            to_file: next.file_name(),
            from_instant,
            to_instant,
            gap_ms,
            gap_seconds,
            severity,
        });
    }

    let transitions_checked = files.len().saturating_sub(1);
    let summary = if files.is_empty() {
        "No files to audit".to_string()
    } else if unevaluable.is_empty() {
        format!(
            "Found {} gaps exceeding {}ms threshold out of {} file transitions",
            gaps.len(),
            thresholds.warn_gap_ms,
            transitions_checked
        )
    } else {
        format!(
            "Found {} gaps exceeding {}ms threshold out of {} file transitions ({} could not be evaluated)",
            gaps.len(),
            thresholds.warn_gap_ms,
            transitions_checked,
            unevaluable.len()
        )
    };

    ContinuityReport {
        total_files: files.len(),
        transitions_checked,
        evaluable_transitions,
        warn_gap_ms: thresholds.warn_gap_ms,
        error_gap_ms: thresholds.error_gap_ms,
        gaps,
        unevaluable,
        summary,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timestamp::TimestampConverter;
    use pretty_assertions::assert_eq;

    fn file(name: &str, first: Option<i64>, last: Option<i64>) -> FileDescriptor {
        let converter = TimestampConverter::default();
        FileDescriptor::new(name, converter.convert(first), converter.convert(last))
    }

    fn scenario_c() -> Vec<FileDescriptor> {
        vec![
            file("f1.json", Some(0), Some(100)),
            file("f2.json", Some(140), Some(240)),
            file("f3.json", Some(400), Some(500)),
        ]
    }

    #[test]
    fn test_gap_at_threshold_not_flagged() {
        let report = audit(&scenario_c(), GapThresholds::new(40, 80).unwrap());

        assert_eq!(report.total_files, 3);
        assert_eq!(report.transitions_checked, 2);
        assert_eq!(report.evaluable_transitions, 2);
        assert_eq!(report.gaps.len(), 1);

        let gap = &report.gaps[0];
        assert_eq!(gap.from_file, "f2.json");
        assert_eq!(gap.to_file, "f3.json");
        assert_eq!(gap.gap_ms, 160);
        assert_eq!(gap.from_instant.timestamp_millis(), 240);
        assert_eq!(gap.to_instant.timestamp_millis(), 400);
        assert_eq!(gap.severity, GapSeverity::Error);
        assert_eq!(
            report.summary,
            "Found 1 gaps exceeding 40ms threshold out of 2 file transitions"
        );
    }

    #[test]
    fn test_severity_depends_on_error_threshold() {
        let report = audit(&scenario_c(), GapThresholds::new(40, 200).unwrap());
        assert_eq!(report.gaps.len(), 1);
        assert_eq!(report.gaps[0].severity, GapSeverity::Warning);
        assert_eq!(report.warning_count(), 1);
        assert_eq!(report.error_count(), 0);
    }

    #[test]
    fn test_gap_equal_to_error_threshold_is_warning() {
        let files = vec![file("a", Some(0), Some(100)), file("b", Some(180), Some(200))];
        let report = audit(&files, GapThresholds::new(40, 80).unwrap());
        assert_eq!(report.gaps[0].gap_ms, 80);
        assert_eq!(report.gaps[0].severity, GapSeverity::Warning);
    }

    #[test]
    fn test_overlap_not_flagged() {
        let files = vec![file("a", Some(0), Some(1000)), file("b", Some(500), Some(2000))];
        let report = audit(&files, GapThresholds::default());
        assert!(report.gaps.is_empty());
        assert_eq!(report.evaluable_transitions, 1);
        assert!(report.is_continuous());
    }

    #[test]
    fn test_unreadable_pair_does_not_block_later_pairs() {
        let files = vec![
            file("a", Some(0), Some(100)),
            file("b", None, None),
            file("c", Some(5000), Some(6000)),
            file("d", Some(9000), Some(9500)),
        ];
        let report = audit(&files, GapThresholds::default());

        assert_eq!(report.transitions_checked, 3);
        assert_eq!(report.evaluable_transitions, 1);
        assert_eq!(report.unevaluable.len(), 2);
        assert_eq!(report.unevaluable[0].from_file, "a");
        assert_eq!(report.unevaluable[0].to_file, "b");
        assert_eq!(report.unevaluable[1].reason, UNREADABLE_BOUNDARY);
        assert_eq!(report.gaps.len(), 1);
        assert_eq!(report.gaps[0].gap_ms, 3000);
        assert!(report.summary.ends_with("(2 could not be evaluated)"));
    }

    #[test]
    fn test_empty_and_single_file() {
        let empty = audit(&[], GapThresholds::default());
        assert_eq!(empty.transitions_checked, 0);
        assert_eq!(empty.summary, "No files to audit");

        let single = audit(&[file("a", Some(0), Some(10))], GapThresholds::default());
        assert_eq!(single.transitions_checked, 0);
        assert!(single.gaps.is_empty());
    }

    #[test]
    fn test_gap_across_dst_fall_back() {
        // 01:59:30 PDT and 01:00:30 PST on 2025-11-02 are 60 s apart
        // although their wall-clock readings go backwards
        let files = vec![
            file("a", Some(1_762_073_000_000), Some(1_762_073_970_000)),
            file("b", Some(1_762_074_030_000), Some(1_762_075_000_000)),
        ];
        let report = audit(&files, GapThresholds::new(40, 80).unwrap());

        let gap = &report.gaps[0];
        assert_eq!(gap.gap_ms, 60_000);
        assert_eq!(gap.from_instant.format("%H:%M:%S").to_string(), "01:59:30");
        assert_eq!(gap.to_instant.format("%H:%M:%S").to_string(), "01:00:30");
    }
}
