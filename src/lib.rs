//! Pulse Stitch - day-level assembly of wearable PPG and heart-rate exports
//!
//! Pulse Stitch turns per-session JSON exports into one chronologically
//! ordered, gap-audited series per measurement day: session decoding →
//! beat timestamp reconstruction → day assembly → continuity audit → export.
//!
//! ## Modules
//!
//! - **IBI reconstruction**: place each reported heartbeat in time
//!   (forward, backward or average policy)
//! - **Day assembly**: order a day's files by their first timestamp,
//!   concatenate and re-sort
//! - **Continuity audit**: flag gaps between consecutive files

pub mod adapters;
pub mod assembler;
pub mod config;
pub mod continuity;
pub mod error;
pub mod export;
pub mod ibi;
pub mod pipeline;
pub mod session;
pub mod timestamp;
pub mod types;

pub use assembler::{DayAssembler, DayAssembly};
pub use config::{GapThresholds, StitchConfig};
pub use continuity::{audit, ContinuityReport, GapSeverity};
pub use error::StitchError;
pub use ibi::{IbiPolicy, IbiReconstructor};
pub use pipeline::{DayProcessor, DayReport};
pub use timestamp::{Timestamp, TimestampConverter};

/// Version embedded in export snapshots
pub const STITCH_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for export snapshots
pub const PRODUCER_NAME: &str = "pulse-stitch";
