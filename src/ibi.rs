//! Inter-beat interval timestamp reconstruction
//!
//! A heart-rate sample carries one timestamp and a list of beat interval
//! durations. This module places each beat in time under one of three
//! policies:
//!
//! - **forward**: the first beat sits on the sample timestamp, later beats
//!   accumulate the preceding durations
//! - **backward**: the last beat sits one duration before the next sample's
//!   timestamp, earlier beats walk back from there
//! - **average**: the midpoint of the forward and backward placements
//!
//! Backward and average fall back to forward when there is no next sample.

use crate::timestamp::{Timestamp, TimestampConverter};
use crate::types::BeatEvent;
use chrono::TimeDelta;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Beat placement policy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IbiPolicy {
    #[default]
    Forward,
    Backward,
    Average,
}

impl IbiPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            IbiPolicy::Forward => "forward",
            IbiPolicy::Backward => "backward",
            IbiPolicy::Average => "average",
        }
    }
}

impl fmt::Display for IbiPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IbiPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "forward" => Ok(IbiPolicy::Forward),
            "backward" => Ok(IbiPolicy::Backward),
            "average" => Ok(IbiPolicy::Average),
            other => Err(format!(
                "unknown IBI policy '{}' (expected forward, backward or average)",
                other
            )),
        }
    }
}

/// Beat instants accumulated forward from the sample's own timestamp.
///
/// Returns `None` when a shifted instant falls outside the representable
/// range.
pub fn forward_instants(anchor: Timestamp, durations: &[i64]) -> Option<Vec<Timestamp>> {
    let Some((_, leading)) = durations.split_last() else {
        return Some(Vec::new());
    };

    let mut instants = Vec::with_capacity(durations.len());
    let mut current = anchor;
    instants.push(current);
    for &duration in leading {
        current = current.checked_add_signed(TimeDelta::try_milliseconds(duration)?)?;
        instants.push(current);
    }
    Some(instants)
}

/// Beat instants walked back from the next sample's timestamp, returned in
/// beat order. Returns `None` on out-of-range instants.
pub fn backward_instants(next: Timestamp, durations: &[i64]) -> Option<Vec<Timestamp>> {
    let mut reversed = Vec::with_capacity(durations.len());
    let mut current = next;
    for &duration in durations.iter().rev() {
        current = current.checked_sub_signed(TimeDelta::try_milliseconds(duration)?)?;
        reversed.push(current);
    }
    reversed.reverse();
    Some(reversed)
}

/// Places the beats of one sample in time
#[derive(Debug, Clone, Copy, Default)]
pub struct IbiReconstructor {
    policy: IbiPolicy,
    converter: TimestampConverter,
}

impl IbiReconstructor {
    pub fn new(policy: IbiPolicy, converter: TimestampConverter) -> Self {
        Self { policy, converter }
    }

    /// Produce one event per duration, in beat order.
    ///
    /// Returns no events when `durations` is empty, its length differs from
    /// `statuses`, any duration is not positive, or a beat would land outside
    /// the representable time range.
    pub fn reconstruct(
        &self,
        anchor: Timestamp,
        next: Option<Timestamp>,
        durations: &[i64],
        statuses: &[i64],
    ) -> Vec<BeatEvent> {
        if durations.is_empty()
            || durations.len() != statuses.len()
            || durations.iter().any(|&d| d <= 0)
        {
            return Vec::new();
        }

        let Some(instants) = self.place(anchor, next, durations) else {
            return Vec::new();
        };

        instants
            .into_iter()
            .zip(durations.iter().zip(statuses))
            .map(|(instant, (&ibi_ms, &status))| BeatEvent {
                instant: self.converter.normalize(instant),
                ibi_ms,
                status,
            })
            .collect()
    }

    fn place(
        &self,
        anchor: Timestamp,
        next: Option<Timestamp>,
        durations: &[i64],
    ) -> Option<Vec<Timestamp>> {
        match (self.policy, next) {
            (IbiPolicy::Forward, _) | (IbiPolicy::Backward, None) => {
                forward_instants(anchor, durations)
            }
            (IbiPolicy::Backward, Some(next)) => backward_instants(next, durations),
            (IbiPolicy::Average, next) => {
                let forward = forward_instants(anchor, durations)?;
                match next {
                    Some(next) => {
                        let backward = backward_instants(next, durations)?;
                        Some(
                            forward
                                .iter()
                                .zip(&backward)
                                .map(|(&fwd, &bwd)| fwd + (bwd - fwd) / 2)
                                .collect(),
                        )
                    }
                    // Backward degenerates to forward, so the midpoint does too
                    None => Some(forward),
                }
            }
        }
    }
}
