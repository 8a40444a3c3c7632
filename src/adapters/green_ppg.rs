//! Green PPG export decoder
//!
//! Reads `{"green_ppg_samples": [{"ppg_green_value", "unix_timestamp_in_ms"}]}`.

use crate::error::StitchError;
use crate::timestamp::TimestampConverter;
use crate::types::PpgSample;
use serde::Deserialize;

use super::{lenient_f64, lenient_i64, Boundary, SessionDecoder, TimestampProbe};

/// Green PPG session decoder
#[derive(Debug, Clone, Copy, Default)]
pub struct GreenPpgDecoder;

impl SessionDecoder for GreenPpgDecoder {
    type Sample = PpgSample;

    fn decode(
        &self,
        raw_json: &str,
        converter: &TimestampConverter,
    ) -> Result<Vec<PpgSample>, StitchError> {
        let payload: GreenPpgPayload = serde_json::from_str(raw_json)?;

        Ok(payload
            .green_ppg_samples
            .unwrap_or_default()
            .into_iter()
            .map(|s| PpgSample {
                value: s.ppg_green_value,
                instant: converter.convert(s.unix_timestamp_in_ms),
            })
            .collect())
    }

    fn probe_boundary(&self, raw_json: &str) -> Result<Boundary, StitchError> {
        let probe: GreenPpgProbe = serde_json::from_str(raw_json)?;
        let samples = probe.green_ppg_samples.unwrap_or_default();
        Ok(Boundary::from_timestamps(samples.first(), samples.last()))
    }
}

// Green PPG export structures

#[derive(Debug, Deserialize)]
struct GreenPpgPayload {
    #[serde(default)]
    green_ppg_samples: Option<Vec<GreenPpgRecord>>,
}

#[derive(Debug, Deserialize)]
struct GreenPpgRecord {
    #[serde(default, deserialize_with = "lenient_f64")]
    ppg_green_value: Option<f64>,
    #[serde(default, deserialize_with = "lenient_i64")]
    unix_timestamp_in_ms: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct GreenPpgProbe {
    #[serde(default)]
    green_ppg_samples: Option<Vec<TimestampProbe>>,
}
