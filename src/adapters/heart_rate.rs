//! Heart-rate export decoder
//!
//! Reads `{"samples": [{hr, hrInterBeatInterval, status, unix_timestamp_in_ms,
//! effective_time_frame, ibi_list, ibi_status_list}]}`.

use crate::error::StitchError;
use crate::timestamp::TimestampConverter;
use crate::types::HeartRateSample;
use serde::Deserialize;
use serde_json::Value;

use super::{
    coerce_i64_list, lenient_f64, lenient_i64, opaque_string, Boundary, SessionDecoder,
    TimestampProbe,
};

/// Heart-rate session decoder
#[derive(Debug, Clone, Copy, Default)]
pub struct HeartRateDecoder;

impl SessionDecoder for HeartRateDecoder {
    type Sample = HeartRateSample;

    fn decode(
        &self,
        raw_json: &str,
        converter: &TimestampConverter,
    ) -> Result<Vec<HeartRateSample>, StitchError> {
        let payload: HeartRatePayload = serde_json::from_str(raw_json)?;

        Ok(payload
            .samples
            .unwrap_or_default()
            .into_iter()
            .map(|record| convert_record(record, converter))
            .collect())
    }

    fn probe_boundary(&self, raw_json: &str) -> Result<Boundary, StitchError> {
        let probe: HeartRateProbe = serde_json::from_str(raw_json)?;
        let samples = probe.samples.unwrap_or_default();
        Ok(Boundary::from_timestamps(samples.first(), samples.last()))
    }
}

fn convert_record(record: HeartRateRecord, converter: &TimestampConverter) -> HeartRateSample {
    // A list with any non-integer entry counts as no beats for this sample
    let ibi_durations = record
        .ibi_list
        .as_deref()
        .and_then(coerce_i64_list)
        .unwrap_or_default();
    let ibi_statuses = record
        .ibi_status_list
        .as_deref()
        .and_then(coerce_i64_list)
        .unwrap_or_default();

    HeartRateSample {
        hr: record.hr,
        hr_ibi_summary: record.hr_inter_beat_interval,
        status: record.status,
        instant: converter.convert(record.unix_timestamp_in_ms),
        effective_time_frame: record.effective_time_frame.and_then(opaque_string),
        ibi_durations,
        ibi_statuses,
    }
}

// Heart-rate export structures

#[derive(Debug, Deserialize)]
struct HeartRatePayload {
    #[serde(default)]
    samples: Option<Vec<HeartRateRecord>>,
}

#[derive(Debug, Deserialize)]
struct HeartRateRecord {
    #[serde(default, deserialize_with = "lenient_f64")]
    hr: Option<f64>,
    #[serde(default, rename = "hrInterBeatInterval", deserialize_with = "lenient_f64")]
    hr_inter_beat_interval: Option<f64>,
    #[serde(default, deserialize_with = "lenient_i64")]
    status: Option<i64>,
    #[serde(default, deserialize_with = "lenient_i64")]
    unix_timestamp_in_ms: Option<i64>,
    #[serde(default)]
    effective_time_frame: Option<Value>,
    #[serde(default)]
    ibi_list: Option<Vec<Value>>,
    #[serde(default)]
    ibi_status_list: Option<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
struct HeartRateProbe {
    #[serde(default)]
    samples: Option<Vec<TimestampProbe>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_json() -> &'static str {
        r#"{
            "samples": [
                {
                    "hr": 62,
                    "hrInterBeatInterval": 968,
                    "status": 1,
                    "unix_timestamp_in_ms": 1754496000000,
                    "effective_time_frame": "2025-08-06T16:00:00Z",
                    "ibi_list": [950, 980],
                    "ibi_status_list": [0, 0]
                },
                {
                    "hr": 64,
                    "hrInterBeatInterval": 937,
                    "status": 1,
                    "unix_timestamp_in_ms": 1754496002000,
                    "effective_time_frame": {"date_time": "2025-08-06T16:00:02Z"},
                    "ibi_list": [],
                    "ibi_status_list": []
                },
                {
                    "hr": 63,
                    "status": 1,
                    "unix_timestamp_in_ms": 1754496004000,
                    "ibi_list": [900, "bad"],
                    "ibi_status_list": [0, 0]
                }
            ]
        }"#
    }

    #[test]
    fn test_decode_heart_rate() {
        let samples = HeartRateDecoder
            .decode(sample_json(), &TimestampConverter::default())
            .unwrap();

        assert_eq!(samples.len(), 3);
        let first = &samples[0];
        assert_eq!(first.hr, Some(62.0));
        assert_eq!(first.hr_ibi_summary, Some(968.0));
        assert_eq!(first.status, Some(1));
        assert_eq!(first.ibi_durations, vec![950, 980]);
        assert_eq!(first.ibi_statuses, vec![0, 0]);
        assert!(first.has_beats());
        assert_eq!(
            first.effective_time_frame.as_deref(),
            Some("2025-08-06T16:00:00Z")
        );

        assert!(!samples[1].has_beats());
        assert_eq!(
            samples[1].effective_time_frame.as_deref(),
            Some(r#"{"date_time":"2025-08-06T16:00:02Z"}"#)
        );
    }

    #[test]
    fn test_malformed_beat_list_keeps_sample() {
        let samples = HeartRateDecoder
            .decode(sample_json(), &TimestampConverter::default())
            .unwrap();

        let third = &samples[2];
        assert_eq!(third.hr, Some(63.0));
        assert!(third.hr_ibi_summary.is_none());
        assert!(third.ibi_durations.is_empty());
        assert!(!third.has_beats());
    }

    #[test]
    fn test_missing_lists_and_timestamp() {
        let json = r#"{"samples": [{"hr": 70}]}"#;
        let samples = HeartRateDecoder
            .decode(json, &TimestampConverter::default())
            .unwrap();
        assert_eq!(samples.len(), 1);
        assert!(samples[0].instant.is_none());
        assert!(samples[0].ibi_durations.is_empty());
        assert!(samples[0].ibi_statuses.is_empty());
    }

    #[test]
    fn test_probe_boundary() {
        let boundary = HeartRateDecoder.probe_boundary(sample_json()).unwrap();
        assert_eq!(boundary.first_ms, Some(1_754_496_000_000));
        assert_eq!(boundary.last_ms, Some(1_754_496_004_000));
    }

    #[test]
    fn test_fractional_values_truncate_to_whole_milliseconds() {
        let samples = HeartRateDecoder
            .decode(
                r#"{"samples": [{"unix_timestamp_in_ms": 1000.9, "ibi_list": [812.7, "799.2"], "ibi_status_list": [0, 0]}]}"#,
                &TimestampConverter::new("UTC").unwrap(),
            )
            .unwrap();

        assert_eq!(samples[0].instant.unwrap().timestamp_millis(), 1000);
        assert_eq!(samples[0].ibi_durations, vec![812, 799]);
    }
}
