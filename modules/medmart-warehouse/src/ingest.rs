//! Raw record ingest: data-lake JSON values to typed rows.
//!
//! Row-level error policy: a malformed record is excluded and reported with
//! a named reason, the batch continues. Ingest never aborts a run.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde_json::Value;
use thiserror::Error;
use tracing::{info, warn};

use medmart_common::{DetectionRecord, ImageCategory, RawMessage};

/// Why a single raw record was excluded from the run.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IngestReason {
    #[error("record is not a JSON object")]
    NotAnObject,

    #[error("message_id is missing or null")]
    MissingMessageId,

    #[error("channel_name is missing or null")]
    MissingChannelName,

    #[error("image_path is missing or empty")]
    MissingImagePath,

    #[error("{field} is not a valid timestamp: {value}")]
    BadTimestamp { field: &'static str, value: String },

    #[error("{field} is not a valid integer: {value}")]
    BadInteger { field: &'static str, value: String },

    #[error("{field} is not a valid number: {value}")]
    BadNumber { field: &'static str, value: String },

    #[error("{field} is not a boolean: {value}")]
    BadBoolean { field: &'static str, value: String },

    #[error("{field} is not a string: {value}")]
    BadString { field: &'static str, value: String },
}

/// A record excluded during ingest, with its position in the input stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedRecord {
    pub ingest_seq: u64,
    pub reason: IngestReason,
}

#[derive(Debug, Default)]
pub struct IngestOutcome {
    pub messages: Vec<RawMessage>,
    pub rejects: Vec<RejectedRecord>,
}

#[derive(Debug, Default)]
pub struct DetectionIngestOutcome {
    pub detections: Vec<DetectionRecord>,
    pub rejects: Vec<RejectedRecord>,
}

/// Parse a batch of raw message records, skipping malformed ones.
pub fn ingest_messages(values: &[Value]) -> IngestOutcome {
    let mut outcome = IngestOutcome::default();
    for (seq, value) in values.iter().enumerate() {
        let seq = seq as u64;
        match parse_record(seq, value) {
            Ok(msg) => outcome.messages.push(msg),
            Err(reason) => {
                warn!(ingest_seq = seq, %reason, "Rejected raw message record");
                outcome.rejects.push(RejectedRecord { ingest_seq: seq, reason });
            }
        }
    }
    info!(
        records_in = values.len(),
        parsed = outcome.messages.len(),
        rejected = outcome.rejects.len(),
        "Raw message ingest complete"
    );
    outcome
}

/// Parse a batch of detection-result records, skipping malformed ones.
pub fn ingest_detections(values: &[Value]) -> DetectionIngestOutcome {
    let mut outcome = DetectionIngestOutcome::default();
    for (seq, value) in values.iter().enumerate() {
        let seq = seq as u64;
        match parse_detection(value) {
            Ok(det) => outcome.detections.push(det),
            Err(reason) => {
                warn!(ingest_seq = seq, %reason, "Rejected detection record");
                outcome.rejects.push(RejectedRecord { ingest_seq: seq, reason });
            }
        }
    }
    info!(
        records_in = values.len(),
        parsed = outcome.detections.len(),
        rejected = outcome.rejects.len(),
        "Detection ingest complete"
    );
    outcome
}

/// Parse one raw message record from its data-lake JSON form.
pub fn parse_record(ingest_seq: u64, value: &Value) -> Result<RawMessage, IngestReason> {
    let obj = value.as_object().ok_or(IngestReason::NotAnObject)?;

    let message_id = match obj.get("message_id") {
        None | Some(Value::Null) => return Err(IngestReason::MissingMessageId),
        Some(v) => v
            .as_i64()
            .ok_or_else(|| bad_int("message_id", v))?,
    };
    let channel_name = match obj.get("channel_name") {
        None | Some(Value::Null) => return Err(IngestReason::MissingChannelName),
        Some(v) => string_field("channel_name", v)?,
    };

    Ok(RawMessage {
        channel_name,
        message_id,
        message_date: timestamp_field("message_date", obj.get("message_date"))?,
        message_text: optional_string_field("message_text", obj.get("message_text"))?,
        has_media: bool_field("has_media", obj.get("has_media"))?,
        image_path: optional_string_field("image_path", obj.get("image_path"))?,
        views: integer_field("views", obj.get("views"))?,
        forwards: integer_field("forwards", obj.get("forwards"))?,
        scraped_at: timestamp_field("scraped_at", obj.get("scraped_at"))?,
        ingest_seq,
    })
}

/// Parse one detection-result record.
pub fn parse_detection(value: &Value) -> Result<DetectionRecord, IngestReason> {
    let obj = value.as_object().ok_or(IngestReason::NotAnObject)?;

    let image_path = match obj.get("image_path") {
        None | Some(Value::Null) => return Err(IngestReason::MissingImagePath),
        Some(v) => string_field("image_path", v)?,
    };
    if image_path.is_empty() {
        return Err(IngestReason::MissingImagePath);
    }

    let detected_class = match obj.get("detected_class") {
        None | Some(Value::Null) => {
            return Err(bad_int("detected_class", &Value::Null));
        }
        Some(v) => v
            .as_u64()
            .and_then(|c| u32::try_from(c).ok())
            .ok_or_else(|| bad_int("detected_class", v))?,
    };

    let confidence_score = match obj.get("confidence_score") {
        None | Some(Value::Null) => 0.0,
        Some(v) => v.as_f64().ok_or_else(|| IngestReason::BadNumber {
            field: "confidence_score",
            value: v.to_string(),
        })?,
    };

    let image_category = match obj.get("image_category") {
        None | Some(Value::Null) => ImageCategory::Other,
        Some(Value::String(s)) => ImageCategory::from_str_loose(s),
        Some(v) => {
            return Err(IngestReason::BadString {
                field: "image_category",
                value: v.to_string(),
            })
        }
    };

    Ok(DetectionRecord {
        image_path,
        detected_class,
        confidence_score,
        image_category,
    })
}

fn bad_int(field: &'static str, value: &Value) -> IngestReason {
    IngestReason::BadInteger {
        field,
        value: value.to_string(),
    }
}

fn string_field(field: &'static str, value: &Value) -> Result<String, IngestReason> {
    value
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| IngestReason::BadString {
            field,
            value: value.to_string(),
        })
}

fn optional_string_field(
    field: &'static str,
    value: Option<&Value>,
) -> Result<Option<String>, IngestReason> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(v) => string_field(field, v).map(Some),
    }
}

fn bool_field(field: &'static str, value: Option<&Value>) -> Result<bool, IngestReason> {
    match value {
        None | Some(Value::Null) => Ok(false),
        Some(Value::Bool(b)) => Ok(*b),
        Some(v) => Err(IngestReason::BadBoolean {
            field,
            value: v.to_string(),
        }),
    }
}

fn integer_field(field: &'static str, value: Option<&Value>) -> Result<Option<i64>, IngestReason> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(v) => v.as_i64().map(Some).ok_or_else(|| bad_int(field, v)),
    }
}

/// Accepts RFC 3339 timestamps and the offset-less ISO form the scraper
/// writes (`2025-07-01T12:30:00` or with fractional seconds), read as UTC.
fn timestamp_field(
    field: &'static str,
    value: Option<&Value>,
) -> Result<Option<DateTime<Utc>>, IngestReason> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => {
            if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
                return Ok(Some(dt.with_timezone(&Utc)));
            }
            if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f") {
                return Ok(Some(Utc.from_utc_datetime(&naive)));
            }
            Err(IngestReason::BadTimestamp {
                field,
                value: s.clone(),
            })
        }
        Some(v) => Err(IngestReason::BadTimestamp {
            field,
            value: v.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_a_complete_record() {
        let value = json!({
            "message_id": 42,
            "channel_name": "tikvahpharma",
            "message_date": "2025-07-01T09:15:00",
            "message_text": "Paracetamol available, 100 ETB",
            "has_media": true,
            "image_path": "data/raw/images/tikvahpharma/42_ab12cd34.jpg",
            "views": 1200,
            "forwards": 7,
            "scraped_at": "2025-07-02T02:00:05"
        });
        let msg = parse_record(3, &value).unwrap();
        assert_eq!(msg.message_id, 42);
        assert_eq!(msg.channel_name, "tikvahpharma");
        assert_eq!(msg.views, Some(1200));
        assert_eq!(msg.ingest_seq, 3);
        assert!(msg.has_media);
        assert_eq!(msg.message_date.unwrap().date_naive().to_string(), "2025-07-01");
    }

    #[test]
    fn null_message_id_is_excluded() {
        let value = json!({
            "message_id": null,
            "channel_name": "onc",
            "message_date": "2025-07-01T09:15:00"
        });
        assert_eq!(parse_record(0, &value), Err(IngestReason::MissingMessageId));
    }

    #[test]
    fn malformed_timestamp_rejects_only_that_field_record() {
        let bad = json!({
            "message_id": 1,
            "channel_name": "onc",
            "message_date": "not-a-date"
        });
        let good = json!({
            "message_id": 2,
            "channel_name": "onc",
            "message_date": "2025-07-01T09:15:00"
        });
        let outcome = ingest_messages(&[bad, good]);
        assert_eq!(outcome.messages.len(), 1);
        assert_eq!(outcome.messages[0].message_id, 2);
        assert_eq!(outcome.rejects.len(), 1);
        assert_eq!(outcome.rejects[0].ingest_seq, 0);
        assert!(matches!(
            outcome.rejects[0].reason,
            IngestReason::BadTimestamp { field: "message_date", .. }
        ));
    }

    #[test]
    fn malformed_views_is_a_named_reject() {
        let value = json!({
            "message_id": 1,
            "channel_name": "onc",
            "views": "many"
        });
        assert!(matches!(
            parse_record(0, &value),
            Err(IngestReason::BadInteger { field: "views", .. })
        ));
    }

    #[test]
    fn nullable_fields_default_sensibly() {
        let value = json!({ "message_id": 9, "channel_name": "onc" });
        let msg = parse_record(0, &value).unwrap();
        assert_eq!(msg.message_text, None);
        assert_eq!(msg.views, None);
        assert_eq!(msg.scraped_at, None);
        assert!(!msg.has_media);
    }

    #[test]
    fn rfc3339_offsets_normalize_to_utc() {
        let value = json!({
            "message_id": 1,
            "channel_name": "onc",
            "message_date": "2025-07-01T12:00:00+03:00"
        });
        let msg = parse_record(0, &value).unwrap();
        assert_eq!(msg.message_date.unwrap().to_rfc3339(), "2025-07-01T09:00:00+00:00");
    }

    #[test]
    fn detection_record_parses_with_loose_category() {
        let value = json!({
            "image_path": "data/raw/images/onc/42_ab.jpg",
            "detected_class": 39,
            "confidence_score": 0.91,
            "image_category": "product_display"
        });
        let det = parse_detection(&value).unwrap();
        assert_eq!(det.detected_class, 39);
        assert_eq!(det.image_category, ImageCategory::ProductDisplay);
    }

    #[test]
    fn detection_without_image_path_is_rejected() {
        let value = json!({ "detected_class": 39, "confidence_score": 0.5 });
        assert_eq!(parse_detection(&value), Err(IngestReason::MissingImagePath));
        let empty = json!({ "image_path": "", "detected_class": 39 });
        assert_eq!(parse_detection(&empty), Err(IngestReason::MissingImagePath));
    }
}
