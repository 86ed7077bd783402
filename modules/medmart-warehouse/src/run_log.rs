//! Run log: ordered timeline of row-level outcomes during a pipeline run.
//!
//! Serializes to JSON for the external CI/alerting collaborator, so every
//! dropped or excluded row stays attributable after the run ends.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

#[derive(Serialize)]
pub struct RunEvent {
    pub seq: u32,
    pub ts: DateTime<Utc>,
    #[serde(flatten)]
    pub kind: EventKind,
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventKind {
    RecordRejected {
        ingest_seq: u64,
        reason: String,
    },
    DetectionRejected {
        ingest_seq: u64,
        reason: String,
    },
    LookupMiss {
        channel_name: String,
        message_id: i64,
        missing: String,
    },
    StageCompleted {
        stage: String,
        rows_in: u64,
        rows_out: u64,
    },
    CheckFailed {
        check: String,
        severity: String,
        violations: u64,
    },
}

pub struct RunLog {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    events: Vec<RunEvent>,
    seq: u32,
}

impl Default for RunLog {
    fn default() -> Self {
        Self::new()
    }
}

impl RunLog {
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            events: Vec::new(),
            seq: 0,
        }
    }

    pub fn log(&mut self, kind: EventKind) {
        self.events.push(RunEvent {
            seq: self.seq,
            ts: Utc::now(),
            kind,
        });
        self.seq += 1;
    }

    pub fn events(&self) -> &[RunEvent] {
        &self.events
    }

    /// Serialize the timeline for external alerting or archival.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "run_id": self.run_id,
            "started_at": self.started_at,
            "events": self.events,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_are_sequenced_in_order() {
        let mut log = RunLog::new();
        log.log(EventKind::StageCompleted {
            stage: "dedup".to_string(),
            rows_in: 10,
            rows_out: 8,
        });
        log.log(EventKind::RecordRejected {
            ingest_seq: 3,
            reason: "message_id is missing or null".to_string(),
        });
        assert_eq!(log.events().len(), 2);
        assert_eq!(log.events()[0].seq, 0);
        assert_eq!(log.events()[1].seq, 1);
    }

    #[test]
    fn json_form_tags_event_types() {
        let mut log = RunLog::new();
        log.log(EventKind::LookupMiss {
            channel_name: "onc".to_string(),
            message_id: 42,
            missing: "date".to_string(),
        });
        let json = log.to_json();
        assert_eq!(json["events"][0]["type"], "lookup_miss");
        assert_eq!(json["events"][0]["message_id"], 42);
    }
}
