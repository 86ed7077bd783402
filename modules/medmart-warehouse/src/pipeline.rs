//! End-to-end batch run: curate, dimension, assemble, validate.
//!
//! Each stage reads the previous stage's immutable output and produces a
//! fresh one; nothing updates in place. Row-level problems never fail the
//! run. The caller decides what to do with the outcome via
//! `WarehouseStore::publish`.

use chrono::NaiveDate;
use serde_json::Value;
use tracing::info;

use medmart_common::{DetectionRecord, RawMessage, WarehouseConfig};

use crate::dedup;
use crate::dimensions::{self, KeyRegistry};
use crate::facts;
use crate::ingest;
use crate::run_log::{EventKind, RunLog};
use crate::snapshot::WarehouseSnapshot;
use crate::stats::RunStats;
use crate::validate::{self, ValidationReport};

/// Everything a run produces: the built snapshot, per-stage accounting, the
/// integrity report, and the event timeline.
pub struct RunOutcome {
    pub snapshot: WarehouseSnapshot,
    pub stats: RunStats,
    pub report: ValidationReport,
    pub run_log: RunLog,
}

pub struct Pipeline {
    config: WarehouseConfig,
    registry: KeyRegistry,
}

impl Pipeline {
    /// Pipeline with a fresh key registry: full-rebuild semantics.
    pub fn new(config: WarehouseConfig) -> Self {
        Self::with_registry(config, KeyRegistry::new())
    }

    /// Pipeline with a registry carried over from previous runs: surrogate
    /// keys already allocated stay stable across this run.
    pub fn with_registry(config: WarehouseConfig, registry: KeyRegistry) -> Self {
        Self { config, registry }
    }

    /// The registry after the latest run, for persistence between runs.
    pub fn registry(&self) -> &KeyRegistry {
        &self.registry
    }

    /// Run the pipeline over already-typed inputs.
    ///
    /// `as_of` is the run's reference date for temporal checks, passed
    /// explicitly instead of read from the wall clock.
    pub fn run(
        &mut self,
        raw: Vec<RawMessage>,
        detections: Vec<DetectionRecord>,
        as_of: NaiveDate,
    ) -> RunOutcome {
        let mut stats = RunStats {
            records_in: raw.len() as u32,
            detections_in: detections.len() as u32,
            ..RunStats::default()
        };
        let run_log = RunLog::new();
        self.run_inner(raw, detections, as_of, run_log, &mut stats)
    }

    /// Run the pipeline from raw data-lake JSON records, ingest included.
    pub fn run_from_values(
        &mut self,
        raw_values: &[Value],
        detection_values: &[Value],
        as_of: NaiveDate,
    ) -> RunOutcome {
        let mut stats = RunStats {
            records_in: raw_values.len() as u32,
            detections_in: detection_values.len() as u32,
            ..RunStats::default()
        };
        let mut run_log = RunLog::new();

        let messages = ingest::ingest_messages(raw_values);
        stats.records_rejected = messages.rejects.len() as u32;
        for reject in &messages.rejects {
            run_log.log(EventKind::RecordRejected {
                ingest_seq: reject.ingest_seq,
                reason: reject.reason.to_string(),
            });
        }

        let detections = ingest::ingest_detections(detection_values);
        stats.detections_rejected = detections.rejects.len() as u32;
        for reject in &detections.rejects {
            run_log.log(EventKind::DetectionRejected {
                ingest_seq: reject.ingest_seq,
                reason: reject.reason.to_string(),
            });
        }

        self.run_inner(
            messages.messages,
            detections.detections,
            as_of,
            run_log,
            &mut stats,
        )
    }

    fn run_inner(
        &mut self,
        raw: Vec<RawMessage>,
        detections: Vec<DetectionRecord>,
        as_of: NaiveDate,
        mut run_log: RunLog,
        stats: &mut RunStats,
    ) -> RunOutcome {
        info!(
            run_id = %run_log.run_id,
            records = raw.len(),
            detections = detections.len(),
            %as_of,
            "Warehouse run started"
        );

        let raw_count = raw.len();
        let curated = dedup::deduplicate(raw);
        stats.messages_curated = curated.len() as u32;
        stats.duplicates_collapsed = (raw_count - curated.len()) as u32;
        stats.valid_messages = curated.iter().filter(|m| m.valid_message).count() as u32;
        stats.invalid_messages = stats.messages_curated - stats.valid_messages;
        run_log.log(EventKind::StageCompleted {
            stage: "dedup".to_string(),
            rows_in: raw_count as u64,
            rows_out: curated.len() as u64,
        });

        let channels = dimensions::build_channel_dimension(&curated, &mut self.registry);
        let dates = dimensions::build_date_dimension(&curated, &mut self.registry);
        stats.channels = channels.len() as u32;
        stats.dates = dates.len() as u32;
        run_log.log(EventKind::StageCompleted {
            stage: "dimensions".to_string(),
            rows_in: curated.len() as u64,
            rows_out: (channels.len() + dates.len()) as u64,
        });

        let message_outcome = facts::assemble_message_facts(&curated, &channels, &dates);
        stats.message_facts = message_outcome.facts.len() as u32;
        stats.channel_lookup_misses = message_outcome.channel_misses() as u32;
        stats.date_lookup_misses = message_outcome.date_misses() as u32;
        for miss in &message_outcome.misses {
            run_log.log(EventKind::LookupMiss {
                channel_name: miss.channel_name.clone(),
                message_id: miss.message_id,
                missing: miss.missed.to_string(),
            });
        }
        run_log.log(EventKind::StageCompleted {
            stage: "message_facts".to_string(),
            rows_in: stats.valid_messages as u64,
            rows_out: message_outcome.facts.len() as u64,
        });

        let detection_outcome =
            facts::assemble_detection_facts(&detections, &message_outcome.facts);
        stats.detection_facts = detection_outcome.facts.len() as u32;
        stats.detections_unmatched = detection_outcome.unmatched;
        run_log.log(EventKind::StageCompleted {
            stage: "detection_facts".to_string(),
            rows_in: detections.len() as u64,
            rows_out: detection_outcome.facts.len() as u64,
        });

        let snapshot = WarehouseSnapshot::new(
            channels,
            dates,
            message_outcome.facts,
            detection_outcome.facts,
        );
        let report = validate::run_checks(&snapshot, as_of, &self.config);
        stats.checks_failed = report.checks.iter().filter(|c| !c.passed()).count() as u32;
        for check in report.checks.iter().filter(|c| !c.passed()) {
            run_log.log(EventKind::CheckFailed {
                check: check.name.to_string(),
                severity: check.severity.to_string(),
                violations: check.violation_count,
            });
        }

        info!(
            run_id = %run_log.run_id,
            message_facts = stats.message_facts,
            detection_facts = stats.detection_facts,
            checks_failed = stats.checks_failed,
            "Warehouse run complete"
        );

        RunOutcome {
            snapshot,
            stats: stats.clone(),
            report,
            run_log,
        }
    }
}
