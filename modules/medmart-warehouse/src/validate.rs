//! Post-assembly integrity checks.
//!
//! Each check is a predicate over a full row set: it passes when its
//! violation set is empty. Checks run independently and never abort the
//! run; the publication policy decides what a failure means.

use std::collections::HashMap;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{info, warn};

use medmart_common::WarehouseConfig;

use crate::snapshot::WarehouseSnapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckSeverity {
    Warn,
    Error,
}

impl std::fmt::Display for CheckSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CheckSeverity::Warn => write!(f, "warn"),
            CheckSeverity::Error => write!(f, "error"),
        }
    }
}

/// Outcome of one check: the violation count and a capped sample of the
/// violating rows for diagnosis.
#[derive(Debug, Clone, Serialize)]
pub struct CheckResult {
    pub name: &'static str,
    pub severity: CheckSeverity,
    pub violation_count: u64,
    pub sample_violations: Vec<String>,
}

impl CheckResult {
    fn from_violations(
        name: &'static str,
        severity: CheckSeverity,
        mut violations: Vec<String>,
        sample_limit: usize,
    ) -> Self {
        let violation_count = violations.len() as u64;
        violations.truncate(sample_limit);
        Self {
            name,
            severity,
            violation_count,
            sample_violations: violations,
        }
    }

    pub fn passed(&self) -> bool {
        self.violation_count == 0
    }
}

#[derive(Debug, Serialize)]
pub struct ValidationReport {
    pub checks: Vec<CheckResult>,
}

impl ValidationReport {
    pub fn passed(&self) -> bool {
        self.checks.iter().all(CheckResult::passed)
    }

    /// Failing checks at error severity: the ones a strict pipeline treats
    /// as publication blockers.
    pub fn blocking_failures(&self) -> Vec<&CheckResult> {
        self.checks
            .iter()
            .filter(|c| c.severity == CheckSeverity::Error && !c.passed())
            .collect()
    }

    pub fn check(&self, name: &str) -> Option<&CheckResult> {
        self.checks.iter().find(|c| c.name == name)
    }
}

impl std::fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "\n=== Integrity Checks ===")?;
        for check in &self.checks {
            let status = if check.passed() { "pass" } else { "FAIL" };
            writeln!(
                f,
                "{status}  [{}] {}: {} violation(s)",
                check.severity, check.name, check.violation_count
            )?;
        }
        Ok(())
    }
}

/// Run the full battery against an assembled snapshot.
///
/// `as_of` is the run's reference date, passed explicitly so the
/// wall-clock-dependent check stays deterministic and testable.
pub fn run_checks(
    snapshot: &WarehouseSnapshot,
    as_of: NaiveDate,
    config: &WarehouseConfig,
) -> ValidationReport {
    let limit = config.sample_limit;
    let report = ValidationReport {
        checks: vec![
            fact_message_text_not_empty(snapshot, limit),
            dim_channel_name_not_empty(snapshot, limit),
            detection_image_path_not_empty(snapshot, limit),
            fact_natural_key_unique(snapshot, limit),
            channel_name_unique(snapshot, limit),
            full_date_unique(snapshot, limit),
            fact_channel_key_resolves(snapshot, limit),
            fact_date_key_resolves(snapshot, limit),
            detection_keys_resolve(snapshot, limit),
            no_future_messages(snapshot, as_of, limit),
            view_count_non_negative(snapshot, limit),
            channel_date_order(snapshot, limit),
        ],
    };

    let failing = report.checks.iter().filter(|c| !c.passed()).count();
    if failing > 0 {
        warn!(failing, total = report.checks.len(), "Integrity checks failed");
    } else {
        info!(total = report.checks.len(), "All integrity checks passed");
    }
    report
}

// ---------------------------------------------------------------------------
// Required-column checks
// ---------------------------------------------------------------------------

fn fact_message_text_not_empty(snapshot: &WarehouseSnapshot, limit: usize) -> CheckResult {
    let violations = snapshot
        .message_facts
        .iter()
        .filter(|f| f.message_text.is_empty())
        .map(|f| format!("message {} (channel_key={})", f.message_id, f.channel_key))
        .collect();
    CheckResult::from_violations(
        "fact_message_text_not_empty",
        CheckSeverity::Error,
        violations,
        limit,
    )
}

fn dim_channel_name_not_empty(snapshot: &WarehouseSnapshot, limit: usize) -> CheckResult {
    let violations = snapshot
        .channels
        .iter()
        .filter(|c| c.channel_name.is_empty())
        .map(|c| format!("channel_key={}", c.channel_key))
        .collect();
    CheckResult::from_violations(
        "dim_channel_name_not_empty",
        CheckSeverity::Error,
        violations,
        limit,
    )
}

fn detection_image_path_not_empty(snapshot: &WarehouseSnapshot, limit: usize) -> CheckResult {
    let violations = snapshot
        .detection_facts
        .iter()
        .filter(|d| d.image_path.is_empty())
        .map(|d| format!("detection on message {}", d.message_id))
        .collect();
    CheckResult::from_violations(
        "detection_image_path_not_empty",
        CheckSeverity::Error,
        violations,
        limit,
    )
}

// ---------------------------------------------------------------------------
// Uniqueness checks
// ---------------------------------------------------------------------------

fn fact_natural_key_unique(snapshot: &WarehouseSnapshot, limit: usize) -> CheckResult {
    let mut seen: HashMap<(u32, i64), u32> = HashMap::new();
    for fact in &snapshot.message_facts {
        *seen.entry((fact.channel_key, fact.message_id)).or_insert(0) += 1;
    }
    let mut duplicated: Vec<((u32, i64), u32)> =
        seen.into_iter().filter(|&(_, n)| n > 1).collect();
    duplicated.sort();
    let violations = duplicated
        .into_iter()
        .map(|((channel_key, message_id), n)| {
            format!("(channel_key={channel_key}, message_id={message_id}) occurs {n} times")
        })
        .collect();
    CheckResult::from_violations(
        "fact_natural_key_unique",
        CheckSeverity::Error,
        violations,
        limit,
    )
}

fn channel_name_unique(snapshot: &WarehouseSnapshot, limit: usize) -> CheckResult {
    let mut seen: HashMap<&str, u32> = HashMap::new();
    for channel in &snapshot.channels {
        *seen.entry(channel.channel_name.as_str()).or_insert(0) += 1;
    }
    let mut duplicated: Vec<(&str, u32)> = seen.into_iter().filter(|&(_, n)| n > 1).collect();
    duplicated.sort();
    let violations = duplicated
        .into_iter()
        .map(|(name, n)| format!("channel '{name}' occurs {n} times"))
        .collect();
    CheckResult::from_violations("channel_name_unique", CheckSeverity::Error, violations, limit)
}

fn full_date_unique(snapshot: &WarehouseSnapshot, limit: usize) -> CheckResult {
    let mut seen: HashMap<NaiveDate, u32> = HashMap::new();
    for date in &snapshot.dates {
        *seen.entry(date.full_date).or_insert(0) += 1;
    }
    let mut duplicated: Vec<(NaiveDate, u32)> = seen.into_iter().filter(|&(_, n)| n > 1).collect();
    duplicated.sort();
    let violations = duplicated
        .into_iter()
        .map(|(day, n)| format!("date {day} occurs {n} times"))
        .collect();
    CheckResult::from_violations("full_date_unique", CheckSeverity::Error, violations, limit)
}

// ---------------------------------------------------------------------------
// Referential integrity checks
// ---------------------------------------------------------------------------

fn fact_channel_key_resolves(snapshot: &WarehouseSnapshot, limit: usize) -> CheckResult {
    let violations = snapshot
        .message_facts
        .iter()
        .filter(|f| snapshot.channel(f.channel_key).is_none())
        .map(|f| format!("message {} references channel_key={}", f.message_id, f.channel_key))
        .collect();
    CheckResult::from_violations(
        "fact_channel_key_resolves",
        CheckSeverity::Error,
        violations,
        limit,
    )
}

fn fact_date_key_resolves(snapshot: &WarehouseSnapshot, limit: usize) -> CheckResult {
    let violations = snapshot
        .message_facts
        .iter()
        .filter(|f| snapshot.date(f.date_key).is_none())
        .map(|f| format!("message {} references date_key={}", f.message_id, f.date_key))
        .collect();
    CheckResult::from_violations(
        "fact_date_key_resolves",
        CheckSeverity::Error,
        violations,
        limit,
    )
}

fn detection_keys_resolve(snapshot: &WarehouseSnapshot, limit: usize) -> CheckResult {
    let violations = snapshot
        .detection_facts
        .iter()
        .filter(|d| {
            snapshot.channel(d.channel_key).is_none() || snapshot.date(d.date_key).is_none()
        })
        .map(|d| {
            format!(
                "detection on message {} references (channel_key={}, date_key={})",
                d.message_id, d.channel_key, d.date_key
            )
        })
        .collect();
    CheckResult::from_violations(
        "detection_keys_resolve",
        CheckSeverity::Error,
        violations,
        limit,
    )
}

// ---------------------------------------------------------------------------
// Domain checks
// ---------------------------------------------------------------------------

fn no_future_messages(snapshot: &WarehouseSnapshot, as_of: NaiveDate, limit: usize) -> CheckResult {
    let violations = snapshot
        .message_facts
        .iter()
        .filter_map(|f| {
            let date = snapshot.date(f.date_key)?;
            (date.full_date > as_of).then(|| {
                format!(
                    "message {} dated {} (run date {})",
                    f.message_id, date.full_date, as_of
                )
            })
        })
        .collect();
    CheckResult::from_violations("no_future_messages", CheckSeverity::Error, violations, limit)
}

fn view_count_non_negative(snapshot: &WarehouseSnapshot, limit: usize) -> CheckResult {
    let violations = snapshot
        .message_facts
        .iter()
        .filter(|f| f.view_count < 0)
        .map(|f| format!("message {} has view_count={}", f.message_id, f.view_count))
        .collect();
    CheckResult::from_violations(
        "view_count_non_negative",
        CheckSeverity::Error,
        violations,
        limit,
    )
}

fn channel_date_order(snapshot: &WarehouseSnapshot, limit: usize) -> CheckResult {
    let violations = snapshot
        .channels
        .iter()
        .filter(|c| match (c.first_post_date, c.last_post_date) {
            (Some(first), Some(last)) => first > last,
            _ => false,
        })
        .map(|c| format!("channel '{}' first post after last post", c.channel_name))
        .collect();
    CheckResult::from_violations("channel_date_order", CheckSeverity::Warn, violations, limit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use medmart_common::{ChannelRow, DateRow, DetectionFact, ImageCategory, MessageFact};

    fn channel(key: u32, name: &str) -> ChannelRow {
        ChannelRow {
            channel_key: key,
            channel_name: name.to_string(),
            first_post_date: None,
            last_post_date: None,
            total_posts: 1,
            avg_views: 0.0,
        }
    }

    fn date(key: u32, day: &str) -> DateRow {
        DateRow {
            date_key: key,
            full_date: day.parse().unwrap(),
            year: 2025,
            month: 7,
            day: 1,
            quarter: 3,
            week_of_year: 27,
            day_of_week: "Tuesday".to_string(),
            is_weekend: false,
        }
    }

    fn fact(channel_key: u32, date_key: u32, message_id: i64) -> MessageFact {
        MessageFact {
            message_id,
            channel_key,
            date_key,
            message_text: "text".to_string(),
            message_length: 4,
            view_count: 10,
            forward_count: 0,
            has_image: false,
            image_path: None,
            contains_price: false,
            contains_contact: false,
        }
    }

    fn snapshot_with(
        facts: Vec<MessageFact>,
        detections: Vec<DetectionFact>,
    ) -> WarehouseSnapshot {
        WarehouseSnapshot::new(
            vec![channel(1, "onc")],
            vec![date(1, "2025-07-01")],
            facts,
            detections,
        )
    }

    fn as_of() -> NaiveDate {
        "2025-07-10".parse().unwrap()
    }

    #[test]
    fn clean_snapshot_passes_every_check() {
        let snapshot = snapshot_with(vec![fact(1, 1, 42)], Vec::new());
        let report = run_checks(&snapshot, as_of(), &WarehouseConfig::default());
        assert!(report.passed(), "{report}");
        assert!(report.blocking_failures().is_empty());
    }

    #[test]
    fn dangling_channel_key_fails_referential_integrity() {
        let snapshot = snapshot_with(vec![fact(99, 1, 42)], Vec::new());
        let report = run_checks(&snapshot, as_of(), &WarehouseConfig::default());
        let check = report.check("fact_channel_key_resolves").unwrap();
        assert_eq!(check.violation_count, 1);
        assert!(check.sample_violations[0].contains("channel_key=99"));
        assert!(!report.blocking_failures().is_empty());
    }

    #[test]
    fn duplicate_natural_key_is_flagged_once_per_key() {
        let snapshot = snapshot_with(vec![fact(1, 1, 42), fact(1, 1, 42)], Vec::new());
        let report = run_checks(&snapshot, as_of(), &WarehouseConfig::default());
        let check = report.check("fact_natural_key_unique").unwrap();
        assert_eq!(check.violation_count, 1);
        assert!(check.sample_violations[0].contains("occurs 2 times"));
    }

    #[test]
    fn future_dated_fact_fails_against_explicit_as_of() {
        let snapshot = snapshot_with(vec![fact(1, 1, 42)], Vec::new());
        // A run dated before the fact's date makes the fact "future".
        let report = run_checks(
            &snapshot,
            "2025-06-30".parse().unwrap(),
            &WarehouseConfig::default(),
        );
        let check = report.check("no_future_messages").unwrap();
        assert_eq!(check.violation_count, 1);

        // The same snapshot is clean one day after the fact's date.
        let report = run_checks(&snapshot, as_of(), &WarehouseConfig::default());
        assert!(report.check("no_future_messages").unwrap().passed());
    }

    #[test]
    fn negative_view_count_is_flagged() {
        let mut bad = fact(1, 1, 42);
        bad.view_count = -5;
        let snapshot = snapshot_with(vec![bad], Vec::new());
        let report = run_checks(&snapshot, as_of(), &WarehouseConfig::default());
        assert_eq!(report.check("view_count_non_negative").unwrap().violation_count, 1);
    }

    #[test]
    fn dangling_detection_keys_are_flagged() {
        let detection = DetectionFact {
            message_id: 42,
            channel_key: 7,
            date_key: 1,
            image_path: "img/a.jpg".to_string(),
            detected_class: 39,
            confidence_score: 0.9,
            image_category: ImageCategory::Other,
        };
        let snapshot = snapshot_with(vec![fact(1, 1, 42)], vec![detection]);
        let report = run_checks(&snapshot, as_of(), &WarehouseConfig::default());
        assert_eq!(report.check("detection_keys_resolve").unwrap().violation_count, 1);
    }

    #[test]
    fn samples_are_capped_but_counts_are_not() {
        let facts = (0..25).map(|i| {
            let mut f = fact(1, 1, i);
            f.view_count = -1;
            f
        });
        let snapshot = snapshot_with(facts.collect(), Vec::new());
        let config = WarehouseConfig {
            sample_limit: 3,
            ..WarehouseConfig::default()
        };
        let report = run_checks(&snapshot, as_of(), &config);
        let check = report.check("view_count_non_negative").unwrap();
        assert_eq!(check.violation_count, 25);
        assert_eq!(check.sample_violations.len(), 3);
    }

    #[test]
    fn warn_checks_never_block() {
        let mut channel = channel(1, "onc");
        channel.first_post_date = Some("2025-07-05T00:00:00Z".parse().unwrap());
        channel.last_post_date = Some("2025-07-01T00:00:00Z".parse().unwrap());
        let snapshot = WarehouseSnapshot::new(
            vec![channel],
            vec![date(1, "2025-07-01")],
            Vec::new(),
            Vec::new(),
        );
        let report = run_checks(&snapshot, as_of(), &WarehouseConfig::default());
        let check = report.check("channel_date_order").unwrap();
        assert_eq!(check.violation_count, 1);
        assert!(report.blocking_failures().is_empty());
    }

    #[test]
    fn report_serializes_for_external_consumers() {
        let snapshot = snapshot_with(vec![fact(1, 1, 42)], Vec::new());
        let report = run_checks(&snapshot, as_of(), &WarehouseConfig::default());
        let json = serde_json::to_value(&report).unwrap();
        assert!(json["checks"].as_array().unwrap().len() >= 10);
        assert_eq!(json["checks"][0]["severity"], "error");
    }
}
