//! Published warehouse tables as an immutable snapshot, swapped atomically.

use std::collections::HashMap;
use std::sync::Arc;

use arc_swap::ArcSwap;
use chrono::{DateTime, NaiveDate, Utc};
use tracing::{info, warn};

use medmart_common::{
    ChannelRow, DateRow, DetectionFact, MessageFact, WarehouseConfig, WarehouseError,
};

use crate::validate::ValidationReport;

/// The four published tables plus lookup indexes, built wholesale by a
/// pipeline run. Nothing mutates a snapshot after construction.
pub struct WarehouseSnapshot {
    pub channels: Vec<ChannelRow>,
    pub dates: Vec<DateRow>,
    pub message_facts: Vec<MessageFact>,
    pub detection_facts: Vec<DetectionFact>,

    pub channel_by_key: HashMap<u32, usize>,
    pub date_by_key: HashMap<u32, usize>,
    pub channel_by_name: HashMap<String, usize>,
    pub date_by_day: HashMap<NaiveDate, usize>,

    pub built_at: DateTime<Utc>,
}

impl WarehouseSnapshot {
    pub fn new(
        channels: Vec<ChannelRow>,
        dates: Vec<DateRow>,
        message_facts: Vec<MessageFact>,
        detection_facts: Vec<DetectionFact>,
    ) -> Self {
        let channel_by_key = channels
            .iter()
            .enumerate()
            .map(|(i, c)| (c.channel_key, i))
            .collect();
        let channel_by_name = channels
            .iter()
            .enumerate()
            .map(|(i, c)| (c.channel_name.clone(), i))
            .collect();
        let date_by_key = dates.iter().enumerate().map(|(i, d)| (d.date_key, i)).collect();
        let date_by_day = dates.iter().enumerate().map(|(i, d)| (d.full_date, i)).collect();

        Self {
            channels,
            dates,
            message_facts,
            detection_facts,
            channel_by_key,
            date_by_key,
            channel_by_name,
            date_by_day,
            built_at: Utc::now(),
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new(), Vec::new(), Vec::new(), Vec::new())
    }

    pub fn channel(&self, key: u32) -> Option<&ChannelRow> {
        self.channel_by_key.get(&key).map(|&i| &self.channels[i])
    }

    pub fn date(&self, key: u32) -> Option<&DateRow> {
        self.date_by_key.get(&key).map(|&i| &self.dates[i])
    }

    pub fn channel_named(&self, name: &str) -> Option<&ChannelRow> {
        self.channel_by_name.get(name).map(|&i| &self.channels[i])
    }
}

/// Thread-safe holder of the published snapshot with atomic swap for
/// lock-free reads (readers keep a consistent view across a republish).
pub struct WarehouseStore {
    inner: ArcSwap<WarehouseSnapshot>,
}

impl WarehouseStore {
    pub fn new(initial: WarehouseSnapshot) -> Self {
        Self {
            inner: ArcSwap::new(Arc::new(initial)),
        }
    }

    /// A store holding an empty warehouse, for first boot.
    pub fn empty() -> Self {
        Self::new(WarehouseSnapshot::empty())
    }

    /// Owned handle on the currently published snapshot.
    pub fn load_full(&self) -> Arc<WarehouseSnapshot> {
        self.inner.load_full()
    }

    /// Publish a freshly built snapshot, all-or-nothing.
    ///
    /// In strict mode an error-severity check failure refuses the swap and
    /// keeps the previous snapshot visible. In non-strict mode failures are
    /// logged and publication proceeds.
    pub fn publish(
        &self,
        snapshot: WarehouseSnapshot,
        report: &ValidationReport,
        config: &WarehouseConfig,
    ) -> Result<(), WarehouseError> {
        let blocking = report.blocking_failures();
        if !blocking.is_empty() {
            if config.strict {
                let failed_checks: Vec<String> =
                    blocking.iter().map(|c| c.name.to_string()).collect();
                warn!(
                    failed = blocking.len(),
                    checks = ?failed_checks,
                    "Publication blocked, keeping previous snapshot"
                );
                return Err(WarehouseError::PublishBlocked { failed_checks });
            }
            for check in &blocking {
                warn!(
                    check = check.name,
                    violations = check.violation_count,
                    "Publishing despite failing check"
                );
            }
        }

        info!(
            channels = snapshot.channels.len(),
            dates = snapshot.dates.len(),
            message_facts = snapshot.message_facts.len(),
            detection_facts = snapshot.detection_facts.len(),
            "Published warehouse snapshot"
        );
        self.inner.store(Arc::new(snapshot));
        Ok(())
    }
}
