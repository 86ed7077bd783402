//! Channel and date dimensions with stable surrogate keys.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use tracing::info;

use medmart_common::{ChannelRow, CuratedMessage, DateRow};

// ---------------------------------------------------------------------------
// KeyRegistry
// ---------------------------------------------------------------------------

/// Append-only surrogate key allocator.
///
/// A key is handed out once per member and never renumbered: re-running
/// with a grown member set appends fresh keys and leaves every existing
/// assignment untouched, so incremental consumers can rely on key
/// stability. A fresh registry fed a whole batch allocates channels in
/// lexicographic order and dates in ascending calendar order, which keeps
/// single-shot rebuilds deterministic and date keys ascending with the
/// calendar.
///
/// The registry is serializable; callers that run incrementally persist it
/// between runs alongside the published tables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyRegistry {
    channels: HashMap<String, u32>,
    dates: HashMap<NaiveDate, u32>,
    next_channel_key: u32,
    next_date_key: u32,
}

impl Default for KeyRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyRegistry {
    pub fn new() -> Self {
        Self {
            channels: HashMap::new(),
            dates: HashMap::new(),
            next_channel_key: 1,
            next_date_key: 1,
        }
    }

    /// Key for a channel name, allocating the next free key on first sight.
    pub fn channel_key(&mut self, name: &str) -> u32 {
        if let Some(&key) = self.channels.get(name) {
            return key;
        }
        let key = self.next_channel_key;
        self.next_channel_key += 1;
        self.channels.insert(name.to_string(), key);
        key
    }

    /// Key for a calendar date, allocating the next free key on first sight.
    pub fn date_key(&mut self, date: NaiveDate) -> u32 {
        if let Some(&key) = self.dates.get(&date) {
            return key;
        }
        let key = self.next_date_key;
        self.next_date_key += 1;
        self.dates.insert(date, key);
        key
    }

    pub fn known_channels(&self) -> usize {
        self.channels.len()
    }

    pub fn known_dates(&self) -> usize {
        self.dates.len()
    }
}

// ---------------------------------------------------------------------------
// Channel dimension
// ---------------------------------------------------------------------------

/// Build the channel dimension from valid curated messages.
///
/// Aggregates are pure functions of each channel's group: min/max post
/// timestamp, post count, mean of the non-null view counts (0.0 when a
/// channel has no view observations). Grouping goes through a BTreeMap so
/// new channels hit the registry in lexicographic order.
pub fn build_channel_dimension(
    messages: &[CuratedMessage],
    registry: &mut KeyRegistry,
) -> Vec<ChannelRow> {
    let mut groups: BTreeMap<&str, Vec<&CuratedMessage>> = BTreeMap::new();
    for msg in messages.iter().filter(|m| m.valid_message) {
        groups.entry(msg.channel_name.as_str()).or_default().push(msg);
    }

    let rows: Vec<ChannelRow> = groups
        .into_iter()
        .map(|(name, group)| {
            let views: Vec<i64> = group.iter().filter_map(|m| m.views).collect();
            let avg_views = if views.is_empty() {
                0.0
            } else {
                views.iter().sum::<i64>() as f64 / views.len() as f64
            };
            ChannelRow {
                channel_key: registry.channel_key(name),
                channel_name: name.to_string(),
                first_post_date: group.iter().filter_map(|m| m.message_date).min(),
                last_post_date: group.iter().filter_map(|m| m.message_date).max(),
                total_posts: group.len() as u32,
                avg_views,
            }
        })
        .collect();

    info!(channels = rows.len(), "Built channel dimension");
    rows
}

// ---------------------------------------------------------------------------
// Date dimension
// ---------------------------------------------------------------------------

/// Build the date dimension from the distinct calendar dates across ALL
/// curated messages. Validity is not consulted here: invalid messages still
/// contribute their dates.
pub fn build_date_dimension(
    messages: &[CuratedMessage],
    registry: &mut KeyRegistry,
) -> Vec<DateRow> {
    let days: BTreeSet<NaiveDate> = messages.iter().filter_map(|m| m.message_day()).collect();

    let rows: Vec<DateRow> = days
        .into_iter()
        .map(|day| date_row(registry.date_key(day), day))
        .collect();

    info!(dates = rows.len(), "Built date dimension");
    rows
}

fn date_row(date_key: u32, full_date: NaiveDate) -> DateRow {
    DateRow {
        date_key,
        full_date,
        year: full_date.year(),
        month: full_date.month(),
        day: full_date.day(),
        quarter: (full_date.month() - 1) / 3 + 1,
        week_of_year: full_date.iso_week().week(),
        day_of_week: day_name(full_date.weekday()).to_string(),
        is_weekend: matches!(full_date.weekday(), Weekday::Sat | Weekday::Sun),
    }
}

fn day_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}
