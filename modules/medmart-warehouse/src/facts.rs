//! Fact assembly: dimension-key lookups over curated messages and the
//! detection join on image path.

use std::collections::HashMap;

use chrono::NaiveDate;
use tracing::{info, warn};

use medmart_common::{
    ChannelRow, CuratedMessage, DateRow, DetectionFact, DetectionRecord, MessageFact,
};

/// Which dimension lookup failed for a message that was dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissedDimension {
    Channel,
    Date,
}

impl std::fmt::Display for MissedDimension {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MissedDimension::Channel => write!(f, "channel"),
            MissedDimension::Date => write!(f, "date"),
        }
    }
}

/// A message dropped from the fact table because a required dimension key
/// could not be resolved. A soft count, not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupMiss {
    pub channel_name: String,
    pub message_id: i64,
    pub missed: MissedDimension,
}

#[derive(Debug, Default)]
pub struct MessageFactOutcome {
    pub facts: Vec<MessageFact>,
    pub misses: Vec<LookupMiss>,
}

impl MessageFactOutcome {
    pub fn channel_misses(&self) -> usize {
        self.misses
            .iter()
            .filter(|m| m.missed == MissedDimension::Channel)
            .count()
    }

    pub fn date_misses(&self) -> usize {
        self.misses
            .iter()
            .filter(|m| m.missed == MissedDimension::Date)
            .count()
    }
}

#[derive(Debug, Default)]
pub struct DetectionFactOutcome {
    pub facts: Vec<DetectionFact>,
    /// Detections whose image path matched no message fact. Dropped without
    /// error: they belong to images filtered out upstream.
    pub unmatched: u32,
}

/// Assemble message facts by resolving each valid curated message's channel
/// and calendar date against the dimensions.
///
/// A message whose channel or date has no dimension row is dropped and
/// reported as a lookup miss; the required key columns on the fact row may
/// never be absent. Pure function of its inputs.
pub fn assemble_message_facts(
    messages: &[CuratedMessage],
    channels: &[ChannelRow],
    dates: &[DateRow],
) -> MessageFactOutcome {
    let channel_by_name: HashMap<&str, u32> = channels
        .iter()
        .map(|c| (c.channel_name.as_str(), c.channel_key))
        .collect();
    let date_by_day: HashMap<NaiveDate, u32> =
        dates.iter().map(|d| (d.full_date, d.date_key)).collect();

    let mut outcome = MessageFactOutcome::default();

    for msg in messages.iter().filter(|m| m.valid_message) {
        let Some(&channel_key) = channel_by_name.get(msg.channel_name.as_str()) else {
            outcome.misses.push(miss(msg, MissedDimension::Channel));
            continue;
        };
        let Some(&date_key) = msg.message_day().and_then(|day| date_by_day.get(&day)) else {
            outcome.misses.push(miss(msg, MissedDimension::Date));
            continue;
        };

        outcome.facts.push(MessageFact {
            message_id: msg.message_id,
            channel_key,
            date_key,
            message_text: msg.message_text.clone().unwrap_or_default(),
            message_length: msg.message_length,
            view_count: msg.views.unwrap_or(0),
            forward_count: msg.forwards.unwrap_or(0),
            has_image: msg.has_image,
            image_path: msg.image_path.clone(),
            contains_price: msg.contains_price,
            contains_contact: msg.contains_contact,
        });
    }

    if !outcome.misses.is_empty() {
        warn!(
            misses = outcome.misses.len(),
            "Dropped messages with unresolved dimension keys"
        );
    }
    info!(facts = outcome.facts.len(), "Assembled message facts");
    outcome
}

fn miss(msg: &CuratedMessage, missed: MissedDimension) -> LookupMiss {
    LookupMiss {
        channel_name: msg.channel_name.clone(),
        message_id: msg.message_id,
        missed,
    }
}

/// Inner-join detection results to message facts on `image_path`.
///
/// One detection fact per (detection, matching fact) pair. Empty join keys
/// never match, mirroring SQL null-comparison semantics. Unmatched
/// detections are counted, not reported as errors.
pub fn assemble_detection_facts(
    detections: &[DetectionRecord],
    facts: &[MessageFact],
) -> DetectionFactOutcome {
    let mut facts_by_image: HashMap<&str, Vec<&MessageFact>> = HashMap::new();
    for fact in facts {
        if let Some(path) = fact.image_path.as_deref() {
            if !path.is_empty() {
                facts_by_image.entry(path).or_default().push(fact);
            }
        }
    }

    let mut outcome = DetectionFactOutcome::default();
    for det in detections {
        match facts_by_image.get(det.image_path.as_str()) {
            Some(owners) => {
                for fact in owners {
                    outcome.facts.push(DetectionFact {
                        message_id: fact.message_id,
                        channel_key: fact.channel_key,
                        date_key: fact.date_key,
                        image_path: det.image_path.clone(),
                        detected_class: det.detected_class,
                        confidence_score: det.confidence_score,
                        image_category: det.image_category,
                    });
                }
            }
            None => outcome.unmatched += 1,
        }
    }

    info!(
        facts = outcome.facts.len(),
        unmatched = outcome.unmatched,
        "Assembled detection facts"
    );
    outcome
}
