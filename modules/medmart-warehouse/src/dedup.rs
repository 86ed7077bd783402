//! Collapse re-scraped raw records to one curated row per natural key.

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tracing::info;

use medmart_common::{content, CuratedMessage, RawMessage};

/// Ordering key for picking the winning record within a natural-key group.
///
/// The most recently scraped record wins. Records without a `scraped_at`
/// sort below any timestamp; remaining ties fall back to ingest order
/// (later record wins), so the outcome is deterministic for any input.
fn recency_key(msg: &RawMessage) -> (Option<DateTime<Utc>>, u64) {
    (msg.scraped_at, msg.ingest_seq)
}

/// Deduplicate raw records by `(channel_name, message_id)` and derive the
/// curated content fields from each winning record.
///
/// Exactly one curated row comes out per distinct natural key in the input.
/// Output is sorted by natural key so rebuilt runs are byte-comparable.
pub fn deduplicate(raw: Vec<RawMessage>) -> Vec<CuratedMessage> {
    let records_in = raw.len();
    let mut winners: HashMap<(String, i64), RawMessage> = HashMap::new();

    for msg in raw {
        let key = (msg.channel_name.clone(), msg.message_id);
        match winners.entry(key) {
            Entry::Occupied(mut existing) => {
                if recency_key(&msg) > recency_key(existing.get()) {
                    existing.insert(msg);
                }
            }
            Entry::Vacant(slot) => {
                slot.insert(msg);
            }
        }
    }

    let mut curated: Vec<CuratedMessage> = winners.into_values().map(curate).collect();
    curated.sort_by(|a, b| {
        (a.channel_name.as_str(), a.message_id).cmp(&(b.channel_name.as_str(), b.message_id))
    });

    info!(
        records_in,
        curated = curated.len(),
        collapsed = records_in - curated.len(),
        "Deduplicated raw messages"
    );
    curated
}

fn curate(msg: RawMessage) -> CuratedMessage {
    let text = msg.message_text.as_deref();
    CuratedMessage {
        message_length: content::message_length(text),
        valid_message: content::is_valid_text(text),
        has_image: msg.has_media,
        contains_price: text.map(content::contains_price).unwrap_or(false),
        contains_contact: text.map(content::contains_contact).unwrap_or(false),
        channel_name: msg.channel_name,
        message_id: msg.message_id,
        message_date: msg.message_date,
        message_text: msg.message_text,
        image_path: msg.image_path,
        views: msg.views,
        forwards: msg.forwards,
        scraped_at: msg.scraped_at,
        ingest_seq: msg.ingest_seq,
    }
}
