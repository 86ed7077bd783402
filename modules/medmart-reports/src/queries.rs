//! Aggregate queries over the warehouse snapshot.
//!
//! Each query is deterministic for a given snapshot: result sets carry a
//! total order (count, then name or date) so equal inputs render equal
//! output. Time-windowed queries take the reference date as an explicit
//! parameter instead of reading the wall clock.

use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

use chrono::{Days, NaiveDate};
use regex::Regex;

use medmart_warehouse::WarehouseSnapshot;

use crate::schemas::{
    ChannelActivity, MessageSearchResult, TermCount, TrendingChannel, VisualContentStats,
};

/// Common English stopwords excluded from term counting.
const STOPWORDS: &[&str] = &[
    "the", "and", "for", "with", "are", "from", "that", "this", "was", "but", "not", "all",
    "you", "your", "has", "have", "had", "his", "her", "she", "him", "our", "out", "who",
    "how", "why", "can", "will", "would", "could", "should", "may", "might", "shall", "do",
    "did", "does", "of", "on", "in", "to", "by", "as", "at", "an", "or", "if", "is", "it",
    "be", "been", "so", "we", "they", "their", "them", "a", "i", "he", "my", "me", "no",
    "yes", "up", "down", "over", "under", "about", "into", "than", "then", "too", "very",
    "just", "more", "most", "some", "such", "only", "own", "same", "other", "each", "any",
    "both", "few", "which", "what", "when", "where", "while", "again", "further", "once",
    "here", "there", "after", "before", "because", "during", "between", "through", "above",
    "below", "off", "against", "until", "upon", "these", "those", "doing", "being",
    "having", "also", "per", "via", "etc", "now", "new", "get", "one", "two", "day",
    "today", "see", "use", "were", "its", "let", "yet", "way", "far", "even",
    "ever", "still", "much", "many", "back", "made", "make", "like", "well", "good",
];

static NON_ALNUM_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^a-z0-9 ]").unwrap());

static STOPWORD_SET: LazyLock<HashSet<&'static str>> =
    LazyLock::new(|| STOPWORDS.iter().copied().collect());

/// The most frequently mentioned terms across all message facts.
///
/// Tokenization mirrors the warehouse's original term report: lowercase,
/// strip everything outside `[a-z0-9 ]`, split on whitespace, keep tokens
/// longer than two characters that are not stopwords.
pub fn top_terms(snapshot: &WarehouseSnapshot, limit: usize) -> Vec<TermCount> {
    let mut counts: HashMap<String, u64> = HashMap::new();
    for fact in &snapshot.message_facts {
        let lowered = fact.message_text.to_lowercase();
        let cleaned = NON_ALNUM_RE.replace_all(&lowered, "");
        for token in cleaned.split_whitespace() {
            if token.len() > 2 && !STOPWORD_SET.contains(token) {
                *counts.entry(token.to_string()).or_insert(0) += 1;
            }
        }
    }

    let mut terms: Vec<TermCount> = counts
        .into_iter()
        .map(|(term, count)| TermCount { term, count })
        .collect();
    terms.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.term.cmp(&b.term)));
    terms.truncate(limit);
    terms
}

/// Per-date posting counts for one channel, ascending by date.
/// `None` when the channel is not in the dimension.
pub fn channel_activity(
    snapshot: &WarehouseSnapshot,
    channel_name: &str,
) -> Option<Vec<ChannelActivity>> {
    let channel = snapshot.channel_named(channel_name)?;

    let mut by_date: HashMap<NaiveDate, u64> = HashMap::new();
    for fact in &snapshot.message_facts {
        if fact.channel_key != channel.channel_key {
            continue;
        }
        if let Some(date) = snapshot.date(fact.date_key) {
            *by_date.entry(date.full_date).or_insert(0) += 1;
        }
    }

    let mut activity: Vec<ChannelActivity> = by_date
        .into_iter()
        .map(|(date, message_count)| ChannelActivity { date, message_count })
        .collect();
    activity.sort_by_key(|a| a.date);
    Some(activity)
}

/// Case-insensitive substring search over message facts, newest first.
pub fn search_messages(
    snapshot: &WarehouseSnapshot,
    query: &str,
    limit: usize,
) -> Vec<MessageSearchResult> {
    let needle = query.to_lowercase();

    let mut hits: Vec<MessageSearchResult> = snapshot
        .message_facts
        .iter()
        .filter(|f| f.message_text.to_lowercase().contains(&needle))
        .filter_map(|f| {
            let date = snapshot.date(f.date_key)?;
            let channel = snapshot.channel(f.channel_key)?;
            Some(MessageSearchResult {
                message_id: f.message_id,
                channel_name: channel.channel_name.clone(),
                message_text: f.message_text.clone(),
                message_date: date.full_date,
            })
        })
        .collect();

    hits.sort_by(|a, b| {
        b.message_date
            .cmp(&a.message_date)
            .then_with(|| b.message_id.cmp(&a.message_id))
    });
    hits.truncate(limit);
    hits
}

/// Image usage per channel, ordered by distinct image count descending.
pub fn visual_content_stats(snapshot: &WarehouseSnapshot) -> Vec<VisualContentStats> {
    struct Bucket<'a> {
        total: u64,
        paths: HashSet<&'a str>,
        messages: HashSet<i64>,
    }

    let mut by_channel: HashMap<u32, Bucket<'_>> = HashMap::new();
    for fact in &snapshot.message_facts {
        let Some(path) = fact.image_path.as_deref() else {
            continue;
        };
        let bucket = by_channel.entry(fact.channel_key).or_insert_with(|| Bucket {
            total: 0,
            paths: HashSet::new(),
            messages: HashSet::new(),
        });
        bucket.total += 1;
        bucket.paths.insert(path);
        bucket.messages.insert(fact.message_id);
    }

    let mut stats: Vec<VisualContentStats> = by_channel
        .into_iter()
        .filter_map(|(channel_key, bucket)| {
            let channel = snapshot.channel(channel_key)?;
            Some(VisualContentStats {
                channel_name: channel.channel_name.clone(),
                total_images: bucket.total,
                unique_images: bucket.paths.len() as u64,
                messages_with_images: bucket.messages.len() as u64,
            })
        })
        .collect();
    stats.sort_by(|a, b| {
        b.unique_images
            .cmp(&a.unique_images)
            .then_with(|| a.channel_name.cmp(&b.channel_name))
    });
    stats
}

/// Channels ranked by posting-volume increase: the 7 days ending at `as_of`
/// against the 7 days before that.
pub fn trending_channels(
    snapshot: &WarehouseSnapshot,
    as_of: NaiveDate,
    limit: usize,
) -> Vec<TrendingChannel> {
    let week_ago = as_of - Days::new(7);
    let two_weeks_ago = as_of - Days::new(14);

    let mut windows: HashMap<u32, (u64, u64)> = HashMap::new();
    for fact in &snapshot.message_facts {
        let Some(date) = snapshot.date(fact.date_key) else {
            continue;
        };
        let entry = windows.entry(fact.channel_key).or_insert((0, 0));
        if date.full_date >= week_ago {
            entry.0 += 1;
        } else if date.full_date >= two_weeks_ago {
            entry.1 += 1;
        }
    }

    let mut trending: Vec<TrendingChannel> = windows
        .into_iter()
        .filter_map(|(channel_key, (last_7_days, prev_7_days))| {
            let channel = snapshot.channel(channel_key)?;
            Some(TrendingChannel {
                channel_name: channel.channel_name.clone(),
                last_7_days,
                prev_7_days,
                increase: last_7_days as i64 - prev_7_days as i64,
            })
        })
        .collect();
    trending.sort_by(|a, b| {
        b.increase
            .cmp(&a.increase)
            .then_with(|| b.last_7_days.cmp(&a.last_7_days))
            .then_with(|| a.channel_name.cmp(&b.channel_name))
    });
    trending.truncate(limit);
    trending
}

#[cfg(test)]
mod tests {
    use super::*;
    use medmart_common::{ChannelRow, DateRow, MessageFact};

    fn channel(key: u32, name: &str) -> ChannelRow {
        ChannelRow {
            channel_key: key,
            channel_name: name.to_string(),
            first_post_date: None,
            last_post_date: None,
            total_posts: 0,
            avg_views: 0.0,
        }
    }

    fn date(key: u32, day: &str) -> DateRow {
        let full_date: NaiveDate = day.parse().unwrap();
        DateRow {
            date_key: key,
            full_date,
            year: 2025,
            month: 7,
            day: 1,
            quarter: 3,
            week_of_year: 27,
            day_of_week: "Tuesday".to_string(),
            is_weekend: false,
        }
    }

    fn fact(channel_key: u32, date_key: u32, id: i64, text: &str, image: Option<&str>) -> MessageFact {
        MessageFact {
            message_id: id,
            channel_key,
            date_key,
            message_text: text.to_string(),
            message_length: text.chars().count() as u32,
            view_count: 0,
            forward_count: 0,
            has_image: image.is_some(),
            image_path: image.map(str::to_string),
            contains_price: false,
            contains_contact: false,
        }
    }

    fn snapshot() -> WarehouseSnapshot {
        WarehouseSnapshot::new(
            vec![channel(1, "lobelia"), channel(2, "tikvah")],
            vec![
                date(1, "2025-07-01"),
                date(2, "2025-07-10"),
                date(3, "2025-07-14"),
            ],
            vec![
                fact(1, 1, 1, "Paracetamol and paracetamol again!", None),
                fact(1, 2, 2, "Paracetamol for the clinic", Some("img/a.jpg")),
                fact(2, 2, 3, "Ibuprofen in stock", Some("img/b.jpg")),
                fact(2, 3, 4, "Ibuprofen restock, see photo", Some("img/b.jpg")),
            ],
            Vec::new(),
        )
    }

    #[test]
    fn top_terms_count_and_filter_stopwords() {
        let terms = top_terms(&snapshot(), 10);
        assert_eq!(terms[0].term, "paracetamol");
        assert_eq!(terms[0].count, 3);
        assert!(terms.iter().all(|t| t.term != "the" && t.term != "and"));
        assert!(terms.iter().all(|t| t.term.len() > 2));
    }

    #[test]
    fn top_terms_limit_and_tie_order() {
        let terms = top_terms(&snapshot(), 2);
        assert_eq!(terms.len(), 2);
        assert_eq!(terms[0].term, "paracetamol");
        // "ibuprofen" appears twice; ties below it order alphabetically.
        assert_eq!(terms[1].term, "ibuprofen");
    }

    #[test]
    fn activity_counts_per_date_ascending() {
        let activity = channel_activity(&snapshot(), "lobelia").unwrap();
        assert_eq!(activity.len(), 2);
        assert_eq!(activity[0].date.to_string(), "2025-07-01");
        assert_eq!(activity[0].message_count, 1);
        assert_eq!(activity[1].date.to_string(), "2025-07-10");
    }

    #[test]
    fn activity_for_unknown_channel_is_none() {
        assert!(channel_activity(&snapshot(), "ghost").is_none());
    }

    #[test]
    fn search_is_case_insensitive_and_newest_first() {
        let hits = search_messages(&snapshot(), "IBUPROFEN", 10);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].message_id, 4);
        assert_eq!(hits[0].message_date.to_string(), "2025-07-14");
        assert_eq!(hits[1].message_id, 3);
    }

    #[test]
    fn search_respects_the_limit() {
        let hits = search_messages(&snapshot(), "o", 1);
        assert_eq!(hits.len(), 1);
    }

    #[test]
    fn visual_stats_distinguish_total_and_unique() {
        let stats = visual_content_stats(&snapshot());
        // tikvah posted the same image twice: 2 total, 1 unique, 2 messages.
        let tikvah = stats.iter().find(|s| s.channel_name == "tikvah").unwrap();
        assert_eq!(tikvah.total_images, 2);
        assert_eq!(tikvah.unique_images, 1);
        assert_eq!(tikvah.messages_with_images, 2);
        // Equal unique counts order alphabetically.
        assert_eq!(stats[0].channel_name, "lobelia");
    }

    #[test]
    fn trending_windows_split_on_the_reference_date() {
        let as_of: NaiveDate = "2025-07-15".parse().unwrap();
        let trending = trending_channels(&snapshot(), as_of, 10);

        // tikvah: both posts inside the last 7 days. lobelia: one post in
        // each window.
        assert_eq!(trending[0].channel_name, "tikvah");
        assert_eq!(trending[0].last_7_days, 2);
        assert_eq!(trending[0].prev_7_days, 0);
        assert_eq!(trending[0].increase, 2);

        let lobelia = trending.iter().find(|t| t.channel_name == "lobelia").unwrap();
        assert_eq!(lobelia.last_7_days, 1);
        assert_eq!(lobelia.prev_7_days, 1);
        assert_eq!(lobelia.increase, 0);
    }
}
