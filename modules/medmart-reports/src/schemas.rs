use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A term and how often it appears across all message facts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermCount {
    pub term: String,
    pub count: u64,
}

/// Posting volume for one channel on one calendar date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelActivity {
    pub date: NaiveDate,
    pub message_count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageSearchResult {
    pub message_id: i64,
    pub channel_name: String,
    pub message_text: String,
    pub message_date: NaiveDate,
}

/// Image usage statistics for one channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisualContentStats {
    pub channel_name: String,
    pub total_images: u64,
    pub unique_images: u64,
    pub messages_with_images: u64,
}

/// Posting-volume change over the two most recent 7-day windows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrendingChannel {
    pub channel_name: String,
    pub last_7_days: u64,
    pub prev_7_days: u64,
    pub increase: i64,
}
