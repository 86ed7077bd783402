use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

// --- Raw layer ---

/// A single scraped message record as it arrives from the raw data lake.
///
/// The same `(channel_name, message_id)` pair may appear many times because
/// every scrape run re-ingests a channel's recent history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawMessage {
    pub channel_name: String,
    pub message_id: i64,
    pub message_date: Option<DateTime<Utc>>,
    pub message_text: Option<String>,
    pub has_media: bool,
    pub image_path: Option<String>,
    pub views: Option<i64>,
    pub forwards: Option<i64>,
    pub scraped_at: Option<DateTime<Utc>>,
    /// Position in the ingest stream. Stable tie-break key for dedup.
    pub ingest_seq: u64,
}

impl RawMessage {
    /// Natural key of the source message. Repeats across scrape runs.
    pub fn natural_key(&self) -> (&str, i64) {
        (self.channel_name.as_str(), self.message_id)
    }
}

// --- Curated layer ---

/// One row per `(channel_name, message_id)` after deduplication: the winning
/// raw record plus fields derived from its content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CuratedMessage {
    pub channel_name: String,
    pub message_id: i64,
    pub message_date: Option<DateTime<Utc>>,
    pub message_text: Option<String>,
    pub message_length: u32,
    /// Text is present and non-empty. Only valid messages become facts.
    pub valid_message: bool,
    pub has_image: bool,
    pub image_path: Option<String>,
    pub views: Option<i64>,
    pub forwards: Option<i64>,
    pub scraped_at: Option<DateTime<Utc>>,
    pub contains_price: bool,
    pub contains_contact: bool,
    pub ingest_seq: u64,
}

impl CuratedMessage {
    /// Calendar date of the message, if it carries a timestamp.
    pub fn message_day(&self) -> Option<NaiveDate> {
        self.message_date.map(|d| d.date_naive())
    }
}

// --- Dimensions ---

/// Channel dimension row. `channel_key` is a surrogate key allocated once
/// per channel name and never renumbered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelRow {
    pub channel_key: u32,
    pub channel_name: String,
    pub first_post_date: Option<DateTime<Utc>>,
    pub last_post_date: Option<DateTime<Utc>>,
    pub total_posts: u32,
    pub avg_views: f64,
}

/// Date dimension row. Calendar attributes are pure, timezone-naive
/// functions of `full_date`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DateRow {
    pub date_key: u32,
    pub full_date: NaiveDate,
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub quarter: u32,
    pub week_of_year: u32,
    pub day_of_week: String,
    pub is_weekend: bool,
}

// --- Facts ---

/// Message fact row. One per valid curated message whose channel and date
/// both resolved to dimension rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageFact {
    pub message_id: i64,
    pub channel_key: u32,
    pub date_key: u32,
    pub message_text: String,
    pub message_length: u32,
    pub view_count: i64,
    pub forward_count: i64,
    pub has_image: bool,
    pub image_path: Option<String>,
    pub contains_price: bool,
    pub contains_contact: bool,
}

/// One object-detection result for an image, produced by the external
/// image-analysis collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionRecord {
    pub image_path: String,
    /// COCO class index of the detected object.
    pub detected_class: u32,
    pub confidence_score: f64,
    pub image_category: ImageCategory,
}

/// Detection fact row: a detection result joined to the message fact that
/// owns its image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionFact {
    pub message_id: i64,
    pub channel_key: u32,
    pub date_key: u32,
    pub image_path: String,
    pub detected_class: u32,
    pub confidence_score: f64,
    pub image_category: ImageCategory,
}

// --- Image classification ---

/// COCO class index for 'person'.
pub const PERSON_CLASS: u32 = 0;

/// COCO class indexes for container-like objects (bottle, cup, bowl,
/// wine glass, and friends).
pub const CONTAINER_CLASSES: [u32; 11] = [39, 41, 46, 47, 48, 49, 50, 51, 52, 53, 54];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageCategory {
    Promotional,
    ProductDisplay,
    Lifestyle,
    Other,
}

impl std::fmt::Display for ImageCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ImageCategory::Promotional => write!(f, "promotional"),
            ImageCategory::ProductDisplay => write!(f, "product_display"),
            ImageCategory::Lifestyle => write!(f, "lifestyle"),
            ImageCategory::Other => write!(f, "other"),
        }
    }
}

impl ImageCategory {
    pub fn from_str_loose(s: &str) -> Self {
        match s {
            "promotional" => Self::Promotional,
            "product_display" => Self::ProductDisplay,
            "lifestyle" => Self::Lifestyle,
            _ => Self::Other,
        }
    }

    /// Classify an image from the set of COCO classes detected in it.
    /// A person together with a container-like object reads as promotional
    /// content; containers alone as a product display; a person alone as
    /// lifestyle content.
    pub fn from_detected_classes(classes: &[u32]) -> Self {
        let person = classes.contains(&PERSON_CLASS);
        let container = classes.iter().any(|c| CONTAINER_CLASSES.contains(c));
        match (person, container) {
            (true, true) => Self::Promotional,
            (false, true) => Self::ProductDisplay,
            (true, false) => Self::Lifestyle,
            (false, false) => Self::Other,
        }
    }
}
