use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::SourceKind;
use crate::normalize::recency::is_within_window;

/// Source-specific fields that have no slot in the common shape.
pub type SourceMetadata = BTreeMap<String, Value>;

/// What an adapter hands back: an episode-shaped record without identity or
/// live classification. Those are assigned by the aggregator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawEpisode {
    pub title: String,
    pub author: Option<String>,
    pub description: String,
    pub published_at: Option<DateTime<Utc>>,
    pub audio_url: Option<String>,
    pub video_id: Option<String>,
    pub duration_seconds: Option<u64>,
    pub image_url: Option<String>,
    pub external_url: Option<String>,
    pub category: Option<String>,
    pub metadata: SourceMetadata,
}

impl RawEpisode {
    pub fn new(title: String) -> Self {
        Self {
            title,
            author: None,
            description: String::new(),
            published_at: None,
            audio_url: None,
            video_id: None,
            duration_seconds: None,
            image_url: None,
            external_url: None,
            category: None,
            metadata: SourceMetadata::new(),
        }
    }

    pub fn with_author(mut self, author: Option<String>) -> Self {
        self.author = author.filter(|a| !a.trim().is_empty());
        self
    }

    pub fn with_description(mut self, description: String) -> Self {
        self.description = description;
        self
    }

    pub fn with_published(mut self, published_at: Option<DateTime<Utc>>) -> Self {
        self.published_at = published_at;
        self
    }

    pub fn with_audio_url(mut self, audio_url: Option<String>) -> Self {
        self.audio_url = audio_url.filter(|u| !u.is_empty());
        self
    }

    pub fn with_video_id(mut self, video_id: Option<String>) -> Self {
        self.video_id = video_id.filter(|v| !v.is_empty());
        self
    }

    pub fn with_duration(mut self, duration_seconds: Option<u64>) -> Self {
        self.duration_seconds = duration_seconds;
        self
    }

    pub fn with_image(mut self, image_url: Option<String>) -> Self {
        self.image_url = image_url.filter(|u| !u.is_empty());
        self
    }

    pub fn with_external_url(mut self, external_url: Option<String>) -> Self {
        self.external_url = external_url.filter(|u| !u.is_empty());
        self
    }

    pub fn with_category(mut self, category: Option<String>) -> Self {
        self.category = category;
        self
    }

    /// Record a source-specific field; `null` values are skipped.
    pub fn with_meta(mut self, key: &str, value: impl Into<Value>) -> Self {
        let value = value.into();
        if !value.is_null() {
            self.metadata.insert(key.to_string(), value);
        }
        self
    }
}

/// A normalized episode as produced by one aggregation run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Episode {
    pub id: String,
    pub title: String,
    pub author: Option<String>,
    pub description: String,
    pub published_at: DateTime<Utc>,
    pub audio_url: Option<String>,
    pub video_id: Option<String>,
    pub duration_seconds: Option<u64>,
    pub image_url: Option<String>,
    pub external_url: Option<String>,
    pub category: Option<String>,
    pub source: SourceKind,
    pub source_label: String,
    pub source_metadata: SourceMetadata,
    is_live: bool,
}

impl Episode {
    /// Finalize an adapter record. A missing publish date becomes `now`, and
    /// the live flag is derived from `now` and `live_window`.
    pub fn classify(
        raw: RawEpisode,
        id: String,
        source: SourceKind,
        source_label: &str,
        now: DateTime<Utc>,
        live_window: Duration,
    ) -> Self {
        let published_at = raw.published_at.unwrap_or(now);
        let is_live = is_within_window(published_at, now, live_window);

        Self {
            id,
            title: raw.title,
            author: raw.author,
            description: raw.description,
            published_at,
            audio_url: raw.audio_url,
            video_id: raw.video_id,
            duration_seconds: raw.duration_seconds,
            image_url: raw.image_url,
            external_url: raw.external_url,
            category: raw.category,
            source,
            source_label: source_label.to_string(),
            source_metadata: raw.metadata,
            is_live,
        }
    }

    pub fn is_live(&self) -> bool {
        self.is_live
    }

    /// Something the presentation layer can play in place.
    pub fn is_playable(&self) -> bool {
        self.audio_url.is_some() || self.video_id.is_some()
    }

    /// Author to display: the record's own, else the feed or channel name.
    pub fn display_author(&self) -> &str {
        self.author.as_deref().unwrap_or(&self.source_label)
    }

    pub fn trending_rank(&self) -> Option<u64> {
        self.source_metadata.get("trendingRank").and_then(Value::as_u64)
    }
}
