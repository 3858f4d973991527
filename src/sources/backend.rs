use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::debug;

use crate::domain::{RawEpisode, SourceKind};
use crate::errors::PodfeedResult;
use crate::normalize::{parse_duration, parse_published, seconds_from_f64, strip_html};
use crate::sources::http::{fetch_json, FetchRequest, HttpFetch};
use crate::sources::traits::{fail_soft, EpisodeSource};

pub const DEFAULT_AUTHOR: &str = "Guest Speaker";

/// Accept a duration as a number of seconds or as a duration string.
fn deserialize_duration<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::{self, Visitor};
    use std::fmt;

    struct DurationVisitor;

    impl<'de> Visitor<'de> for DurationVisitor {
        type Value = Option<u64>;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("seconds or a duration string")
        }

        fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E> {
            Ok(Some(v))
        }

        fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E> {
            Ok(u64::try_from(v).ok())
        }

        fn visit_f64<E>(self, v: f64) -> Result<Self::Value, E> {
            Ok(seconds_from_f64(v))
        }

        fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(parse_duration(v))
        }

        fn visit_none<E>(self) -> Result<Self::Value, E> {
            Ok(None)
        }

        fn visit_unit<E>(self) -> Result<Self::Value, E> {
            Ok(None)
        }
    }

    deserializer.deserialize_any(DurationVisitor)
}

/// One row of the managed backend's `podcasts` table.
#[derive(Debug, Deserialize)]
struct ContentRecord {
    id: Value,
    title: Option<String>,
    description: Option<String>,
    author: Option<String>,
    audio_url: Option<String>,
    image_url: Option<String>,
    status: Option<String>,
    engagement_score: Option<f64>,
    view_count: Option<u64>,
    comment_count: Option<u64>,
    share_count: Option<u64>,
    pre_release_date: Option<String>,
    created_at: Option<String>,
    #[serde(default, deserialize_with = "deserialize_duration")]
    duration: Option<u64>,
}

impl ContentRecord {
    fn into_episode(self) -> RawEpisode {
        let published = self
            .pre_release_date
            .as_deref()
            .and_then(parse_published)
            .or_else(|| self.created_at.as_deref().and_then(parse_published));
        let author = self
            .author
            .filter(|a| !a.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_AUTHOR.to_string());

        RawEpisode::new(self.title.unwrap_or_default())
            .with_author(Some(author))
            .with_description(self.description.map(|d| strip_html(&d)).unwrap_or_default())
            .with_published(published)
            .with_audio_url(self.audio_url)
            .with_duration(self.duration)
            .with_image(self.image_url)
            .with_meta("recordId", self.id)
            .with_meta("status", self.status)
            .with_meta("engagementScore", self.engagement_score)
            .with_meta("viewCount", self.view_count)
            .with_meta("commentCount", self.comment_count)
            .with_meta("shareCount", self.share_count)
    }
}

/// Reads the site's own content table through the backend's REST API.
pub struct BackendSource {
    fetcher: Arc<dyn HttpFetch>,
    credentials: Option<(String, String)>,
}

impl BackendSource {
    pub fn new(credentials: Option<(&str, &str)>, fetcher: Arc<dyn HttpFetch>) -> Self {
        Self {
            fetcher,
            credentials: credentials
                .map(|(url, key)| (url.trim_end_matches('/').to_string(), key.to_string())),
        }
    }

    fn request(base_url: &str, key: &str) -> FetchRequest {
        FetchRequest::get(format!(
            "{}/rest/v1/podcasts?select=*&order=pre_release_date.desc",
            base_url
        ))
        .header("apikey", key)
        .bearer(key)
    }

    async fn load(&self, base_url: &str, key: &str) -> PodfeedResult<Vec<RawEpisode>> {
        let records: Vec<ContentRecord> =
            fetch_json(self.fetcher.as_ref(), Self::request(base_url, key)).await?;
        Ok(records.into_iter().map(ContentRecord::into_episode).collect())
    }
}

#[async_trait]
impl EpisodeSource for BackendSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Backend
    }

    fn label(&self) -> &str {
        "Backend"
    }

    async fn fetch(&self) -> Vec<RawEpisode> {
        let Some((base_url, key)) = &self.credentials else {
            debug!("backend credentials not configured, source disabled");
            return Vec::new();
        };
        fail_soft(self.kind(), self.label(), self.load(base_url, key).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::http::MockHttpFetch;

    const ROWS_URL: &str =
        "https://x.example.co/rest/v1/podcasts?select=*&order=pre_release_date.desc";

    const SAMPLE_ROWS: &str = r#"[
      {
        "id": "6f1c2a4e-0000-4000-8000-000000000001",
        "title": "Chairside AI: What Works",
        "description": "<p>Pre-release pitch</p>",
        "author": null,
        "audio_url": null,
        "image_url": "https://img.example/1.jpg",
        "status": "pre_released",
        "engagement_score": 17.5,
        "view_count": 120,
        "comment_count": 4,
        "share_count": 2,
        "pre_release_date": "2024-02-01T09:00:00+00:00",
        "duration": "42:30"
      },
      {
        "id": 2,
        "title": "Published episode",
        "author": "Dr. Jason Garcia",
        "audio_url": "https://cdn.example/2.mp3",
        "status": "published",
        "created_at": "2024-01-10T09:00:00+00:00",
        "duration": 2400
      },
      {
        "id": 3,
        "title": "Draft",
        "duration": "soon"
      }
    ]"#;

    #[tokio::test]
    async fn test_without_credentials_makes_no_calls() {
        let mut fetcher = MockHttpFetch::new();
        fetcher.expect_fetch().times(0);

        let source = BackendSource::new(None, Arc::new(fetcher));
        assert!(source.fetch().await.is_empty());
    }

    #[tokio::test]
    async fn test_sends_key_headers() {
        let mut fetcher = MockHttpFetch::new();
        fetcher
            .expect_fetch()
            .withf(|req| {
                req.url == ROWS_URL
                    && req.headers.contains(&("apikey".to_string(), "anon".to_string()))
                    && req
                        .headers
                        .contains(&("Authorization".to_string(), "Bearer anon".to_string()))
            })
            .times(1)
            .returning(|_| Ok("[]".to_string()));

        let source = BackendSource::new(Some(("https://x.example.co/", "anon")), Arc::new(fetcher));
        assert!(source.fetch().await.is_empty());
    }

    #[tokio::test]
    async fn test_maps_content_records() {
        let mut fetcher = MockHttpFetch::new();
        fetcher
            .expect_fetch()
            .returning(|_| Ok(SAMPLE_ROWS.to_string()));

        let source = BackendSource::new(Some(("https://x.example.co", "anon")), Arc::new(fetcher));
        let episodes = source.fetch().await;
        assert_eq!(episodes.len(), 3);

        let pitch = &episodes[0];
        assert_eq!(pitch.author.as_deref(), Some(DEFAULT_AUTHOR));
        assert_eq!(pitch.description, "Pre-release pitch");
        assert_eq!(pitch.duration_seconds, Some(2550));
        assert_eq!(
            pitch.metadata.get("status").and_then(|v| v.as_str()),
            Some("pre_released")
        );
        assert!(pitch.published_at.is_some());

        let published = &episodes[1];
        assert_eq!(published.author.as_deref(), Some("Dr. Jason Garcia"));
        assert_eq!(published.duration_seconds, Some(2400));
        assert!(published.published_at.is_some(), "falls back to created_at");

        let draft = &episodes[2];
        assert!(draft.duration_seconds.is_none());
        assert!(draft.published_at.is_none());
    }

    #[tokio::test]
    async fn test_oversized_duration_keeps_other_rows() {
        let mut fetcher = MockHttpFetch::new();
        fetcher.expect_fetch().returning(|_| {
            Ok(r#"[
              {"id": 1, "title": "Fine", "duration": "42:30"},
              {"id": 2, "title": "Huge", "duration": "99999999999999999:00:00"},
              {"id": 3, "title": "Huge float", "duration": 1e300}
            ]"#
            .to_string())
        });

        let source = BackendSource::new(Some(("https://x.example.co", "anon")), Arc::new(fetcher));
        let episodes = source.fetch().await;

        assert_eq!(episodes.len(), 3);
        assert_eq!(episodes[0].duration_seconds, Some(2550));
        assert!(episodes[1].duration_seconds.is_none());
        assert!(episodes[2].duration_seconds.is_none());
    }
}
