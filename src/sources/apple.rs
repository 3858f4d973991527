use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use url::Url;

use crate::domain::{RawEpisode, SourceKind};
use crate::errors::{PodfeedError, PodfeedResult};
use crate::normalize::{parse_published, strip_html};
use crate::sources::http::{fetch_json, FetchRequest, HttpFetch};
use crate::sources::traits::{fail_soft, EpisodeSource};

pub const APPLE_SEARCH_URL: &str = "https://itunes.apple.com/search";

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<DirectoryEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DirectoryEntry {
    track_id: Option<u64>,
    track_name: Option<String>,
    artist_name: Option<String>,
    description: Option<String>,
    #[serde(rename = "artworkUrl600")]
    artwork_url_600: Option<String>,
    track_view_url: Option<String>,
    primary_genre_name: Option<String>,
    track_count: Option<u64>,
    average_user_rating: Option<f64>,
    release_date: Option<String>,
}

impl DirectoryEntry {
    fn into_episode(self) -> RawEpisode {
        let published = self.release_date.as_deref().and_then(parse_published);

        RawEpisode::new(self.track_name.unwrap_or_default())
            .with_author(self.artist_name)
            .with_description(self.description.map(|d| strip_html(&d)).unwrap_or_default())
            .with_published(published)
            .with_image(self.artwork_url_600)
            .with_external_url(self.track_view_url)
            .with_category(self.primary_genre_name.clone())
            .with_meta("trackId", self.track_id)
            .with_meta("genre", self.primary_genre_name)
            .with_meta("episodeCount", self.track_count)
            .with_meta("rating", self.average_user_rating)
    }
}

/// Keyword search against the Apple Podcasts directory.
pub struct AppleSource {
    fetcher: Arc<dyn HttpFetch>,
    base_url: String,
    term: String,
    limit: u32,
    country: String,
}

impl AppleSource {
    pub fn new(term: &str, fetcher: Arc<dyn HttpFetch>) -> Self {
        Self {
            fetcher,
            base_url: APPLE_SEARCH_URL.to_string(),
            term: term.to_string(),
            limit: 15,
            country: "us".to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.to_string();
        self
    }

    fn search_url(&self) -> PodfeedResult<String> {
        let limit = self.limit.to_string();
        let url = Url::parse_with_params(
            &self.base_url,
            &[
                ("term", self.term.as_str()),
                ("entity", "podcast"),
                ("limit", limit.as_str()),
                ("country", self.country.as_str()),
            ],
        )
        .map_err(|e| PodfeedError::InvalidUrl(e.to_string()))?;
        Ok(url.into())
    }

    async fn load(&self) -> PodfeedResult<Vec<RawEpisode>> {
        let request = FetchRequest::get(self.search_url()?);
        let response: SearchResponse = fetch_json(self.fetcher.as_ref(), request).await?;

        Ok(response
            .results
            .into_iter()
            .map(DirectoryEntry::into_episode)
            .collect())
    }
}

#[async_trait]
impl EpisodeSource for AppleSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Apple
    }

    fn label(&self) -> &str {
        "Apple Podcasts"
    }

    async fn fetch(&self) -> Vec<RawEpisode> {
        fail_soft(self.kind(), self.label(), self.load().await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::http::MockHttpFetch;

    const SAMPLE_SEARCH: &str = r#"{
      "resultCount": 2,
      "results": [
        {
          "wrapperType": "track",
          "kind": "podcast",
          "trackId": 1234567,
          "artistName": "Dental Hacks Media",
          "trackName": "The Dental Hacks Podcast",
          "trackViewUrl": "https://podcasts.apple.com/us/podcast/id1234567",
          "artworkUrl600": "https://is1.example/600x600bb.jpg",
          "primaryGenreName": "Medicine",
          "trackCount": 412,
          "releaseDate": "2024-01-15T12:00:00Z"
        },
        {
          "wrapperType": "track",
          "trackId": 7654321
        }
      ]
    }"#;

    #[test]
    fn test_search_url_encodes_term() {
        let source = AppleSource::new("medical dental ai", Arc::new(MockHttpFetch::new()));
        let url = source.search_url().unwrap();

        assert!(url.starts_with("https://itunes.apple.com/search?"));
        assert!(url.contains("term=medical+dental+ai"));
        assert!(url.contains("entity=podcast"));
        assert!(url.contains("limit=15"));
        assert!(url.contains("country=us"));
    }

    #[tokio::test]
    async fn test_maps_directory_fields() {
        let mut fetcher = MockHttpFetch::new();
        fetcher
            .expect_fetch()
            .times(1)
            .returning(|_| Ok(SAMPLE_SEARCH.to_string()));

        let episodes = AppleSource::new("dental", Arc::new(fetcher)).fetch().await;
        assert_eq!(episodes.len(), 2);

        let first = &episodes[0];
        assert_eq!(first.title, "The Dental Hacks Podcast");
        assert_eq!(first.author.as_deref(), Some("Dental Hacks Media"));
        assert!(first.audio_url.is_none(), "directory results are not playable");
        assert_eq!(
            first.external_url.as_deref(),
            Some("https://podcasts.apple.com/us/podcast/id1234567")
        );
        assert_eq!(first.image_url.as_deref(), Some("https://is1.example/600x600bb.jpg"));
        assert_eq!(first.metadata.get("trackId").and_then(|v| v.as_u64()), Some(1234567));
        assert_eq!(first.metadata.get("episodeCount").and_then(|v| v.as_u64()), Some(412));
        assert!(!first.metadata.contains_key("rating"));
        assert!(first.published_at.is_some());

        let sparse = &episodes[1];
        assert_eq!(sparse.title, "");
        assert!(sparse.published_at.is_none());
    }

    #[tokio::test]
    async fn test_missing_results_array_is_empty() {
        let mut fetcher = MockHttpFetch::new();
        fetcher
            .expect_fetch()
            .returning(|_| Ok(r#"{"resultCount":0}"#.to_string()));

        assert!(AppleSource::new("x", Arc::new(fetcher)).fetch().await.is_empty());
    }

    #[tokio::test]
    async fn test_http_failure_degrades_to_empty() {
        let mut fetcher = MockHttpFetch::new();
        fetcher.expect_fetch().returning(|req| {
            Err(PodfeedError::HttpStatus {
                status: 503,
                url: req.url,
            })
        });

        assert!(AppleSource::new("x", Arc::new(fetcher)).fetch().await.is_empty());
    }
}
