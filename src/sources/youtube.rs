use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;
use url::Url;

use crate::domain::{RawEpisode, SourceKind};
use crate::errors::{PodfeedError, PodfeedResult};
use crate::normalize::{parse_published, strip_html};
use crate::sources::http::{fetch_json, FetchRequest, HttpFetch};
use crate::sources::traits::{fail_soft, EpisodeSource};

pub const YOUTUBE_SEARCH_URL: &str = "https://www.googleapis.com/youtube/v3/search";

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    id: VideoRef,
    #[serde(default)]
    snippet: Snippet,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VideoRef {
    video_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Snippet {
    title: Option<String>,
    description: Option<String>,
    channel_title: Option<String>,
    published_at: Option<String>,
    #[serde(default)]
    thumbnails: Thumbnails,
}

#[derive(Debug, Default, Deserialize)]
struct Thumbnails {
    high: Option<Thumbnail>,
    medium: Option<Thumbnail>,
    default: Option<Thumbnail>,
}

#[derive(Debug, Deserialize)]
struct Thumbnail {
    url: String,
}

impl SearchItem {
    fn into_episode(self) -> RawEpisode {
        let snippet = self.snippet;
        let thumbnail = snippet
            .thumbnails
            .high
            .or(snippet.thumbnails.medium)
            .or(snippet.thumbnails.default)
            .map(|t| t.url);
        let watch_url = self
            .id
            .video_id
            .as_ref()
            .map(|id| format!("https://www.youtube.com/watch?v={}", id));

        RawEpisode::new(strip_html(&snippet.title.unwrap_or_default()))
            .with_author(snippet.channel_title)
            .with_description(snippet.description.map(|d| strip_html(&d)).unwrap_or_default())
            .with_published(snippet.published_at.as_deref().and_then(parse_published))
            .with_video_id(self.id.video_id)
            .with_image(thumbnail)
            .with_external_url(watch_url)
    }
}

/// Video search. Inert without an API key.
pub struct YouTubeSource {
    fetcher: Arc<dyn HttpFetch>,
    api_key: Option<String>,
    base_url: String,
    query: String,
    max_results: u32,
}

impl YouTubeSource {
    pub fn new(api_key: Option<String>, query: &str, fetcher: Arc<dyn HttpFetch>) -> Self {
        Self {
            fetcher,
            api_key,
            base_url: YOUTUBE_SEARCH_URL.to_string(),
            query: query.to_string(),
            max_results: 15,
        }
    }

    pub fn with_max_results(mut self, max_results: u32) -> Self {
        self.max_results = max_results;
        self
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.to_string();
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.api_key.is_some()
    }

    fn search_url(&self, api_key: &str) -> PodfeedResult<String> {
        let max_results = self.max_results.to_string();
        let url = Url::parse_with_params(
            &self.base_url,
            &[
                ("part", "snippet"),
                ("q", self.query.as_str()),
                ("type", "video"),
                ("videoDuration", "long"),
                ("maxResults", max_results.as_str()),
                ("key", api_key),
            ],
        )
        .map_err(|e| PodfeedError::InvalidUrl(e.to_string()))?;
        Ok(url.into())
    }

    async fn load(&self, api_key: &str) -> PodfeedResult<Vec<RawEpisode>> {
        let request = FetchRequest::get(self.search_url(api_key)?);
        let response: SearchResponse = fetch_json(self.fetcher.as_ref(), request).await?;

        Ok(response
            .items
            .into_iter()
            .filter(|item| item.id.video_id.is_some())
            .map(SearchItem::into_episode)
            .collect())
    }
}

#[async_trait]
impl EpisodeSource for YouTubeSource {
    fn kind(&self) -> SourceKind {
        SourceKind::YouTube
    }

    fn label(&self) -> &str {
        "YouTube"
    }

    async fn fetch(&self) -> Vec<RawEpisode> {
        let Some(api_key) = self.api_key.as_deref() else {
            debug!("YouTube API key not configured, source disabled");
            return Vec::new();
        };
        fail_soft(self.kind(), self.label(), self.load(api_key).await)
    }
}
