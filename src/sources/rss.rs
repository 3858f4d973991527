use std::sync::Arc;

use async_trait::async_trait;
use feed_rs::parser;
use serde_json::json;

use crate::config::MAX_ITEMS_PER_FEED;
use crate::domain::{FeedConfig, RawEpisode, SourceKind};
use crate::errors::{PodfeedError, PodfeedResult};
use crate::normalize::strip_html;
use crate::sources::http::{FetchRequest, HttpFetch};
use crate::sources::traits::{fail_soft, EpisodeSource};

/// How the raw feed body is retrieved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedTransport {
    /// GET the feed URL directly
    Direct,
    /// POST `{ "feedUrl": ... }` to a relay that returns the raw body
    Relay(String),
}

pub struct RssSource {
    feed: FeedConfig,
    fetcher: Arc<dyn HttpFetch>,
    transport: FeedTransport,
    max_items: usize,
}

impl RssSource {
    pub fn new(feed: FeedConfig, fetcher: Arc<dyn HttpFetch>) -> Self {
        Self {
            feed,
            fetcher,
            transport: FeedTransport::Direct,
            max_items: 3,
        }
    }

    pub fn with_relay(mut self, relay_url: Option<String>) -> Self {
        self.transport = match relay_url {
            Some(url) => FeedTransport::Relay(url),
            None => FeedTransport::Direct,
        };
        self
    }

    pub fn with_max_items(mut self, max_items: usize) -> Self {
        self.max_items = max_items.clamp(1, MAX_ITEMS_PER_FEED);
        self
    }

    fn request(&self) -> FetchRequest {
        match &self.transport {
            FeedTransport::Direct => FetchRequest::get(self.feed.url.clone()),
            FeedTransport::Relay(relay) => {
                FetchRequest::post_json(relay.clone(), json!({ "feedUrl": self.feed.url }))
            }
        }
    }

    async fn load(&self) -> PodfeedResult<Vec<RawEpisode>> {
        let body = self.fetcher.fetch(self.request()).await?;
        self.episodes_from_bytes(body.as_bytes())
    }

    fn episodes_from_bytes(&self, bytes: &[u8]) -> PodfeedResult<Vec<RawEpisode>> {
        let parsed = parser::parse(bytes).map_err(|e| PodfeedError::FeedParse(e.to_string()))?;
        let feed_image = parsed.logo.as_ref().map(|img| img.uri.clone());

        let episodes = parsed
            .entries
            .into_iter()
            .take(self.max_items)
            .map(|entry| {
                let title = entry.title.map(|t| t.content).unwrap_or_default();

                let author = entry
                    .authors
                    .into_iter()
                    .map(|p| p.name)
                    .find(|name| !name.trim().is_empty())
                    .unwrap_or_else(|| self.feed.name.clone());

                let description = entry
                    .summary
                    .map(|s| s.content)
                    .or_else(|| entry.content.and_then(|c| c.body))
                    .map(|text| strip_html(&text))
                    .unwrap_or_default();

                // Enclosures and itunes fields both land in media objects
                let audio_url = entry
                    .media
                    .iter()
                    .flat_map(|m| m.content.iter())
                    .find_map(|c| c.url.as_ref().map(|u| u.to_string()));

                let duration = entry.media.iter().find_map(|m| {
                    m.duration
                        .or_else(|| m.content.iter().find_map(|c| c.duration))
                        .map(|d| d.as_secs())
                });

                let image = entry
                    .media
                    .iter()
                    .flat_map(|m| m.thumbnails.iter())
                    .map(|t| t.image.uri.clone())
                    .next()
                    .or_else(|| feed_image.clone());

                let link = entry.links.into_iter().map(|l| l.href).next();

                RawEpisode::new(title)
                    .with_author(Some(author))
                    .with_description(description)
                    .with_published(entry.published.or(entry.updated))
                    .with_audio_url(audio_url)
                    .with_duration(duration)
                    .with_image(image)
                    .with_external_url(link)
                    .with_category(Some(self.feed.category.clone()))
                    .with_meta("feedName", self.feed.name.clone())
                    .with_meta("feedUrl", self.feed.url.clone())
            })
            .collect();

        Ok(episodes)
    }
}

#[async_trait]
impl EpisodeSource for RssSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Rss
    }

    fn label(&self) -> &str {
        &self.feed.name
    }

    async fn fetch(&self) -> Vec<RawEpisode> {
        fail_soft(self.kind(), self.label(), self.load().await)
    }
}
