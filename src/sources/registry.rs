use std::sync::Arc;

use crate::config::Config;
use crate::domain::{FeedConfig, SourceKind};
use crate::sources::http::HttpFetch;
use crate::sources::traits::EpisodeSource;
use crate::sources::{
    apple::AppleSource, backend::BackendSource, rss::RssSource, trending::TrendingSource,
    youtube::YouTubeSource,
};

/// Ordered list of sources. Aggregated output follows this order.
#[derive(Clone, Default)]
pub struct SourceRegistry {
    sources: Vec<Arc<dyn EpisodeSource>>,
}

impl SourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The standard lineup: directory search, the selected RSS feeds,
    /// trending, video search, then the site's own content.
    pub fn from_config(config: &Config, feeds: &[FeedConfig], fetcher: Arc<dyn HttpFetch>) -> Self {
        let mut registry = Self::new();

        registry.register(Arc::new(AppleSource::new(&config.apple_query, fetcher.clone())));

        for feed in feeds {
            registry.register(Arc::new(
                RssSource::new(feed.clone(), fetcher.clone())
                    .with_relay(config.rss_relay_url.clone())
                    .with_max_items(config.items_per_feed),
            ));
        }

        registry.register(Arc::new(TrendingSource::new()));
        registry.register(Arc::new(
            YouTubeSource::new(
                config.youtube_api_key.clone(),
                &config.youtube_query,
                fetcher.clone(),
            )
            .with_max_results(config.youtube_max_results),
        ));
        registry.register(Arc::new(BackendSource::new(
            config.backend_credentials(),
            fetcher,
        )));

        registry
    }

    pub fn register(&mut self, source: Arc<dyn EpisodeSource>) {
        self.sources.push(source);
    }

    pub fn sources(&self) -> &[Arc<dyn EpisodeSource>] {
        &self.sources
    }

    pub fn kinds(&self) -> Vec<SourceKind> {
        self.sources.iter().map(|s| s.kind()).collect()
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}
