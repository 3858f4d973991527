use std::collections::BTreeMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use futures::FutureExt;
use serde::Serialize;
use tracing::{info, warn};

use crate::config::Config;
use crate::domain::{Episode, RawEpisode, SourceKind};
use crate::sources::{EpisodeSource, SourceRegistry};

#[derive(Debug, Clone)]
pub struct AggregateOptions {
    pub live_window: Duration,
    /// Per-source limit; a source that runs over contributes nothing.
    pub source_timeout: Option<Duration>,
    pub clock: fn() -> DateTime<Utc>,
}

impl Default for AggregateOptions {
    fn default() -> Self {
        Self {
            live_window: Duration::from_secs(24 * 60 * 60),
            source_timeout: Some(Duration::from_secs(20)),
            clock: Utc::now,
        }
    }
}

impl AggregateOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            live_window: config.live_window,
            source_timeout: Some(config.source_timeout),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum SourceStatus {
    Fetched { count: usize },
    TimedOut,
    Panicked,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceOutcome {
    pub kind: SourceKind,
    pub label: String,
    #[serde(flatten)]
    pub status: SourceStatus,
}

/// Badge counts per category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FeedCounts {
    pub total: usize,
    pub live: usize,
    pub rss: usize,
    pub apple: usize,
    pub youtube: usize,
    pub trending: usize,
    pub backend: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateResult {
    pub generated_at: DateTime<Utc>,
    pub by_source: BTreeMap<SourceKind, Vec<Episode>>,
    pub flat: Vec<Episode>,
    pub live: Vec<Episode>,
    pub outcomes: Vec<SourceOutcome>,
}

impl AggregateResult {
    pub fn is_empty(&self) -> bool {
        self.flat.is_empty()
    }

    pub fn episodes_for(&self, kind: SourceKind) -> &[Episode] {
        self.by_source.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn counts(&self) -> FeedCounts {
        FeedCounts {
            total: self.flat.len(),
            live: self.live.len(),
            rss: self.episodes_for(SourceKind::Rss).len(),
            apple: self.episodes_for(SourceKind::Apple).len(),
            youtube: self.episodes_for(SourceKind::YouTube).len(),
            trending: self.episodes_for(SourceKind::TrendingIndex).len(),
            backend: self.episodes_for(SourceKind::Backend).len(),
        }
    }

    /// Sources that timed out or panicked in this run.
    pub fn failed_sources(&self) -> Vec<&SourceOutcome> {
        self.outcomes
            .iter()
            .filter(|o| !matches!(o.status, SourceStatus::Fetched { .. }))
            .collect()
    }
}

async fn run_isolated(
    source: &dyn EpisodeSource,
    timeout: Option<Duration>,
) -> (Vec<RawEpisode>, SourceStatus) {
    let guarded = AssertUnwindSafe(source.fetch()).catch_unwind();

    let settled = match timeout {
        Some(limit) => match tokio::time::timeout(limit, guarded).await {
            Ok(settled) => settled,
            Err(_) => {
                warn!(source = %source.kind(), label = source.label(), "source timed out");
                return (Vec::new(), SourceStatus::TimedOut);
            }
        },
        None => guarded.await,
    };

    match settled {
        Ok(episodes) => {
            let count = episodes.len();
            (episodes, SourceStatus::Fetched { count })
        }
        Err(_) => {
            warn!(source = %source.kind(), label = source.label(), "source panicked");
            (Vec::new(), SourceStatus::Panicked)
        }
    }
}

/// Fetch every source concurrently and merge the results in source order.
pub async fn aggregate_all(
    sources: &[Arc<dyn EpisodeSource>],
    options: &AggregateOptions,
) -> AggregateResult {
    let settled = join_all(
        sources
            .iter()
            .map(|source| run_isolated(source.as_ref(), options.source_timeout)),
    )
    .await;

    // Classification happens after everything settles, not per adapter
    let now = (options.clock)();

    let mut by_source: BTreeMap<SourceKind, Vec<Episode>> = BTreeMap::new();
    let mut flat = Vec::new();
    let mut outcomes = Vec::with_capacity(sources.len());

    for (slot, (source, (raws, status))) in sources.iter().zip(settled).enumerate() {
        let kind = source.kind();
        let label = source.label();

        for (index, raw) in raws.into_iter().enumerate() {
            let id = format!("{}-{}-{}", kind, slot, index);
            let episode = Episode::classify(raw, id, kind, label, now, options.live_window);
            by_source.entry(kind).or_default().push(episode.clone());
            flat.push(episode);
        }

        outcomes.push(SourceOutcome {
            kind,
            label: label.to_string(),
            status,
        });
    }

    let live: Vec<Episode> = flat.iter().filter(|e| e.is_live()).cloned().collect();

    info!(
        sources = sources.len(),
        episodes = flat.len(),
        live = live.len(),
        "aggregation finished"
    );

    AggregateResult {
        generated_at: now,
        by_source,
        flat,
        live,
        outcomes,
    }
}

pub struct AggregateService {
    registry: SourceRegistry,
    options: AggregateOptions,
}

impl AggregateService {
    pub fn new(registry: SourceRegistry, options: AggregateOptions) -> Self {
        Self { registry, options }
    }

    pub async fn aggregate(&self) -> AggregateResult {
        aggregate_all(self.registry.sources(), &self.options).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{Duration as ChronoDuration, TimeZone};

    struct StaticSource {
        kind: SourceKind,
        label: String,
        episodes: Vec<RawEpisode>,
    }

    impl StaticSource {
        fn new(kind: SourceKind, label: &str, episodes: Vec<RawEpisode>) -> Arc<dyn EpisodeSource> {
            Arc::new(Self {
                kind,
                label: label.to_string(),
                episodes,
            })
        }
    }

    #[async_trait]
    impl EpisodeSource for StaticSource {
        fn kind(&self) -> SourceKind {
            self.kind
        }

        fn label(&self) -> &str {
            &self.label
        }

        async fn fetch(&self) -> Vec<RawEpisode> {
            self.episodes.clone()
        }
    }

    struct PanickingSource;

    #[async_trait]
    impl EpisodeSource for PanickingSource {
        fn kind(&self) -> SourceKind {
            SourceKind::Apple
        }

        fn label(&self) -> &str {
            "broken"
        }

        async fn fetch(&self) -> Vec<RawEpisode> {
            panic!("adapter bug");
        }
    }

    struct SlowSource;

    #[async_trait]
    impl EpisodeSource for SlowSource {
        fn kind(&self) -> SourceKind {
            SourceKind::Rss
        }

        fn label(&self) -> &str {
            "slow"
        }

        async fn fetch(&self) -> Vec<RawEpisode> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            vec![RawEpisode::new("too late".to_string())]
        }
    }

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    fn options() -> AggregateOptions {
        AggregateOptions {
            clock: fixed_now,
            source_timeout: Some(Duration::from_secs(5)),
            ..AggregateOptions::default()
        }
    }

    fn episode_aged(title: &str, age: ChronoDuration) -> RawEpisode {
        RawEpisode::new(title.to_string()).with_published(Some(fixed_now() - age))
    }

    #[tokio::test]
    async fn test_failing_source_does_not_affect_others() {
        let sources = vec![
            Arc::new(PanickingSource) as Arc<dyn EpisodeSource>,
            StaticSource::new(
                SourceKind::Rss,
                "ok",
                vec![episode_aged("fine", ChronoDuration::hours(1))],
            ),
        ];

        let result = aggregate_all(&sources, &options()).await;

        assert_eq!(result.flat.len(), 1);
        assert_eq!(result.flat[0].source_label, "ok");
        assert!(result.episodes_for(SourceKind::Apple).is_empty());
        assert_eq!(result.failed_sources().len(), 1);
        assert_eq!(result.outcomes[0].status, SourceStatus::Panicked);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_source_times_out() {
        let sources = vec![
            Arc::new(SlowSource) as Arc<dyn EpisodeSource>,
            StaticSource::new(
                SourceKind::Apple,
                "apple",
                vec![episode_aged("a", ChronoDuration::days(2))],
            ),
        ];

        let result = aggregate_all(&sources, &options()).await;

        assert_eq!(result.flat.len(), 1);
        assert_eq!(result.outcomes[0].status, SourceStatus::TimedOut);
        assert_eq!(result.outcomes[1].status, SourceStatus::Fetched { count: 1 });
    }

    #[tokio::test]
    async fn test_output_follows_source_order_not_dates() {
        let sources = vec![
            StaticSource::new(
                SourceKind::Apple,
                "apple",
                vec![episode_aged("old", ChronoDuration::days(10))],
            ),
            StaticSource::new(
                SourceKind::Rss,
                "rss",
                vec![
                    episode_aged("newer", ChronoDuration::hours(1)),
                    episode_aged("newest", ChronoDuration::minutes(5)),
                ],
            ),
        ];

        let result = aggregate_all(&sources, &options()).await;
        let titles: Vec<&str> = result.flat.iter().map(|e| e.title.as_str()).collect();

        assert_eq!(titles, vec!["old", "newer", "newest"]);
        assert_eq!(result.flat[0].id, "apple-0-0");
        assert_eq!(result.flat[2].id, "rss-1-1");
    }

    #[tokio::test]
    async fn test_live_classification_and_counts() {
        let sources = vec![
            StaticSource::new(
                SourceKind::Rss,
                "rss",
                vec![
                    episode_aged("two hours", ChronoDuration::hours(2)),
                    episode_aged("exactly a day", ChronoDuration::hours(24)),
                    episode_aged("last week", ChronoDuration::days(7)),
                ],
            ),
            StaticSource::new(
                SourceKind::TrendingIndex,
                "trending",
                vec![episode_aged("ranked", ChronoDuration::days(3))],
            ),
        ];

        let result = aggregate_all(&sources, &options()).await;

        let live: Vec<&str> = result.live.iter().map(|e| e.title.as_str()).collect();
        assert_eq!(live, vec!["two hours"]);

        let counts = result.counts();
        assert_eq!(counts.total, 4);
        assert_eq!(counts.live, 1);
        assert_eq!(counts.rss, 3);
        assert_eq!(counts.trending, 1);
        assert_eq!(counts.apple, 0);
    }

    #[tokio::test]
    async fn test_undated_records_default_to_aggregation_time() {
        let sources = vec![StaticSource::new(
            SourceKind::Backend,
            "backend",
            vec![RawEpisode::new("undated".to_string())],
        )];

        let result = aggregate_all(&sources, &options()).await;

        assert_eq!(result.flat[0].published_at, fixed_now());
        assert!(result.flat[0].is_live());
        assert_eq!(result.generated_at, fixed_now());
    }

    #[tokio::test]
    async fn test_rerun_is_idempotent_in_content() {
        let sources = vec![StaticSource::new(
            SourceKind::Rss,
            "rss",
            vec![
                episode_aged("a", ChronoDuration::hours(3)),
                episode_aged("b", ChronoDuration::days(3)),
            ],
        )];

        let first = aggregate_all(&sources, &options()).await;
        let second = aggregate_all(&sources, &options()).await;

        assert_eq!(first.flat, second.flat);
        assert_eq!(first.live, second.live);
    }

    #[tokio::test]
    async fn test_no_sources_is_empty() {
        let result = aggregate_all(&[], &options()).await;
        assert!(result.is_empty());
        assert_eq!(result.counts(), FeedCounts::default());
    }
}
