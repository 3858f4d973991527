use async_trait::async_trait;
use chrono::{Duration, Utc};

use crate::domain::{RawEpisode, SourceKind};
use crate::normalize::parse_duration;
use crate::sources::traits::EpisodeSource;

struct TrendingEntry {
    rank: u64,
    title: &'static str,
    author: &'static str,
    description: &'static str,
    image: &'static str,
    audio: &'static str,
    downloads: u64,
    duration: &'static str,
    hours_ago: i64,
}

// Mock data in place of a trending API.
const TRENDING: &[TrendingEntry] = &[
    TrendingEntry {
        rank: 1,
        title: "The Future of Telemedicine Post-COVID",
        author: "Healthcare Horizons",
        description: "Expert panel discusses permanent changes in healthcare delivery",
        image: "https://images.unsplash.com/photo-1576091160399-112ba8d25d1d?w=300",
        audio: "https://example.com/trending1.mp3",
        downloads: 15420,
        duration: "48:12",
        hours_ago: 30,
    },
    TrendingEntry {
        rank: 2,
        title: "Robotics in Surgery: Year in Review",
        author: "MedTech Weekly",
        description: "Breakthrough robotic procedures that saved lives in 2024",
        image: "https://images.unsplash.com/photo-1581091226825-a6a2a5aee158?w=300",
        audio: "https://example.com/trending2.mp3",
        downloads: 12350,
        duration: "1:05:40",
        hours_ago: 72,
    },
];

/// Fixed ranked list feeding the "trending" view.
#[derive(Default)]
pub struct TrendingSource;

impl TrendingSource {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl EpisodeSource for TrendingSource {
    fn kind(&self) -> SourceKind {
        SourceKind::TrendingIndex
    }

    fn label(&self) -> &str {
        "Trending"
    }

    async fn fetch(&self) -> Vec<RawEpisode> {
        let now = Utc::now();
        TRENDING
            .iter()
            .map(|entry| {
                RawEpisode::new(entry.title.to_string())
                    .with_author(Some(entry.author.to_string()))
                    .with_description(entry.description.to_string())
                    .with_published(Some(now - Duration::hours(entry.hours_ago)))
                    .with_audio_url(Some(entry.audio.to_string()))
                    .with_duration(parse_duration(entry.duration))
                    .with_image(Some(entry.image.to_string()))
                    .with_meta("trendingRank", entry.rank)
                    .with_meta("downloads", entry.downloads)
            })
            .collect()
    }
}
