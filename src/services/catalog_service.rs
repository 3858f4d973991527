use std::collections::HashSet;
use std::fs;

use opml::{Outline, OPML};
use tracing::{debug, info};

use crate::config::Config;
use crate::domain::{default_feeds, Category, FeedConfig, ALL_CATEGORIES};
use crate::errors::{PodfeedError, PodfeedResult};

const OPML_TITLE: &str = "Podcast Feeds";
const UNCATEGORIZED: &str = "medical";

/// The set of RSS feeds the aggregator can draw from.
#[derive(Debug, Clone)]
pub struct FeedCatalog {
    feeds: Vec<FeedConfig>,
}

impl FeedCatalog {
    pub fn new(feeds: Vec<FeedConfig>) -> Self {
        Self { feeds }
    }

    pub fn builtin() -> Self {
        Self::new(default_feeds())
    }

    /// The OPML file named in config when there is one, else the built-in list.
    pub fn load(config: &Config) -> PodfeedResult<Self> {
        match &config.feeds_opml {
            Some(path) => {
                let content = fs::read_to_string(path)?;
                let catalog = Self::from_opml(&content)?;
                info!(path = %path, feeds = catalog.feeds.len(), "loaded feed catalog");
                Ok(catalog)
            }
            None => Ok(Self::builtin()),
        }
    }

    pub fn feeds(&self) -> &[FeedConfig] {
        &self.feeds
    }

    /// Feeds in `category` (or every feed for "all"), capped at `max_feeds`.
    pub fn select(&self, category: &str, max_feeds: usize) -> PodfeedResult<Vec<FeedConfig>> {
        let category = Category::find(category)
            .ok_or_else(|| PodfeedError::UnknownCategory(category.to_string()))?;

        Ok(self
            .feeds
            .iter()
            .filter(|f| {
                category.id == ALL_CATEGORIES || f.category.eq_ignore_ascii_case(category.id)
            })
            .take(max_feeds)
            .cloned()
            .collect())
    }

    /// Import feeds from OPML content
    pub fn from_opml(content: &str) -> PodfeedResult<Self> {
        let opml = OPML::from_str(content).map_err(|e| PodfeedError::OpmlParse(e.to_string()))?;

        let mut feeds = Vec::new();
        let mut seen = HashSet::new();
        collect_feeds(&opml.body.outlines, None, &mut seen, &mut feeds);

        Ok(Self::new(feeds))
    }

    /// Export feeds to OPML format, one folder per category.
    pub fn to_opml(&self) -> PodfeedResult<String> {
        let mut opml = OPML::default();
        opml.head = Some(opml::Head {
            title: Some(OPML_TITLE.to_string()),
            ..Default::default()
        });

        for feed in &self.feeds {
            let outline = Outline {
                text: feed.name.clone(),
                r#type: Some("rss".to_string()),
                xml_url: Some(feed.url.clone()),
                title: Some(feed.name.clone()),
                description: (!feed.description.is_empty()).then(|| feed.description.clone()),
                category: Some(feed.category.clone()),
                ..Default::default()
            };

            match opml
                .body
                .outlines
                .iter_mut()
                .find(|folder| folder.xml_url.is_none() && folder.text == feed.category)
            {
                Some(folder) => folder.outlines.push(outline),
                None => opml.body.outlines.push(Outline {
                    text: feed.category.clone(),
                    outlines: vec![outline],
                    ..Default::default()
                }),
            }
        }

        opml.to_string().map_err(|e| PodfeedError::OpmlParse(e.to_string()))
    }
}

/// Walk outlines depth first. A feed's category is its own `category`
/// attribute, else the enclosing folder's name.
fn collect_feeds(
    outlines: &[Outline],
    folder: Option<&str>,
    seen: &mut HashSet<String>,
    feeds: &mut Vec<FeedConfig>,
) {
    for outline in outlines {
        match outline.xml_url.as_deref().filter(|u| !u.is_empty()) {
            Some(url) => {
                if !seen.insert(url.to_string()) {
                    debug!(url, "skipping duplicate feed");
                    continue;
                }

                let category = outline
                    .category
                    .as_deref()
                    .or(folder)
                    .filter(|c| Category::find(c).is_some())
                    .unwrap_or(UNCATEGORIZED)
                    .to_lowercase();
                let name = outline.title.clone().unwrap_or_else(|| outline.text.clone());

                feeds.push(FeedConfig {
                    name,
                    url: url.to_string(),
                    category,
                    description: outline.description.clone().unwrap_or_default(),
                });
            }
            None => collect_feeds(&outline.outlines, Some(outline.text.as_str()), seen, feeds),
        }
    }
}
