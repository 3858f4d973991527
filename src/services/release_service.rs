use std::sync::Arc;

use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use crate::config::Config;
use crate::errors::{PodfeedError, PodfeedResult};
use crate::sources::http::{fetch_json, FetchRequest, HttpFetch};

pub const DEFAULT_PRERELEASE_COUNT: u32 = 5;

#[derive(Debug, Deserialize)]
struct ProduceResponse {
    winner: Option<Winner>,
}

#[derive(Debug, Deserialize)]
struct Winner {
    title: Option<String>,
}

/// Triggers the backend's scheduled release functions.
pub struct ReleaseService {
    fetcher: Arc<dyn HttpFetch>,
    base_url: String,
    key: String,
}

impl ReleaseService {
    pub fn new(base_url: &str, key: &str, fetcher: Arc<dyn HttpFetch>) -> Self {
        Self {
            fetcher,
            base_url: base_url.trim_end_matches('/').to_string(),
            key: key.to_string(),
        }
    }

    pub fn from_config(config: &Config, fetcher: Arc<dyn HttpFetch>) -> PodfeedResult<Self> {
        let (url, key) = config.backend_credentials().ok_or_else(|| {
            PodfeedError::MissingEnvVar("PODFEED_BACKEND_URL / PODFEED_BACKEND_KEY".to_string())
        })?;
        Ok(Self::new(url, key, fetcher))
    }

    fn function_url(&self, path: &str) -> String {
        format!("{}/functions/v1/{}", self.base_url, path)
    }

    /// Move the next `count` titles into pre-release. Returns the function's reply.
    pub async fn prerelease(&self, count: u32) -> PodfeedResult<Value> {
        if count == 0 {
            return Err(PodfeedError::InvalidInput("count must be at least 1".to_string()));
        }

        let url = self.function_url("podcast-prerelease");
        let request = FetchRequest::post_json(url, json!({ "count": count })).bearer(&self.key);
        let reply: Value = fetch_json(self.fetcher.as_ref(), request).await?;

        info!(count, "pre-release requested");
        Ok(reply)
    }

    /// Promote the best-performing pre-release title to production.
    /// Returns the winner's title when the backend names one.
    pub async fn select_winner(&self) -> PodfeedResult<Option<String>> {
        let url = self.function_url("podcast-prerelease/produce");
        let request = FetchRequest::post(url).bearer(&self.key);
        let reply: ProduceResponse = fetch_json(self.fetcher.as_ref(), request).await?;

        let title = reply.winner.and_then(|w| w.title);
        info!(winner = title.as_deref().unwrap_or("none"), "winner selected");
        Ok(title)
    }
}
