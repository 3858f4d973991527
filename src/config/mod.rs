use std::net::SocketAddr;
use std::time::Duration;

use crate::errors::{PodfeedError, PodfeedResult};

pub const DEFAULT_APPLE_QUERY: &str = "medical dental healthcare podcast AI innovation";
pub const DEFAULT_YOUTUBE_QUERY: &str = "medical podcast dental health innovation 2024";
pub const DEFAULT_SITE_ORIGIN: &str = "https://podcast.repspheres.com";

/// Hard ceiling on items taken from a single RSS feed.
pub const MAX_ITEMS_PER_FEED: usize = 10;

/// One week.
pub const MAX_REFRESH_MINUTES: u64 = 7 * 24 * 60;

#[derive(Debug, Clone)]
pub struct Config {
    pub youtube_api_key: Option<String>,
    pub youtube_query: String,
    pub youtube_max_results: u32,
    pub apple_query: String,
    pub backend_url: Option<String>,
    pub backend_key: Option<String>,
    pub rss_relay_url: Option<String>,
    pub feeds_opml: Option<String>,
    pub live_window: Duration,
    pub refresh_interval: Duration,
    pub max_feeds: usize,
    pub items_per_feed: usize,
    pub source_timeout: Duration,
    pub relay_addr: SocketAddr,
    pub site_origin: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            youtube_api_key: None,
            youtube_query: DEFAULT_YOUTUBE_QUERY.to_string(),
            youtube_max_results: 15,
            apple_query: DEFAULT_APPLE_QUERY.to_string(),
            backend_url: None,
            backend_key: None,
            rss_relay_url: None,
            feeds_opml: None,
            live_window: Duration::from_secs(24 * 60 * 60),
            refresh_interval: Duration::from_secs(30 * 60),
            max_feeds: 5,
            items_per_feed: 3,
            source_timeout: Duration::from_secs(20),
            relay_addr: SocketAddr::from(([127, 0, 0, 1], 8787)),
            site_origin: DEFAULT_SITE_ORIGIN.to_string(),
        }
    }
}

impl Config {
    /// Get the directory where the executable is located
    fn exe_dir() -> Option<std::path::PathBuf> {
        std::env::current_exe()
            .ok()
            .and_then(|p| p.parent().map(|p| p.to_path_buf()))
    }

    pub fn from_env() -> PodfeedResult<Self> {
        // Try to load .env from executable's directory first
        if let Some(dir) = Self::exe_dir() {
            let env_path = dir.join(".env");
            if env_path.exists() {
                dotenvy::from_path(&env_path).ok();
            }
        }
        // Fall back to current directory
        dotenvy::dotenv().ok();

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> PodfeedResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let defaults = Self::default();

        let items_per_feed = parse_number(&get, "PODFEED_ITEMS_PER_FEED")?
            .unwrap_or(defaults.items_per_feed as u64) as usize;
        if items_per_feed == 0 || items_per_feed > MAX_ITEMS_PER_FEED {
            return Err(PodfeedError::Config(format!(
                "PODFEED_ITEMS_PER_FEED must be between 1 and {}",
                MAX_ITEMS_PER_FEED
            )));
        }

        let live_window = parse_scaled(&get, "PODFEED_LIVE_WINDOW_HOURS", 60 * 60)?;
        let refresh_minutes = parse_number(&get, "PODFEED_REFRESH_MINUTES")?;
        if refresh_minutes.is_some_and(|m| m == 0 || m > MAX_REFRESH_MINUTES) {
            return Err(PodfeedError::Config(format!(
                "PODFEED_REFRESH_MINUTES must be between 1 and {}",
                MAX_REFRESH_MINUTES
            )));
        }

        let relay_addr = match get("PODFEED_RELAY_ADDR") {
            Some(raw) => raw.parse().map_err(|_| {
                PodfeedError::Config(format!("PODFEED_RELAY_ADDR is not a socket address: {}", raw))
            })?,
            None => defaults.relay_addr,
        };

        Ok(Self {
            youtube_api_key: get("PODFEED_YOUTUBE_API_KEY"),
            youtube_query: get("PODFEED_YOUTUBE_QUERY").unwrap_or(defaults.youtube_query),
            youtube_max_results: parse_bounded(&get, "PODFEED_YOUTUBE_MAX_RESULTS")?
                .unwrap_or(defaults.youtube_max_results),
            apple_query: get("PODFEED_APPLE_QUERY").unwrap_or(defaults.apple_query),
            backend_url: get("PODFEED_BACKEND_URL").map(|u| u.trim_end_matches('/').to_string()),
            backend_key: get("PODFEED_BACKEND_KEY"),
            rss_relay_url: get("PODFEED_RSS_RELAY_URL"),
            feeds_opml: get("PODFEED_FEEDS_OPML"),
            live_window: live_window.unwrap_or(defaults.live_window),
            refresh_interval: refresh_minutes
                .map(|m| Duration::from_secs(m * 60))
                .unwrap_or(defaults.refresh_interval),
            max_feeds: parse_bounded(&get, "PODFEED_MAX_FEEDS")?.unwrap_or(defaults.max_feeds),
            items_per_feed,
            source_timeout: parse_number(&get, "PODFEED_SOURCE_TIMEOUT_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.source_timeout),
            relay_addr,
            site_origin: get("PODFEED_SITE_ORIGIN").unwrap_or(defaults.site_origin),
        })
    }

    /// Backend URL and key, only when both are configured.
    pub fn backend_credentials(&self) -> Option<(&str, &str)> {
        match (&self.backend_url, &self.backend_key) {
            (Some(url), Some(key)) => Some((url.as_str(), key.as_str())),
            _ => None,
        }
    }
}

fn parse_number<G>(get: &G, key: &str) -> PodfeedResult<Option<u64>>
where
    G: Fn(&str) -> Option<String>,
{
    get(key)
        .map(|raw| {
            raw.parse::<u64>().map_err(|_| {
                PodfeedError::Config(format!("{} must be a non-negative integer, got {}", key, raw))
            })
        })
        .transpose()
}

/// A number that must fit the target integer type.
fn parse_bounded<G, T>(get: &G, key: &str) -> PodfeedResult<Option<T>>
where
    G: Fn(&str) -> Option<String>,
    T: TryFrom<u64>,
{
    parse_number(get, key)?
        .map(|n| {
            T::try_from(n)
                .map_err(|_| PodfeedError::Config(format!("{} is too large: {}", key, n)))
        })
        .transpose()
}

/// A count of `unit_secs`-long units, as a duration.
fn parse_scaled<G>(get: &G, key: &str, unit_secs: u64) -> PodfeedResult<Option<Duration>>
where
    G: Fn(&str) -> Option<String>,
{
    parse_number(get, key)?
        .map(|n| {
            n.checked_mul(unit_secs)
                .map(Duration::from_secs)
                .ok_or_else(|| PodfeedError::Config(format!("{} is too large: {}", key, n)))
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> PodfeedResult<Config> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults_when_nothing_is_set() {
        let config = config_from(&[]).unwrap();

        assert!(config.youtube_api_key.is_none());
        assert!(config.backend_credentials().is_none());
        assert_eq!(config.live_window, Duration::from_secs(86_400));
        assert_eq!(config.refresh_interval, Duration::from_secs(1_800));
        assert_eq!(config.max_feeds, 5);
        assert_eq!(config.items_per_feed, 3);
        assert_eq!(config.apple_query, DEFAULT_APPLE_QUERY);
    }

    #[test]
    fn test_blank_key_counts_as_unset() {
        let config = config_from(&[("PODFEED_YOUTUBE_API_KEY", "   ")]).unwrap();
        assert!(config.youtube_api_key.is_none());
    }

    #[test]
    fn test_backend_needs_both_url_and_key() {
        let config = config_from(&[("PODFEED_BACKEND_URL", "https://x.example.co/")]).unwrap();
        assert!(config.backend_credentials().is_none());

        let config = config_from(&[
            ("PODFEED_BACKEND_URL", "https://x.example.co/"),
            ("PODFEED_BACKEND_KEY", "anon"),
        ])
        .unwrap();
        assert_eq!(
            config.backend_credentials(),
            Some(("https://x.example.co", "anon"))
        );
    }

    #[test]
    fn test_windows_are_configurable() {
        let config = config_from(&[
            ("PODFEED_LIVE_WINDOW_HOURS", "48"),
            ("PODFEED_REFRESH_MINUTES", "5"),
        ])
        .unwrap();

        assert_eq!(config.live_window, Duration::from_secs(48 * 3600));
        assert_eq!(config.refresh_interval, Duration::from_secs(300));
    }

    #[test]
    fn test_rejects_bad_numbers() {
        assert!(matches!(
            config_from(&[("PODFEED_MAX_FEEDS", "many")]),
            Err(PodfeedError::Config(_))
        ));
        assert!(matches!(
            config_from(&[("PODFEED_ITEMS_PER_FEED", "11")]),
            Err(PodfeedError::Config(_))
        ));
        assert!(matches!(
            config_from(&[("PODFEED_REFRESH_MINUTES", "0")]),
            Err(PodfeedError::Config(_))
        ));
        assert!(matches!(
            config_from(&[("PODFEED_RELAY_ADDR", "nowhere")]),
            Err(PodfeedError::Config(_))
        ));
    }

    #[test]
    fn test_oversized_numbers_are_config_errors() {
        for (key, value) in [
            ("PODFEED_LIVE_WINDOW_HOURS", "18446744073709551615"),
            ("PODFEED_REFRESH_MINUTES", "18446744073709551615"),
            ("PODFEED_REFRESH_MINUTES", "10081"),
            ("PODFEED_YOUTUBE_MAX_RESULTS", "4294967296"),
        ] {
            let err = config_from(&[(key, value)]).unwrap_err();
            assert!(matches!(err, PodfeedError::Config(ref msg) if msg.contains(key)), "{}", key);
        }
    }

    #[test]
    fn test_large_but_valid_numbers() {
        let config = config_from(&[
            ("PODFEED_LIVE_WINDOW_HOURS", "8760"),
            ("PODFEED_REFRESH_MINUTES", "10080"),
            ("PODFEED_YOUTUBE_MAX_RESULTS", "50"),
        ])
        .unwrap();

        assert_eq!(config.live_window, Duration::from_secs(8760 * 3600));
        assert_eq!(config.refresh_interval, Duration::from_secs(10080 * 60));
        assert_eq!(config.youtube_max_results, 50);
    }
}
