use async_trait::async_trait;
use tracing::warn;

use crate::domain::{RawEpisode, SourceKind};
use crate::errors::PodfeedResult;

#[async_trait]
pub trait EpisodeSource: Send + Sync {
    /// Identifies this source type
    fn kind(&self) -> SourceKind;

    /// Human name: feed title for RSS, adapter name otherwise
    fn label(&self) -> &str;

    /// Fetch episode records. Never fails: errors are logged and degrade to
    /// an empty list.
    async fn fetch(&self) -> Vec<RawEpisode>;
}

/// Log a failed load and fall back to nothing.
pub fn fail_soft(
    kind: SourceKind,
    label: &str,
    result: PodfeedResult<Vec<RawEpisode>>,
) -> Vec<RawEpisode> {
    match result {
        Ok(episodes) => episodes,
        Err(e) => {
            warn!(source = %kind, label, error = %e, "source failed, using empty result");
            Vec::new()
        }
    }
}
