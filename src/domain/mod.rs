pub mod episode;
pub mod feed;
pub mod source;

pub use episode::{Episode, RawEpisode, SourceMetadata};
pub use feed::{default_feeds, Category, FeedConfig, ALL_CATEGORIES, CATEGORIES};
pub use source::SourceKind;
