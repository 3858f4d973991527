pub mod aggregate_service;
pub mod catalog_service;
pub mod refresh_service;
pub mod release_service;

pub use aggregate_service::{
    aggregate_all, AggregateOptions, AggregateResult, AggregateService, FeedCounts, SourceOutcome,
    SourceStatus,
};
pub use catalog_service::FeedCatalog;
pub use refresh_service::{BoardSnapshot, FeedBoard, PublishOutcome, RefreshHandle, RefreshService};
pub use release_service::ReleaseService;
