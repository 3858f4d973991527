pub mod apple;
pub mod backend;
pub mod http;
pub mod registry;
pub mod rss;
pub mod traits;
pub mod trending;
pub mod youtube;

pub use http::{FetchRequest, HttpFetch, Method, ReqwestFetcher};
pub use registry::SourceRegistry;
pub use traits::{fail_soft, EpisodeSource};
