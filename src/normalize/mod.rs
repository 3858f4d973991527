//! Pure conversions from raw feed fields into canonical values.

pub mod duration;
pub mod html;
pub mod recency;

pub use duration::{format_duration, parse_duration, seconds_from_f64};
pub use html::strip_html;
pub use recency::{is_within_window, parse_published, time_ago, TimeAgo};
