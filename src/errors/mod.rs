use thiserror::Error;

#[derive(Error, Debug)]
pub enum PodfeedError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    // Feed errors
    #[error("Invalid feed URL: {0}")]
    InvalidUrl(String),

    #[error("Unknown category: {0}")]
    UnknownCategory(String),

    // Network errors
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP {status} from {url}")]
    HttpStatus { status: u16, url: String },

    // Parsing errors
    #[error("Feed parsing failed: {0}")]
    FeedParse(String),

    #[error("OPML parsing failed: {0}")]
    OpmlParse(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // User input errors
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

pub type PodfeedResult<T> = Result<T, PodfeedError>;
