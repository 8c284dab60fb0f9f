use thiserror::Error;

#[derive(Error, Debug)]
pub enum GleanerError {
    /// Malformed locator or out-of-range option, rejected before any
    /// network call is made.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Failure reported by the scraping API for a target page.
    #[error("Fetch failed for {url}: {reason}")]
    Fetch { url: String, reason: String },

    /// The page loaded but the expected embedded payload was absent
    /// or malformed.
    #[error("Parse error: {0}")]
    Parse(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, GleanerError>;
