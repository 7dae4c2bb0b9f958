use std::time::Duration;
use thiserror::Error;

pub mod aggregate;
pub mod config;
pub mod crawler;
pub mod enrich;
pub mod fetch;
pub mod images;
pub mod listing;
pub mod output;
pub mod scraper;
pub mod types;

// Re-export commonly used types
pub use crate::aggregate::{CrawlResult, ResultAggregator};
pub use crate::config::ScraperConfig;
pub use crate::crawler::{CrawlReport, CrawlSummary, Crawler};
pub use crate::fetch::FetchGate;
pub use crate::scraper::{HtmlPageParser, PageParser};
pub use crate::types::{PartialProduct, Product};

/// The `ScraperError` enum represents the errors that can occur while harvesting the catalog.
///
/// Per-item variants (`Fetch`, `Decode`, `Extraction`) are recovered by the stage that
/// produced them; only configuration and sink errors reach the caller.
#[derive(Error, Debug)]
pub enum ScraperError {
    /// A transport failure or timeout while fetching a single URL.
    #[error("HTTP request to {url} failed: {source}")]
    Fetch {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    /// The shared HTTP client could not be built.
    #[error("HTTP client could not be built: {0}")]
    Client(#[from] reqwest::Error),
    /// A listing payload that is not in the expected JSON shape.
    #[error("listing payload from {url} could not be decoded: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },
    /// A detail page that is missing a required structural element.
    #[error("extraction failed for {url}: {reason}")]
    Extraction { url: String, reason: String },
    /// A URL in the configuration or listing data that cannot be parsed.
    #[error("invalid URL \"{url}\": {reason}")]
    InvalidUrl { url: String, reason: String },
    /// The configuration layers could not be merged or deserialized.
    #[error("configuration error: {0}")]
    Config(#[from] ::config::ConfigError),
    /// The configuration was loaded but holds an unusable value.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// The shared request gate was closed while a fetch was waiting on it.
    #[error("request gate closed")]
    GateClosed,
    /// Reading or writing the catalog or an image file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// The catalog could not be serialized or read back.
    #[error("catalog serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// A type alias for `Result` with the `ScraperError` error type.
pub type Result<T> = std::result::Result<T, ScraperError>;

// Constants

/// The default timeout duration for HTTP requests.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
/// The default number of requests allowed in flight across both stages.
pub const DEFAULT_CONCURRENT_REQUESTS: usize = 200;
/// The default page count; pages `1..DEFAULT_PAGE_COUNT` are requested.
pub const DEFAULT_PAGE_COUNT: usize = 22;
/// The default listing API endpoint.
pub const DEFAULT_START_URL: &str =
    "https://www.beerwulf.com/nl/api/search/searchProducts?pageSize=48";
/// The default origin that product identities are resolved against.
pub const DEFAULT_DETAIL_BASE_URL: &str = "https://www.beerwulf.com";
