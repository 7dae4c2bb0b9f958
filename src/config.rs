use crate::{Result, ScraperError};
use ::config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// The prefix of environment variables that override configuration values.
pub const ENV_PREFIX: &str = "BREWSCRAPE";

/// The `ScraperConfig` struct holds the configuration settings for a crawl.
/// It includes the listing and detail endpoints, pagination, concurrency, timeout,
/// and output locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScraperConfig {
    /// The listing API endpoint; the page parameter is appended to it.
    pub start_url: String,
    /// The origin that relative product identities are joined onto.
    pub detail_base_url: String,
    /// One past the last listing page index to request.
    pub page_count: usize,
    /// The maximum number of requests in flight across both stages.
    pub concurrent_requests: usize,
    /// The per-request timeout in seconds.
    pub timeout_secs: u64,
    /// The user agent string to be used in HTTP requests.
    pub user_agent: String,
    /// Where the catalog is written after a crawl.
    pub output_path: PathBuf,
    /// Where downloaded product images are stored.
    pub image_dir: PathBuf,
    /// Whether per-stage progress bars are drawn.
    pub show_progress: bool,
}

impl Default for ScraperConfig {
    /// Provides default values for the `ScraperConfig` struct.
    ///
    /// # Returns
    ///
    /// A `ScraperConfig` instance with default settings.
    fn default() -> Self {
        Self {
            start_url: crate::DEFAULT_START_URL.to_string(),
            detail_base_url: crate::DEFAULT_DETAIL_BASE_URL.to_string(),
            page_count: crate::DEFAULT_PAGE_COUNT,
            concurrent_requests: crate::DEFAULT_CONCURRENT_REQUESTS,
            timeout_secs: crate::DEFAULT_TIMEOUT.as_secs(),
            user_agent: String::from("Mozilla/5.0 (compatible; RustBot/1.0)"),
            output_path: PathBuf::from("output.json"),
            image_dir: PathBuf::from("images"),
            show_progress: true,
        }
    }
}

impl ScraperConfig {
    /// Loads the configuration by layering defaults, an optional file, and the environment.
    ///
    /// # Arguments
    ///
    /// * `path` - An optional configuration file (TOML, YAML, or JSON, chosen by extension).
    ///
    /// # Returns
    ///
    /// A `Result` containing the validated configuration, or an error if a layer is malformed.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder().add_source(Config::try_from(&Self::default())?);

        if let Some(path) = path {
            builder = builder.add_source(File::from(path).required(true));
        }

        let config: Self = builder
            .add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    /// Rejects values that would stall or skip the crawl.
    pub fn validate(&self) -> Result<()> {
        if self.concurrent_requests == 0 {
            return Err(ScraperError::InvalidConfig(
                "concurrent_requests must be at least 1".to_string(),
            ));
        }
        if self.page_count == 0 {
            return Err(ScraperError::InvalidConfig(
                "page_count must be at least 1".to_string(),
            ));
        }
        if self.timeout_secs == 0 {
            return Err(ScraperError::InvalidConfig(
                "timeout_secs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// The per-request timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
