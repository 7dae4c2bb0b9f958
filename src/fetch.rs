use crate::{Result, ScraperConfig, ScraperError};
use reqwest::Client;
use tokio::sync::Semaphore;
use tracing::{debug, instrument};

/// The `FetchGate` struct executes GET requests through one shared HTTP client,
/// with at most `capacity` of them in flight at any instant.
///
/// Both crawl stages and the image downloader draw from the same permit pool, so a
/// burst in one of them throttles the others. There are no retries: a failed
/// fetch is final for that work item.
pub struct FetchGate {
    /// The HTTP client used for making requests.
    client: Client,
    /// Permits for in-flight requests.
    permits: Semaphore,
    /// The number of permits the gate was created with.
    capacity: usize,
}

impl FetchGate {
    /// Creates a new `FetchGate` with the given configuration.
    ///
    /// # Arguments
    ///
    /// * `config` - Supplies the concurrency limit, timeout, and user agent.
    ///
    /// # Returns
    ///
    /// A `Result` containing the `FetchGate` instance, or an error if the client could
    /// not be created.
    pub fn new(config: &ScraperConfig) -> Result<Self> {
        config.validate()?;

        let client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout())
            .gzip(true)
            .build()?;

        Ok(Self {
            client,
            permits: Semaphore::new(config.concurrent_requests),
            capacity: config.concurrent_requests,
        })
    }

    /// The maximum number of requests this gate lets through at once.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Fetches the raw body of `url`.
    ///
    /// The status code is not interpreted: an error page is returned as bytes like
    /// any other body. Transport errors and timeouts are handed back to this caller
    /// only; the stage that issued the fetch logs the drop.
    #[instrument(skip(self))]
    pub async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| ScraperError::GateClosed)?;

        match self.try_fetch(url).await {
            Ok(body) => Ok(body),
            Err(source) => {
                debug!("Fetch failed for {}: {}", url, source);
                Err(ScraperError::Fetch {
                    url: url.to_string(),
                    source,
                })
            }
        }
    }

    async fn try_fetch(&self, url: &str) -> std::result::Result<Vec<u8>, reqwest::Error> {
        let response = self.client.get(url).send().await?;
        debug!("Response status for {}: {}", url, response.status());

        let body = response.bytes().await?;
        Ok(body.to_vec())
    }
}
