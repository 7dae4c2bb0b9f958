use crate::aggregate::{aggregate, CrawlResult};
use crate::enrich::EnrichmentStage;
use crate::listing::{listing_page_urls, ListingStage};
use crate::{FetchGate, HtmlPageParser, PageParser, Result, ScraperConfig, ScraperError};
use chrono::{DateTime, Utc};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use reqwest::Url;
use std::collections::HashSet;
use std::fmt;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Counts describing one crawl, for the user-facing summary.
#[derive(Debug, Clone, PartialEq)]
pub struct CrawlSummary {
    pub listing_pages: usize,
    pub listing_pages_failed: usize,
    /// Distinct products found on the listing pages.
    pub discovered: usize,
    /// Listing entries skipped because their identity was already scheduled.
    pub duplicates: usize,
    pub completed: usize,
    pub dropped: usize,
    pub elapsed: Duration,
    /// When the crawl's last stage resolved.
    pub finished_at: DateTime<Utc>,
}

impl fmt::Display for CrawlSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Listing pages: {} ({} failed)",
            self.listing_pages, self.listing_pages_failed
        )?;
        writeln!(
            f,
            "Products discovered: {} ({} duplicates skipped)",
            self.discovered, self.duplicates
        )?;
        writeln!(
            f,
            "Products completed: {} ({} dropped)",
            self.completed, self.dropped
        )?;
        writeln!(f, "Processing time: {:.2?}", self.elapsed)?;
        write!(
            f,
            "Finished at: {}",
            self.finished_at.format("%Y-%m-%d %H:%M:%S UTC")
        )
    }
}

/// The outcome of `Crawler::run`.
#[derive(Debug)]
pub struct CrawlReport {
    pub result: CrawlResult,
    pub summary: CrawlSummary,
}

/// Dedup state for a single run, touched only between awaits of a stage's result stream.
#[derive(Default)]
struct CrawlState {
    seen_listing_pages: HashSet<String>,
    seen_products: HashSet<String>,
}

/// The `Crawler` struct runs the listing stage and then the enrichment stage, with
/// both drawing on one shared `FetchGate`.
pub struct Crawler<P: PageParser = HtmlPageParser> {
    /// The configuration settings for the crawl.
    config: ScraperConfig,
    /// The request gate shared by both stages.
    gate: FetchGate,
    /// Extracts detail fields from product pages.
    parser: P,
    /// The origin product identities are resolved against.
    detail_base: Url,
    /// The progress display holding one bar per stage.
    progress: MultiProgress,
}

impl Crawler<HtmlPageParser> {
    /// Creates a new `Crawler` that parses detail pages with `HtmlPageParser`.
    ///
    /// # Arguments
    ///
    /// * `config` - The configuration settings for the crawl.
    ///
    /// # Returns
    ///
    /// A `Result` containing the `Crawler`, or an error if the configuration is unusable.
    pub fn new(config: ScraperConfig) -> Result<Self> {
        Self::with_parser(config, HtmlPageParser::default())
    }
}

impl<P: PageParser> Crawler<P> {
    /// Creates a new `Crawler` with a custom detail page parser.
    pub fn with_parser(config: ScraperConfig, parser: P) -> Result<Self> {
        let gate = FetchGate::new(&config)?;
        let detail_base =
            Url::parse(&config.detail_base_url).map_err(|e| ScraperError::InvalidUrl {
                url: config.detail_base_url.clone(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            config,
            gate,
            parser,
            detail_base,
            progress: MultiProgress::new(),
        })
    }

    /// Runs both stages to completion and aggregates the products that survived.
    ///
    /// Enrichment is not scheduled until every listing page has resolved. Per-item
    /// failures are logged and counted; the crawl itself always completes.
    pub async fn run(&self) -> CrawlReport {
        let started = Instant::now();
        let mut state = CrawlState::default();

        let page_urls: Vec<String> =
            listing_page_urls(&self.config.start_url, self.config.page_count)
                .into_iter()
                .filter(|url| state.seen_listing_pages.insert(url.clone()))
                .collect();
        info!("Fetching {} listing pages", page_urls.len());

        let bar = self.stage_bar("Listing pages", page_urls.len());
        let listing = ListingStage::new(&self.gate).enumerate(page_urls, &bar).await;
        bar.finish_with_message(format!(
            "Listing pages: {} of {} decoded",
            listing.scheduled - listing.failed,
            listing.scheduled
        ));

        let found = listing.items.len();
        let partials: Vec<_> = listing
            .items
            .into_iter()
            .filter(|partial| state.seen_products.insert(partial.url.clone()))
            .collect();
        let duplicates = found - partials.len();
        debug!("Skipped {} duplicate listing entries", duplicates);
        info!(
            "Listing stage done: {} products discovered, continuing with product pages",
            partials.len()
        );

        let bar = self.stage_bar("Product pages", partials.len());
        let enriched = EnrichmentStage::new(&self.gate, &self.parser, &self.detail_base)
            .enrich(partials, &bar)
            .await;
        bar.finish_with_message(format!(
            "Product pages: {} of {} completed",
            enriched.items.len(),
            enriched.scheduled
        ));

        let result = aggregate(enriched.items);
        let summary = CrawlSummary {
            listing_pages: listing.scheduled,
            listing_pages_failed: listing.failed,
            discovered: enriched.scheduled,
            duplicates,
            completed: result.len(),
            dropped: enriched.failed,
            elapsed: started.elapsed(),
            finished_at: Utc::now(),
        };
        info!(
            "Scraped {} of {} products in {:.2?}",
            result.len(),
            summary.discovered,
            summary.elapsed
        );

        CrawlReport { result, summary }
    }

    fn stage_bar(&self, label: &str, len: usize) -> ProgressBar {
        if !self.config.show_progress {
            return ProgressBar::hidden();
        }

        let bar = self.progress.add(ProgressBar::new(len as u64));
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} {msg} [{bar:40}] {pos}/{len}")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        bar.set_message(label.to_string());
        bar
    }
}
