use anyhow::Context;
use brewscrape::{
    config::ScraperConfig,
    images::ImageDownloader,
    output::{read_catalog, write_catalog},
    Crawler, FetchGate,
};
use std::path::PathBuf;
use std::time::Instant;
use tracing::error;

/// The main entry point of the application.
///
/// This function initializes logging, loads the configuration, and runs either the
/// catalog crawl (`crawl`, the default) or the image download (`images`).
///
/// Usage: `brewscrape [crawl|images] [config-path]`
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    let command = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "crawl".to_string());
    let config_path = std::env::args().nth(2).map(PathBuf::from);

    // Load configuration
    let config = ScraperConfig::load(config_path.as_deref())
        .context("failed to load configuration")?;

    match command.as_str() {
        "crawl" => crawl(config).await,
        "images" => images(config).await,
        other => {
            error!("Unknown command: {}", other);
            anyhow::bail!("usage: brewscrape [crawl|images] [config-path]")
        }
    }
}

async fn crawl(config: ScraperConfig) -> anyhow::Result<()> {
    let output_path = config.output_path.clone();
    let crawler = Crawler::new(config)?;

    let report = crawler.run().await;
    write_catalog(&output_path, &report.result)
        .with_context(|| format!("failed to write {}", output_path.display()))?;

    println!("\n=== Crawl Summary ===");
    println!("{}", report.summary);
    println!("Catalog: {}", output_path.display());
    Ok(())
}

async fn images(config: ScraperConfig) -> anyhow::Result<()> {
    let start_time = Instant::now();
    let products = read_catalog(&config.output_path)
        .with_context(|| format!("failed to read {}", config.output_path.display()))?;

    let gate = FetchGate::new(&config)?;
    let report = ImageDownloader::new(&gate, &config.image_dir)
        .download_all(&products)
        .await?;

    println!("\n=== Image Summary ===");
    println!("Images saved: {} of {}", report.saved, report.scheduled);
    println!("Failed: {}", report.failed);
    println!("Processing time: {:.2?}", start_time.elapsed());
    Ok(())
}
