use crate::types::Product;
use crate::{FetchGate, Result};
use futures::{stream, StreamExt};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Characters that are replaced by `-` when a title becomes a file name.
const SLUG_SEPARATORS: [char; 7] = [' ', '/', '.', '!', '?', '*', ':'];

/// Counts describing one image download run.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ImageReport {
    pub scheduled: usize,
    pub saved: usize,
    pub failed: usize,
    /// Products whose image URL was already scheduled for another product.
    pub duplicates: usize,
}

/// Turns a product title into a file stem.
pub fn slug(title: &str) -> String {
    title
        .to_lowercase()
        .chars()
        .map(|c| if SLUG_SEPARATORS.contains(&c) { '-' } else { c })
        .collect()
}

/// The `ImageDownloader` struct fetches the image of every product in a catalog and
/// stores it under a file name derived from the product title.
pub struct ImageDownloader<'a> {
    gate: &'a FetchGate,
    out_dir: PathBuf,
}

impl<'a> ImageDownloader<'a> {
    pub fn new(gate: &'a FetchGate, out_dir: impl Into<PathBuf>) -> Self {
        Self {
            gate,
            out_dir: out_dir.into(),
        }
    }

    /// Downloads each distinct image URL once, in completion order.
    ///
    /// A failed download is logged and counted; only failing to create the output
    /// directory is returned as an error.
    pub async fn download_all(&self, products: &[Product]) -> Result<ImageReport> {
        tokio::fs::create_dir_all(&self.out_dir).await?;

        let mut seen = HashSet::new();
        let jobs: Vec<(String, PathBuf)> = products
            .iter()
            .filter(|product| seen.insert(product.listing.image_url.as_str()))
            .map(|product| {
                let file = format!("{}.png", slug(&product.listing.title));
                (product.listing.image_url.clone(), self.out_dir.join(file))
            })
            .collect();

        let mut report = ImageReport {
            scheduled: jobs.len(),
            duplicates: products.len() - jobs.len(),
            ..ImageReport::default()
        };

        let mut downloads = stream::iter(jobs)
            .map(|(url, path)| async move {
                let result = self.download(&url, &path).await;
                (url, result)
            })
            .buffer_unordered(self.gate.capacity());

        while let Some((url, result)) = downloads.next().await {
            match result {
                Ok(()) => report.saved += 1,
                Err(e) => {
                    warn!("Failed to download image {}: {}", url, e);
                    report.failed += 1;
                }
            }
        }

        info!(
            "Saved {} of {} images to {}",
            report.saved,
            report.scheduled,
            self.out_dir.display()
        );
        Ok(report)
    }

    async fn download(&self, url: &str, path: &Path) -> Result<()> {
        let body = self.gate.fetch(url).await?;
        tokio::fs::write(path, &body).await?;
        debug!("Saved {} to {}", url, path.display());
        Ok(())
    }
}
