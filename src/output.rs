use crate::aggregate::CrawlResult;
use crate::types::Product;
use crate::Result;
use std::path::Path;
use tracing::info;

/// Writes the catalog to `path` as a JSON list of flat product records.
pub fn write_catalog(path: &Path, result: &CrawlResult) -> Result<()> {
    let content = serde_json::to_string_pretty(result)?;
    std::fs::write(path, content)?;

    info!("Wrote {} products to {}", result.len(), path.display());
    Ok(())
}

/// Reads a catalog previously written by `write_catalog`.
pub fn read_catalog(path: &Path) -> Result<Vec<Product>> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}
