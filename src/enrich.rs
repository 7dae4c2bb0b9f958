use crate::types::{PartialProduct, Product, StageOutput};
use crate::{FetchGate, PageParser, Result, ScraperError};
use futures::{stream, StreamExt};
use indicatif::ProgressBar;
use reqwest::Url;
use tracing::{debug, warn};

/// Resolves a product identity to its detail page.
///
/// Paths are joined onto `base`; an identity that is already an absolute URL is used as-is.
pub fn detail_url(base: &Url, identity: &str) -> Result<String> {
    base.join(identity)
        .map(String::from)
        .map_err(|e| ScraperError::InvalidUrl {
            url: identity.to_string(),
            reason: e.to_string(),
        })
}

/// The `EnrichmentStage` struct fetches each product's detail page and hands it to a
/// `PageParser` to complete the record.
pub struct EnrichmentStage<'a, P: PageParser + ?Sized> {
    gate: &'a FetchGate,
    parser: &'a P,
    detail_base: &'a Url,
}

impl<'a, P: PageParser + ?Sized> EnrichmentStage<'a, P> {
    pub fn new(gate: &'a FetchGate, parser: &'a P, detail_base: &'a Url) -> Self {
        Self {
            gate,
            parser,
            detail_base,
        }
    }

    /// Completes every record in `partials` concurrently.
    ///
    /// The caller is expected to have deduplicated `partials`. A record whose page fails
    /// to fetch or parse is dropped with a logged cause, without affecting the others.
    pub async fn enrich(
        &self,
        partials: Vec<PartialProduct>,
        progress: &ProgressBar,
    ) -> StageOutput<Product> {
        let mut output = StageOutput {
            scheduled: partials.len(),
            ..StageOutput::default()
        };

        let mut products = stream::iter(partials)
            .map(|partial| async move {
                let identity = partial.url.clone();
                let result = self.enrich_one(partial).await;
                (identity, result)
            })
            .buffer_unordered(self.gate.capacity());

        while let Some((identity, result)) = products.next().await {
            progress.inc(1);
            match result {
                Ok(product) => {
                    debug!("Completed {}", identity);
                    output.items.push(product);
                }
                Err(e) => {
                    warn!("Dropping product {}: {}", identity, e);
                    output.failed += 1;
                }
            }
        }

        output
    }

    async fn enrich_one(&self, partial: PartialProduct) -> Result<Product> {
        let url = detail_url(self.detail_base, &partial.url)?;
        let body = self.gate.fetch(&url).await?;
        self.parser.parse(&body, partial)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Tests that site paths are resolved against the shop origin.
    #[test]
    fn test_detail_url_relative() {
        let base = Url::parse("https://shop.example.com").unwrap();

        assert_eq!(
            detail_url(&base, "/nl/p/bier/pilsner").unwrap(),
            "https://shop.example.com/nl/p/bier/pilsner"
        );
    }

    /// Tests that absolute identities are left untouched.
    #[test]
    fn test_detail_url_absolute() {
        let base = Url::parse("https://shop.example.com").unwrap();

        assert_eq!(
            detail_url(&base, "https://other.example.com/p/1").unwrap(),
            "https://other.example.com/p/1"
        );
    }
}
