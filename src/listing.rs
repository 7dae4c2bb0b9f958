use crate::types::{PartialProduct, StageOutput};
use crate::{FetchGate, Result, ScraperError};
use futures::{stream, StreamExt};
use indicatif::ProgressBar;
use regex::Regex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use std::sync::LazyLock;
use tracing::{debug, warn};

/// Titles of bundle SKUs, which are left out of the catalog.
static BUNDLE_TITLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)pack|verpakking").expect("valid bundle regex"));

/// Width of the currency prefix on formatted prices, e.g. `"€ "`.
const CURRENCY_PREFIX_CHARS: usize = 2;

#[derive(Deserialize)]
struct ListingResponse {
    items: Vec<serde_json::Value>,
}

/// Only the identity, title and images can reject an item; every other field is
/// read with `lenient` and becomes absent when it has an unexpected shape.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListingItem {
    content_reference: Option<String>,
    title: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    display_information_price: Option<DisplayPrice>,
    images: Option<Vec<ListingImage>>,
    #[serde(default, deserialize_with = "lenient")]
    style: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    volume: Option<Measure>,
    #[serde(default, deserialize_with = "lenient")]
    alcohol_percentage: Option<Measure>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DisplayPrice {
    #[serde(default, deserialize_with = "lenient")]
    price: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    discount_price: Option<String>,
}

/// Reads an optional field, mapping a value of the wrong type to `None`.
fn lenient<'de, D, T>(deserializer: D) -> std::result::Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    if value.is_null() {
        return Ok(None);
    }

    match serde_json::from_value(value) {
        Ok(parsed) => Ok(Some(parsed)),
        Err(e) => {
            debug!("Ignoring malformed listing field: {}", e);
            Ok(None)
        }
    }
}

#[derive(Deserialize)]
struct ListingImage {
    image: Option<String>,
}

/// Volumes and percentages arrive either as JSON numbers or as numeric strings.
#[derive(Deserialize)]
#[serde(untagged)]
enum Measure {
    Number(f64),
    Text(String),
}

impl Measure {
    fn value(&self) -> Option<f64> {
        match self {
            Measure::Number(n) => Some(*n),
            Measure::Text(s) => s.trim().parse().ok(),
        }
    }
}

impl ListingItem {
    /// Converts the loosely typed item into a record, failing closed when the identity,
    /// title, or image is missing.
    fn into_partial(self) -> std::result::Result<PartialProduct, &'static str> {
        let url = non_empty(self.content_reference).ok_or("missing contentReference")?;
        let title = non_empty(self.title).ok_or("missing title")?;
        let image_url = self
            .images
            .and_then(|images| images.into_iter().next())
            .and_then(|first| non_empty(first.image))
            .ok_or("missing image")?;

        let (price, discounted_price) = match self.display_information_price {
            Some(prices) => (
                prices.price.as_deref().and_then(parse_price),
                prices.discount_price.as_deref().and_then(parse_price),
            ),
            None => (None, None),
        };

        Ok(PartialProduct {
            url,
            title,
            price,
            discounted_price,
            image_url,
            category: non_empty(self.style),
            content: self.volume.as_ref().and_then(Measure::value),
            alcohol_percentage: self.alcohol_percentage.as_ref().and_then(Measure::value),
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

/// Generates the listing page URLs for indices `1..page_count`.
///
/// The upper bound is exclusive, so a `page_count` of 22 yields 21 pages.
pub fn listing_page_urls(base: &str, page_count: usize) -> Vec<String> {
    let separator = if base.contains('?') { '&' } else { '?' };
    (1..page_count)
        .map(|page| format!("{base}{separator}page={page}"))
        .collect()
}

/// Whether a title names a pack or assortment rather than a single product.
pub fn is_bundle(title: &str) -> bool {
    BUNDLE_TITLE.is_match(title)
}

/// Parses a formatted price such as `"€ 12.50"`.
///
/// Returns `None` for an empty string and for anything that does not carry the
/// two-character currency prefix followed by a decimal number.
pub fn parse_price(raw: &str) -> Option<f64> {
    if raw.trim().is_empty() {
        return None;
    }

    let mut chars = raw.chars();
    let prefix: String = chars.by_ref().take(CURRENCY_PREFIX_CHARS).collect();
    let has_symbol = prefix.chars().count() == CURRENCY_PREFIX_CHARS
        && prefix.chars().next().is_some_and(|c| !c.is_ascii_digit() && !c.is_whitespace())
        && prefix.chars().nth(1).is_some_and(char::is_whitespace);

    let parsed = if has_symbol {
        chars.as_str().trim().parse::<f64>().ok().filter(|v| v.is_finite())
    } else {
        None
    };

    if parsed.is_none() {
        debug!("Unrecognised price format: {:?}", raw);
    }
    parsed
}

/// Decodes one listing payload into the records it contains.
///
/// A body that is not an `items` list fails the page. Individual items that are
/// malformed are skipped, and bundle titles are filtered out.
pub fn decode_listing(url: &str, body: &[u8]) -> Result<Vec<PartialProduct>> {
    let response: ListingResponse =
        serde_json::from_slice(body).map_err(|source| ScraperError::Decode {
            url: url.to_string(),
            source,
        })?;

    let mut records = Vec::with_capacity(response.items.len());
    for value in response.items {
        let item = match serde_json::from_value::<ListingItem>(value) {
            Ok(item) => item,
            Err(e) => {
                warn!("Skipping malformed item on {}: {}", url, e);
                continue;
            }
        };

        match item.into_partial() {
            Ok(record) if is_bundle(&record.title) => {
                debug!("Excluding bundle {:?}", record.title);
            }
            Ok(record) => records.push(record),
            Err(reason) => warn!("Skipping item on {}: {}", url, reason),
        }
    }

    Ok(records)
}

/// The `ListingStage` struct pages through the listing API and turns each page into
/// partial product records.
pub struct ListingStage<'a> {
    gate: &'a FetchGate,
}

impl<'a> ListingStage<'a> {
    pub fn new(gate: &'a FetchGate) -> Self {
        Self { gate }
    }

    /// Fetches and decodes every page in `urls` concurrently.
    ///
    /// Pages are consumed in completion order. A page that fails to fetch or decode
    /// is logged and contributes nothing; its siblings are unaffected.
    pub async fn enumerate(
        &self,
        urls: Vec<String>,
        progress: &ProgressBar,
    ) -> StageOutput<PartialProduct> {
        let mut output = StageOutput {
            scheduled: urls.len(),
            ..StageOutput::default()
        };

        let mut pages = stream::iter(urls)
            .map(|url| async move {
                let result = self.fetch_page(&url).await;
                (url, result)
            })
            .buffer_unordered(self.gate.capacity());

        while let Some((url, result)) = pages.next().await {
            progress.inc(1);
            match result {
                Ok(records) => {
                    debug!("{} records from {}", records.len(), url);
                    output.items.extend(records);
                }
                Err(e) => {
                    warn!("Skipping listing page {}: {}", url, e);
                    output.failed += 1;
                }
            }
        }

        output
    }

    async fn fetch_page(&self, url: &str) -> Result<Vec<PartialProduct>> {
        let body = self.gate.fetch(url).await?;
        decode_listing(url, &body)
    }
}
