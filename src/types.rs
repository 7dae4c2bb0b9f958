use serde::{Deserialize, Serialize};

/// A product as it is known after the listing stage.
///
/// The `url` is the product's identity: the reference the listing API hands out, which
/// is either an absolute URL or a path on the shop's origin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartialProduct {
    pub url: String,
    pub title: String,
    pub price: Option<f64>,
    pub discounted_price: Option<f64>,
    pub image_url: String,
    pub category: Option<String>,
    pub content: Option<f64>,
    pub alcohol_percentage: Option<f64>,
}

/// A product after its detail page has been extracted.
///
/// Serializes as one flat object: the listing fields followed by the detail fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    #[serde(flatten)]
    pub listing: PartialProduct,
    pub description: Option<String>,
    pub country: Option<String>,
    pub brewer: Option<String>,
    pub serving_temperature: Option<String>,
    pub serving_glass: Option<String>,
    pub beer_colour: Option<String>,
}

impl Product {
    /// Wraps a partial record with every detail field absent.
    pub fn from_partial(listing: PartialProduct) -> Self {
        Self {
            listing,
            description: None,
            country: None,
            brewer: None,
            serving_temperature: None,
            serving_glass: None,
            beer_colour: None,
        }
    }

    /// The identity shared with the partial record this product was built from.
    pub fn identity(&self) -> &str {
        &self.listing.url
    }
}

/// The successes of one concurrent stage along with how many work items were dropped.
#[derive(Debug)]
pub struct StageOutput<T> {
    pub items: Vec<T>,
    pub scheduled: usize,
    pub failed: usize,
}

impl<T> Default for StageOutput<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            scheduled: 0,
            failed: 0,
        }
    }
}

/// Builds a listing record for unit tests across the crate.
#[cfg(test)]
pub(crate) fn sample_partial(url: &str, title: &str) -> PartialProduct {
    PartialProduct {
        url: url.to_string(),
        title: title.to_string(),
        price: Some(1.99),
        discounted_price: None,
        image_url: format!("https://img.example.com{url}.png"),
        category: Some("Pilsner".to_string()),
        content: Some(33.0),
        alcohol_percentage: Some(5.0),
    }
}
