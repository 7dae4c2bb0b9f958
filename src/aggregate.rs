use crate::types::Product;
use serde::Serialize;
use std::collections::HashSet;
use tracing::warn;

/// The final catalog: at most one product per identity, in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct CrawlResult {
    products: Vec<Product>,
}

impl CrawlResult {
    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Product> {
        self.products.iter()
    }

    /// Looks up a product by identity.
    pub fn get(&self, identity: &str) -> Option<&Product> {
        self.products.iter().find(|p| p.identity() == identity)
    }

    pub fn into_products(self) -> Vec<Product> {
        self.products
    }
}

/// Collects completed products keyed by identity.
///
/// The first product inserted for an identity wins; later duplicates are discarded.
#[derive(Debug, Default)]
pub struct ResultAggregator {
    seen: HashSet<String>,
    products: Vec<Product>,
}

impl ResultAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `product` unless its identity is already present.
    ///
    /// # Returns
    ///
    /// `true` if the product was kept.
    pub fn insert(&mut self, product: Product) -> bool {
        if !self.seen.insert(product.identity().to_string()) {
            warn!("Discarding duplicate product {}", product.identity());
            return false;
        }
        self.products.push(product);
        true
    }

    pub fn finish(self) -> CrawlResult {
        CrawlResult {
            products: self.products,
        }
    }
}

/// Builds a `CrawlResult` from products in the order they completed.
pub fn aggregate(products: impl IntoIterator<Item = Product>) -> CrawlResult {
    let mut aggregator = ResultAggregator::new();
    for product in products {
        aggregator.insert(product);
    }
    aggregator.finish()
}
