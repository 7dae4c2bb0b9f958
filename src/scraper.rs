use crate::types::{PartialProduct, Product};
use crate::{Result, ScraperError};
use scraper::{ElementRef, Html, Selector};
use tracing::instrument;

/// EBC colour scale shown on the detail page, lightest first.
pub const EBC_COLOURS: [&str; 13] = [
    "#f0eebc", "#f7e385", "#dcb236", "#d5a435", "#c88b2d", "#bb7531", "#a7582e", "#984626",
    "#813124", "#682519", "#501113", "#311214", "#0e0506",
];

/// Placeholder the shop uses when any glass will do.
const ANY_GLASS_MARKER: &str = "lekker";

/// Position of the country entry in the product facts list.
const COUNTRY_INDEX: usize = 3;
/// Position of the brewer entry in the product facts list.
const BREWER_INDEX: usize = 4;

/// Turns a fetched detail page into a complete product.
///
/// Implementations consume the partial record and either return the enriched
/// product or an extraction error; fields the page does not carry are left `None`.
pub trait PageParser: Send + Sync {
    fn parse(&self, body: &[u8], partial: PartialProduct) -> Result<Product>;
}

/// The `HtmlPageParser` struct extracts the detail fields from the shop's product page
/// using CSS selectors.
pub struct HtmlPageParser {
    product_info: Selector,
    fact_values: Selector,
    serving: Selector,
    serving_entries: Selector,
    ebc: Selector,
}

impl Default for HtmlPageParser {
    fn default() -> Self {
        Self {
            product_info: selector(".row.product-info"),
            fact_values: selector("dd"),
            serving: selector("ul.serving.no-bullet"),
            serving_entries: selector("li"),
            ebc: selector(".ebc"),
        }
    }
}

/// Parses one of the fixed selectors above.
fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("valid built-in selector")
}

impl PageParser for HtmlPageParser {
    #[instrument(skip(self, body, partial), fields(url = %partial.url, body_length = body.len()))]
    fn parse(&self, body: &[u8], partial: PartialProduct) -> Result<Product> {
        let html = String::from_utf8_lossy(body);
        let document = Html::parse_document(&html);

        let extraction_error = |reason: &str| ScraperError::Extraction {
            url: partial.url.clone(),
            reason: reason.to_string(),
        };

        let info = document
            .select(&self.product_info)
            .next()
            .and_then(|row| child_elements(row).next())
            .ok_or_else(|| extraction_error("missing product-info block"))?;

        let facts_list = child_elements(info)
            .find(|child| child.value().name() == "dl")
            .ok_or_else(|| extraction_error("missing product facts list"))?;
        let facts: Vec<ElementRef> = facts_list.select(&self.fact_values).collect();
        if facts.len() <= BREWER_INDEX {
            return Err(extraction_error("product facts list is too short"));
        }

        let description = self.description(info);
        let country = leading_text(facts[COUNTRY_INDEX]);
        let brewer = leading_text(facts[BREWER_INDEX]);
        let (serving_temperature, serving_glass) = self.serving(&document);
        let beer_colour = self.beer_colour(&document);

        let mut product = Product::from_partial(partial);
        product.description = description;
        product.country = country;
        product.brewer = brewer;
        product.serving_temperature = serving_temperature;
        product.serving_glass = serving_glass;
        product.beer_colour = beer_colour;
        Ok(product)
    }
}

impl HtmlPageParser {
    /// The description is the first child when it precedes the facts list, and the
    /// block's own text otherwise.
    fn description(&self, info: ElementRef) -> Option<String> {
        match child_elements(info).next() {
            Some(first) if first.value().name() != "dl" => clean(&element_text(first)),
            _ => clean(&own_text(info)),
        }
    }

    fn serving(&self, document: &Html) -> (Option<String>, Option<String>) {
        let Some(list) = document.select(&self.serving).next() else {
            return (None, None);
        };
        let entries: Vec<ElementRef> = list.select(&self.serving_entries).collect();

        let temperature = entries.first().and_then(|entry| labelled_value(*entry));
        let glass = entries
            .get(1)
            .and_then(|entry| labelled_value(*entry))
            .filter(|glass| !glass.to_lowercase().contains(ANY_GLASS_MARKER));

        (temperature, glass)
    }

    fn beer_colour(&self, document: &Html) -> Option<String> {
        let scale = document.select(&self.ebc).next()?;
        child_elements(scale)
            .position(|step| step.value().attr("class") == Some("active"))
            .and_then(|index| EBC_COLOURS.get(index))
            .map(|colour| colour.to_string())
    }
}

fn child_elements<'a>(element: ElementRef<'a>) -> impl Iterator<Item = ElementRef<'a>> + 'a {
    element.children().filter_map(ElementRef::wrap)
}

fn element_text(element: ElementRef) -> String {
    element.text().collect::<Vec<_>>().join(" ")
}

/// Text nodes directly under `element`, ignoring its children's text.
fn own_text(element: ElementRef) -> String {
    element
        .children()
        .filter_map(|node| node.value().as_text().map(|text| text.to_string()))
        .collect::<Vec<_>>()
        .join(" ")
}

/// The text of the first child element if there is one, else the element's own text.
fn leading_text(element: ElementRef) -> Option<String> {
    match child_elements(element).next() {
        Some(child) => clean(&element_text(child)),
        None => clean(&element_text(element)),
    }
}

/// The value of a `label: value` entry held in the entry's second element, with
/// whitespace removed.
fn labelled_value(entry: ElementRef) -> Option<String> {
    let value = child_elements(entry).nth(1)?;
    let compact: String = element_text(value)
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    let value = match compact.split_once(':') {
        Some((_, rest)) => rest.to_string(),
        None => compact,
    };
    (!value.is_empty()).then_some(value)
}

/// Collapses whitespace; empty text is absent.
fn clean(text: &str) -> Option<String> {
    let cleaned = text.split_whitespace().collect::<Vec<_>>().join(" ");
    (!cleaned.is_empty()).then_some(cleaned)
}
