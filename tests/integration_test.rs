use brewscrape::{
    config::ScraperConfig, images::ImageDownloader, CrawlReport, Crawler, FetchGate, Product,
};
use mockito::{Matcher, Server, ServerGuard};
use serde_json::json;
use tempfile::tempdir;

const DETAIL_PAGE: &str = r#"
    <html>
        <body>
            <div class="row product-info">
                <div>
                    <p>Fris en helder.</p>
                    <dl>
                        <dt>Stijl</dt><dd>Pilsner</dd>
                        <dt>Inhoud</dt><dd>33 cl</dd>
                        <dt>Alcohol</dt><dd>5%</dd>
                        <dt>Land</dt><dd><a href="/nl">Nederland</a></dd>
                        <dt>Brouwer</dt><dd>Brouwerij Test</dd>
                    </dl>
                </div>
            </div>
        </body>
    </html>
"#;

fn item(reference: &str, title: &str) -> serde_json::Value {
    json!({
        "contentReference": reference,
        "title": title,
        "displayInformationPrice": { "price": "€ 1.99", "discountPrice": "" },
        "images": [{ "image": format!("https://img.example.com{reference}.png") }],
        "style": "Pilsner",
        "volume": 33,
        "alcoholPercentage": 5.0
    })
}

fn listing_body(items: Vec<serde_json::Value>) -> String {
    json!({ "items": items }).to_string()
}

fn test_config(server: &ServerGuard, page_count: usize) -> ScraperConfig {
    ScraperConfig {
        start_url: format!("{}/api/search?pageSize=48", server.url()),
        detail_base_url: server.url(),
        page_count,
        timeout_secs: 5,
        show_progress: false,
        ..ScraperConfig::default()
    }
}

async fn mock_listing_page(
    server: &mut ServerGuard,
    page: usize,
    items: Vec<serde_json::Value>,
) -> mockito::Mock {
    server
        .mock("GET", "/api/search")
        .match_query(Matcher::UrlEncoded("page".into(), page.to_string()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(listing_body(items))
        .create_async()
        .await
}

async fn mock_detail_page(server: &mut ServerGuard, path: &str, hits: usize) -> mockito::Mock {
    server
        .mock("GET", path)
        .with_status(200)
        .with_header("content-type", "text/html")
        .with_body(DETAIL_PAGE)
        .expect(hits)
        .create_async()
        .await
}

async fn crawl(config: ScraperConfig) -> CrawlReport {
    Crawler::new(config).unwrap().run().await
}

fn sorted(products: Vec<Product>) -> Vec<Product> {
    let mut products = products;
    products.sort_by(|a, b| a.identity().cmp(b.identity()));
    products
}

#[tokio::test]
async fn test_bundles_are_filtered_and_survivor_is_enriched() {
    let mut server = Server::new_async().await;
    let _listing = mock_listing_page(
        &mut server,
        1,
        vec![
            item("/p/pilsner-6-pack", "Pilsner 6-pack"),
            item("/p/pilsner-single", "Pilsner Single"),
        ],
    )
    .await;
    let single = mock_detail_page(&mut server, "/p/pilsner-single", 1).await;
    let bundle = mock_detail_page(&mut server, "/p/pilsner-6-pack", 0).await;

    let report = crawl(test_config(&server, 2)).await;

    single.assert_async().await;
    bundle.assert_async().await;
    assert_eq!(report.result.len(), 1);

    let product = report.result.get("/p/pilsner-single").unwrap();
    assert_eq!(product.listing.title, "Pilsner Single");
    assert_eq!(product.listing.price, Some(1.99));
    assert_eq!(product.listing.discounted_price, None);
    assert_eq!(product.description.as_deref(), Some("Fris en helder."));
    assert_eq!(product.country.as_deref(), Some("Nederland"));
    assert_eq!(product.brewer.as_deref(), Some("Brouwerij Test"));
    assert_eq!(report.summary.discovered, 1);
    assert_eq!(report.summary.completed, 1);
}

#[tokio::test]
async fn test_identity_on_two_pages_is_fetched_once() {
    let mut server = Server::new_async().await;
    let page_1 = vec![item("/p/dup", "Dubbel"), item("/p/one", "Een")];
    let page_2 = vec![item("/p/dup", "Dubbel"), item("/p/two", "Twee")];
    let _page_1 = mock_listing_page(&mut server, 1, page_1).await;
    let _page_2 = mock_listing_page(&mut server, 2, page_2).await;
    let dup = mock_detail_page(&mut server, "/p/dup", 1).await;
    let _one = mock_detail_page(&mut server, "/p/one", 1).await;
    let _two = mock_detail_page(&mut server, "/p/two", 1).await;

    let report = crawl(test_config(&server, 3)).await;

    dup.assert_async().await;
    assert_eq!(report.result.len(), 3);
    assert_eq!(report.result.iter().filter(|p| p.identity() == "/p/dup").count(), 1);
    assert_eq!(report.summary.duplicates, 1);
}

#[tokio::test]
async fn test_failing_detail_pages_drop_only_themselves() {
    let mut server = Server::new_async().await;
    let _listing = mock_listing_page(
        &mut server,
        1,
        vec![
            item("/p/a", "Alpha"),
            item("http://127.0.0.1:1/p/unreachable", "Unreachable"),
            item("/p/malformed", "Malformed"),
            item("/p/b", "Beta"),
        ],
    )
    .await;
    let _a = mock_detail_page(&mut server, "/p/a", 1).await;
    let _b = mock_detail_page(&mut server, "/p/b", 1).await;
    let _malformed = server
        .mock("GET", "/p/malformed")
        .with_status(500)
        .with_body("<html><body>Internal error</body></html>")
        .create_async()
        .await;

    let report = crawl(test_config(&server, 2)).await;

    assert_eq!(report.result.len(), 2);
    assert!(report.result.get("/p/a").is_some());
    assert!(report.result.get("/p/b").is_some());
    assert_eq!(report.summary.discovered, 4);
    assert_eq!(report.summary.dropped, 2);
}

#[tokio::test]
async fn test_failing_listing_page_does_not_abort_siblings() {
    let mut server = Server::new_async().await;
    let _broken = server
        .mock("GET", "/api/search")
        .match_query(Matcher::UrlEncoded("page".into(), "1".into()))
        .with_status(502)
        .with_body("Bad gateway")
        .create_async()
        .await;
    let _page_2 = mock_listing_page(&mut server, 2, vec![item("/p/ok", "Ok")]).await;
    let _ok = mock_detail_page(&mut server, "/p/ok", 1).await;

    let report = crawl(test_config(&server, 3)).await;

    assert_eq!(report.summary.listing_pages, 2);
    assert_eq!(report.summary.listing_pages_failed, 1);
    assert_eq!(report.result.len(), 1);
}

#[tokio::test]
async fn test_page_count_is_exclusive() {
    let mut server = Server::new_async().await;
    let pages = server
        .mock("GET", "/api/search")
        .match_query(Matcher::Regex(r"&page=\d+$".into()))
        .with_status(200)
        .with_body(listing_body(vec![]))
        .expect(21)
        .create_async()
        .await;

    let report = crawl(test_config(&server, 22)).await;

    pages.assert_async().await;
    assert_eq!(report.summary.listing_pages, 21);
    assert!(report.result.is_empty());
}

#[tokio::test]
async fn test_rerun_yields_equal_result_set() {
    let mut server = Server::new_async().await;
    let page_1 = vec![item("/p/a", "Alpha"), item("/p/b", "Beta")];
    let _page_1 = mock_listing_page(&mut server, 1, page_1).await;
    let _page_2 = mock_listing_page(&mut server, 2, vec![item("/p/c", "Gamma")]).await;
    let _a = mock_detail_page(&mut server, "/p/a", 2).await;
    let _b = mock_detail_page(&mut server, "/p/b", 2).await;
    let _c = mock_detail_page(&mut server, "/p/c", 2).await;

    let crawler = Crawler::new(test_config(&server, 3)).unwrap();
    let first = crawler.run().await;
    let second = crawler.run().await;

    assert_eq!(first.result.len(), 3);
    assert_eq!(
        sorted(first.result.into_products()),
        sorted(second.result.into_products())
    );
}

#[tokio::test]
async fn test_images_are_downloaded_once_per_url() {
    let mut server = Server::new_async().await;
    let image = server
        .mock("GET", "/img/pils.png")
        .with_status(200)
        .with_body(b"\x89PNG fake image")
        .expect(1)
        .create_async()
        .await;

    let pils: Product = serde_json::from_value(json!({
        "url": "/p/pils",
        "title": "Pils Fles",
        "price": 1.99,
        "discounted_price": null,
        "image_url": format!("{}/img/pils.png", server.url()),
        "description": null,
        "category": "Pilsner",
        "content": 33.0,
        "alcohol_percentage": 5.0,
        "brewer": null,
        "country": null,
        "serving_temperature": null,
        "serving_glass": null,
        "beer_colour": null
    }))
    .unwrap();
    let mut twin = pils.clone();
    twin.listing.url = "/p/pils-twin".to_string();

    let config = test_config(&server, 1);
    let gate = FetchGate::new(&config).unwrap();
    let out_dir = tempdir().unwrap();

    let report = ImageDownloader::new(&gate, out_dir.path())
        .download_all(&[pils, twin])
        .await
        .unwrap();
    let saved = std::fs::read(out_dir.path().join("pils-fles.png")).unwrap();

    image.assert_async().await;
    assert_eq!(report.saved, 1);
    assert_eq!(report.duplicates, 1);
    assert_eq!(saved, b"\x89PNG fake image");
}
