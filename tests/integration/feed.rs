//! RSS scanning against a local feed server.

use axum::{http::StatusCode, routing::get, Router};
use std::time::Duration;

use dealhunter::engine::scanner::{DealSource, RssDealSource};
use dealhunter::error::PipelineError;
use dealhunter::types::Memory;

const FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>Test deals</title>
    <item>
      <title>Instant Pot Duo 6qt for $59 + free shipping</title>
      <link>https://deals.example.com/instant-pot</link>
      <description>&lt;p&gt;7-in-1 electric pressure cooker.&lt;/p&gt;</description>
    </item>
    <item>
      <title>Samsung T7 1TB portable SSD</title>
      <link>https://deals.example.com/samsung-t7</link>
      <description><![CDATA[Now <b>$79.99</b> at Amazon, was $129.99]]></description>
    </item>
    <item>
      <title>Sitewide sale: 20% off everything</title>
      <link>https://deals.example.com/sitewide</link>
      <description>Coupon required</description>
    </item>
  </channel>
</rss>"#;

/// Serve the test feed at /good and a 500 at /broken on an ephemeral port.
async fn feed_server() -> String {
    let app = Router::new()
        .route("/good", get(|| async { FEED }))
        .route("/broken", get(|| async { StatusCode::INTERNAL_SERVER_ERROR }));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

fn source(urls: Vec<String>) -> RssDealSource {
    RssDealSource::new(urls, 10, Duration::from_secs(5)).unwrap()
}

#[tokio::test]
async fn test_scan_prices_deals_from_feed_text() {
    let base = feed_server().await;
    let selection = source(vec![format!("{base}/good")]).scan(&Memory::new()).await.unwrap();

    assert_eq!(selection.len(), 2);
    assert_eq!(selection.deals[0].url, "https://deals.example.com/instant-pot");
    assert_eq!(selection.deals[0].price, 59.0);
    assert!(selection.deals[0].product_description.contains("pressure cooker"));
    assert_eq!(selection.deals[1].price, 79.99);
}

#[tokio::test]
async fn test_scan_skips_remembered_urls() {
    let base = feed_server().await;
    let memory: Memory = ["https://deals.example.com/instant-pot"].into_iter().collect();
    let selection = source(vec![format!("{base}/good")]).scan(&memory).await.unwrap();

    assert_eq!(selection.len(), 1);
    assert_eq!(selection.deals[0].url, "https://deals.example.com/samsung-t7");
}

#[tokio::test]
async fn test_one_broken_feed_is_tolerated() {
    let base = feed_server().await;
    let selection = source(vec![format!("{base}/broken"), format!("{base}/good")])
        .scan(&Memory::new())
        .await
        .unwrap();
    assert_eq!(selection.len(), 2);
}

#[tokio::test]
async fn test_all_feeds_broken_is_source_unavailable() {
    let base = feed_server().await;
    let err = source(vec![format!("{base}/broken")])
        .scan(&Memory::new())
        .await
        .unwrap_err();
    assert!(matches!(err, PipelineError::SourceUnavailable(ref msg) if msg.contains("500")));
}
