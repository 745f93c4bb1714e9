//! Integration tests for the harvest run
//!
//! These tests use wiremock to stand up a site (robots.txt, sitemap index,
//! topic sitemaps and pages) and an asset host, and run the full harvest
//! end-to-end into a temporary directory.

use std::path::Path;
use sumi_harvest::config::{parse_config, Config};
use sumi_harvest::crawler::harvest;
use sumi_harvest::HarvestError;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const PNG_BYTES: &[u8] = b"\x89PNG\r\n\x1a\nfake image";

/// Builds a test configuration for `site`, writing outputs under `out`
fn create_test_config(site: &str, asset_host: &str, asset_prefix: &str, out: &Path) -> Config {
    let toml = format!(
        r#"
[crawler]
max-concurrent-pages = 2
progress = "batch"
progress-interval-ms = 50

[user-agent]
crawler-identity = "TestBot/1.0 (+https://example.com/bot)"

[retry]
max-attempts = 1
base-delay-ms = 1

[timeouts]
connect-secs = 5
read-secs = 5

[target]
site = "{site}"
sitemap-filter = "topic"
whitelist = ["{asset_host}"]
asset-prefix = "{asset_prefix}"

[output]
assets-dir = "{assets}"
metadata-path = "{metadata}"
"#,
        site = site,
        asset_host = asset_host,
        asset_prefix = asset_prefix,
        assets = out.join("images").display(),
        metadata = out.join("metadata.json").display(),
    );

    parse_config(&toml).expect("test config should be valid")
}

fn host_of(server: &MockServer) -> String {
    let url = url::Url::parse(&server.uri()).expect("Failed to parse server URI");
    format!(
        "{}:{}",
        url.host_str().expect("Failed to extract host"),
        url.port().expect("Mock server always has a port")
    )
}

fn topic_page(name: &str, display_name: &str, image_url: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head><title>{display_name}</title></head>
<body>
<div id="__next"></div>
<script id="__NEXT_DATA__" type="application/json">{{"props":{{"pageProps":{{"resTopic":{{"id":1,"name":"{name}","taggingsCount":12,"imageUrl":"{image_url}","displayName":"{display_name}","articlesCount":10,"booksCount":1,"scrapsCount":1}},"isContest":false,"currentPage":1,"activeItemType":"article","articles":[]}}}},"page":"/topics/[name]","query":{{"name":"{name}"}},"buildId":"test"}}</script>
</body>
</html>"#,
        name = name,
        display_name = display_name,
        image_url = image_url,
    )
}

fn sitemap_index(entries: &[String]) -> String {
    let body: String = entries
        .iter()
        .map(|loc| format!("  <sitemap><loc>{}</loc></sitemap>\n", loc))
        .collect();
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<sitemapindex xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\">\n{}</sitemapindex>",
        body
    )
}

fn urlset(entries: &[String]) -> String {
    let body: String = entries
        .iter()
        .map(|loc| format!("  <url><loc>{}</loc></url>\n", loc))
        .collect();
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<urlset xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\">\n{}</urlset>",
        body
    )
}

async fn mount_text(server: &MockServer, route: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_full_harvest() {
    let site = MockServer::start().await;
    let assets = MockServer::start().await;
    let base = site.uri();
    let asset_prefix = format!("{}/topics/", assets.uri());
    let out = TempDir::new().expect("Failed to create temp dir");

    mount_text(
        &site,
        "/robots.txt",
        format!(
            "User-agent: *\nDisallow: /private\n\nSitemap: {}/sitemap.xml\n",
            base
        ),
    )
    .await;
    mount_text(
        &site,
        "/sitemap.xml",
        sitemap_index(&[
            format!("{}/sitemaps/topic1.xml", base),
            format!("{}/sitemaps/article1.xml", base),
        ]),
    )
    .await;
    mount_text(
        &site,
        "/sitemaps/topic1.xml",
        urlset(&[
            format!("{}/topics/rust", base),
            format!("{}/topics/go", base),
            format!("{}/topics/ai", base),
        ]),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/sitemaps/article1.xml"))
        .respond_with(ResponseTemplate::new(200).set_body_string(urlset(&[])))
        .expect(0)
        .mount(&site)
        .await;

    mount_text(
        &site,
        "/topics/rust",
        topic_page("rust", "Rust", &format!("{}rust.png", asset_prefix)),
    )
    .await;
    mount_text(
        &site,
        "/topics/go",
        topic_page("go", "Go", &format!("{}go.png", asset_prefix)),
    )
    .await;
    mount_text(
        &site,
        "/topics/ai",
        topic_page("ai", "人工知能", "https://elsewhere.example.com/ai.png"),
    )
    .await;

    // Whitelisted asset host: robots.txt must never be requested
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string("User-agent: *\nDisallow: /"))
        .expect(0)
        .mount(&assets)
        .await;
    Mock::given(method("GET"))
        .and(path("/topics/rust.png"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(PNG_BYTES))
        .expect(1)
        .mount(&assets)
        .await;
    Mock::given(method("GET"))
        .and(path("/topics/go.png"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&assets)
        .await;

    let config = create_test_config(&base, &host_of(&assets), &asset_prefix, out.path());
    let summary = harvest(&config).await.expect("Harvest should succeed");

    assert_eq!(summary.pages, 3);
    assert_eq!(summary.topics, 3);
    assert_eq!(summary.assets, 1);

    let images = out.path().join("images");
    assert_eq!(
        std::fs::read(images.join("rust.png")).expect("rust.png should exist"),
        PNG_BYTES
    );
    assert!(!images.join("go.png").exists());
    assert!(!images.join("ai.png").exists());

    let raw = std::fs::read_to_string(out.path().join("metadata.json"))
        .expect("metadata.json should exist");
    assert!(raw.contains("人工知能"));

    let metadata: serde_json::Value = serde_json::from_str(&raw).expect("valid JSON");
    let keys: Vec<&String> = metadata
        .as_object()
        .expect("metadata is an object")
        .keys()
        .collect();
    assert_eq!(keys, vec!["ai", "go", "rust"]);
    assert_eq!(metadata["rust"]["displayName"], "Rust");
    assert_eq!(metadata["go"]["taggingsCount"], 12);
}

#[tokio::test]
async fn test_harvest_fails_without_sitemap() {
    let site = MockServer::start().await;
    let out = TempDir::new().expect("Failed to create temp dir");

    mount_text(&site, "/robots.txt", "User-agent: *\nAllow: /\n".to_string()).await;

    let config = create_test_config(
        &site.uri(),
        "cdn.example.com",
        "https://cdn.example.com/topics/",
        out.path(),
    );
    let err = harvest(&config).await.expect_err("Harvest should fail");

    assert!(matches!(err, HarvestError::SitemapMissing { .. }));
    assert!(!out.path().join("metadata.json").exists());
}

#[tokio::test]
async fn test_disallowed_page_aborts_harvest() {
    let site = MockServer::start().await;
    let base = site.uri();
    let out = TempDir::new().expect("Failed to create temp dir");

    mount_text(
        &site,
        "/robots.txt",
        format!(
            "User-agent: *\nDisallow: /topics/secret\nSitemap: {}/sitemap.xml\n",
            base
        ),
    )
    .await;
    mount_text(
        &site,
        "/sitemap.xml",
        sitemap_index(&[format!("{}/sitemaps/topic1.xml", base)]),
    )
    .await;
    mount_text(
        &site,
        "/sitemaps/topic1.xml",
        urlset(&[format!("{}/topics/secret", base)]),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/topics/secret"))
        .respond_with(ResponseTemplate::new(200).set_body_string("never served"))
        .expect(0)
        .mount(&site)
        .await;

    let config = create_test_config(
        &base,
        "cdn.example.com",
        "https://cdn.example.com/topics/",
        out.path(),
    );
    let err = harvest(&config).await.expect_err("Harvest should fail");

    assert!(matches!(err, HarvestError::PolicyViolation { .. }));
}

#[tokio::test]
async fn test_malformed_page_aborts_harvest() {
    let site = MockServer::start().await;
    let base = site.uri();
    let out = TempDir::new().expect("Failed to create temp dir");

    mount_text(
        &site,
        "/robots.txt",
        format!("User-agent: *\nAllow: /\nSitemap: {}/sitemap.xml\n", base),
    )
    .await;
    mount_text(
        &site,
        "/sitemap.xml",
        sitemap_index(&[format!("{}/topic-sitemap.xml", base)]),
    )
    .await;
    mount_text(
        &site,
        "/topic-sitemap.xml",
        urlset(&[format!("{}/topics/broken", base)]),
    )
    .await;
    mount_text(
        &site,
        "/topics/broken",
        "<html><body>no payload here</body></html>".to_string(),
    )
    .await;

    let config = create_test_config(
        &base,
        "cdn.example.com",
        "https://cdn.example.com/topics/",
        out.path(),
    );
    let err = harvest(&config).await.expect_err("Harvest should fail");

    assert!(matches!(err, HarvestError::AmbiguousPageStructure { .. }));
}
