//! Sitemap discovery and parsing
//!
//! The sitemap location comes from the site's robots.txt. Documents may be
//! gzip-compressed (path ending in `.gz`). Parsing yields the sitemap-index
//! entries first and then the page entries, each in document order; nested
//! indexes are only expanded when the caller asks for it.

use crate::fetch::Dispatcher;
use crate::robots::host_key;
use crate::{HarvestError, Result};
use flate2::read::GzDecoder;
use quick_xml::events::Event;
use quick_xml::Reader;
use std::io::Read;
use url::Url;

/// Returns the sitemap URL declared in the robots.txt of `site`'s host
pub async fn sitemap_url(dispatcher: &Dispatcher, site: &Url) -> Result<Url> {
    let policy = dispatcher.resolve_policy(site).await?;

    let sitemap = policy
        .sitemap
        .as_deref()
        .ok_or_else(|| HarvestError::SitemapMissing {
            host: host_key(site).unwrap_or_else(|| site.to_string()),
        })?;

    Url::parse(sitemap).map_err(|e| HarvestError::InvalidUrl(format!("{}: {}", sitemap, e)))
}

/// Fetches one sitemap document and returns the URLs it lists
///
/// Index entries (`<sitemap><loc>`) come before page entries
/// (`<url><loc>`). Index entries are returned as is, not followed.
pub async fn get_sitemap(dispatcher: &Dispatcher, sitemap: &Url) -> Result<Vec<Url>> {
    let body = dispatcher.fetch_body(sitemap).await?;

    let xml = if sitemap.path().ends_with(".gz") {
        gunzip(&body.body).map_err(|source| HarvestError::Decompress {
            url: sitemap.to_string(),
            source,
        })?
    } else {
        body.text()
    };

    let urls = parse_sitemap(&xml)?;
    tracing::debug!("Sitemap {} lists {} URL(s)", sitemap, urls.len());
    Ok(urls)
}

/// Expands one level of sitemap index
///
/// Every entry whose path contains `filter` is fetched with [`get_sitemap`]
/// and the results are concatenated in entry order. Other entries are
/// dropped.
pub async fn expand_sitemap_index(
    dispatcher: &Dispatcher,
    entries: &[Url],
    filter: &str,
) -> Result<Vec<Url>> {
    let mut pages = Vec::new();

    for entry in entries.iter().filter(|u| u.path().contains(filter)) {
        let urls = get_sitemap(dispatcher, entry).await?;
        tracing::info!("Found {} page(s) in {}", urls.len(), entry);
        pages.extend(urls);
    }

    Ok(pages)
}

/// Parses sitemap XML into index entries followed by page entries
///
/// Only a `<loc>` directly inside `<sitemap>` or `<url>` counts, so image
/// and video extension locations are ignored. Namespace prefixes are
/// ignored when matching element names.
///
/// # Example
///
/// ```
/// use sumi_harvest::fetch::parse_sitemap;
///
/// let xml = r#"<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
///   <url><loc>https://example.com/a</loc></url>
/// </urlset>"#;
/// let urls = parse_sitemap(xml).unwrap();
/// assert_eq!(urls[0].as_str(), "https://example.com/a");
/// ```
pub fn parse_sitemap(xml: &str) -> Result<Vec<Url>> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<Vec<u8>> = Vec::new();
    let mut loc: Option<String> = None;
    let mut sitemaps = Vec::new();
    let mut pages = Vec::new();

    loop {
        match reader.read_event()? {
            Event::Start(start) => {
                let name = start.local_name().as_ref().to_vec();
                if name == b"loc" {
                    loc = Some(String::new());
                }
                stack.push(name);
            }
            Event::End(_) => {
                let closed = stack.pop();
                if closed.as_deref() != Some(b"loc".as_slice()) {
                    continue;
                }
                let Some(text) = loc.take() else { continue };
                match stack.last().map(Vec::as_slice) {
                    Some(b"sitemap") => sitemaps.push(text),
                    Some(b"url") => pages.push(text),
                    _ => {}
                }
            }
            Event::Text(text) => {
                if let Some(buf) = loc.as_mut() {
                    buf.push_str(&text.unescape()?);
                }
            }
            Event::CData(data) => {
                if let Some(buf) = loc.as_mut() {
                    buf.push_str(&String::from_utf8_lossy(&data.into_inner()));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    sitemaps
        .into_iter()
        .chain(pages)
        .map(|loc| {
            let loc = loc.trim();
            Url::parse(loc).map_err(|e| HarvestError::InvalidUrl(format!("{}: {}", loc, e)))
        })
        .collect()
}

fn gunzip(compressed: &[u8]) -> std::io::Result<String> {
    let mut xml = String::new();
    GzDecoder::new(compressed).read_to_string(&mut xml)?;
    Ok(xml)
}
