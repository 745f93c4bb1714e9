//! Crawler module: the end-to-end harvest run
//!
//! This module contains:
//! - The bounded-concurrency fetch orchestrator
//! - Progress reporting (interactive bar or throttled log lines)
//! - The harvest run tying sitemap discovery, page extraction, asset
//!   downloads and metadata output together

mod orchestrator;
mod progress;

pub use orchestrator::Orchestrator;
pub use progress::{
    BarAwareWriter, BarSlot, BatchProgress, ProgressLogWriter, ProgressReporter, ProgressState,
};

use crate::config::{Config, TargetConfig};
use crate::fetch::{expand_sitemap_index, get_sitemap, sitemap_url, Dispatcher};
use crate::output::{save_asset, write_metadata};
use crate::topic::{extract_topic, Topic};
use crate::{HarvestError, Result};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use url::Url;

/// Counts reported at the end of a harvest
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HarvestSummary {
    /// Pages fetched and parsed
    pub pages: usize,
    /// Distinct topics written to the metadata file
    pub topics: usize,
    /// Assets downloaded
    pub assets: usize,
}

/// What one page contributed to the run
struct PageResult {
    topic: Topic,
    asset_saved: bool,
}

/// Runs a complete harvest
///
/// The run:
/// 1. Whitelists the configured hosts
/// 2. Reads the sitemap index declared in the site's robots.txt and expands
///    the entries matching the sitemap filter into a page list
/// 3. Fetches every page under the concurrency limit, extracting its topic
///    and downloading the topic image when it matches the asset rule
/// 4. Writes the aggregated metadata once every page has been processed
///
/// # Arguments
///
/// * `config` - The validated harvest configuration
///
/// # Returns
///
/// * `Ok(HarvestSummary)` - Harvest completed
/// * `Err(HarvestError)` - The first failure that aborted the run
pub async fn harvest(config: &Config) -> Result<HarvestSummary> {
    let started = Instant::now();
    let dispatcher = Arc::new(Dispatcher::new(config)?);

    for host in &config.target.whitelist {
        dispatcher.whitelist(host);
    }

    let site = Url::parse(&config.target.site)?;
    let sitemap = sitemap_url(&dispatcher, &site).await?;
    tracing::info!("Sitemap for {} is {}", site, sitemap);

    let index = get_sitemap(&dispatcher, &sitemap).await?;
    let pages = expand_sitemap_index(&dispatcher, &index, &config.target.sitemap_filter).await?;
    tracing::info!("Discovered {} page(s) to harvest", pages.len());

    let orchestrator = Orchestrator::from_config(dispatcher.clone(), config);
    let target = config.target.clone();
    let assets_dir = PathBuf::from(&config.output.assets_dir);

    let results = orchestrator
        .run(pages, move |page, html| {
            let dispatcher = dispatcher.clone();
            let target = target.clone();
            let assets_dir = assets_dir.clone();
            async move { process_page(&dispatcher, &target, &assets_dir, page, html).await }
        })
        .await?;

    let mut summary = HarvestSummary {
        pages: results.len(),
        ..Default::default()
    };
    let mut topics = BTreeMap::new();

    for result in results {
        if result.asset_saved {
            summary.assets += 1;
        }
        topics.insert(result.topic.name.clone(), result.topic);
    }
    summary.topics = topics.len();

    write_metadata(&PathBuf::from(&config.output.metadata_path), &topics).await?;

    tracing::info!(
        "Harvest completed: {} page(s), {} topic(s), {} asset(s) in {:?}",
        summary.pages,
        summary.topics,
        summary.assets,
        started.elapsed()
    );

    Ok(summary)
}

/// Returns true if the image at `image_url` should be downloaded
pub fn is_harvested_asset(target: &TargetConfig, image_url: &str) -> bool {
    image_url.starts_with(&target.asset_prefix) && image_url.ends_with(".png")
}

async fn process_page(
    dispatcher: &Dispatcher,
    target: &TargetConfig,
    assets_dir: &std::path::Path,
    page: Url,
    html: String,
) -> Result<PageResult> {
    let topic = extract_topic(&page, &html)?;
    let mut asset_saved = false;

    if is_harvested_asset(target, &topic.image_url) {
        let image_url = Url::parse(&topic.image_url)
            .map_err(|e| HarvestError::InvalidUrl(format!("{}: {}", topic.image_url, e)))?;

        match dispatcher.optional_bytes(&image_url).await? {
            Some(bytes) => {
                save_asset(assets_dir, &topic.name, &bytes).await?;
                tracing::info!("Downloaded {}.png", page);
                asset_saved = true;
            }
            None => tracing::warn!("Image for topic {} not found at {}", topic.name, image_url),
        }
    } else {
        tracing::debug!("Skipping image {} for topic {}", topic.image_url, topic.name);
    }

    Ok(PageResult { topic, asset_saved })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target() -> TargetConfig {
        TargetConfig {
            site: "https://example.com".to_string(),
            sitemap_filter: "topic".to_string(),
            whitelist: vec![],
            asset_prefix: "https://cdn.example.com/topics/".to_string(),
        }
    }

    #[test]
    fn test_asset_rule() {
        let target = target();

        assert!(is_harvested_asset(&target, "https://cdn.example.com/topics/rust.png"));
        assert!(!is_harvested_asset(&target, "https://cdn.example.com/topics/rust.jpg"));
        assert!(!is_harvested_asset(&target, "https://cdn.example.com/users/rust.png"));
        assert!(!is_harvested_asset(&target, "https://other.example.com/topics/rust.png"));
    }
}
