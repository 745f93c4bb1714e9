//! Aggregated topic metadata written at the end of a run

use crate::topic::Topic;
use crate::Result;
use std::collections::BTreeMap;
use std::path::Path;

/// Serializes the metadata map as indented JSON
///
/// Keys come out sorted and non-ASCII text is kept as-is.
pub fn render_metadata(topics: &BTreeMap<String, Topic>) -> Result<String> {
    Ok(serde_json::to_string_pretty(topics)?)
}

/// Writes the metadata map to `path`, creating parent directories
pub async fn write_metadata(path: &Path, topics: &BTreeMap<String, Topic>) -> Result<()> {
    let rendered = render_metadata(topics)?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, rendered).await?;

    tracing::info!("Wrote metadata for {} topic(s) to {}", topics.len(), path.display());
    Ok(())
}
