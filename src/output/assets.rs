//! Asset files downloaded alongside the metadata

use crate::Result;
use std::path::{Path, PathBuf};

/// Returns the path an asset named `name` is stored at
pub fn asset_path(dir: &Path, name: &str) -> PathBuf {
    dir.join(format!("{}.png", name))
}

/// Writes an asset into `dir`, creating the directory if needed
///
/// # Arguments
///
/// * `dir` - The asset directory
/// * `name` - The asset name, without extension
/// * `bytes` - The file contents
///
/// # Returns
///
/// * `Ok(PathBuf)` - Where the asset was written
/// * `Err(HarvestError)` - The directory or file could not be written
pub async fn save_asset(dir: &Path, name: &str, bytes: &[u8]) -> Result<PathBuf> {
    tokio::fs::create_dir_all(dir).await?;
    let path = asset_path(dir, name);
    tokio::fs::write(&path, bytes).await?;
    Ok(path)
}
