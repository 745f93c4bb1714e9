//! Output module for the artifacts a harvest produces
//!
//! This module handles:
//! - Writing downloaded assets into the asset directory
//! - Writing the aggregated topic metadata as JSON

mod assets;
mod metadata;

pub use assets::{asset_path, save_asset};
pub use metadata::{render_metadata, write_metadata};
