use serde::Deserialize;

/// Main configuration structure for Sumi-Harvest
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub timeouts: TimeoutConfig,
    pub target: TargetConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Maximum number of page fetches in flight at once
    #[serde(rename = "max-concurrent-pages", default = "default_max_concurrent_pages")]
    pub max_concurrent_pages: u32,

    /// How progress is reported while pages are fetched
    #[serde(default)]
    pub progress: ProgressMode,

    /// Minimum time between batch progress lines (milliseconds)
    #[serde(rename = "progress-interval-ms", default = "default_progress_interval_ms")]
    pub progress_interval_ms: u64,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_pages: default_max_concurrent_pages(),
            progress: ProgressMode::default(),
            progress_interval_ms: default_progress_interval_ms(),
        }
    }
}

/// Progress reporting style
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgressMode {
    /// Redrawing progress bar, updated on every completion
    #[default]
    Interactive,
    /// Throttled plain log lines, suitable for CI logs
    Batch,
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Free-text crawler identity appended to the browser signature
    #[serde(rename = "crawler-identity")]
    pub crawler_identity: String,
}

/// Retry and backoff configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RetryConfig {
    /// Total attempts per request, including the first
    #[serde(rename = "max-attempts", default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Wait before the second attempt (milliseconds); doubles after that
    #[serde(rename = "base-delay-ms", default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
        }
    }
}

/// Per-request timeouts
#[derive(Debug, Clone, Deserialize)]
pub struct TimeoutConfig {
    #[serde(rename = "connect-secs", default = "default_connect_secs")]
    pub connect_secs: u64,

    #[serde(rename = "read-secs", default = "default_read_secs")]
    pub read_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: default_connect_secs(),
            read_secs: default_read_secs(),
        }
    }
}

/// The site being harvested
#[derive(Debug, Clone, Deserialize)]
pub struct TargetConfig {
    /// Root URL whose robots.txt declares the sitemap
    pub site: String,

    /// Substring a sitemap-index entry's path must contain to be expanded
    #[serde(rename = "sitemap-filter", default = "default_sitemap_filter")]
    pub sitemap_filter: String,

    /// Hosts that bypass robots.txt entirely (e.g. asset CDNs)
    #[serde(default = "default_whitelist")]
    pub whitelist: Vec<String>,

    /// URL prefix an asset must have to be downloaded
    #[serde(rename = "asset-prefix", default = "default_asset_prefix")]
    pub asset_prefix: String,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Directory receiving downloaded assets
    #[serde(rename = "assets-dir", default = "default_assets_dir")]
    pub assets_dir: String,

    /// Path of the aggregated metadata JSON file
    #[serde(rename = "metadata-path", default = "default_metadata_path")]
    pub metadata_path: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            assets_dir: default_assets_dir(),
            metadata_path: default_metadata_path(),
        }
    }
}

fn default_max_concurrent_pages() -> u32 {
    2
}

fn default_progress_interval_ms() -> u64 {
    1000
}

fn default_max_attempts() -> u32 {
    5
}

fn default_base_delay_ms() -> u64 {
    10_000
}

fn default_connect_secs() -> u64 {
    10
}

fn default_read_secs() -> u64 {
    30
}

fn default_sitemap_filter() -> String {
    "topic".to_string()
}

fn default_whitelist() -> Vec<String> {
    vec!["storage.googleapis.com".to_string()]
}

fn default_asset_prefix() -> String {
    "https://storage.googleapis.com/zenn-user-upload/topics/".to_string()
}

fn default_assets_dir() -> String {
    "images".to_string()
}

fn default_metadata_path() -> String {
    "metadata.json".to_string()
}
