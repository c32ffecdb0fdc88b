use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration structure for Sinta-Harvest
///
/// Every section is optional in the TOML file; missing sections fall back
/// to the defaults of the public SINTA listing.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub range: RangeConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub throttle: ThrottleConfig,
    #[serde(default)]
    pub checkpoint: CheckpointConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Listing source configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Listing URL without the `page` query parameter
    #[serde(rename = "base-url")]
    pub base_url: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: "https://sinta.kemdikbud.go.id/google".to_string(),
        }
    }
}

/// Default page range, used when neither an override nor a checkpoint applies
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RangeConfig {
    /// First page to harvest (inclusive)
    #[serde(rename = "start-page")]
    pub start_page: u32,

    /// Last page to harvest (inclusive)
    #[serde(rename = "end-page")]
    pub end_page: u32,
}

impl Default for RangeConfig {
    fn default() -> Self {
        Self {
            start_page: 6673,
            end_page: 7506,
        }
    }
}

/// Retry and timeout behaviour of the page fetcher
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct FetchConfig {
    /// Attempts per page before it is skipped
    pub max_retries: u32,

    /// Whole-request timeout in seconds
    pub request_timeout_secs: u64,

    /// Connection establishment timeout in seconds
    pub connect_timeout_secs: u64,

    /// Fixed wait after a non-rate-limit failure (milliseconds)
    pub retry_delay_ms: u64,

    /// Base of the exponential rate-limit backoff (milliseconds)
    pub backoff_base_ms: u64,

    /// Lower bound of the random jitter added to rate-limit backoff (milliseconds)
    pub jitter_min_ms: u64,

    /// Upper bound of the random jitter added to rate-limit backoff (milliseconds)
    pub jitter_max_ms: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            request_timeout_secs: 30,
            connect_timeout_secs: 10,
            retry_delay_ms: 5_000,
            backoff_base_ms: 5_000,
            jitter_min_ms: 1_000,
            jitter_max_ms: 5_000,
        }
    }
}

impl FetchConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

/// Politeness delay between consecutive pages
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ThrottleConfig {
    /// Minimum pause between pages (milliseconds)
    pub min_delay_ms: u64,

    /// Maximum pause between pages (milliseconds)
    pub max_delay_ms: u64,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            min_delay_ms: 1_500,
            max_delay_ms: 3_500,
        }
    }
}

/// Checkpoint persistence configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct CheckpointConfig {
    /// Path of the JSON checkpoint file
    pub path: PathBuf,

    /// Number of pages between periodic checkpoints
    pub interval: u32,
}

impl Default for CheckpointConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("checkpoint.json"),
            interval: 10,
        }
    }
}

/// Supported export formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Csv,
    Json,
    Text,
}

impl ExportFormat {
    /// File extension used for this format
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Json => "json",
            Self::Text => "txt",
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct OutputConfig {
    /// Directory receiving final and partial exports
    pub directory: PathBuf,

    /// File name prefix of every export
    pub file_prefix: String,

    /// Directory receiving raw pages that yielded no records
    pub debug_directory: PathBuf,

    /// Export formats written at checkpoints and on completion
    pub formats: Vec<ExportFormat>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("output"),
            file_prefix: "sinta_publications".to_string(),
            debug_directory: PathBuf::from("output/debug"),
            formats: vec![ExportFormat::Csv, ExportFormat::Json, ExportFormat::Text],
        }
    }
}
