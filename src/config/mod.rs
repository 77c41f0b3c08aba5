use std::path::PathBuf;
use std::time::Duration;

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::error::{DriverdockError, Result};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory holding driver binaries and their version markers
    #[serde(default = "default_driver_dir")]
    pub driver_dir: PathBuf,

    /// Vendor endpoint URLs
    #[serde(default)]
    pub endpoints: VendorEndpoints,

    /// HTTP timeouts
    #[serde(default)]
    pub http: HttpTimeouts,
}

fn default_driver_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("driverdock")
        .join("drivers")
}

impl Default for Config {
    fn default() -> Self {
        Self {
            driver_dir: default_driver_dir(),
            endpoints: VendorEndpoints::default(),
            http: HttpTimeouts::default(),
        }
    }
}

impl Config {
    /// Load configuration from all sources (file, env, defaults)
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_path))
            .merge(Env::prefixed("DRIVERDOCK_").split("__"))
            .extract()
            .map_err(|e| DriverdockError::Config(e.to_string()))?;

        Ok(config)
    }

    /// Get the configuration file path
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("driverdock")
            .join("config.toml")
    }
}

/// Where each vendor publishes version information and driver archives.
///
/// The protocol *shape* behind each URL is the contract; the hostnames are
/// configurable so they can track vendor moves (and point at a local server
/// in tests).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VendorEndpoints {
    /// Direct-body latest version lookup
    pub chrome_latest: String,
    /// Direct-body lookup by major revision; the revision is appended
    pub chrome_release_prefix: String,
    /// Base URL for chromedriver archives
    pub chrome_download: String,

    /// Release listing whose redirect Location carries the latest version
    pub firefox_latest: String,
    /// HTML release listing scanned for version tags; the major revision is appended
    pub firefox_releases: String,
    /// Base URL for geckodriver archives
    pub firefox_download: String,

    /// Direct-body latest version lookup
    pub edge_latest: String,
    /// XML blob listing filtered by major-revision prefix; the revision is appended
    pub edge_listing: String,
    /// Base URL for msedgedriver archives
    pub edge_download: String,
}

impl Default for VendorEndpoints {
    fn default() -> Self {
        Self {
            chrome_latest: "https://chromedriver.storage.googleapis.com/LATEST_RELEASE".into(),
            chrome_release_prefix: "https://chromedriver.storage.googleapis.com/LATEST_RELEASE_"
                .into(),
            chrome_download: "https://chromedriver.storage.googleapis.com".into(),
            firefox_latest: "https://github.com/mozilla/geckodriver/releases/latest".into(),
            firefox_releases: "https://github.com/mozilla/geckodriver/releases?q=0.".into(),
            firefox_download: "https://github.com/mozilla/geckodriver/releases/download".into(),
            edge_latest:
                "https://msedgewebdriverstorage.blob.core.windows.net/edgewebdriver/LATEST_STABLE"
                    .into(),
            edge_listing:
                "https://msedgewebdriverstorage.blob.core.windows.net/edgewebdriver?comp=list&prefix="
                    .into(),
            edge_download: "https://msedgewebdriverstorage.blob.core.windows.net/edgewebdriver"
                .into(),
        }
    }
}

/// Blocking request timeouts, differentiated by operation weight.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct HttpTimeouts {
    /// Version lookups (seconds)
    pub lookup_secs: u64,
    /// Archive downloads (seconds)
    pub download_secs: u64,
    /// Connection establishment (seconds)
    pub connect_secs: u64,
}

impl Default for HttpTimeouts {
    fn default() -> Self {
        Self {
            lookup_secs: 10,
            download_secs: 60,
            connect_secs: 10,
        }
    }
}

impl HttpTimeouts {
    pub fn lookup(&self) -> Duration {
        Duration::from_secs(self.lookup_secs)
    }

    pub fn download(&self) -> Duration {
        Duration::from_secs(self.download_secs)
    }

    pub fn connect(&self) -> Duration {
        Duration::from_secs(self.connect_secs)
    }
}
