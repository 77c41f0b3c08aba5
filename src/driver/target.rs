use std::fmt;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::config::VendorEndpoints;
use crate::error::{DriverdockError, Result};

/// Browsers with a managed driver binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Browser {
    Chrome,
    Firefox,
    Edge,
}

impl Browser {
    /// The vendor's unsuffixed executable name.
    pub fn driver_name(&self) -> &'static str {
        match self {
            Browser::Chrome => "chromedriver",
            Browser::Firefox => "geckodriver",
            Browser::Edge => "msedgedriver",
        }
    }

    /// Executable name for a platform (Windows gets the `.exe` suffix).
    pub fn binary_name(&self, platform: Platform) -> String {
        match platform {
            Platform::Windows => format!("{}.exe", self.driver_name()),
            Platform::Linux => self.driver_name().to_string(),
        }
    }
}

impl fmt::Display for Browser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Browser::Chrome => "chrome",
            Browser::Firefox => "firefox",
            Browser::Edge => "edge",
        };
        write!(f, "{}", name)
    }
}

/// Platforms the vendors publish driver builds for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Windows,
    Linux,
}

impl Platform {
    /// The platform of the machine we are running on.
    pub fn host() -> Self {
        if cfg!(windows) {
            Platform::Windows
        } else {
            Platform::Linux
        }
    }

    /// Platform component of vendor download URLs.
    fn url_part(&self) -> &'static str {
        match self {
            Platform::Windows => "win",
            Platform::Linux => "linux",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Platform::Windows => "windows",
            Platform::Linux => "linux",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Arch {
    X64,
    X86,
}

impl Arch {
    /// Architecture component of vendor download URLs.
    fn url_part(&self) -> &'static str {
        match self {
            Arch::X64 => "64",
            Arch::X86 => "32",
        }
    }
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Arch::X64 => "x64",
            Arch::X86 => "x86",
        };
        write!(f, "{}", name)
    }
}

/// Container format of a vendor's driver archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    Zip,
    TarGz,
}

/// One binary configuration: which driver, built for what.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DriverTarget {
    pub browser: Browser,
    pub platform: Platform,
    pub arch: Arch,
}

impl DriverTarget {
    pub fn new(browser: Browser, platform: Platform, arch: Arch) -> Self {
        Self {
            browser,
            platform,
            arch,
        }
    }

    /// Reject combinations no vendor publishes, before any network access.
    pub fn validate(&self) -> Result<()> {
        match (self.browser, self.platform, self.arch) {
            (Browser::Edge, Platform::Linux, _) => Err(DriverdockError::UnsupportedConfiguration(
                "Edge is not available on Linux".to_string(),
            )),
            (Browser::Chrome, Platform::Linux, Arch::X86) => {
                Err(DriverdockError::UnsupportedConfiguration(
                    "Chrome on Linux only has an x64 driver available".to_string(),
                ))
            }
            (Browser::Chrome, Platform::Windows, Arch::X64) => {
                Err(DriverdockError::UnsupportedConfiguration(
                    "Chrome on Windows only has an x86 driver available".to_string(),
                ))
            }
            _ => Ok(()),
        }
    }

    /// Executable name inside the archive and in the driver directory.
    pub fn binary_name(&self) -> String {
        self.browser.binary_name(self.platform)
    }

    /// Marker file recording the installed version for this target.
    pub fn marker_name(&self) -> String {
        format!(
            "{}_{}_{}.version",
            self.browser.driver_name(),
            self.platform,
            self.arch
        )
    }

    /// Firefox ships gzipped tarballs for Linux; everything else is zipped.
    pub fn archive_format(&self) -> ArchiveFormat {
        match (self.browser, self.platform) {
            (Browser::Firefox, Platform::Linux) => ArchiveFormat::TarGz,
            _ => ArchiveFormat::Zip,
        }
    }

    /// Build the vendor download URL for a resolved version string.
    pub fn download_url(&self, endpoints: &VendorEndpoints, version: &str) -> String {
        let platform = self.platform.url_part();
        let arch = self.arch.url_part();

        match self.browser {
            Browser::Firefox => {
                let ext = match self.archive_format() {
                    ArchiveFormat::TarGz => "tar.gz",
                    ArchiveFormat::Zip => "zip",
                };
                format!(
                    "{}/{}/geckodriver-{}-{}{}.{}",
                    endpoints.firefox_download, version, version, platform, arch, ext
                )
            }
            Browser::Chrome => format!(
                "{}/{}/chromedriver_{}{}.zip",
                endpoints.chrome_download, version, platform, arch
            ),
            Browser::Edge => format!(
                "{}/{}/edgedriver_{}{}.zip",
                endpoints.edge_download, version, platform, arch
            ),
        }
    }
}
