use std::fs;
use std::path::PathBuf;

use super::target::DriverTarget;
use crate::error::Result;

/// Collapse a version string into a single lossy ordering key.
///
/// Strips alphabetic characters, splits on `.`, and sums the numeric parts.
/// Two different dotted versions can collide on the same sum (`"1.2"` and
/// `"2.1"` both map to 3); the key is only used for relative
/// ordering/equality against versions of the same driver, never as a
/// semantic version.
pub fn normalize_version(version: &str) -> u32 {
    version
        .chars()
        .filter(|c| !c.is_ascii_alphabetic())
        .collect::<String>()
        .split('.')
        .filter_map(|part| part.trim().parse::<u32>().ok())
        .sum()
}

/// A resolved driver version: the vendor's original string plus its
/// normalized ordering key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionRecord {
    pub version: String,
    pub key: u32,
}

impl VersionRecord {
    pub fn new(version: impl Into<String>) -> Self {
        let version = version.into();
        let key = normalize_version(&version);
        Self { version, key }
    }
}

/// Reads and writes the per-target version marker files sitting next to the
/// driver binaries.
#[derive(Debug, Clone)]
pub struct VersionStore {
    driver_dir: PathBuf,
}

impl VersionStore {
    pub fn new(driver_dir: impl Into<PathBuf>) -> Self {
        Self {
            driver_dir: driver_dir.into(),
        }
    }

    pub fn marker_path(&self, target: &DriverTarget) -> PathBuf {
        self.driver_dir.join(target.marker_name())
    }

    /// The installed version for a target, or `"0"` when either the driver
    /// binary or its marker file is absent.
    pub fn current_version(&self, target: &DriverTarget) -> String {
        let binary = self.driver_dir.join(target.binary_name());
        let marker = self.marker_path(target);

        if !binary.is_file() {
            return "0".to_string();
        }

        match fs::read_to_string(&marker) {
            Ok(content) => content,
            Err(_) => "0".to_string(),
        }
    }

    /// Overwrite the marker. Only called as the last step of a successful
    /// install so the marker never advances past a failed one.
    pub fn record(&self, target: &DriverTarget, version: &str) -> Result<()> {
        fs::write(self.marker_path(target), version)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::target::{Arch, Browser, Platform};

    fn target() -> DriverTarget {
        DriverTarget::new(Browser::Chrome, Platform::Linux, Arch::X64)
    }

    #[test]
    fn normalize_ignores_alphabetic_prefixes() {
        assert_eq!(
            normalize_version("96.0.4664.45"),
            normalize_version("v96.0.4664.45")
        );
    }

    #[test]
    fn normalize_of_zero_is_zero() {
        assert_eq!(normalize_version("0"), 0);
    }

    #[test]
    fn normalize_sums_numeric_parts() {
        assert_eq!(normalize_version("96.0.4664.45"), 96 + 4664 + 45);
        assert_eq!(normalize_version("0.30.0"), 30);
    }

    #[test]
    fn normalize_is_lossy_by_design() {
        // Known limitation of the sum-of-parts scheme.
        assert_eq!(normalize_version("1.2"), normalize_version("2.1"));
    }

    #[test]
    fn current_version_defaults_to_zero_without_binary() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = VersionStore::new(dir.path());

        assert_eq!(store.current_version(&target()), "0");
    }

    #[test]
    fn current_version_defaults_to_zero_without_marker() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join("chromedriver"), b"binary").expect("write");

        let store = VersionStore::new(dir.path());
        assert_eq!(store.current_version(&target()), "0");
    }

    #[test]
    fn current_version_returns_marker_content() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join("chromedriver"), b"binary").expect("write");

        let store = VersionStore::new(dir.path());
        store.record(&target(), "97.0.4692.71").expect("record");

        assert_eq!(store.current_version(&target()), "97.0.4692.71");
    }
}
