use std::path::PathBuf;

use serde::Serialize;

use super::fetcher::DriverFetcher;
use super::resolver::VersionResolver;
use super::target::{Arch, Browser, DriverTarget, Platform};
use super::version::{normalize_version, VersionStore};
use crate::config::{HttpTimeouts, VendorEndpoints};
use crate::error::{DriverdockError, Result};

/// Result of an update attempt. When `updated` is false both version
/// strings come from the resolution and are numerically equal; when true
/// they differ and the on-disk marker now holds `new_version`.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct UpdateOutcome {
    pub updated: bool,
    pub old_version: String,
    pub new_version: String,
}

/// Orchestrates Store, Resolver and Fetcher into a single update operation
/// with no-op/changed semantics.
pub struct DriverUpdater {
    endpoints: VendorEndpoints,
    resolver: VersionResolver,
    fetcher: DriverFetcher,
    store: VersionStore,
}

impl DriverUpdater {
    /// `driver_dir` must already exist; it has to be writable for updates.
    pub fn new(
        driver_dir: impl Into<PathBuf>,
        endpoints: VendorEndpoints,
        timeouts: HttpTimeouts,
    ) -> Result<Self> {
        let driver_dir = driver_dir.into();
        if !driver_dir.is_dir() {
            return Err(DriverdockError::Config(format!(
                "driver directory does not exist: {}",
                driver_dir.display()
            )));
        }

        Ok(Self {
            resolver: VersionResolver::new(endpoints.clone(), timeouts)?,
            fetcher: DriverFetcher::new(&driver_dir, timeouts)?,
            store: VersionStore::new(&driver_dir),
            endpoints,
        })
    }

    /// Bring the driver binary for a target up to the desired version:
    /// the latest published one, or the newest within `major` when given.
    ///
    /// Statically unsupported targets are rejected before any network
    /// access. Calling twice against an unchanged upstream is a no-op the
    /// second time.
    pub fn update(
        &self,
        browser: Browser,
        platform: Platform,
        arch: Arch,
        major: Option<u32>,
    ) -> Result<UpdateOutcome> {
        let target = DriverTarget::new(browser, platform, arch);
        target.validate()?;

        let current = self.store.current_version(&target);
        let desired = match major {
            None => self.resolver.resolve_latest(browser)?,
            Some(major) => self.resolver.resolve_specific(browser, major)?,
        };

        if normalize_version(&current) == desired.key {
            tracing::info!(
                browser = %browser,
                version = %desired.version,
                "driver already up to date"
            );
            // The marker may spell the version differently than the vendor;
            // report the resolved string on both sides rather than the
            // stale marker content.
            return Ok(UpdateOutcome {
                updated: false,
                old_version: desired.version.clone(),
                new_version: desired.version,
            });
        }

        let url = target.download_url(&self.endpoints, &desired.version);
        self.fetcher.fetch_and_install(&url, &target, &desired.version)?;

        Ok(UpdateOutcome {
            updated: true,
            old_version: current,
            new_version: desired.version,
        })
    }

    /// Installed version for a target, `"0"` when nothing is installed.
    pub fn current_version(&self, browser: Browser, platform: Platform, arch: Arch) -> String {
        self.store
            .current_version(&DriverTarget::new(browser, platform, arch))
    }
}
