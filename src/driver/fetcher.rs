use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::LOCATION;

use super::archive;
use super::target::{ArchiveFormat, Browser, DriverTarget};
use super::version::VersionStore;
use crate::config::HttpTimeouts;
use crate::error::{DriverdockError, Result};

/// Maximum archive download size (driver archives are a few MB).
const MAX_DOWNLOAD_SIZE: u64 = 128 * 1024 * 1024;

/// Downloads a driver archive and installs the executable it contains,
/// replacing the previous binary and rewriting the version marker, or
/// failing with both left untouched.
pub struct DriverFetcher {
    client: Client,
    driver_dir: PathBuf,
    store: VersionStore,
    download_timeout: Duration,
}

impl DriverFetcher {
    pub fn new(driver_dir: impl Into<PathBuf>, timeouts: HttpTimeouts) -> Result<Self> {
        let driver_dir = driver_dir.into();
        let client = super::no_redirect_client(timeouts.connect())?;
        let store = VersionStore::new(&driver_dir);

        Ok(Self {
            client,
            driver_dir,
            store,
            download_timeout: timeouts.download(),
        })
    }

    /// Download the archive at `url` and install `target`'s executable from
    /// it. The marker is written strictly after a verified successful copy;
    /// temporary extraction artifacts are removed regardless of outcome.
    pub fn fetch_and_install(&self, url: &str, target: &DriverTarget, version: &str) -> Result<()> {
        let bytes = self.download(url, target.browser)?;

        let temp_dir = tempfile::tempdir()?;
        match target.archive_format() {
            ArchiveFormat::Zip => archive::extract_zip(&bytes, temp_dir.path())?,
            ArchiveFormat::TarGz => {
                let entries = archive::parse_tar(&archive::gunzip(&bytes)?)?;
                archive::unpack_entries(&entries, temp_dir.path())?;
            }
        }

        let wanted = target.binary_name();
        let extracted = find_file(temp_dir.path(), &wanted)?.ok_or_else(|| {
            DriverdockError::Archive(format!("archive from {} contains no {:?}", url, wanted))
        })?;

        let destination = self.driver_dir.join(&wanted);
        fs::copy(&extracted, &destination)?;

        // Owner execute must be granted explicitly or the installed driver
        // cannot be spawned.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&destination, fs::Permissions::from_mode(0o755))?;
        }

        self.store.record(target, version)?;
        tracing::info!(
            browser = %target.browser,
            version,
            path = %destination.display(),
            "driver installed"
        );

        Ok(())
    }

    /// Full-body in-memory download under the long timeout. Firefox's asset
    /// URL answers with a redirect that is followed by an explicit second
    /// request because the client keeps redirects disabled.
    fn download(&self, url: &str, browser: Browser) -> Result<Vec<u8>> {
        tracing::debug!(url, "downloading driver archive");
        let mut response = self
            .client
            .get(url)
            .timeout(self.download_timeout)
            .send()?;

        if browser == Browser::Firefox {
            if !response.status().is_redirection() {
                return Err(DriverdockError::DownloadFailed {
                    url: url.to_string(),
                    status: response.status(),
                });
            }

            let location = response
                .headers()
                .get(LOCATION)
                .and_then(|value| value.to_str().ok())
                .ok_or_else(|| DriverdockError::DownloadFailed {
                    url: url.to_string(),
                    status: response.status(),
                })?
                .to_string();

            response = self
                .client
                .get(&location)
                .timeout(self.download_timeout)
                .send()?;
        }

        if !response.status().is_success() {
            return Err(DriverdockError::DownloadFailed {
                url: url.to_string(),
                status: response.status(),
            });
        }

        let bytes = response.bytes()?;
        if bytes.len() as u64 > MAX_DOWNLOAD_SIZE {
            return Err(DriverdockError::OversizedDownload {
                url: url.to_string(),
                limit: MAX_DOWNLOAD_SIZE,
            });
        }

        Ok(bytes.to_vec())
    }
}

/// Locate a file by name anywhere under `root` (some vendors nest the
/// executable below extra folders).
fn find_file(root: &Path, name: &str) -> Result<Option<PathBuf>> {
    for entry in fs::read_dir(root)? {
        let entry = entry?;
        let path = entry.path();
        let file_type = entry.file_type()?;

        if file_type.is_dir() {
            if let Some(found) = find_file(&path, name)? {
                return Ok(Some(found));
            }
        } else if entry.file_name().to_string_lossy() == name {
            return Ok(Some(path));
        }
    }

    Ok(None)
}
