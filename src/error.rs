use std::path::PathBuf;

use reqwest::StatusCode;
use thiserror::Error;

use crate::driver::target::Browser;

#[derive(Error, Debug)]
pub enum DriverdockError {
    #[error("Unsupported driver configuration: {0}")]
    UnsupportedConfiguration(String),

    #[error("The {browser} driver is not supported on this host OS ({os})")]
    UnsupportedOs { browser: Browser, os: &'static str },

    #[error("The {0} driver appears to already be running")]
    AlreadyRunning(Browser),

    #[error("No {0} driver is running. Start it first.")]
    NotRunning(Browser),

    #[error("Driver executable does not exist: {}", .0.display())]
    ExecutableMissing(PathBuf),

    #[error("Driver executable is read-only: {}", .0.display())]
    ExecutableReadOnly(PathBuf),

    #[error("Network error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Download from {url} failed with status {status}")]
    DownloadFailed { url: String, status: StatusCode },

    #[error("Download from {url} exceeded the {limit} byte limit")]
    OversizedDownload { url: String, limit: u64 },

    #[error("No version information for the {browser} driver at {url}")]
    NoVersionInfo { browser: Browser, url: String },

    #[error("No published {browser} driver version for major revision {major}")]
    VersionUnavailable { browser: Browser, major: u32 },

    #[error("Archive error: {0}")]
    Archive(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, DriverdockError>;
