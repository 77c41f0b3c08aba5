//! Webdriver lifecycle manager: supervise browser driver processes and keep
//! their binaries current.
//!
//! The two supported entry points are [`DriverSupervisor`] (start/stop driver
//! processes and hand out their endpoint URIs) and [`DriverUpdater`]
//! (discover published versions per vendor and atomically install newer
//! binaries).

pub mod cli;
pub mod config;
pub mod driver;
pub mod error;

pub use config::{Config, HttpTimeouts, VendorEndpoints};
pub use driver::supervisor::DriverSupervisor;
pub use driver::target::{Arch, ArchiveFormat, Browser, DriverTarget, Platform};
pub use driver::updater::{DriverUpdater, UpdateOutcome};
pub use driver::version::{normalize_version, VersionRecord, VersionStore};
pub use error::{DriverdockError, Result};
