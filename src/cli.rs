use std::path::PathBuf;

use clap::{Parser, Subcommand};
use colored::Colorize;

use crate::config::Config;
use crate::driver::target::{Arch, Browser, Platform};
use crate::driver::updater::DriverUpdater;
use crate::error::Result;

/// Keep browser driver binaries current
#[derive(Parser)]
#[command(name = "driverdock")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Directory holding driver binaries (overrides config)
    #[arg(long, env = "DRIVERDOCK_DRIVER_DIR", global = true)]
    pub dir: Option<PathBuf>,

    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Download the driver for a browser if a newer version is published
    Update {
        /// Browser whose driver to update
        browser: Browser,

        /// Target platform for the binary
        #[arg(short, long, value_enum)]
        platform: Option<Platform>,

        /// Target architecture for the binary
        #[arg(short, long, value_enum, default_value = "x64")]
        arch: Arch,

        /// Pin to a major revision instead of the latest release
        #[arg(short, long)]
        major: Option<u32>,
    },

    /// Show the installed driver version
    Current {
        browser: Browser,

        #[arg(short, long, value_enum)]
        platform: Option<Platform>,

        #[arg(short, long, value_enum, default_value = "x64")]
        arch: Arch,
    },

    /// Resolve the newest published driver version without installing
    Latest {
        browser: Browser,

        /// Pin to a major revision
        #[arg(short, long)]
        major: Option<u32>,
    },
}

impl Cli {
    pub fn run(self) -> Result<()> {
        let config = Config::load()?;
        let driver_dir = self.dir.unwrap_or(config.driver_dir);

        match self.command {
            Commands::Update {
                browser,
                platform,
                arch,
                major,
            } => {
                std::fs::create_dir_all(&driver_dir)?;
                let updater = DriverUpdater::new(driver_dir, config.endpoints, config.http)?;
                let outcome =
                    updater.update(browser, platform.unwrap_or_else(Platform::host), arch, major)?;

                if self.json {
                    println!("{}", serde_json::to_string_pretty(&outcome).unwrap_or_default());
                } else if outcome.updated {
                    println!(
                        "{} {} driver updated: {} -> {}",
                        "✓".green(),
                        browser,
                        outcome.old_version,
                        outcome.new_version
                    );
                } else {
                    println!(
                        "{} driver already up to date ({})",
                        browser, outcome.new_version
                    );
                }
            }

            Commands::Current {
                browser,
                platform,
                arch,
            } => {
                let store = crate::driver::version::VersionStore::new(&driver_dir);
                let target = crate::driver::target::DriverTarget::new(
                    browser,
                    platform.unwrap_or_else(Platform::host),
                    arch,
                );
                println!("{}", store.current_version(&target));
            }

            Commands::Latest { browser, major } => {
                let resolver = crate::driver::resolver::VersionResolver::new(
                    config.endpoints,
                    config.http,
                )?;
                let record = match major {
                    None => resolver.resolve_latest(browser)?,
                    Some(major) => resolver.resolve_specific(browser, major)?,
                };
                println!("{}", record.version);
            }
        }

        Ok(())
    }
}
