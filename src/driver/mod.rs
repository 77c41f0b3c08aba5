pub mod archive;
pub mod fetcher;
pub mod resolver;
pub mod supervisor;
pub mod target;
pub mod updater;
pub mod version;

use std::time::Duration;

use crate::error::Result;

/// Blocking HTTP client with automatic redirects disabled.
///
/// Two of the vendor protocols depend on seeing 30x responses directly:
/// Firefox's latest-version lookup reads the Location header, and its
/// download flow follows the redirect with an explicit second request.
pub(crate) fn no_redirect_client(connect_timeout: Duration) -> Result<reqwest::blocking::Client> {
    Ok(reqwest::blocking::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .connect_timeout(connect_timeout)
        .build()?)
}
