use std::time::Duration;

use regex::Regex;
use reqwest::blocking::{Client, Response};
use reqwest::header::LOCATION;
use reqwest::StatusCode;

use super::target::Browser;
use super::version::{normalize_version, VersionRecord};
use crate::config::{HttpTimeouts, VendorEndpoints};
use crate::error::{DriverdockError, Result};

/// Discovers published driver versions through the three vendor protocols:
/// direct-body (Chrome, Edge latest), redirect-location plus HTML scan
/// (Firefox), and XML blob listing (Edge by major revision).
pub struct VersionResolver {
    client: Client,
    endpoints: VendorEndpoints,
    lookup_timeout: Duration,
    firefox_tag_pattern: Regex,
}

impl VersionResolver {
    pub fn new(endpoints: VendorEndpoints, timeouts: HttpTimeouts) -> Result<Self> {
        let client = super::no_redirect_client(timeouts.connect())?;
        Ok(Self {
            client,
            endpoints,
            lookup_timeout: timeouts.lookup(),
            firefox_tag_pattern: Regex::new(
                r#"<a href="/mozilla/geckodriver/releases/tag/v(\d+\.\d+\.\d+)""#,
            )
            .expect("release tag pattern is valid"),
        })
    }

    /// Latest published version for a browser's driver.
    pub fn resolve_latest(&self, browser: Browser) -> Result<VersionRecord> {
        match browser {
            Browser::Chrome => self.direct_body(browser, &self.endpoints.chrome_latest),
            Browser::Edge => self.direct_body(browser, &self.endpoints.edge_latest),
            Browser::Firefox => self.latest_firefox(),
        }
    }

    /// Newest published version within a major revision.
    pub fn resolve_specific(&self, browser: Browser, major: u32) -> Result<VersionRecord> {
        match browser {
            Browser::Chrome => self.specific_chrome(major),
            Browser::Firefox => self.specific_firefox(major),
            Browser::Edge => self.specific_edge(major),
        }
    }

    fn get(&self, url: &str) -> Result<Response> {
        tracing::debug!(url, "version lookup");
        Ok(self.client.get(url).timeout(self.lookup_timeout).send()?)
    }

    /// Protocol 1: the response body is the version string.
    fn direct_body(&self, browser: Browser, url: &str) -> Result<VersionRecord> {
        let response = self.get(url)?;
        let body = response.text()?;
        let version = body.trim();

        if version.is_empty() {
            return Err(DriverdockError::NoVersionInfo {
                browser,
                url: url.to_string(),
            });
        }

        Ok(VersionRecord::new(version))
    }

    /// Protocol 2: the version rides in the Location header of a 30x
    /// response to the release-listing URL (redirects stay disabled).
    fn latest_firefox(&self) -> Result<VersionRecord> {
        let url = &self.endpoints.firefox_latest;
        let response = self.get(url)?;

        let location = response
            .headers()
            .get(LOCATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| DriverdockError::NoVersionInfo {
                browser: Browser::Firefox,
                url: url.to_string(),
            })?;

        let version = location.rsplit('/').next().unwrap_or_default();
        if version.is_empty() {
            return Err(DriverdockError::NoVersionInfo {
                browser: Browser::Firefox,
                url: url.to_string(),
            });
        }

        Ok(VersionRecord::new(version))
    }

    fn specific_chrome(&self, major: u32) -> Result<VersionRecord> {
        let url = format!("{}{}", self.endpoints.chrome_release_prefix, major);
        let response = self.get(&url)?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(DriverdockError::VersionUnavailable {
                browser: Browser::Chrome,
                major,
            });
        }

        let body = response.text()?;
        let version = body.trim();
        if version.is_empty() {
            return Err(DriverdockError::NoVersionInfo {
                browser: Browser::Chrome,
                url,
            });
        }

        Ok(VersionRecord::new(version))
    }

    /// Scan the HTML release listing for tags within the requested major
    /// revision; geckodriver numbers releases as `0.<major>.<patch>`.
    fn specific_firefox(&self, major: u32) -> Result<VersionRecord> {
        let url = format!("{}{}", self.endpoints.firefox_releases, major);
        let response = self.get(&url)?;
        let body = response.text()?;

        if body.trim().is_empty() {
            return Err(DriverdockError::NoVersionInfo {
                browser: Browser::Firefox,
                url,
            });
        }

        let major_part = major.to_string();
        let tags = self
            .firefox_tag_pattern
            .captures_iter(&body)
            .map(|captures| captures[1].to_string())
            .filter(|tag| tag.split('.').nth(1) == Some(major_part.as_str()));

        match newest(tags) {
            Some(tag) => Ok(VersionRecord::new(format!("v{}", tag))),
            None => Err(DriverdockError::VersionUnavailable {
                browser: Browser::Firefox,
                major,
            }),
        }
    }

    /// Protocol 3: XML blob listing of archive names prefixed by the major
    /// revision; each `<Name>` looks like `97.0.1072.62/edgedriver_win64.zip`.
    fn specific_edge(&self, major: u32) -> Result<VersionRecord> {
        let url = format!("{}{}", self.endpoints.edge_listing, major);
        let response = self.get(&url)?;
        let body = response.text()?;

        if body.trim().is_empty() {
            return Err(DriverdockError::NoVersionInfo {
                browser: Browser::Edge,
                url,
            });
        }

        let names = parse_edge_listing(&body).map_err(|_| DriverdockError::NoVersionInfo {
            browser: Browser::Edge,
            url,
        })?;

        let versions = names
            .into_iter()
            .filter_map(|name| name.split('/').next().map(str::to_string));

        match newest(versions) {
            Some(version) => Ok(VersionRecord::new(version)),
            None => Err(DriverdockError::VersionUnavailable {
                browser: Browser::Edge,
                major,
            }),
        }
    }
}

/// Pick the entry with the largest normalized key.
fn newest(versions: impl Iterator<Item = String>) -> Option<String> {
    versions.max_by_key(|version| normalize_version(version))
}

/// Collect the text of every `<Name>` element in the blob-listing XML.
fn parse_edge_listing(xml: &str) -> std::result::Result<Vec<String>, quick_xml::Error> {
    use quick_xml::events::Event;
    use quick_xml::Reader;

    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut names = Vec::new();
    let mut in_name = false;

    loop {
        match reader.read_event()? {
            Event::Start(element) if element.name().as_ref() == b"Name" => in_name = true,
            Event::End(element) if element.name().as_ref() == b"Name" => in_name = false,
            Event::Text(text) if in_name => names.push(text.unescape()?.into_owned()),
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(names)
}
