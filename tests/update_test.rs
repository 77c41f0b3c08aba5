//! End-to-end update flow against a local stub server: resolution, archive
//! download/extraction, binary replacement and marker bookkeeping.

mod support;

use std::io::Write;

use driverdock::{
    Arch, Browser, DriverUpdater, DriverdockError, HttpTimeouts, Platform, VendorEndpoints,
};
use support::{StubResponse, StubServer};

const CHROME_VERSION: &str = "97.0.4692.71";
const FIREFOX_VERSION: &str = "v0.30.0";

fn stub_endpoints(server: &StubServer) -> VendorEndpoints {
    VendorEndpoints {
        chrome_latest: server.url("/chrome/LATEST_RELEASE"),
        chrome_release_prefix: server.url("/chrome/LATEST_RELEASE_"),
        chrome_download: server.url("/chrome"),
        firefox_latest: server.url("/firefox/latest"),
        firefox_releases: server.url("/firefox/releases?q=0."),
        firefox_download: server.url("/firefox/download"),
        edge_latest: server.url("/edge/LATEST_STABLE"),
        edge_listing: server.url("/edge/list?prefix="),
        edge_download: server.url("/edge"),
    }
}

fn zip_with_file(name: &str, content: &[u8]) -> Vec<u8> {
    let cursor = std::io::Cursor::new(Vec::new());
    let mut writer = zip::ZipWriter::new(cursor);
    let options =
        zip::write::SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);
    writer.start_file(name, options).expect("start_file");
    writer.write_all(content).expect("write");
    writer.finish().expect("finish").into_inner()
}

fn targz_with_file(name: &str, content: &[u8]) -> Vec<u8> {
    let mut header = vec![0u8; 512];
    header[..name.len()].copy_from_slice(name.as_bytes());
    let size = format!("{:011o}\0", content.len());
    header[124..124 + size.len()].copy_from_slice(size.as_bytes());

    let mut tar = header;
    tar.extend_from_slice(content);
    let padding = content.len().div_ceil(512) * 512 - content.len();
    tar.extend(std::iter::repeat_n(0u8, padding));
    tar.extend(std::iter::repeat_n(0u8, 512));

    let mut encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
    encoder.write_all(&tar).expect("gzip");
    encoder.finish().expect("finish")
}

#[test]
fn chrome_update_installs_then_noops() {
    let server = StubServer::serve(vec![
        (
            "/chrome/LATEST_RELEASE".to_string(),
            StubResponse::ok(CHROME_VERSION),
        ),
        (
            format!("/chrome/{}/chromedriver_linux64.zip", CHROME_VERSION),
            StubResponse::ok(zip_with_file("chromedriver", b"FAKEDRIVER")),
        ),
    ]);

    let dir = tempfile::tempdir().expect("tempdir");
    let updater = DriverUpdater::new(
        dir.path(),
        stub_endpoints(&server),
        HttpTimeouts::default(),
    )
    .expect("updater");

    let first = updater
        .update(Browser::Chrome, Platform::Linux, Arch::X64, None)
        .expect("first update");
    assert!(first.updated);
    assert_eq!(first.old_version, "0");
    assert_eq!(first.new_version, CHROME_VERSION);

    let binary = dir.path().join("chromedriver");
    assert_eq!(std::fs::read(&binary).expect("read binary"), b"FAKEDRIVER");

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = std::fs::metadata(&binary).expect("metadata").permissions().mode();
        assert_eq!(mode & 0o111, 0o111, "installed binary must be executable");
    }

    let marker = dir.path().join("chromedriver_linux_x64.version");
    let marker_before = std::fs::read_to_string(&marker).expect("marker");
    assert_eq!(marker_before, CHROME_VERSION);

    // Unchanged upstream: the second call is a no-op with both versions
    // taken from the resolution.
    let second = updater
        .update(Browser::Chrome, Platform::Linux, Arch::X64, None)
        .expect("second update");
    assert!(!second.updated);
    assert_eq!(second.old_version, CHROME_VERSION);
    assert_eq!(second.new_version, CHROME_VERSION);

    assert_eq!(
        std::fs::read_to_string(&marker).expect("marker"),
        marker_before,
        "marker must be untouched by a no-op update"
    );
}

#[test]
fn firefox_update_follows_redirects_and_unpacks_tarball() {
    let asset_path = format!(
        "/firefox/download/{}/geckodriver-{}-linux64.tar.gz",
        FIREFOX_VERSION, FIREFOX_VERSION
    );

    // The asset URL answers with a redirect to a CDN host; a second stub
    // plays the CDN so the redirect crosses servers like the real flow.
    let cdn = StubServer::serve(vec![(
        "/geckodriver.tar.gz".to_string(),
        StubResponse::ok(targz_with_file("geckodriver", b"GECKO")),
    )]);

    let server = StubServer::serve(vec![
        (
            "/firefox/latest".to_string(),
            StubResponse::redirect(format!(
                "https://github.com/mozilla/geckodriver/releases/tag/{}",
                FIREFOX_VERSION
            )),
        ),
        (
            asset_path,
            StubResponse::redirect(cdn.url("/geckodriver.tar.gz")),
        ),
    ]);
    let endpoints = stub_endpoints(&server);

    let dir = tempfile::tempdir().expect("tempdir");
    let updater =
        DriverUpdater::new(dir.path(), endpoints, HttpTimeouts::default()).expect("updater");

    let outcome = updater
        .update(Browser::Firefox, Platform::Linux, Arch::X64, None)
        .expect("update");
    assert!(outcome.updated);
    assert_eq!(outcome.new_version, FIREFOX_VERSION);

    let binary = dir.path().join("geckodriver");
    assert_eq!(std::fs::read(&binary).expect("read binary"), b"GECKO");

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = std::fs::metadata(&binary).expect("metadata").permissions().mode();
        assert_eq!(mode & 0o111, 0o111, "installed binary must be executable");
    }

    assert_eq!(
        std::fs::read_to_string(dir.path().join("geckodriver_linux_x64.version"))
            .expect("marker"),
        FIREFOX_VERSION
    );
}

#[test]
fn unsupported_targets_fail_without_network() {
    let server = StubServer::serve(vec![]);
    let dir = tempfile::tempdir().expect("tempdir");
    let updater = DriverUpdater::new(
        dir.path(),
        stub_endpoints(&server),
        HttpTimeouts::default(),
    )
    .expect("updater");

    let cases = [
        (Browser::Edge, Platform::Linux, Arch::X64),
        (Browser::Edge, Platform::Linux, Arch::X86),
        (Browser::Chrome, Platform::Linux, Arch::X86),
        (Browser::Chrome, Platform::Windows, Arch::X64),
    ];

    for (browser, platform, arch) in cases {
        let result = updater.update(browser, platform, arch, None);
        assert!(
            matches!(result, Err(DriverdockError::UnsupportedConfiguration(_))),
            "{browser}/{platform}/{arch} must be rejected statically"
        );
    }

    assert_eq!(server.hits(), 0, "static rejection must not touch the network");
}

#[test]
fn unavailable_major_revision_surfaces() {
    let server = StubServer::serve(vec![]);
    let dir = tempfile::tempdir().expect("tempdir");
    let updater = DriverUpdater::new(
        dir.path(),
        stub_endpoints(&server),
        HttpTimeouts::default(),
    )
    .expect("updater");

    // The stub answers 404 for the unknown LATEST_RELEASE_99 lookup
    let result = updater.update(Browser::Chrome, Platform::Linux, Arch::X64, Some(99));
    assert!(matches!(
        result,
        Err(DriverdockError::VersionUnavailable {
            browser: Browser::Chrome,
            major: 99
        })
    ));
}

#[test]
fn failed_download_leaves_marker_untouched() {
    // Resolution succeeds, the archive route does not exist.
    let server = StubServer::serve(vec![(
        "/chrome/LATEST_RELEASE".to_string(),
        StubResponse::ok(CHROME_VERSION),
    )]);

    let dir = tempfile::tempdir().expect("tempdir");
    let updater = DriverUpdater::new(
        dir.path(),
        stub_endpoints(&server),
        HttpTimeouts::default(),
    )
    .expect("updater");

    let result = updater.update(Browser::Chrome, Platform::Linux, Arch::X64, None);
    assert!(matches!(
        result,
        Err(DriverdockError::DownloadFailed { .. })
    ));

    assert!(
        !dir.path().join("chromedriver_linux_x64.version").exists(),
        "marker must never advance past a failed install"
    );
    assert_eq!(
        updater.current_version(Browser::Chrome, Platform::Linux, Arch::X64),
        "0"
    );
}
