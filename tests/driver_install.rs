//! Full end-user workflow against a mock distribution endpoint: detect,
//! resolve, download, extract, and serve the follow-up call from cache.

use async_trait::async_trait;
use chromedriver_cache::{
    BuildTarget, DriverCacheError, DriverCacheManager, ManagerConfig, PlatformStrategy,
};
use std::io::Write;
use std::path::Path;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct PinnedBrowser(&'static str);

#[async_trait]
impl PlatformStrategy for PinnedBrowser {
    async fn detect_browser_version(&self) -> Result<String, DriverCacheError> {
        Ok(self.0.to_string())
    }

    fn build_target(&self) -> BuildTarget {
        BuildTarget::Linux64
    }
}

fn driver_file_name() -> &'static str {
    if cfg!(target_os = "windows") {
        "chromedriver.exe"
    } else {
        "chromedriver"
    }
}

fn driver_zip_bytes() -> Vec<u8> {
    let mut buf = Vec::new();
    let mut writer = zip::ZipWriter::new(std::io::Cursor::new(&mut buf));
    let options = zip::write::SimpleFileOptions::default().unix_permissions(0o755);
    writer.start_file(driver_file_name(), options).unwrap();
    writer.write_all(b"#!/bin/sh\nexit 0\n").unwrap();
    writer.finish().unwrap();
    buf
}

async fn start_endpoint(driver_version: &str, expected_archive_hits: u64) -> MockServer {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/LATEST_RELEASE_96.0.4664"))
        .respond_with(ResponseTemplate::new(200).set_body_string(driver_version))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(format!(
            "/{}/chromedriver_linux64.zip",
            driver_version
        )))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(driver_zip_bytes()))
        .expect(expected_archive_hits)
        .mount(&server)
        .await;

    server
}

#[tokio::test]
async fn full_install_and_cache_flow() {
    let server = start_endpoint("96.0.4664.45", 1).await;
    let cache_root = tempfile::tempdir().unwrap();

    let mut manager = DriverCacheManager::with_platform(
        PinnedBrowser("96.0.4664.110"),
        ManagerConfig {
            cache_root: Some(cache_root.path().to_path_buf()),
            endpoint: server.uri(),
        },
    )
    .unwrap();

    // First call downloads and extracts.
    let driver_path = manager.resolve_path().await.unwrap();
    assert!(driver_path.is_file());
    assert!(driver_path.is_absolute());
    assert_eq!(
        driver_path.file_name().and_then(|n| n.to_str()),
        Some(driver_file_name())
    );

    // The manifest mirrors the download.
    let manifest = manager.manifest();
    assert_eq!(manifest.downloaded_drivers.len(), 1);
    assert_eq!(
        manifest.current_browser_version.as_deref(),
        Some("96.0.4664.110")
    );
    let record = manifest.last_downloaded_driver.as_ref().unwrap();
    assert_eq!(record.version, "96.0.4664.45");
    assert_eq!(record.driver_path, driver_path);

    // Cache layout: config.json plus one directory per driver version.
    assert!(cache_root.path().join("config.json").is_file());
    assert!(cache_root.path().join("96.0.4664.45").is_dir());
    assert!(no_archives_left_behind(cache_root.path()));

    // Second call is a pure cache hit; the archive mock allows one fetch.
    let again = manager.resolve_path().await.unwrap();
    assert_eq!(again, driver_path);
}

#[tokio::test]
async fn fresh_manager_reuses_cache_across_restarts() {
    let server = start_endpoint("96.0.4664.45", 1).await;
    let cache_root = tempfile::tempdir().unwrap();
    let config = ManagerConfig {
        cache_root: Some(cache_root.path().to_path_buf()),
        endpoint: server.uri(),
    };

    let first = DriverCacheManager::with_platform(PinnedBrowser("96.0.4664.110"), config.clone())
        .unwrap()
        .resolve_path()
        .await
        .unwrap();

    // A new manager over the same cache root picks the manifest back up.
    let second = DriverCacheManager::with_platform(PinnedBrowser("96.0.4664.110"), config)
        .unwrap()
        .resolve_path()
        .await
        .unwrap();

    assert_eq!(first, second);
}

fn no_archives_left_behind(root: &Path) -> bool {
    walk_has_no_zip(root)
}

fn walk_has_no_zip(dir: &Path) -> bool {
    for entry in std::fs::read_dir(dir).unwrap().flatten() {
        let path = entry.path();
        if path.is_dir() {
            if !walk_has_no_zip(&path) {
                return false;
            }
        } else if path.extension().and_then(|e| e.to_str()) == Some("zip") {
            return false;
        }
    }
    true
}
