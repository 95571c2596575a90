//! The cache manager itself: detect the installed browser, decide whether
//! the cached driver still fits, download a fresh one when it does not.

use crate::downloader;
use crate::error::DriverCacheError;
use crate::manifest::{self, DriverRecord, Manifest, ManifestStore};
use crate::platform::{HostPlatform, PlatformStrategy};
use crate::version;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

pub const DRIVER_NAME: &str = "chromedriver";

const DEFAULT_ENDPOINT: &str = "https://chromedriver.storage.googleapis.com";
const CACHE_DIR_NAME: &str = ".chromedriver-cache";

/// Where the cache lives and which distribution endpoint serves it.
#[derive(Debug, Clone)]
pub struct ManagerConfig {
    /// Cache root; `None` means `~/.chromedriver-cache`.
    pub cache_root: Option<PathBuf>,
    /// Base URL of the driver distribution service.
    pub endpoint: String,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            cache_root: None,
            endpoint: DEFAULT_ENDPOINT.to_string(),
        }
    }
}

/// Guarantees that a driver compatible with the installed browser exists on
/// local disk and hands its path to the caller.
///
/// The manifest is loaded once at construction and flushed after every
/// download. Two managers over the same cache root race unprotected; this is
/// a single-user local tool.
pub struct DriverCacheManager<P: PlatformStrategy = HostPlatform> {
    platform: P,
    endpoint: String,
    cache_root: PathBuf,
    store: ManifestStore,
}

impl DriverCacheManager<HostPlatform> {
    /// Manager for the host platform with the default cache root and
    /// distribution endpoint.
    pub fn new() -> Result<Self, DriverCacheError> {
        Self::with_platform(HostPlatform, ManagerConfig::default())
    }
}

impl<P: PlatformStrategy> DriverCacheManager<P> {
    /// Manager with an injected platform strategy and configuration.
    pub fn with_platform(platform: P, config: ManagerConfig) -> Result<Self, DriverCacheError> {
        let cache_root = match config.cache_root {
            Some(root) => root,
            None => dirs::home_dir()
                .ok_or(DriverCacheError::HomeDirNotFound)?
                .join(CACHE_DIR_NAME),
        };

        std::fs::create_dir_all(&cache_root).map_err(|e| DriverCacheError::IoError {
            path: cache_root.clone(),
            source: e,
        })?;

        let store = ManifestStore::load_or_default(cache_root.join(ManifestStore::FILE_NAME))?;

        Ok(Self {
            platform,
            endpoint: config.endpoint,
            cache_root,
            store,
        })
    }

    pub fn cache_root(&self) -> &Path {
        &self.cache_root
    }

    pub fn manifest(&self) -> &Manifest {
        self.store.manifest()
    }

    /// Returns the path of a driver executable compatible with the installed
    /// browser, downloading one first if the cache cannot serve it.
    ///
    /// A cached driver is served when the detected version equals the last
    /// recorded one, or when it shares its major component with the browser
    /// version the last downloaded driver was paired with.
    pub async fn resolve_path(&mut self) -> Result<PathBuf, DriverCacheError> {
        let browser_version = self.platform.detect_browser_version().await?;
        debug!(%browser_version, "detected installed browser");

        if let Some(path) = self.cached_path_for(&browser_version) {
            if path.exists() {
                debug!(path = %path.display(), "serving driver from cache");
                return Ok(path);
            }
            // The recorded executable vanished from disk; the existence
            // guarantee wins over the cache hit.
            warn!(path = %path.display(), "cached driver missing on disk, re-downloading");
        }

        self.download_driver(&browser_version).await
    }

    fn cached_path_for(&self, browser_version: &str) -> Option<PathBuf> {
        let manifest = self.store.manifest();
        let last = manifest.last_downloaded_driver.as_ref()?;

        let same_version = manifest.current_browser_version.as_deref() == Some(browser_version);
        if same_version || version::same_major(browser_version, &last.browser_version) {
            return Some(last.driver_path.clone());
        }
        None
    }

    /// Resolves the driver version compatible with `browser_version` and
    /// makes sure it is extracted under the cache root.
    ///
    /// If a directory named after the resolved driver version already exists
    /// the download is skipped and the manifest is left untouched, so
    /// `currentBrowserVersion` can go stale relative to disk.
    pub async fn download_driver(
        &mut self,
        browser_version: &str,
    ) -> Result<PathBuf, DriverCacheError> {
        let driver_version = downloader::fetch_latest_release(
            &self.endpoint,
            version::strip_patch(browser_version),
        )
        .await?;
        if driver_version.is_empty() {
            return Err(DriverCacheError::DriverVersionNotFound {
                browser_version: browser_version.to_string(),
            });
        }

        let install_dir = self.cache_root.join(&driver_version);
        if install_dir.exists() {
            info!(%driver_version, "driver already downloaded");
            let path = downloader::find_driver_executable(&install_dir, DRIVER_NAME)?;
            return canonical(path);
        }

        let archive = self.platform.build_target().archive_name();
        let url = format!("{}/{}/{}", self.endpoint, driver_version, archive);
        let driver_path =
            downloader::download_and_extract(&url, &install_dir, DRIVER_NAME).await?;
        let driver_path = canonical(driver_path)?;
        info!(%driver_version, path = %driver_path.display(), "driver installed");

        self.store.record_download(DriverRecord {
            version: driver_version,
            browser_version: browser_version.to_string(),
            driver_path: driver_path.clone(),
            downloaded_on: manifest::now_stamp(),
        })?;

        Ok(driver_path)
    }
}

// Canonicalize without the `\\?\` prefix Windows canonicalization produces.
fn canonical(path: PathBuf) -> Result<PathBuf, DriverCacheError> {
    dunce::canonicalize(&path).map_err(|e| DriverCacheError::IoError { path, source: e })
}

// --- Tests ---
