//! Keeps a per-user cache of chromedriver binaries matched to the installed
//! Chrome, downloading from the legacy driver distribution endpoint on first
//! use or on version mismatch. [`DriverCacheManager::resolve_path`] is the
//! caller-facing entry point; the returned path feeds straight into a
//! webdriver client's driver-path configuration.

// Top-level public modules
pub mod error;
pub mod platform;
pub mod version;
pub mod manifest;
pub mod downloader;
pub mod manager;

pub use error::DriverCacheError;
pub use manager::{DriverCacheManager, ManagerConfig, DRIVER_NAME};
pub use manifest::{DriverRecord, Manifest};
pub use platform::{BuildTarget, HostPlatform, PlatformStrategy};
