//! Persisted record of past driver downloads, mirrored to `config.json`
//! under the cache root. Callers go through [`ManifestStore`]; nothing else
//! touches the file.

use crate::error::DriverCacheError;
use chrono::Local;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const TIMESTAMP_FORMAT: &str = "%d/%m/%Y %H:%M:%S";

/// One downloaded driver, as kept in the manifest history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriverRecord {
    /// Driver version string, matching the remote distribution's versioning.
    pub version: String,
    /// Full browser version this driver was paired with.
    pub browser_version: String,
    /// Absolute path to the extracted executable.
    pub driver_path: PathBuf,
    pub downloaded_on: String,
}

/// Everything the tool knows about its cache.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Manifest {
    /// Append-only download history.
    pub downloaded_drivers: Vec<DriverRecord>,
    /// Last browser version observed.
    pub current_browser_version: Option<String>,
    /// Most recent download.
    pub last_downloaded_driver: Option<DriverRecord>,
    /// `DD/MM/YYYY HH:MM:SS` of the last write.
    pub last_updated: Option<String>,
}

/// Repository owning the on-disk manifest.
///
/// Loaded once at construction, mutated in memory, flushed synchronously at
/// the end of every mutating operation. Plain overwrite, last writer wins.
#[derive(Debug)]
pub struct ManifestStore {
    path: PathBuf,
    manifest: Manifest,
}

impl ManifestStore {
    pub const FILE_NAME: &'static str = "config.json";

    /// Loads the manifest at `path`. If the file does not exist, a default
    /// empty manifest is written to disk before first use. Malformed JSON
    /// fails the load with [`DriverCacheError::ManifestParseError`].
    pub fn load_or_default(path: PathBuf) -> Result<Self, DriverCacheError> {
        let manifest = if path.exists() {
            let raw = fs::read_to_string(&path).map_err(|e| DriverCacheError::IoError {
                path: path.clone(),
                source: e,
            })?;
            serde_json::from_str(&raw).map_err(|e| DriverCacheError::ManifestParseError {
                path: path.clone(),
                source: e,
            })?
        } else {
            let manifest = Manifest::default();
            write_pretty(&path, &manifest)?;
            manifest
        };

        Ok(Self { path, manifest })
    }

    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    /// Appends `record` to the history, promotes it to the most recent
    /// download, records the paired browser version as current, stamps
    /// `lastUpdated`, and persists.
    pub fn record_download(&mut self, record: DriverRecord) -> Result<(), DriverCacheError> {
        self.manifest.current_browser_version = Some(record.browser_version.clone());
        self.manifest.last_downloaded_driver = Some(record.clone());
        self.manifest.downloaded_drivers.push(record);
        self.manifest.last_updated = Some(now_stamp());
        write_pretty(&self.path, &self.manifest)
    }
}

/// Current local time in the manifest's `DD/MM/YYYY HH:MM:SS` format.
pub(crate) fn now_stamp() -> String {
    Local::now().format(TIMESTAMP_FORMAT).to_string()
}

// config.json is pretty-printed with a 4-space indent.
fn write_pretty(path: &Path, manifest: &Manifest) -> Result<(), DriverCacheError> {
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut buf = Vec::new();
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    manifest
        .serialize(&mut ser)
        .map_err(|e| DriverCacheError::ManifestParseError {
            path: path.to_path_buf(),
            source: e,
        })?;

    fs::write(path, buf).map_err(|e| DriverCacheError::IoError {
        path: path.to_path_buf(),
        source: e,
    })
}

// --- Tests ---
