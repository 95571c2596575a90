//! OS-specific logic: detecting the installed Chrome version and naming the
//! archive build target. Everything platform-dependent sits behind
//! [`PlatformStrategy`] so the manager can be tested with an injected fake.

use crate::error::DriverCacheError;
use async_trait::async_trait;
use std::fmt;

#[cfg(any(not(windows), test))]
use std::path::Path;
#[cfg(not(windows))]
use std::path::PathBuf;

/// Archive-naming token used by the legacy driver distribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildTarget {
    Win32,
    Mac64,
    Linux64,
}

impl BuildTarget {
    /// Maps an OS identifier (as in `std::env::consts::OS`) to its token.
    /// Unrecognized platforms fall back to the linux build.
    pub fn from_os(os: &str) -> Self {
        match os {
            "windows" => BuildTarget::Win32,
            "macos" => BuildTarget::Mac64,
            _ => BuildTarget::Linux64,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BuildTarget::Win32 => "win32",
            BuildTarget::Mac64 => "mac64",
            BuildTarget::Linux64 => "linux64",
        }
    }

    /// Filename of the driver archive for this target.
    pub fn archive_name(self) -> String {
        format!("chromedriver_{}.zip", self.as_str())
    }
}

impl fmt::Display for BuildTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Capabilities the manager needs from the host OS.
///
/// Selected once at manager construction. Tests inject a fake returning a
/// fixed version so no browser install is required.
#[async_trait]
pub trait PlatformStrategy: Send + Sync {
    /// Detects the version of the installed browser, e.g. `96.0.4664.45`.
    async fn detect_browser_version(&self) -> Result<String, DriverCacheError>;

    /// Archive build target for this platform.
    fn build_target(&self) -> BuildTarget;
}

/// Detection strategy for the machine the crate is running on.
pub struct HostPlatform;

#[async_trait]
impl PlatformStrategy for HostPlatform {
    async fn detect_browser_version(&self) -> Result<String, DriverCacheError> {
        detect_version_system().await
    }

    fn build_target(&self) -> BuildTarget {
        BuildTarget::from_os(std::env::consts::OS)
    }
}

// --- Platform-Specific Implementations ---

#[cfg(target_os = "linux")]
async fn detect_version_system() -> Result<String, DriverCacheError> {
    let path = find_browser_path().ok_or(DriverCacheError::BrowserNotFound)?;
    version_from_cli(&path).await
}

#[cfg(target_os = "linux")]
fn find_browser_path() -> Option<PathBuf> {
    let candidates = [
        "google-chrome",
        "google-chrome-stable",
        "chromium-browser",
        "chromium",
    ];

    candidates
        .into_iter()
        .find_map(|name| which::which(name).ok())
        .or_else(|| {
            let path = PathBuf::from("/usr/bin/google-chrome");
            path.exists().then_some(path)
        })
}

#[cfg(target_os = "macos")]
async fn detect_version_system() -> Result<String, DriverCacheError> {
    let path = PathBuf::from("/Applications/Google Chrome.app/Contents/MacOS/Google Chrome");
    if !path.exists() {
        return Err(DriverCacheError::BrowserNotFound);
    }
    version_from_cli(&path).await
}

#[cfg(windows)]
async fn detect_version_system() -> Result<String, DriverCacheError> {
    match version_from_registry().await {
        Ok(version) => Ok(version),
        Err(err) => {
            tracing::warn!(error = %err, "registry query failed, scanning install folders");
            version_from_install_folders()
        }
    }
}

#[cfg(windows)]
async fn version_from_registry() -> Result<String, DriverCacheError> {
    // Chrome records its uninstall metadata under the 32-bit view.
    const UNINSTALL_KEY: &str =
        r"HKLM\SOFTWARE\Wow6432Node\Microsoft\Windows\CurrentVersion\Uninstall\Google Chrome";

    let output = tokio::process::Command::new("reg")
        .args(["query", UNINSTALL_KEY])
        .output()
        .await
        .map_err(|e| DriverCacheError::CommandExecutionError {
            command: format!("reg query {}", UNINSTALL_KEY),
            source: e,
        })?;

    let text = String::from_utf8(output.stdout).map_err(|e| {
        DriverCacheError::CommandOutputParsingError {
            command: format!("reg query {}", UNINSTALL_KEY),
            source: e,
        }
    })?;

    version_from_reg_output(&text)
        .ok_or(DriverCacheError::BrowserVersionParsingError { output: text })
}

#[cfg(windows)]
fn version_from_install_folders() -> Result<String, DriverCacheError> {
    let bases = [
        r"C:\Program Files\Google\Chrome\Application",
        r"C:\Program Files (x86)\Google\Chrome\Application",
    ];

    for base in bases {
        let Ok(entries) = std::fs::read_dir(base) else {
            continue;
        };
        for entry in entries.flatten() {
            if !entry.path().is_dir() {
                continue;
            }
            if let Some(version) = entry
                .file_name()
                .to_str()
                .and_then(version_from_folder_name)
            {
                return Ok(version);
            }
        }
    }

    Err(DriverCacheError::BrowserNotFound)
}

#[cfg(any(not(windows), test))]
async fn version_from_cli(path: &Path) -> Result<String, DriverCacheError> {
    let output = tokio::process::Command::new(path)
        .arg("--version")
        .output()
        .await
        .map_err(|e| DriverCacheError::CommandExecutionError {
            command: format!("'{}' --version", path.to_string_lossy()),
            source: e,
        })?;

    let stdout = String::from_utf8(output.stdout).map_err(|e| {
        DriverCacheError::CommandOutputParsingError {
            command: format!("'{}' --version", path.to_string_lossy()),
            source: e,
        }
    })?;

    version_from_cli_output(&stdout)
        .ok_or(DriverCacheError::BrowserVersionParsingError { output: stdout })
}

// --- Raw-output parsers ---
// Pure functions over captured text, so they stay testable on every host.

/// Pulls the version token out of `--version` output such as
/// `Google Chrome 96.0.4664.45` or `Chromium 96.0.4664.45 snap`.
#[cfg(any(not(windows), test))]
fn version_from_cli_output(output: &str) -> Option<String> {
    output
        .split_whitespace()
        .find(|token| {
            token.chars().next().is_some_and(|c| c.is_ascii_digit()) && token.contains('.')
        })
        .map(str::to_string)
}

/// Pulls `DisplayVersion    REG_SZ    <version>` out of raw `reg query` text.
#[cfg(any(windows, test))]
fn version_from_reg_output(output: &str) -> Option<String> {
    output.lines().find_map(|line| {
        let rest = line.trim_start().strip_prefix("DisplayVersion")?;
        let version = rest.trim_start().strip_prefix("REG_SZ")?.trim();
        (!version.is_empty()).then(|| version.to_string())
    })
}

/// Matches a four-component numeric version in an install folder name.
#[cfg(any(windows, test))]
fn version_from_folder_name(name: &str) -> Option<String> {
    use regex::Regex;
    use std::sync::OnceLock;

    static PATTERN: OnceLock<Regex> = OnceLock::new();
    let re = PATTERN.get_or_init(|| Regex::new(r"\d+\.\d+\.\d+\.\d+").unwrap());
    re.find(name).map(|m| m.as_str().to_string())
}

// --- Tests ---
