use thiserror::Error;
use std::path::PathBuf;
use std::io;

/// Error type for all possible failures in the library.
#[derive(Error, Debug)]
pub enum DriverCacheError {
    #[error("Failed to execute command '{command}': {source}")]
    CommandExecutionError {
        command: String,
        #[source]
        source: io::Error,
    },

    #[error("Command '{command}' output could not be parsed: {source}")]
    CommandOutputParsingError {
        command: String,
        #[source]
        source: std::string::FromUtf8Error,
    },

    #[error("Chrome not found. Ensure it is installed in a standard location.")]
    BrowserNotFound,

    #[error("Failed to parse a browser version from output: '{output}'")]
    BrowserVersionParsingError { output: String },

    #[error("Network request failed: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Remote endpoint returned no driver version for browser version '{browser_version}'")]
    DriverVersionNotFound { browser_version: String },

    #[error("I/O error accessing path '{path}': {source}")]
    IoError {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to decompress zip file to '{path}': {source}")]
    ZipError {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },

    #[error("Driver executable not found in the extracted files at '{path}'")]
    DriverExecutableNotFound { path: PathBuf },

    #[error("Manifest at '{path}' is not valid JSON: {source}")]
    ManifestParseError {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Could not determine the user home directory")]
    HomeDirNotFound,
}
