//! HTTP fetch and archive extraction for driver downloads.

use crate::error::DriverCacheError;
use std::path::{Path, PathBuf};
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;
use walkdir::WalkDir;

/// Queries the release endpoint for the driver version compatible with a
/// patch-stripped browser version key.
///
/// The endpoint answers `GET {base}/LATEST_RELEASE_{key}` with the version
/// as plain text.
pub async fn fetch_latest_release(
    endpoint: &str,
    version_key: &str,
) -> Result<String, DriverCacheError> {
    let url = format!("{}/LATEST_RELEASE_{}", endpoint, version_key);
    tracing::debug!(%url, "querying compatible driver version");

    let response = reqwest::get(&url).await?.error_for_status()?;
    Ok(response.text().await?.trim().to_string())
}

/// Downloads the archive at `url` and extracts it into `install_path`.
///
/// The archive is staged in a scratch directory that is removed on return,
/// so no `.zip` file survives next to the cache. Returns the path of the
/// driver executable found in the extracted tree.
pub async fn download_and_extract(
    url: &str,
    install_path: &Path,
    driver_name: &str,
) -> Result<PathBuf, DriverCacheError> {

    // --- 1. Create a scratch directory for the archive.
    let temp_dir = tempfile::Builder::new()
        .prefix("chromedriver-cache-")
        .tempdir()
        .map_err(|e| DriverCacheError::IoError {
            path: PathBuf::from("temp"),
            source: e,
        })?;
    let archive_path = temp_dir.path().join("driver.zip");

    // --- 2. Download the zip file into the scratch directory.
    download_file(url, &archive_path).await?;

    // --- 3. Unzip into the final installation directory.
    unzip_file(&archive_path, install_path).await?;

    // --- 4. Find the driver executable within the unzipped files.
    // Necessary because archives might contain a top-level directory.
    find_driver_executable(install_path, driver_name)
}

/// Downloads a file from a given URL and saves it to a destination path.
pub async fn download_file(url: &str, dest_path: &Path) -> Result<(), DriverCacheError> {

    // Ensure parent directory exists.
    if let Some(parent) = dest_path.parent() {
        fs::create_dir_all(parent)
            .await
            .map_err(|e| DriverCacheError::IoError {
                path: parent.to_path_buf(),
                source: e,
            })?;
    }

    tracing::info!(%url, "downloading driver archive");
    let response = reqwest::get(url).await?.error_for_status()?;

    let mut dest_file = File::create(dest_path)
        .await
        .map_err(|e| DriverCacheError::IoError {
            path: dest_path.to_path_buf(),
            source: e,
        })?;

    let content = response.bytes().await?;
    dest_file
        .write_all(&content)
        .await
        .map_err(|e| DriverCacheError::IoError {
            path: dest_path.to_path_buf(),
            source: e,
        })?;

    Ok(())
}

/// Decompresses a .zip archive to a specified directory.
///
/// The core zip logic is synchronous, so we wrap it in `spawn_blocking` to
/// avoid blocking the Tokio runtime.
pub async fn unzip_file(archive_path: &Path, extract_to: &Path) -> Result<(), DriverCacheError> {

    let archive_path_buf = archive_path.to_path_buf();
    let extract_to_buf = extract_to.to_path_buf();

    tokio::task::spawn_blocking(move || {
        let file = std::fs::File::open(&archive_path_buf).map_err(|e| DriverCacheError::IoError {
            path: archive_path_buf.clone(),
            source: e,
        })?;

        let mut archive = zip::ZipArchive::new(file).map_err(|e| DriverCacheError::ZipError {
            path: archive_path_buf.clone(),
            source: e,
        })?;

        // Ensure the extraction directory exists.
        std::fs::create_dir_all(&extract_to_buf).map_err(|e| DriverCacheError::IoError {
            path: extract_to_buf.clone(),
            source: e,
        })?;

        for i in 0..archive.len() {
            let mut file = archive.by_index(i).map_err(|e| DriverCacheError::ZipError {
                path: archive_path_buf.clone(),
                source: e,
            })?;

            let outpath = match file.enclosed_name() {
                Some(path) => extract_to_buf.join(path),
                None => continue,
            };

            if file.name().ends_with('/') {
                std::fs::create_dir_all(&outpath).map_err(|e| DriverCacheError::IoError {
                    path: outpath.clone(),
                    source: e,
                })?;
                continue;
            }

            if let Some(p) = outpath.parent() {
                if !p.exists() {
                    std::fs::create_dir_all(p).map_err(|e| DriverCacheError::IoError {
                        path: p.to_path_buf(),
                        source: e,
                    })?;
                }
            }

            let mut outfile =
                std::fs::File::create(&outpath).map_err(|e| DriverCacheError::IoError {
                    path: outpath.clone(),
                    source: e,
                })?;

            std::io::copy(&mut file, &mut outfile).map_err(|e| DriverCacheError::IoError {
                path: outpath.clone(),
                source: e,
            })?;

            // Preserve executable bits recorded in the archive.
            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                if let Some(mode) = file.unix_mode() {
                    std::fs::set_permissions(&outpath, std::fs::Permissions::from_mode(mode))
                        .map_err(|e| DriverCacheError::IoError {
                            path: outpath.clone(),
                            source: e,
                        })?;
                }
            }
        }
        Ok(())
    })
    .await
    .unwrap() // Propagate panics from the blocking task.
}

/// Searches a directory for the driver executable file.
pub fn find_driver_executable(
    search_path: &Path,
    driver_name: &str,
) -> Result<PathBuf, DriverCacheError> {

    let driver_exe_name = if cfg!(target_os = "windows") {
        format!("{}.exe", driver_name)
    } else {
        driver_name.to_string()
    };

    for entry in WalkDir::new(search_path) {
        let entry = entry.map_err(|e| DriverCacheError::IoError {
            path: e.path().unwrap_or(search_path).to_path_buf(),
            source: e
                .into_io_error()
                .unwrap_or_else(|| std::io::Error::other("walkdir error")),
        })?;
        if let Some(file_name) = entry.path().file_name().and_then(|n| n.to_str()) {
            if file_name == driver_exe_name && entry.path().is_file() {
                return Ok(entry.path().to_path_buf());
            }
        }
    }

    Err(DriverCacheError::DriverExecutableNotFound {
        path: search_path.to_path_buf(),
    })
}

// --- Tests ---
