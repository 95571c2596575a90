//! Small helpers for working with Chrome's `major.minor.build.patch` strings.

/// Drops the final `.`-separated component of a version string.
///
/// The legacy release endpoint is keyed by the version with its patch
/// component removed, e.g. `96.0.4664.45` -> `96.0.4664`. A string with no
/// separator is returned unchanged.
pub fn strip_patch(version: &str) -> &str {
    match version.rfind('.') {
        Some(idx) => &version[..idx],
        None => version,
    }
}

/// Returns the leading major component of a version string.
///
/// `96.0.4664.45` -> `96`. A string with no separator is its own major.
pub fn major(version: &str) -> &str {
    match version.find('.') {
        Some(idx) => &version[..idx],
        None => version,
    }
}

/// Whether two full version strings share the same major component.
pub fn same_major(a: &str, b: &str) -> bool {
    major(a) == major(b)
}
