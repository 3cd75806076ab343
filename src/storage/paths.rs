use std::path::{Path, PathBuf};

use super::{FsError, FsResult};

/// Validate a logical path according to driver rules:
/// - must start with '/', segments separated by '/'
/// - NUL and '\' are not allowed
/// - no empty segments ('//'); a single trailing '/' marks a directory
/// - segments '.' and '..' are not allowed, so a path can never leave the root
pub fn validate_logical_path(path: &str) -> FsResult<()> {
    if !path.starts_with('/') {
        return Err(FsError::invalid_path(path, "logical path must start with '/'"));
    }
    if path.contains('\u{0000}') {
        return Err(FsError::invalid_path(path, "logical path cannot contain NUL characters"));
    }
    if path.contains('\\') {
        return Err(FsError::invalid_path(path, "'\\' is not a valid separator"));
    }
    if path == "/" {
        return Ok(());
    }
    let inner = trim_dir_slash(path);
    for seg in inner[1..].split('/') {
        if seg.is_empty() {
            return Err(FsError::invalid_path(path, "empty segments ('//') are not allowed"));
        }
        if seg == "." || seg == ".." {
            return Err(FsError::invalid_path(path, "segments '.' and '..' are not allowed"));
        }
    }
    Ok(())
}

/// Split a logical path into its segments. Validation is performed first.
pub fn split_segments(path: &str) -> FsResult<Vec<&str>> {
    validate_logical_path(path)?;
    Ok(trim_dir_slash(path).split('/').filter(|s| !s.is_empty()).collect())
}

/// Drop exactly one trailing '/', leaving the root as "/".
pub fn trim_dir_slash(path: &str) -> &str {
    if path.len() > 1 { path.strip_suffix('/').unwrap_or(path) } else { path }
}

/// Resolve a logical path to a host path under `root`.
pub(crate) fn to_local_path(root: &Path, path: &str) -> FsResult<PathBuf> {
    let mut local = root.to_path_buf();
    for seg in split_segments(path)? {
        local.push(seg);
    }
    Ok(local)
}

/// Logical path of a child entry named `name` inside directory `dir`.
pub(crate) fn child_path(dir: &str, name: &str, is_dir: bool) -> String {
    let base = trim_dir_slash(dir);
    let mut out = String::with_capacity(base.len() + name.len() + 2);
    out.push_str(base);
    if !out.ends_with('/') { out.push('/'); }
    out.push_str(name);
    if is_dir { out.push('/'); }
    out
}
