//!
//! fileserver storage module
//! -------------------------
//! This module defines the filesystem driver boundary used by the resource mapper.
//! Every operation is a single-shot asynchronous call addressed by a URL-style
//! logical path (`/a/b.txt`, `/a/`) that is always interpreted relative to the
//! driver's root. Failures are reported as a typed `FsError` so callers can tell
//! "this is a directory" from "this is a file" without inspecting messages.
//!
//! Key pieces:
//! - `FsDriver`: the primitive operations (list, listAll, readFile, writeFile,
//!   mkdir, rmdir, unlink, move).
//! - `LocalFs`: a `tokio::fs` implementation rooted at a host directory.
//! - `Encoding`: text encodings used to decode written content and encode read content.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

mod paths;
pub mod encoding;
pub mod local;

pub use encoding::Encoding;
pub use local::LocalFs;

/// One entry produced by a directory listing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DirEntry {
    pub name: String,
    /// Logical path; directories end with `/`.
    pub path: String,
    pub dir: bool,
}

/// Typed driver failure. Each variant carries the logical path it concerns.
#[derive(Debug, Error)]
pub enum FsError {
    #[error("not a directory: {0}")]
    NotADirectory(String),
    #[error("is a directory: {0}")]
    IsADirectory(String),
    #[error("already exists: {0}")]
    AlreadyExists(String),
    #[error("no such file or directory: {0}")]
    NotFound(String),
    #[error("directory not empty: {0}")]
    NotEmpty(String),
    #[error("permission denied: {0}")]
    PermissionDenied(String),
    #[error("invalid path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },
    #[error("invalid {encoding} content: {reason}")]
    InvalidContent { encoding: &'static str, reason: String },
    #[error("i/o error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl FsError {
    /// Classify an `std::io::Error` raised while operating on `path`.
    pub fn from_io(path: &str, err: std::io::Error) -> Self {
        use std::io::ErrorKind;
        let path = path.to_string();
        match err.kind() {
            ErrorKind::NotFound => FsError::NotFound(path),
            ErrorKind::AlreadyExists => FsError::AlreadyExists(path),
            ErrorKind::PermissionDenied => FsError::PermissionDenied(path),
            ErrorKind::NotADirectory => FsError::NotADirectory(path),
            ErrorKind::IsADirectory => FsError::IsADirectory(path),
            ErrorKind::DirectoryNotEmpty => FsError::NotEmpty(path),
            _ => FsError::Io { path, source: err },
        }
    }

    /// Stable errno-style code, reported to clients in error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            FsError::NotADirectory(_) => "ENOTDIR",
            FsError::IsADirectory(_) => "EISDIR",
            FsError::AlreadyExists(_) => "EEXIST",
            FsError::NotFound(_) => "ENOENT",
            FsError::NotEmpty(_) => "ENOTEMPTY",
            FsError::PermissionDenied(_) => "EACCES",
            FsError::InvalidPath { .. } | FsError::InvalidContent { .. } => "EINVAL",
            FsError::Io { .. } => "EIO",
        }
    }

    pub(crate) fn invalid_path<S: Into<String>>(path: &str, reason: S) -> Self {
        FsError::InvalidPath { path: path.to_string(), reason: reason.into() }
    }
}

pub type FsResult<T> = Result<T, FsError>;

/// Options for `FsDriver::write_file`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteFileOptions {
    pub encoding: Encoding,
    /// Permission bits applied when the file is created.
    pub mode: u32,
}

impl Default for WriteFileOptions {
    fn default() -> Self {
        Self { encoding: Encoding::Utf8, mode: 0o666 }
    }
}

/// Options for `FsDriver::move_entry`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MoveEntryOptions {
    /// Replace an existing destination instead of failing.
    pub clobber: bool,
    /// Create missing parent directories of the destination.
    pub mkdirp: bool,
}

/// Primitive filesystem operations consumed by the resource mapper.
///
/// Implementations must be `Send + Sync`; the mapper holds them as
/// `Arc<dyn FsDriver>` and issues at most one call per request.
#[async_trait]
pub trait FsDriver: Send + Sync {
    /// Immediate children of `dir`, in a stable order.
    async fn list(&self, dir: &str) -> FsResult<Vec<DirEntry>>;

    /// Every descendant of `dir`, flattened; each entry carries its own path.
    async fn list_all(&self, dir: &str) -> FsResult<Vec<DirEntry>>;

    /// File content rendered in `encoding`.
    async fn read_file(&self, path: &str, encoding: Encoding) -> FsResult<Vec<u8>>;

    /// Create or fully overwrite a file. `content` is decoded with `opts.encoding`.
    async fn write_file(&self, path: &str, content: &str, opts: WriteFileOptions) -> FsResult<()>;

    async fn mkdir(&self, path: &str, mode: u32) -> FsResult<()>;

    /// Remove a directory; with `clobber` its contents go too.
    async fn rmdir(&self, path: &str, clobber: bool) -> FsResult<()>;

    async fn unlink(&self, path: &str) -> FsResult<()>;

    /// Rename `src` to `dst` in one step.
    async fn move_entry(&self, src: &str, dst: &str, opts: MoveEntryOptions) -> FsResult<()>;
}
