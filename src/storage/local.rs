//! `tokio::fs` driver rooted at a host directory.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use super::paths::{child_path, to_local_path, trim_dir_slash};
use super::{DirEntry, Encoding, FsDriver, FsError, FsResult, MoveEntryOptions, WriteFileOptions};

/// Filesystem driver serving the subtree under `root`.
///
/// Logical paths never resolve outside the root: they are validated segment by
/// segment before being joined (see `validate_logical_path`).
#[derive(Debug, Clone)]
pub struct LocalFs {
    root: PathBuf,
}

impl LocalFs {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self { root: root.as_ref().to_path_buf() }
    }

    fn resolve(&self, path: &str) -> FsResult<PathBuf> {
        to_local_path(&self.root, path)
    }

    async fn require_dir(&self, path: &str) -> FsResult<PathBuf> {
        let local = self.resolve(path)?;
        let meta = fs::metadata(&local).await.map_err(|e| FsError::from_io(path, e))?;
        if !meta.is_dir() {
            return Err(FsError::NotADirectory(path.to_string()));
        }
        Ok(local)
    }

    /// Immediate children of an already-resolved directory, sorted by name.
    async fn children(&self, dir: &str, local: &Path) -> FsResult<Vec<DirEntry>> {
        let mut rd = fs::read_dir(local).await.map_err(|e| FsError::from_io(dir, e))?;
        let mut out = Vec::new();
        while let Some(ent) = rd.next_entry().await.map_err(|e| FsError::from_io(dir, e))? {
            let name = ent.file_name().to_string_lossy().to_string();
            // Follow symlinks for the kind; a dangling link lists as a file.
            let is_dir = match fs::metadata(ent.path()).await {
                Ok(m) => m.is_dir(),
                Err(_) => false,
            };
            let path = child_path(dir, &name, is_dir);
            out.push(DirEntry { name, path, dir: is_dir });
        }
        out.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(out)
    }
}

#[async_trait]
impl FsDriver for LocalFs {
    async fn list(&self, dir: &str) -> FsResult<Vec<DirEntry>> {
        let local = self.require_dir(dir).await?;
        let entries = self.children(dir, &local).await?;
        debug!(target: "fileserver::storage", "list: dir='{}' entries={}", dir, entries.len());
        Ok(entries)
    }

    async fn list_all(&self, dir: &str) -> FsResult<Vec<DirEntry>> {
        let local = self.require_dir(dir).await?;
        // Depth-first pre-order: every directory is followed by its descendants.
        let mut out = Vec::new();
        let mut stack: Vec<DirEntry> = self.children(dir, &local).await?.into_iter().rev().collect();
        while let Some(entry) = stack.pop() {
            if entry.dir {
                let sub_local = self.resolve(&entry.path)?;
                let sub = self.children(&entry.path, &sub_local).await?;
                stack.extend(sub.into_iter().rev());
            }
            out.push(entry);
        }
        debug!(target: "fileserver::storage", "list_all: dir='{}' entries={}", dir, out.len());
        Ok(out)
    }

    async fn read_file(&self, path: &str, encoding: Encoding) -> FsResult<Vec<u8>> {
        let local = self.resolve(path)?;
        let meta = fs::metadata(&local).await.map_err(|e| FsError::from_io(path, e))?;
        if meta.is_dir() {
            return Err(FsError::IsADirectory(path.to_string()));
        }
        let bytes = fs::read(&local).await.map_err(|e| FsError::from_io(path, e))?;
        debug!(target: "fileserver::storage", "read_file: path='{}' size={} encoding={}", path, bytes.len(), encoding);
        Ok(encoding.encode(&bytes))
    }

    async fn write_file(&self, path: &str, content: &str, opts: WriteFileOptions) -> FsResult<()> {
        let local = self.resolve(path)?;
        let bytes = opts.encoding.decode(content)?;
        let mut oo = fs::OpenOptions::new();
        oo.write(true).create(true).truncate(true);
        #[cfg(unix)]
        oo.mode(opts.mode);
        let mut file = oo.open(&local).await.map_err(|e| FsError::from_io(path, e))?;
        file.write_all(&bytes).await.map_err(|e| FsError::from_io(path, e))?;
        file.flush().await.map_err(|e| FsError::from_io(path, e))?;
        debug!(target: "fileserver::storage", "write_file: path='{}' size={} mode={:o}", path, bytes.len(), opts.mode);
        Ok(())
    }

    async fn mkdir(&self, path: &str, mode: u32) -> FsResult<()> {
        let local = self.resolve(path)?;
        let mut builder = fs::DirBuilder::new();
        #[cfg(unix)]
        builder.mode(mode);
        match builder.create(&local).await {
            Ok(()) => {
                debug!(target: "fileserver::storage", "mkdir: path='{}' mode={:o}", path, mode);
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                // Creating an existing directory is a no-op; an existing file is not.
                match fs::metadata(&local).await {
                    Ok(m) if m.is_dir() => Ok(()),
                    _ => Err(FsError::AlreadyExists(path.to_string())),
                }
            }
            Err(e) => Err(FsError::from_io(path, e)),
        }
    }

    async fn rmdir(&self, path: &str, clobber: bool) -> FsResult<()> {
        if trim_dir_slash(path) == "/" {
            return Err(FsError::invalid_path(path, "the root directory cannot be removed"));
        }
        let local = self.require_dir(path).await?;
        let res = if clobber { fs::remove_dir_all(&local).await } else { fs::remove_dir(&local).await };
        res.map_err(|e| FsError::from_io(path, e))?;
        debug!(target: "fileserver::storage", "rmdir: path='{}' clobber={}", path, clobber);
        Ok(())
    }

    async fn unlink(&self, path: &str) -> FsResult<()> {
        let local = self.resolve(path)?;
        let meta = fs::symlink_metadata(&local).await.map_err(|e| FsError::from_io(path, e))?;
        if meta.is_dir() {
            return Err(FsError::IsADirectory(path.to_string()));
        }
        fs::remove_file(&local).await.map_err(|e| FsError::from_io(path, e))?;
        debug!(target: "fileserver::storage", "unlink: path='{}'", path);
        Ok(())
    }

    async fn move_entry(&self, src: &str, dst: &str, opts: MoveEntryOptions) -> FsResult<()> {
        let src_local = self.resolve(src)?;
        let dst_local = self.resolve(dst)?;
        if trim_dir_slash(src) == "/" || trim_dir_slash(dst) == "/" {
            return Err(FsError::invalid_path(src, "the root directory cannot be moved or replaced"));
        }
        if dst_local.starts_with(&src_local) {
            return Err(FsError::invalid_path(dst, "destination lies inside the source"));
        }
        fs::symlink_metadata(&src_local).await.map_err(|e| FsError::from_io(src, e))?;

        // Everything that can fail is checked before the destination is touched.
        let existing = match fs::symlink_metadata(&dst_local).await {
            Ok(_) if !opts.clobber => return Err(FsError::AlreadyExists(dst.to_string())),
            Ok(meta) => Some(meta),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => return Err(FsError::from_io(dst, e)),
        };

        if let Some(parent) = dst_local.parent() {
            match fs::metadata(parent).await {
                Ok(m) if m.is_dir() => {}
                Ok(_) => return Err(FsError::NotADirectory(dst.to_string())),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound && opts.mkdirp => {
                    fs::create_dir_all(parent).await.map_err(|e| FsError::from_io(dst, e))?;
                }
                Err(e) => return Err(FsError::from_io(dst, e)),
            }
        }

        // rename(2) cannot replace a non-empty directory: park it beside the
        // destination and drop it only once the rename has landed.
        let parked = match existing {
            Some(meta) if meta.is_dir() => {
                let aside = parked_path(&dst_local);
                fs::rename(&dst_local, &aside).await.map_err(|e| FsError::from_io(dst, e))?;
                Some(aside)
            }
            _ => None,
        };

        if let Err(e) = fs::rename(&src_local, &dst_local).await {
            if let Some(aside) = &parked {
                if let Err(restore) = fs::rename(aside, &dst_local).await {
                    warn!(target: "fileserver::storage", "move: failed to restore '{}' from {:?}: {}", dst, aside, restore);
                }
            }
            return Err(FsError::from_io(src, e));
        }
        if let Some(aside) = parked {
            if let Err(e) = fs::remove_dir_all(&aside).await {
                warn!(target: "fileserver::storage", "move: replaced directory left at {:?}: {}", aside, e);
            }
        }
        debug!(target: "fileserver::storage", "move: src='{}' dst='{}' clobber={} mkdirp={}", src, dst, opts.clobber, opts.mkdirp);
        Ok(())
    }
}

/// Sibling name an existing destination directory is parked under during a clobbering move.
fn parked_path(dst: &Path) -> PathBuf {
    let name = dst.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
    dst.with_file_name(format!(".{}.replaced-{}", name, std::process::id()))
}
