//! Resource mapper: turns a target path plus per-operation options into exactly one
//! driver call, and the driver's answer into something the HTTP layer can send.
//!
//! Read-side operations (list, read) return an `Outcome` so a wrong trailing-slash
//! guess comes back as a value rather than an error. Write-side operations trust the
//! kind hint: it decides which primitive runs, so there is nothing to correct.

use std::sync::Arc;

use tracing::debug;

use crate::error::AppResult;
use crate::storage::{FsDriver, MoveEntryOptions, WriteFileOptions};
use super::formatter::OutputFormatter;
use super::options::{CreateOptions, DeleteOptions, ListOptions, MoveOptions, ReadOptions};
use super::resource::{Kind, Outcome, ResourceDescriptor, TargetPath};

/// File content ready to be sent, with the media type derived from the path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileContent {
    pub body: Vec<u8>,
    pub content_type: String,
}

#[derive(Clone)]
pub struct ResourceMapper {
    driver: Arc<dyn FsDriver>,
    formatter: OutputFormatter,
}

impl ResourceMapper {
    pub fn new(driver: Arc<dyn FsDriver>, formatter: OutputFormatter) -> Self {
        Self { driver, formatter }
    }

    pub fn formatter(&self) -> &OutputFormatter { &self.formatter }

    /// List a directory, immediate children or all descendants, in driver order.
    pub async fn list(&self, target: &TargetPath, opts: ListOptions) -> AppResult<Outcome<Vec<ResourceDescriptor>>> {
        let res = if opts.recursive {
            self.driver.list_all(&target.decoded).await
        } else {
            self.driver.list(&target.decoded).await
        };
        let outcome = Outcome::from_driver(res, Kind::Directory)?;
        Ok(outcome.map(|entries| {
            debug!(target: "fileserver::server", "list: path='{}' recursive={} entries={}", target.decoded, opts.recursive, entries.len());
            self.formatter.apply_all(entries.into_iter().map(ResourceDescriptor::from).collect())
        }))
    }

    /// Read a file in the requested encoding.
    pub async fn read(&self, target: &TargetPath, opts: ReadOptions) -> AppResult<Outcome<FileContent>> {
        let res = self.driver.read_file(&target.decoded, opts.encoding).await;
        let outcome = Outcome::from_driver(res, Kind::File)?;
        Ok(outcome.map(|body| FileContent { body, content_type: content_type_for(&target.decoded) }))
    }

    /// Create or replace: a directory path makes a directory, a file path writes the file.
    pub async fn create(&self, target: &TargetPath, opts: CreateOptions) -> AppResult<ResourceDescriptor> {
        match target.kind {
            Kind::Directory => self.driver.mkdir(&target.decoded, opts.mode).await?,
            Kind::File => {
                let wopts = WriteFileOptions { encoding: opts.encoding, mode: opts.mode };
                self.driver.write_file(&target.decoded, &opts.content, wopts).await?
            }
        }
        debug!(target: "fileserver::server", "create: path='{}' kind={:?} mode={:o}", target.decoded, target.kind, opts.mode);
        Ok(self.formatter.apply(target.descriptor()))
    }

    /// Move/rename the target to `opts.new_path`.
    ///
    /// NOTE: the returned descriptor is the *source* path as requested, not the
    /// destination. Clients rely on this echo; changing it is a product decision.
    pub async fn move_to(&self, target: &TargetPath, opts: MoveOptions) -> AppResult<ResourceDescriptor> {
        let mopts = MoveEntryOptions { clobber: opts.clobber, mkdirp: opts.mkdirp };
        self.driver.move_entry(&target.decoded, &opts.new_path, mopts).await?;
        debug!(target: "fileserver::server", "move: src='{}' dst='{}'", target.decoded, opts.new_path);
        Ok(self.formatter.apply(target.descriptor()))
    }

    /// Delete: a directory path removes a directory, a file path unlinks the file.
    /// The descriptor echoes what was removed.
    pub async fn delete(&self, target: &TargetPath, opts: DeleteOptions) -> AppResult<ResourceDescriptor> {
        match target.kind {
            Kind::Directory => self.driver.rmdir(&target.decoded, opts.clobber).await?,
            Kind::File => self.driver.unlink(&target.decoded).await?,
        }
        debug!(target: "fileserver::server", "delete: path='{}' kind={:?} clobber={}", target.decoded, target.kind, opts.clobber);
        Ok(self.formatter.apply(target.descriptor()))
    }
}

fn content_type_for(path: &str) -> String {
    mime_guess::from_path(path).first_or_octet_stream().essence_str().to_string()
}

#[cfg(test)]
#[path = "mapper_tests.rs"]
mod mapper_tests;
