//! Output formatter: a swappable transform applied to every outgoing descriptor.
//!
//! The slot is shared by every clone of the handle, so a change is visible to all
//! requests formatted afterwards. There is no isolation from in-flight requests:
//! a response formatted concurrently with `set`/`clear` sees either transform.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::{AppError, AppResult};
use super::resource::ResourceDescriptor;

pub type FormatFn = dyn Fn(ResourceDescriptor) -> ResourceDescriptor + Send + Sync;

/// Built-in transforms selectable by name from configuration.
pub const PRESET_NAMES: &[&str] = &["identity", "uppercase-name", "lowercase-name", "strip-trailing-slash"];

#[derive(Clone, Default)]
pub struct OutputFormatter {
    slot: Arc<RwLock<Option<Arc<FormatFn>>>>,
}

impl std::fmt::Debug for OutputFormatter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutputFormatter").field("set", &self.is_set()).finish()
    }
}

impl OutputFormatter {
    pub fn new() -> Self { Self::default() }

    /// Replace the current transform.
    pub fn set<F>(&self, f: F)
    where
        F: Fn(ResourceDescriptor) -> ResourceDescriptor + Send + Sync + 'static,
    {
        *self.slot.write() = Some(Arc::new(f));
    }

    /// Install a built-in transform by name. An unknown name is rejected and
    /// the current transform is left in place.
    pub fn set_named(&self, name: &str) -> AppResult<()> {
        let f = preset(name).ok_or_else(|| {
            AppError::user(
                "invalid_formatter".to_string(),
                format!("'{}' is not a formatter; expected one of: {}", name, PRESET_NAMES.join(", ")),
            )
        })?;
        *self.slot.write() = Some(f);
        tracing::info!(target: "fileserver::server", "output formatter set to '{}'", name);
        Ok(())
    }

    /// Reset to identity.
    pub fn clear(&self) {
        *self.slot.write() = None;
    }

    pub fn is_set(&self) -> bool { self.slot.read().is_some() }

    pub fn apply(&self, d: ResourceDescriptor) -> ResourceDescriptor {
        // Clone the Arc out so the lock is not held while user code runs.
        let current = self.slot.read().clone();
        match current {
            Some(f) => f(d),
            None => d,
        }
    }

    /// Format each descriptor independently, keeping their order.
    pub fn apply_all(&self, items: Vec<ResourceDescriptor>) -> Vec<ResourceDescriptor> {
        let current = self.slot.read().clone();
        match current {
            Some(f) => items.into_iter().map(|d| f(d)).collect(),
            None => items,
        }
    }
}

fn preset(name: &str) -> Option<Arc<FormatFn>> {
    let f: Arc<FormatFn> = match name.trim().to_ascii_lowercase().as_str() {
        "identity" => Arc::new(|d: ResourceDescriptor| d),
        "uppercase-name" => Arc::new(|mut d: ResourceDescriptor| { d.name = d.name.to_uppercase(); d }),
        "lowercase-name" => Arc::new(|mut d: ResourceDescriptor| { d.name = d.name.to_lowercase(); d }),
        "strip-trailing-slash" => Arc::new(|mut d: ResourceDescriptor| {
            if d.path.len() > 1 && d.path.ends_with('/') { d.path.pop(); }
            d
        }),
        _ => return None,
    };
    Some(f)
}
