//! Remote store client traits

use crate::Result;
use std::io::{Read, Write};

/// Metadata for one store entry
#[derive(Debug, Clone)]
pub struct EntryMeta {
    /// Entry name (final path segment)
    pub name: String,

    /// Fully-qualified store URI
    pub path: String,

    /// Size in bytes (0 for directories)
    pub size: u64,

    /// Is this a directory?
    pub is_dir: bool,
}

/// Factory handing out per-operation store sessions.
///
/// Every operation opens its own session and drops it before returning.
/// Nothing is pooled or shared across calls.
pub trait StoreClient: Send + Sync {
    fn open_session(&self) -> Result<Box<dyn StoreSession>>;
}

/// One scoped connection to the hierarchical store.
pub trait StoreSession {
    /// Check whether an entry exists at the given URI.
    fn exists(&self, path: &str) -> Result<bool>;

    /// Metadata for a single entry, or None if absent.
    fn status(&self, path: &str) -> Result<Option<EntryMeta>>;

    /// Immediate children of a directory, non-recursive. Listing a plain
    /// file yields that file's own entry.
    fn list_children(&self, path: &str) -> Result<Vec<EntryMeta>>;

    /// Open an entry for reading.
    fn open_read(&self, path: &str) -> Result<Box<dyn Read + Send>>;

    /// Create an entry and open it for writing. The entry is visible as
    /// soon as it is created; bytes written so far stay behind if the
    /// stream is abandoned mid-copy.
    fn create_write(&self, path: &str) -> Result<Box<dyn Write + Send>>;

    /// Delete an entry. Directories require `recursive`. Returns false
    /// when the entry is absent.
    fn delete(&self, path: &str, recursive: bool) -> Result<bool>;

    /// Atomically rename an entry. Returns false when the source is
    /// absent or the destination is taken.
    fn rename(&self, from: &str, to: &str) -> Result<bool>;

    /// Create a directory and any missing ancestors.
    fn mkdir_parents(&self, path: &str) -> Result<()>;
}
