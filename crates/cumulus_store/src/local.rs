//! Filesystem-backed store

use crate::client::{EntryMeta, StoreClient, StoreSession};
use crate::resolver::{final_segment, join};
use crate::{Result, StoreError};
use std::fs;
use std::io::{Read, Write};
use std::path::PathBuf;

/// Store backend mapping store URIs onto a local base directory.
///
/// A URI `<root>a/b` maps to `<base>/a/b`. URIs outside the configured
/// root are rejected rather than resolved.
pub struct LocalStore {
    base: PathBuf,
    root: String,
}

impl LocalStore {
    pub fn new<P: Into<PathBuf>, S: Into<String>>(base: P, root: S) -> Self {
        let mut root = root.into();
        if !root.ends_with('/') {
            root.push('/');
        }

        Self {
            base: base.into(),
            root,
        }
    }
}

impl StoreClient for LocalStore {
    fn open_session(&self) -> Result<Box<dyn StoreSession>> {
        Ok(Box::new(LocalSession {
            base: self.base.clone(),
            root: self.root.clone(),
        }))
    }
}

struct LocalSession {
    base: PathBuf,
    root: String,
}

impl LocalSession {
    /// Map a store URI onto the backing directory.
    fn fs_path(&self, uri: &str) -> Result<PathBuf> {
        if uri == self.root.trim_end_matches('/') {
            return Ok(self.base.clone());
        }

        match uri.strip_prefix(&self.root) {
            Some(relative) => Ok(self.base.join(relative)),
            None => Err(StoreError::InvalidPath(format!(
                "{} is outside the store root {}",
                uri, self.root
            ))),
        }
    }

    fn meta_for(&self, uri: &str, metadata: &fs::Metadata) -> EntryMeta {
        EntryMeta {
            name: final_segment(uri).to_string(),
            path: uri.to_string(),
            size: if metadata.is_dir() { 0 } else { metadata.len() },
            is_dir: metadata.is_dir(),
        }
    }
}

impl StoreSession for LocalSession {
    fn exists(&self, path: &str) -> Result<bool> {
        Ok(self.fs_path(path)?.exists())
    }

    fn status(&self, path: &str) -> Result<Option<EntryMeta>> {
        let fs_path = self.fs_path(path)?;
        if !fs_path.exists() {
            return Ok(None);
        }

        let metadata = fs::metadata(&fs_path)?;
        Ok(Some(self.meta_for(path, &metadata)))
    }

    fn list_children(&self, path: &str) -> Result<Vec<EntryMeta>> {
        let fs_path = self.fs_path(path)?;
        let metadata = fs::metadata(&fs_path)?;

        if !metadata.is_dir() {
            return Ok(vec![self.meta_for(path, &metadata)]);
        }

        let mut entries = Vec::new();
        for entry in fs::read_dir(&fs_path)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().to_string();
            let metadata = match entry.metadata() {
                Ok(m) => m,
                Err(_) => continue, // Skip entries we can't read
            };
            entries.push(self.meta_for(&join(path, &name), &metadata));
        }

        Ok(entries)
    }

    fn open_read(&self, path: &str) -> Result<Box<dyn Read + Send>> {
        let file = fs::File::open(self.fs_path(path)?)?;
        Ok(Box::new(file))
    }

    fn create_write(&self, path: &str) -> Result<Box<dyn Write + Send>> {
        let fs_path = self.fs_path(path)?;
        if let Some(parent) = fs_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let file = fs::File::create(&fs_path)?;
        Ok(Box::new(file))
    }

    fn delete(&self, path: &str, recursive: bool) -> Result<bool> {
        let fs_path = self.fs_path(path)?;
        if !fs_path.exists() {
            return Ok(false);
        }

        if fs_path.is_dir() {
            if recursive {
                fs::remove_dir_all(&fs_path)?;
            } else {
                fs::remove_dir(&fs_path)?;
            }
        } else {
            fs::remove_file(&fs_path)?;
        }

        tracing::debug!("deleted {}", path);
        Ok(true)
    }

    fn rename(&self, from: &str, to: &str) -> Result<bool> {
        let from_path = self.fs_path(from)?;
        let to_path = self.fs_path(to)?;

        if !from_path.exists() || to_path.exists() {
            return Ok(false);
        }

        fs::rename(&from_path, &to_path)?;
        tracing::debug!("renamed {} -> {}", from, to);
        Ok(true)
    }

    fn mkdir_parents(&self, path: &str) -> Result<()> {
        fs::create_dir_all(self.fs_path(path)?)?;
        Ok(())
    }
}
