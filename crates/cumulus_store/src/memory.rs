//! In-memory store backend
//!
//! Holds the whole hierarchy as a tree behind a mutex. Used as the
//! substitutable store in tests and for single-process runs. Writers
//! append straight into the tree, so an abandoned stream leaves a
//! truncated entry behind, just like the remote store.

use crate::client::{EntryMeta, StoreClient, StoreSession};
use crate::resolver::{final_segment, join};
use crate::{Result, StoreError};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::io::{self, Cursor, Read, Write};
use std::sync::Arc;

enum Node {
    Dir(BTreeMap<String, Node>),
    File(Vec<u8>),
}

impl Node {
    fn is_dir(&self) -> bool {
        matches!(self, Node::Dir(_))
    }

    fn size(&self) -> u64 {
        match self {
            Node::Dir(_) => 0,
            Node::File(bytes) => bytes.len() as u64,
        }
    }
}

/// In-memory store rooted at a fixed URI.
#[derive(Clone)]
pub struct MemoryStore {
    tree: Arc<Mutex<Node>>,
    root: String,
}

impl MemoryStore {
    pub fn new<S: Into<String>>(root: S) -> Self {
        let mut root = root.into();
        if !root.ends_with('/') {
            root.push('/');
        }

        Self {
            tree: Arc::new(Mutex::new(Node::Dir(BTreeMap::new()))),
            root,
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new("cumulus://main/")
    }
}

impl StoreClient for MemoryStore {
    fn open_session(&self) -> Result<Box<dyn StoreSession>> {
        Ok(Box::new(MemorySession {
            tree: Arc::clone(&self.tree),
            root: self.root.clone(),
        }))
    }
}

struct MemorySession {
    tree: Arc<Mutex<Node>>,
    root: String,
}

impl MemorySession {
    fn segments(&self, uri: &str) -> Result<Vec<String>> {
        if uri == self.root || uri == self.root.trim_end_matches('/') {
            return Ok(Vec::new());
        }

        match uri.strip_prefix(&self.root) {
            Some(relative) => Ok(relative
                .split('/')
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()),
            None => Err(StoreError::InvalidPath(format!(
                "{} is outside the store root {}",
                uri, self.root
            ))),
        }
    }
}

fn descend<'a>(mut node: &'a Node, segs: &[String]) -> Option<&'a Node> {
    for seg in segs {
        match node {
            Node::Dir(children) => node = children.get(seg)?,
            Node::File(_) => return None,
        }
    }
    Some(node)
}

fn descend_mut<'a>(mut node: &'a mut Node, segs: &[String]) -> Option<&'a mut Node> {
    for seg in segs {
        match node {
            Node::Dir(children) => node = children.get_mut(seg)?,
            Node::File(_) => return None,
        }
    }
    Some(node)
}

/// Walk down to `segs`, creating missing directories along the way.
fn descend_create<'a>(mut node: &'a mut Node, segs: &[String]) -> Result<&'a mut Node> {
    for seg in segs {
        let children = match node {
            Node::Dir(children) => children,
            Node::File(_) => {
                return Err(StoreError::InvalidPath(format!(
                    "{} is nested under a plain file",
                    seg
                )))
            }
        };
        node = children
            .entry(seg.clone())
            .or_insert_with(|| Node::Dir(BTreeMap::new()));
    }
    Ok(node)
}

impl StoreSession for MemorySession {
    fn exists(&self, path: &str) -> Result<bool> {
        let segs = self.segments(path)?;
        let tree = self.tree.lock();
        Ok(descend(&tree, &segs).is_some())
    }

    fn status(&self, path: &str) -> Result<Option<EntryMeta>> {
        let segs = self.segments(path)?;
        let tree = self.tree.lock();

        Ok(descend(&tree, &segs).map(|node| EntryMeta {
            name: final_segment(path).to_string(),
            path: path.to_string(),
            size: node.size(),
            is_dir: node.is_dir(),
        }))
    }

    fn list_children(&self, path: &str) -> Result<Vec<EntryMeta>> {
        let segs = self.segments(path)?;
        let tree = self.tree.lock();

        let node = descend(&tree, &segs)
            .ok_or_else(|| StoreError::NotFound(path.to_string()))?;

        match node {
            Node::File(bytes) => Ok(vec![EntryMeta {
                name: final_segment(path).to_string(),
                path: path.to_string(),
                size: bytes.len() as u64,
                is_dir: false,
            }]),
            Node::Dir(children) => Ok(children
                .iter()
                .map(|(name, child)| EntryMeta {
                    name: name.clone(),
                    path: join(path, name),
                    size: child.size(),
                    is_dir: child.is_dir(),
                })
                .collect()),
        }
    }

    fn open_read(&self, path: &str) -> Result<Box<dyn Read + Send>> {
        let segs = self.segments(path)?;
        let tree = self.tree.lock();

        match descend(&tree, &segs) {
            Some(Node::File(bytes)) => Ok(Box::new(Cursor::new(bytes.clone()))),
            Some(Node::Dir(_)) => Err(StoreError::InvalidPath(format!(
                "{} is a directory",
                path
            ))),
            None => Err(StoreError::NotFound(path.to_string())),
        }
    }

    fn create_write(&self, path: &str) -> Result<Box<dyn Write + Send>> {
        let segs = self.segments(path)?;
        let Some((name, parent_segs)) = segs.split_last() else {
            return Err(StoreError::InvalidPath("cannot create the root".into()));
        };

        {
            let mut tree = self.tree.lock();
            let parent = descend_create(&mut tree, parent_segs)?;
            let children = match parent {
                Node::Dir(children) => children,
                Node::File(_) => {
                    return Err(StoreError::InvalidPath(format!(
                        "parent of {} is a plain file",
                        path
                    )))
                }
            };
            if children.get(name).map(Node::is_dir).unwrap_or(false) {
                return Err(StoreError::InvalidPath(format!(
                    "{} is a directory",
                    path
                )));
            }
            children.insert(name.clone(), Node::File(Vec::new()));
        }

        Ok(Box::new(MemoryWriter {
            tree: Arc::clone(&self.tree),
            segs,
        }))
    }

    fn delete(&self, path: &str, recursive: bool) -> Result<bool> {
        let segs = self.segments(path)?;
        let Some((name, parent_segs)) = segs.split_last() else {
            return Ok(false);
        };

        let mut tree = self.tree.lock();
        let Some(Node::Dir(children)) = descend_mut(&mut tree, parent_segs) else {
            return Ok(false);
        };

        match children.get(name) {
            None => return Ok(false),
            Some(Node::Dir(grandchildren)) if !grandchildren.is_empty() && !recursive => {
                return Err(StoreError::Io(io::Error::other(format!(
                    "directory not empty: {}",
                    path
                ))));
            }
            Some(_) => {}
        }

        children.remove(name);
        Ok(true)
    }

    fn rename(&self, from: &str, to: &str) -> Result<bool> {
        let from_segs = self.segments(from)?;
        let to_segs = self.segments(to)?;
        let Some((from_name, from_parent)) = from_segs.split_last() else {
            return Ok(false);
        };
        let Some((to_name, to_parent)) = to_segs.split_last() else {
            return Ok(false);
        };

        let mut tree = self.tree.lock();
        if descend(&tree, &from_segs).is_none() || descend(&tree, &to_segs).is_some() {
            return Ok(false);
        }

        // Materialize the destination directory before detaching the source.
        if !descend_create(&mut tree, to_parent)?.is_dir() {
            return Err(StoreError::InvalidPath(format!(
                "parent of {} is a plain file",
                to
            )));
        }

        let node = match descend_mut(&mut tree, from_parent) {
            Some(Node::Dir(children)) => children.remove(from_name),
            _ => None,
        };
        let Some(node) = node else {
            return Ok(false);
        };

        match descend_mut(&mut tree, to_parent) {
            Some(Node::Dir(children)) => {
                children.insert(to_name.clone(), node);
                Ok(true)
            }
            _ => Err(StoreError::InvalidPath(format!(
                "parent of {} vanished during rename",
                to
            ))),
        }
    }

    fn mkdir_parents(&self, path: &str) -> Result<()> {
        let segs = self.segments(path)?;
        let mut tree = self.tree.lock();

        if !descend_create(&mut tree, &segs)?.is_dir() {
            return Err(StoreError::InvalidPath(format!(
                "{} exists as a plain file",
                path
            )));
        }
        Ok(())
    }
}

struct MemoryWriter {
    tree: Arc<Mutex<Node>>,
    segs: Vec<String>,
}

impl Write for MemoryWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut tree = self.tree.lock();
        match descend_mut(&mut tree, &self.segs) {
            Some(Node::File(bytes)) => {
                bytes.extend_from_slice(buf);
                Ok(buf.len())
            }
            _ => Err(io::Error::other("entry removed during write")),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(store: &MemoryStore) -> Box<dyn StoreSession> {
        store.open_session().unwrap()
    }

    #[test]
    fn test_write_then_read() {
        let store = MemoryStore::default();
        let s = session(&store);

        let mut sink = s.create_write("cumulus://main/docs/a.txt").unwrap();
        sink.write_all(b"hello").unwrap();
        drop(sink);

        let mut reader = s.open_read("cumulus://main/docs/a.txt").unwrap();
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes).unwrap();
        assert_eq!(bytes, b"hello");
    }

    #[test]
    fn test_create_makes_entry_visible_immediately() {
        let store = MemoryStore::default();
        let s = session(&store);

        let sink = s.create_write("cumulus://main/a.txt").unwrap();
        assert!(s.exists("cumulus://main/a.txt").unwrap());
        drop(sink);

        // Nothing was written, so the entry is empty.
        let meta = s.status("cumulus://main/a.txt").unwrap().unwrap();
        assert_eq!(meta.size, 0);
    }

    #[test]
    fn test_abandoned_writer_leaves_partial_bytes() {
        let store = MemoryStore::default();
        let s = session(&store);

        let mut sink = s.create_write("cumulus://main/a.txt").unwrap();
        sink.write_all(b"par").unwrap();
        drop(sink); // Stream abandoned mid-copy.

        let meta = s.status("cumulus://main/a.txt").unwrap().unwrap();
        assert_eq!(meta.size, 3);
    }

    #[test]
    fn test_list_children_is_non_recursive() {
        let store = MemoryStore::default();
        let s = session(&store);

        s.create_write("cumulus://main/docs/a.txt").unwrap().write_all(b"a").unwrap();
        s.create_write("cumulus://main/docs/sub/b.txt").unwrap().write_all(b"bb").unwrap();

        let entries = s.list_children("cumulus://main/docs").unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].name, "a.txt");
        assert!(!entries[0].is_dir);
        assert_eq!(entries[1].name, "sub");
        assert!(entries[1].is_dir);
        assert_eq!(entries[1].path, "cumulus://main/docs/sub");
    }

    #[test]
    fn test_rename_moves_subtree() {
        let store = MemoryStore::default();
        let s = session(&store);

        s.create_write("cumulus://main/docs/a.txt").unwrap().write_all(b"a").unwrap();

        assert!(s.rename("cumulus://main/docs", "cumulus://main/moved").unwrap());
        assert!(!s.exists("cumulus://main/docs").unwrap());
        assert!(s.exists("cumulus://main/moved/a.txt").unwrap());
    }

    #[test]
    fn test_rename_absent_source_returns_false() {
        let store = MemoryStore::default();
        let s = session(&store);
        assert!(!s.rename("cumulus://main/nope", "cumulus://main/other").unwrap());
    }

    #[test]
    fn test_delete_non_recursive_refuses_populated_dir() {
        let store = MemoryStore::default();
        let s = session(&store);

        s.create_write("cumulus://main/docs/a.txt").unwrap().write_all(b"a").unwrap();

        assert!(s.delete("cumulus://main/docs", false).is_err());
        assert!(s.delete("cumulus://main/docs", true).unwrap());
    }

    #[test]
    fn test_sessions_share_the_tree() {
        let store = MemoryStore::default();
        let first = session(&store);
        first.create_write("cumulus://main/a.txt").unwrap().write_all(b"a").unwrap();

        let second = session(&store);
        assert!(second.exists("cumulus://main/a.txt").unwrap());
    }
}
