//! Logical path resolution against the fixed store root

use crate::{Result, StoreError};

/// Resolves caller-supplied logical paths into fully-qualified store URIs.
///
/// A path that already carries the store scheme passes through unchanged.
/// Anything else is treated as relative to the fixed root: a single
/// leading separator is stripped and the root is prepended. Relative
/// segments such as `..` are not rewritten.
#[derive(Debug, Clone)]
pub struct PathResolver {
    root: String,
    scheme: String,
}

impl PathResolver {
    /// Create a resolver for the given root URI, e.g. `cumulus://main/`.
    pub fn new<S: Into<String>>(root: S) -> Self {
        let mut root = root.into();
        if !root.ends_with('/') {
            root.push('/');
        }

        let scheme = match root.find("://") {
            Some(idx) => root[..idx + 3].to_string(),
            None => root.clone(),
        };

        Self { root, scheme }
    }

    /// The fully-qualified root URI, with trailing separator.
    pub fn root(&self) -> &str {
        &self.root
    }

    /// Resolve a logical path into a fully-qualified store URI.
    pub fn resolve(&self, path: &str) -> Result<String> {
        if path.trim().is_empty() {
            return Err(StoreError::InvalidPath("path cannot be empty".into()));
        }

        if path.starts_with(&self.scheme) {
            return Ok(path.to_string());
        }

        let relative = path.strip_prefix('/').unwrap_or(path);
        Ok(format!("{}{}", self.root, relative))
    }
}

/// Final segment of a store URI.
pub fn final_segment(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    trimmed.rsplit('/').next().unwrap_or(trimmed)
}

/// Parent of a store URI, without the trailing separator.
pub fn parent_of(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    match trimmed.rfind('/') {
        Some(idx) => &trimmed[..idx],
        None => trimmed,
    }
}

/// Join a child name onto a base URI.
pub fn join(base: &str, name: &str) -> String {
    if base.ends_with('/') {
        format!("{}{}", base, name)
    } else {
        format!("{}/{}", base, name)
    }
}

/// Replace the final segment of a URI with a new name.
pub fn sibling(path: &str, name: &str) -> String {
    match path.rfind('/') {
        Some(idx) => format!("{}{}", &path[..=idx], name),
        None => name.to_string(),
    }
}
