//! Cumulus Storage Abstraction Layer
//!
//! Provides a unified interface to the hierarchical remote store:
//! - PathResolver: logical-path to store-URI resolution
//! - StoreClient / StoreSession: per-operation store access traits
//! - LocalStore: filesystem-backed production backend
//! - MemoryStore: in-memory backend for tests and single-process use

mod client;
mod local;
mod memory;
mod resolver;

pub use client::{EntryMeta, StoreClient, StoreSession};
pub use local::LocalStore;
pub use memory::MemoryStore;
pub use resolver::{final_segment, join, parent_of, sibling, PathResolver};

use thiserror::Error;

/// Storage layer errors
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("path not found: {0}")]
    NotFound(String),

    #[error("invalid path: {0}")]
    InvalidPath(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;
