//! Cumulus Operation Core
//!
//! Translates client-supplied logical paths and identities into calls
//! against the remote store:
//! - FileStore: upload, download, delete, list, rename, copy, move
//! - UserStore + AuthService: registration and login
//! - CloudFileRecord: validated request/listing value
//! - ServiceConfig: store root, users directory, download staging

mod auth;
mod config;
mod error;
mod file_store;
mod record;
mod user;

pub use auth::AuthService;
pub use config::{DownloadConfig, ServiceConfig, StoreConfig};
pub use error::CoreError;
pub use file_store::FileStore;
pub use record::CloudFileRecord;
pub use user::{UserRecord, UserStore};

pub type Result<T> = std::result::Result<T, CoreError>;
