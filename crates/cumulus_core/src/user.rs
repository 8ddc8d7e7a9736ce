//! Per-username record persistence on the remote store

use crate::error::required_field;
use crate::Result;
use cumulus_store::{join, StoreClient};
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};
use std::sync::Arc;

/// Persisted user document.
///
/// One document per username under the users directory, written once at
/// registration and never updated or deleted. The password is stored as
/// given; the identifier is assigned at registration and immutable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    pub username: String,
    pub password: String,
    pub user_id: String,
}

impl UserRecord {
    pub fn new(username: &str, password: &str, user_id: &str) -> Result<Self> {
        Ok(Self {
            username: required_field(username, "username")?,
            password: required_field(password, "password")?,
            user_id: user_id.to_string(),
        })
    }
}

/// Document persistence for user records. Owns the persisted documents;
/// callers only ever see the deserialized in-memory copy.
pub struct UserStore {
    client: Arc<dyn StoreClient>,
    users_dir: String,
}

impl UserStore {
    /// `users_dir` is the fully-qualified URI of the users directory.
    pub fn new<S: Into<String>>(client: Arc<dyn StoreClient>, users_dir: S) -> Self {
        Self {
            client,
            users_dir: users_dir.into(),
        }
    }

    /// Document path for a username, derived deterministically.
    fn document_path(&self, username: &str) -> String {
        join(&self.users_dir, &format!("{}.json", username))
    }

    /// Does a document exist for this username?
    pub fn contains(&self, username: &str) -> Result<bool> {
        let session = self.client.open_session()?;
        Ok(session.exists(&self.document_path(username))?)
    }

    /// Write a fresh record. The users directory is created on first use.
    pub fn insert(&self, record: &UserRecord) -> Result<()> {
        let session = self.client.open_session()?;

        if !session.exists(&self.users_dir)? {
            session.mkdir_parents(&self.users_dir)?;
        }

        let document = self.document_path(&record.username);
        let json = serde_json::to_vec(record)?;
        let mut sink = session.create_write(&document)?;
        sink.write_all(&json)?;
        sink.flush()?;

        tracing::debug!("user document written: {}", document);
        Ok(())
    }

    /// Read and deserialize the full document, or None if absent.
    pub fn fetch(&self, username: &str) -> Result<Option<UserRecord>> {
        let session = self.client.open_session()?;

        let document = self.document_path(username);
        if !session.exists(&document)? {
            return Ok(None);
        }

        let mut reader = session.open_read(&document)?;
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;

        let record: UserRecord = serde_json::from_slice(&bytes)?;
        Ok(Some(record))
    }
}
