//! Request-scoped file record

use crate::error::required_field;
use crate::{CoreError, Result};
use serde::{Deserialize, Serialize};

/// One file entry as seen by the operation layer.
///
/// Either a validated request payload or a view over a store listing
/// entry. Never persisted. `owner_id` is carried through as supplied and
/// is not checked against the user store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloudFileRecord {
    pub file_name: String,
    pub file_size: u64,
    pub file_path: Option<String>,
    pub owner_id: String,
    pub upload_path: String,
    pub local_path: Option<String>,
}

impl CloudFileRecord {
    /// Validating factory for request payloads. Rejects blank required
    /// fields and non-numeric sizes atomically, so a partially valid
    /// record can never be observed.
    pub fn new(
        owner_id: &str,
        file_name: &str,
        file_size: &str,
        upload_path: &str,
    ) -> Result<Self> {
        let owner_id = required_field(owner_id, "ownerId")?;
        let file_name = required_field(file_name, "fileName")?;
        let upload_path = required_field(upload_path, "uploadPath")?;
        let file_size = required_field(file_size, "fileSize")?
            .parse::<u64>()
            .map_err(|_| {
                CoreError::InvalidArgument("fileSize should be a valid number".into())
            })?;

        Ok(Self {
            file_name,
            file_size,
            file_path: None,
            owner_id,
            upload_path,
            local_path: None,
        })
    }

    /// Attach the local source path. Blank input is rejected.
    pub fn with_local_path(mut self, local_path: &str) -> Result<Self> {
        self.local_path = Some(required_field(local_path, "localPath")?);
        Ok(self)
    }

    /// View over one store listing entry.
    pub(crate) fn from_listing(
        name: String,
        size: u64,
        path: String,
        owner_id: &str,
        upload_path: &str,
    ) -> Self {
        Self {
            file_name: name,
            file_size: size,
            file_path: Some(path),
            owner_id: owner_id.to_string(),
            upload_path: upload_path.to_string(),
            local_path: None,
        }
    }
}
