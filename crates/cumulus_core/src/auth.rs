//! Registration and login over the user store
//!
//! No token or session is issued: login hands the stored identifier back
//! to the caller, who presents it as `owner_id` on later file operations
//! without further verification.

use crate::error::required_field;
use crate::{CoreError, Result, UserRecord, UserStore};
use uuid::Uuid;

pub struct AuthService {
    users: UserStore,
}

impl AuthService {
    pub fn new(users: UserStore) -> Self {
        Self { users }
    }

    /// Create a user and return the freshly assigned identifier.
    pub fn register(&self, username: &str, password: &str) -> Result<String> {
        required_field(username, "username")?;
        required_field(password, "password")?;

        if self.users.contains(username)? {
            return Err(CoreError::DuplicateUser(username.to_string()));
        }

        let user_id = Uuid::new_v4().to_string();
        let record = UserRecord::new(username, password, &user_id)?;
        self.users.insert(&record)?;

        tracing::info!("user registered: {}", username);
        Ok(user_id)
    }

    /// Compare the supplied password against the stored document and
    /// return the stored identifier on a match.
    pub fn login(&self, username: &str, password: &str) -> Result<String> {
        let record = self
            .users
            .fetch(username)?
            .ok_or_else(|| CoreError::UserNotFound(username.to_string()))?;

        if record.password.as_bytes() != password.as_bytes() {
            return Err(CoreError::WrongPassword);
        }

        Ok(record.user_id)
    }
}
