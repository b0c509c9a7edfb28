use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::password::{validate_password_length, PasswordHasher};
use crate::error::Result;
use crate::files::FileRecord;

/// A user account. The password is only ever held as an argon2 PHC string
/// and is left out of serialized output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub file_id: Option<Uuid>,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing, default)]
    password: String,
    pub username: Option<String>,
    pub created: DateTime<Utc>,
    pub modified: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<FileRecord>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewUser {
    #[validate(length(min = 1, max = 100, message = "Name must be between 1 and 100 characters"))]
    pub name: String,

    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 8, max = 128, message = "Password must be between 8 and 128 characters"))]
    pub password: String,

    #[validate(length(min = 3, max = 30, message = "Username must be between 3 and 30 characters"))]
    pub username: Option<String>,

    pub file_id: Option<Uuid>,
}

/// Fields a caller may change on an existing user; `None` leaves a field alone.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UserPatch {
    #[validate(length(min = 1, max = 100, message = "Name must be between 1 and 100 characters"))]
    pub name: Option<String>,

    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,

    #[validate(length(min = 8, max = 128, message = "Password must be between 8 and 128 characters"))]
    pub password: Option<String>,

    #[validate(length(min = 3, max = 30, message = "Username must be between 3 and 30 characters"))]
    pub username: Option<String>,

    pub file_id: Option<Uuid>,
}

impl User {
    pub fn create(id: i64, new_user: NewUser, hasher: &PasswordHasher) -> Result<Self> {
        new_user.validate()?;
        let password = hasher.hash(&new_user.password)?;

        Ok(Self {
            id,
            file_id: new_user.file_id,
            name: new_user.name,
            email: new_user.email,
            password,
            username: new_user.username,
            created: Utc::now(),
            modified: None,
            file: None,
        })
    }

    pub fn password_hash(&self) -> &str {
        &self.password
    }

    pub fn set_password(&mut self, password: &str, hasher: &PasswordHasher) -> Result<()> {
        validate_password_length(password)?;
        self.password = hasher.hash(password)?;
        self.touch();
        Ok(())
    }

    pub fn verify_password(&self, password: &str, hasher: &PasswordHasher) -> Result<bool> {
        if self.password.is_empty() {
            return Ok(false);
        }
        hasher.verify(password, &self.password)
    }

    pub fn apply(&mut self, patch: UserPatch, hasher: &PasswordHasher) -> Result<()> {
        patch.validate()?;

        if let Some(password) = patch.password {
            self.password = hasher.hash(&password)?;
        }
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(email) = patch.email {
            self.email = email;
        }
        if let Some(username) = patch.username {
            self.username = Some(username);
        }
        if let Some(file_id) = patch.file_id {
            if self.file.as_ref().and_then(|f| f.id) != Some(file_id) {
                self.file = None;
            }
            self.file_id = Some(file_id);
        }

        self.touch();
        Ok(())
    }

    /// Link a stored file. Only id-named records carry an id to reference;
    /// for name-based records `file_id` is cleared and the record itself is kept.
    pub fn attach_file(&mut self, record: &FileRecord) {
        self.file_id = record.id;
        self.file = Some(record.clone());
        self.touch();
    }

    fn touch(&mut self) {
        self.modified = Some(Utc::now());
    }
}
