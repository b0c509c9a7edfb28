//! Core library: staged upload validation and relocation, user accounts
//! with argon2 password hashing, and layered configuration.

pub mod auth;
pub mod config;
pub mod error;
pub mod files;

pub use auth::{NewUser, PasswordConfig, PasswordHasher, User, UserPatch};
pub use config::{AppConfig, UploadConfig};
pub use error::{AppError, Result};
pub use files::{
    AllowedExtensions, FileManager, FileManagerConfig, FileRecord, StagingArea, StoredName,
    UploadDescriptor, UploadError, UploadPolicy, UploadRequest,
};
