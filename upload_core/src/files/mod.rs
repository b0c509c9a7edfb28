pub mod manager;
pub mod models;
pub mod request;
pub mod staging;
pub mod validation;

pub use manager::{FileManager, FileManagerConfig};
pub use models::{FileRecord, StoredName, UploadDescriptor};
pub use request::{Stage, UploadRequest};
pub use staging::StagingArea;
pub use validation::{AllowedExtensions, UploadError, UploadPolicy};
