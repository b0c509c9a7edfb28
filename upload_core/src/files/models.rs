use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::validation::UploadError;

/// Raw description of a staged file, as handed over by the transport layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadDescriptor {
    pub tmp_path: PathBuf,
    pub original_name: String,
    pub size_bytes: u64,
}

impl UploadDescriptor {
    pub fn new(tmp_path: impl Into<PathBuf>, original_name: impl Into<String>, size_bytes: u64) -> Self {
        Self {
            tmp_path: tmp_path.into(),
            original_name: original_name.into(),
            size_bytes,
        }
    }
}

/// Base name the file is stored under, before the extension is appended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoredName {
    Id(Uuid),
    Name(String),
}

impl StoredName {
    pub fn generate() -> Self {
        StoredName::Id(Uuid::new_v4())
    }

    pub fn named(name: impl Into<String>) -> Result<Self, UploadError> {
        let name = name.into();
        let invalid = name.trim().is_empty()
            || name == "."
            || name == ".."
            || name.contains('/')
            || name.contains('\\')
            || name.contains('\0');

        if invalid {
            return Err(UploadError::InvalidFileName { name });
        }
        Ok(StoredName::Name(name))
    }

    pub fn id(&self) -> Option<Uuid> {
        match self {
            StoredName::Id(id) => Some(*id),
            StoredName::Name(_) => None,
        }
    }
}

impl fmt::Display for StoredName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoredName::Id(id) => write!(f, "{}", id),
            StoredName::Name(name) => f.write_str(name),
        }
    }
}

/// Lower-cased text after the last dot of the final path component.
///
/// A leading dot counts, so `.htaccess` yields `htaccess`.
pub fn extension_of(original_name: &str) -> String {
    let file_name = original_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(original_name);

    file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_lowercase())
        .unwrap_or_default()
}

pub fn join_file_name(base: &str, extension: &str) -> String {
    if extension.is_empty() {
        base.to_string()
    } else {
        format!("{}.{}", base, extension)
    }
}

/// What survives a successful upload: enough to find the file again.
///
/// `id` is only set for id-named stores, where it is also the base name on
/// disk. Stores under a caller-chosen name carry `None`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileRecord {
    pub id: Option<Uuid>,
    pub name: String,
    pub extension: String,
    pub original_name: String,
    pub content_type: String,
    pub size: u64,
    pub path: PathBuf,
    pub created_at: DateTime<Utc>,
}

impl FileRecord {
    pub fn file_name(&self) -> String {
        join_file_name(&self.name, &self.extension)
    }
}
