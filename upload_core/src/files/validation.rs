use std::collections::BTreeSet;

use serde::de::Deserializer;
use serde::ser::{SerializeSeq, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

pub const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

#[derive(Error, Debug)]
pub enum UploadError {
    #[error("File not uploaded")]
    NotAnUploadedFile,

    #[error("File name '{name}' already exists")]
    DestinationAlreadyExists { name: String },

    #[error("File size greater than limit of {max_size_mb}MB")]
    SizeLimitExceeded { size: u64, max_size_mb: f64 },

    #[error("File extension not enabled")]
    ExtensionNotAllowed { extension: String },

    #[error("Enabled file extensions must be a list, got {0}")]
    ExtensionListMalformed(String),

    #[error("File was not copied to server: {source}")]
    MoveFailed {
        #[source]
        source: std::io::Error,
    },

    #[error("File has not been validated")]
    NotValidated,

    #[error("File has already been stored")]
    AlreadyStored,

    #[error("Invalid file name: {name:?}")]
    InvalidFileName { name: String },
}

/// Extensions an upload may carry.
///
/// `Malformed` keeps an allow-list that came from loosely typed input
/// (a config file or environment variable) and was not a list of strings.
/// It is reported when the extension check runs rather than at load time,
/// so a broken allow-list never silently turns into "allow everything".
#[derive(Debug, Clone, PartialEq, Default)]
pub enum AllowedExtensions {
    #[default]
    Any,
    Only(BTreeSet<String>),
    Malformed(String),
}

impl AllowedExtensions {
    pub fn only<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let set: BTreeSet<String> = extensions.into_iter().map(Into::into).collect();
        if set.is_empty() {
            AllowedExtensions::Any
        } else {
            AllowedExtensions::Only(set)
        }
    }

    pub fn from_value(value: Option<Value>) -> Self {
        match value {
            None | Some(Value::Null) | Some(Value::Bool(false)) => AllowedExtensions::Any,
            Some(Value::String(s)) if s.is_empty() => AllowedExtensions::Any,
            Some(Value::Array(items)) => {
                let mut set = BTreeSet::new();
                for item in items {
                    match item {
                        Value::String(ext) => {
                            set.insert(ext);
                        }
                        other => {
                            return AllowedExtensions::Malformed(format!(
                                "a list containing {}",
                                other
                            ))
                        }
                    }
                }
                Self::only(set)
            }
            Some(other) => AllowedExtensions::Malformed(other.to_string()),
        }
    }

    /// Exact, case-sensitive membership test.
    pub fn check(&self, extension: &str) -> Result<(), UploadError> {
        match self {
            AllowedExtensions::Any => Ok(()),
            AllowedExtensions::Only(set) if set.is_empty() || set.contains(extension) => Ok(()),
            AllowedExtensions::Only(_) => Err(UploadError::ExtensionNotAllowed {
                extension: extension.to_string(),
            }),
            AllowedExtensions::Malformed(raw) => {
                Err(UploadError::ExtensionListMalformed(raw.clone()))
            }
        }
    }
}

impl Serialize for AllowedExtensions {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            AllowedExtensions::Any => serializer.serialize_none(),
            AllowedExtensions::Only(set) => {
                let mut seq = serializer.serialize_seq(Some(set.len()))?;
                for ext in set {
                    seq.serialize_element(ext)?;
                }
                seq.end()
            }
            AllowedExtensions::Malformed(raw) => serializer.serialize_str(raw),
        }
    }
}

impl<'de> Deserialize<'de> for AllowedExtensions {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Option::<Value>::deserialize(deserializer)?;
        Ok(Self::from_value(value))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadPolicy {
    pub allow_override: bool,
    /// Zero or less disables the size limit.
    pub max_size_mb: f64,
    pub allowed_extensions: AllowedExtensions,
}

impl Default for UploadPolicy {
    fn default() -> Self {
        Self::permissive()
    }
}

impl UploadPolicy {
    pub fn permissive() -> Self {
        Self {
            allow_override: true,
            max_size_mb: 0.0,
            allowed_extensions: AllowedExtensions::Any,
        }
    }

    pub fn max_size_bytes(&self) -> Option<u64> {
        if self.max_size_mb > 0.0 {
            Some((self.max_size_mb * BYTES_PER_MB) as u64)
        } else {
            None
        }
    }
}

pub fn check_size(size: u64, max_size_mb: f64) -> Result<(), UploadError> {
    if max_size_mb > 0.0 && size as f64 > max_size_mb * BYTES_PER_MB {
        return Err(UploadError::SizeLimitExceeded { size, max_size_mb });
    }
    Ok(())
}
