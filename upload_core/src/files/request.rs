use std::fs;
use std::path::{Path, PathBuf};

use super::models::{extension_of, join_file_name, StoredName, UploadDescriptor};
use super::staging::StagingArea;
use super::validation::{check_size, AllowedExtensions, UploadError, UploadPolicy};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Pending,
    Validated { allow_override: bool },
    Rejected,
    Stored,
}

/// A staged file on its way to a public directory.
///
/// Checks run in a fixed order and stop at the first failure; every failure
/// appends exactly one error. The error list only grows, so a request that
/// has been rejected keeps its history and a fresh request is needed for a
/// clean pass. `upload` is only honoured after a successful `validate`, and
/// once a file is stored neither call changes the request's stage again.
#[derive(Debug)]
pub struct UploadRequest {
    temp_path: PathBuf,
    original_name: String,
    declared_size: u64,
    extension: String,
    stored_name: StoredName,
    destination: Option<PathBuf>,
    staging: StagingArea,
    errors: Vec<UploadError>,
    stage: Stage,
}

impl UploadRequest {
    pub fn new(descriptor: UploadDescriptor, staging: StagingArea) -> Self {
        let extension = extension_of(&descriptor.original_name);

        Self {
            temp_path: descriptor.tmp_path,
            original_name: descriptor.original_name,
            declared_size: descriptor.size_bytes,
            extension,
            stored_name: StoredName::generate(),
            destination: None,
            staging,
            errors: Vec::new(),
            stage: Stage::Pending,
        }
    }

    pub fn temp_path(&self) -> &Path {
        &self.temp_path
    }

    pub fn original_name(&self) -> &str {
        &self.original_name
    }

    pub fn declared_size(&self) -> u64 {
        self.declared_size
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    pub fn stored_name(&self) -> &StoredName {
        &self.stored_name
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn is_validated(&self) -> bool {
        matches!(self.stage, Stage::Validated { .. })
    }

    pub fn is_stored(&self) -> bool {
        self.stage == Stage::Stored
    }

    pub fn errors(&self) -> &[UploadError] {
        &self.errors
    }

    pub fn error_messages(&self) -> Vec<String> {
        self.errors.iter().map(ToString::to_string).collect()
    }

    /// Name the file will have once stored, extension included.
    pub fn file_name(&self) -> String {
        join_file_name(&self.stored_name.to_string(), &self.extension)
    }

    /// Store under a caller-chosen base name instead of a generated id.
    pub fn set_stored_name(&mut self, name: impl Into<String>) -> Result<(), UploadError> {
        self.stored_name = StoredName::named(name)?;
        Ok(())
    }

    pub fn set_destination(&mut self, destination_dir: impl Into<PathBuf>) {
        self.destination = Some(destination_dir.into());
    }

    pub fn destination(&self) -> Option<&Path> {
        self.destination.as_deref()
    }

    pub fn destination_path(&self) -> Option<PathBuf> {
        self.destination
            .as_ref()
            .map(|dir| dir.join(self.file_name()))
    }

    pub fn validate(
        &mut self,
        allow_override: bool,
        max_size_mb: f64,
        allowed_extensions: &AllowedExtensions,
    ) -> bool {
        if self.stage == Stage::Stored {
            return self.record(UploadError::AlreadyStored);
        }

        match self.run_checks(allow_override, max_size_mb, allowed_extensions) {
            Ok(()) => {
                tracing::debug!(
                    original_name = %self.original_name,
                    size = self.declared_size,
                    "upload passed validation"
                );
                self.stage = Stage::Validated { allow_override };
                true
            }
            Err(err) => {
                self.stage = Stage::Rejected;
                self.record(err)
            }
        }
    }

    pub fn validate_with(&mut self, policy: &UploadPolicy) -> bool {
        self.validate(
            policy.allow_override,
            policy.max_size_mb,
            &policy.allowed_extensions,
        )
    }

    fn run_checks(
        &self,
        allow_override: bool,
        max_size_mb: f64,
        allowed_extensions: &AllowedExtensions,
    ) -> Result<(), UploadError> {
        if !self.staging.contains(&self.temp_path) {
            return Err(UploadError::NotAnUploadedFile);
        }

        if !allow_override {
            if let Some(target) = self.destination_path() {
                if target.exists() {
                    return Err(UploadError::DestinationAlreadyExists {
                        name: self.file_name(),
                    });
                }
            }
        }

        check_size(self.declared_size, max_size_mb)?;

        allowed_extensions.check(&self.extension)?;

        Ok(())
    }

    /// Move the staged file to `destination_dir/<stored name>.<extension>`.
    ///
    /// The move is a rename, so it either happens completely or not at all;
    /// moving across filesystems fails rather than falling back to a copy.
    pub fn upload(&mut self, destination_dir: impl Into<PathBuf>) -> bool {
        self.set_destination(destination_dir);

        let allow_override = match self.stage {
            Stage::Validated { allow_override } => allow_override,
            Stage::Stored => return self.record(UploadError::AlreadyStored),
            _ => return self.record(UploadError::NotValidated),
        };

        if !self.staging.contains(&self.temp_path) {
            self.stage = Stage::Rejected;
            return self.record(UploadError::NotAnUploadedFile);
        }

        let target = match self.destination_path() {
            Some(target) => target,
            None => return self.record(UploadError::NotValidated),
        };

        if !allow_override && target.exists() {
            self.stage = Stage::Rejected;
            return self.record(UploadError::DestinationAlreadyExists {
                name: self.file_name(),
            });
        }

        match fs::rename(&self.temp_path, &target) {
            Ok(()) => {
                tracing::info!(
                    original_name = %self.original_name,
                    target = %target.display(),
                    size = self.declared_size,
                    "stored upload"
                );
                self.stage = Stage::Stored;
                true
            }
            Err(source) => {
                self.stage = Stage::Rejected;
                self.record(UploadError::MoveFailed { source })
            }
        }
    }

    pub fn validate_and_upload(&mut self, policy: &UploadPolicy, destination_dir: impl Into<PathBuf>) -> bool {
        self.set_destination(destination_dir);
        if !self.validate_with(policy) {
            return false;
        }

        match self.destination.clone() {
            Some(dir) => self.upload(dir),
            None => false,
        }
    }

    fn record(&mut self, err: UploadError) -> bool {
        tracing::warn!(
            original_name = %self.original_name,
            temp_path = %self.temp_path.display(),
            "upload rejected: {}",
            err
        );
        self.errors.push(err);
        false
    }
}
