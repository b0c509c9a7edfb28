use std::fs;
use std::path::{Component, Path, PathBuf};

use chrono::Utc;

use crate::error::{AppError, Result};
use super::models::{FileRecord, UploadDescriptor};
use super::request::UploadRequest;
use super::staging::StagingArea;
use super::validation::UploadPolicy;

#[derive(Debug, Clone)]
pub struct FileManagerConfig {
    pub staging_dir: PathBuf,
    pub public_root: PathBuf,
    pub policy: UploadPolicy,
}

impl Default for FileManagerConfig {
    fn default() -> Self {
        Self {
            staging_dir: PathBuf::from("./temp"),
            public_root: PathBuf::from("./webroot"),
            policy: UploadPolicy::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct FileManager {
    config: FileManagerConfig,
    staging: StagingArea,
}

impl FileManager {
    pub fn new(config: FileManagerConfig) -> Self {
        let staging = StagingArea::new(config.staging_dir.clone());

        Self { config, staging }
    }

    pub fn config(&self) -> &FileManagerConfig {
        &self.config
    }

    pub fn staging(&self) -> &StagingArea {
        &self.staging
    }

    pub fn initialize(&self) -> Result<()> {
        self.staging.initialize()?;
        fs::create_dir_all(&self.config.public_root)?;
        Ok(())
    }

    pub fn request(&self, descriptor: UploadDescriptor) -> UploadRequest {
        UploadRequest::new(descriptor, self.staging.clone())
    }

    /// Resolve a directory relative to the public root.
    ///
    /// Leading and trailing slashes are ignored; absolute paths and `..`
    /// components are rejected.
    pub fn resolve_destination(&self, subdir: &str) -> Result<PathBuf> {
        let trimmed = subdir.trim().trim_matches(|c| c == '/' || c == '\\');
        let relative = Path::new(trimmed);

        for component in relative.components() {
            match component {
                Component::Normal(_) | Component::CurDir => {}
                _ => {
                    return Err(AppError::BadRequest(format!(
                        "Destination '{}' must stay inside the public directory",
                        subdir
                    )))
                }
            }
        }

        Ok(self.config.public_root.join(relative))
    }

    pub fn store(&self, descriptor: UploadDescriptor, subdir: &str) -> Result<FileRecord> {
        let request = self.request(descriptor);
        self.finish(request, subdir)
    }

    pub fn store_as(&self, descriptor: UploadDescriptor, subdir: &str, name: &str) -> Result<FileRecord> {
        let mut request = self.request(descriptor);
        request.set_stored_name(name)?;
        self.finish(request, subdir)
    }

    fn finish(&self, mut request: UploadRequest, subdir: &str) -> Result<FileRecord> {
        let destination = self.resolve_destination(subdir)?;
        request.set_destination(&destination);

        if !request.validate_with(&self.config.policy) {
            return Err(AppError::UploadRejected(request.error_messages()));
        }

        if !destination.exists() {
            fs::create_dir_all(&destination)?;
        }

        if !request.upload(&destination) {
            return Err(AppError::UploadRejected(request.error_messages()));
        }

        let path = request
            .destination_path()
            .ok_or_else(|| AppError::UploadRejected(request.error_messages()))?;

        let extension = request.extension().to_string();
        let content_type = mime_guess::from_ext(&extension)
            .first_or_octet_stream()
            .to_string();

        Ok(FileRecord {
            id: request.stored_name().id(),
            name: request.stored_name().to_string(),
            extension,
            original_name: request.original_name().to_string(),
            content_type,
            size: request.declared_size(),
            path,
            created_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::files::validation::AllowedExtensions;
    use tempfile::TempDir;

    fn create_test_setup(policy: UploadPolicy) -> (FileManager, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let config = FileManagerConfig {
            staging_dir: temp_dir.path().join("staging"),
            public_root: temp_dir.path().join("webroot"),
            policy,
        };

        let manager = FileManager::new(config);
        manager.initialize().unwrap();

        (manager, temp_dir)
    }

    fn stage(manager: &FileManager, tmp_name: &str, original_name: &str, data: &[u8]) -> UploadDescriptor {
        let tmp_path = manager.staging().root().join(tmp_name);
        fs::write(&tmp_path, data).unwrap();
        UploadDescriptor::new(tmp_path, original_name, data.len() as u64)
    }

    #[test]
    fn test_resolve_destination() {
        let (manager, _temp_dir) = create_test_setup(UploadPolicy::permissive());
        let root = manager.config().public_root.clone();

        assert_eq!(manager.resolve_destination("img/users").unwrap(), root.join("img/users"));
        assert_eq!(manager.resolve_destination("/img/users/").unwrap(), root.join("img/users"));
        assert_eq!(manager.resolve_destination("").unwrap(), root);

        assert!(manager.resolve_destination("../etc").is_err());
        assert!(manager.resolve_destination("img/../../etc").is_err());
    }

    #[test]
    fn test_store_file() {
        let (manager, _temp_dir) = create_test_setup(UploadPolicy::permissive());
        let descriptor = stage(&manager, "php1", "Avatar.PNG", b"\x89PNG....");

        let record = manager.store(descriptor, "img/users").unwrap();
        assert_eq!(record.extension, "png");
        assert_eq!(record.content_type, "image/png");
        let id = record.id.expect("id-named store carries its id");
        assert_eq!(record.name, id.to_string());
        assert_eq!(record.file_name(), format!("{}.png", id));
        assert_eq!(record.size, 8);
        assert!(record.path.ends_with(format!("img/users/{}.png", id)));
        assert!(record.path.exists());
    }

    #[test]
    fn test_store_as_named_file() {
        let (manager, _temp_dir) = create_test_setup(UploadPolicy::permissive());
        let descriptor = stage(&manager, "php2", "report.PDF", b"%PDF-1.4");

        let record = manager.store_as(descriptor, "docs", "quarterly").unwrap();
        assert_eq!(record.name, "quarterly");
        assert!(record.id.is_none());
        assert_eq!(record.file_name(), "quarterly.pdf");
        assert_eq!(record.content_type, "application/pdf");
        assert!(manager.config().public_root.join("docs/quarterly.pdf").exists());
    }

    #[test]
    fn test_store_rejected_by_policy() {
        let policy = UploadPolicy {
            allow_override: false,
            max_size_mb: 0.0,
            allowed_extensions: AllowedExtensions::only(["png", "jpg"]),
        };
        let (manager, _temp_dir) = create_test_setup(policy);
        let descriptor = stage(&manager, "php3", "payload.exe", b"MZ");

        let err = manager.store(descriptor, "img").unwrap_err();
        match err {
            AppError::UploadRejected(messages) => {
                assert_eq!(messages, vec!["File extension not enabled".to_string()]);
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert!(manager.staging().root().join("php3").exists());
        assert!(!manager.config().public_root.join("img").exists());
    }

    #[test]
    fn test_store_as_refuses_overwrite() {
        let policy = UploadPolicy {
            allow_override: false,
            ..UploadPolicy::permissive()
        };
        let (manager, _temp_dir) = create_test_setup(policy);

        let first = stage(&manager, "php4", "logo.png", b"one");
        manager.store_as(first, "brand", "logo").unwrap();

        let second = stage(&manager, "php5", "logo.png", b"two");
        let err = manager.store_as(second, "brand", "logo").unwrap_err();
        assert_eq!(err.messages(), vec!["File name 'logo.png' already exists".to_string()]);

        let kept = fs::read(manager.config().public_root.join("brand/logo.png")).unwrap();
        assert_eq!(kept, b"one");
    }

    #[test]
    fn test_store_rejects_bad_name_and_destination() {
        let (manager, _temp_dir) = create_test_setup(UploadPolicy::permissive());

        let descriptor = stage(&manager, "php6", "a.txt", b"a");
        assert!(matches!(
            manager.store_as(descriptor, "docs", "../../a"),
            Err(AppError::Upload(_))
        ));

        let descriptor = stage(&manager, "php7", "a.txt", b"a");
        assert!(matches!(
            manager.store(descriptor, "../outside"),
            Err(AppError::BadRequest(_))
        ));
    }
}
