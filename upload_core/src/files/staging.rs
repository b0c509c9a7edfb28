use std::fs;
use std::path::{Path, PathBuf};

/// Directory the inbound transport writes staged files into.
///
/// Only regular files that resolve to a location inside this directory are
/// treated as genuine uploads. Resolution follows symlinks and `..`, so a
/// crafted temp path cannot point the validator at arbitrary files.
#[derive(Debug, Clone)]
pub struct StagingArea {
    root: PathBuf,
}

impl StagingArea {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn initialize(&self) -> std::io::Result<()> {
        fs::create_dir_all(&self.root)
    }

    pub fn contains(&self, path: &Path) -> bool {
        let root = match fs::canonicalize(&self.root) {
            Ok(root) => root,
            Err(e) => {
                tracing::warn!("Staging directory {} is unavailable: {}", self.root.display(), e);
                return false;
            }
        };

        let candidate = match fs::canonicalize(path) {
            Ok(candidate) => candidate,
            Err(_) => return false,
        };

        if candidate == root || !candidate.starts_with(&root) {
            tracing::debug!(
                path = %path.display(),
                staging = %root.display(),
                "path resolves outside the staging directory"
            );
            return false;
        }

        fs::metadata(&candidate)
            .map(|meta| meta.is_file())
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_contains_staged_file() {
        let dir = TempDir::new().unwrap();
        let staging = StagingArea::new(dir.path());
        let staged = dir.path().join("php123");
        fs::write(&staged, b"data").unwrap();

        assert!(staging.contains(&staged));
        assert!(!staging.contains(&dir.path().join("missing")));
        assert!(!staging.contains(dir.path()));
    }

    #[test]
    fn test_rejects_paths_outside_staging() {
        let staging_dir = TempDir::new().unwrap();
        let other_dir = TempDir::new().unwrap();
        let outside = other_dir.path().join("secret.txt");
        fs::write(&outside, b"secret").unwrap();

        let staging = StagingArea::new(staging_dir.path());
        assert!(!staging.contains(&outside));

        let sneaky = staging_dir
            .path()
            .join("..")
            .join(other_dir.path().file_name().unwrap())
            .join("secret.txt");
        assert!(!staging.contains(&sneaky));
    }

    #[test]
    fn test_rejects_directories_inside_staging() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("nested");
        fs::create_dir(&nested).unwrap();

        let staging = StagingArea::new(dir.path());
        assert!(!staging.contains(&nested));
    }

    #[cfg(unix)]
    #[test]
    fn test_rejects_symlink_escaping_staging() {
        let staging_dir = TempDir::new().unwrap();
        let other_dir = TempDir::new().unwrap();
        let outside = other_dir.path().join("passwd");
        fs::write(&outside, b"root:x:0:0").unwrap();

        let link = staging_dir.path().join("upload.tmp");
        std::os::unix::fs::symlink(&outside, &link).unwrap();

        let staging = StagingArea::new(staging_dir.path());
        assert!(!staging.contains(&link));
    }

    #[test]
    fn test_missing_staging_root() {
        let dir = TempDir::new().unwrap();
        let staging = StagingArea::new(dir.path().join("not-created"));
        assert!(!staging.contains(&dir.path().join("not-created").join("f")));

        staging.initialize().unwrap();
        assert!(staging.root().exists());
    }
}
