use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::auth::PasswordConfig;
use crate::files::{AllowedExtensions, FileManagerConfig, UploadPolicy};

pub const ENV_PREFIX: &str = "APP";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub uploads: UploadConfig,
    pub auth: AuthConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    pub staging_dir: PathBuf,
    pub public_root: PathBuf,
    pub default_destination: String,
    pub allow_override: bool,
    pub max_size_mb: f64,
    pub allowed_extensions: AllowedExtensions,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    pub password: PasswordConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub json: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            uploads: UploadConfig::default(),
            auth: AuthConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            staging_dir: PathBuf::from("./temp"),
            public_root: PathBuf::from("./webroot"),
            default_destination: "files".to_string(),
            allow_override: false,
            max_size_mb: 10.0,
            allowed_extensions: AllowedExtensions::only([
                "jpg", "jpeg", "png", "gif", "pdf", "txt", "doc", "docx",
            ]),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            password: PasswordConfig::default(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl UploadConfig {
    pub fn policy(&self) -> UploadPolicy {
        UploadPolicy {
            allow_override: self.allow_override,
            max_size_mb: self.max_size_mb,
            allowed_extensions: self.allowed_extensions.clone(),
        }
    }

    pub fn file_manager_config(&self) -> FileManagerConfig {
        FileManagerConfig {
            staging_dir: self.staging_dir.clone(),
            public_root: self.public_root.clone(),
            policy: self.policy(),
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(None)
    }

    pub fn load_from(path: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_with_prefix(path, ENV_PREFIX)
    }

    /// Defaults, then the config file, then `<PREFIX>_SECTION__KEY` variables.
    pub fn load_with_prefix(path: Option<&Path>, prefix: &str) -> Result<Self, ConfigError> {
        let mut builder = Config::builder()
            .add_source(Config::try_from(&AppConfig::default())?);

        match path {
            Some(path) => {
                builder = builder.add_source(File::from(path));
            }
            None => {
                if Path::new("config.toml").exists() {
                    builder = builder.add_source(File::with_name("config"));
                }
            }
        }

        builder = builder.add_source(
            Environment::with_prefix(prefix)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("uploads.allowed_extensions"),
        );

        let config = builder.build()?;
        let app_config: AppConfig = config.try_deserialize()?;

        app_config.validate()?;

        Ok(app_config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.uploads.staging_dir.as_os_str().is_empty() {
            return Err(ConfigError::Message(
                "Staging directory cannot be empty".to_string(),
            ));
        }

        if self.uploads.public_root.as_os_str().is_empty() {
            return Err(ConfigError::Message(
                "Public root cannot be empty".to_string(),
            ));
        }

        if self.uploads.staging_dir == self.uploads.public_root {
            return Err(ConfigError::Message(
                "Staging directory and public root must differ".to_string(),
            ));
        }

        if !self.uploads.max_size_mb.is_finite() || self.uploads.max_size_mb < 0.0 {
            return Err(ConfigError::Message(
                "Max upload size must be zero (unlimited) or a positive number".to_string(),
            ));
        }

        let password = &self.auth.password;
        argon2::Params::new(password.memory_kib, password.iterations, password.parallelism, None)
            .map_err(|e| ConfigError::Message(format!("Invalid password hashing parameters: {}", e)))?;

        Ok(())
    }

    /// Settings that load fine but will not behave as the operator likely
    /// expects. Loading runs before logging is set up, so callers log these.
    pub fn warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if let AllowedExtensions::Malformed(raw) = &self.uploads.allowed_extensions {
            warnings.push(format!(
                "uploads.allowed_extensions is not a list ({}); every upload will be rejected",
                raw
            ));
        }
        warnings
    }

    pub fn create_directories(&self) -> Result<(), std::io::Error> {
        std::fs::create_dir_all(&self.uploads.staging_dir)?;
        std::fs::create_dir_all(&self.uploads.public_root)?;
        Ok(())
    }
}
