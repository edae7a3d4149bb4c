use crate::config::schema::{RedlineConfig, ValidationError};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable naming a config file when none is given explicitly.
pub const CONFIG_ENV: &str = "REDLINE_CONFIG";

/// Failure to produce a [`RedlineConfig`]. Errors from a file carry its path.
#[derive(Debug)]
pub enum ConfigError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Toml {
        path: Option<PathBuf>,
        source: toml_edit::de::Error,
    },
    Validation {
        path: Option<PathBuf>,
        source: ValidationError,
    },
}

impl ConfigError {
    /// Attach the file a string-level error came from.
    fn in_file(self, file: &Path) -> Self {
        match self {
            ConfigError::Toml { path: None, source } => ConfigError::Toml {
                path: Some(file.to_path_buf()),
                source,
            },
            ConfigError::Validation { path: None, source } => ConfigError::Validation {
                path: Some(file.to_path_buf()),
                source,
            },
            other => other,
        }
    }

    fn origin(&self) -> String {
        match self {
            ConfigError::Io { path, .. } => format!(" {}", path.display()),
            ConfigError::Toml { path, .. } | ConfigError::Validation { path, .. } => path
                .as_ref()
                .map(|path| format!(" {}", path.display()))
                .unwrap_or_default(),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let origin = self.origin();
        match self {
            ConfigError::Io { source, .. } => {
                write!(f, "cannot open redline settings{origin}: {source}")
            }
            ConfigError::Toml { source, .. } => {
                write!(f, "redline settings{origin} do not match the expected layout: {source}")
            }
            ConfigError::Validation { source, .. } => {
                write!(f, "redline settings{origin} were rejected: {source}")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io { source, .. } => Some(source),
            ConfigError::Toml { source, .. } => Some(source),
            ConfigError::Validation { source, .. } => Some(source),
        }
    }
}

pub fn load_from_str(input: &str) -> Result<RedlineConfig, ConfigError> {
    let config: RedlineConfig = toml_edit::de::from_str(input)
        .map_err(|source| ConfigError::Toml { path: None, source })?;
    config
        .validate()
        .map_err(|source| ConfigError::Validation { path: None, source })?;
    Ok(config)
}

pub fn load_from_path(path: impl AsRef<Path>) -> Result<RedlineConfig, ConfigError> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    load_from_str(&contents).map_err(|error| error.in_file(path))
}

/// Load from `explicit`, else from `$REDLINE_CONFIG`, else defaults.
pub fn load_or_default(explicit: Option<&Path>) -> Result<RedlineConfig, ConfigError> {
    if let Some(path) = explicit {
        return load_from_path(path);
    }
    match std::env::var_os(CONFIG_ENV) {
        Some(path) if !path.is_empty() => load_from_path(PathBuf::from(path)),
        _ => Ok(RedlineConfig::default()),
    }
}
