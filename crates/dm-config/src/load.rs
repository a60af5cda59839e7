//! Reading configuration files from disk.

use crate::analysis::AnalysisConfig;
use crate::validate::{validate_analysis, ValidationError};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors from loading a configuration file.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config file not found: {path}")]
    NotFound { path: PathBuf },

    #[error("Invalid config file {path}: {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("Semantic validation failed: {0}")]
    ValidationError(#[from] ValidationError),

    #[error("I/O error reading {path}: {source}")]
    IoError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl From<ConfigError> for dm_common::Error {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::IoError { source, .. } => dm_common::Error::Io(source),
            other => dm_common::Error::Config(other.to_string()),
        }
    }
}

/// Load and validate a configuration file.
///
/// Files ending in `.json` are parsed as JSON, everything else as TOML.
/// A relative `data` path is resolved against the config file's directory.
pub fn load_config(path: &Path) -> Result<AnalysisConfig, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::NotFound {
            path: path.to_path_buf(),
        });
    }

    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::IoError {
        path: path.to_path_buf(),
        source: e,
    })?;

    let mut config = parse_config(path, &content)?;

    if let Some(data) = config.data.take() {
        config.data = Some(match path.parent() {
            Some(dir) if data.is_relative() && !dir.as_os_str().is_empty() => dir.join(data),
            _ => data,
        });
    }

    validate_analysis(&config)?;
    Ok(config)
}

fn parse_config(path: &Path, content: &str) -> Result<AnalysisConfig, ConfigError> {
    let is_json = path
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let parsed = if is_json {
        serde_json::from_str(content).map_err(|e| e.to_string())
    } else {
        toml::from_str(content).map_err(|e| e.to_string())
    };

    parsed.map_err(|message| ConfigError::ParseError {
        path: path.to_path_buf(),
        message,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_file(dir: &Path, name: &str, body: &str) -> PathBuf {
        let path = dir.join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(body.as_bytes()).unwrap();
        path
    }

    #[test]
    fn missing_file_is_not_found() {
        let err = load_config(Path::new("/nonexistent/dimorph.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound { .. }));
    }

    #[test]
    fn relative_data_resolves_against_config_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "dimorph.toml", "data = \"brain.csv\"\n");
        let config = load_config(&path).unwrap();
        assert_eq!(config.data, Some(dir.path().join("brain.csv")));
    }

    #[test]
    fn json_extension_parses_as_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            dir.path(),
            "dimorph.json",
            r#"{"group_by": "Gender", "selection": {"top_n": 2}}"#,
        );
        let config = load_config(&path).unwrap();
        assert_eq!(config.group_by, "Gender");
        assert_eq!(config.selection.top_n, 2);
    }

    #[test]
    fn parse_failure_names_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "bad.toml", "selection = [");
        let err = load_config(&path).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
        assert!(err.to_string().contains("bad.toml"));
    }

    #[test]
    fn converts_into_common_error() {
        let err: dm_common::Error = ConfigError::NotFound {
            path: PathBuf::from("x.toml"),
        }
        .into();
        assert!(matches!(err, dm_common::Error::Config(_)));
    }
}
